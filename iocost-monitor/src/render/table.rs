use std::io::{self, Write};

use super::{float_str, Snapshot};
use crate::stats::{ControllerStats, NodeStats};

/// Width of the path column. Longer paths keep their last characters.
pub const PATH_WIDTH: usize = 28;

const MAX_DEBT_MS: i64 = 999;
const MAX_USE_DELAY: i64 = 99;
const MAX_DELAY_MS: i64 = 999;
const MAX_USAGE_PCT: i64 = 999;

/// Writes a blank line, the preamble, the header and one row per node.
pub fn write_snapshot<W: Write + ?Sized>(snapshot: &Snapshot, out: &mut W) -> io::Result<()> {
    writeln!(out)?;
    writeln!(out, "{}", preamble(&snapshot.device, &snapshot.controller))?;
    writeln!(out, "{}", header())?;
    for node in &snapshot.nodes {
        writeln!(out, "{}", row(&node.path, &node.stats))?;
    }
    Ok(())
}

/// Summary of the controller, e.g.
/// `sda RUN  per=100.0ms cur_per=2.500:v2.000 busy= -5 vrate=100.00% params=ssd_dfl(Q)`.
pub fn preamble(device: &str, stats: &ControllerStats) -> String {
    let mut s = format!(
        "{device} {state:<4} per={period}ms cur_per={at:.3}:v{vat:.3} busy={busy:+3} vrate={vrate:6.2}% params={params}",
        state = stats.state().label(),
        period = float_str(stats.period_ms),
        at = stats.period_at,
        vat = stats.vperiod_at,
        busy = stats.busy_level,
        vrate = stats.vrate_pct,
        params = stats.profile_label(),
    );
    if stats.user_cost_model || stats.user_qos_params {
        s.push('(');
        if stats.user_cost_model {
            s.push('C');
        }
        if stats.user_qos_params {
            s.push('Q');
        }
        s.push(')');
    }
    s
}

pub fn header() -> String {
    format!(
        "{:25} active {:>9} {:>13} {:>6} {:>3} {:>6} {}",
        "", "weight", "hweight%", "inflt%", "dbt", "delay", "usages%"
    )
}

pub fn row(path: &str, stats: &NodeStats) -> String {
    let mut s = format!(
        "{path:<w$} {active} {inuse:5}/{wactive:5} {hwi:6.2}/{hwa:6.2} {inflight:6.2} {debt:3} {use_delay:2}*{delay:03} ",
        path = path_tail(path, PATH_WIDTH),
        w = PATH_WIDTH,
        active = if stats.is_active { '*' } else { ' ' },
        inuse = stats.inuse,
        wactive = stats.active,
        hwi = stats.hwi_pct,
        hwa = stats.hwa_pct,
        inflight = stats.inflight_pct.unwrap_or_default(),
        debt = ceil_capped(stats.debt_ms, MAX_DEBT_MS),
        use_delay = stats.use_delay.min(MAX_USE_DELAY),
        delay = ceil_capped(stats.delay_ms, MAX_DELAY_MS),
    );
    let usages: Vec<String> = stats
        .usages
        .iter()
        .map(|u| format!("{:03}", (u.round_ties_even() as i64).min(MAX_USAGE_PCT)))
        .collect();
    s.push_str(&usages.join(":"));
    s
}

/// Keeps the last `width` characters of `path`.
pub fn path_tail(path: &str, width: usize) -> &str {
    let len = path.chars().count();
    match path.char_indices().nth(len.saturating_sub(width)) {
        Some((start, _)) => &path[start..],
        None => path,
    }
}

fn ceil_capped(v: f64, max: i64) -> i64 {
    (v.ceil() as i64).min(max)
}
