//! Rendering of the samples.

use std::io::{self, Write};

use crate::stats::{ControllerStats, NodeStats};

/// Fixed-width table, for humans.
pub mod table;

/// One JSON object per line, for machines.
pub mod json;

/// Everything that was sampled in one tick.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub device: String,
    /// Time of the sample, in seconds since the Unix epoch.
    pub timestamp: f64,
    pub controller: ControllerStats,
    /// Accounting nodes, in walk order.
    pub nodes: Vec<NodeSample>,
}

#[derive(Debug, Clone)]
pub struct NodeSample {
    pub path: String,
    pub stats: NodeStats,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
}

impl OutputFormat {
    pub fn write_snapshot<W: Write + ?Sized>(&self, snapshot: &Snapshot, out: &mut W) -> io::Result<()> {
        match self {
            OutputFormat::Table => table::write_snapshot(snapshot, out),
            OutputFormat::Json => json::write_snapshot(snapshot, out),
        }
    }
}

/// Formats a float with the shortest round-trip digits, at least one fractional digit,
/// and an exponent outside of `[1e-4, 1e16)`.
///
/// The structured output has always used this format, parsers depend on it.
pub fn float_str(v: f64) -> String {
    if v.is_nan() {
        return String::from("nan");
    }
    if v.is_infinite() {
        return String::from(if v > 0.0 { "inf" } else { "-inf" });
    }
    let abs = v.abs();
    if abs != 0.0 && !(1e-4..1e16).contains(&abs) {
        let s = format!("{v:e}");
        return match s.split_once('e') {
            Some((mantissa, exp)) => {
                let (sign, digits) = match exp.strip_prefix('-') {
                    Some(digits) => ('-', digits),
                    None => ('+', exp),
                };
                format!("{mantissa}e{sign}{digits:0>2}")
            }
            None => s,
        };
    }
    let s = v.to_string();
    if s.contains('.') { s } else { format!("{s}.0") }
}
