use std::io::{self, Write};

use serde::{Serialize, Serializer};

use super::{float_str, Snapshot};
use crate::stats::{ControllerStats, NodeStats};

/// Flat record whose values are all strings, serialized in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record(Vec<(String, String)>);

impl Record {
    fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.push((key.into(), value.into()));
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(k, _)| k.as_str())
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.0.iter().map(|(k, v)| (k, v)))
    }
}

/// Writes the record of the controller, then the record of each node, one per line.
pub fn write_snapshot<W: Write + ?Sized>(snapshot: &Snapshot, out: &mut W) -> io::Result<()> {
    let timestamp = float_str(snapshot.timestamp);
    write_record(&controller_record(&snapshot.device, &timestamp, &snapshot.controller), out)?;
    for node in &snapshot.nodes {
        write_record(&node_record(&node.path, &timestamp, &node.stats), out)?;
    }
    Ok(())
}

pub fn write_record<W: Write + ?Sized>(record: &Record, out: &mut W) -> io::Result<()> {
    let mut ser = serde_json::Serializer::with_formatter(&mut *out, SpacedAsciiFormatter);
    record.serialize(&mut ser)?;
    out.write_all(b"\n")
}

pub fn controller_record(device: &str, timestamp: &str, stats: &ControllerStats) -> Record {
    let mut r = Record::default();
    r.push("device", device);
    r.push("timestamp", timestamp);
    r.push("enabled", flag(stats.enabled));
    r.push("running", flag(stats.running));
    r.push("period_ms", float_str(stats.period_ms));
    r.push("period_at", float_str(stats.period_at));
    r.push("period_vtime_at", float_str(stats.vperiod_at));
    r.push("busy_level", stats.busy_level.to_string());
    r.push("vrate_pct", float_str(stats.vrate_pct));
    r
}

pub fn node_record(path: &str, timestamp: &str, stats: &NodeStats) -> Record {
    let mut r = Record::default();
    r.push("cgroup", path);
    r.push("timestamp", timestamp);
    r.push("is_active", flag(stats.is_active));
    r.push("weight", stats.weight.to_string());
    r.push("weight_active", stats.active.to_string());
    r.push("weight_inuse", stats.inuse.to_string());
    r.push("hweight_active_pct", float_str(stats.hwa_pct));
    r.push("hweight_inuse_pct", float_str(stats.hwi_pct));
    r.push("inflight_pct", zero_or_float(stats.inflight_pct));
    r.push("debt_ms", float_str(stats.debt_ms));
    r.push("use_delay", stats.use_delay.to_string());
    r.push("delay_ms", float_str(stats.delay_ms));
    r.push("usage_pct", zero_or_float(stats.usage));
    r.push("address", format!("{:#x}", stats.id));
    for (i, usage) in stats.usages.iter().enumerate() {
        r.push(format!("usage_pct_{i}"), float_str(*usage));
    }
    r
}

/// An exact zero is written as an integer, a computed value as a float.
fn zero_or_float(v: Option<f64>) -> String {
    v.map_or_else(|| String::from("0"), float_str)
}

fn flag(b: bool) -> &'static str {
    if b { "1" } else { "0" }
}

/// JSON formatter that separates items with `", "` and keys with `": "`, and
/// escapes every character outside of printable ASCII as UTF-16 `\uXXXX` units.
struct SpacedAsciiFormatter;

impl serde_json::ser::Formatter for SpacedAsciiFormatter {
    fn begin_object_key<W: ?Sized + Write>(&mut self, writer: &mut W, first: bool) -> io::Result<()> {
        if first { Ok(()) } else { writer.write_all(b", ") }
    }

    fn begin_object_value<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        writer.write_all(b": ")
    }

    fn write_string_fragment<W: ?Sized + Write>(&mut self, writer: &mut W, fragment: &str) -> io::Result<()> {
        let mut printable_start = 0;
        for (i, c) in fragment.char_indices() {
            if (' '..='~').contains(&c) {
                continue;
            }
            writer.write_all(&fragment.as_bytes()[printable_start..i])?;
            let mut units = [0u16; 2];
            for unit in c.encode_utf16(&mut units) {
                write!(writer, "\\u{unit:04x}")?;
            }
            printable_start = i + c.len_utf8();
        }
        writer.write_all(&fragment.as_bytes()[printable_start..])
    }
}
