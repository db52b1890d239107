//! Typed view over a node's raw execution statistics.
//!
//! Lenient decoding ignores fields it does not know; strict decoding rejects
//! them with `Error::UnknownStatsField` naming the dotted path.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::plan::{value_text, StatsMap};

/// Key of the nested per-node execution summary object.
pub const EXECUTION_SUMMARY: &str = "execution_summary";

/// Stats entries the engine is known to emit.
pub const KNOWN_STATS_FIELDS: &[&str] = &[
    "Disk Usage (KBytes)",
    "Disk Write Latency (msecs)",
    "Peak Buffering Memory Usage (KBytes)",
    "Peak Memory Usage (KBytes)",
    "Rows Spooled",
    "rows",
    "latency",
    "cpu_time",
    "deleted_rows",
    "filesystem_delay_seconds",
    "filtered_rows",
    "remote_calls",
    "scanned_rows",
    EXECUTION_SUMMARY,
];

const KNOWN_VALUE_FIELDS: &[&str] = &["unit", "total", "mean", "std_deviation", "histogram"];

const KNOWN_SUMMARY_FIELDS: &[&str] = &[
    "num_executions",
    "checkpoint_time",
    "execution_end_timestamp",
    "execution_start_timestamp",
    "num_checkpoints",
];

const KNOWN_HISTOGRAM_FIELDS: &[&str] = &["count", "percentage", "lower_bound", "upper_bound"];

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HistogramBucket {
    pub count: String,
    pub percentage: String,
    pub lower_bound: String,
    pub upper_bound: String,
}

/// One measured quantity: total plus optional distribution and unit.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StatsValue {
    pub unit: String,
    pub total: String,
    pub mean: String,
    pub std_deviation: String,
    pub histogram: Vec<HistogramBucket>,
}

impl StatsValue {
    /// Lenient decode of one raw stats entry; `None` unless it is an object.
    pub fn from_value(value: &Value) -> Option<Self> {
        value
            .as_object()
            .and_then(|obj| decode_value("", obj, false).ok())
    }

    /// `<total>[@<mean>[±<std_deviation>]][ <unit>]`, skipping empty parts.
    pub fn distribution_text(&self) -> String {
        let mut out = self.total.clone();
        if !self.mean.is_empty() {
            out.push('@');
            out.push_str(&self.mean);
            if !self.std_deviation.is_empty() {
                out.push('±');
                out.push_str(&self.std_deviation);
            }
        }
        if !self.unit.is_empty() {
            out.push(' ');
            out.push_str(&self.unit);
        }
        out
    }
}

impl fmt::Display for StatsValue {
    /// `<total>` or `<total> <unit>`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.unit.is_empty() {
            f.write_str(&self.total)
        } else {
            write!(f, "{} {}", self.total, self.unit)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ExecutionSummary {
    pub num_executions: String,
    pub checkpoint_time: String,
    pub execution_end_timestamp: String,
    pub execution_start_timestamp: String,
    pub num_checkpoints: String,
}

/// Snapshot of a node's execution statistics, keyed by stat name.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ExecutionStats {
    pub values: BTreeMap<String, StatsValue>,
    pub summary: ExecutionSummary,
}

impl ExecutionStats {
    /// Decode the typed snapshot from a raw stats map.
    ///
    /// A missing map yields the empty snapshot. Non-object entries are skipped.
    pub fn from_raw(raw: Option<&StatsMap>, strict: bool) -> Result<Self> {
        let mut out = Self::default();
        let Some(raw) = raw else {
            return Ok(out);
        };

        for (name, value) in raw.iter() {
            if name == EXECUTION_SUMMARY {
                if let Some(obj) = value.as_object() {
                    out.summary = decode_summary(obj, strict)?;
                }
                continue;
            }
            if strict && !KNOWN_STATS_FIELDS.contains(&name) {
                return Err(unknown(name));
            }
            if let Some(obj) = value.as_object() {
                out.values
                    .insert(name.to_string(), decode_value(name, obj, strict)?);
            }
        }
        Ok(out)
    }

    pub fn get(&self, name: &str) -> Option<&StatsValue> {
        self.values.get(name)
    }

    pub fn rows(&self) -> Option<&StatsValue> {
        self.get("rows")
    }

    pub fn latency(&self) -> Option<&StatsValue> {
        self.get("latency")
    }

    pub fn cpu_time(&self) -> Option<&StatsValue> {
        self.get("cpu_time")
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty() && self.summary == ExecutionSummary::default()
    }
}

fn unknown(path: impl Into<String>) -> Error {
    Error::UnknownStatsField { path: path.into() }
}

fn text(obj: &Map<String, Value>, key: &str) -> String {
    obj.get(key).map(value_text).unwrap_or_default()
}

fn check_keys(obj: &Map<String, Value>, known: &[&str], prefix: &str) -> Result<()> {
    match obj.keys().find(|k| !known.contains(&k.as_str())) {
        Some(k) => Err(unknown(format!("{prefix}.{k}"))),
        None => Ok(()),
    }
}

fn decode_value(name: &str, obj: &Map<String, Value>, strict: bool) -> Result<StatsValue> {
    if strict {
        check_keys(obj, KNOWN_VALUE_FIELDS, name)?;
    }
    let mut histogram = Vec::new();
    if let Some(buckets) = obj.get("histogram").and_then(Value::as_array) {
        for bucket in buckets.iter().filter_map(Value::as_object) {
            if strict {
                check_keys(bucket, KNOWN_HISTOGRAM_FIELDS, &format!("{name}.histogram"))?;
            }
            histogram.push(HistogramBucket {
                count: text(bucket, "count"),
                percentage: text(bucket, "percentage"),
                lower_bound: text(bucket, "lower_bound"),
                upper_bound: text(bucket, "upper_bound"),
            });
        }
    }
    Ok(StatsValue {
        unit: text(obj, "unit"),
        total: text(obj, "total"),
        mean: text(obj, "mean"),
        std_deviation: text(obj, "std_deviation"),
        histogram,
    })
}

fn decode_summary(obj: &Map<String, Value>, strict: bool) -> Result<ExecutionSummary> {
    if strict {
        check_keys(obj, KNOWN_SUMMARY_FIELDS, EXECUTION_SUMMARY)?;
    }
    Ok(ExecutionSummary {
        num_executions: text(obj, "num_executions"),
        checkpoint_time: text(obj, "checkpoint_time"),
        execution_end_timestamp: text(obj, "execution_end_timestamp"),
        execution_start_timestamp: text(obj, "execution_start_timestamp"),
        num_checkpoints: text(obj, "num_checkpoints"),
    })
}
