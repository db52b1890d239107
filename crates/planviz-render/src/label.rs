//! Target-neutral label content for one plan node.
//!
//! `LabelContent` holds every section already formatted but unescaped; the
//! dialects in `escape` decide markup and escaping. Sections, in order:
//! title, short representation, scan info, serialize result, non-variable
//! scalars, metadata, variable scalars, execution stats, execution summary.

use chrono::DateTime;
use tracing::warn;

use planviz_core::config::{RenderOptions, TitleOptions};
use planviz_core::error::{Error, Result};
use planviz_core::graph::{ChildLinkGroup, PlanGraph};
use planviz_core::plan::{value_text, PlanNode, StatsMap};
use planviz_core::schema::RowType;
use planviz_core::stats::{ExecutionStats, StatsValue, EXECUTION_SUMMARY};

use crate::title::{node_title, scan_type_prefix};

/// Metadata that the title or scan-info line already shows, or that means nothing to a reader.
pub const INTERNAL_METADATA: &[&str] = &[
    "call_type",
    "scan_type",
    "scan_target",
    "iterator_type",
    "subquery_cluster_node",
];

const SERIALIZE_RESULT: &str = "Serialize Result";

#[derive(Debug, Clone, PartialEq, Default)]
pub struct LabelContent {
    pub title: String,
    pub short_representation: String,
    /// `<scan type>: <target>`.
    pub scan_info: Option<String>,
    /// `Result.<column>:<description>`.
    pub serialize_result: Vec<String>,
    pub non_variable_scalars: Vec<String>,
    /// Sorted by key.
    pub metadata: Vec<(String, String)>,
    pub variable_scalars: Vec<String>,
    /// Sorted by stat name.
    pub stats: Vec<(String, String)>,
    /// Sorted by key; timestamps already converted or annotated.
    pub execution_summary: Option<Vec<(String, String)>>,
}

impl LabelContent {
    /// Every section below the title, as plain lines. Metadata reads `key=value`.
    pub fn body_lines(&self) -> Vec<String> {
        let mut lines = Vec::new();
        if !self.short_representation.is_empty() {
            lines.push(self.short_representation.clone());
        }
        lines.extend(self.scan_info.iter().cloned());
        lines.extend(self.serialize_result.iter().cloned());
        lines.extend(self.non_variable_scalars.iter().cloned());
        lines.extend(self.metadata.iter().map(|(k, v)| format!("{k}={v}")));
        lines.extend(self.variable_scalars.iter().cloned());
        lines
    }

    /// Stats then the summary block, as plain lines.
    pub fn stats_lines(&self) -> Vec<String> {
        let mut lines: Vec<String> = self.stats.iter().map(|(k, v)| format!("{k}: {v}")).collect();
        lines.extend(self.summary_lines());
        lines
    }

    /// `execution_summary:` followed by indented `key: value` lines.
    pub fn summary_lines(&self) -> Vec<String> {
        let Some(summary) = &self.execution_summary else {
            return Vec::new();
        };
        let mut lines = vec![format!("{EXECUTION_SUMMARY}:")];
        lines.extend(summary.iter().map(|(k, v)| format!("   {k}: {v}")));
        lines
    }
}

pub struct LabelContentBuilder<'a> {
    graph: &'a PlanGraph,
    options: &'a RenderOptions,
    row_type: Option<&'a RowType>,
}

impl<'a> LabelContentBuilder<'a> {
    pub fn new(graph: &'a PlanGraph, options: &'a RenderOptions, row_type: Option<&'a RowType>) -> Self {
        Self {
            graph,
            options,
            row_type,
        }
    }

    pub fn build(&self, node: &PlanNode) -> Result<LabelContent> {
        let opts = self.options;
        let sections = &opts.sections;

        // Strict mode validates the raw stats even though labels render them untyped.
        ExecutionStats::from_raw(node.execution_stats.as_ref(), opts.strict_stats)?;

        let title_opts = TitleOptions {
            hide_metadata: true,
            ..opts.title.clone()
        };
        let short_representation = node.description().to_string();

        let scan_info = self
            .scan_info(node)
            .filter(|info| !duplicates_short_representation(info, &short_representation));

        let non_variable = self.graph.non_variable_child_links(node);

        let serialize_result = match self.row_type {
            Some(rt) if sections.serialize_result && node.display_name == SERIALIZE_RESULT => {
                serialize_result_lines(rt, &non_variable)
            }
            _ => Vec::new(),
        };

        let non_variable_scalars = if sections.non_variable_scalar {
            child_link_lines(&non_variable)
        } else {
            Vec::new()
        };

        let metadata = if sections.metadata {
            node.metadata
                .iter()
                .filter(|(k, _)| !INTERNAL_METADATA.contains(k) && !opts.is_hidden_metadata(k))
                .map(|(k, v)| (k.to_string(), value_text(v)))
                .collect()
        } else {
            Vec::new()
        };

        let variable_scalars = if sections.variable_scalar {
            child_link_lines(&self.graph.variable_child_links(node))
        } else {
            Vec::new()
        };

        let raw_stats = node.execution_stats.as_ref();
        let stats = match raw_stats {
            Some(raw) if sections.execution_stats => stats_pairs(raw),
            _ => Vec::new(),
        };
        let execution_summary = match raw_stats {
            Some(raw) if sections.execution_summary => summary_pairs(raw),
            _ => None,
        };

        Ok(LabelContent {
            title: node_title(node, &title_opts),
            short_representation,
            scan_info,
            serialize_result,
            non_variable_scalars,
            metadata,
            variable_scalars,
            stats,
            execution_summary,
        })
    }

    fn scan_info(&self, node: &PlanNode) -> Option<String> {
        let md = &node.metadata;
        if self.options.hide_scan_target
            || !md.contains_key("scan_type")
            || !md.contains_key("scan_target")
        {
            return None;
        }
        Some(format!(
            "{}: {}",
            scan_type_prefix(node),
            md.get_str("scan_target")
        ))
    }
}

/// A scan-info line that repeats the short representation verbatim adds nothing.
pub fn duplicates_short_representation(scan_info: &str, short_representation: &str) -> bool {
    scan_info == short_representation
}

fn serialize_result_lines(row_type: &RowType, groups: &[ChildLinkGroup<'_>]) -> Vec<String> {
    groups
        .iter()
        .filter(|g| g.link_type.is_empty())
        .flat_map(|g| {
            g.entries.iter().enumerate().map(|(i, e)| {
                format!("Result.{}:{}", row_type.column_name(i), e.node.description())
            })
        })
        .collect()
}

/// Scalar link groups as label lines.
///
/// Untyped and `Value` groups get no prefix, single-member groups a
/// `<type>: ` prefix, larger groups a `<type>:` header and indented members.
/// Untyped members without a variable are output columns and are skipped.
pub fn child_link_lines(groups: &[ChildLinkGroup<'_>]) -> Vec<String> {
    let mut lines = Vec::new();
    for group in groups {
        let mut prefix = String::new();
        if !group.link_type.is_empty() && group.link_type != "Value" {
            if group.entries.len() == 1 {
                prefix = format!("{}: ", group.link_type);
            } else {
                prefix = "  ".to_string();
                lines.push(format!("{}:", group.link_type));
            }
        }
        for entry in &group.entries {
            let description = entry.node.description();
            match entry.variable {
                None if group.link_type.is_empty() => continue,
                None => lines.push(format!("{prefix}{description}")),
                Some(var) => lines.push(format!("{prefix}${var}:={description}")),
            }
        }
    }
    lines
}

fn stats_pairs(raw: &StatsMap) -> Vec<(String, String)> {
    raw.iter()
        .filter(|(k, _)| *k != EXECUTION_SUMMARY)
        .filter_map(|(k, v)| {
            StatsValue::from_value(v).map(|s| (k.to_string(), s.distribution_text()))
        })
        .collect()
}

fn summary_pairs(raw: &StatsMap) -> Option<Vec<(String, String)>> {
    let summary = raw.get(EXECUTION_SUMMARY)?.as_object()?;
    let mut pairs: Vec<(String, String)> = summary
        .iter()
        .map(|(k, v)| {
            let text = value_text(v);
            let shown = if k.ends_with("timestamp") {
                annotate_timestamp(&text)
            } else {
                text
            };
            (k.clone(), shown)
        })
        .collect();
    pairs.sort();
    Some(pairs)
}

fn annotate_timestamp(raw: &str) -> String {
    match format_timestamp(raw) {
        Ok(ts) => ts,
        Err(Error::TimestampFormat { reason, .. }) => {
            warn!(value = raw, %reason, "invalid execution summary timestamp");
            format!("{raw} (invalid timestamp: {reason})")
        }
        Err(other) => format!("{raw} (invalid timestamp: {other})"),
    }
}

/// `<epoch seconds>.<6-digit microseconds>` → `YYYY-MM-DDTHH:MM:SS.ffffffZ`.
pub fn format_timestamp(raw: &str) -> Result<String> {
    let fail = |reason: &str| Error::TimestampFormat {
        value: raw.to_string(),
        reason: reason.to_string(),
    };

    let (secs, micros) = raw
        .split_once('.')
        .ok_or_else(|| fail("expected <seconds>.<microseconds>"))?;
    if micros.len() != 6 || !micros.bytes().all(|b| b.is_ascii_digit()) {
        return Err(fail("fractional part must be exactly 6 digits"));
    }
    if secs.is_empty() || !secs.bytes().all(|b| b.is_ascii_digit()) {
        return Err(fail("seconds must be unsigned digits"));
    }
    let secs: i64 = secs.parse().map_err(|_| fail("seconds are not an integer"))?;
    let micros: u32 = micros
        .parse()
        .map_err(|_| fail("microseconds are not an integer"))?;

    let ts = DateTime::from_timestamp(secs, micros * 1_000).ok_or_else(|| fail("out of range"))?;
    Ok(ts.format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string())
}
