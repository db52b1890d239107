//! One-line node titles: `<operator phrase> [<method>] (<flags>, <fields>)`.

use serde_json::Value;

use planviz_core::config::{ExecutionMethodFormat, KnownFlagFormat, TargetMetadataFormat, TitleOptions};
use planviz_core::plan::{value_text, PlanNode};

/// Boolean metadata that `KnownFlagFormat::Label` turns into bare labels.
pub const KNOWN_FLAGS: &[&str] = &["Full scan", "split_ranges_aligned"];

/// `scan_type` without its trailing `Scan` (`TableScan` → `Table`).
pub fn scan_type_prefix(node: &PlanNode) -> &str {
    let scan_type = node.metadata.get_str("scan_type");
    scan_type.strip_suffix("Scan").unwrap_or(scan_type)
}

pub(crate) fn is_true(v: &Value) -> bool {
    match v {
        Value::Bool(b) => *b,
        Value::String(s) => s == "true",
        _ => false,
    }
}

fn join_non_empty<'a>(sep: &str, parts: impl IntoIterator<Item = &'a str>) -> String {
    parts
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(sep)
}

/// Format `node`'s title. Output depends only on the node and `opts`.
pub fn node_title(node: &PlanNode, opts: &TitleOptions) -> String {
    let md = &node.metadata;
    let sep = if opts.compact { "" } else { " " };

    let execution_method = md.get_str("execution_method");
    let target = match md.get_str("scan_target") {
        "" => md.get_str("distribution_table"),
        t => t,
    };

    let on_target = match opts.target_metadata {
        TargetMetadataFormat::On if !target.is_empty() => format!("on {target}"),
        _ => String::new(),
    };
    let operator = join_non_empty(
        " ",
        [
            md.get_str("call_type"),
            md.get_str("iterator_type"),
            scan_type_prefix(node),
            node.display_name.as_str(),
            on_target.as_str(),
        ],
    );

    let method = match opts.execution_method {
        ExecutionMethodFormat::Angle if !execution_method.is_empty() => {
            format!("<{execution_method}>")
        }
        _ => String::new(),
    };

    let suffix = if opts.hide_metadata {
        String::new()
    } else {
        metadata_suffix(node, opts, sep)
    };

    join_non_empty(sep, [operator.as_str(), method.as_str(), suffix.as_str()])
}

fn metadata_suffix(node: &PlanNode, opts: &TitleOptions, sep: &str) -> String {
    let mut labels: Vec<String> = Vec::new();
    let mut fields: Vec<String> = Vec::new();

    for (key, value) in node.metadata.iter() {
        match key {
            "call_type" | "iterator_type" | "scan_type" | "subquery_cluster_node" => continue,
            "scan_target" => {
                if opts.target_metadata == TargetMetadataFormat::Raw {
                    fields.push(format!("{}: {}", scan_type_prefix(node), value_text(value)));
                }
                continue;
            }
            "execution_method" if opts.execution_method != ExecutionMethodFormat::Raw => continue,
            "distribution_table" if opts.target_metadata != TargetMetadataFormat::Raw => continue,
            _ => {}
        }

        if opts.known_flag == KnownFlagFormat::Label && KNOWN_FLAGS.contains(&key) {
            if is_true(value) {
                labels.push(key.to_string());
            }
            continue;
        }
        fields.push(format!("{key}:{sep}{}", value_text(value)));
    }

    labels.sort();
    fields.sort();
    labels.append(&mut fields);
    if labels.is_empty() {
        return String::new();
    }
    format!("({})", labels.join(&format!(",{sep}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan() -> PlanNode {
        PlanNode::relational(1, "Scan")
            .with_metadata("scan_type", "IndexScan")
            .with_metadata("scan_target", "SongsBySingerAlbumSongNameDesc")
            .with_metadata("execution_method", "Row")
            .with_metadata("Full scan", "true")
            .with_metadata("seekable_key_size", "0")
    }

    #[test]
    fn raw_formats_list_everything_sorted() {
        assert_eq!(
            node_title(&scan(), &TitleOptions::default()),
            "Index Scan (Full scan: true, Index: SongsBySingerAlbumSongNameDesc, execution_method: Row, seekable_key_size: 0)"
        );
    }

    #[test]
    fn angle_on_and_label_formats() {
        let opts = TitleOptions {
            execution_method: ExecutionMethodFormat::Angle,
            target_metadata: TargetMetadataFormat::On,
            known_flag: KnownFlagFormat::Label,
            ..Default::default()
        };
        assert_eq!(
            node_title(&scan(), &opts),
            "Index Scan on SongsBySingerAlbumSongNameDesc <Row> (Full scan, seekable_key_size: 0)"
        );
    }

    #[test]
    fn compact_drops_separators() {
        let opts = TitleOptions {
            execution_method: ExecutionMethodFormat::Angle,
            known_flag: KnownFlagFormat::Label,
            compact: true,
            ..Default::default()
        };
        assert_eq!(
            node_title(&scan(), &opts),
            "Index Scan<Row>(Full scan,Index: SongsBySingerAlbumSongNameDesc,seekable_key_size:0)"
        );
    }

    #[test]
    fn false_label_flags_are_omitted() {
        let node = PlanNode::relational(0, "Distributed Union")
            .with_metadata("split_ranges_aligned", "false")
            .with_metadata("call_type", "Local")
            .with_metadata("subquery_cluster_node", "1");
        let opts = TitleOptions {
            known_flag: KnownFlagFormat::Label,
            ..Default::default()
        };
        assert_eq!(node_title(&node, &opts), "Local Distributed Union");
        assert_eq!(
            node_title(&node, &TitleOptions::default()),
            "Local Distributed Union (split_ranges_aligned: false)"
        );
    }

    #[test]
    fn distribution_table_is_the_on_fallback() {
        let node = PlanNode::relational(0, "Distributed Union")
            .with_metadata("distribution_table", "Singers");
        let on = TitleOptions {
            target_metadata: TargetMetadataFormat::On,
            ..Default::default()
        };
        assert_eq!(node_title(&node, &on), "Distributed Union on Singers");
        assert_eq!(
            node_title(&node, &TitleOptions::default()),
            "Distributed Union (distribution_table: Singers)"
        );
    }

    #[test]
    fn hide_metadata_keeps_operator_phrase() {
        let node = PlanNode::relational(3, "Table Scan")
            .with_metadata("scan_type", "Full Scan")
            .with_metadata("scan_target", "UsersTable");
        let opts = TitleOptions {
            hide_metadata: true,
            ..Default::default()
        };
        assert_eq!(node_title(&node, &opts), "Full  Table Scan");
    }

    #[test]
    fn boolean_flag_values_count_as_true() {
        let node = PlanNode::relational(0, "Scan").with_metadata("Full scan", true);
        let opts = TitleOptions {
            known_flag: KnownFlagFormat::Label,
            ..Default::default()
        };
        assert_eq!(node_title(&node, &opts), "Scan (Full scan)");
    }
}
