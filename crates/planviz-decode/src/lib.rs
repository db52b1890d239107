#![forbid(unsafe_code)]
//! planviz-decode: YAML/JSON plan payloads → `DecodedPlan`.
//!
//! Design:
//! - Input is parsed once as YAML (JSON is a subset) into an untyped value.
//! - The wire shape is chosen by probing top-level keys, in order:
//!     * `queryPlan`  → result set stats (`queryPlan` + `queryStats`)
//!     * `planNodes`  → bare query plan
//!     * `stats`      → full result set (`stats` + `metadata.rowType`)
//!   A top-level sequence is taken as a bare node array.
//! - Field names are protobuf-JSON camelCase; snake_case aliases are accepted.
//!
//! Every failure is `Error::InputFormat` quoting the start of the input.

use serde::Deserialize;
use serde_yaml::{Mapping, Value};
use tracing::debug;

use planviz_core::error::{Error, Result};
use planviz_core::graph::PlanGraph;
use planviz_core::plan::PlanNode;
use planviz_core::schema::{QueryStats, RowType};

/// Which of the accepted payload shapes the input turned out to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputShape {
    NodeArray,
    QueryPlan,
    ResultSetStats,
    ResultSet,
}

impl InputShape {
    pub fn as_str(&self) -> &'static str {
        match self {
            InputShape::NodeArray => "node array",
            InputShape::QueryPlan => "query plan",
            InputShape::ResultSetStats => "result set stats",
            InputShape::ResultSet => "result set",
        }
    }
}

/// Plan nodes plus whatever query-level context the payload carried.
#[derive(Debug, Clone)]
pub struct DecodedPlan {
    pub shape: InputShape,
    pub nodes: Vec<PlanNode>,
    pub query_stats: Option<QueryStats>,
    pub row_type: Option<RowType>,
}

/// A decoded plan whose nodes already passed graph validation.
#[derive(Debug, Clone)]
pub struct LoadedPlan {
    pub shape: InputShape,
    pub graph: PlanGraph,
    pub query_stats: Option<QueryStats>,
    pub row_type: Option<RowType>,
}

impl DecodedPlan {
    pub fn into_loaded(self) -> Result<LoadedPlan> {
        Ok(LoadedPlan {
            shape: self.shape,
            graph: PlanGraph::new(self.nodes)?,
            query_stats: self.query_stats,
            row_type: self.row_type,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryPlanWire {
    #[serde(default, alias = "plan_nodes")]
    plan_nodes: Vec<PlanNode>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResultSetStatsWire {
    #[serde(default, alias = "query_plan")]
    query_plan: Option<QueryPlanWire>,
    #[serde(default, alias = "query_stats")]
    query_stats: Option<QueryStats>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResultSetMetadataWire {
    #[serde(default, alias = "row_type")]
    row_type: Option<RowType>,
}

#[derive(Debug, Default, Deserialize)]
struct ResultSetWire {
    #[serde(default)]
    metadata: Option<ResultSetMetadataWire>,
    #[serde(default)]
    stats: Option<ResultSetStatsWire>,
}

fn has_key(map: &Mapping, names: &[&str]) -> bool {
    names.iter().any(|n| map.contains_key(*n))
}

fn detect(doc: &Value) -> Option<InputShape> {
    match doc {
        Value::Sequence(_) => Some(InputShape::NodeArray),
        Value::Mapping(map) if has_key(map, &["queryPlan", "query_plan"]) => {
            Some(InputShape::ResultSetStats)
        }
        Value::Mapping(map) if has_key(map, &["planNodes", "plan_nodes"]) => {
            Some(InputShape::QueryPlan)
        }
        Value::Mapping(map) if map.contains_key("stats") => Some(InputShape::ResultSet),
        _ => None,
    }
}

fn typed<T: for<'de> Deserialize<'de>>(doc: Value, src: &str) -> Result<T> {
    serde_yaml::from_value(doc).map_err(|e| Error::input_format(e.to_string(), src))
}

/// Decode a plan payload in any of the accepted shapes.
pub fn decode_plan(src: &str) -> Result<DecodedPlan> {
    let doc: Value =
        serde_yaml::from_str(src).map_err(|e| Error::input_format(e.to_string(), src))?;

    let shape = detect(&doc).ok_or_else(|| Error::input_format("unknown input format", src))?;

    let (nodes, query_stats, row_type) = match shape {
        InputShape::NodeArray => (typed::<Vec<PlanNode>>(doc, src)?, None, None),
        InputShape::QueryPlan => (typed::<QueryPlanWire>(doc, src)?.plan_nodes, None, None),
        InputShape::ResultSetStats => {
            let rss: ResultSetStatsWire = typed(doc, src)?;
            let nodes = rss.query_plan.unwrap_or_default().plan_nodes;
            (nodes, rss.query_stats, None)
        }
        InputShape::ResultSet => {
            let rs: ResultSetWire = typed(doc, src)?;
            let stats = rs.stats.unwrap_or_default();
            let row_type = rs.metadata.and_then(|m| m.row_type);
            (
                stats.query_plan.unwrap_or_default().plan_nodes,
                stats.query_stats,
                row_type,
            )
        }
    };

    if nodes.is_empty() {
        return Err(Error::input_format(
            format!("{} contains no plan nodes", shape.as_str()),
            src,
        ));
    }

    debug!(shape = shape.as_str(), nodes = nodes.len(), "decoded plan");
    Ok(DecodedPlan {
        shape,
        nodes,
        query_stats,
        row_type,
    })
}

/// `decode_plan` followed by graph construction.
pub fn load_plan(src: &str) -> Result<LoadedPlan> {
    decode_plan(src)?.into_loaded()
}

#[cfg(test)]
mod tests {
    use super::*;
    use planviz_core::plan::PlanNodeKind;

    const BARE: &str = r#"
planNodes:
- displayName: Distributed Union
  childLinks:
  - childIndex: 1
  metadata:
    subquery_cluster_node: "1"
- index: 1
  displayName: Scan
  metadata:
    scan_type: TableScan
    scan_target: Singers
"#;

    #[test]
    fn bare_query_plan() {
        let plan = decode_plan(BARE).unwrap();
        assert_eq!(plan.shape, InputShape::QueryPlan);
        assert_eq!(plan.nodes.len(), 2);
        assert_eq!(plan.nodes[0].index, 0);
        assert_eq!(plan.nodes[1].metadata.get_str("scan_target"), "Singers");
        assert!(plan.query_stats.is_none());
    }

    #[test]
    fn result_set_stats_json() {
        let src = r#"{"queryPlan": {"planNodes": [{"displayName": "Unit Relation"}]},
                      "queryStats": {"query_text": "SELECT 1", "elapsed_time": "1 msecs"}}"#;
        let plan = decode_plan(src).unwrap();
        assert_eq!(plan.shape, InputShape::ResultSetStats);
        assert_eq!(plan.query_stats.unwrap().query_text(), "SELECT 1");
    }

    #[test]
    fn full_result_set_carries_row_type() {
        let src = r#"
metadata:
  rowType:
    fields:
    - name: SingerId
      type: {code: INT64}
    - {}
stats:
  queryPlan:
    planNodes:
    - displayName: Serialize Result
      childLinks: [{childIndex: 1}]
    - index: 1
      kind: SCALAR
      displayName: Reference
      shortRepresentation: {description: SingerId}
"#;
        let plan = decode_plan(src).unwrap();
        assert_eq!(plan.shape, InputShape::ResultSet);
        let rt = plan.row_type.unwrap();
        assert_eq!(rt.column_name(0), "SingerId");
        assert_eq!(rt.column_name(1), "no_name<1>");
        assert_eq!(plan.nodes[1].kind, PlanNodeKind::Scalar);
    }

    #[test]
    fn top_level_sequence_is_node_array() {
        let plan = decode_plan("- displayName: Scan\n").unwrap();
        assert_eq!(plan.shape, InputShape::NodeArray);
        assert_eq!(plan.nodes[0].display_name, "Scan");
    }

    #[test]
    fn unknown_shape_is_input_format_error() {
        let err = decode_plan("foo: 1\n").unwrap_err();
        match err {
            Error::InputFormat { reason, snippet } => {
                assert_eq!(reason, "unknown input format");
                assert_eq!(snippet, "foo: 1");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn empty_plan_is_input_format_error() {
        assert!(matches!(
            decode_plan("planNodes: []\n"),
            Err(Error::InputFormat { .. })
        ));
        assert!(matches!(decode_plan(""), Err(Error::InputFormat { .. })));
    }

    #[test]
    fn load_plan_surfaces_reference_errors() {
        let src = "planNodes:\n- displayName: Union\n  childLinks: [{childIndex: 3}]\n";
        assert!(matches!(load_plan(src), Err(Error::Reference { child: 3, .. })));
        assert_eq!(load_plan(BARE).unwrap().graph.len(), 2);
    }
}
