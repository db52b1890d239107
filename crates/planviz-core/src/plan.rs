//! Decoded plan representation handed over by the decoder.
//!
//! Field names follow the protobuf JSON mapping of the plan payload
//! (`displayName`, `childLinks`, ...). Scalar fields that protobuf JSON omits
//! when zero (index 0, empty strings) default accordingly.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Relational operators form the tree; scalar nodes are expressions hanging off them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PlanNodeKind {
    #[default]
    #[serde(rename = "RELATIONAL", alias = "Relational", alias = "relational")]
    Relational,
    #[serde(rename = "SCALAR", alias = "Scalar", alias = "scalar")]
    Scalar,
}

/// Directed edge from a parent node to one of its children.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChildLink {
    #[serde(default, alias = "child_index", deserialize_with = "wire::index")]
    pub child_index: usize,

    /// Role of the child under its parent ("Input", "Residual Condition", ...); may be empty.
    #[serde(default, rename = "type", skip_serializing_if = "String::is_empty")]
    pub link_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variable: Option<String>,
}

impl ChildLink {
    pub fn new(child_index: usize, link_type: impl Into<String>) -> Self {
        Self {
            child_index,
            link_type: link_type.into(),
            variable: None,
        }
    }

    pub fn with_variable(mut self, variable: impl Into<String>) -> Self {
        self.variable = Some(variable.into());
        self
    }

    /// Variable binding name; an empty binding counts as none.
    pub fn variable(&self) -> Option<&str> {
        self.variable.as_deref().filter(|v| !v.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ShortRepresentation {
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub subqueries: BTreeMap<String, Value>,
}

/// Sorted string-keyed map of heterogeneous values.
///
/// Used for node metadata; iteration is always in key order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Metadata(BTreeMap<String, Value>);

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// String content of `key`, or "" when absent or not a string.
    pub fn get_str(&self, key: &str) -> &str {
        self.0.get(key).and_then(Value::as_str).unwrap_or("")
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Metadata {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Raw per-node execution statistics as decoded (nested object values).
///
/// `crate::stats::ExecutionStats` is the typed view.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatsMap(BTreeMap<String, Value>);

impl StatsMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for StatsMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// One operator or scalar expression of the plan.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanNode {
    #[serde(default, deserialize_with = "wire::index")]
    pub index: usize,

    #[serde(default)]
    pub kind: PlanNodeKind,

    #[serde(default, alias = "display_name")]
    pub display_name: String,

    #[serde(default, alias = "child_links", skip_serializing_if = "Vec::is_empty")]
    pub child_links: Vec<ChildLink>,

    #[serde(
        default,
        alias = "short_representation",
        skip_serializing_if = "Option::is_none"
    )]
    pub short_representation: Option<ShortRepresentation>,

    #[serde(default, skip_serializing_if = "Metadata::is_empty")]
    pub metadata: Metadata,

    #[serde(
        default,
        alias = "execution_stats",
        skip_serializing_if = "Option::is_none"
    )]
    pub execution_stats: Option<StatsMap>,
}

impl PlanNode {
    pub fn new(index: usize, kind: PlanNodeKind, display_name: impl Into<String>) -> Self {
        Self {
            index,
            kind,
            display_name: display_name.into(),
            ..Default::default()
        }
    }

    pub fn relational(index: usize, display_name: impl Into<String>) -> Self {
        Self::new(index, PlanNodeKind::Relational, display_name)
    }

    /// Scalar node carrying `description` as its short representation.
    pub fn scalar(
        index: usize,
        display_name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        let mut node = Self::new(index, PlanNodeKind::Scalar, display_name);
        node.short_representation = Some(ShortRepresentation {
            description: description.into(),
            ..Default::default()
        });
        node
    }

    pub fn with_link(mut self, link: ChildLink) -> Self {
        self.child_links.push(link);
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key, value);
        self
    }

    pub fn with_stats(mut self, stats: StatsMap) -> Self {
        self.execution_stats = Some(stats);
        self
    }

    /// Short representation description, or "" when the node has none.
    pub fn description(&self) -> &str {
        self.short_representation
            .as_ref()
            .map(|s| s.description.as_str())
            .unwrap_or("")
    }
}

/// Display text of a metadata value: strings verbatim, everything else as JSON.
pub fn value_text(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Display wrapper over `value_text`.
pub struct ValueText<'a>(pub &'a Value);

impl fmt::Display for ValueText<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Value::String(s) => f.write_str(s),
            other => write!(f, "{other}"),
        }
    }
}

mod wire {
    use serde::de::{self, Deserializer, Unexpected};
    use serde::Deserialize;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum IndexRepr {
        Number(u64),
        Text(String),
    }

    /// protobuf JSON may encode int32 fields as numbers or as decimal strings.
    pub(super) fn index<'de, D: Deserializer<'de>>(d: D) -> Result<usize, D::Error> {
        match IndexRepr::deserialize(d)? {
            IndexRepr::Number(n) => usize::try_from(n)
                .map_err(|_| de::Error::invalid_value(Unexpected::Unsigned(n), &"a node index")),
            IndexRepr::Text(s) => s
                .trim()
                .parse::<usize>()
                .map_err(|_| de::Error::invalid_value(Unexpected::Str(&s), &"a node index")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_protobuf_json_node() {
        let node: PlanNode = serde_json::from_value(serde_json::json!({
            "index": "3",
            "kind": "SCALAR",
            "displayName": "Function",
            "childLinks": [{"childIndex": 4}, {"childIndex": 5, "type": "Value", "variable": "v"}],
            "shortRepresentation": {"description": "($a > 1)"},
            "metadata": {"call_type": "Local"}
        }))
        .unwrap();

        assert_eq!(node.index, 3);
        assert_eq!(node.kind, PlanNodeKind::Scalar);
        assert_eq!(node.child_links[0], ChildLink::new(4, ""));
        assert_eq!(node.child_links[1].variable(), Some("v"));
        assert_eq!(node.description(), "($a > 1)");
        assert_eq!(node.metadata.get_str("call_type"), "Local");
    }

    #[test]
    fn omitted_fields_take_zero_defaults() {
        let node: PlanNode =
            serde_json::from_value(serde_json::json!({"displayName": "Union"})).unwrap();
        assert_eq!(node.index, 0);
        assert_eq!(node.kind, PlanNodeKind::Relational);
        assert!(node.child_links.is_empty());
        assert_eq!(node.description(), "");
    }

    #[test]
    fn empty_variable_is_no_binding() {
        let link = ChildLink::new(1, "").with_variable("");
        assert_eq!(link.variable(), None);
    }

    #[test]
    fn metadata_non_string_values_render_as_json() {
        let md: Metadata = [("n", Value::from(42)), ("b", Value::from(true))]
            .into_iter()
            .collect();
        assert_eq!(md.get_str("n"), "");
        assert_eq!(value_text(md.get("n").unwrap()), "42");
        assert_eq!(ValueText(md.get("b").unwrap()).to_string(), "true");
    }
}
