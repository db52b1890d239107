//! Result row type and query-level statistics that accompany a plan.
//!
//! Both are optional: a bare plan carries neither, a stats wrapper carries
//! query stats, a full result set carries both.

use std::borrow::Cow;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::plan::value_text;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RowField {
    #[serde(default)]
    pub name: String,
    /// Opaque column type payload; only carried through.
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub field_type: Option<Value>,
}

impl RowField {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            field_type: None,
        }
    }
}

/// Output columns of the query, in result order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RowType {
    #[serde(default)]
    pub fields: Vec<RowField>,
}

impl RowType {
    pub fn new(fields: Vec<RowField>) -> Self {
        Self { fields }
    }

    pub fn field(&self, idx: usize) -> Option<&RowField> {
        self.fields.get(idx)
    }

    /// Name of the `idx`-th column; anonymous (or missing) columns read `no_name<idx>`.
    pub fn column_name(&self, idx: usize) -> Cow<'_, str> {
        match self.field(idx) {
            Some(f) if !f.name.is_empty() => Cow::Borrowed(f.name.as_str()),
            _ => Cow::Owned(format!("no_name<{idx}>")),
        }
    }
}

/// Query-level statistics (`query_text`, `elapsed_time`, ...).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueryStats(BTreeMap<String, Value>);

impl QueryStats {
    pub const QUERY_TEXT: &'static str = "query_text";

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn query_text(&self) -> &str {
        self.0
            .get(Self::QUERY_TEXT)
            .and_then(Value::as_str)
            .unwrap_or("")
    }

    /// `key: value` lines for every stat except the query text, sorted.
    pub fn stat_lines(&self) -> Vec<String> {
        let mut lines: Vec<String> = self
            .0
            .iter()
            .filter(|(k, _)| k.as_str() != Self::QUERY_TEXT)
            .map(|(k, v)| format!("{}: {}", k, value_text(v)))
            .collect();
        lines.sort();
        lines
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for QueryStats {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}
