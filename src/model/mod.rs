//! The visual query model.
//!
//! This is the structured, editable representation of a query that the
//! graphical editor works on: a metric, label filters, an ordered operation
//! pipeline, and optional nested binary queries. The types serialize to the
//! camelCase JSON shape the editor consumes; empty and absent fields are
//! omitted.

use serde::{Deserialize, Serialize};

/// An editable query: metric + labels + operation chain + binary queries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisualQuery {
    pub metric: String,
    pub labels: Vec<LabelFilter>,
    /// Pipeline steps in application order: index 0 is applied first.
    pub operations: Vec<Operation>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub binary_queries: Vec<BinaryQuery>,
}

impl VisualQuery {
    /// A query with no metric, no labels and no operations carries no
    /// information.
    pub fn is_empty(&self) -> bool {
        self.metric.is_empty() && self.labels.is_empty() && self.operations.is_empty()
    }
}

/// A constraint on a label value.
///
/// `op` is one of `=`, `!=`, `=~`, `!~`. It is kept as a string rather than
/// an enum because best-effort recovery of a malformed matcher can leave it
/// empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelFilter {
    pub label: String,
    pub op: String,
    pub value: String,
}

/// One pipeline step: a function or aggregation id with its parameters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    pub id: String,
    pub params: Vec<OpValue>,
}

/// A single operation parameter.
///
/// Parameters are numbers or strings; comparison operations additionally
/// carry their `bool` modifier as a trailing boolean parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OpValue {
    Number(f64),
    String(String),
    Bool(bool),
}

impl From<f64> for OpValue {
    fn from(value: f64) -> Self {
        OpValue::Number(value)
    }
}

impl From<&str> for OpValue {
    fn from(value: &str) -> Self {
        OpValue::String(value.to_string())
    }
}

impl From<String> for OpValue {
    fn from(value: String) -> Self {
        OpValue::String(value)
    }
}

impl From<bool> for OpValue {
    fn from(value: bool) -> Self {
        OpValue::Bool(value)
    }
}

/// Which labels must align between the operands of a binary operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VectorMatchType {
    On,
    Ignoring,
}

/// A binary operation against a second query, owning the nested query for
/// its right-hand side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BinaryQuery {
    pub operator: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_bool: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vector_matches_type: Option<VectorMatchType>,
    /// Comma-joined label list from the vector-match clause.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vector_matches: Option<String>,
    pub query: VisualQuery,
}

/// A non-fatal diagnostic with optional offsets into the original input.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsingError {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_type: Option<String>,
}
