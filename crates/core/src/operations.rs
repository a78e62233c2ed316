use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::value::Value;

pub type ColumnValues = BTreeMap<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BinaryPred {
    Eq,
    Gt,
    Lt,
    Le,
    Ge,
}

impl BinaryPred {
    pub fn sql_operator(&self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Gt => ">",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Ge => ">=",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RangePred {
    In,
    NotIn,
}

type BinaryTriple = (String, BinaryPred, Value);
type RangeTriple = (String, RangePred, Vec<Value>);

/// `column <pred> value`. On the wire: `[column, pred, value]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "BinaryTriple", into = "BinaryTriple")]
pub struct BinaryCondition {
    pub column: String,
    pub pred: BinaryPred,
    pub value: Value,
}

impl BinaryCondition {
    pub fn new(column: impl Into<String>, pred: BinaryPred, value: impl Into<Value>) -> Self {
        Self {
            column: column.into(),
            pred,
            value: value.into(),
        }
    }

    pub fn equals(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(column, BinaryPred::Eq, value)
    }
}

impl From<BinaryTriple> for BinaryCondition {
    fn from((column, pred, value): BinaryTriple) -> Self {
        Self { column, pred, value }
    }
}

impl From<BinaryCondition> for BinaryTriple {
    fn from(c: BinaryCondition) -> Self {
        (c.column, c.pred, c.value)
    }
}

/// `column [NOT] IN (values)`. On the wire: `[column, pred, [values]]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RangeTriple", into = "RangeTriple")]
pub struct RangeCondition {
    pub column: String,
    pub pred: RangePred,
    pub values: Vec<Value>,
}

impl RangeCondition {
    pub fn new<V: Into<Value>>(
        column: impl Into<String>,
        pred: RangePred,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        Self {
            column: column.into(),
            pred,
            values: values.into_iter().map(Into::into).collect(),
        }
    }
}

impl From<RangeTriple> for RangeCondition {
    fn from((column, pred, values): RangeTriple) -> Self {
        Self { column, pred, values }
    }
}

impl From<RangeCondition> for RangeTriple {
    fn from(c: RangeCondition) -> Self {
        (c.column, c.pred, c.values)
    }
}

/// One data mutation against a named table.
///
/// Condition lists of a single operation are combined with AND; an empty
/// list matches every row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Operation {
    #[serde(rename = "insert")]
    Insert {
        #[serde(rename = "tableName")]
        table: String,
        values: ColumnValues,
    },
    #[serde(rename = "delete")]
    Delete {
        #[serde(rename = "tableName")]
        table: String,
        #[serde(rename = "deleteBinaryConditions", default)]
        binary_conditions: Vec<BinaryCondition>,
        #[serde(rename = "deleteRangeConditions", default)]
        range_conditions: Vec<RangeCondition>,
    },
    #[serde(rename = "update")]
    Update {
        #[serde(rename = "tableName")]
        table: String,
        #[serde(rename = "updateBinaryConditions", default)]
        binary_conditions: Vec<BinaryCondition>,
        #[serde(rename = "updateRangeConditions", default)]
        range_conditions: Vec<RangeCondition>,
        #[serde(rename = "newValues")]
        new_values: ColumnValues,
    },
    /// Upsert: update the rows matching the conditions, or insert one row
    /// when nothing matches.
    #[serde(rename = "merge")]
    Merge {
        #[serde(rename = "tableName")]
        table: String,
        #[serde(rename = "mergeBinaryConditions", default)]
        binary_conditions: Vec<BinaryCondition>,
        #[serde(rename = "mergeRangeConditions", default)]
        range_conditions: Vec<RangeCondition>,
        #[serde(rename = "whenMatchedThenUpdate", default)]
        when_matched: ColumnValues,
        #[serde(rename = "whenNotMatchedThenInsert", default)]
        when_not_matched: ColumnValues,
    },
}

impl Operation {
    pub fn table(&self) -> &str {
        match self {
            Self::Insert { table, .. }
            | Self::Delete { table, .. }
            | Self::Update { table, .. }
            | Self::Merge { table, .. } => table,
        }
    }

    /// Operation kind as it appears in the `type` tag.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Insert { .. } => "insert",
            Self::Delete { .. } => "delete",
            Self::Update { .. } => "update",
            Self::Merge { .. } => "merge",
        }
    }
}

/// Builds a column map from `(column, value)` pairs.
pub fn columns<K, V, I>(pairs: I) -> ColumnValues
where
    K: Into<String>,
    V: Into<Value>,
    I: IntoIterator<Item = (K, V)>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}
