//! Catalog metadata models.
//!
//! Database, schema, table and column names travel as plain strings; the
//! only structured result is the single-row table preview.

use serde::Serialize;
use serde_json::{Map, Value};
use utoipa::ToSchema;

/// First row of a table as an ordered `column -> value` mapping.
///
/// Keys keep the table's column order. An empty table yields an empty
/// mapping, which serializes as `{}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
#[serde(transparent)]
#[schema(value_type = Object)]
pub struct TablePreview(Map<String, Value>);

impl TablePreview {
    /// Creates an empty preview.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a column value. A repeated column name keeps its first
    /// position and takes the latest value.
    pub fn insert(&mut self, column: impl Into<String>, value: Value) {
        self.0.insert(column.into(), value);
    }

    /// Returns the value of a column.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.0.get(column)
    }

    /// Column names in table order.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
