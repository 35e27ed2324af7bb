//! Query results.

use crate::value::Value;

/// Rows plus column names.
///
/// Returned both by backends and by the virtual INFORMATION_SCHEMA, so callers cannot tell a
/// locally answered statement from a forwarded one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    /// Column names in the response.
    pub columns: Vec<String>,
    /// Row data. Every row has one cell per column.
    pub rows: Vec<Vec<Value>>,
}

impl ResultSet {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self { columns, rows }
    }

    /// A result with no columns and no rows (OK packet on the wire).
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Position of a column, compared case-insensitively.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.eq_ignore_ascii_case(name))
    }

    /// All values of one column, in row order.
    pub fn column_values(&self, name: &str) -> Vec<&Value> {
        match self.column_index(name) {
            Some(idx) => self.rows.iter().filter_map(|row| row.get(idx)).collect(),
            None => Vec::new(),
        }
    }

    /// Rows rendered for the text protocol.
    pub fn text_rows(&self) -> Vec<Vec<Option<String>>> {
        self.rows
            .iter()
            .map(|row| row.iter().map(Value::to_text).collect())
            .collect()
    }
}
