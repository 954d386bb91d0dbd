use std::sync::Arc;

use crate::types::RowValues;

/// A single row returned by a CQL statement.
///
/// Column names are shared between every row of the same result so that
/// streaming large results does not clone them per row.
#[derive(Debug, Clone, PartialEq)]
pub struct CustomDbRow {
    /// Column names, in the order the server returned them
    pub column_names: Arc<Vec<String>>,
    /// Values, positionally aligned with `column_names`
    pub rows: Vec<RowValues>,
}

impl CustomDbRow {
    #[must_use]
    pub fn new(column_names: Arc<Vec<String>>, rows: Vec<RowValues>) -> Self {
        Self { column_names, rows }
    }

    #[must_use]
    pub fn get_column_index(&self, column_name: &str) -> Option<usize> {
        self.column_names.iter().position(|col| col == column_name)
    }

    /// Get a value from the row by column name
    #[must_use]
    pub fn get(&self, column_name: &str) -> Option<&RowValues> {
        self.get_column_index(column_name)
            .and_then(|idx| self.rows.get(idx))
    }

    #[must_use]
    pub fn get_by_index(&self, index: usize) -> Option<&RowValues> {
        self.rows.get(index)
    }
}
