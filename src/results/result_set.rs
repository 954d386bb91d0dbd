use std::sync::Arc;

use super::row::CustomDbRow;
use crate::types::RowValues;

/// The outcome of executing one CQL statement.
///
/// Schema statements and writes come back with no rows and no column names.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    /// The rows returned by the statement
    pub results: Vec<CustomDbRow>,
    /// Number of rows the statement reported or returned
    pub rows_affected: usize,
    column_names: Option<Arc<Vec<String>>>,
}

impl ResultSet {
    #[must_use]
    pub fn with_capacity(capacity: usize) -> ResultSet {
        ResultSet {
            results: Vec::with_capacity(capacity),
            rows_affected: 0,
            column_names: None,
        }
    }

    /// Set the column names shared by all rows added afterwards
    pub fn set_column_names(&mut self, column_names: Arc<Vec<String>>) {
        self.column_names = Some(column_names);
    }

    #[must_use]
    pub fn get_column_names(&self) -> Option<&Arc<Vec<String>>> {
        self.column_names.as_ref()
    }

    /// Append a row built from raw values.
    ///
    /// Rows are dropped when no column names have been set yet.
    pub fn add_row_values(&mut self, row_values: Vec<RowValues>) {
        if let Some(column_names) = &self.column_names {
            self.results
                .push(CustomDbRow::new(Arc::clone(column_names), row_values));
            self.rows_affected += 1;
        }
    }

    pub fn add_row(&mut self, row: CustomDbRow) {
        if self.column_names.is_none() {
            self.column_names = Some(Arc::clone(&row.column_names));
        }
        self.results.push(row);
        self.rows_affected += 1;
    }

    /// Number of rows carried by this result
    #[must_use]
    pub fn row_length(&self) -> usize {
        self.results.len()
    }

    #[must_use]
    pub fn first(&self) -> Option<&CustomDbRow> {
        self.results.first()
    }
}

/// Completion value of a row-streaming call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RowStreamSummary {
    /// Rows handed to the per-row callback
    pub row_length: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_share_column_names_and_resolve_by_name() {
        let mut rs = ResultSet::with_capacity(2);
        rs.add_row_values(vec![RowValues::Int(1)]);
        assert_eq!(rs.row_length(), 0, "rows without column names are dropped");

        rs.set_column_names(Arc::new(vec!["key".into(), "value".into()]));
        rs.add_row_values(vec![RowValues::Text("local".into()), RowValues::Null]);
        rs.add_row_values(vec![RowValues::Text("peer".into()), RowValues::Int(7)]);

        assert_eq!(rs.row_length(), 2);
        assert_eq!(rs.rows_affected, 2);
        let first = rs.first().expect("first row");
        assert_eq!(first.get("key"), Some(&RowValues::Text("local".into())));
        assert_eq!(first.get("missing"), None);
        assert!(Arc::ptr_eq(&rs.results[0].column_names, &rs.results[1].column_names));
        assert_eq!(rs.results[1].get_by_index(1), Some(&RowValues::Int(7)));
    }
}
