use std::sync::Arc;

use chrono::DateTime;
use scylla::response::query_result::QueryResult;
use scylla::value::{CqlValue, Row};

use crate::error::CqlMiddlewareError;
use crate::results::ResultSet;
use crate::types::RowValues;

/// Map a driver value onto the shared value type.
///
/// Uuids and inet addresses are rendered as text; collections and other
/// composite values fall back to their debug rendering.
#[must_use]
pub fn cql_to_row_value(value: Option<CqlValue>) -> RowValues {
    let Some(value) = value else {
        return RowValues::Null;
    };
    match value {
        CqlValue::Ascii(s) | CqlValue::Text(s) => RowValues::Text(s),
        CqlValue::Boolean(b) => RowValues::Bool(b),
        CqlValue::BigInt(i) => RowValues::Int(i),
        CqlValue::Int(i) => RowValues::Int(i.into()),
        CqlValue::SmallInt(i) => RowValues::Int(i.into()),
        CqlValue::TinyInt(i) => RowValues::Int(i.into()),
        CqlValue::Counter(counter) => RowValues::Int(counter.0),
        CqlValue::Double(f) => RowValues::Float(f),
        CqlValue::Float(f) => RowValues::Float(f.into()),
        CqlValue::Blob(bytes) => RowValues::Blob(bytes),
        CqlValue::Timestamp(ts) => DateTime::from_timestamp_millis(ts.0)
            .map_or(RowValues::Null, |dt| RowValues::Timestamp(dt.naive_utc())),
        CqlValue::Uuid(uuid) => RowValues::Text(uuid.to_string()),
        CqlValue::Inet(addr) => RowValues::Text(addr.to_string()),
        other => RowValues::Text(format!("{other:?}")),
    }
}

pub(crate) fn column_names_of<'a, I>(names: I) -> Arc<Vec<String>>
where
    I: IntoIterator<Item = &'a str>,
{
    Arc::new(names.into_iter().map(str::to_string).collect())
}

/// Collect an unpaged result into a `ResultSet`.
///
/// # Errors
/// Returns `CqlMiddlewareError::ExecutionError` if the rows cannot be deserialized.
pub fn build_result_set(result: QueryResult) -> Result<ResultSet, CqlMiddlewareError> {
    if !result.is_rows() {
        return Ok(ResultSet::default());
    }
    let rows_result = result
        .into_rows_result()
        .map_err(|e| CqlMiddlewareError::ExecutionError(e.to_string()))?;

    let mut result_set = ResultSet::with_capacity(rows_result.rows_num());
    result_set.set_column_names(column_names_of(
        rows_result.column_specs().iter().map(|spec| spec.name()),
    ));
    let rows = rows_result
        .rows::<Row>()
        .map_err(|e| CqlMiddlewareError::ExecutionError(e.to_string()))?;
    for row in rows {
        let row = row.map_err(|e| CqlMiddlewareError::ExecutionError(e.to_string()))?;
        result_set.add_row_values(row.columns.into_iter().map(cql_to_row_value).collect());
    }
    Ok(result_set)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_values_map_onto_row_values() {
        assert_eq!(cql_to_row_value(None), RowValues::Null);
        assert_eq!(
            cql_to_row_value(Some(CqlValue::Int(5))),
            RowValues::Int(5)
        );
        assert_eq!(
            cql_to_row_value(Some(CqlValue::Text("local".into()))),
            RowValues::Text("local".into())
        );
        assert_eq!(
            cql_to_row_value(Some(CqlValue::Boolean(true))),
            RowValues::Bool(true)
        );
    }
}
