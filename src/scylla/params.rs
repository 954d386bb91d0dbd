use chrono::NaiveDateTime;
use scylla::value::{CqlTimestamp, CqlValue};

use crate::types::RowValues;

fn timestamp_value(ts: &NaiveDateTime) -> CqlValue {
    CqlValue::Timestamp(CqlTimestamp(ts.and_utc().timestamp_millis()))
}

/// Convert bound parameters into values the driver can serialize.
///
/// `Null` becomes an unset optional; JSON is sent as its text rendering.
/// `Int` is always bound as a CQL `bigint`, so it only type-checks against
/// `bigint` columns; narrower integer columns need the statement to cast.
#[must_use]
pub fn convert_params(params: &[RowValues]) -> Vec<Option<CqlValue>> {
    params
        .iter()
        .map(|param| match param {
            RowValues::Int(i) => Some(CqlValue::BigInt(*i)),
            RowValues::Float(f) => Some(CqlValue::Double(*f)),
            RowValues::Text(s) => Some(CqlValue::Text(s.clone())),
            RowValues::Bool(b) => Some(CqlValue::Boolean(*b)),
            RowValues::Timestamp(ts) => Some(timestamp_value(ts)),
            RowValues::Null => None,
            RowValues::JSON(json) => Some(CqlValue::Text(json.to_string())),
            RowValues::Blob(bytes) => Some(CqlValue::Blob(bytes.clone())),
        })
        .collect()
}
