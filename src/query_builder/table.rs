use serde_json::Value as JsonValue;

use crate::error::CqlMiddlewareError;

/// Ordered column declarations for `CREATE TABLE`.
///
/// Insertion order is the column order of the generated statement.
/// ```rust
/// use cql_middleware::prelude::*;
///
/// let columns = TableColumns::new()
///     .column("key", "uuid primary key")
///     .column("value", "text");
/// assert_eq!(
///     create_table_statement("testtable", &columns),
///     "CREATE TABLE IF NOT EXISTS testtable (key uuid primary key, value text)"
/// );
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableColumns(Vec<(String, String)>);

impl TableColumns {
    #[must_use]
    pub fn new() -> Self {
        Self(Vec::new())
    }

    #[must_use]
    pub fn column(mut self, name: impl Into<String>, declaration: impl Into<String>) -> Self {
        self.push(name, declaration);
        self
    }

    pub fn push(&mut self, name: impl Into<String>, declaration: impl Into<String>) {
        self.0.push((name.into(), declaration.into()));
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(n, d)| (n.as_str(), d.as_str()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Build from a JSON object of `{"column": "declaration"}`, keeping key order.
    ///
    /// # Errors
    /// Returns `CqlMiddlewareError::ParameterError` if the value is not an object of strings.
    pub fn from_json(value: &JsonValue) -> Result<Self, CqlMiddlewareError> {
        let map = value.as_object().ok_or_else(|| {
            CqlMiddlewareError::ParameterError("columns must be a mapping".to_string())
        })?;
        map.iter()
            .map(|(name, decl)| match decl.as_str() {
                Some(decl) => Ok((name.clone(), decl.to_string())),
                None => Err(CqlMiddlewareError::ParameterError(format!(
                    "declaration for column '{name}' must be a string"
                ))),
            })
            .collect()
    }

    /// `name declaration` pairs joined by `", "`.
    #[must_use]
    pub fn render(&self) -> String {
        self.iter()
            .map(|(name, decl)| format!("{name} {decl}"))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl<N: Into<String>, D: Into<String>> FromIterator<(N, D)> for TableColumns {
    fn from_iter<I: IntoIterator<Item = (N, D)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(n, d)| (n.into(), d.into()))
                .collect(),
        )
    }
}

impl<N: Into<String>, D: Into<String>, const K: usize> From<[(N, D); K]> for TableColumns {
    fn from(columns: [(N, D); K]) -> Self {
        columns.into_iter().collect()
    }
}

#[must_use]
pub fn create_table_statement(name: &str, columns: &TableColumns) -> String {
    format!("CREATE TABLE IF NOT EXISTS {name} ({})", columns.render())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_columns_keep_insertion_order() {
        let columns = TableColumns::from_json(&json!({
            "value": "text",
            "key": "uuid primary key"
        }))
        .unwrap();
        assert_eq!(
            create_table_statement("t", &columns),
            "CREATE TABLE IF NOT EXISTS t (value text, key uuid primary key)"
        );
    }

    #[test]
    fn non_string_declarations_are_rejected() {
        assert!(matches!(
            TableColumns::from_json(&json!({"key": 1})),
            Err(CqlMiddlewareError::ParameterError(_))
        ));
        assert!(matches!(
            TableColumns::from_json(&json!(["key", "text"])),
            Err(CqlMiddlewareError::ParameterError(_))
        ));
    }

    #[test]
    fn array_conversion_matches_builder() {
        let from_array = TableColumns::from([("key", "uuid primary key"), ("value", "text")]);
        let built = TableColumns::new()
            .column("key", "uuid primary key")
            .column("value", "text");
        assert_eq!(from_array, built);
        assert_eq!(built.len(), 2);
    }
}
