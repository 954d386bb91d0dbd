//! Builders for the schema statements issued by the bootstrap helpers.
//!
//! Every builder returns a freshly formatted `String`; nothing is cached and
//! identifiers are passed through verbatim, so malformed names surface as
//! driver errors when the statement runs.

mod keyspace;
mod table;

pub use keyspace::{
    KeyspaceOptions, ReplicationClass, ReplicationSpec, create_keyspace_statement,
    use_keyspace_statement,
};
pub use table::{TableColumns, create_table_statement};

/// Render a CQL string literal, doubling embedded single quotes.
pub(crate) fn quote_literal(raw: &str) -> String {
    format!("'{}'", raw.replace('\'', "''"))
}
