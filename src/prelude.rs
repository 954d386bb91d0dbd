//! Convenient imports for common functionality.

pub use crate::config::{ConnectionOptions, OptionsSource};
pub use crate::driver::{CqlClient, Driver, RowStream};
pub use crate::error::CqlMiddlewareError;
pub use crate::handle::{ConnectionFuture, ConnectionHandle};
pub use crate::proxy::{Dispatched, HandleOperation};
pub use crate::query_builder::{
    KeyspaceOptions, ReplicationClass, ReplicationSpec, TableColumns, create_keyspace_statement,
    create_table_statement, use_keyspace_statement,
};
pub use crate::results::{CustomDbRow, ResultSet, RowStreamSummary};
pub use crate::types::RowValues;

#[cfg(feature = "scylla")]
pub use crate::scylla::{ScyllaClient, ScyllaDriver};
