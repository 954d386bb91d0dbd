//! A lazily connected, memoized CQL connection handle.
//!
//! [`ConnectionHandle`] owns the connection options and creates exactly one
//! shared connection attempt the first time something needs the client.
//! On top of that it offers idempotent keyspace and table bootstrap helpers,
//! typed pass-through of statements, and name-based dispatch
//! ([`ConnectionHandle::invoke`]) that forwards unknown operations to the
//! connected client.

pub mod config;
pub mod driver;
pub mod error;
pub mod handle;
pub mod prelude;
pub mod proxy;
pub mod query_builder;
pub mod results;
pub mod types;

#[cfg(feature = "scylla")]
pub mod scylla;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use config::{ConnectionOptions, OptionsSource};
pub use driver::{CqlClient, Driver, RowStream};
pub use error::CqlMiddlewareError;
pub use handle::{ConnectionFuture, ConnectionHandle};
pub use proxy::{Dispatched, HandleOperation};
pub use results::{CustomDbRow, ResultSet, RowStreamSummary};
pub use types::RowValues;
