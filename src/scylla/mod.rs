//! ScyllaDB / Apache Cassandra backend built on the `scylla` driver.

mod driver;
mod params;
mod query;

pub use driver::{ScyllaClient, ScyllaDriver};
pub use params::convert_params;
pub use query::{build_result_set, cql_to_row_value};
