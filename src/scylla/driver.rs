use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use scylla::client::execution_profile::ExecutionProfile;
use scylla::client::session::Session;
use scylla::client::session_builder::SessionBuilder;
use scylla::policies::load_balancing::DefaultPolicy;
use scylla::value::Row;
use tracing::info;

use super::params::convert_params;
use super::query::{build_result_set, column_names_of, cql_to_row_value};
use crate::config::ConnectionOptions;
use crate::driver::{CqlClient, Driver, RowStream, call_statement_operation};
use crate::error::CqlMiddlewareError;
use crate::results::{CustomDbRow, ResultSet};
use crate::types::RowValues;

/// Opens sessions with the `scylla` driver.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScyllaDriver;

#[async_trait]
impl Driver for ScyllaDriver {
    type Client = ScyllaClient;

    async fn connect(&self, options: ConnectionOptions) -> Result<ScyllaClient, CqlMiddlewareError> {
        info!("Connecting to cluster: {:?}", options.contact_points);

        let mut builder = SessionBuilder::new().known_nodes(&options.contact_points);
        if let Some(timeout_ms) = options.connect_timeout_ms {
            builder = builder.connection_timeout(Duration::from_millis(timeout_ms));
        }
        if let Some(keyspace) = &options.keyspace {
            builder = builder.use_keyspace(keyspace, false);
        }
        if let Some(data_center) = &options.local_data_center {
            let policy = DefaultPolicy::builder()
                .prefer_datacenter(data_center.clone())
                .token_aware(true)
                .build();
            let profile = ExecutionProfile::builder()
                .load_balancing_policy(policy)
                .build();
            builder = builder.default_execution_profile_handle(profile.into_handle());
        }

        let session = builder.build().await.map_err(|e| {
            CqlMiddlewareError::ConnectionError(format!("Failed to connect: {e}"))
        })?;

        Ok(ScyllaClient {
            session: Arc::new(session),
            options,
        })
    }
}

/// A connected `scylla` session.
#[derive(Clone)]
pub struct ScyllaClient {
    session: Arc<Session>,
    options: ConnectionOptions,
}

impl ScyllaClient {
    /// The underlying driver session, for operations this crate does not wrap.
    #[must_use]
    pub fn session(&self) -> &Session {
        &self.session
    }
}

impl std::fmt::Debug for ScyllaClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScyllaClient")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl CqlClient for ScyllaClient {
    fn options(&self) -> &ConnectionOptions {
        &self.options
    }

    async fn execute(
        &self,
        statement: &str,
        params: &[RowValues],
    ) -> Result<ResultSet, CqlMiddlewareError> {
        let result = self
            .session
            .query_unpaged(statement, convert_params(params))
            .await
            .map_err(|e| CqlMiddlewareError::ExecutionError(e.to_string()))?;
        build_result_set(result)
    }

    async fn row_stream(
        &self,
        statement: &str,
        params: &[RowValues],
    ) -> Result<RowStream, CqlMiddlewareError> {
        let pager = self
            .session
            .query_iter(statement, convert_params(params))
            .await
            .map_err(|e| CqlMiddlewareError::ExecutionError(e.to_string()))?;
        let column_names = column_names_of(pager.column_specs().iter().map(|spec| spec.name()));
        let rows = pager
            .rows_stream::<Row>()
            .map_err(|e| CqlMiddlewareError::ExecutionError(e.to_string()))?;

        Ok(rows
            .map(move |row| {
                row.map(|row| {
                    CustomDbRow::new(
                        Arc::clone(&column_names),
                        row.columns.into_iter().map(cql_to_row_value).collect(),
                    )
                })
                .map_err(|e| CqlMiddlewareError::ExecutionError(e.to_string()))
            })
            .boxed())
    }

    /// Adds `use_keyspace` (`[Text name]`) to the statement operations.
    async fn call(
        &self,
        operation: &str,
        args: Vec<RowValues>,
    ) -> Result<ResultSet, CqlMiddlewareError> {
        match operation {
            "use_keyspace" => {
                let Some(RowValues::Text(name)) = args.first() else {
                    return Err(CqlMiddlewareError::ParameterError(
                        "use_keyspace expects the keyspace name".to_string(),
                    ));
                };
                self.session
                    .use_keyspace(name, false)
                    .await
                    .map_err(|e| CqlMiddlewareError::ExecutionError(e.to_string()))?;
                Ok(ResultSet::default())
            }
            _ => call_statement_operation(self, operation, args).await,
        }
    }
}
