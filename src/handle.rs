use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures_util::TryStreamExt;
use futures_util::future::{BoxFuture, FutureExt, Shared};
use tracing::{debug, trace};

use crate::config::OptionsSource;
use crate::driver::{CqlClient, Driver};
use crate::error::CqlMiddlewareError;
use crate::query_builder::{
    KeyspaceOptions, TableColumns, create_keyspace_statement, create_table_statement,
    use_keyspace_statement,
};
use crate::results::{CustomDbRow, ResultSet, RowStreamSummary};
use crate::types::RowValues;

/// The single connection attempt of a handle, shared by every caller.
///
/// Cloning yields the same underlying attempt; once it settles, every clone
/// resolves immediately to the same client or the same error.
pub type ConnectionFuture<C> = Shared<BoxFuture<'static, Result<Arc<C>, CqlMiddlewareError>>>;

struct HandleState<C> {
    options: OptionsSource,
    connection: Option<ConnectionFuture<C>>,
}

/// Lazily connected handle to a cluster.
///
/// Nothing touches the network until the first operation that needs the
/// client. From then on the handle owns exactly one connection attempt;
/// a failed attempt stays failed, and recovering means building a new handle.
///
/// ```rust,no_run
/// # #[cfg(feature = "scylla")]
/// # async fn demo() -> Result<(), cql_middleware::CqlMiddlewareError> {
/// use cql_middleware::prelude::*;
/// use cql_middleware::scylla::ScyllaDriver;
///
/// let handle = ConnectionHandle::new(ScyllaDriver);
/// handle
///     .create_keyspace_if_missing("testspace", KeyspaceOptions::default())
///     .await?;
/// handle
///     .create_table_if_missing(
///         "testtable",
///         &TableColumns::from([("key", "uuid primary key"), ("value", "text")]),
///     )
///     .await?;
/// let rows = handle.execute("select key from system.local", &[]).await?;
/// # let _ = rows;
/// # Ok(()) }
/// ```
pub struct ConnectionHandle<D: Driver> {
    driver: Arc<D>,
    state: Mutex<HandleState<D::Client>>,
}

impl<D: Driver> ConnectionHandle<D> {
    /// Handle using options from `CASSANDRA_CONTACT_POINTS` (or the loopback address).
    pub fn new(driver: D) -> Self {
        Self::with_options(driver, OptionsSource::default())
    }

    pub fn with_options(driver: D, options: impl Into<OptionsSource>) -> Self {
        Self {
            driver: Arc::new(driver),
            state: Mutex::new(HandleState {
                options: options.into(),
                connection: None,
            }),
        }
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    fn lock_state(&self) -> MutexGuard<'_, HandleState<D::Client>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace the stored options.
    ///
    /// # Errors
    /// Returns `CqlMiddlewareError::AlreadyConnected` once the connection has been
    /// requested; the running attempt keeps the options it started with.
    pub fn configure(&self, options: impl Into<OptionsSource>) -> Result<(), CqlMiddlewareError> {
        let mut state = self.lock_state();
        if state.connection.is_some() {
            return Err(CqlMiddlewareError::AlreadyConnected(
                "options cannot change after the connection has been requested".to_string(),
            ));
        }
        state.options = options.into();
        Ok(())
    }

    /// The options as stored, possibly still pending.
    pub fn effective_options(&self) -> OptionsSource {
        self.lock_state().options.clone()
    }

    /// Whether the connection attempt has been created.
    pub fn is_connection_started(&self) -> bool {
        self.lock_state().connection.is_some()
    }

    /// The shared connection attempt, created on first call.
    ///
    /// Resolves the stored options (awaiting them if pending), validates
    /// them and calls the driver's `connect` exactly once per handle.
    pub fn connection(&self) -> ConnectionFuture<D::Client> {
        let mut state = self.lock_state();
        if let Some(existing) = &state.connection {
            return existing.clone();
        }

        let driver = Arc::clone(&self.driver);
        let source = state.options.clone();
        let attempt = async move {
            let options = source.resolve().await?;
            options.validate()?;
            debug!(contact_points = ?options.contact_points, "connecting to cluster");
            let client = driver.connect(options).await?;
            debug!("cluster connection established");
            Ok::<_, CqlMiddlewareError>(Arc::new(client))
        }
        .boxed()
        .shared();

        state.connection = Some(attempt.clone());
        attempt
    }

    /// Create `name` unless it exists, then switch the session to it.
    ///
    /// The `USE` statement runs on every call and only after the create
    /// statement succeeded.
    ///
    /// # Errors
    /// Returns the connection error, or the first failing statement's error.
    pub async fn create_keyspace_if_missing(
        &self,
        name: &str,
        options: KeyspaceOptions,
    ) -> Result<(), CqlMiddlewareError> {
        debug!(keyspace = name, "creating keyspace if missing");
        self.execute(&create_keyspace_statement(name, &options), &[])
            .await?;
        self.execute(&use_keyspace_statement(name), &[]).await?;
        Ok(())
    }

    /// # Errors
    /// Returns the connection error or the driver's statement error, e.g. when
    /// an existing table has a different schema.
    pub async fn create_table_if_missing(
        &self,
        name: &str,
        columns: &TableColumns,
    ) -> Result<(), CqlMiddlewareError> {
        debug!(table = name, columns = columns.len(), "creating table if missing");
        self.execute(&create_table_statement(name, columns), &[])
            .await?;
        Ok(())
    }

    /// Run a statement on the connected client.
    ///
    /// # Errors
    /// Returns the connection error or the driver's statement error.
    pub async fn execute(
        &self,
        statement: &str,
        params: &[RowValues],
    ) -> Result<ResultSet, CqlMiddlewareError> {
        let client = self.connection().await?;
        trace!(statement, "execute");
        client.execute(statement, params).await
    }

    /// Stream a statement's rows into `on_row`, called with the row's
    /// position and the row itself.
    ///
    /// Resolves after the last row has been delivered.
    ///
    /// # Errors
    /// Returns the connection error or the first error raised while paging.
    pub async fn each_row<F>(
        &self,
        statement: &str,
        params: &[RowValues],
        mut on_row: F,
    ) -> Result<RowStreamSummary, CqlMiddlewareError>
    where
        F: FnMut(usize, &CustomDbRow) + Send,
    {
        let client = self.connection().await?;
        trace!(statement, "each_row");
        let mut rows = client.row_stream(statement, params).await?;
        let mut row_length = 0;
        while let Some(row) = rows.try_next().await? {
            on_row(row_length, &row);
            row_length += 1;
        }
        Ok(RowStreamSummary { row_length })
    }

    /// Run arbitrary work against the connected client.
    ///
    /// # Errors
    /// Returns the connection error or whatever `work` returns.
    pub async fn with_client<F, Fut, T>(&self, work: F) -> Result<T, CqlMiddlewareError>
    where
        F: FnOnce(Arc<D::Client>) -> Fut,
        Fut: Future<Output = Result<T, CqlMiddlewareError>>,
    {
        let client = self.connection().await?;
        work(client).await
    }
}

impl<D: Driver> std::fmt::Debug for ConnectionHandle<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock_state();
        f.debug_struct("ConnectionHandle")
            .field("options", &state.options)
            .field("connection_started", &state.connection.is_some())
            .finish_non_exhaustive()
    }
}
