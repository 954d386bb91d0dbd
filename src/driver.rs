//! The seam between the handle and a concrete CQL driver.

use async_trait::async_trait;
use futures_util::TryStreamExt;
use futures_util::stream::BoxStream;

use crate::config::ConnectionOptions;
use crate::error::CqlMiddlewareError;
use crate::results::{CustomDbRow, ResultSet};
use crate::types::RowValues;

/// Rows produced one at a time by a streaming statement.
pub type RowStream = BoxStream<'static, Result<CustomDbRow, CqlMiddlewareError>>;

/// Something that can open a session to a cluster.
#[async_trait]
pub trait Driver: Send + Sync + 'static {
    type Client: CqlClient;

    /// Establish a client session with already validated options.
    async fn connect(&self, options: ConnectionOptions) -> Result<Self::Client, CqlMiddlewareError>;
}

/// A connected session.
#[async_trait]
pub trait CqlClient: Send + Sync + 'static {
    /// The options this client was connected with.
    fn options(&self) -> &ConnectionOptions;

    /// Run one statement and collect its rows.
    async fn execute(
        &self,
        statement: &str,
        params: &[RowValues],
    ) -> Result<ResultSet, CqlMiddlewareError>;

    /// Run one statement and hand rows back as they are paged in.
    async fn row_stream(
        &self,
        statement: &str,
        params: &[RowValues],
    ) -> Result<RowStream, CqlMiddlewareError>;

    /// Invoke a client operation by name.
    ///
    /// `"execute"` and `"each_row"` take the statement text as the first
    /// argument and bind the rest; clients override this to expose more.
    async fn call(
        &self,
        operation: &str,
        args: Vec<RowValues>,
    ) -> Result<ResultSet, CqlMiddlewareError> {
        call_statement_operation(self, operation, args).await
    }
}

/// The operations every client answers to by name.
///
/// Backends overriding [`CqlClient::call`] fall back to this for names they
/// do not handle themselves.
///
/// # Errors
/// Returns `CqlMiddlewareError::UnknownOperation` for any other name, or the
/// statement's error.
pub async fn call_statement_operation<C>(
    client: &C,
    operation: &str,
    args: Vec<RowValues>,
) -> Result<ResultSet, CqlMiddlewareError>
where
    C: CqlClient + ?Sized,
{
    match operation {
        "execute" => {
            let (statement, params) = split_statement_args(operation, &args)?;
            client.execute(statement, params).await
        }
        "each_row" => {
            let (statement, params) = split_statement_args(operation, &args)?;
            let rows: Vec<CustomDbRow> = client
                .row_stream(statement, params)
                .await?
                .try_collect()
                .await?;
            let mut result_set = ResultSet::with_capacity(rows.len());
            for row in rows {
                result_set.add_row(row);
            }
            Ok(result_set)
        }
        other => Err(CqlMiddlewareError::UnknownOperation(other.to_string())),
    }
}

/// Split `[statement, params...]` call arguments.
///
/// # Errors
/// Returns `CqlMiddlewareError::ParameterError` if the first argument is not text.
pub fn split_statement_args<'a>(
    operation: &str,
    args: &'a [RowValues],
) -> Result<(&'a str, &'a [RowValues]), CqlMiddlewareError> {
    match args.split_first() {
        Some((RowValues::Text(statement), params)) => Ok((statement.as_str(), params)),
        _ => Err(CqlMiddlewareError::ParameterError(format!(
            "{operation} expects the statement text as its first argument"
        ))),
    }
}
