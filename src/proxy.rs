//! Name-based dispatch over a [`ConnectionHandle`].
//!
//! Operations the handle defines itself are served directly; every other
//! name is forwarded to the connected client once the connection resolves.

use std::sync::Arc;

use tracing::debug;

use crate::config::{ConnectionOptions, OptionsSource};
use crate::driver::{CqlClient, Driver};
use crate::error::CqlMiddlewareError;
use crate::handle::ConnectionHandle;
use crate::query_builder::{KeyspaceOptions, ReplicationSpec, TableColumns};
use crate::results::ResultSet;
use crate::types::RowValues;

/// Operations served by the handle itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandleOperation {
    /// `[Text name, JSON replication | Null, Bool durable_writes]`
    CreateKeyspaceIfMissing,
    /// `[Text name, JSON {"column": "declaration"}]`
    CreateTableIfMissing,
    Connection,
    EffectiveOptions,
    /// `[JSON options mapping]`
    Configure,
}

impl HandleOperation {
    pub const ALL: [HandleOperation; 5] = [
        HandleOperation::CreateKeyspaceIfMissing,
        HandleOperation::CreateTableIfMissing,
        HandleOperation::Connection,
        HandleOperation::EffectiveOptions,
        HandleOperation::Configure,
    ];

    /// Names this operation answers to.
    #[must_use]
    pub fn names(self) -> &'static [&'static str] {
        match self {
            HandleOperation::CreateKeyspaceIfMissing => {
                &["create_keyspace_if_missing", "create_keyspace"]
            }
            HandleOperation::CreateTableIfMissing => &["create_table_if_missing", "create_table"],
            HandleOperation::Connection => &["connection"],
            HandleOperation::EffectiveOptions => &["effective_options", "options"],
            HandleOperation::Configure => &["configure"],
        }
    }

    #[must_use]
    pub fn lookup(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|op| op.names().contains(&name))
    }

    /// Whether serving this operation waits on the connection.
    #[must_use]
    pub fn needs_connection(self) -> bool {
        !matches!(
            self,
            HandleOperation::EffectiveOptions | HandleOperation::Configure
        )
    }
}

/// What an invoked operation produced.
pub enum Dispatched<C> {
    /// A handle operation with no value to return
    Done,
    /// Rows from a forwarded client operation
    Rows(ResultSet),
    /// The connected client
    Client(Arc<C>),
    Options(OptionsSource),
}

impl<C> Dispatched<C> {
    #[must_use]
    pub fn into_result_set(self) -> Option<ResultSet> {
        match self {
            Dispatched::Rows(result_set) => Some(result_set),
            _ => None,
        }
    }

    #[must_use]
    pub fn into_client(self) -> Option<Arc<C>> {
        match self {
            Dispatched::Client(client) => Some(client),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_done(&self) -> bool {
        matches!(self, Dispatched::Done)
    }
}

impl<C> std::fmt::Debug for Dispatched<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Done => f.write_str("Done"),
            Self::Rows(rows) => f.debug_tuple("Rows").field(rows).finish(),
            Self::Client(_) => f.debug_tuple("Client").field(&"<client>").finish(),
            Self::Options(options) => f.debug_tuple("Options").field(options).finish(),
        }
    }
}

impl<D: Driver> ConnectionHandle<D> {
    /// Invoke an operation by name.
    ///
    /// Handle operations (see [`HandleOperation`]) run directly; any other
    /// name waits for the connection and is passed to [`CqlClient::call`].
    ///
    /// # Errors
    /// Returns `CqlMiddlewareError::ParameterError` for malformed arguments,
    /// the cached connection error, or the error of the operation itself.
    pub async fn invoke(
        &self,
        operation: &str,
        args: Vec<RowValues>,
    ) -> Result<Dispatched<D::Client>, CqlMiddlewareError> {
        let Some(op) = HandleOperation::lookup(operation) else {
            return self.forward(operation, args).await.map(Dispatched::Rows);
        };
        debug!(
            operation,
            needs_connection = op.needs_connection(),
            "serving handle operation"
        );

        match op {
            HandleOperation::CreateKeyspaceIfMissing => {
                let (name, options) = keyspace_args(operation, &args)?;
                self.create_keyspace_if_missing(name, options).await?;
                Ok(Dispatched::Done)
            }
            HandleOperation::CreateTableIfMissing => {
                let (name, columns) = table_args(operation, &args)?;
                self.create_table_if_missing(name, &columns).await?;
                Ok(Dispatched::Done)
            }
            HandleOperation::Connection => self.connection().await.map(Dispatched::Client),
            HandleOperation::EffectiveOptions => Ok(Dispatched::Options(self.effective_options())),
            HandleOperation::Configure => {
                self.configure(configure_args(operation, &args)?)?;
                Ok(Dispatched::Done)
            }
        }
    }

    /// Call a client operation by name once the connection has resolved.
    ///
    /// # Errors
    /// Returns the cached connection error or the client's error.
    pub async fn forward(
        &self,
        operation: &str,
        args: Vec<RowValues>,
    ) -> Result<ResultSet, CqlMiddlewareError> {
        debug!(operation, "forwarding to connected client");
        let client = self.connection().await?;
        client.call(operation, args).await
    }
}

fn text_arg<'a>(
    operation: &str,
    args: &'a [RowValues],
    position: usize,
) -> Result<&'a str, CqlMiddlewareError> {
    args.get(position)
        .and_then(RowValues::as_text)
        .ok_or_else(|| {
            CqlMiddlewareError::ParameterError(format!(
                "{operation} expects text at argument {position}"
            ))
        })
}

fn keyspace_args<'a>(
    operation: &str,
    args: &'a [RowValues],
) -> Result<(&'a str, KeyspaceOptions), CqlMiddlewareError> {
    let name = text_arg(operation, args, 0)?;
    let replication = match args.get(1) {
        None | Some(RowValues::Null) => ReplicationSpec::default(),
        Some(RowValues::JSON(value)) => ReplicationSpec::from_json(value)?,
        Some(other) => {
            return Err(CqlMiddlewareError::ParameterError(format!(
                "{operation} expects a replication mapping at argument 1, got {other:?}"
            )));
        }
    };
    let durable_writes = match args.get(2) {
        None | Some(RowValues::Null) => false,
        Some(RowValues::Bool(flag)) => *flag,
        Some(other) => {
            return Err(CqlMiddlewareError::ParameterError(format!(
                "{operation} expects a boolean at argument 2, got {other:?}"
            )));
        }
    };
    Ok((
        name,
        KeyspaceOptions::default()
            .with_replication(replication)
            .with_durable_writes(durable_writes),
    ))
}

fn table_args<'a>(
    operation: &str,
    args: &'a [RowValues],
) -> Result<(&'a str, TableColumns), CqlMiddlewareError> {
    let name = text_arg(operation, args, 0)?;
    match args.get(1) {
        Some(RowValues::JSON(value)) => Ok((name, TableColumns::from_json(value)?)),
        _ => Err(CqlMiddlewareError::ParameterError(format!(
            "{operation} expects a column mapping at argument 1"
        ))),
    }
}

fn configure_args(
    operation: &str,
    args: &[RowValues],
) -> Result<ConnectionOptions, CqlMiddlewareError> {
    match args.first() {
        Some(RowValues::JSON(value)) => ConnectionOptions::from_json(value.clone()),
        _ => Err(CqlMiddlewareError::ParameterError(format!(
            "{operation} expects an options mapping at argument 0"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn lookup_covers_names_and_aliases() {
        assert_eq!(
            HandleOperation::lookup("create_keyspace"),
            Some(HandleOperation::CreateKeyspaceIfMissing)
        );
        assert_eq!(
            HandleOperation::lookup("create_table_if_missing"),
            Some(HandleOperation::CreateTableIfMissing)
        );
        assert_eq!(HandleOperation::lookup("options"), Some(HandleOperation::EffectiveOptions));
        assert_eq!(HandleOperation::lookup("execute"), None);
        assert_eq!(HandleOperation::lookup("Connection"), None);
        assert!(!HandleOperation::Configure.needs_connection());
        assert!(HandleOperation::Connection.needs_connection());
    }

    #[test]
    fn keyspace_args_default_and_explicit() {
        let name_only = vec![RowValues::from("ks")];
        let (name, options) = keyspace_args("create_keyspace", &name_only).unwrap();
        assert_eq!(name, "ks");
        assert_eq!(options, KeyspaceOptions::default());

        let args = vec![
            RowValues::from("ks"),
            RowValues::JSON(json!({"class": "SimpleStrategy", "replication_factor": 3})),
            RowValues::Bool(true),
        ];
        let (_, options) = keyspace_args("create_keyspace", &args).unwrap();
        assert_eq!(options.replication, ReplicationSpec::simple(3));
        assert!(options.durable_writes);

        let bad = vec![RowValues::from("ks"), RowValues::Int(3)];
        assert!(matches!(
            keyspace_args("create_keyspace", &bad),
            Err(CqlMiddlewareError::ParameterError(_))
        ));
    }

    #[test]
    fn table_and_configure_args_need_mappings() {
        assert!(table_args("create_table", &[RowValues::from("t")]).is_err());
        let args = vec![
            RowValues::from("t"),
            RowValues::JSON(json!({"key": "int primary key"})),
        ];
        let (name, columns) = table_args("create_table", &args).unwrap();
        assert_eq!(name, "t");
        assert_eq!(columns.len(), 1);

        let options = configure_args(
            "configure",
            &[RowValues::JSON(json!({"contactPoints": ["localhost"]}))],
        )
        .unwrap();
        assert_eq!(options.contact_points, vec!["localhost".to_string()]);
        assert!(configure_args("configure", &[]).is_err());
    }
}
