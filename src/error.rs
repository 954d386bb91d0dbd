use thiserror::Error;

/// Errors surfaced by the connection handle and its backends.
///
/// Driver errors are carried as rendered strings so that a single cached
/// connection failure can be cloned out to every caller awaiting the shared
/// connection future.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CqlMiddlewareError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("CQL execution error: {0}")]
    ExecutionError(String),

    #[error("Parameter error: {0}")]
    ParameterError(String),

    #[error("Unknown operation: {0}")]
    UnknownOperation(String),

    #[error("Handle already connected: {0}")]
    AlreadyConnected(String),

    #[error("Other database error: {0}")]
    Other(String),
}

impl From<serde_json::Error> for CqlMiddlewareError {
    fn from(err: serde_json::Error) -> Self {
        CqlMiddlewareError::ConfigError(format!("invalid options mapping: {err}"))
    }
}
