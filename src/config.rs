use std::future::Future;

use futures_util::future::{BoxFuture, FutureExt, Shared};
use serde::{Deserialize, Serialize};

use crate::error::CqlMiddlewareError;

/// Environment variable holding a comma-separated list of contact points.
pub const CONTACT_POINTS_ENV: &str = "CASSANDRA_CONTACT_POINTS";

/// Contact point used when neither options nor the environment name one.
pub const DEFAULT_CONTACT_POINT: &str = "127.0.0.1";

/// Connection parameters handed to the driver's `connect`.
///
/// Deserializes from the driver-style mapping, e.g.
/// `{"contactPoints": ["10.0.0.1", "10.0.0.2"], "keyspace": "app"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionOptions {
    #[serde(default)]
    pub contact_points: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keyspace: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_data_center: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connect_timeout_ms: Option<u64>,
}

impl ConnectionOptions {
    #[must_use]
    pub fn new<I, S>(contact_points: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            contact_points: contact_points.into_iter().map(Into::into).collect(),
            keyspace: None,
            local_data_center: None,
            connect_timeout_ms: None,
        }
    }

    /// Options taken from `CASSANDRA_CONTACT_POINTS`, or the loopback address.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_contact_list(std::env::var(CONTACT_POINTS_ENV).ok().as_deref())
    }

    /// Parse a comma-separated contact list; `None` or a list with no usable
    /// entries falls back to [`DEFAULT_CONTACT_POINT`].
    #[must_use]
    pub fn from_contact_list(raw: Option<&str>) -> Self {
        let points: Vec<String> = raw
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect();
        if points.is_empty() {
            Self::new([DEFAULT_CONTACT_POINT])
        } else {
            Self::new(points)
        }
    }

    /// Parse options from a JSON mapping.
    ///
    /// # Errors
    /// Returns `CqlMiddlewareError::ConfigError` if the mapping does not have the expected shape.
    pub fn from_json(value: serde_json::Value) -> Result<Self, CqlMiddlewareError> {
        Ok(serde_json::from_value(value)?)
    }

    #[must_use]
    pub fn with_keyspace(mut self, keyspace: impl Into<String>) -> Self {
        self.keyspace = Some(keyspace.into());
        self
    }

    #[must_use]
    pub fn with_local_data_center(mut self, data_center: impl Into<String>) -> Self {
        self.local_data_center = Some(data_center.into());
        self
    }

    #[must_use]
    pub fn with_connect_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.connect_timeout_ms = Some(timeout_ms);
        self
    }

    /// Check the options before they reach the driver.
    ///
    /// # Errors
    /// Returns `CqlMiddlewareError::ConfigError` if there are no contact points or one of them is blank.
    pub fn validate(&self) -> Result<(), CqlMiddlewareError> {
        if self.contact_points.is_empty() {
            return Err(CqlMiddlewareError::ConfigError(
                "contactPoints is required".to_string(),
            ));
        }
        if self.contact_points.iter().any(|p| p.trim().is_empty()) {
            return Err(CqlMiddlewareError::ConfigError(
                "contactPoints must not contain blank entries".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for ConnectionOptions {
    fn default() -> Self {
        Self::from_env()
    }
}

/// Options that may still be on their way.
pub type PendingOptions = Shared<BoxFuture<'static, Result<ConnectionOptions, CqlMiddlewareError>>>;

/// Where a handle gets its connection options from.
#[derive(Clone)]
pub enum OptionsSource {
    /// Options known up front
    Ready(ConnectionOptions),
    /// Options produced by a future, awaited on first connection
    Pending(PendingOptions),
}

impl OptionsSource {
    /// Wrap a future that produces options.
    pub fn pending<F>(future: F) -> Self
    where
        F: Future<Output = Result<ConnectionOptions, CqlMiddlewareError>> + Send + 'static,
    {
        OptionsSource::Pending(future.boxed().shared())
    }

    #[must_use]
    pub fn is_pending(&self) -> bool {
        match self {
            OptionsSource::Ready(_) => false,
            OptionsSource::Pending(future) => future.peek().is_none(),
        }
    }

    /// The options, if known without waiting.
    #[must_use]
    pub fn peek(&self) -> Option<&ConnectionOptions> {
        match self {
            OptionsSource::Ready(options) => Some(options),
            OptionsSource::Pending(future) => future.peek().and_then(|res| res.as_ref().ok()),
        }
    }

    /// Wait for the options.
    ///
    /// # Errors
    /// Returns whatever error the pending future produced, unchanged.
    pub async fn resolve(self) -> Result<ConnectionOptions, CqlMiddlewareError> {
        match self {
            OptionsSource::Ready(options) => Ok(options),
            OptionsSource::Pending(future) => future.await,
        }
    }
}

impl Default for OptionsSource {
    fn default() -> Self {
        OptionsSource::Ready(ConnectionOptions::from_env())
    }
}

impl From<ConnectionOptions> for OptionsSource {
    fn from(options: ConnectionOptions) -> Self {
        OptionsSource::Ready(options)
    }
}

impl std::fmt::Debug for OptionsSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ready(options) => f.debug_tuple("Ready").field(options).finish(),
            Self::Pending(future) => match future.peek() {
                Some(resolved) => f.debug_tuple("Pending").field(resolved).finish(),
                None => f.debug_tuple("Pending").field(&"<unresolved>").finish(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn contact_list_falls_back_to_loopback() {
        assert_eq!(
            ConnectionOptions::from_contact_list(None).contact_points,
            vec![DEFAULT_CONTACT_POINT.to_string()]
        );
        assert_eq!(
            ConnectionOptions::from_contact_list(Some(" , ")).contact_points,
            vec![DEFAULT_CONTACT_POINT.to_string()]
        );
        assert_eq!(
            ConnectionOptions::from_contact_list(Some("10.0.0.1, 10.0.0.2")).contact_points,
            vec!["10.0.0.1".to_string(), "10.0.0.2".to_string()]
        );
    }

    #[test]
    fn json_mapping_uses_driver_key_names() {
        let options = ConnectionOptions::from_json(json!({
            "contactPoints": ["localhost"],
            "keyspace": "app",
            "connectTimeoutMs": 500
        }))
        .unwrap();
        assert_eq!(options.contact_points, vec!["localhost".to_string()]);
        assert_eq!(options.keyspace.as_deref(), Some("app"));
        assert_eq!(options.connect_timeout_ms, Some(500));
        options.validate().unwrap();
    }

    #[test]
    fn validate_rejects_missing_or_blank_endpoints() {
        let missing = ConnectionOptions::from_json(json!({ "keyspace": "app" })).unwrap();
        assert!(matches!(
            missing.validate(),
            Err(CqlMiddlewareError::ConfigError(_))
        ));

        let blank = ConnectionOptions::new(["localhost", " "]);
        assert!(matches!(
            blank.validate(),
            Err(CqlMiddlewareError::ConfigError(_))
        ));

        assert!(matches!(
            ConnectionOptions::from_json(json!({ "contactPoints": "localhost" })),
            Err(CqlMiddlewareError::ConfigError(_))
        ));
    }

    #[tokio::test]
    async fn pending_source_resolves_and_then_peeks() {
        let source = OptionsSource::pending(async { Ok(ConnectionOptions::new(["localhost"])) });
        assert!(source.is_pending());
        assert!(source.peek().is_none());

        let resolved = source.clone().resolve().await.unwrap();
        assert_eq!(resolved.contact_points, vec!["localhost".to_string()]);
        assert!(!source.is_pending());
        assert_eq!(source.peek(), Some(&resolved));
    }
}
