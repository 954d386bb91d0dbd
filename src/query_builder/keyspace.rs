use clap::ValueEnum;
use serde_json::{Map as JsonMap, Value as JsonValue};

use super::quote_literal;
use crate::error::CqlMiddlewareError;

/// Replication strategy classes understood by the map-literal renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum ReplicationClass {
    #[value(name = "SimpleStrategy")]
    Simple,
    #[value(name = "NetworkTopologyStrategy")]
    NetworkTopology,
}

impl ReplicationClass {
    /// Parse a class name, accepting the fully qualified
    /// `org.apache.cassandra.locator.*` form as well.
    ///
    /// # Errors
    /// Returns `CqlMiddlewareError::ParameterError` for an unknown class.
    pub fn parse(raw: &str) -> Result<Self, CqlMiddlewareError> {
        let short = raw.rsplit('.').next().unwrap_or(raw).trim();
        <Self as ValueEnum>::from_str(short, true).map_err(|_| {
            CqlMiddlewareError::ParameterError(format!("unknown replication class: {raw}"))
        })
    }

    #[must_use]
    pub fn class_name(self) -> &'static str {
        match self {
            ReplicationClass::Simple => "SimpleStrategy",
            ReplicationClass::NetworkTopology => "NetworkTopologyStrategy",
        }
    }
}

/// How a keyspace replicates its data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplicationSpec {
    Simple { replication_factor: u32 },
    /// Per-datacenter factors, rendered in the given order
    NetworkTopology { datacenters: Vec<(String, u32)> },
    /// Any other mapping, `class` included, rendered entry by entry as given.
    /// The server decides whether it is valid.
    Custom { entries: Vec<(String, JsonValue)> },
}

impl Default for ReplicationSpec {
    fn default() -> Self {
        ReplicationSpec::Simple {
            replication_factor: 1,
        }
    }
}

impl ReplicationSpec {
    #[must_use]
    pub fn simple(replication_factor: u32) -> Self {
        ReplicationSpec::Simple { replication_factor }
    }

    #[must_use]
    pub fn network_topology<I, S>(datacenters: I) -> Self
    where
        I: IntoIterator<Item = (S, u32)>,
        S: Into<String>,
    {
        ReplicationSpec::NetworkTopology {
            datacenters: datacenters
                .into_iter()
                .map(|(dc, factor)| (dc.into(), factor))
                .collect(),
        }
    }

    #[must_use]
    pub fn custom<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, JsonValue)>,
        S: Into<String>,
    {
        ReplicationSpec::Custom {
            entries: entries
                .into_iter()
                .map(|(key, value)| (key.into(), value))
                .collect(),
        }
    }

    /// The strategy class, when it is one of the known ones.
    #[must_use]
    pub fn class(&self) -> Option<ReplicationClass> {
        match self {
            ReplicationSpec::Simple { .. } => Some(ReplicationClass::Simple),
            ReplicationSpec::NetworkTopology { .. } => Some(ReplicationClass::NetworkTopology),
            ReplicationSpec::Custom { entries } => entries
                .iter()
                .find(|(key, _)| key == "class")
                .and_then(|(_, value)| value.as_str())
                .and_then(|class| ReplicationClass::parse(class).ok()),
        }
    }

    /// Render as a CQL map literal, e.g.
    /// `{'class': 'SimpleStrategy', 'replication_factor': 1}`.
    #[must_use]
    pub fn to_cql_map(&self) -> String {
        let entries: Vec<String> = match self {
            ReplicationSpec::Simple { replication_factor } => vec![
                format!("'class': {}", quote_literal(ReplicationClass::Simple.class_name())),
                format!("'replication_factor': {replication_factor}"),
            ],
            ReplicationSpec::NetworkTopology { datacenters } => std::iter::once(format!(
                "'class': {}",
                quote_literal(ReplicationClass::NetworkTopology.class_name())
            ))
            .chain(
                datacenters
                    .iter()
                    .map(|(dc, factor)| format!("{}: {factor}", quote_literal(dc))),
            )
            .collect(),
            ReplicationSpec::Custom { entries } => entries
                .iter()
                .map(|(key, value)| format!("{}: {}", quote_literal(key), cql_literal(value)))
                .collect(),
        };
        format!("{{{}}}", entries.join(", "))
    }

    /// Parse the driver-style mapping, e.g.
    /// `{"class": "SimpleStrategy", "replication_factor": 3}` or
    /// `{"class": "NetworkTopologyStrategy", "dc1": 3, "dc2": "2"}`.
    ///
    /// Mappings that do not fit the typed variants exactly are kept whole as
    /// [`ReplicationSpec::Custom`], so no entry is lost.
    ///
    /// # Errors
    /// Returns `CqlMiddlewareError::ParameterError` if `value` is not a mapping.
    pub fn from_json(value: &JsonValue) -> Result<Self, CqlMiddlewareError> {
        let map = value.as_object().ok_or_else(|| {
            CqlMiddlewareError::ParameterError("replication must be a mapping".to_string())
        })?;

        let typed = match map
            .get("class")
            .and_then(JsonValue::as_str)
            .and_then(|class| ReplicationClass::parse(class).ok())
        {
            Some(ReplicationClass::Simple) => simple_from_map(map),
            Some(ReplicationClass::NetworkTopology) => network_topology_from_map(map),
            None => None,
        };
        Ok(typed.unwrap_or_else(|| {
            ReplicationSpec::custom(map.iter().map(|(key, value)| (key.clone(), value.clone())))
        }))
    }
}

fn simple_from_map(map: &JsonMap<String, JsonValue>) -> Option<ReplicationSpec> {
    if map
        .keys()
        .any(|key| !matches!(key.as_str(), "class" | "replication_factor"))
    {
        return None;
    }
    let replication_factor = parse_factor(map.get("replication_factor")?)?;
    Some(ReplicationSpec::Simple { replication_factor })
}

fn network_topology_from_map(map: &JsonMap<String, JsonValue>) -> Option<ReplicationSpec> {
    map.iter()
        .filter(|(key, _)| key.as_str() != "class")
        .map(|(dc, value)| parse_factor(value).map(|factor| (dc.clone(), factor)))
        .collect::<Option<Vec<_>>>()
        .map(|datacenters| ReplicationSpec::NetworkTopology { datacenters })
}

fn parse_factor(value: &JsonValue) -> Option<u32> {
    match value {
        JsonValue::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        JsonValue::String(s) => s.trim().parse::<u32>().ok(),
        _ => None,
    }
}

/// CQL literal for a JSON value: strings quoted, objects as maps, arrays as lists.
fn cql_literal(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => quote_literal(s),
        JsonValue::Array(items) => format!(
            "[{}]",
            items.iter().map(cql_literal).collect::<Vec<_>>().join(", ")
        ),
        JsonValue::Object(map) => format!(
            "{{{}}}",
            map.iter()
                .map(|(key, value)| format!("{}: {}", quote_literal(key), cql_literal(value)))
                .collect::<Vec<_>>()
                .join(", ")
        ),
        other => other.to_string(),
    }
}

/// Settings for `CREATE KEYSPACE`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyspaceOptions {
    pub replication: ReplicationSpec,
    pub durable_writes: bool,
}

impl KeyspaceOptions {
    #[must_use]
    pub fn with_replication(mut self, replication: ReplicationSpec) -> Self {
        self.replication = replication;
        self
    }

    #[must_use]
    pub fn with_durable_writes(mut self, durable_writes: bool) -> Self {
        self.durable_writes = durable_writes;
        self
    }
}

#[must_use]
pub fn create_keyspace_statement(name: &str, options: &KeyspaceOptions) -> String {
    format!(
        "CREATE KEYSPACE IF NOT EXISTS {name} WITH replication = {} AND durable_writes = {}",
        options.replication.to_cql_map(),
        options.durable_writes
    )
}

#[must_use]
pub fn use_keyspace_statement(name: &str) -> String {
    format!("USE {name}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn default_keyspace_statement_matches_simple_strategy() {
        assert_eq!(
            create_keyspace_statement("testspace", &KeyspaceOptions::default()),
            "CREATE KEYSPACE IF NOT EXISTS testspace WITH replication = \
             {'class': 'SimpleStrategy', 'replication_factor': 1} AND durable_writes = false"
        );
        assert_eq!(use_keyspace_statement("testspace"), "USE testspace");
    }

    #[test]
    fn network_topology_keeps_datacenter_order() {
        let options = KeyspaceOptions::default()
            .with_replication(ReplicationSpec::network_topology([("dc2", 2), ("dc1", 3)]))
            .with_durable_writes(true);
        assert_eq!(
            create_keyspace_statement("app", &options),
            "CREATE KEYSPACE IF NOT EXISTS app WITH replication = \
             {'class': 'NetworkTopologyStrategy', 'dc2': 2, 'dc1': 3} AND durable_writes = true"
        );
    }

    #[test]
    fn replication_from_driver_mapping() {
        assert_eq!(
            ReplicationSpec::from_json(&json!({"class": "SimpleStrategy", "replication_factor": 3}))
                .unwrap(),
            ReplicationSpec::simple(3)
        );
        assert_eq!(
            ReplicationSpec::from_json(&json!({
                "class": "org.apache.cassandra.locator.NetworkTopologyStrategy",
                "dc1": "3",
                "dc2": 1
            }))
            .unwrap(),
            ReplicationSpec::network_topology([("dc1", 3), ("dc2", 1)])
        );
    }

    #[test]
    fn unusual_mappings_are_kept_whole() {
        let extra = ReplicationSpec::from_json(
            &json!({"class": "SimpleStrategy", "replication_factor": 1, "dc1": 3}),
        )
        .unwrap();
        assert_eq!(extra.class(), Some(ReplicationClass::Simple));
        assert_eq!(
            extra.to_cql_map(),
            "{'class': 'SimpleStrategy', 'replication_factor': 1, 'dc1': 3}"
        );

        let everywhere = ReplicationSpec::from_json(&json!({"class": "EverywhereStrategy"})).unwrap();
        assert_eq!(everywhere.class(), None);
        assert_eq!(everywhere.to_cql_map(), "{'class': 'EverywhereStrategy'}");

        let no_class = ReplicationSpec::from_json(&json!({"replication_factor": -1})).unwrap();
        assert_eq!(no_class.to_cql_map(), "{'replication_factor': -1}");

        let no_factor = ReplicationSpec::from_json(&json!({"class": "SimpleStrategy"})).unwrap();
        assert_eq!(no_factor.to_cql_map(), "{'class': 'SimpleStrategy'}");

        let nested = ReplicationSpec::custom([
            ("class", json!("com.example.Custom")),
            ("zones", json!(["a", "b's"])),
            ("weights", json!({"a": 2, "enabled": true})),
        ]);
        assert_eq!(
            nested.to_cql_map(),
            "{'class': 'com.example.Custom', 'zones': ['a', 'b''s'], \
             'weights': {'a': 2, 'enabled': true}}"
        );
    }

    #[test]
    fn only_non_mappings_are_rejected() {
        for bad in [json!("SimpleStrategy"), json!(3), json!(null)] {
            assert!(
                matches!(
                    ReplicationSpec::from_json(&bad),
                    Err(CqlMiddlewareError::ParameterError(_))
                ),
                "{bad} should be rejected"
            );
        }
    }
}
