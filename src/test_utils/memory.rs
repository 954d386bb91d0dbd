//! An in-process stand-in for a CQL cluster.
//!
//! Understands the handful of statements the handle and its tests issue:
//! `CREATE KEYSPACE`, `USE`, `CREATE TABLE`, `INSERT ... VALUES` and a plain
//! `SELECT cols FROM table`. Anything else fails the way a server would
//! reject an unparseable statement.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use futures_util::StreamExt;
use futures_util::stream;
use lazy_static::lazy_static;
use regex::Regex;
use tokio::sync::Semaphore;

use crate::config::ConnectionOptions;
use crate::driver::{CqlClient, Driver, RowStream, call_statement_operation};
use crate::error::CqlMiddlewareError;
use crate::results::ResultSet;
use crate::types::RowValues;

lazy_static! {
    static ref CREATE_KEYSPACE: Regex = Regex::new(
        r"(?is)^\s*create\s+keyspace\s+(if\s+not\s+exists\s+)?(\w+)\s+with\s+replication\s*=\s*(\{.*?\})(?:\s+and\s+durable_writes\s*=\s*(true|false))?\s*;?\s*$"
    )
    .expect("create keyspace pattern");
    static ref USE_KEYSPACE: Regex =
        Regex::new(r"(?is)^\s*use\s+(\w+)\s*;?\s*$").expect("use pattern");
    static ref CREATE_TABLE: Regex = Regex::new(
        r"(?is)^\s*create\s+table\s+(if\s+not\s+exists\s+)?([\w.]+)\s*\((.*)\)\s*;?\s*$"
    )
    .expect("create table pattern");
    static ref INSERT: Regex = Regex::new(
        r"(?is)^\s*insert\s+into\s+([\w.]+)\s*\(([^)]*)\)\s*values\s*\((.*)\)\s*;?\s*$"
    )
    .expect("insert pattern");
    static ref SELECT: Regex =
        Regex::new(r"(?is)^\s*select\s+(.+?)\s+from\s+([\w.]+)\s*;?\s*$").expect("select pattern");
    static ref REPLICATION_CLASS: Regex =
        Regex::new(r"'class'\s*:\s*'([^']+)'").expect("replication class pattern");
}

const KNOWN_STRATEGIES: &[&str] = &[
    "SimpleStrategy",
    "NetworkTopologyStrategy",
    "LocalStrategy",
];

const KNOWN_TYPES: &[&str] = &[
    "ascii", "bigint", "blob", "boolean", "counter", "date", "decimal", "double", "duration",
    "float", "frozen", "inet", "int", "list", "map", "set", "smallint", "text", "time",
    "timestamp", "timeuuid", "tinyint", "tuple", "uuid", "varchar", "varint",
];

fn execution_error(message: impl Into<String>) -> CqlMiddlewareError {
    CqlMiddlewareError::ExecutionError(message.into())
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Clone)]
struct MemoryTable {
    columns: Vec<(String, String)>,
    constraints: Vec<String>,
    rows: Vec<Vec<RowValues>>,
}

impl MemoryTable {
    fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|(column, _)| column == name)
    }

    fn same_schema(&self, columns: &[(String, String)], constraints: &[String]) -> bool {
        self.columns == columns && self.constraints == constraints
    }

    /// Rows sharing a primary key value replace each other.
    fn upsert(&mut self, row: Vec<RowValues>) {
        let key_index = self
            .columns
            .iter()
            .position(|(_, decl)| decl.contains("primary key"));
        if let Some(idx) = key_index {
            if let Some(existing) = self.rows.iter_mut().find(|r| r[idx] == row[idx]) {
                *existing = row;
                return;
            }
        }
        self.rows.push(row);
    }
}

#[derive(Debug, Default)]
struct MemoryKeyspace {
    replication: String,
    durable_writes: bool,
    tables: BTreeMap<String, MemoryTable>,
}

#[derive(Debug)]
struct MemoryCluster {
    keyspaces: BTreeMap<String, MemoryKeyspace>,
    statements: Vec<String>,
}

impl Default for MemoryCluster {
    fn default() -> Self {
        let local = MemoryTable {
            columns: vec![
                ("key".to_string(), "text primary key".to_string()),
                ("cluster_name".to_string(), "text".to_string()),
            ],
            constraints: Vec::new(),
            rows: vec![vec![
                RowValues::Text("local".to_string()),
                RowValues::Text("Test Cluster".to_string()),
            ]],
        };
        let system = MemoryKeyspace {
            replication: "{'class': 'LocalStrategy'}".to_string(),
            durable_writes: true,
            tables: BTreeMap::from([("local".to_string(), local)]),
        };
        Self {
            keyspaces: BTreeMap::from([("system".to_string(), system)]),
            statements: Vec::new(),
        }
    }
}

impl MemoryCluster {
    fn table(&self, keyspace: &str, table: &str) -> Result<&MemoryTable, CqlMiddlewareError> {
        self.keyspaces
            .get(keyspace)
            .and_then(|ks| ks.tables.get(table))
            .ok_or_else(|| execution_error(format!("unconfigured table {keyspace}.{table}")))
    }

    fn table_mut(
        &mut self,
        keyspace: &str,
        table: &str,
    ) -> Result<&mut MemoryTable, CqlMiddlewareError> {
        self.keyspaces
            .get_mut(keyspace)
            .and_then(|ks| ks.tables.get_mut(table))
            .ok_or_else(|| execution_error(format!("unconfigured table {keyspace}.{table}")))
    }
}

/// Release handle for a [`MemoryDriver`] built with [`MemoryDriver::gated`].
#[derive(Debug, Clone)]
pub struct ConnectGate(Arc<Semaphore>);

impl ConnectGate {
    /// Let pending and future connects through.
    pub fn open(&self) {
        self.0.add_permits(1);
    }
}

/// Driver whose clients all share one in-memory cluster.
#[derive(Debug, Clone, Default)]
pub struct MemoryDriver {
    cluster: Arc<Mutex<MemoryCluster>>,
    connects: Arc<AtomicUsize>,
    gate: Option<Arc<Semaphore>>,
    connect_error: Option<CqlMiddlewareError>,
}

impl MemoryDriver {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A driver whose every connect fails with `error`.
    #[must_use]
    pub fn failing(error: CqlMiddlewareError) -> Self {
        Self {
            connect_error: Some(error),
            ..Self::default()
        }
    }

    /// A driver whose connects wait until the returned gate is opened.
    #[must_use]
    pub fn gated() -> (Self, ConnectGate) {
        let gate = Arc::new(Semaphore::new(0));
        let driver = Self {
            gate: Some(Arc::clone(&gate)),
            ..Self::default()
        };
        (driver, ConnectGate(gate))
    }

    /// How many times `connect` has been entered.
    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    /// Every statement received so far, in arrival order.
    pub fn executed_statements(&self) -> Vec<String> {
        lock(&self.cluster).statements.clone()
    }

    pub fn keyspace_names(&self) -> Vec<String> {
        lock(&self.cluster).keyspaces.keys().cloned().collect()
    }

    /// Replication map and durable-writes flag a keyspace was created with.
    pub fn keyspace_settings(&self, name: &str) -> Option<(String, bool)> {
        lock(&self.cluster)
            .keyspaces
            .get(name)
            .map(|ks| (ks.replication.clone(), ks.durable_writes))
    }
}

#[async_trait]
impl Driver for MemoryDriver {
    type Client = MemoryClient;

    async fn connect(&self, options: ConnectionOptions) -> Result<MemoryClient, CqlMiddlewareError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            let _permit = gate
                .acquire()
                .await
                .map_err(|e| CqlMiddlewareError::ConnectionError(e.to_string()))?;
        }
        if let Some(error) = &self.connect_error {
            return Err(error.clone());
        }

        let keyspace = match &options.keyspace {
            Some(name) => {
                let name = name.to_lowercase();
                if !lock(&self.cluster).keyspaces.contains_key(&name) {
                    return Err(CqlMiddlewareError::ConnectionError(format!(
                        "Keyspace '{name}' does not exist"
                    )));
                }
                Some(name)
            }
            None => None,
        };

        Ok(MemoryClient {
            options,
            cluster: Arc::clone(&self.cluster),
            keyspace: Mutex::new(keyspace),
        })
    }
}

/// A session against the shared in-memory cluster.
#[derive(Debug)]
pub struct MemoryClient {
    options: ConnectionOptions,
    cluster: Arc<Mutex<MemoryCluster>>,
    keyspace: Mutex<Option<String>>,
}

impl MemoryClient {
    pub fn current_keyspace(&self) -> Option<String> {
        lock(&self.keyspace).clone()
    }

    fn resolve_table(&self, raw: &str) -> Result<(String, String), CqlMiddlewareError> {
        let raw = raw.to_lowercase();
        if let Some((keyspace, table)) = raw.split_once('.') {
            return Ok((keyspace.to_string(), table.to_string()));
        }
        let keyspace = self.current_keyspace().ok_or_else(|| {
            execution_error(
                "No keyspace has been specified. USE a keyspace, or explicitly specify keyspace.tablename",
            )
        })?;
        Ok((keyspace, raw))
    }

    fn run(&self, statement: &str, params: &[RowValues]) -> Result<ResultSet, CqlMiddlewareError> {
        let mut cluster = lock(&self.cluster);
        cluster.statements.push(statement.trim().to_string());

        if let Some(caps) = CREATE_KEYSPACE.captures(statement) {
            let name = caps[2].to_lowercase();
            let replication = caps[3].to_string();
            let Some(class) = REPLICATION_CLASS.captures(&replication) else {
                return Err(execution_error("Missing replication strategy class"));
            };
            let short = class[1].rsplit('.').next().unwrap_or(&class[1]);
            if !KNOWN_STRATEGIES.contains(&short) {
                return Err(execution_error(format!(
                    "Unable to find replication strategy class '{}'",
                    &class[1]
                )));
            }
            if cluster.keyspaces.contains_key(&name) {
                return if caps.get(1).is_some() {
                    Ok(ResultSet::default())
                } else {
                    Err(execution_error(format!("Keyspace {name} already exists")))
                };
            }
            let durable_writes = caps
                .get(4)
                .is_none_or(|m| m.as_str().eq_ignore_ascii_case("true"));
            cluster.keyspaces.insert(
                name,
                MemoryKeyspace {
                    replication,
                    durable_writes,
                    tables: BTreeMap::new(),
                },
            );
            return Ok(ResultSet::default());
        }

        if let Some(caps) = USE_KEYSPACE.captures(statement) {
            let name = caps[1].to_lowercase();
            if !cluster.keyspaces.contains_key(&name) {
                return Err(execution_error(format!("Keyspace '{name}' does not exist")));
            }
            *lock(&self.keyspace) = Some(name);
            return Ok(ResultSet::default());
        }

        if let Some(caps) = CREATE_TABLE.captures(statement) {
            let (keyspace, table) = self.resolve_table(&caps[2])?;
            let (columns, constraints) = parse_column_defs(&caps[3])?;
            let ks = cluster.keyspaces.get_mut(&keyspace).ok_or_else(|| {
                execution_error(format!("Keyspace '{keyspace}' does not exist"))
            })?;
            return match ks.tables.get(&table) {
                Some(existing) if existing.same_schema(&columns, &constraints) => {
                    if caps.get(1).is_some() {
                        Ok(ResultSet::default())
                    } else {
                        Err(execution_error(format!(
                            "Table {keyspace}.{table} already exists"
                        )))
                    }
                }
                Some(_) => Err(execution_error(format!(
                    "Table {keyspace}.{table} already exists with a different definition"
                ))),
                None => {
                    ks.tables.insert(
                        table,
                        MemoryTable {
                            columns,
                            constraints,
                            rows: Vec::new(),
                        },
                    );
                    Ok(ResultSet::default())
                }
            };
        }

        if let Some(caps) = INSERT.captures(statement) {
            let (keyspace, table_name) = self.resolve_table(&caps[1])?;
            let names: Vec<String> = caps[2]
                .split(',')
                .map(|c| c.trim().to_lowercase())
                .collect();
            let tokens = split_top_level(&caps[3]);
            if names.len() != tokens.len() {
                return Err(execution_error("Unmatched column names/values"));
            }
            let mut bound = params.iter();
            let values = tokens
                .iter()
                .map(|token| parse_value(token.trim(), &mut bound))
                .collect::<Result<Vec<_>, _>>()?;
            if bound.next().is_some() {
                return Err(execution_error(format!(
                    "Too many bound values: statement takes fewer than {}",
                    params.len()
                )));
            }

            let table = cluster.table_mut(&keyspace, &table_name)?;
            let mut row = vec![RowValues::Null; table.columns.len()];
            for (name, value) in names.iter().zip(values) {
                let idx = table
                    .column_index(name)
                    .ok_or_else(|| execution_error(format!("Undefined column name {name}")))?;
                row[idx] = value;
            }
            table.upsert(row);
            return Ok(ResultSet::default());
        }

        if let Some(caps) = SELECT.captures(statement) {
            let (keyspace, table_name) = self.resolve_table(&caps[2])?;
            let table = cluster.table(&keyspace, &table_name)?;
            let projection = caps[1].trim();
            let indices: Vec<usize> = if projection == "*" {
                (0..table.columns.len()).collect()
            } else {
                projection
                    .split(',')
                    .map(|c| {
                        let c = c.trim().to_lowercase();
                        table
                            .column_index(&c)
                            .ok_or_else(|| execution_error(format!("Undefined column name {c}")))
                    })
                    .collect::<Result<_, _>>()?
            };

            let mut result_set = ResultSet::with_capacity(table.rows.len());
            result_set.set_column_names(Arc::new(
                indices.iter().map(|&i| table.columns[i].0.clone()).collect(),
            ));
            for row in &table.rows {
                result_set.add_row_values(indices.iter().map(|&i| row[i].clone()).collect());
            }
            return Ok(result_set);
        }

        Err(execution_error(format!(
            "line 1:0 no viable alternative at input '{}'",
            statement.trim()
        )))
    }

    fn keyspace_listing(&self) -> ResultSet {
        let cluster = lock(&self.cluster);
        let mut result_set = ResultSet::with_capacity(cluster.keyspaces.len());
        result_set.set_column_names(Arc::new(vec!["keyspace_name".to_string()]));
        for name in cluster.keyspaces.keys() {
            result_set.add_row_values(vec![RowValues::Text(name.clone())]);
        }
        result_set
    }
}

#[async_trait]
impl CqlClient for MemoryClient {
    fn options(&self) -> &ConnectionOptions {
        &self.options
    }

    async fn execute(
        &self,
        statement: &str,
        params: &[RowValues],
    ) -> Result<ResultSet, CqlMiddlewareError> {
        self.run(statement, params)
    }

    async fn row_stream(
        &self,
        statement: &str,
        params: &[RowValues],
    ) -> Result<RowStream, CqlMiddlewareError> {
        let rows = self.run(statement, params)?.results;
        Ok(stream::iter(rows.into_iter().map(Ok)).boxed())
    }

    /// Adds `keyspaces` and `current_keyspace` to the statement operations.
    async fn call(
        &self,
        operation: &str,
        args: Vec<RowValues>,
    ) -> Result<ResultSet, CqlMiddlewareError> {
        match operation {
            "keyspaces" => Ok(self.keyspace_listing()),
            "current_keyspace" => {
                let mut result_set = ResultSet::with_capacity(1);
                result_set.set_column_names(Arc::new(vec!["keyspace_name".to_string()]));
                result_set.add_row_values(vec![
                    self.current_keyspace().map_or(RowValues::Null, RowValues::Text),
                ]);
                Ok(result_set)
            }
            _ => call_statement_operation(self, operation, args).await,
        }
    }
}

/// Split on commas that are outside parentheses, angle brackets and quotes.
fn split_top_level(body: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut in_quote = false;
    let mut start = 0;
    for (i, c) in body.char_indices() {
        match c {
            '\'' => in_quote = !in_quote,
            '(' | '<' if !in_quote => depth += 1,
            ')' | '>' if !in_quote => depth -= 1,
            ',' if !in_quote && depth == 0 => {
                parts.push(&body[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&body[start..]);
    parts
}

type ColumnDefs = (Vec<(String, String)>, Vec<String>);

fn parse_column_defs(body: &str) -> Result<ColumnDefs, CqlMiddlewareError> {
    let mut columns: Vec<(String, String)> = Vec::new();
    let mut constraints = Vec::new();
    for entry in split_top_level(body) {
        let entry = entry
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase();
        if entry.is_empty() {
            return Err(execution_error("empty column definition"));
        }
        if entry.starts_with("primary key") {
            constraints.push(entry);
            continue;
        }
        let (name, declaration) = entry
            .split_once(' ')
            .ok_or_else(|| execution_error(format!("column {entry} has no type")))?;
        let type_name = declaration
            .split(|c: char| c == '<' || c.is_whitespace())
            .next()
            .unwrap_or_default();
        if !KNOWN_TYPES.contains(&type_name) {
            return Err(execution_error(format!("Unknown type {type_name}")));
        }
        if columns.iter().any(|(existing, _)| existing == name) {
            return Err(execution_error(format!("Multiple definition of identifier {name}")));
        }
        columns.push((name.to_string(), declaration.to_string()));
    }
    if columns.is_empty() {
        return Err(execution_error("table requires at least one column"));
    }
    Ok((columns, constraints))
}

fn parse_value(
    token: &str,
    bound: &mut std::slice::Iter<'_, RowValues>,
) -> Result<RowValues, CqlMiddlewareError> {
    if token == "?" {
        return bound
            .next()
            .cloned()
            .ok_or_else(|| execution_error("Not enough bound values"));
    }
    if let Some(inner) = token
        .strip_prefix('\'')
        .and_then(|t| t.strip_suffix('\''))
    {
        return Ok(RowValues::Text(inner.replace("''", "'")));
    }
    match token.to_lowercase().as_str() {
        "true" => return Ok(RowValues::Bool(true)),
        "false" => return Ok(RowValues::Bool(false)),
        "null" => return Ok(RowValues::Null),
        _ => {}
    }
    if let Ok(int) = token.parse::<i64>() {
        return Ok(RowValues::Int(int));
    }
    token
        .parse::<f64>()
        .map(RowValues::Float)
        .map_err(|_| execution_error(format!("Invalid value literal {token}")))
}
