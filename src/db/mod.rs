pub mod db_pool;
pub mod duckdb_executor;
pub mod rpc;

use crate::config::DatabaseConfig;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use thiserror::Error;
use tracing::warn;

pub type Row = Map<String, Value>;

#[derive(Debug, Error)]
pub enum ExecutionError {
    /// Message reported by the database or by its stored procedure.
    #[error("{0}")]
    Database(String),

    #[error("database transport error: {0}")]
    Transport(String),

    #[error("unexpected database response: {0}")]
    Response(String),

    #[error("database configuration error: {0}")]
    Config(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub data: Vec<Row>,
    pub columns: Vec<String>,
}

impl QueryResult {
    /// Column order is the key order of the first row.
    pub fn from_rows(data: Vec<Row>) -> Self {
        let columns = data
            .first()
            .map(|row| row.keys().cloned().collect())
            .unwrap_or_default();
        Self { data, columns }
    }

    /// Accepts what the stored procedure returns: an array of row objects, a
    /// JSON-encoded string of one, or null for no rows.
    pub fn from_procedure_value(value: Value) -> Result<Self, ExecutionError> {
        match value {
            Value::Null => Ok(Self::default()),
            Value::Array(items) => {
                let rows = items
                    .into_iter()
                    .map(|item| match item {
                        Value::Object(row) => Ok(row),
                        other => Err(ExecutionError::Response(format!(
                            "expected a row object, got {}",
                            other
                        ))),
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Self::from_rows(rows))
            }
            Value::String(encoded) => {
                let decoded: Value = serde_json::from_str(&encoded)
                    .map_err(|e| ExecutionError::Response(format!("invalid JSON rows: {}", e)))?;
                match decoded {
                    Value::String(_) => Err(ExecutionError::Response(
                        "doubly encoded row payload".to_string(),
                    )),
                    other => Self::from_procedure_value(other),
                }
            }
            other => Err(ExecutionError::Response(format!(
                "expected an array of rows, got {}",
                other
            ))),
        }
    }
}

/// Runs one read-only statement remotely and returns its rows as JSON objects.
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    async fn execute(&self, sql: &str) -> Result<QueryResult, ExecutionError>;

    fn name(&self) -> &'static str;
}

/// Trims, drops one trailing `;`, and keeps only the first statement if
/// several were sent.
pub fn single_statement(sql: &str) -> &str {
    let cleaned = crate::sql::strip_terminator(sql);
    match cleaned.split_once(';') {
        Some((first, _)) => {
            warn!("Discarding everything after the first statement: {}", cleaned);
            first.trim()
        }
        None => cleaned,
    }
}

pub fn executor_from_config(config: &DatabaseConfig) -> Result<Arc<dyn QueryExecutor>, ExecutionError> {
    match config.backend.as_str() {
        "rpc" => Ok(Arc::new(rpc::RpcExecutor::new(config)?)),
        "duckdb" => Ok(Arc::new(duckdb_executor::DuckDbExecutor::new(config)?)),
        other => Err(ExecutionError::Config(format!(
            "Unsupported database backend: {}",
            other
        ))),
    }
}
