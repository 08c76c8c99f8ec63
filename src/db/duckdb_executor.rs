use crate::config::DatabaseConfig;
use crate::db::db_pool::{build_pool, DuckDBConnectionManager};
use crate::db::{single_statement, ExecutionError, QueryExecutor, QueryResult, Row};
use crate::sql::validate_procedure_statement;
use async_trait::async_trait;
use duckdb::types::{TimeUnit, ValueRef};
use r2d2::Pool;
use serde_json::{json, Value};
use tracing::{debug, error, info};

/// Local stand-in for the `execute_sql` procedure: same re-validation, same
/// row-objects-as-JSON result, backed by a DuckDB file.
pub struct DuckDbExecutor {
    pool: Pool<DuckDBConnectionManager>,
}

impl DuckDbExecutor {
    pub fn new(config: &DatabaseConfig) -> Result<Self, ExecutionError> {
        let pool = build_pool(config).map_err(|e| {
            ExecutionError::Config(format!(
                "Failed to open DuckDB at {}: {}",
                config.connection_string, e
            ))
        })?;
        Ok(Self { pool })
    }

    #[cfg(test)]
    pub fn with_pool(pool: Pool<DuckDBConnectionManager>) -> Self {
        Self { pool }
    }
}

fn timestamp_micros(unit: TimeUnit, value: i64) -> i64 {
    match unit {
        TimeUnit::Second => value.saturating_mul(1_000_000),
        TimeUnit::Millisecond => value.saturating_mul(1_000),
        TimeUnit::Microsecond => value,
        TimeUnit::Nanosecond => value / 1_000,
    }
}

fn to_json(row: &duckdb::Row<'_>, idx: usize) -> Value {
    let value = match row.get_ref(idx) {
        Ok(value) => value,
        Err(_) => return Value::Null,
    };

    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Boolean(b) => json!(b),
        ValueRef::TinyInt(i) => json!(i),
        ValueRef::SmallInt(i) => json!(i),
        ValueRef::Int(i) => json!(i),
        ValueRef::BigInt(i) => json!(i),
        ValueRef::HugeInt(i) => match i64::try_from(i) {
            Ok(small) => json!(small),
            Err(_) => json!(i.to_string()),
        },
        ValueRef::UTinyInt(i) => json!(i),
        ValueRef::USmallInt(i) => json!(i),
        ValueRef::UInt(i) => json!(i),
        ValueRef::UBigInt(i) => json!(i),
        ValueRef::Float(f) => json!(f as f64),
        ValueRef::Double(f) => json!(f),
        ValueRef::Decimal(d) => {
            let text = d.to_string();
            text.parse::<f64>().map(|f| json!(f)).unwrap_or(Value::String(text))
        }
        ValueRef::Text(bytes) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Date32(days) => chrono::DateTime::from_timestamp(i64::from(days) * 86_400, 0)
            .map(|dt| Value::String(dt.date_naive().to_string()))
            .unwrap_or(Value::Null),
        ValueRef::Timestamp(unit, value) => {
            chrono::DateTime::from_timestamp_micros(timestamp_micros(unit, value))
                .map(|dt| Value::String(dt.naive_utc().format("%Y-%m-%dT%H:%M:%S%.f").to_string()))
                .unwrap_or(Value::Null)
        }
        _ => row
            .get::<_, String>(idx)
            .map(Value::String)
            .unwrap_or(Value::Null),
    }
}

fn run_query(
    pool: &Pool<DuckDBConnectionManager>,
    sql: &str,
) -> Result<Vec<Row>, ExecutionError> {
    let conn = pool
        .get()
        .map_err(|e| ExecutionError::Transport(format!("Database connection error: {}", e)))?;

    let mut stmt = conn
        .prepare(sql)
        .map_err(|e| ExecutionError::Database(e.to_string()))?;
    let mut rows = stmt
        .query([])
        .map_err(|e| ExecutionError::Database(e.to_string()))?;

    let column_names = rows
        .as_ref()
        .map(|stmt| stmt.column_names())
        .unwrap_or_default();

    let mut data = Vec::new();
    while let Some(row) = rows.next().map_err(|e| ExecutionError::Database(e.to_string()))? {
        let mut object = Row::new();
        for (idx, name) in column_names.iter().enumerate() {
            object.insert(name.clone(), to_json(row, idx));
        }
        data.push(object);
    }

    Ok(data)
}

#[async_trait]
impl QueryExecutor for DuckDbExecutor {
    async fn execute(&self, sql: &str) -> Result<QueryResult, ExecutionError> {
        let statement = single_statement(sql).to_string();

        validate_procedure_statement(&statement).map_err(|e| {
            error!("Statement rejected by procedure check: {}", e);
            ExecutionError::Database(e.to_string())
        })?;

        debug!("Executing on DuckDB: {}", statement);
        let pool = self.pool.clone();
        let data = tokio::task::spawn_blocking(move || run_query(&pool, &statement))
            .await
            .map_err(|e| {
                error!("Task join error: {}", e);
                ExecutionError::Transport(format!("Database task execution failed: {}", e))
            })??;

        info!("Query returned {} rows", data.len());
        Ok(QueryResult::from_rows(data))
    }

    fn name(&self) -> &'static str {
        "duckdb"
    }
}
