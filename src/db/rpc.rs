use crate::config::DatabaseConfig;
use crate::db::{single_statement, ExecutionError, QueryExecutor, QueryResult};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, error, info};

/// Calls the `execute_sql` stored procedure through a Postgres REST gateway
/// (`POST {url}/rest/v1/rpc/{function}`). The procedure re-validates the
/// statement and returns its rows as a JSON array.
pub struct RpcExecutor {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

#[derive(Deserialize)]
struct GatewayError {
    message: Option<String>,
    details: Option<String>,
    hint: Option<String>,
}

impl RpcExecutor {
    pub fn new(config: &DatabaseConfig) -> Result<Self, ExecutionError> {
        let url = config.url.clone().ok_or_else(|| {
            ExecutionError::Config("database.url is required for the rpc backend".to_string())
        })?;

        let api_key = config.api_key.clone().ok_or_else(|| {
            ExecutionError::Config("database.api_key is required for the rpc backend".to_string())
        })?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ExecutionError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: format!("{}/rest/v1/rpc/{}", url.trim_end_matches('/'), config.function),
            api_key,
        })
    }
}

fn error_message(body: &str) -> String {
    match serde_json::from_str::<GatewayError>(body) {
        Ok(GatewayError {
            message: Some(message),
            details,
            hint,
        }) => {
            let mut text = message;
            if let Some(details) = details.filter(|d| !d.is_empty()) {
                text.push_str(&format!(" ({})", details));
            }
            if let Some(hint) = hint.filter(|h| !h.is_empty()) {
                text.push_str(&format!(" Hint: {}", hint));
            }
            text
        }
        _ => body.to_string(),
    }
}

#[async_trait]
impl QueryExecutor for RpcExecutor {
    async fn execute(&self, sql: &str) -> Result<QueryResult, ExecutionError> {
        let statement = single_statement(sql);
        debug!("Calling {} with: {}", self.endpoint, statement);

        let response = self
            .client
            .post(&self.endpoint)
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .json(&json!({ "query": statement }))
            .send()
            .await
            .map_err(|e| ExecutionError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ExecutionError::Transport(e.to_string()))?;

        if !status.is_success() {
            let message = error_message(&body);
            error!("Stored procedure failed ({}): {}", status, message);
            return Err(ExecutionError::Database(message));
        }

        let value: Value = if body.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&body).map_err(|e| ExecutionError::Response(e.to_string()))?
        };

        let result = QueryResult::from_procedure_value(value)?;
        info!("Query returned {} rows", result.data.len());
        Ok(result)
    }

    fn name(&self) -> &'static str {
        "rpc"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn surfaces_database_message_details_and_hint() {
        let body = r#"{"code":"P0001","message":"Only SELECT queries are allowed","details":null,"hint":null}"#;
        assert_eq!(error_message(body), "Only SELECT queries are allowed");

        let body = r#"{"message":"column \"x\" does not exist","details":"","hint":"Perhaps you meant \"y\"."}"#;
        assert_eq!(
            error_message(body),
            "column \"x\" does not exist Hint: Perhaps you meant \"y\"."
        );
    }

    #[test]
    fn falls_back_to_raw_body() {
        assert_eq!(error_message("Bad Gateway"), "Bad Gateway");
    }

    #[test]
    fn builds_endpoint_from_config() {
        let config = DatabaseConfig {
            backend: "rpc".to_string(),
            url: Some("https://db.example.co/".to_string()),
            api_key: Some("anon".to_string()),
            function: "execute_sql".to_string(),
            connection_string: String::new(),
            pool_size: 1,
        };
        let executor = RpcExecutor::new(&config).unwrap();
        assert_eq!(executor.endpoint, "https://db.example.co/rest/v1/rpc/execute_sql");
    }
}
