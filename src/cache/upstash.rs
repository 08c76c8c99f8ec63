use crate::cache::store::{KvError, KvStore, ScanPage};
use crate::config::CacheConfig;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

/// Redis over HTTP: each command is POSTed as a JSON array and answered with a
/// `{"result": ...}` or `{"error": "..."}` envelope.
pub struct UpstashStore {
    client: reqwest::Client,
    url: String,
    token: String,
}

#[derive(Deserialize)]
struct Envelope {
    result: Option<Value>,
    error: Option<String>,
}

impl UpstashStore {
    pub fn new(config: &CacheConfig) -> Result<Self, KvError> {
        let url = config.url.clone().ok_or_else(|| {
            KvError::Transport("cache.url is required for the upstash backend".to_string())
        })?;

        let token = config.token.clone().ok_or_else(|| {
            KvError::Transport("cache.token is required for the upstash backend".to_string())
        })?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| KvError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            url: url.trim_end_matches('/').to_string(),
            token,
        })
    }

    async fn command(&self, args: Value) -> Result<Value, KvError> {
        let name = command_name(&args);
        debug!("Cache command: {}", name);

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.token)
            .json(&args)
            .send()
            .await
            .map_err(|e| KvError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| KvError::Transport(e.to_string()))?;

        let envelope: Envelope = serde_json::from_str(&body).map_err(|_| {
            KvError::Response(format!("unexpected reply ({}): {}", status, body))
        })?;

        if let Some(error) = envelope.error {
            return Err(KvError::Response(error));
        }
        if !status.is_success() {
            return Err(KvError::Response(format!("status {}", status)));
        }

        Ok(envelope.result.unwrap_or(Value::Null))
    }
}

fn is_unsupported(message: &str) -> bool {
    let lowered = message.to_lowercase();
    lowered.contains("unknown command")
        || lowered.contains("not supported")
        || lowered.contains("not allowed")
}

pub(crate) fn parse_scan_reply(result: &Value) -> Result<ScanPage, KvError> {
    let parts = result
        .as_array()
        .filter(|parts| parts.len() == 2)
        .ok_or_else(|| KvError::Response(format!("malformed SCAN reply: {}", result)))?;

    let cursor = match &parts[0] {
        Value::String(s) => s.parse::<u64>().ok(),
        Value::Number(n) => n.as_u64(),
        _ => None,
    }
    .ok_or_else(|| KvError::Response(format!("malformed SCAN cursor: {}", parts[0])))?;

    let keys = parts[1]
        .as_array()
        .map(|keys| {
            keys.iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    Ok(ScanPage { cursor, keys })
}

#[async_trait]
impl KvStore for UpstashStore {
    async fn get(&self, key: &str) -> Result<Option<String>, KvError> {
        match self.command(json!(["GET", key])).await? {
            Value::Null => Ok(None),
            Value::String(s) => Ok(Some(s)),
            other => Ok(Some(other.to_string())),
        }
    }

    async fn set_ex(&self, key: &str, value: &str, ttl_seconds: u64) -> Result<(), KvError> {
        self.command(json!(["SET", key, value, "EX", ttl_seconds.to_string()]))
            .await?;
        Ok(())
    }

    async fn del(&self, keys: &[String]) -> Result<u64, KvError> {
        if keys.is_empty() {
            return Ok(0);
        }
        let mut args = vec![Value::from("DEL")];
        args.extend(keys.iter().map(|k| Value::from(k.as_str())));
        let result = self.command(Value::Array(args)).await?;
        Ok(result.as_u64().unwrap_or(0))
    }

    async fn scan(&self, cursor: u64, pattern: &str, count: usize) -> Result<ScanPage, KvError> {
        let reply = self
            .command(json!([
                "SCAN",
                cursor.to_string(),
                "MATCH",
                pattern,
                "COUNT",
                count.to_string()
            ]))
            .await;

        match reply {
            Ok(result) => parse_scan_reply(&result),
            Err(KvError::Response(message)) if is_unsupported(&message) => {
                Err(KvError::Unsupported(format!("SCAN ({})", message)))
            }
            Err(e) => Err(e),
        }
    }

    fn name(&self) -> &'static str {
        "upstash"
    }
}

fn command_name(args: &Value) -> &str {
    args.get(0).and_then(|v| v.as_str()).unwrap_or("?")
}
