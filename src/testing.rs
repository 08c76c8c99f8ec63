//! Test doubles for the three external collaborators.

use crate::cache::store::{KvError, KvStore, ScanPage};
use crate::db::{ExecutionError, QueryExecutor, QueryResult};
use crate::llm::{LlmError, TextGenerator};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

/// Replays canned replies in order and records every prompt it receives.
pub struct ScriptedLlm {
    replies: Mutex<VecDeque<Result<String, LlmError>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedLlm {
    pub fn new(replies: Vec<Result<String, LlmError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextGenerator for ScriptedLlm {
    async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::ResponseError("no scripted reply left".to_string())))
    }
}

/// Returns canned results in order and records every statement.
pub struct RecordingExecutor {
    results: Mutex<VecDeque<Result<QueryResult, ExecutionError>>>,
    statements: Mutex<Vec<String>>,
}

impl RecordingExecutor {
    pub fn new(results: Vec<Result<QueryResult, ExecutionError>>) -> Self {
        Self {
            results: Mutex::new(results.into()),
            statements: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.statements.lock().unwrap().len()
    }

    pub fn statements(&self) -> Vec<String> {
        self.statements.lock().unwrap().clone()
    }
}

#[async_trait]
impl QueryExecutor for RecordingExecutor {
    async fn execute(&self, sql: &str) -> Result<QueryResult, ExecutionError> {
        self.statements.lock().unwrap().push(sql.to_string());
        self.results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ExecutionError::Database("no scripted result left".to_string())))
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}

/// Every command fails at the transport level.
pub struct FailingStore;

#[async_trait]
impl KvStore for FailingStore {
    async fn get(&self, _key: &str) -> Result<Option<String>, KvError> {
        Err(KvError::Transport("connection reset by peer".to_string()))
    }

    async fn set_ex(&self, _key: &str, _value: &str, _ttl_seconds: u64) -> Result<(), KvError> {
        Err(KvError::Transport("connection reset by peer".to_string()))
    }

    async fn del(&self, _keys: &[String]) -> Result<u64, KvError> {
        Err(KvError::Transport("connection reset by peer".to_string()))
    }

    async fn scan(&self, _cursor: u64, _pattern: &str, _count: usize) -> Result<ScanPage, KvError> {
        Err(KvError::Transport("connection reset by peer".to_string()))
    }

    fn name(&self) -> &'static str {
        "failing"
    }
}

/// Healthy store without SCAN support.
pub struct NoScanStore;

#[async_trait]
impl KvStore for NoScanStore {
    async fn get(&self, _key: &str) -> Result<Option<String>, KvError> {
        Ok(None)
    }

    async fn set_ex(&self, _key: &str, _value: &str, _ttl_seconds: u64) -> Result<(), KvError> {
        Ok(())
    }

    async fn del(&self, keys: &[String]) -> Result<u64, KvError> {
        Ok(keys.len() as u64)
    }

    async fn scan(&self, _cursor: u64, _pattern: &str, _count: usize) -> Result<ScanPage, KvError> {
        Err(KvError::Unsupported("SCAN".to_string()))
    }

    fn name(&self) -> &'static str {
        "no-scan"
    }
}
