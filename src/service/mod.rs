//! Request orchestration: cache lookup, generation, execution, cache write and
//! response shaping for the analytics and chat paths.
//!
//! Every request is handled on its own. Two concurrent requests for the same
//! question may both miss the cache and both reach the model and the
//! database; nothing here de-duplicates in-flight work.

pub mod analytics;
pub mod chat;
pub mod summary;

use crate::cache::CacheStore;
use crate::db::{ExecutionError, QueryExecutor, Row};
use crate::llm::generator::{GenerationError, SqlGenerator};
use crate::llm::models::VisualizationType;
use crate::llm::{LlmError, TextGenerator};
use crate::sql::SqlValidationError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResponse {
    pub sql: String,
    pub explanation: String,
    pub data: Vec<Row>,
    pub columns: Vec<String>,
    pub visualization_type: VisualizationType,
    pub cached: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_time: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_conversational: Option<bool>,
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("{0}")]
    Generation(GenerationError),

    #[error("{reason}")]
    Validation {
        sql: String,
        reason: SqlValidationError,
    },

    #[error("{source}")]
    Execution {
        sql: String,
        explanation: String,
        #[source]
        source: ExecutionError,
    },

    #[error("{0}")]
    Chat(#[from] LlmError),
}

impl From<GenerationError> for ServiceError {
    fn from(err: GenerationError) -> Self {
        match err {
            GenerationError::Validation { sql, source } => ServiceError::Validation {
                sql,
                reason: source,
            },
            other => ServiceError::Generation(other),
        }
    }
}

pub const INVALID_QUESTION: &str = "Question is required and must be a string";

/// Rejects blank questions; returns the trimmed text otherwise.
pub fn require_question(question: &str) -> Result<&str, ServiceError> {
    let trimmed = question.trim();
    if trimmed.is_empty() {
        return Err(ServiceError::InvalidInput(INVALID_QUESTION.to_string()));
    }
    Ok(trimmed)
}

/// The explicit dependencies of both handlers, built once at startup.
#[derive(Clone)]
pub struct AnalyticsService {
    cache: CacheStore,
    generator: SqlGenerator,
    executor: Arc<dyn QueryExecutor>,
    llm: Arc<dyn TextGenerator>,
}

impl AnalyticsService {
    pub fn new(
        cache: CacheStore,
        llm: Arc<dyn TextGenerator>,
        executor: Arc<dyn QueryExecutor>,
    ) -> Self {
        Self {
            cache,
            generator: SqlGenerator::new(llm.clone()),
            executor,
            llm,
        }
    }

    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    pub fn executor_name(&self) -> &'static str {
        self.executor.name()
    }
}
