use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

use crate::cache::{query_key, CHAT_PREFIX, QUERY_PREFIX};
use crate::llm::models::ConversationTurn;
use crate::service::chat::chat_cache_key;
use crate::service::{QueryResponse, INVALID_QUESTION};
use crate::web::error::ApiError;
use crate::web::state::AppState;

// Request / response types

#[derive(Debug, Deserialize)]
pub struct AnalyticsRequest {
    pub question: String,
    #[serde(default)]
    pub history: Vec<ConversationTurn>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub question: String,
    #[serde(default)]
    pub include_data: bool,
    #[serde(default)]
    pub history: Vec<ConversationTurn>,
}

#[derive(Debug, Serialize)]
pub struct ChatText {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub response: ChatText,
    pub cached: bool,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CacheMode {
    Query,
    Chat,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClearEntryRequest {
    pub question: String,
    pub mode: CacheMode,
    #[serde(default)]
    pub include_data: bool,
}

#[derive(Debug, Serialize)]
pub struct ClearEntryResponse {
    pub success: bool,
    pub message: String,
    pub key: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClearAllResponse {
    pub success: bool,
    pub message: String,
    pub deleted_count: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemStatus {
    pub version: String,
    pub uptime_seconds: i64,
    pub llm_backend: String,
    pub database_backend: String,
    pub cache_backend: String,
}

fn body_or_invalid<T>(payload: Result<Json<T>, JsonRejection>, message: &str) -> Result<T, ApiError> {
    payload.map(|Json(body)| body).map_err(|rejection| {
        debug!("Rejected request body: {}", rejection.body_text());
        ApiError::invalid_input(message)
    })
}

// Question answering

pub async fn analytics_query(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<AnalyticsRequest>, JsonRejection>,
) -> Result<Json<QueryResponse>, ApiError> {
    let request = body_or_invalid(payload, INVALID_QUESTION)?;
    info!("Analytics question: {}", request.question);

    let response = state
        .service
        .analytics(&request.question, &request.history)
        .await?;
    Ok(Json(response))
}

pub async fn chat(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, ApiError> {
    let request = body_or_invalid(payload, INVALID_QUESTION)?;
    info!("Chat question: {}", request.question);

    let reply = state
        .service
        .chat(&request.question, request.include_data, &request.history)
        .await?;

    Ok(Json(ChatResponse {
        response: ChatText { text: reply.text },
        cached: reply.cached,
    }))
}

// Cache administration

pub async fn clear_cache_entry(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ClearEntryRequest>, JsonRejection>,
) -> Result<Json<ClearEntryResponse>, ApiError> {
    let request = body_or_invalid(
        payload,
        "question (string) and mode ('query' or 'chat') are required",
    )?;

    let key = match request.mode {
        CacheMode::Query => query_key(&request.question),
        CacheMode::Chat => chat_cache_key(request.question.trim(), request.include_data),
    };

    state.service.cache().delete(&key).await;
    info!("Cleared cache entry {}", key);

    Ok(Json(ClearEntryResponse {
        success: true,
        message: format!("Cache cleared for question: {}", request.question),
        key,
    }))
}

pub async fn clear_all_cache(State(state): State<Arc<AppState>>) -> Json<ClearAllResponse> {
    let cache = state.service.cache();
    let queries = cache.delete_by_prefix(QUERY_PREFIX).await;
    let chats = cache.delete_by_prefix(CHAT_PREFIX).await;

    let deleted_count = queries.deleted + chats.deleted;
    let hint = queries.hint.or(chats.hint);

    Json(ClearAllResponse {
        success: true,
        message: format!("Cleared {} cached entries", deleted_count),
        deleted_count,
        hint,
    })
}

// System status

pub async fn system_status(State(state): State<Arc<AppState>>) -> Json<SystemStatus> {
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.uptime_seconds(),
        llm_backend: state.config.llm.backend.clone(),
        database_backend: state.service.executor_name().to_string(),
        cache_backend: state.service.cache().backend_name().to_string(),
    })
}
