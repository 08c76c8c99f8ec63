use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};

use crate::service::ServiceError;

const GENERATION_HINT: &str =
    "Check the LLM settings (llm.api_url, llm.api_key) and try rephrasing the question.";
const VALIDATION_HINT: &str =
    "The generated query was blocked before reaching the database. Try rephrasing the question.";
const EXECUTION_HINT: &str =
    "Make sure the execute_sql function from migrations/001_execute_sql.sql is installed and the tables exist.";
const CHAT_HINT: &str =
    "Check that the LLM endpoint is reachable and llm.api_key is configured.";

/// HTTP rendering of [`ServiceError`].
#[derive(Debug)]
pub struct ApiError(pub ServiceError);

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        Self(err)
    }
}

impl ApiError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self(ServiceError::InvalidInput(message.into()))
    }

    fn parts(&self) -> (StatusCode, Value) {
        let message = self.0.to_string();
        match &self.0 {
            ServiceError::InvalidInput(_) => (StatusCode::BAD_REQUEST, json!({ "error": message })),
            ServiceError::Generation(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({
                    "error": "Failed to generate SQL",
                    "message": message,
                    "hint": GENERATION_HINT,
                }),
            ),
            ServiceError::Validation { sql, .. } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({
                    "error": "Generated SQL failed safety validation",
                    "message": message,
                    "sql": sql,
                    "hint": VALIDATION_HINT,
                }),
            ),
            ServiceError::Execution {
                sql, explanation, ..
            } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({
                    "error": "Query execution failed",
                    "message": message,
                    "sql": sql,
                    "explanation": explanation,
                    "hint": EXECUTION_HINT,
                }),
            ),
            ServiceError::Chat(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({
                    "error": "Failed to generate a response",
                    "message": message,
                    "hint": CHAT_HINT,
                }),
            ),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = self.parts();
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::ExecutionError;
    use crate::sql::SqlValidationError;

    #[test]
    fn validation_error_exposes_sql() {
        let err = ApiError(ServiceError::Validation {
            sql: "SELECT 1; DROP TABLE x".to_string(),
            reason: SqlValidationError::ChainedStatement,
        });
        let (status, body) = err.parts();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["sql"], "SELECT 1; DROP TABLE x");
        assert_eq!(body["hint"], VALIDATION_HINT);
    }

    #[test]
    fn execution_error_carries_database_message() {
        let err = ApiError(ServiceError::Execution {
            sql: "SELECT x FROM t".to_string(),
            explanation: "Reads x".to_string(),
            source: ExecutionError::Database("column \"x\" does not exist".to_string()),
        });
        let (_, body) = err.parts();
        assert_eq!(body["message"], "column \"x\" does not exist");
        assert_eq!(body["explanation"], "Reads x");
    }

    #[test]
    fn invalid_input_is_bad_request() {
        let (status, body) = ApiError::invalid_input("nope").parts();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "error": "nope" }));
    }
}
