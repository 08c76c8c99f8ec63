use crate::cache::{query_key, SetOptions};
use crate::llm::generator::is_greeting;
use crate::llm::models::{ConversationTurn, Generation};
use crate::service::{require_question, AnalyticsService, QueryResponse, ServiceError};
use std::time::Instant;
use tracing::{error, info};

impl AnalyticsService {
    /// Answers a question with data: cache, then generation, then execution,
    /// then a best-effort cache write.
    pub async fn analytics(
        &self,
        question: &str,
        history: &[ConversationTurn],
    ) -> Result<QueryResponse, ServiceError> {
        let question = require_question(question)?;
        let started = Instant::now();

        let key = (!is_greeting(question)).then(|| query_key(question));
        if let Some(key) = &key {
            if let Some(hit) = self.cache.get::<QueryResponse>(key).await {
                info!("Serving cached analytics answer for: {}", question);
                return Ok(QueryResponse { cached: true, ..hit });
            }
        }

        let (sql, explanation, visualization_type) =
            match self.generator.generate_sql(question, history).await? {
                Generation::Conversational {
                    explanation,
                    visualization_type,
                } => {
                    return Ok(QueryResponse {
                        sql: String::new(),
                        explanation,
                        data: Vec::new(),
                        columns: Vec::new(),
                        visualization_type,
                        cached: false,
                        execution_time: None,
                        is_conversational: Some(true),
                    });
                }
                Generation::Query {
                    sql,
                    explanation,
                    visualization_type,
                } => (sql, explanation, visualization_type),
            };

        let result = match self.executor.execute(&sql).await {
            Ok(result) => result,
            Err(source) => {
                error!("Query execution failed for {}: {}", sql, source);
                return Err(ServiceError::Execution {
                    sql,
                    explanation,
                    source,
                });
            }
        };

        let response = QueryResponse {
            sql,
            explanation,
            data: result.data,
            columns: result.columns,
            visualization_type,
            cached: false,
            execution_time: Some(started.elapsed().as_millis() as u64),
            is_conversational: None,
        };

        if let Some(key) = &key {
            self.cache.set(key, &response, SetOptions::default()).await;
        }

        info!(
            "Answered '{}' with {} rows in {}ms",
            question,
            response.data.len(),
            response.execution_time.unwrap_or_default()
        );
        Ok(response)
    }
}
