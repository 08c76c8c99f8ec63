use crate::cache::{chat_key, query_key, SetOptions};
use crate::llm::generator::is_greeting;
use crate::llm::models::ConversationTurn;
use crate::llm::prompt::chat_prompt;
use crate::service::summary::summarize;
use crate::service::{require_question, AnalyticsService, QueryResponse, ServiceError};
use tracing::{error, info, warn};

/// Bounded grounding sample pulled in when the caller asks for data.
pub const SAMPLE_QUERY: &str = "SELECT * FROM olist_orders LIMIT 5";

/// Context tag folded into the chat cache key when data was included.
pub const WITH_DATA_CONTEXT: &str = "with-data";

#[derive(Debug, Clone, PartialEq)]
pub struct ChatReply {
    pub text: String,
    pub cached: bool,
}

pub fn chat_cache_key(question: &str, include_data: bool) -> String {
    chat_key(question, include_data.then_some(WITH_DATA_CONTEXT))
}

impl AnalyticsService {
    /// Conversational answer. Reuses a cached analytics answer for the same
    /// question when one exists, then the chat cache, then the model.
    pub async fn chat(
        &self,
        question: &str,
        include_data: bool,
        history: &[ConversationTurn],
    ) -> Result<ChatReply, ServiceError> {
        let question = require_question(question)?;

        if !is_greeting(question) {
            if let Some(answer) = self.cache.get::<QueryResponse>(&query_key(question)).await {
                if !answer.data.is_empty() {
                    info!("Answering chat from cached analytics result: {}", question);
                    return Ok(ChatReply {
                        text: summarize(&answer.explanation, &answer.data, &answer.columns),
                        cached: true,
                    });
                }
            }
        }

        let key = chat_cache_key(question, include_data);
        if let Some(text) = self.cache.get::<String>(&key).await {
            info!("Serving cached chat answer for: {}", question);
            return Ok(ChatReply { text, cached: true });
        }

        let data_context = if include_data {
            self.sample_rows().await
        } else {
            None
        };

        let prompt = chat_prompt(question, data_context.as_deref(), history);
        let text = self.llm.complete(&prompt).await.map_err(|e| {
            error!("Chat generation failed: {}", e);
            ServiceError::Chat(e)
        })?;
        let text = text.trim().to_string();

        self.cache.set(&key, &text, SetOptions::default()).await;
        Ok(ChatReply { text, cached: false })
    }

    async fn sample_rows(&self) -> Option<String> {
        match self.executor.execute(SAMPLE_QUERY).await {
            Ok(result) if !result.data.is_empty() => serde_json::to_string_pretty(&result.data).ok(),
            Ok(_) => None,
            Err(e) => {
                warn!("Could not fetch sample rows for chat context: {}", e);
                None
            }
        }
    }
}
