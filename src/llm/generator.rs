use crate::llm::models::{ConversationTurn, Generation, VisualizationType};
use crate::llm::prompt::sql_prompt;
use crate::llm::{LlmError, TextGenerator};
use crate::sql::{strip_terminator, validate, SqlValidationError};
use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

const EXCERPT_CHARS: usize = 200;

lazy_static! {
    // Trailing punctuation and whitespace still count as a bare greeting.
    static ref GREETING: Regex = Regex::new(
        r"^(hi|hello|hey|greetings|good (morning|afternoon|evening)|howdy)[\s!.?,]*$"
    )
    .unwrap();
    static ref GENERAL_OPENER: Regex =
        Regex::new(r"^(what|who|when|where|why|how|explain|tell me|help|can you)\b").unwrap();
    static ref NUMERIC_REQUEST: Regex =
        Regex::new(r"\b(how many|how much|count|total|sum|average)\b.*\bin\b").unwrap();
}

/// Words that mark a question as being about the data.
const DATA_KEYWORDS: &[&str] = &[
    "count", "total", "sum", "average", "avg", "revenue", "sales", "orders", "order",
    "customers", "customer", "products", "product", "sellers", "seller", "payments",
    "payment", "reviews", "review", "rating", "price", "freight", "delivery", "by",
    "category", "state", "city", "top", "month", "year", "trend",
];

pub const CONVERSATIONAL_REPLY: &str = "Hi! I can answer questions about the e-commerce data by turning them into SQL.\n\
Try asking something like:\n\
- What is the total number of orders?\n\
- Show revenue by month\n\
- Top 10 product categories by sales\n\
- Which states have the most customers?\n\
- What is the average review score by category?";

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("{0}")]
    Llm(#[from] LlmError),

    #[error("Could not parse the model response as JSON. Response excerpt: {excerpt}")]
    Unparsable { excerpt: String },

    #[error("Generated SQL failed validation: {source}")]
    Validation {
        sql: String,
        #[source]
        source: SqlValidationError,
    },
}

#[derive(Debug, Deserialize)]
struct RawGeneration {
    #[serde(default)]
    sql: Option<String>,
    #[serde(default)]
    explanation: Option<String>,
    #[serde(default, rename = "visualizationType")]
    visualization_type: Option<String>,
}

pub fn is_greeting(question: &str) -> bool {
    GREETING.is_match(&question.trim().to_lowercase())
}

fn contains_word(text: &str, word: &str) -> bool {
    text.split(|ch: char| !ch.is_alphanumeric())
        .any(|token| token == word)
}

/// An open-ended question that does not ask anything of the data.
pub fn is_general_question(question: &str) -> bool {
    let normalized = question.trim().to_lowercase();
    GENERAL_OPENER.is_match(&normalized)
        && !DATA_KEYWORDS.iter().any(|kw| contains_word(&normalized, kw))
        && !NUMERIC_REQUEST.is_match(&normalized)
}

pub fn conversational_reply() -> Generation {
    Generation::Conversational {
        explanation: CONVERSATIONAL_REPLY.to_string(),
        visualization_type: VisualizationType::Table,
    }
}

fn excerpt(text: &str) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(EXCERPT_CHARS).collect();
    if chars.next().is_some() {
        format!("{}...", head)
    } else {
        head
    }
}

fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the language tag line, e.g. ```json
    let body = rest.split_once('\n').map(|(_, body)| body).unwrap_or(rest);
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

fn parse_raw(text: &str) -> Result<RawGeneration, GenerationError> {
    let cleaned = strip_code_fences(text);
    if let Ok(raw) = serde_json::from_str::<RawGeneration>(cleaned) {
        return Ok(raw);
    }

    let embedded = match (cleaned.find('{'), cleaned.rfind('}')) {
        (Some(start), Some(end)) if start < end => Some(&cleaned[start..=end]),
        _ => None,
    };

    embedded
        .and_then(|candidate| serde_json::from_str::<RawGeneration>(candidate).ok())
        .ok_or_else(|| GenerationError::Unparsable {
            excerpt: excerpt(text),
        })
}

/// Turns a model reply into a [`Generation`], validating any SQL it carries.
pub fn parse_generation(text: &str) -> Result<Generation, GenerationError> {
    let raw = parse_raw(text)?;
    let explanation = raw.explanation.unwrap_or_default();
    let visualization_type = VisualizationType::from_hint(raw.visualization_type.as_deref());

    let sql = raw
        .sql
        .as_deref()
        .map(strip_terminator)
        .unwrap_or_default();

    if sql.is_empty() {
        return Ok(Generation::Conversational {
            explanation,
            visualization_type,
        });
    }

    validate(sql).map_err(|source| {
        warn!("Rejected generated SQL ({}): {}", source, sql);
        GenerationError::Validation {
            sql: sql.to_string(),
            source,
        }
    })?;

    Ok(Generation::Query {
        sql: sql.to_string(),
        explanation,
        visualization_type,
    })
}

/// NL→SQL front end over a [`TextGenerator`]. One outbound call per question,
/// none for greetings and general chit-chat, never retried.
#[derive(Clone)]
pub struct SqlGenerator {
    llm: Arc<dyn TextGenerator>,
}

impl SqlGenerator {
    pub fn new(llm: Arc<dyn TextGenerator>) -> Self {
        Self { llm }
    }

    pub async fn generate_sql(
        &self,
        question: &str,
        history: &[ConversationTurn],
    ) -> Result<Generation, GenerationError> {
        if is_greeting(question) || is_general_question(question) {
            debug!("Answering without a query: {}", question);
            return Ok(conversational_reply());
        }

        let prompt = sql_prompt(question, history);
        let response = self.llm.complete(&prompt).await?;
        debug!("Raw generation response: {}", response);

        let generation = parse_generation(&response)?;
        if let Generation::Query { sql, .. } = &generation {
            info!("Generated SQL: {}", sql);
        }
        Ok(generation)
    }
}
