use serde::{Deserialize, Serialize};
use std::fmt;

/// Only this many trailing turns are forwarded to the model as context.
pub const MAX_HISTORY_TURNS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VisualizationType {
    #[default]
    Table,
    Bar,
    Line,
    Pie,
    Map,
    Metric,
}

impl VisualizationType {
    /// Lenient parse of a model-supplied hint; anything unknown becomes `Table`.
    pub fn from_hint(hint: Option<&str>) -> Self {
        match hint.map(|h| h.trim().to_lowercase()).as_deref() {
            Some("bar") => Self::Bar,
            Some("line") => Self::Line,
            Some("pie") => Self::Pie,
            Some("map") => Self::Map,
            Some("metric") => Self::Metric,
            _ => Self::Table,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => write!(f, "User"),
            Role::Assistant => write!(f, "Assistant"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
    /// Client-supplied; either epoch millis or an ISO string, never interpreted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<serde_json::Value>,
}

/// The most recent turns, oldest first.
pub fn recent_turns(history: &[ConversationTurn]) -> &[ConversationTurn] {
    let start = history.len().saturating_sub(MAX_HISTORY_TURNS);
    &history[start..]
}

/// Outcome of NL→SQL generation.
#[derive(Debug, Clone, PartialEq)]
pub enum Generation {
    /// No query to run; the explanation is the whole answer.
    Conversational {
        explanation: String,
        visualization_type: VisualizationType,
    },
    /// A statement that already passed the read-only checks.
    Query {
        sql: String,
        explanation: String,
        visualization_type: VisualizationType,
    },
}

#[cfg(test)]
impl Generation {
    pub fn explanation(&self) -> &str {
        match self {
            Generation::Conversational { explanation, .. } => explanation,
            Generation::Query { explanation, .. } => explanation,
        }
    }

    pub fn visualization_type(&self) -> VisualizationType {
        match self {
            Generation::Conversational { visualization_type, .. } => *visualization_type,
            Generation::Query { visualization_type, .. } => *visualization_type,
        }
    }
}
