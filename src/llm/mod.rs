pub mod generator;
pub mod models;
pub mod prompt;
pub mod providers;

use crate::config::LlmConfig;
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("LLM connection error: {0}")]
    ConnectionError(String),

    #[error("LLM response error: {0}")]
    ResponseError(String),

    #[error("LLM configuration error: {0}")]
    ConfigError(String),
}

/// An external text-generation endpoint: prompt in, text out.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, LlmError>;
}

pub struct LlmManager {
    backend: String,
    generator: Box<dyn TextGenerator>,
}

impl LlmManager {
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        let generator: Box<dyn TextGenerator> = match config.backend.as_str() {
            "remote" => Box::new(providers::remote::RemoteLlmProvider::new(config)?),
            "ollama" => Box::new(providers::ollama::OllamaProvider::new(config)?),
            _ => {
                return Err(LlmError::ConfigError(format!(
                    "Unsupported LLM backend: {}",
                    config.backend
                )))
            }
        };

        Ok(Self {
            backend: config.backend.clone(),
            generator,
        })
    }

    pub fn backend(&self) -> &str {
        &self.backend
    }
}

#[async_trait]
impl TextGenerator for LlmManager {
    async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        self.generator.complete(prompt).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(backend: &str) -> LlmConfig {
        LlmConfig {
            backend: backend.to_string(),
            model: "test-model".to_string(),
            api_key: Some("key".to_string()),
            api_url: Some("http://localhost:9/v1/chat/completions".to_string()),
            temperature: 0.1,
        }
    }

    #[test]
    fn selects_backend_by_name() {
        assert_eq!(LlmManager::new(&config("remote")).unwrap().backend(), "remote");
        assert_eq!(LlmManager::new(&config("ollama")).unwrap().backend(), "ollama");
    }

    #[test]
    fn rejects_unknown_backend() {
        assert!(matches!(
            LlmManager::new(&config("local")),
            Err(LlmError::ConfigError(_))
        ));
    }

    #[test]
    fn remote_backend_requires_api_key() {
        let mut cfg = config("remote");
        cfg.api_key = None;
        assert!(LlmManager::new(&cfg).is_err());
    }
}
