use clap::Parser;
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct WebConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LlmConfig {
    pub backend: String, // "remote" or "ollama"
    pub model: String,
    pub api_key: Option<String>,
    pub api_url: Option<String>,
    pub temperature: f32,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DatabaseConfig {
    pub backend: String, // "rpc" or "duckdb"
    pub url: Option<String>,
    pub api_key: Option<String>,
    /// Stored procedure invoked by the rpc backend.
    pub function: String,
    /// DuckDB file used by the duckdb backend.
    pub connection_string: String,
    pub pool_size: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CacheConfig {
    pub backend: String, // "upstash" or "memory"
    pub url: Option<String>,
    pub token: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    pub web: WebConfig,
    pub llm: LlmConfig,
    pub database: DatabaseConfig,
    pub cache: CacheConfig,
}

#[derive(Parser, Debug, Default)]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Host to bind to
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to
    #[arg(short, long)]
    pub port: Option<u16>,
}

impl AppConfig {
    pub fn new(args: &CliArgs) -> Result<Self, ConfigError> {
        // Start with default configuration
        let mut config_builder =
            Config::builder().add_source(Config::try_from(&AppConfig::default())?);

        // Add configuration from file if specified
        if let Some(config_path) = &args.config {
            config_builder = config_builder.add_source(File::from(config_path.as_path()));
        } else {
            let default_locations = vec![
                "config.toml",
                "config/config.toml",
                "/etc/nl-analytics/config.toml",
            ];

            for location in default_locations {
                if Path::new(location).exists() {
                    config_builder =
                        config_builder.add_source(File::new(location, config::FileFormat::Toml));
                    break;
                }
            }
        }

        // Secrets usually arrive through the environment,
        // e.g. NL_ANALYTICS__LLM__API_KEY
        config_builder = config_builder.add_source(
            Environment::with_prefix("NL_ANALYTICS")
                .prefix_separator("__")
                .separator("__"),
        );

        let mut config: AppConfig = config_builder.build()?.try_deserialize()?;

        // Override with command line args if provided
        if let Some(host) = &args.host {
            config.web.host = host.clone();
        }
        if let Some(port) = args.port {
            config.web.port = port;
        }

        Ok(config)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            web: WebConfig {
                host: "127.0.0.1".to_string(),
                port: 3000,
            },
            llm: LlmConfig {
                backend: "remote".to_string(),
                model: "gpt-4o-mini".to_string(),
                api_key: None,
                api_url: Some("https://api.openai.com/v1/chat/completions".to_string()),
                temperature: 0.1,
            },
            database: DatabaseConfig {
                backend: "duckdb".to_string(),
                url: None,
                api_key: None,
                function: "execute_sql".to_string(),
                connection_string: "olist.duckdb".to_string(),
                pool_size: 5,
            },
            cache: CacheConfig {
                backend: "memory".to_string(),
                url: None,
                token: None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn file_values_override_defaults() {
        let path = std::env::temp_dir().join(format!(
            "nl-analytics-config-{}.toml",
            std::process::id()
        ));
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            "[web]\nport = 8080\n\n[cache]\nbackend = \"upstash\"\nurl = \"https://kv.example\"\ntoken = \"t\""
        )
        .unwrap();

        let args = CliArgs {
            config: Some(path.clone()),
            host: Some("0.0.0.0".to_string()),
            port: None,
        };
        let config = AppConfig::new(&args).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(config.web.port, 8080);
        assert_eq!(config.web.host, "0.0.0.0");
        assert_eq!(config.cache.backend, "upstash");
        assert_eq!(config.cache.token.as_deref(), Some("t"));
        assert_eq!(config.database.function, "execute_sql");
        assert_eq!(config.llm.backend, "remote");
    }
}
