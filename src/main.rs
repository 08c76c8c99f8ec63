use clap::Parser;
use std::sync::Arc;
use tracing::{error, info};

mod cache;
mod config;
mod db;
mod llm;
mod service;
mod sql;
mod util;
mod web;

#[cfg(test)]
mod testing;

use crate::cache::CacheStore;
use crate::config::{AppConfig, CliArgs};
use crate::llm::LlmManager;
use crate::service::AnalyticsService;
use crate::util::logging::init_tracing;
use crate::web::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    init_tracing();

    // Parse command line arguments
    let args = CliArgs::parse();

    // Load configuration
    let config = match AppConfig::new(&args) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    info!("Initializing LLM manager with backend: {}", config.llm.backend);
    let llm_manager = Arc::new(LlmManager::new(&config.llm)?);
    info!("LLM backend ready: {}", llm_manager.backend());

    info!("Initializing query executor with backend: {}", config.database.backend);
    let executor = db::executor_from_config(&config.database)?;

    info!("Initializing cache with backend: {}", config.cache.backend);
    let cache = CacheStore::from_config(&config.cache)?;

    let service = AnalyticsService::new(cache, llm_manager, executor);
    let app_state = Arc::new(AppState::new(config.clone(), service));

    // Start the web server
    info!("Starting NL-Analytics server on {}:{}", config.web.host, config.web.port);
    match web::run_server(config.web, app_state).await {
        Ok(_) => info!("Server stopped gracefully"),
        Err(e) => {
            error!("Server error: {}", e);
            return Err(e.into());
        }
    }

    Ok(())
}
