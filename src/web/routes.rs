use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use super::handlers;
use super::state::AppState;

// API Routes, served at the root and mirrored under /api
pub fn api_routes() -> Router<Arc<AppState>> {
    let routes = Router::new()
        // Question answering
        .route("/analytics-query", post(handlers::api::analytics_query))
        .route("/chat", post(handlers::api::chat))

        // Cache administration
        .route(
            "/cache/clear",
            post(handlers::api::clear_cache_entry).delete(handlers::api::clear_all_cache),
        )

        // System status
        .route("/status", get(handlers::api::system_status));

    Router::new().merge(routes.clone()).nest("/api", routes)
}
