use crate::config::AppConfig;
use crate::service::AnalyticsService;

/// Shared application state for the web server
pub struct AppState {
    pub config: AppConfig,
    pub service: AnalyticsService,
    pub startup_time: chrono::DateTime<chrono::Utc>,
}

impl AppState {
    pub fn new(config: AppConfig, service: AnalyticsService) -> Self {
        Self {
            config,
            service,
            startup_time: chrono::Utc::now(),
        }
    }

    pub fn uptime_seconds(&self) -> i64 {
        chrono::Utc::now()
            .signed_duration_since(self.startup_time)
            .num_seconds()
    }
}
