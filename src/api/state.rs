//! Application State
//!
//! Shared state accessible by all API handlers.
//! Wrapped in Arc for thread-safe sharing across async tasks.

use crate::jobs::JobSupervisor;
use crate::stream::BroadcastHub;
use std::sync::Arc;
use std::time::Instant;

/// Shared application state for all handlers
#[derive(Clone)]
pub struct AppState {
    /// Broadcast hub for streaming and ingestion
    pub hub: BroadcastHub,
    /// API configuration
    pub config: Arc<ApiConfig>,
    /// Server start time for uptime tracking
    pub start_time: Instant,
    /// Job supervisor, when jobs are running (health reporting only)
    pub supervisor: Option<Arc<JobSupervisor>>,
}

impl AppState {
    /// Create a new AppState without a job supervisor
    pub fn new(hub: BroadcastHub, config: ApiConfig) -> Self {
        Self {
            hub,
            config: Arc::new(config),
            start_time: Instant::now(),
            supervisor: None,
        }
    }

    /// Create AppState with a running job supervisor
    pub fn with_supervisor(
        hub: BroadcastHub,
        config: ApiConfig,
        supervisor: Arc<JobSupervisor>,
    ) -> Self {
        Self {
            hub,
            config: Arc::new(config),
            start_time: Instant::now(),
            supervisor: Some(supervisor),
        }
    }

    /// Get server uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Number of supervised jobs
    pub async fn job_count(&self) -> usize {
        match &self.supervisor {
            Some(supervisor) => supervisor.job_count().await,
            None => 0,
        }
    }
}

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 4000,
        }
    }
}

impl ApiConfig {
    /// Create config with custom host and port
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Get the socket address string
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
