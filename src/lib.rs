//! # Widgetcast
//!
//! Live dashboard widget broadcaster: background jobs produce small JSON
//! widget updates on fixed intervals, and a streaming hub fans every update
//! out to all connected display clients over Server-Sent Events.
//!
//! ## Features
//!
//! - **Broadcast hub**: single-writer fan-out with a last-value cache, so a
//!   freshly connected dashboard renders immediately from the latest state
//! - **Supervised jobs**: one isolated task per job, restarted on crash
//!   after a fixed delay; one bad job never takes down the rest
//! - **One-way streaming**: `GET /events` holds an SSE connection open with
//!   a keepalive tick for proxies
//! - **Open ingress**: `POST /api/events` injects messages from operators
//!   and external tools into the same broadcast path
//!
//! ## Modules
//!
//! - [`stream`]: broadcast hub, last-value cache, SSE endpoint
//! - [`jobs`]: job contract, producer units, supervisor
//! - [`api`]: REST surface with Axum
//! - [`config`]: TOML configuration with environment overrides
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use widgetcast::api::{serve, ApiConfig, AppState};
//! use widgetcast::jobs::{JobSupervisor, SupervisorConfig};
//! use widgetcast::stream::{BroadcastHub, HubConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let hub = BroadcastHub::new(HubConfig::default());
//!     let heartbeat = hub.start_heartbeat();
//!
//!     let supervisor = Arc::new(JobSupervisor::new(hub.clone(), SupervisorConfig::default()));
//!     supervisor.start(widgetcast::jobs::discover(&Default::default())).await;
//!
//!     let config = ApiConfig::default();
//!     let state = AppState::with_supervisor(hub, config.clone(), Arc::clone(&supervisor));
//!     serve(state, &config).await?;
//!
//!     supervisor.shutdown_all().await;
//!     heartbeat.abort();
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod config;
pub mod jobs;
pub mod stream;

// Re-export top-level types for convenience
pub use stream::{
    event_stream_handler, BroadcastHub, Envelope, HubConfig, HubError, SubscriberId,
    Subscription, WidgetMessage,
};

pub use jobs::{
    discover, ClockJob, Emitter, Job, JobContext, JobDefaults, JobDefinition, JobError,
    JobSupervisor, SupervisorConfig, UptimeJob,
};

pub use api::{build_router, serve, ApiConfig, ApiError, AppState};

pub use config::{
    generate_default_config, Config, ConfigError, HubConfig as ConfigHubConfig, JobsConfig,
    LoggingConfig, ServerConfig, SupervisorConfig as ConfigSupervisorConfig,
};
