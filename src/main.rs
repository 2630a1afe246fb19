//! Widgetcast Server
//!
//! Run with: cargo run
//!
//! # Configuration
//!
//! Loaded from `--config`, then default locations, then environment:
//! - `WIDGETCAST_HOST`: Host to bind to (default: 0.0.0.0)
//! - `WIDGETCAST_PORT`: Port to listen on (default: 4000)
//! - `WIDGETCAST_JOBS_DIR`: Directory with per-job settings files
//! - `WIDGETCAST_LOG_LEVEL` / `WIDGETCAST_LOG_FORMAT`: Logging
//! - `RUST_LOG`: Overrides the log filter entirely

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use widgetcast::api::{serve, ApiConfig, AppState};
use widgetcast::config::{generate_default_config, Config, LoggingConfig};
use widgetcast::jobs::{self, JobSupervisor};
use widgetcast::stream::BroadcastHub;

#[derive(Parser)]
#[command(name = "widgetcast", version, about = "Live dashboard widget broadcaster")]
struct Cli {
    /// Path to a TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the server host
    #[arg(long)]
    host: Option<String>,

    /// Override the server port
    #[arg(long)]
    port: Option<u16>,

    /// Print a default config file and exit
    #[arg(long)]
    print_config: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.print_config {
        print!("{}", generate_default_config());
        return Ok(());
    }

    let mut config = match &cli.config {
        Some(path) => Config::load_with_env(path)?,
        None => Config::load_default(),
    };
    if let Some(host) = cli.host {
        config.server.host = host;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }

    init_tracing(&config.logging);

    tracing::info!("Starting Widgetcast v{}", env!("CARGO_PKG_VERSION"));

    // Hub and its keepalive tick
    let hub = BroadcastHub::new((&config.hub).into());
    let heartbeat = hub.start_heartbeat();

    // Discover and supervise jobs
    let definitions = jobs::discover(&config.jobs);
    tracing::info!("Discovered {} job(s)", definitions.len());

    let supervisor = Arc::new(JobSupervisor::new(hub.clone(), (&config.supervisor).into()));
    supervisor.start(definitions).await;

    // Run the server until a shutdown signal arrives
    let api_config = ApiConfig::new(config.server.host.clone(), config.server.port);
    let state = AppState::with_supervisor(hub, api_config.clone(), Arc::clone(&supervisor));

    serve(state, &api_config).await?;

    // Graceful teardown
    tracing::info!("Stopping jobs...");
    supervisor.shutdown_all().await;
    heartbeat.abort();

    tracing::info!("Widgetcast stopped");
    Ok(())
}

/// Initialize the tracing subscriber per logging config
fn init_tracing(config: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!(
            "widgetcast={},tower_http=info",
            config.level
        ))
    });

    let registry = tracing_subscriber::registry().with(filter);

    if config.format == "json" {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}
