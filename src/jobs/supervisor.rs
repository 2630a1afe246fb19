//! Job Supervisor
//!
//! Keeps exactly one live producer unit running per job definition, forever.
//! Each definition gets a keeper task that spawns the unit, pumps its
//! messages into the broadcast hub, and restarts it after a fixed delay
//! whenever it terminates for any reason other than shutdown.
//!
//! The backoff is deliberately fixed and unbounded: jobs are user-authored
//! and transient failures are common, so the supervisor optimizes for
//! eventual recovery. A crash-looping job retries at the restart cadence
//! without ever affecting other jobs or the hub.

use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::{mpsc, watch, RwLock};
use tokio::task::JoinHandle;

use super::definition::{JobDefaults, JobDefinition};
use super::runner::{run_unit, UnitMessage};
use crate::stream::BroadcastHub;

/// Configuration for the job supervisor
#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    /// Delay before restarting a terminated unit (fixed, no growth)
    pub restart_delay_ms: u64,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            restart_delay_ms: 2000,
        }
    }
}

/// Supervises all producer units and relays their output into the hub
pub struct JobSupervisor {
    hub: BroadcastHub,
    config: SupervisorConfig,
    shutdown_tx: watch::Sender<bool>,
    /// One keeper per job, keyed by definition name
    keepers: RwLock<HashMap<String, JoinHandle<()>>>,
}

impl JobSupervisor {
    /// Create a supervisor feeding the given hub
    pub fn new(hub: BroadcastHub, config: SupervisorConfig) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            hub,
            config,
            shutdown_tx,
            keepers: RwLock::new(HashMap::new()),
        }
    }

    /// Start one keeper per definition.
    ///
    /// The definition list is fixed for the process lifetime; definitions
    /// added later require a full restart.
    pub async fn start(&self, definitions: Vec<JobDefinition>) {
        let mut keepers = self.keepers.write().await;

        for definition in definitions {
            if keepers.contains_key(definition.name()) {
                tracing::warn!(job = %definition.name(), "Duplicate job name, skipping");
                continue;
            }

            let name = definition.name().to_string();
            let handle = tokio::spawn(keep_running(
                definition,
                self.hub.clone(),
                Duration::from_millis(self.config.restart_delay_ms),
                self.shutdown_tx.subscribe(),
            ));
            keepers.insert(name, handle);
        }

        tracing::info!(jobs = keepers.len(), "Job supervisor started");
    }

    /// Number of supervised jobs
    pub async fn job_count(&self) -> usize {
        self.keepers.read().await.len()
    }

    /// Stop every unit cleanly; no further restarts are scheduled.
    /// Called once, at process shutdown.
    pub async fn shutdown_all(&self) {
        let _ = self.shutdown_tx.send(true);

        let mut keepers = self.keepers.write().await;
        for (name, handle) in keepers.drain() {
            if let Err(e) = handle.await {
                if e.is_panic() {
                    tracing::error!(job = %name, "Keeper panicked during shutdown");
                }
            }
        }

        tracing::info!("All jobs stopped");
    }
}

/// Keeper loop for one definition: spawn the unit, pump its messages,
/// restart it on termination after the fixed delay.
async fn keep_running(
    definition: JobDefinition,
    hub: BroadcastHub,
    restart_delay: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut unit = tokio::spawn(run_unit(definition.clone(), tx));
        let mut defaults = definition.defaults();

        tracing::info!(
            job = %definition.name(),
            interval_ms = defaults.interval_ms,
            "Job unit started"
        );

        let crashed = loop {
            tokio::select! {
                Some(message) = rx.recv() => {
                    relay(&hub, definition.name(), &mut defaults, message).await;
                }
                result = &mut unit => {
                    match result {
                        Err(e) if e.is_panic() => {
                            tracing::error!(job = %definition.name(), "Job unit crashed");
                        }
                        _ => {
                            tracing::warn!(job = %definition.name(), "Job unit exited unexpectedly");
                        }
                    }
                    break true;
                }
                _ = shutdown.changed() => {
                    unit.abort();
                    break false;
                }
            }
        };

        // Messages the unit sent before terminating are still delivered
        while let Ok(message) = rx.try_recv() {
            relay(&hub, definition.name(), &mut defaults, message).await;
        }

        if !crashed {
            tracing::info!(job = %definition.name(), "Job unit stopped");
            return;
        }

        // Fixed, unconditional backoff; a unit that always fails at startup
        // simply retries at this cadence forever.
        tokio::select! {
            _ = tokio::time::sleep(restart_delay) => {}
            _ = shutdown.changed() => return,
        }
    }
}

/// Handle one message from a unit
async fn relay(
    hub: &BroadcastHub,
    job_name: &str,
    defaults: &mut JobDefaults,
    message: UnitMessage,
) {
    match message {
        UnitMessage::Meta(announced) => {
            *defaults = announced;
        }
        UnitMessage::Emit(message) => {
            let message = message
                .with_defaults(defaults.widget_id.as_deref(), defaults.kind.as_deref())
                .stamped();
            hub.ingest(message).await;
        }
        UnitMessage::RunError(error) => {
            tracing::warn!(job = %job_name, error = %error, "Job run failed");
        }
    }
}
