//! Built-in Jobs
//!
//! The sample jobs the server ships with, plus the startup discovery that
//! assembles the definition list handed to the supervisor. Invalid
//! definitions are logged and skipped, never started.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;

use super::definition::{Job, JobContext, JobDefinition};
use crate::config::JobsConfig;

/// Emits the current time once per interval.
///
/// The message itself carries no widget ID or type; both are backfilled from
/// the definition defaults by the supervisor.
pub struct ClockJob;

#[async_trait]
impl Job for ClockJob {
    async fn run(&self, ctx: &JobContext) -> anyhow::Result<()> {
        ctx.emit(crate::stream::WidgetMessage {
            widget_id: None,
            kind: None,
            data: Some(json!({
                "time": Utc::now().to_rfc3339(),
                "epochMs": Utc::now().timestamp_millis(),
            })),
            timestamp: None,
        });
        Ok(())
    }
}

/// Emits how long the process has been up
pub struct UptimeJob {
    started: Instant,
}

impl UptimeJob {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
        }
    }
}

impl Default for UptimeJob {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Job for UptimeJob {
    async fn run(&self, ctx: &JobContext) -> anyhow::Result<()> {
        ctx.emit(crate::stream::WidgetMessage {
            widget_id: None,
            kind: None,
            data: Some(json!({ "seconds": self.started.elapsed().as_secs() })),
            timestamp: None,
        });
        Ok(())
    }
}

/// Build the startup job list.
///
/// Runs once at startup; definitions added later are not picked up without a
/// restart. Each job gets a `<settings_dir>/<name>.json` settings path when a
/// settings directory is configured (the file is optional).
pub fn discover(config: &JobsConfig) -> Vec<JobDefinition> {
    let candidates = vec![
        JobDefinition::new(
            "clock",
            config.clock_interval_ms,
            Arc::new(ClockJob) as Arc<dyn Job>,
        )
        .map(|d| d.widget_id("clock").kind("time")),
        JobDefinition::new(
            "uptime",
            config.uptime_interval_ms,
            Arc::new(UptimeJob::new()) as Arc<dyn Job>,
        )
        .map(|d| d.widget_id("uptime").kind("uptime")),
    ];

    let mut definitions = Vec::new();
    for candidate in candidates {
        match candidate {
            Ok(mut definition) => {
                if let Some(dir) = &config.settings_dir {
                    let path = std::path::Path::new(dir)
                        .join(format!("{}.json", definition.name()));
                    definition = definition.settings_path(path);
                }
                tracing::info!(job = %definition.name(), "Discovered job");
                definitions.push(definition);
            }
            Err(e) => {
                tracing::error!(error = %e, "Rejected job definition");
            }
        }
    }

    definitions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::definition::Emitter;
    use crate::jobs::runner::UnitMessage;
    use serde_json::Value;
    use tokio::sync::mpsc;

    #[test]
    fn test_discover_returns_all_builtins() {
        let config = JobsConfig::default();
        let definitions = discover(&config);

        let names: Vec<&str> = definitions.iter().map(|d| d.name()).collect();
        assert_eq!(names, vec!["clock", "uptime"]);
    }

    #[test]
    fn test_discover_skips_invalid_interval() {
        let config = JobsConfig {
            clock_interval_ms: 0,
            ..Default::default()
        };
        let definitions = discover(&config);

        let names: Vec<&str> = definitions.iter().map(|d| d.name()).collect();
        assert_eq!(names, vec!["uptime"]);
    }

    #[tokio::test]
    async fn test_clock_job_emits_time() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let ctx = JobContext::new(Emitter::new(tx), Value::Null);

        ClockJob.run(&ctx).await.unwrap();

        match rx.recv().await {
            Some(UnitMessage::Emit(msg)) => {
                let data = msg.data.unwrap();
                assert!(data["time"].is_string());
                assert!(data["epochMs"].is_i64());
            }
            other => panic!("Expected Emit, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_uptime_job_emits_seconds() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let ctx = JobContext::new(Emitter::new(tx), Value::Null);

        UptimeJob::new().run(&ctx).await.unwrap();

        match rx.recv().await {
            Some(UnitMessage::Emit(msg)) => {
                assert!(msg.data.unwrap()["seconds"].is_u64());
            }
            other => panic!("Expected Emit, got {:?}", other),
        }
    }
}
