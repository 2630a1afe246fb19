//! Producer Unit
//!
//! One isolated execution of a job definition. The unit announces its
//! defaults once, then runs the job on a fixed-period timer forever. It talks
//! to its supervising keeper only through the unit channel; a closed channel
//! is the stop signal.

use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinSet;

use super::definition::{Emitter, JobContext, JobDefaults, JobDefinition};
use crate::stream::WidgetMessage;

/// The unit → supervisor protocol
#[derive(Debug)]
pub(crate) enum UnitMessage {
    /// One-time defaults announcement, sent before the first emit
    Meta(JobDefaults),
    /// A produced widget message
    Emit(WidgetMessage),
    /// A single run invocation failed; the schedule keeps running
    RunError(String),
}

/// Drive one producer unit until it is stopped or crashes.
///
/// The timer is fixed-period: each tick spawns an independent invocation
/// task, so a slow run neither delays the next tick nor serializes with it.
/// An invocation returning `Err` is reported as a run error; an invocation
/// that panics is resumed here, crashing the unit so the supervisor restarts
/// it.
pub(crate) async fn run_unit(definition: JobDefinition, tx: mpsc::UnboundedSender<UnitMessage>) {
    if tx.send(UnitMessage::Meta(definition.defaults())).is_err() {
        return;
    }

    let settings = load_settings(&definition).await;

    let mut interval = tokio::time::interval(definition.interval());
    let mut invocations: JoinSet<anyhow::Result<()>> = JoinSet::new();

    loop {
        tokio::select! {
            _ = interval.tick() => {
                if tx.is_closed() {
                    tracing::debug!(job = %definition.name(), "Unit channel closed, stopping");
                    break;
                }
                let job = definition.job();
                let ctx = JobContext::new(Emitter::new(tx.clone()), settings.clone());
                invocations.spawn(async move { job.run(&ctx).await });
            }
            Some(result) = invocations.join_next() => {
                match result {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => {
                        let _ = tx.send(UnitMessage::RunError(e.to_string()));
                    }
                    Err(join_err) if join_err.is_panic() => {
                        std::panic::resume_unwind(join_err.into_panic());
                    }
                    Err(_) => {} // invocation cancelled during teardown
                }
            }
        }
    }
}

/// Read the job's per-instance settings file, if configured.
/// Missing or invalid files fall back to `Value::Null`.
async fn load_settings(definition: &JobDefinition) -> Value {
    let Some(path) = definition.settings_file() else {
        return Value::Null;
    };

    match tokio::fs::read_to_string(path).await {
        Ok(content) => match serde_json::from_str(&content) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(
                    job = %definition.name(),
                    path = %path.display(),
                    error = %e,
                    "Invalid settings file, ignoring"
                );
                Value::Null
            }
        },
        Err(e) => {
            tracing::debug!(
                job = %definition.name(),
                path = %path.display(),
                error = %e,
                "No settings file"
            );
            Value::Null
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::definition::Job;
    use async_trait::async_trait;
    use serde_json::json;
    use std::io::Write;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    struct EmitOnce;

    #[async_trait]
    impl Job for EmitOnce {
        async fn run(&self, ctx: &JobContext) -> anyhow::Result<()> {
            ctx.emit(WidgetMessage::new("w", "t", json!({"v": 1})));
            Ok(())
        }
    }

    struct AlwaysFails;

    #[async_trait]
    impl Job for AlwaysFails {
        async fn run(&self, _ctx: &JobContext) -> anyhow::Result<()> {
            anyhow::bail!("feed unavailable")
        }
    }

    struct PanicsOnFirstRun {
        runs: AtomicUsize,
    }

    #[async_trait]
    impl Job for PanicsOnFirstRun {
        async fn run(&self, ctx: &JobContext) -> anyhow::Result<()> {
            if self.runs.fetch_add(1, Ordering::SeqCst) == 0 {
                panic!("boom");
            }
            ctx.emit(WidgetMessage::new("w", "t", json!({"recovered": true})));
            Ok(())
        }
    }

    struct EchoSettings;

    #[async_trait]
    impl Job for EchoSettings {
        async fn run(&self, ctx: &JobContext) -> anyhow::Result<()> {
            ctx.emit(WidgetMessage::new("w", "t", ctx.settings().clone()));
            Ok(())
        }
    }

    fn definition(job: Arc<dyn Job>) -> JobDefinition {
        JobDefinition::new("test-job", 10, job).unwrap()
    }

    #[tokio::test]
    async fn test_meta_announced_before_first_emit() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let unit = tokio::spawn(run_unit(definition(Arc::new(EmitOnce)), tx));

        match rx.recv().await {
            Some(UnitMessage::Meta(defaults)) => assert_eq!(defaults.interval_ms, 10),
            other => panic!("Expected Meta first, got {:?}", other),
        }
        match rx.recv().await {
            Some(UnitMessage::Emit(msg)) => assert_eq!(msg.widget_id.as_deref(), Some("w")),
            other => panic!("Expected Emit, got {:?}", other),
        }

        unit.abort();
    }

    #[tokio::test]
    async fn test_run_error_reported_and_schedule_continues() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let unit = tokio::spawn(run_unit(definition(Arc::new(AlwaysFails)), tx));

        // Meta, then at least two run errors from consecutive ticks
        assert!(matches!(rx.recv().await, Some(UnitMessage::Meta(_))));
        for _ in 0..2 {
            match rx.recv().await {
                Some(UnitMessage::RunError(e)) => assert!(e.contains("feed unavailable")),
                other => panic!("Expected RunError, got {:?}", other),
            }
        }

        unit.abort();
    }

    #[tokio::test]
    async fn test_panicking_run_crashes_unit() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let job = Arc::new(PanicsOnFirstRun {
            runs: AtomicUsize::new(0),
        });
        let unit = tokio::spawn(run_unit(definition(job), tx));

        assert!(matches!(rx.recv().await, Some(UnitMessage::Meta(_))));

        let result = tokio::time::timeout(Duration::from_secs(1), unit)
            .await
            .expect("unit should terminate");
        assert!(result.expect_err("unit should panic").is_panic());
    }

    #[tokio::test]
    async fn test_closed_channel_stops_unit() {
        let (tx, rx) = mpsc::unbounded_channel();
        let unit = tokio::spawn(run_unit(definition(Arc::new(EmitOnce)), tx));
        drop(rx);

        tokio::time::timeout(Duration::from_secs(1), unit)
            .await
            .expect("unit should stop once the channel closes")
            .expect("clean stop is not a panic");
    }

    #[tokio::test]
    async fn test_settings_file_passed_to_runs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("echo.json");
        let mut file = std::fs::File::create(&path).unwrap();
        write!(file, r#"{{"label": "hello"}}"#).unwrap();

        let def = JobDefinition::new("echo", 10, Arc::new(EchoSettings) as Arc<dyn Job>)
            .unwrap()
            .settings_path(&path);

        let (tx, mut rx) = mpsc::unbounded_channel();
        let unit = tokio::spawn(run_unit(def, tx));

        assert!(matches!(rx.recv().await, Some(UnitMessage::Meta(_))));
        match rx.recv().await {
            Some(UnitMessage::Emit(msg)) => {
                assert_eq!(msg.data, Some(json!({"label": "hello"})));
            }
            other => panic!("Expected Emit, got {:?}", other),
        }

        unit.abort();
    }
}
