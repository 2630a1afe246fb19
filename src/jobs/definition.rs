//! Job Definitions
//!
//! The contract between user-authored jobs and the supervisor: a job is a
//! periodic producer that, each run, may emit any number of widget messages.
//!
//! Definitions are validated once at load time; a definition with an empty
//! name or a zero interval is rejected (logged, never started) so it cannot
//! enter a restart loop.

use async_trait::async_trait;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;

use super::runner::UnitMessage;
use crate::stream::WidgetMessage;

/// A periodic producer of widget messages.
///
/// `run` is invoked once immediately at unit start and then on every interval
/// tick. Returning `Err` reports a run error and leaves the schedule running;
/// a panic crashes the unit and triggers a supervisor restart.
#[async_trait]
pub trait Job: Send + Sync {
    async fn run(&self, ctx: &JobContext) -> anyhow::Result<()>;
}

/// Handed to each run invocation: the emit callback plus the job's
/// per-instance settings.
pub struct JobContext {
    emitter: Emitter,
    settings: Value,
}

impl JobContext {
    pub(crate) fn new(emitter: Emitter, settings: Value) -> Self {
        Self { emitter, settings }
    }

    /// Emit a widget message. May be called zero or more times per run.
    pub fn emit(&self, message: WidgetMessage) {
        self.emitter.emit(message);
    }

    /// Per-instance settings loaded from the job's settings file
    /// (`Value::Null` when none is configured).
    pub fn settings(&self) -> &Value {
        &self.settings
    }
}

/// Sends a job's output to its supervising keeper.
#[derive(Clone)]
pub struct Emitter {
    tx: mpsc::UnboundedSender<UnitMessage>,
}

impl Emitter {
    pub(crate) fn new(tx: mpsc::UnboundedSender<UnitMessage>) -> Self {
        Self { tx }
    }

    pub fn emit(&self, message: WidgetMessage) {
        // A closed channel means the supervisor is shutting this unit down;
        // the message is intentionally discarded.
        let _ = self.tx.send(UnitMessage::Emit(message));
    }
}

/// The defaults a unit announces once via `meta`, used by the supervisor to
/// backfill emitted messages that omit `widgetId` / `type`.
#[derive(Debug, Clone, PartialEq)]
pub struct JobDefaults {
    pub widget_id: Option<String>,
    pub kind: Option<String>,
    pub interval_ms: u64,
}

/// Static description of a job: name, interval, emit defaults, and the job
/// implementation itself.
#[derive(Clone)]
pub struct JobDefinition {
    name: String,
    interval_ms: u64,
    widget_id: Option<String>,
    kind: Option<String>,
    settings_path: Option<PathBuf>,
    job: Arc<dyn Job>,
}

impl JobDefinition {
    /// Create a definition, validating the required fields
    pub fn new(
        name: impl Into<String>,
        interval_ms: u64,
        job: Arc<dyn Job>,
    ) -> Result<Self, JobError> {
        let name = name.into();
        if name.is_empty() {
            return Err(JobError::MissingName);
        }
        if interval_ms == 0 {
            return Err(JobError::InvalidInterval { name });
        }

        Ok(Self {
            name,
            interval_ms,
            widget_id: None,
            kind: None,
            settings_path: None,
            job,
        })
    }

    /// Default widget ID for messages that omit one
    pub fn widget_id(mut self, widget_id: impl Into<String>) -> Self {
        self.widget_id = Some(widget_id.into());
        self
    }

    /// Default type tag for messages that omit one
    pub fn kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    /// JSON file read at unit start and passed to every run via the context
    pub fn settings_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.settings_path = Some(path.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn defaults(&self) -> JobDefaults {
        JobDefaults {
            widget_id: self.widget_id.clone(),
            kind: self.kind.clone(),
            interval_ms: self.interval_ms,
        }
    }

    pub(crate) fn job(&self) -> Arc<dyn Job> {
        Arc::clone(&self.job)
    }

    pub(crate) fn settings_file(&self) -> Option<&Path> {
        self.settings_path.as_deref()
    }
}

impl std::fmt::Debug for JobDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobDefinition")
            .field("name", &self.name)
            .field("interval_ms", &self.interval_ms)
            .field("widget_id", &self.widget_id)
            .field("kind", &self.kind)
            .finish()
    }
}

/// Errors rejecting a job definition at load time
#[derive(Debug, Error)]
pub enum JobError {
    #[error("Job definition has an empty name")]
    MissingName,

    #[error("Job '{name}' must have a positive interval")]
    InvalidInterval { name: String },
}
