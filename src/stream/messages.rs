//! Widget Message Types
//!
//! Defines the message format flowing from jobs and the ingress API through
//! the broadcast hub to connected dashboard clients.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single widget update flowing through the system.
///
/// Both `widget_id` and `kind` are optional; the channel key used for
/// last-value caching is derived from whichever is present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WidgetMessage {
    /// Logical identity of the data stream this update belongs to
    #[serde(rename = "widgetId", skip_serializing_if = "Option::is_none")]
    pub widget_id: Option<String>,
    /// Semantic tag describing the payload shape (e.g. "weather", "tick")
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Producer-defined payload; messages without one are never cached
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    /// ISO-8601 timestamp, stamped by the first component to observe the message
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl WidgetMessage {
    /// Create a message with a payload
    pub fn new(widget_id: impl Into<String>, kind: impl Into<String>, data: Value) -> Self {
        Self {
            widget_id: Some(widget_id.into()),
            kind: Some(kind.into()),
            data: Some(data),
            timestamp: None,
        }
    }

    /// Create a payload-less message (e.g. the keepalive tick)
    pub fn bare(kind: impl Into<String>) -> Self {
        Self {
            widget_id: None,
            kind: Some(kind.into()),
            data: None,
            timestamp: None,
        }
    }

    /// The key under which this message is cached: explicit widget ID,
    /// falling back to the type tag. `None` means cache-ineligible.
    pub fn channel_key(&self) -> Option<&str> {
        self.widget_id.as_deref().or(self.kind.as_deref())
    }

    /// Fill in missing `widget_id` / `kind` from job-level defaults
    pub fn with_defaults(mut self, widget_id: Option<&str>, kind: Option<&str>) -> Self {
        if self.widget_id.is_none() {
            self.widget_id = widget_id.map(str::to_string);
        }
        if self.kind.is_none() {
            self.kind = kind.map(str::to_string);
        }
        self
    }

    /// Stamp `timestamp = now` if not already set
    pub fn stamped(mut self) -> Self {
        if self.timestamp.is_none() {
            self.timestamp = Some(Utc::now());
        }
        self
    }
}

/// A broadcast message paired with its global sequence id.
///
/// The id becomes the SSE event id, so each subscriber sees a strictly
/// increasing id sequence across replay and live delivery.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Envelope {
    pub id: u64,
    #[serde(flatten)]
    pub message: WidgetMessage,
}
