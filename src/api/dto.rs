//! API Request/Response Types
//!
//! Data transfer objects for the HTTP surface.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// POST /api/events request body.
///
/// Every field is optional; defaults are substituted wherever structurally
/// possible, so there is effectively no reject path beyond malformed JSON.
#[derive(Debug, Clone, Deserialize)]
pub struct PublishRequest {
    /// Semantic type tag, defaults to "message"
    #[serde(rename = "type")]
    pub kind: Option<String>,
    /// Payload, defaults to an empty object
    pub data: Option<Value>,
    /// Explicit channel key; omitted, the type tag is used for caching
    #[serde(rename = "widgetId")]
    pub widget_id: Option<String>,
}

/// POST /api/events response: accepted-for-processing, delivery best-effort
#[derive(Debug, Serialize)]
pub struct PublishResponse {
    pub ok: bool,
}

/// GET /health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub address: String,
    pub subscribers: usize,
    pub jobs: usize,
    pub uptime_seconds: u64,
    pub version: String,
}
