//! Ingress Route
//!
//! Externally submitted messages enter the hub here, on the same fan-out
//! path as job output.
//!
//! - POST /api/events - Publish a message to all subscribers

use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;

use crate::api::dto::{PublishRequest, PublishResponse};
use crate::api::error::ApiResult;
use crate::api::state::AppState;
use crate::stream::WidgetMessage;

/// POST /api/events
///
/// Accepts the message for broadcast and responds immediately; delivery to
/// subscribers is best-effort and fully decoupled from this request.
pub async fn publish_event(
    State(state): State<Arc<AppState>>,
    Json(req): Json<PublishRequest>,
) -> ApiResult<(StatusCode, Json<PublishResponse>)> {
    let message = WidgetMessage {
        widget_id: req.widget_id,
        kind: Some(req.kind.unwrap_or_else(|| "message".to_string())),
        data: Some(req.data.unwrap_or_else(|| serde_json::json!({}))),
        timestamp: None,
    }
    .stamped();

    let sequence = state.hub.ingest(message).await;
    tracing::debug!(sequence, "Ingress message broadcast");

    Ok((StatusCode::ACCEPTED, Json(PublishResponse { ok: true })))
}
