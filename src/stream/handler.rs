//! Subscription Endpoint
//!
//! Serves `GET /events` as a Server-Sent Events stream: a connect ack, the
//! last-value cache replay, then every live broadcast until the client
//! disconnects. Closing the connection is the only cancellation signal.

use axum::{
    extract::State,
    response::sse::{Event, Sse},
};
use futures_util::stream::{self, Stream, StreamExt};
use std::convert::Infallible;
use std::sync::Arc;

use super::messages::Envelope;
use crate::api::error::ApiError;
use crate::api::state::AppState;

/// SSE subscription handler
///
/// The stream owns the `Subscription`, so dropping the connection (client
/// close or network failure) unsubscribes from the hub automatically.
pub async fn event_stream_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let mut subscription = state
        .hub
        .subscribe()
        .await
        .map_err(|e| ApiError::ServiceUnavailable(e.to_string()))?;

    let ack = connected_event(&subscription.id);
    let replay: Vec<Event> = subscription
        .take_replay()
        .into_iter()
        .map(envelope_to_event)
        .collect();

    // Ack (id 0) first, then the replay in ingest order, then live messages.
    // Replay and live events reuse their global sequence ids, so each
    // connection sees a strictly increasing id sequence.
    let initial = stream::iter(
        std::iter::once(ack)
            .chain(replay)
            .map(Ok::<_, Infallible>),
    );

    let live = stream::unfold(subscription, |mut sub| async move {
        sub.recv().await.map(|envelope| (Ok(envelope_to_event(envelope)), sub))
    });

    Ok(Sse::new(initial.chain(live)))
}

/// Connectivity acknowledgment sent before anything else
fn connected_event(subscriber_id: &str) -> Event {
    let body = serde_json::json!({ "ok": true, "subscriberId": subscriber_id });
    match Event::default().id("0").event("connected").json_data(&body) {
        Ok(event) => event,
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode connect ack");
            Event::default().id("0").event("connected").data("{}")
        }
    }
}

/// Convert a broadcast envelope into an SSE event.
///
/// Live events carry no event name, so auto-reconnecting clients dispatch
/// them through their generic `message` handler.
fn envelope_to_event(envelope: Envelope) -> Event {
    let id = envelope.id.to_string();
    match Event::default().id(&id).json_data(&envelope.message) {
        Ok(event) => event,
        Err(e) => {
            tracing::error!(error = %e, sequence = envelope.id, "Failed to encode event");
            Event::default().id(&id).data("{}")
        }
    }
}

// Wire-level coverage (ack, replay, live ordering and ids) lives in the
// router tests in `crate::api`, which read the response body stream.
