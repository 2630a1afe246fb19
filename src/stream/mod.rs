//! Real-Time Widget Streaming
//!
//! Fans widget updates out to dashboard clients over Server-Sent Events.
//!
//! ## Architecture
//!
//! - **BroadcastHub**: subscriber registry, last-value cache, fan-out
//! - **Handler**: the `GET /events` SSE endpoint
//! - **Messages**: the widget message and envelope formats
//!
//! ## Usage
//!
//! Clients open an `EventSource` against `/events`. The server first sends a
//! `connected` ack, then one event per cached channel (the latest message for
//! each widget), then every subsequent broadcast:
//!
//! ```javascript
//! // Browser
//! const source = new EventSource('/events');
//!
//! source.onmessage = (event) => {
//!   const update = JSON.parse(event.data);
//!   render(update.widgetId, update);
//! };
//! ```

mod handler;
mod hub;
mod messages;

pub use handler::event_stream_handler;
pub use hub::{BroadcastHub, HubConfig, HubError, SubscriberId, Subscription};
pub use messages::{Envelope, WidgetMessage};
