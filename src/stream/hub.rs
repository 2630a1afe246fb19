//! Broadcast Hub
//!
//! The in-process pub/sub core: tracks connected subscribers, keeps the
//! last-value cache (one message per channel key), and fans every ingested
//! message out to all subscribers in ingest order.
//!
//! All hub state lives behind a single lock, so delivery order to every
//! subscriber matches the global ingest order and new subscribers get an
//! atomic cache snapshot with no missed or duplicated messages.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

use super::messages::{Envelope, WidgetMessage};

/// Unique identifier for a subscriber connection
pub type SubscriberId = String;

/// Configuration for the broadcast hub
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Maximum number of concurrent subscribers
    pub max_subscribers: usize,
    /// Keepalive tick period in seconds
    pub heartbeat_interval_secs: u64,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            max_subscribers: 1000,
            heartbeat_interval_secs: 5,
        }
    }
}

/// The process-wide broadcast hub. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct BroadcastHub {
    state: Arc<RwLock<HubState>>,
    config: HubConfig,
}

struct HubState {
    /// Active subscribers: SubscriberId → their delivery channel
    subscribers: HashMap<SubscriberId, mpsc::UnboundedSender<Envelope>>,
    /// Most recent cacheable message per channel key
    cache: HashMap<String, Envelope>,
    /// Monotonic sequence, one per ingested message
    sequence: u64,
}

/// A live subscription: the cache replay captured at connect time plus the
/// receiving end of the delivery channel. Dropping it unsubscribes.
pub struct Subscription {
    pub id: SubscriberId,
    replay: Vec<Envelope>,
    rx: mpsc::UnboundedReceiver<Envelope>,
    hub: BroadcastHub,
}

impl Subscription {
    /// Take the last-value cache snapshot, ordered by sequence id
    pub fn take_replay(&mut self) -> Vec<Envelope> {
        std::mem::take(&mut self.replay)
    }

    /// Receive the next live broadcast; `None` once the hub is gone
    pub async fn recv(&mut self) -> Option<Envelope> {
        self.rx.recv().await
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let hub = self.hub.clone();
        let id = self.id.clone();
        // Prompt removal when dropped inside a runtime; otherwise the hub
        // prunes the dead sender on the next ingest.
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(async move { hub.unsubscribe(&id).await });
        }
    }
}

impl BroadcastHub {
    /// Create a new hub
    pub fn new(config: HubConfig) -> Self {
        Self {
            state: Arc::new(RwLock::new(HubState {
                subscribers: HashMap::new(),
                cache: HashMap::new(),
                sequence: 0,
            })),
            config,
        }
    }

    /// Ingest a message: stamp it, cache it if eligible, and deliver it to
    /// every current subscriber. Returns the assigned sequence id.
    ///
    /// A subscriber whose receiving end is gone is dropped on the spot;
    /// delivery to the others is unaffected. Sends are non-blocking, so a
    /// slow consumer never stalls the producer.
    pub async fn ingest(&self, message: WidgetMessage) -> u64 {
        let message = message.stamped();
        let mut state = self.state.write().await;

        state.sequence += 1;
        let envelope = Envelope {
            id: state.sequence,
            message,
        };

        // Payload-less messages (e.g. keepalive ticks) are forwarded but
        // never cached, so they cannot evict real widget state.
        if envelope.message.data.is_some() {
            if let Some(key) = envelope.message.channel_key() {
                let key = key.to_string();
                state.cache.insert(key, envelope.clone());
            }
        }

        state.subscribers.retain(|id, tx| {
            let delivered = tx.send(envelope.clone()).is_ok();
            if !delivered {
                tracing::debug!(subscriber_id = %id, "Subscriber gone, dropping");
            }
            delivered
        });

        envelope.id
    }

    /// Register a new subscriber.
    ///
    /// The cache snapshot and the registration happen under one lock, so the
    /// replay plus subsequent live messages form a gapless, duplicate-free
    /// view of each channel.
    pub async fn subscribe(&self) -> Result<Subscription, HubError> {
        let mut state = self.state.write().await;

        if state.subscribers.len() >= self.config.max_subscribers {
            return Err(HubError::TooManySubscribers(self.config.max_subscribers));
        }

        let id = Uuid::new_v4().to_string();
        let (tx, rx) = mpsc::unbounded_channel();

        let mut replay: Vec<Envelope> = state.cache.values().cloned().collect();
        replay.sort_by_key(|e| e.id);

        state.subscribers.insert(id.clone(), tx);

        tracing::info!(
            subscriber_id = %id,
            replayed = replay.len(),
            "Subscriber connected"
        );

        Ok(Subscription {
            id,
            replay,
            rx,
            hub: self.clone(),
        })
    }

    /// Remove a subscriber. Idempotent.
    pub async fn unsubscribe(&self, id: &str) {
        if self.state.write().await.subscribers.remove(id).is_some() {
            tracing::info!(subscriber_id = %id, "Subscriber disconnected");
        }
    }

    /// Spawn the keepalive task: a payload-less `tick` message ingested on a
    /// fixed period to keep idle connections alive through proxies.
    pub fn start_heartbeat(&self) -> tokio::task::JoinHandle<()> {
        let hub = self.clone();
        let period = Duration::from_secs(self.config.heartbeat_interval_secs.max(1));

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            // the immediate first tick; idle connections don't need it
            interval.tick().await;
            loop {
                interval.tick().await;
                hub.ingest(WidgetMessage::bare("tick")).await;
            }
        })
    }

    /// Current subscriber count
    pub async fn subscriber_count(&self) -> usize {
        self.state.read().await.subscribers.len()
    }

    /// Number of channel keys currently cached
    pub async fn cached_count(&self) -> usize {
        self.state.read().await.cache.len()
    }

    /// Sequence id of the most recently ingested message
    pub async fn sequence(&self) -> u64 {
        self.state.read().await.sequence
    }
}

/// Errors that can occur in the broadcast hub
#[derive(Debug, Error)]
pub enum HubError {
    #[error("Too many subscribers (limit: {0})")]
    TooManySubscribers(usize),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn hub() -> BroadcastHub {
        BroadcastHub::new(HubConfig::default())
    }

    #[test]
    fn test_default_config() {
        let config = HubConfig::default();
        assert_eq!(config.max_subscribers, 1000);
        assert_eq!(config.heartbeat_interval_secs, 5);
    }

    #[tokio::test]
    async fn test_subscribe_unsubscribe() {
        let hub = hub();
        let sub = hub.subscribe().await.unwrap();
        assert_eq!(hub.subscriber_count().await, 1);

        let id = sub.id.clone();
        hub.unsubscribe(&id).await;
        assert_eq!(hub.subscriber_count().await, 0);

        // idempotent
        hub.unsubscribe(&id).await;
        assert_eq!(hub.subscriber_count().await, 0);
    }

    #[tokio::test]
    async fn test_subscriber_limit() {
        let hub = BroadcastHub::new(HubConfig {
            max_subscribers: 1,
            heartbeat_interval_secs: 5,
        });

        let _first = hub.subscribe().await.unwrap();
        let second = hub.subscribe().await;
        assert!(matches!(second, Err(HubError::TooManySubscribers(1))));
    }

    #[tokio::test]
    async fn test_cache_replay_latest_per_key() {
        let hub = hub();
        hub.ingest(WidgetMessage::new("a", "t", json!({"v": 1}))).await;
        hub.ingest(WidgetMessage::new("b", "t", json!({"v": 2}))).await;
        hub.ingest(WidgetMessage::new("c", "t", json!({"v": 3}))).await;

        let mut sub = hub.subscribe().await.unwrap();
        let replay = sub.take_replay();
        assert_eq!(replay.len(), 3);

        // ordered by sequence id
        let ids: Vec<u64> = replay.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_overwrite_keeps_latest_and_delivers_both_live() {
        let hub = hub();
        let mut live = hub.subscribe().await.unwrap();

        hub.ingest(WidgetMessage::new("w", "t", json!({"v": 1}))).await;
        hub.ingest(WidgetMessage::new("w", "t", json!({"v": 2}))).await;

        // live subscriber sees both, in order
        let first = live.recv().await.unwrap();
        let second = live.recv().await.unwrap();
        assert_eq!(first.message.data, Some(json!({"v": 1})));
        assert_eq!(second.message.data, Some(json!({"v": 2})));

        // late subscriber sees only the overwrite
        let mut late = hub.subscribe().await.unwrap();
        let replay = late.take_replay();
        assert_eq!(replay.len(), 1);
        assert_eq!(replay[0].message.data, Some(json!({"v": 2})));
    }

    #[tokio::test]
    async fn test_payload_less_delivered_but_never_cached() {
        let hub = hub();
        let mut live = hub.subscribe().await.unwrap();

        hub.ingest(WidgetMessage::bare("tick")).await;

        let delivered = live.recv().await.unwrap();
        assert_eq!(delivered.message.kind.as_deref(), Some("tick"));
        assert_eq!(hub.cached_count().await, 0);

        let mut late = hub.subscribe().await.unwrap();
        assert!(late.take_replay().is_empty());
    }

    #[tokio::test]
    async fn test_fan_out_same_order_for_all_subscribers() {
        let hub = hub();
        let mut sub_a = hub.subscribe().await.unwrap();
        let mut sub_b = hub.subscribe().await.unwrap();

        for v in 0..5 {
            hub.ingest(WidgetMessage::new("w", "t", json!({"v": v}))).await;
        }

        for v in 0..5 {
            let a = sub_a.recv().await.unwrap();
            let b = sub_b.recv().await.unwrap();
            assert_eq!(a.message.data, Some(json!({"v": v})));
            assert_eq!(a, b);
        }
    }

    #[tokio::test]
    async fn test_send_failure_drops_subscriber_lazily() {
        let hub = hub();

        // Register a sender whose receiver is immediately dropped
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        hub.state
            .write()
            .await
            .subscribers
            .insert("dead".to_string(), tx);

        let mut alive = hub.subscribe().await.unwrap();
        assert_eq!(hub.subscriber_count().await, 2);

        hub.ingest(WidgetMessage::new("w", "t", json!({"v": 1}))).await;

        assert_eq!(hub.subscriber_count().await, 1);
        assert!(alive.recv().await.is_some());
    }

    #[tokio::test]
    async fn test_ingest_stamps_missing_timestamp() {
        let hub = hub();
        let mut sub = hub.subscribe().await.unwrap();

        hub.ingest(WidgetMessage::new("w", "t", json!({}))).await;
        let env = sub.recv().await.unwrap();
        assert!(env.message.timestamp.is_some());
    }

    #[tokio::test]
    async fn test_sequence_increments_per_ingest() {
        let hub = hub();
        assert_eq!(hub.ingest(WidgetMessage::bare("tick")).await, 1);
        assert_eq!(hub.ingest(WidgetMessage::bare("tick")).await, 2);
        assert_eq!(hub.sequence().await, 2);
    }
}
