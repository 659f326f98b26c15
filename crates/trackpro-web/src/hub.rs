//! Broadcast Hub and Subscriber Registry.
//!
//! Every live update leaves the server through [`BroadcastHub::broadcast`].
//! Each subscriber owns a bounded channel drained by its socket task, so a
//! slow subscriber fills its own buffer and never stalls the others.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use trackpro_core::live::{parse_inbound, Inbound};
use trackpro_core::tracking::{NewTrackingPoint, TrackingPoint};
use trackpro_core::LiveMessage;
use trackpro_db::{EntityStore, StoreResult};

/// Unique subscriber identifier.
pub type ConnectionId = Uuid;

/// Frames buffered per subscriber before sends to it start failing.
pub const SUBSCRIBER_BUFFER_SIZE: usize = 256;

/// A connected live-update viewer.
pub struct Subscriber {
    pub id: ConnectionId,
    /// Serialized frames towards the subscriber's socket.
    pub tx: mpsc::Sender<String>,
    pub connected_at: DateTime<Utc>,
}

impl Subscriber {
    /// Whether the socket side is still draining the channel.
    pub fn is_open(&self) -> bool {
        !self.tx.is_closed()
    }
}

/// Registry of connected subscribers, keyed by connection id.
#[derive(Default)]
pub struct SubscriberRegistry {
    subscribers: DashMap<ConnectionId, Subscriber>,
}

impl SubscriberRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscriber under `id`. Broadcasts reach it from here on.
    pub fn register(&self, id: ConnectionId, tx: mpsc::Sender<String>) {
        self.subscribers.insert(
            id,
            Subscriber {
                id,
                tx,
                connected_at: Utc::now(),
            },
        );
    }

    /// Remove a subscriber. Returns `false` if it was not registered.
    pub fn unregister(&self, id: &ConnectionId) -> bool {
        self.subscribers.remove(id).is_some()
    }

    /// Visit every registered subscriber.
    pub fn for_each(&self, mut f: impl FnMut(&Subscriber)) {
        for entry in self.subscribers.iter() {
            f(entry.value());
        }
    }

    pub fn contains(&self, id: &ConnectionId) -> bool {
        self.subscribers.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }
}

/// What the hub did with an inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundOutcome {
    /// A position report was persisted and fanned out.
    Broadcast(TrackingPoint),
    /// A well-formed message of a type the hub does not act on.
    Ignored(String),
    /// Malformed, invalid, or not persistable.
    Dropped,
}

/// Fan-out point for all live messages.
pub struct BroadcastHub {
    registry: SubscriberRegistry,
    store: Arc<dyn EntityStore>,
}

impl BroadcastHub {
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        Self {
            registry: SubscriberRegistry::new(),
            store,
        }
    }

    pub fn registry(&self) -> &SubscriberRegistry {
        &self.registry
    }

    /// Greet a new subscriber with a `connected` message, then register it.
    ///
    /// The greeting is queued before the subscriber becomes visible to
    /// [`broadcast`](BroadcastHub::broadcast), so it is always the first
    /// frame. Nothing else is replayed; a new subscriber starts with no history.
    pub fn accept(&self, tx: mpsc::Sender<String>) -> ConnectionId {
        let id = Uuid::new_v4();

        match serde_json::to_string(&LiveMessage::connected(id.to_string())) {
            Ok(json) => {
                if let Err(e) = tx.try_send(json) {
                    warn!(connection_id = %id, error = %e, "Failed to greet subscriber");
                }
            }
            Err(e) => error!(error = %e, "Failed to serialize connected message"),
        }
        self.registry.register(id, tx);

        info!(connection_id = %id, subscribers = self.registry.len(), "Subscriber connected");
        id
    }

    /// Process one raw frame received from a subscriber.
    ///
    /// Never fails: anything unusable is logged and dropped, and the
    /// connection stays open.
    pub async fn handle_inbound(&self, id: &ConnectionId, raw: &str) -> InboundOutcome {
        match parse_inbound(raw) {
            Ok(Inbound::PositionReport(report)) => match self.ingest(report).await {
                Ok(point) => InboundOutcome::Broadcast(point),
                Err(e) => {
                    warn!(connection_id = %id, error = %e, "Dropped position report");
                    InboundOutcome::Dropped
                }
            },
            Ok(Inbound::Other(kind)) => {
                debug!(connection_id = %id, kind = %kind, "Ignoring inbound message");
                InboundOutcome::Ignored(kind)
            }
            Err(e) => {
                warn!(connection_id = %id, error = %e, "Dropped inbound frame");
                InboundOutcome::Dropped
            }
        }
    }

    /// Persist a new tracking point, then announce it as `position_update`.
    ///
    /// Nothing is broadcast when persistence fails.
    pub async fn ingest(&self, report: NewTrackingPoint) -> StoreResult<TrackingPoint> {
        let point = self.store.create_tracking_point(report).await?;
        self.broadcast(&LiveMessage::PositionUpdate(point.clone()));
        Ok(point)
    }

    /// Send a message to every open subscriber. Returns how many accepted it.
    ///
    /// Closed subscribers are skipped but stay registered until [`remove`].
    ///
    /// [`remove`]: BroadcastHub::remove
    pub fn broadcast(&self, message: &LiveMessage) -> usize {
        let json = match serde_json::to_string(message) {
            Ok(json) => json,
            Err(e) => {
                error!(kind = %message.kind(), error = %e, "Failed to serialize broadcast message");
                return 0;
            }
        };

        let mut delivered = 0;
        self.registry.for_each(|subscriber| {
            if !subscriber.is_open() {
                return;
            }
            match subscriber.tx.try_send(json.clone()) {
                Ok(()) => delivered += 1,
                Err(e) => {
                    warn!(connection_id = %subscriber.id, error = %e, "Failed to send to subscriber")
                }
            }
        });

        debug!(kind = %message.kind(), delivered, "Broadcast");
        delivered
    }

    /// Forget a subscriber. Safe to call more than once.
    pub fn remove(&self, id: &ConnectionId) -> bool {
        let removed = self.registry.unregister(id);
        if removed {
            info!(connection_id = %id, subscribers = self.registry.len(), "Subscriber disconnected");
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trackpro_core::live::MessageKind;
    use trackpro_core::participant::{NewParticipant, ParticipantStatus};
    use trackpro_db::MemoryStore;

    async fn hub_with_runner() -> (Arc<MemoryStore>, BroadcastHub) {
        let store = Arc::new(MemoryStore::new());
        store
            .create_participant(NewParticipant {
                number: 1,
                name: "Jay Jay".to_string(),
                event_id: 1,
                status: ParticipantStatus::Active,
                emergency_contact: None,
                emergency_phone: None,
            })
            .await
            .unwrap();
        let hub = BroadcastHub::new(store.clone());
        (store, hub)
    }

    fn subscribe(hub: &BroadcastHub) -> (ConnectionId, mpsc::Receiver<String>) {
        let (tx, mut rx) = mpsc::channel(SUBSCRIBER_BUFFER_SIZE);
        let id = hub.accept(tx);
        let greeting: LiveMessage = serde_json::from_str(&rx.try_recv().unwrap()).unwrap();
        assert_eq!(greeting, LiveMessage::connected(id.to_string()));
        (id, rx)
    }

    const REPORT: &str = r#"{"type":"position_update","data":{"participantId":1,"eventId":1,"location":{"lat":37.7749,"lng":-122.4194},"battery":50}}"#;

    #[tokio::test]
    async fn test_accept_assigns_unique_ids() {
        let (_, hub) = hub_with_runner().await;
        let (a, _rx_a) = subscribe(&hub);
        let (b, _rx_b) = subscribe(&hub);
        assert_ne!(a, b);
        assert_eq!(hub.registry().len(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_greeting_precedes_concurrent_broadcasts() {
        let (_, hub) = hub_with_runner().await;
        let hub = Arc::new(hub);
        let stop = Arc::new(std::sync::atomic::AtomicBool::new(false));

        let broadcasters: Vec<_> = (0..3)
            .map(|_| {
                let hub = hub.clone();
                let stop = stop.clone();
                std::thread::spawn(move || {
                    while !stop.load(std::sync::atomic::Ordering::Relaxed) {
                        hub.broadcast(&LiveMessage::alert_resolved(1));
                    }
                })
            })
            .collect();

        let mut out_of_order = 0;
        for _ in 0..5_000 {
            let (tx, mut rx) = mpsc::channel(SUBSCRIBER_BUFFER_SIZE);
            let id = hub.accept(tx);
            let first: LiveMessage = serde_json::from_str(&rx.try_recv().unwrap()).unwrap();
            if first != LiveMessage::connected(id.to_string()) {
                out_of_order += 1;
            }
            hub.remove(&id);
        }

        stop.store(true, std::sync::atomic::Ordering::Relaxed);
        for handle in broadcasters {
            handle.join().unwrap();
        }
        assert_eq!(out_of_order, 0);
    }

    #[tokio::test]
    async fn test_broadcast_reaches_every_subscriber_once() {
        let (_, hub) = hub_with_runner().await;
        let mut receivers: Vec<_> = (0..3).map(|_| subscribe(&hub).1).collect();

        let delivered = hub.broadcast(&LiveMessage::alert_resolved(7));
        assert_eq!(delivered, 3);

        for rx in receivers.iter_mut() {
            let msg: LiveMessage = serde_json::from_str(&rx.try_recv().unwrap()).unwrap();
            assert_eq!(msg, LiveMessage::alert_resolved(7));
            assert!(rx.try_recv().is_err());
        }
    }

    #[tokio::test]
    async fn test_closed_subscriber_is_skipped_not_removed() {
        let (_, hub) = hub_with_runner().await;
        let (_, mut open) = subscribe(&hub);
        let (closed_id, closed) = subscribe(&hub);
        drop(closed);

        assert_eq!(hub.broadcast(&LiveMessage::alert_resolved(1)), 1);
        assert!(open.try_recv().is_ok());
        assert!(hub.registry().contains(&closed_id));

        assert!(hub.remove(&closed_id));
        assert!(!hub.remove(&closed_id));
        assert_eq!(hub.registry().len(), 1);
    }

    #[tokio::test]
    async fn test_full_subscriber_does_not_block_others() {
        let (_, hub) = hub_with_runner().await;
        let (tx, _slow) = mpsc::channel(1);
        hub.accept(tx);
        let (_, mut fast) = subscribe(&hub);

        assert_eq!(hub.broadcast(&LiveMessage::alert_resolved(1)), 1);
        assert!(fast.try_recv().is_ok());
    }

    #[tokio::test]
    async fn test_removed_subscriber_receives_nothing() {
        let (_, hub) = hub_with_runner().await;
        let (id, mut rx) = subscribe(&hub);
        hub.remove(&id);

        assert_eq!(hub.broadcast(&LiveMessage::alert_resolved(1)), 0);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_position_report_is_stored_then_broadcast_to_all() {
        let (store, hub) = hub_with_runner().await;
        let (sender, mut sender_rx) = subscribe(&hub);
        let (_, mut other_rx) = subscribe(&hub);

        let outcome = hub.handle_inbound(&sender, REPORT).await;
        let InboundOutcome::Broadcast(point) = outcome else {
            panic!("expected broadcast, got {:?}", outcome);
        };

        let history = store.tracking_history(1, 10).await.unwrap();
        assert_eq!(history[0].id, point.id);

        for rx in [&mut sender_rx, &mut other_rx] {
            let msg: LiveMessage = serde_json::from_str(&rx.try_recv().unwrap()).unwrap();
            assert_eq!(msg.kind(), MessageKind::PositionUpdate);
            assert_eq!(msg, LiveMessage::PositionUpdate(point.clone()));
        }
    }

    #[tokio::test]
    async fn test_malformed_frames_are_dropped_silently() {
        let (store, hub) = hub_with_runner().await;
        let (id, mut rx) = subscribe(&hub);

        for raw in [
            "not json",
            r#"{"type":"position_update","data":{"participantId":1}}"#,
            r#"{"type":"position_update","data":{"participantId":1,"eventId":1,"location":{"lat":91,"lng":0}}}"#,
        ] {
            assert_eq!(hub.handle_inbound(&id, raw).await, InboundOutcome::Dropped);
        }

        assert!(rx.try_recv().is_err());
        assert!(hub.registry().contains(&id));
        assert!(store.tracking_history(1, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_persistence_is_not_broadcast() {
        let (_, hub) = hub_with_runner().await;
        let (id, mut rx) = subscribe(&hub);

        let unknown = REPORT.replace(r#""participantId":1"#, r#""participantId":99"#);
        assert_eq!(hub.handle_inbound(&id, &unknown).await, InboundOutcome::Dropped);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_other_message_types_are_ignored() {
        let (_, hub) = hub_with_runner().await;
        let (id, mut rx) = subscribe(&hub);

        let outcome = hub.handle_inbound(&id, r#"{"type":"subscribe","data":{}}"#).await;
        assert_eq!(outcome, InboundOutcome::Ignored("subscribe".to_string()));
        assert!(rx.try_recv().is_err());
    }
}
