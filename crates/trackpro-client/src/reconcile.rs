//! Cache reconciliation.
//!
//! The dashboard polls its data over REST; live messages only tell it which
//! of those polled results went stale. [`invalidations`] is the mapping,
//! [`QueryCache`] holds the polled results, and [`Reconciler`] applies one
//! to the other for every received message.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde_json::Value;
use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

use trackpro_core::live::MessageKind;
use trackpro_core::LiveMessage;

use crate::api::ApiClient;
use crate::error::ClientResult;
use crate::receiver::MessageHandler;

/// A polled dashboard query, identified by the REST path it fetches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum QueryKey {
    Events,
    Event(i64),
    EventStats(i64),
    EventRoute(i64),
    Participants(i64),
    ParticipantsTracking(i64),
    Alerts(i64),
}

impl QueryKey {
    pub fn path(&self) -> String {
        match self {
            Self::Events => "/api/events".to_string(),
            Self::Event(id) => format!("/api/events/{}", id),
            Self::EventStats(id) => format!("/api/events/{}/stats", id),
            Self::EventRoute(id) => format!("/api/events/{}/route", id),
            Self::Participants(id) => format!("/api/events/{}/participants", id),
            Self::ParticipantsTracking(id) => format!("/api/events/{}/participants/tracking", id),
            Self::Alerts(id) => format!("/api/events/{}/alerts", id),
        }
    }

    /// The queries a dashboard viewing `event_id` keeps polled.
    pub fn dashboard(event_id: i64) -> Vec<QueryKey> {
        vec![
            Self::Events,
            Self::Event(event_id),
            Self::EventStats(event_id),
            Self::EventRoute(event_id),
            Self::Participants(event_id),
            Self::ParticipantsTracking(event_id),
            Self::Alerts(event_id),
        ]
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

/// Queries made stale by a message of `kind`, scoped to the viewed event.
///
/// Event-scoped keys always use `selected_event`, never an id carried by
/// the message. Without a selected event only unscoped keys are returned.
pub fn invalidations(kind: MessageKind, selected_event: Option<i64>) -> Vec<QueryKey> {
    let scoped = |keys: &dyn Fn(i64) -> Vec<QueryKey>| selected_event.map(keys).unwrap_or_default();

    match kind {
        MessageKind::Connected => Vec::new(),
        MessageKind::PositionUpdate => scoped(&|e| vec![QueryKey::ParticipantsTracking(e)]),
        MessageKind::Alert => {
            scoped(&|e| vec![QueryKey::Alerts(e), QueryKey::ParticipantsTracking(e)])
        }
        MessageKind::EventUpdate => {
            let mut keys = vec![QueryKey::Events];
            keys.extend(scoped(&|e| vec![QueryKey::Event(e), QueryKey::EventStats(e)]));
            keys
        }
        MessageKind::ParticipantStatus => {
            scoped(&|e| vec![QueryKey::Participants(e), QueryKey::ParticipantsTracking(e)])
        }
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    data: Option<Value>,
    stale: bool,
    fetched_at: Option<DateTime<Utc>>,
}

/// Last fetched result per query, each with a stale flag.
#[derive(Default)]
pub struct QueryCache {
    entries: DashMap<QueryKey, CacheEntry>,
}

impl QueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking a query. It is stale until first fetched.
    pub fn track(&self, key: QueryKey) {
        self.entries.entry(key).or_insert(CacheEntry {
            data: None,
            stale: true,
            fetched_at: None,
        });
    }

    /// Store a fresh result.
    pub fn store(&self, key: QueryKey, data: Value) {
        self.entries.insert(
            key,
            CacheEntry {
                data: Some(data),
                stale: false,
                fetched_at: Some(Utc::now()),
            },
        );
    }

    pub fn get(&self, key: &QueryKey) -> Option<Value> {
        self.entries.get(key).and_then(|e| e.data.clone())
    }

    /// Mark a tracked query stale. Does not fetch. Returns `false` for
    /// untracked keys.
    pub fn invalidate(&self, key: &QueryKey) -> bool {
        match self.entries.get_mut(key) {
            Some(mut entry) => {
                entry.stale = true;
                true
            }
            None => false,
        }
    }

    pub fn is_stale(&self, key: &QueryKey) -> bool {
        self.entries.get(key).is_some_and(|e| e.stale)
    }

    pub fn fetched_at(&self, key: &QueryKey) -> Option<DateTime<Utc>> {
        self.entries.get(key).and_then(|e| e.fetched_at)
    }

    /// Tracked queries currently marked stale, in key order.
    pub fn stale_keys(&self) -> Vec<QueryKey> {
        let mut keys: Vec<QueryKey> = self
            .entries
            .iter()
            .filter(|e| e.stale)
            .map(|e| *e.key())
            .collect();
        keys.sort();
        keys
    }

    /// Re-fetch every stale query. A failed fetch stays stale.
    pub async fn refresh_stale(&self, api: &ApiClient) -> ClientResult<Vec<QueryKey>> {
        let mut refreshed = Vec::new();
        for key in self.stale_keys() {
            match api.fetch(&key).await {
                Ok(data) => {
                    self.store(key, data);
                    refreshed.push(key);
                }
                Err(e) => warn!(query = %key, error = %e, "Refetch failed"),
            }
        }
        Ok(refreshed)
    }
}

/// Applies the invalidation policy to a [`QueryCache`] for the viewed event.
pub struct Reconciler {
    cache: Arc<QueryCache>,
    selected_event: AtomicI64,
}

const NO_EVENT: i64 = i64::MIN;

impl Reconciler {
    pub fn new(cache: Arc<QueryCache>, selected_event: Option<i64>) -> Self {
        Self {
            cache,
            selected_event: AtomicI64::new(selected_event.unwrap_or(NO_EVENT)),
        }
    }

    pub fn cache(&self) -> &Arc<QueryCache> {
        &self.cache
    }

    pub fn selected_event(&self) -> Option<i64> {
        match self.selected_event.load(Ordering::SeqCst) {
            NO_EVENT => None,
            id => Some(id),
        }
    }

    pub fn select_event(&self, event_id: Option<i64>) {
        self.selected_event
            .store(event_id.unwrap_or(NO_EVENT), Ordering::SeqCst);
    }

    /// Invalidate what `msg` makes stale. Returns the keys the policy named.
    pub fn apply(&self, msg: &LiveMessage) -> Vec<QueryKey> {
        let keys = invalidations(msg.kind(), self.selected_event());
        for key in &keys {
            self.cache.invalidate(key);
        }
        debug!(kind = %msg.kind(), invalidated = keys.len(), "Reconciled live message");
        keys
    }
}

#[async_trait]
impl MessageHandler for Reconciler {
    async fn on_message(&self, msg: &LiveMessage) {
        self.apply(msg);
    }
}
