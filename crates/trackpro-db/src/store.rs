//! Entity Store interface.

use async_trait::async_trait;
use thiserror::Error;
use trackpro_core::device::{Device, DeviceUpdate, NewDevice};
use trackpro_core::event::{Event, EventUpdate, EventWithStats, NewEvent};
use trackpro_core::participant::{
    NewParticipant, Participant, ParticipantUpdate, ParticipantWithTracking,
};
use trackpro_core::route::{Checkpoint, CheckpointUpdate, NewCheckpoint, NewRoute, Route, RouteUpdate};
use trackpro_core::tracking::{AlertInfo, NewTrackingPoint, TrackingPoint};
use trackpro_core::CoreError;

/// Store error types.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error(transparent)]
    Invalid(#[from] CoreError),
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Async key-based CRUD over every TrackPro entity.
///
/// Lookups of missing records return `Ok(None)` (or `false`), not errors.
#[async_trait]
pub trait EntityStore: Send + Sync {
    // Devices
    async fn list_devices(&self) -> StoreResult<Vec<Device>>;
    async fn get_device(&self, id: i64) -> StoreResult<Option<Device>>;
    async fn create_device(&self, device: NewDevice) -> StoreResult<Device>;
    async fn update_device(&self, id: i64, update: DeviceUpdate) -> StoreResult<Option<Device>>;
    async fn unassigned_devices(&self) -> StoreResult<Vec<Device>>;
    async fn devices_by_type(&self, device_type: &str) -> StoreResult<Vec<Device>>;
    async fn device_for_participant(&self, participant_id: i64) -> StoreResult<Option<Device>>;
    /// `None` when either the device or the participant does not exist.
    async fn assign_device(&self, device_id: i64, participant_id: i64) -> StoreResult<Option<Device>>;
    async fn unassign_device(&self, device_id: i64) -> StoreResult<Option<Device>>;

    // Events
    async fn list_events(&self) -> StoreResult<Vec<Event>>;
    async fn get_event(&self, id: i64) -> StoreResult<Option<Event>>;
    async fn create_event(&self, event: NewEvent) -> StoreResult<Event>;
    async fn update_event(&self, id: i64, update: EventUpdate) -> StoreResult<Option<Event>>;
    async fn event_with_stats(&self, id: i64) -> StoreResult<Option<EventWithStats>>;

    // Routes
    async fn list_routes(&self) -> StoreResult<Vec<Route>>;
    async fn get_route(&self, id: i64) -> StoreResult<Option<Route>>;
    async fn create_route(&self, route: NewRoute) -> StoreResult<Route>;
    async fn update_route(&self, id: i64, update: RouteUpdate) -> StoreResult<Option<Route>>;
    async fn routes_for_event(&self, event_id: i64) -> StoreResult<Vec<Route>>;

    // Checkpoints
    /// Checkpoints of a route sorted by `order`.
    async fn checkpoints_for_route(&self, route_id: i64) -> StoreResult<Vec<Checkpoint>>;
    async fn create_checkpoint(&self, checkpoint: NewCheckpoint) -> StoreResult<Checkpoint>;
    async fn update_checkpoint(
        &self,
        id: i64,
        update: CheckpointUpdate,
    ) -> StoreResult<Option<Checkpoint>>;
    async fn delete_checkpoint(&self, id: i64) -> StoreResult<bool>;

    // Participants
    async fn participants_for_event(&self, event_id: i64) -> StoreResult<Vec<Participant>>;
    async fn get_participant(&self, id: i64) -> StoreResult<Option<Participant>>;
    async fn create_participant(&self, participant: NewParticipant) -> StoreResult<Participant>;
    async fn update_participant(
        &self,
        id: i64,
        update: ParticipantUpdate,
    ) -> StoreResult<Option<Participant>>;
    async fn participants_with_tracking(
        &self,
        event_id: i64,
    ) -> StoreResult<Vec<ParticipantWithTracking>>;

    // Tracking
    /// Most recent points first.
    async fn tracking_history(&self, participant_id: i64, limit: usize) -> StoreResult<Vec<TrackingPoint>>;
    /// Validates the input and records it. The point is readable as soon as this returns.
    async fn create_tracking_point(&self, point: NewTrackingPoint) -> StoreResult<TrackingPoint>;
    async fn latest_tracking_point(&self, participant_id: i64) -> StoreResult<Option<TrackingPoint>>;
    /// One entry per participant of the event whose latest point has an open alert.
    async fn active_alerts(&self, event_id: i64) -> StoreResult<Vec<AlertInfo>>;
    /// Mark a point's alert resolved. `false` when the point does not exist.
    async fn resolve_alert(&self, tracking_point_id: i64) -> StoreResult<bool>;
}
