//! In-memory Entity Store.
//!
//! All tables live behind a single `RwLock`, so every operation sees a
//! consistent snapshot and a write is visible to readers as soon as the
//! call returns. Ids are per-table serials starting at 1.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use tokio::sync::RwLock;
use tracing::debug;

use trackpro_core::device::{Device, DeviceUpdate, NewDevice};
use trackpro_core::event::{self, Event, EventUpdate, EventWithStats, NewEvent, DEFAULT_MAX_PARTICIPANTS};
use trackpro_core::participant::{
    self, NewParticipant, Participant, ParticipantUpdate, ParticipantWithTracking,
};
use trackpro_core::route::{
    Checkpoint, CheckpointUpdate, NewCheckpoint, NewRoute, Route, RouteUpdate,
    DEFAULT_CHECKPOINT_RADIUS_M,
};
use trackpro_core::tracking::{AlertInfo, NewTrackingPoint, TrackingPoint};

use crate::store::{EntityStore, StoreError, StoreResult};

#[derive(Default)]
struct Sequences {
    device: i64,
    event: i64,
    route: i64,
    checkpoint: i64,
    participant: i64,
    tracking_point: i64,
}

fn next(seq: &mut i64) -> i64 {
    *seq += 1;
    *seq
}

#[derive(Default)]
struct Tables {
    devices: BTreeMap<i64, Device>,
    events: BTreeMap<i64, Event>,
    routes: BTreeMap<i64, Route>,
    checkpoints: BTreeMap<i64, Checkpoint>,
    participants: BTreeMap<i64, Participant>,
    tracking_points: BTreeMap<i64, TrackingPoint>,
    seq: Sequences,
}

impl Tables {
    /// Points of one participant, oldest first. Equal timestamps keep
    /// insertion order.
    fn history(&self, participant_id: i64) -> Vec<TrackingPoint> {
        let mut points: Vec<TrackingPoint> = self
            .tracking_points
            .values()
            .filter(|p| p.participant_id == participant_id)
            .cloned()
            .collect();
        points.sort_by_key(|p| (p.timestamp, p.id));
        points
    }

    fn latest(&self, participant_id: i64) -> Option<&TrackingPoint> {
        self.tracking_points
            .values()
            .filter(|p| p.participant_id == participant_id)
            .max_by_key(|p| (p.timestamp, p.id))
    }

    fn participants_of(&self, event_id: i64) -> Vec<Participant> {
        self.participants
            .values()
            .filter(|p| p.event_id == event_id)
            .cloned()
            .collect()
    }

    fn checkpoints_of(&self, route_id: i64) -> Vec<Checkpoint> {
        let mut checkpoints: Vec<Checkpoint> = self
            .checkpoints
            .values()
            .filter(|c| c.route_id == route_id)
            .cloned()
            .collect();
        checkpoints.sort_by_key(|c| (c.order, c.id));
        checkpoints
    }

    fn event_checkpoints(&self, event_id: i64) -> Vec<Checkpoint> {
        self.events
            .get(&event_id)
            .and_then(|e| e.route_id)
            .map(|route_id| self.checkpoints_of(route_id))
            .unwrap_or_default()
    }
}

/// Entity Store backed by process memory.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EntityStore for MemoryStore {
    // ============================================
    // Devices
    // ============================================

    async fn list_devices(&self) -> StoreResult<Vec<Device>> {
        Ok(self.tables.read().await.devices.values().cloned().collect())
    }

    async fn get_device(&self, id: i64) -> StoreResult<Option<Device>> {
        Ok(self.tables.read().await.devices.get(&id).cloned())
    }

    async fn create_device(&self, new: NewDevice) -> StoreResult<Device> {
        new.validate()?;
        let mut tables = self.tables.write().await;
        if tables.devices.values().any(|d| d.serial_number == new.serial_number) {
            return Err(StoreError::Conflict(format!(
                "serial number {} already registered",
                new.serial_number
            )));
        }

        let id = next(&mut tables.seq.device);
        let device = Device {
            id,
            name: new.name,
            device_type: new.device_type,
            serial_number: new.serial_number,
            status: new.status,
            battery_level: new.battery_level,
            last_seen: new.last_seen,
            assigned_to: new.assigned_to,
        };
        tables.devices.insert(id, device.clone());
        Ok(device)
    }

    async fn update_device(&self, id: i64, update: DeviceUpdate) -> StoreResult<Option<Device>> {
        let mut tables = self.tables.write().await;
        Ok(tables.devices.get_mut(&id).map(|d| {
            d.apply(update);
            d.clone()
        }))
    }

    async fn unassigned_devices(&self) -> StoreResult<Vec<Device>> {
        let tables = self.tables.read().await;
        Ok(tables
            .devices
            .values()
            .filter(|d| d.assigned_to.is_none())
            .cloned()
            .collect())
    }

    async fn devices_by_type(&self, device_type: &str) -> StoreResult<Vec<Device>> {
        let tables = self.tables.read().await;
        Ok(tables
            .devices
            .values()
            .filter(|d| d.device_type == device_type)
            .cloned()
            .collect())
    }

    async fn device_for_participant(&self, participant_id: i64) -> StoreResult<Option<Device>> {
        let tables = self.tables.read().await;
        Ok(tables
            .devices
            .values()
            .find(|d| d.assigned_to == Some(participant_id))
            .cloned())
    }

    async fn assign_device(&self, device_id: i64, participant_id: i64) -> StoreResult<Option<Device>> {
        let mut tables = self.tables.write().await;
        if !tables.participants.contains_key(&participant_id) {
            return Ok(None);
        }
        Ok(tables.devices.get_mut(&device_id).map(|d| {
            d.assign(participant_id);
            d.clone()
        }))
    }

    async fn unassign_device(&self, device_id: i64) -> StoreResult<Option<Device>> {
        let mut tables = self.tables.write().await;
        Ok(tables.devices.get_mut(&device_id).map(|d| {
            d.unassign();
            d.clone()
        }))
    }

    // ============================================
    // Events
    // ============================================

    async fn list_events(&self) -> StoreResult<Vec<Event>> {
        Ok(self.tables.read().await.events.values().cloned().collect())
    }

    async fn get_event(&self, id: i64) -> StoreResult<Option<Event>> {
        Ok(self.tables.read().await.events.get(&id).cloned())
    }

    async fn create_event(&self, new: NewEvent) -> StoreResult<Event> {
        new.validate()?;
        let mut tables = self.tables.write().await;
        let id = next(&mut tables.seq.event);
        let event = Event {
            id,
            name: new.name,
            description: new.description,
            start_date: new.start_date,
            end_date: new.end_date,
            location: new.location,
            status: new.status,
            route_id: new.route_id,
            created_by: new.created_by,
            max_participants: new.max_participants.unwrap_or(DEFAULT_MAX_PARTICIPANTS),
        };
        tables.events.insert(id, event.clone());
        Ok(event)
    }

    async fn update_event(&self, id: i64, update: EventUpdate) -> StoreResult<Option<Event>> {
        let mut tables = self.tables.write().await;
        Ok(tables.events.get_mut(&id).map(|e| {
            e.apply(update);
            e.clone()
        }))
    }

    async fn event_with_stats(&self, id: i64) -> StoreResult<Option<EventWithStats>> {
        let tables = self.tables.read().await;
        let Some(event) = tables.events.get(&id).cloned() else {
            return Ok(None);
        };

        let checkpoints = tables.event_checkpoints(id);
        let participants = tables
            .participants_of(id)
            .into_iter()
            .map(|p| {
                let history = tables.history(p.id);
                (p, history)
            })
            .collect();

        Ok(Some(event::build_stats(event, participants, &checkpoints)))
    }

    // ============================================
    // Routes
    // ============================================

    async fn list_routes(&self) -> StoreResult<Vec<Route>> {
        Ok(self.tables.read().await.routes.values().cloned().collect())
    }

    async fn get_route(&self, id: i64) -> StoreResult<Option<Route>> {
        Ok(self.tables.read().await.routes.get(&id).cloned())
    }

    async fn create_route(&self, new: NewRoute) -> StoreResult<Route> {
        new.validate()?;
        let mut tables = self.tables.write().await;
        let id = next(&mut tables.seq.route);
        let route = Route {
            id,
            name: new.name,
            description: new.description,
            distance: new.distance,
            path: new.path,
            created_by: new.created_by,
        };
        tables.routes.insert(id, route.clone());
        Ok(route)
    }

    async fn update_route(&self, id: i64, update: RouteUpdate) -> StoreResult<Option<Route>> {
        let mut tables = self.tables.write().await;
        Ok(tables.routes.get_mut(&id).map(|r| {
            r.apply(update);
            r.clone()
        }))
    }

    async fn routes_for_event(&self, event_id: i64) -> StoreResult<Vec<Route>> {
        let tables = self.tables.read().await;
        Ok(tables
            .events
            .get(&event_id)
            .and_then(|e| e.route_id)
            .and_then(|route_id| tables.routes.get(&route_id).cloned())
            .into_iter()
            .collect())
    }

    // ============================================
    // Checkpoints
    // ============================================

    async fn checkpoints_for_route(&self, route_id: i64) -> StoreResult<Vec<Checkpoint>> {
        Ok(self.tables.read().await.checkpoints_of(route_id))
    }

    async fn create_checkpoint(&self, new: NewCheckpoint) -> StoreResult<Checkpoint> {
        new.validate()?;
        let mut tables = self.tables.write().await;
        let id = next(&mut tables.seq.checkpoint);
        let checkpoint = Checkpoint {
            id,
            name: new.name,
            route_id: new.route_id,
            order: new.order,
            location: new.location,
            radius: new.radius.unwrap_or(DEFAULT_CHECKPOINT_RADIUS_M),
        };
        tables.checkpoints.insert(id, checkpoint.clone());
        Ok(checkpoint)
    }

    async fn update_checkpoint(
        &self,
        id: i64,
        update: CheckpointUpdate,
    ) -> StoreResult<Option<Checkpoint>> {
        let mut tables = self.tables.write().await;
        Ok(tables.checkpoints.get_mut(&id).map(|c| {
            c.apply(update);
            c.clone()
        }))
    }

    async fn delete_checkpoint(&self, id: i64) -> StoreResult<bool> {
        Ok(self.tables.write().await.checkpoints.remove(&id).is_some())
    }

    // ============================================
    // Participants
    // ============================================

    async fn participants_for_event(&self, event_id: i64) -> StoreResult<Vec<Participant>> {
        Ok(self.tables.read().await.participants_of(event_id))
    }

    async fn get_participant(&self, id: i64) -> StoreResult<Option<Participant>> {
        Ok(self.tables.read().await.participants.get(&id).cloned())
    }

    async fn create_participant(&self, new: NewParticipant) -> StoreResult<Participant> {
        new.validate()?;
        let mut tables = self.tables.write().await;
        let id = next(&mut tables.seq.participant);
        let participant = Participant {
            id,
            number: new.number,
            name: new.name,
            event_id: new.event_id,
            status: new.status,
            emergency_contact: new.emergency_contact,
            emergency_phone: new.emergency_phone,
        };
        tables.participants.insert(id, participant.clone());
        Ok(participant)
    }

    async fn update_participant(
        &self,
        id: i64,
        update: ParticipantUpdate,
    ) -> StoreResult<Option<Participant>> {
        let mut tables = self.tables.write().await;
        Ok(tables.participants.get_mut(&id).map(|p| {
            p.apply(update);
            p.clone()
        }))
    }

    async fn participants_with_tracking(
        &self,
        event_id: i64,
    ) -> StoreResult<Vec<ParticipantWithTracking>> {
        let tables = self.tables.read().await;
        let checkpoints = tables.event_checkpoints(event_id);
        Ok(tables
            .participants_of(event_id)
            .into_iter()
            .map(|p| {
                let history = tables.history(p.id);
                participant::summarize(p, &history, &checkpoints)
            })
            .collect())
    }

    // ============================================
    // Tracking
    // ============================================

    async fn tracking_history(&self, participant_id: i64, limit: usize) -> StoreResult<Vec<TrackingPoint>> {
        let tables = self.tables.read().await;
        let mut points = tables.history(participant_id);
        points.reverse();
        points.truncate(limit);
        Ok(points)
    }

    async fn create_tracking_point(&self, new: NewTrackingPoint) -> StoreResult<TrackingPoint> {
        new.validate()?;
        let mut tables = self.tables.write().await;
        if !tables.participants.contains_key(&new.participant_id) {
            return Err(StoreError::NotFound(format!("Participant: {}", new.participant_id)));
        }

        let id = next(&mut tables.seq.tracking_point);
        let point = TrackingPoint {
            id,
            participant_id: new.participant_id,
            event_id: new.event_id,
            timestamp: new.timestamp.unwrap_or_else(Utc::now),
            location: new.location,
            speed: new.speed,
            battery: new.battery,
            elevation: new.elevation,
            has_alert: new.has_alert,
            alert_type: new.alert_type,
        };
        tables.tracking_points.insert(id, point.clone());
        debug!(id, participant_id = point.participant_id, "Tracking point recorded");
        Ok(point)
    }

    async fn latest_tracking_point(&self, participant_id: i64) -> StoreResult<Option<TrackingPoint>> {
        Ok(self.tables.read().await.latest(participant_id).cloned())
    }

    async fn active_alerts(&self, event_id: i64) -> StoreResult<Vec<AlertInfo>> {
        let tables = self.tables.read().await;
        Ok(tables
            .participants_of(event_id)
            .iter()
            .filter_map(|p| {
                tables
                    .latest(p.id)
                    .and_then(|point| AlertInfo::project(point, p))
            })
            .collect())
    }

    async fn resolve_alert(&self, tracking_point_id: i64) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        match tables.tracking_points.get_mut(&tracking_point_id) {
            Some(point) => {
                *point = point.resolved();
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use trackpro_core::device::DeviceStatus;
    use trackpro_core::event::EventStatus;
    use trackpro_core::participant::ParticipantStatus;
    use trackpro_core::tracking::{AlertKind, AlertType};
    use trackpro_core::GeoPoint;

    async fn store_with_runner() -> (MemoryStore, Participant) {
        let store = MemoryStore::new();
        let now = Utc::now();
        store
            .create_event(NewEvent {
                name: "Mountain Challenge".to_string(),
                description: None,
                start_date: now,
                end_date: now + Duration::hours(5),
                location: "San Francisco, CA".to_string(),
                status: EventStatus::Active,
                route_id: None,
                created_by: None,
                max_participants: None,
            })
            .await
            .unwrap();
        let runner = store
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
        (store, runner)
    }

    fn report(participant_id: i64, alert: Option<AlertType>) -> NewTrackingPoint {
        NewTrackingPoint {
            participant_id,
            event_id: 1,
            timestamp: None,
            location: GeoPoint::new(37.7749, -122.4194),
            speed: Some(10.0),
            battery: Some(80.0),
            elevation: Some(120.0),
            has_alert: alert.is_some(),
            alert_type: alert,
        }
    }

    #[tokio::test]
    async fn test_event_defaults() {
        let (store, _) = store_with_runner().await;
        let event = store.get_event(1).await.unwrap().unwrap();
        assert_eq!(event.max_participants, DEFAULT_MAX_PARTICIPANTS);
        assert!(store.get_event(99).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_history_newest_first_with_limit() {
        let (store, runner) = store_with_runner().await;
        for _ in 0..5 {
            store.create_tracking_point(report(runner.id, None)).await.unwrap();
        }

        let history = store.tracking_history(runner.id, 3).await.unwrap();
        assert_eq!(history.iter().map(|p| p.id).collect::<Vec<_>>(), vec![5, 4, 3]);

        let latest = store.latest_tracking_point(runner.id).await.unwrap().unwrap();
        assert_eq!(latest.id, 5);
    }

    #[tokio::test]
    async fn test_point_for_unknown_participant_is_rejected() {
        let (store, _) = store_with_runner().await;
        let err = store.create_tracking_point(report(42, None)).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
        assert!(store.tracking_history(42, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_point_is_rejected() {
        let (store, runner) = store_with_runner().await;
        let mut bad = report(runner.id, None);
        bad.has_alert = true;
        let err = store.create_tracking_point(bad).await.unwrap_err();
        assert!(matches!(err, StoreError::Invalid(_)));
    }

    #[tokio::test]
    async fn test_resolve_alert_is_idempotent() {
        let (store, runner) = store_with_runner().await;
        let point = store
            .create_tracking_point(report(runner.id, Some(AlertType::Open(AlertKind::Sos))))
            .await
            .unwrap();
        assert_eq!(store.active_alerts(1).await.unwrap().len(), 1);

        assert!(store.resolve_alert(point.id).await.unwrap());
        assert!(store.resolve_alert(point.id).await.unwrap());

        let resolved = store.latest_tracking_point(runner.id).await.unwrap().unwrap();
        assert!(!resolved.has_alert);
        assert_eq!(resolved.alert_type.unwrap().to_string(), "sos-resolved");
        assert!(store.active_alerts(1).await.unwrap().is_empty());

        assert!(!store.resolve_alert(999).await.unwrap());
    }

    #[tokio::test]
    async fn test_active_alerts_follow_latest_point() {
        let (store, runner) = store_with_runner().await;
        store
            .create_tracking_point(report(runner.id, Some(AlertType::Open(AlertKind::OffCourse))))
            .await
            .unwrap();
        let carried = store
            .create_tracking_point(report(runner.id, Some(AlertType::Open(AlertKind::OffCourse))))
            .await
            .unwrap();

        let alerts = store.active_alerts(1).await.unwrap();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].tracking_point_id, carried.id);
        assert_eq!(alerts[0].participant_name, "Jay Jay");
    }

    #[tokio::test]
    async fn test_device_assignment() {
        let (store, runner) = store_with_runner().await;
        let device = store
            .create_device(NewDevice {
                name: "GPS Tracker 1".to_string(),
                device_type: "GPS".to_string(),
                serial_number: "GPS-001".to_string(),
                status: DeviceStatus::Available,
                battery_level: Some(100),
                last_seen: None,
                assigned_to: None,
            })
            .await
            .unwrap();

        assert!(store.assign_device(device.id, 77).await.unwrap().is_none());

        let assigned = store.assign_device(device.id, runner.id).await.unwrap().unwrap();
        assert_eq!(assigned.status, DeviceStatus::Assigned);
        assert_eq!(
            store.device_for_participant(runner.id).await.unwrap().unwrap().id,
            device.id
        );
        assert!(store.unassigned_devices().await.unwrap().is_empty());

        store.unassign_device(device.id).await.unwrap();
        assert_eq!(store.unassigned_devices().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_serial_conflicts() {
        let store = MemoryStore::new();
        let new = || NewDevice {
            name: "GPS Tracker".to_string(),
            device_type: "GPS".to_string(),
            serial_number: "GPS-001".to_string(),
            status: DeviceStatus::Available,
            battery_level: None,
            last_seen: None,
            assigned_to: None,
        };
        store.create_device(new()).await.unwrap();
        assert!(matches!(store.create_device(new()).await, Err(StoreError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_participants_with_tracking() {
        let (store, runner) = store_with_runner().await;
        store.create_tracking_point(report(runner.id, None)).await.unwrap();

        let rows = store.participants_with_tracking(1).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].latest_position.as_ref().unwrap().participant_id, runner.id);
        assert_eq!(rows[0].distance, 0.0);
    }
}
