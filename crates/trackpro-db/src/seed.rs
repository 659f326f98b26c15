//! Demo data for a fresh store.

use chrono::{Duration, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::info;

use trackpro_core::device::{DeviceStatus, NewDevice};
use trackpro_core::event::{EventStatus, NewEvent};
use trackpro_core::participant::{NewParticipant, ParticipantStatus};
use trackpro_core::route::{GeoJsonLineString, GeoJsonPoint, NewCheckpoint, NewRoute};
use trackpro_core::tracking::{AlertKind, AlertType, NewTrackingPoint};
use trackpro_core::GeoPoint;

use crate::store::{EntityStore, StoreResult};

/// Route waypoints, start to finish.
const ROUTE: [(f64, f64); 5] = [
    (37.7749, -122.4194),
    (37.7853, -122.4101),
    (37.7891, -122.4021),
    (37.7915, -122.3957),
    (37.7944, -122.3906),
];

const CHECKPOINT_NAMES: [&str; 5] = ["Start", "CP1", "CP2", "CP3", "Finish"];

const PARTICIPANTS: [&str; 12] = [
    "Jay Jay",
    "Sarah Johnson",
    "Emily Chen",
    "Michael Brown",
    "David Wilson",
    "Bilal",
    "Robert Martinez",
    "Lisa Anderson",
    "James Thomas",
    "Jennifer Garcia",
    "Daniel Lewis",
    "Maria Rodriguez",
];

/// Bib number of the participant seeded with an open SOS alert.
const SOS_NUMBER: i64 = 2;

/// Four in five participants start active; the rest have withdrawn.
const STATUS_POOL: [ParticipantStatus; 5] = [
    ParticipantStatus::Active,
    ParticipantStatus::Active,
    ParticipantStatus::Active,
    ParticipantStatus::Active,
    ParticipantStatus::Withdrawn,
];

/// Populate a store with one active event, its route, participants and devices.
///
/// Every active participant gets one tracking point scattered around a
/// route waypoint. Participant #2 is always active and carries an SOS.
pub async fn seed_demo_data<S, R>(store: &S, rng: &mut R) -> StoreResult<()>
where
    S: EntityStore + ?Sized,
    R: Rng,
{
    let now = Utc::now();

    let devices = [
        ("GPS Tracker 1", "GPS", "GPS-001", DeviceStatus::Available, 100, None, now),
        ("GPS Tracker 2", "GPS", "GPS-002", DeviceStatus::Available, 95, None, now),
        ("Smartphone A", "Smartphone", "SM-001", DeviceStatus::Assigned, 80, Some(1), now),
        ("Smart Watch X", "Wearable", "SW-001", DeviceStatus::Assigned, 75, Some(2), now),
        (
            "GPS Tracker 3",
            "GPS",
            "GPS-003",
            DeviceStatus::Maintenance,
            20,
            None,
            now - Duration::days(1),
        ),
    ];
    for (name, device_type, serial, status, battery, assigned_to, last_seen) in devices {
        store
            .create_device(NewDevice {
                name: name.to_string(),
                device_type: device_type.to_string(),
                serial_number: serial.to_string(),
                status,
                battery_level: Some(battery),
                last_seen: Some(last_seen),
                assigned_to,
            })
            .await?;
    }

    let waypoints: Vec<GeoPoint> = ROUTE.iter().map(|&(lat, lng)| GeoPoint::new(lat, lng)).collect();
    let route = store
        .create_route(NewRoute {
            name: "Mountain Challenge Route".to_string(),
            description: Some(
                "A challenging mountain bike route with steep climbs and descents".to_string(),
            ),
            distance: 21.5,
            path: GeoJsonLineString::new(&waypoints),
            created_by: Some(1),
        })
        .await?;

    for (order, (name, point)) in CHECKPOINT_NAMES.iter().zip(&waypoints).enumerate() {
        store
            .create_checkpoint(NewCheckpoint {
                name: name.to_string(),
                route_id: route.id,
                order: order as i64,
                location: GeoJsonPoint::new(*point),
                radius: Some(50.0),
            })
            .await?;
    }

    let event = store
        .create_event(NewEvent {
            name: "Mountain Challenge 2023".to_string(),
            description: Some("Annual mountain biking challenge through scenic trails".to_string()),
            start_date: now,
            end_date: now + Duration::hours(5),
            location: "San Francisco, CA".to_string(),
            status: EventStatus::Active,
            route_id: Some(route.id),
            created_by: Some(1),
            max_participants: Some(50),
        })
        .await?;

    for (index, name) in PARTICIPANTS.iter().enumerate() {
        let number = index as i64 + 1;
        let status = if number == SOS_NUMBER {
            ParticipantStatus::Active
        } else {
            STATUS_POOL
                .choose(rng)
                .copied()
                .unwrap_or(ParticipantStatus::Active)
        };

        let participant = store
            .create_participant(NewParticipant {
                number,
                name: name.to_string(),
                event_id: event.id,
                status,
                emergency_contact: Some("Emergency Contact".to_string()),
                emergency_phone: Some("123-456-7890".to_string()),
            })
            .await?;

        if status != ParticipantStatus::Active {
            continue;
        }

        let anchor = waypoints[index % waypoints.len()];
        let has_alert = number == SOS_NUMBER;
        store
            .create_tracking_point(NewTrackingPoint {
                participant_id: participant.id,
                event_id: event.id,
                timestamp: Some(now),
                location: GeoPoint::new(
                    anchor.lat + rng.gen_range(-0.005..0.005),
                    anchor.lng + rng.gen_range(-0.005..0.005),
                ),
                speed: Some(rng.gen_range(0.0..20.0)),
                battery: Some(rng.gen_range(0..100) as f64),
                elevation: Some(100.0 + rng.gen_range(0.0..500.0)),
                has_alert,
                alert_type: has_alert.then_some(AlertType::Open(AlertKind::Sos)),
            })
            .await?;
    }

    info!(event_id = event.id, participants = PARTICIPANTS.len(), "Seeded demo data");
    Ok(())
}
