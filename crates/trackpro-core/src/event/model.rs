//! Event domain models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::participant::model::ParticipantWithTracking;

/// Default capacity of an event.
pub const DEFAULT_MAX_PARTICIPANTS: i64 = 100;

/// A tracked sports/adventure event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub location: String,
    pub status: EventStatus,
    pub route_id: Option<i64>,
    pub created_by: Option<i64>,
    pub max_participants: i64,
}

/// Event status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    #[default]
    Upcoming,
    Active,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewEvent {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub location: String,
    #[serde(default)]
    pub status: EventStatus,
    #[serde(default)]
    pub route_id: Option<i64>,
    #[serde(default)]
    pub created_by: Option<i64>,
    #[serde(default)]
    pub max_participants: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub location: Option<String>,
    pub status: Option<EventStatus>,
    pub route_id: Option<i64>,
    pub created_by: Option<i64>,
    pub max_participants: Option<i64>,
}

/// An event with aggregate progress figures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventWithStats {
    #[serde(flatten)]
    pub event: Event,
    pub participant_count: usize,
    pub active_participants: usize,
    pub alerts_count: usize,
    pub completed_checkpoints: usize,
    pub total_checkpoints: usize,
    pub lead_participant: Option<ParticipantWithTracking>,
}
