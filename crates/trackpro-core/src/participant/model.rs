//! Participant domain models.

use serde::{Deserialize, Serialize};

use crate::tracking::model::TrackingPoint;

/// A registered event participant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub id: i64,
    /// Bib number.
    pub number: i64,
    pub name: String,
    pub event_id: i64,
    pub status: ParticipantStatus,
    pub emergency_contact: Option<String>,
    pub emergency_phone: Option<String>,
}

/// Participant status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParticipantStatus {
    #[default]
    Registered,
    Active,
    Finished,
    Withdrawn,
    Disqualified,
}

impl ParticipantStatus {
    /// Convert to string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Registered => "registered",
            Self::Active => "active",
            Self::Finished => "finished",
            Self::Withdrawn => "withdrawn",
            Self::Disqualified => "disqualified",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewParticipant {
    pub number: i64,
    pub name: String,
    pub event_id: i64,
    #[serde(default)]
    pub status: ParticipantStatus,
    #[serde(default)]
    pub emergency_contact: Option<String>,
    #[serde(default)]
    pub emergency_phone: Option<String>,
}

/// Partial update; absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantUpdate {
    pub number: Option<i64>,
    pub name: Option<String>,
    pub event_id: Option<i64>,
    pub status: Option<ParticipantStatus>,
    pub emergency_contact: Option<String>,
    pub emergency_phone: Option<String>,
}

/// A participant with its latest position and progress derived from history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantWithTracking {
    #[serde(flatten)]
    pub participant: Participant,
    pub latest_position: Option<TrackingPoint>,
    /// Distance covered in kilometers.
    pub distance: f64,
    /// Elapsed time as `HH:MM:SS`.
    pub duration: String,
    pub checkpoints_completed: usize,
}
