//! Participants and their progress along the route.

pub mod model;

use std::collections::BTreeSet;

use crate::error::{require_text, CoreError, CoreResult};
use crate::geo::{distance_m, haversine_km};
use crate::route::model::Checkpoint;
use crate::tracking::model::TrackingPoint;
pub use model::{
    NewParticipant, Participant, ParticipantStatus, ParticipantUpdate, ParticipantWithTracking,
};

impl NewParticipant {
    pub fn validate(&self) -> CoreResult<()> {
        require_text("name", &self.name)?;
        if self.number <= 0 {
            return Err(CoreError::validation("number must be positive"));
        }
        Ok(())
    }
}

impl Participant {
    pub fn is_active(&self) -> bool {
        self.status == ParticipantStatus::Active
    }

    /// Apply a partial update in place.
    pub fn apply(&mut self, update: ParticipantUpdate) {
        if let Some(number) = update.number {
            self.number = number;
        }
        if let Some(name) = update.name {
            self.name = name;
        }
        if let Some(event_id) = update.event_id {
            self.event_id = event_id;
        }
        if let Some(status) = update.status {
            self.status = status;
        }
        if let Some(contact) = update.emergency_contact {
            self.emergency_contact = Some(contact);
        }
        if let Some(phone) = update.emergency_phone {
            self.emergency_phone = Some(phone);
        }
    }
}

/// Ids of the checkpoints whose radius contains at least one of `history`.
pub fn reached_checkpoints(history: &[TrackingPoint], checkpoints: &[Checkpoint]) -> BTreeSet<i64> {
    checkpoints
        .iter()
        .filter(|cp| {
            let center = cp.location.to_geo_point();
            history
                .iter()
                .any(|p| distance_m(&p.location, &center) <= cp.radius)
        })
        .map(|cp| cp.id)
        .collect()
}

/// Total path length of a history ordered oldest first, in kilometers
/// rounded to one decimal.
pub fn distance_covered_km(history: &[TrackingPoint]) -> f64 {
    let km: f64 = history
        .windows(2)
        .map(|w| haversine_km(&w[0].location, &w[1].location))
        .sum();
    (km * 10.0).round() / 10.0
}

/// Elapsed time between the first and last point as `HH:MM:SS`.
pub fn elapsed(history: &[TrackingPoint]) -> String {
    let secs = match (history.first(), history.last()) {
        (Some(first), Some(last)) => (last.timestamp - first.timestamp).num_seconds().max(0),
        _ => 0,
    };
    format!("{:02}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
}

/// Build the tracking summary for one participant.
///
/// `history` must be ordered oldest first.
pub fn summarize(
    participant: Participant,
    history: &[TrackingPoint],
    checkpoints: &[Checkpoint],
) -> ParticipantWithTracking {
    ParticipantWithTracking {
        participant,
        latest_position: history.last().cloned(),
        distance: distance_covered_km(history),
        duration: elapsed(history),
        checkpoints_completed: reached_checkpoints(history, checkpoints).len(),
    }
}
