//! Events and event-level statistics.

pub mod model;

use std::collections::BTreeSet;

use crate::error::{require_text, CoreError, CoreResult};
use crate::participant::{self, model::Participant, ParticipantStatus};
use crate::route::model::Checkpoint;
use crate::tracking::model::TrackingPoint;
pub use model::{Event, EventStatus, EventUpdate, EventWithStats, NewEvent, DEFAULT_MAX_PARTICIPANTS};

impl NewEvent {
    pub fn validate(&self) -> CoreResult<()> {
        require_text("name", &self.name)?;
        require_text("location", &self.location)?;
        if self.end_date < self.start_date {
            return Err(CoreError::validation("endDate must not precede startDate"));
        }
        if self.max_participants.is_some_and(|m| m <= 0) {
            return Err(CoreError::validation("maxParticipants must be positive"));
        }
        Ok(())
    }
}

impl Event {
    pub fn apply(&mut self, update: EventUpdate) {
        if let Some(name) = update.name {
            self.name = name;
        }
        if let Some(description) = update.description {
            self.description = Some(description);
        }
        if let Some(start) = update.start_date {
            self.start_date = start;
        }
        if let Some(end) = update.end_date {
            self.end_date = end;
        }
        if let Some(location) = update.location {
            self.location = location;
        }
        if let Some(status) = update.status {
            self.status = status;
        }
        if let Some(route_id) = update.route_id {
            self.route_id = Some(route_id);
        }
        if let Some(created_by) = update.created_by {
            self.created_by = Some(created_by);
        }
        if let Some(max) = update.max_participants {
            self.max_participants = max;
        }
    }
}

/// Aggregate an event's figures from its participants' histories.
///
/// Each history must be ordered oldest first. A participant counts towards
/// `alerts_count` when its latest point carries an open alert.
pub fn build_stats(
    event: Event,
    participants: Vec<(Participant, Vec<TrackingPoint>)>,
    checkpoints: &[Checkpoint],
) -> EventWithStats {
    let participant_count = participants.len();
    let active_participants = participants
        .iter()
        .filter(|(p, _)| p.status == ParticipantStatus::Active)
        .count();

    let mut alerts_count = 0;
    let mut reached = BTreeSet::new();
    let mut lead: Option<participant::ParticipantWithTracking> = None;

    for (p, history) in participants {
        if history.last().is_some_and(|pt| pt.has_open_alert()) {
            alerts_count += 1;
        }
        reached.extend(participant::reached_checkpoints(&history, checkpoints));

        let summary = participant::summarize(p, &history, checkpoints);
        let leads = match &lead {
            Some(current) => summary.distance > current.distance,
            None => summary.distance > 0.0,
        };
        if leads {
            lead = Some(summary);
        }
    }

    EventWithStats {
        event,
        participant_count,
        active_participants,
        alerts_count,
        completed_checkpoints: reached.len(),
        total_checkpoints: checkpoints.len(),
        lead_participant: lead,
    }
}
