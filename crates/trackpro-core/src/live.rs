//! Live-update message taxonomy.
//!
//! Every frame on the `/ws` channel is a JSON envelope `{"type": ..., "data": ...}`.
//! Server to client frames are [`LiveMessage`]s. Client to server frames are
//! parsed with [`parse_inbound`]; only `position_update` is acted upon.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use thiserror::Error;

use crate::event::model::Event;
use crate::participant::model::Participant;
use crate::tracking::model::{AlertInfo, AlertResolution, NewTrackingPoint, TrackingPoint};

/// Message pushed to live-update subscribers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum LiveMessage {
    /// Sent once, right after a subscriber is accepted.
    Connected(ConnectedInfo),
    /// A tracking point that has been persisted.
    PositionUpdate(TrackingPoint),
    /// An alert was raised or resolved.
    Alert(AlertPayload),
    /// An event record changed.
    EventUpdate(Event),
    /// A participant record changed.
    ParticipantStatus(Participant),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectedInfo {
    pub client_id: String,
}

/// Body of an `alert` message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AlertPayload {
    Raised(AlertInfo),
    Resolved(AlertResolution),
}

/// Discriminant of a [`LiveMessage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    Connected,
    PositionUpdate,
    Alert,
    EventUpdate,
    ParticipantStatus,
}

impl MessageKind {
    /// Wire name of the kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Connected => "connected",
            Self::PositionUpdate => "position_update",
            Self::Alert => "alert",
            Self::EventUpdate => "event_update",
            Self::ParticipantStatus => "participant_status",
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl LiveMessage {
    pub fn connected(client_id: impl Into<String>) -> Self {
        Self::Connected(ConnectedInfo { client_id: client_id.into() })
    }

    pub fn alert_raised(info: AlertInfo) -> Self {
        Self::Alert(AlertPayload::Raised(info))
    }

    pub fn alert_resolved(tracking_point_id: i64) -> Self {
        Self::Alert(AlertPayload::Resolved(AlertResolution {
            id: tracking_point_id,
            resolved: true,
        }))
    }

    pub fn kind(&self) -> MessageKind {
        match self {
            Self::Connected(_) => MessageKind::Connected,
            Self::PositionUpdate(_) => MessageKind::PositionUpdate,
            Self::Alert(_) => MessageKind::Alert,
            Self::EventUpdate(_) => MessageKind::EventUpdate,
            Self::ParticipantStatus(_) => MessageKind::ParticipantStatus,
        }
    }
}

/// Why an inbound frame was dropped.
#[derive(Error, Debug)]
pub enum InboundError {
    /// Not JSON, or JSON without a string `type` field.
    #[error("malformed frame: {0}")]
    Malformed(#[from] serde_json::Error),

    /// A `position_update` whose payload is not a valid tracking point.
    #[error("invalid position report: {0}")]
    Invalid(String),
}

/// A frame received from a subscriber.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    /// A position report to persist and re-broadcast.
    PositionReport(NewTrackingPoint),
    /// Any other message type. Not interpreted.
    Other(String),
}

#[derive(Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: Value,
}

/// Parse and validate a raw inbound frame.
pub fn parse_inbound(raw: &str) -> Result<Inbound, InboundError> {
    let envelope: Envelope = serde_json::from_str(raw)?;

    if envelope.kind != MessageKind::PositionUpdate.as_str() {
        return Ok(Inbound::Other(envelope.kind));
    }

    let report: NewTrackingPoint = serde_json::from_value(envelope.data)
        .map_err(|e| InboundError::Invalid(e.to_string()))?;
    report
        .validate()
        .map_err(|e| InboundError::Invalid(e.to_string()))?;
    Ok(Inbound::PositionReport(report))
}
