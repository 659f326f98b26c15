//! Tracking points and alert lifecycle.

pub mod model;

use crate::error::{CoreError, CoreResult};
use crate::participant::model::Participant;
pub use model::{
    AlertInfo, AlertKind, AlertResolution, AlertType, NewTrackingPoint, TrackingPoint,
    RESOLVED_SUFFIX,
};

/// Default number of points returned by a history query.
pub const DEFAULT_HISTORY_LIMIT: usize = 100;

impl NewTrackingPoint {
    /// Check the input against the tracking point shape.
    pub fn validate(&self) -> CoreResult<()> {
        if !self.location.is_valid() {
            return Err(CoreError::validation(format!(
                "location out of range: ({}, {})",
                self.location.lat, self.location.lng
            )));
        }
        if let Some(battery) = self.battery {
            if !(0.0..=100.0).contains(&battery) {
                return Err(CoreError::validation(format!("battery out of range: {}", battery)));
            }
        }
        if let Some(speed) = self.speed {
            if !speed.is_finite() || speed < 0.0 {
                return Err(CoreError::validation(format!("invalid speed: {}", speed)));
            }
        }
        if let Some(elevation) = self.elevation {
            if !elevation.is_finite() {
                return Err(CoreError::validation("elevation must be finite"));
            }
        }
        if self.has_alert && !self.alert_type.is_some_and(|t| t.is_open()) {
            return Err(CoreError::validation(
                "hasAlert requires an open alertType",
            ));
        }
        Ok(())
    }
}

impl TrackingPoint {
    /// Whether this point carries an alert that has not been resolved.
    pub fn has_open_alert(&self) -> bool {
        self.has_alert && self.alert_type.is_some_and(|t| t.is_open())
    }

    /// The point with its alert marked as handled.
    ///
    /// Clears `has_alert` and suffixes the alert type with `-resolved`;
    /// applying it to an already resolved point changes nothing.
    pub fn resolved(&self) -> Self {
        Self {
            has_alert: false,
            alert_type: self.alert_type.map(AlertType::resolve),
            ..self.clone()
        }
    }

    /// Kinematic state of this point as input for a follow-up point.
    pub fn to_input(&self) -> NewTrackingPoint {
        NewTrackingPoint {
            participant_id: self.participant_id,
            event_id: self.event_id,
            timestamp: Some(self.timestamp),
            location: self.location,
            speed: self.speed,
            battery: self.battery,
            elevation: self.elevation,
            has_alert: self.has_alert,
            alert_type: self.alert_type,
        }
    }
}

impl AlertInfo {
    /// Project an alerting point and its participant. `None` when the point
    /// has no open alert.
    pub fn project(point: &TrackingPoint, participant: &Participant) -> Option<Self> {
        if !point.has_open_alert() {
            return None;
        }
        Some(Self {
            participant_id: participant.id,
            alert_type: point.alert_type?,
            timestamp: point.timestamp,
            location: point.location,
            participant_name: participant.name.clone(),
            participant_number: participant.number,
            tracking_point_id: point.id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::GeoPoint;
    use crate::participant::model::ParticipantStatus;
    use chrono::Utc;

    fn input() -> NewTrackingPoint {
        NewTrackingPoint {
            participant_id: 1,
            event_id: 1,
            timestamp: None,
            location: GeoPoint::new(37.7749, -122.4194),
            speed: Some(12.0),
            battery: Some(50.0),
            elevation: Some(120.0),
            has_alert: false,
            alert_type: None,
        }
    }

    fn point(alert: Option<AlertType>) -> TrackingPoint {
        TrackingPoint {
            id: 7,
            participant_id: 1,
            event_id: 1,
            timestamp: Utc::now(),
            location: GeoPoint::new(37.7749, -122.4194),
            speed: None,
            battery: Some(50.0),
            elevation: None,
            has_alert: alert.is_some_and(|a| a.is_open()),
            alert_type: alert,
        }
    }

    #[test]
    fn test_alert_type_wire_format() {
        let open: AlertType = serde_json::from_str("\"low-battery\"").unwrap();
        assert_eq!(open, AlertType::Open(AlertKind::LowBattery));

        let resolved: AlertType = serde_json::from_str("\"sos-resolved\"").unwrap();
        assert_eq!(resolved, AlertType::Resolved(AlertKind::Sos));
        assert_eq!(serde_json::to_string(&resolved).unwrap(), "\"sos-resolved\"");

        assert!(serde_json::from_str::<AlertType>("\"meteor\"").is_err());
    }

    #[test]
    fn test_resolution_is_monotonic() {
        let p = point(Some(AlertType::Open(AlertKind::OffCourse)));
        let once = p.resolved();
        assert!(!once.has_alert);
        assert_eq!(once.alert_type.unwrap().to_string(), "off-course-resolved");

        let twice = once.resolved();
        assert_eq!(twice, once);
    }

    #[test]
    fn test_validate_accepts_plain_report() {
        assert!(input().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_fields() {
        let mut bad = input();
        bad.battery = Some(120.0);
        assert!(bad.validate().is_err());

        let mut bad = input();
        bad.location = GeoPoint::new(120.0, 0.0);
        assert!(bad.validate().is_err());

        let mut bad = input();
        bad.speed = Some(-3.0);
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_validate_alert_invariant() {
        let mut flagged = input();
        flagged.has_alert = true;
        assert!(flagged.validate().is_err());

        flagged.alert_type = Some(AlertType::Resolved(AlertKind::Sos));
        assert!(flagged.validate().is_err());

        flagged.alert_type = Some(AlertType::Open(AlertKind::Sos));
        assert!(flagged.validate().is_ok());
    }

    #[test]
    fn test_input_deserializes_with_defaults() {
        let json = r#"{"participantId":3,"eventId":1,"location":{"lat":1.0,"lng":2.0}}"#;
        let parsed: NewTrackingPoint = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.participant_id, 3);
        assert!(!parsed.has_alert);
        assert!(parsed.timestamp.is_none());
        assert!(parsed.battery.is_none());
    }

    #[test]
    fn test_alert_projection() {
        let participant = Participant {
            id: 1,
            number: 42,
            name: "Sarah Johnson".to_string(),
            event_id: 1,
            status: ParticipantStatus::Active,
            emergency_contact: None,
            emergency_phone: None,
        };

        let alerting = point(Some(AlertType::Open(AlertKind::Sos)));
        let info = AlertInfo::project(&alerting, &participant).unwrap();
        assert_eq!(info.participant_number, 42);
        assert_eq!(info.tracking_point_id, 7);

        let value = serde_json::to_value(&info).unwrap();
        assert_eq!(value["participantName"], "Sarah Johnson");
        assert_eq!(value["alertType"], "sos");

        assert!(AlertInfo::project(&alerting.resolved(), &participant).is_none());
    }
}
