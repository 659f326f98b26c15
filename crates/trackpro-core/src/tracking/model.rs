//! Tracking domain models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::CoreError;
use crate::geo::GeoPoint;

/// Suffix appended to an alert type once the alert has been handled.
pub const RESOLVED_SUFFIX: &str = "-resolved";

/// Kind of emergency signal a device can raise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AlertKind {
    Sos,
    LowBattery,
    OffCourse,
}

impl AlertKind {
    /// Every kind the simulator may raise.
    pub const ALL: [AlertKind; 3] = [Self::Sos, Self::LowBattery, Self::OffCourse];

    /// Parse from string.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "sos" => Some(Self::Sos),
            "low-battery" => Some(Self::LowBattery),
            "off-course" => Some(Self::OffCourse),
            _ => None,
        }
    }

    /// Convert to string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sos => "sos",
            Self::LowBattery => "low-battery",
            Self::OffCourse => "off-course",
        }
    }
}

/// Alert state carried by a tracking point.
///
/// On the wire this is the plain alert string: `"sos"` while open,
/// `"sos-resolved"` once handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum AlertType {
    Open(AlertKind),
    Resolved(AlertKind),
}

impl AlertType {
    pub fn kind(&self) -> AlertKind {
        match self {
            Self::Open(kind) | Self::Resolved(kind) => *kind,
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self, Self::Open(_))
    }

    /// The resolved form of this alert. Resolving twice is a no-op.
    pub fn resolve(self) -> Self {
        Self::Resolved(self.kind())
    }
}

impl fmt::Display for AlertType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open(kind) => f.write_str(kind.as_str()),
            Self::Resolved(kind) => write!(f, "{}{}", kind.as_str(), RESOLVED_SUFFIX),
        }
    }
}

impl TryFrom<String> for AlertType {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        let (base, resolved) = match value.strip_suffix(RESOLVED_SUFFIX) {
            Some(base) => (base, true),
            None => (value.as_str(), false),
        };
        let kind = AlertKind::parse(base).ok_or_else(|| CoreError::UnknownAlertType(value.clone()))?;
        Ok(if resolved { Self::Resolved(kind) } else { Self::Open(kind) })
    }
}

impl From<AlertType> for String {
    fn from(value: AlertType) -> Self {
        value.to_string()
    }
}

/// A timestamped position/telemetry record for one participant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingPoint {
    pub id: i64,
    pub participant_id: i64,
    pub event_id: i64,
    pub timestamp: DateTime<Utc>,
    pub location: GeoPoint,
    /// Speed in km/h.
    pub speed: Option<f64>,
    /// Battery percentage (0-100).
    pub battery: Option<f64>,
    /// Elevation in meters.
    pub elevation: Option<f64>,
    pub has_alert: bool,
    pub alert_type: Option<AlertType>,
}

/// Input shape for a new tracking point. The store assigns the id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTrackingPoint {
    pub participant_id: i64,
    pub event_id: i64,
    /// Time of the fix. Filled with the time of record when absent.
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    pub location: GeoPoint,
    #[serde(default)]
    pub speed: Option<f64>,
    #[serde(default)]
    pub battery: Option<f64>,
    #[serde(default)]
    pub elevation: Option<f64>,
    #[serde(default)]
    pub has_alert: bool,
    #[serde(default)]
    pub alert_type: Option<AlertType>,
}

/// Display projection of an open alert, joined with its participant.
///
/// Derived on demand from the participant's latest tracking point; never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertInfo {
    pub participant_id: i64,
    pub alert_type: AlertType,
    pub timestamp: DateTime<Utc>,
    pub location: GeoPoint,
    pub participant_name: String,
    pub participant_number: i64,
    /// Point to pass to the resolve-alert endpoint.
    pub tracking_point_id: i64,
}

/// Body of an `alert` message announcing that an alert was handled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertResolution {
    pub id: i64,
    pub resolved: bool,
}
