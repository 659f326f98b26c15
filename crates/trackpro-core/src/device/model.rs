//! Device domain models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A GPS-reporting device carried by a participant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    pub id: i64,
    pub name: String,
    /// GPS, smartphone, smart watch, ...
    #[serde(rename = "type")]
    pub device_type: String,
    pub serial_number: String,
    pub status: DeviceStatus,
    /// Battery percentage.
    pub battery_level: Option<i64>,
    pub last_seen: Option<DateTime<Utc>>,
    /// Participant the device is assigned to.
    pub assigned_to: Option<i64>,
}

/// Device status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceStatus {
    #[default]
    Available,
    Assigned,
    Maintenance,
    Retired,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewDevice {
    pub name: String,
    #[serde(rename = "type")]
    pub device_type: String,
    pub serial_number: String,
    #[serde(default)]
    pub status: DeviceStatus,
    #[serde(default)]
    pub battery_level: Option<i64>,
    #[serde(default)]
    pub last_seen: Option<DateTime<Utc>>,
    #[serde(default)]
    pub assigned_to: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceUpdate {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub device_type: Option<String>,
    pub serial_number: Option<String>,
    pub status: Option<DeviceStatus>,
    pub battery_level: Option<i64>,
    pub last_seen: Option<DateTime<Utc>>,
    pub assigned_to: Option<i64>,
}
