//! Tracking devices and their assignment to participants.

pub mod model;

use crate::error::{require_text, CoreError, CoreResult};
pub use model::{Device, DeviceStatus, DeviceUpdate, NewDevice};

impl NewDevice {
    pub fn validate(&self) -> CoreResult<()> {
        require_text("name", &self.name)?;
        require_text("type", &self.device_type)?;
        require_text("serialNumber", &self.serial_number)?;
        if self.battery_level.is_some_and(|b| !(0..=100).contains(&b)) {
            return Err(CoreError::validation("batteryLevel must be within 0-100"));
        }
        Ok(())
    }
}

impl Device {
    pub fn apply(&mut self, update: DeviceUpdate) {
        if let Some(name) = update.name {
            self.name = name;
        }
        if let Some(device_type) = update.device_type {
            self.device_type = device_type;
        }
        if let Some(serial) = update.serial_number {
            self.serial_number = serial;
        }
        if let Some(status) = update.status {
            self.status = status;
        }
        if let Some(level) = update.battery_level {
            self.battery_level = Some(level);
        }
        if let Some(seen) = update.last_seen {
            self.last_seen = Some(seen);
        }
        if let Some(assigned) = update.assigned_to {
            self.assigned_to = Some(assigned);
        }
    }

    /// Bind the device to a participant.
    pub fn assign(&mut self, participant_id: i64) {
        self.assigned_to = Some(participant_id);
        self.status = DeviceStatus::Assigned;
    }

    /// Release the device back to the pool.
    pub fn unassign(&mut self) {
        self.assigned_to = None;
        self.status = DeviceStatus::Available;
    }
}
