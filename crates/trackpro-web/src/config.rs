//! Server configuration.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Top-level server settings, usually read from `trackpro.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Fill a fresh store with the demo event.
    pub seed_demo_data: bool,
    pub simulation: SimulationConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
            seed_demo_data: true,
            simulation: SimulationConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Load from a TOML file. Missing keys take their defaults.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Self = toml::from_str(&raw)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        config
            .simulation
            .validate()
            .with_context(|| format!("Invalid [simulation] in {}", path.display()))?;
        Ok(config)
    }

    /// Socket address to bind.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Settings of the simulated telemetry source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub enabled: bool,
    pub motion_interval_secs: u64,
    pub alert_interval_secs: u64,
    /// Chance that an alert tick raises an alert, in `[0, 1]`.
    pub alert_probability: f64,
    /// Largest latitude/longitude step per motion tick, in degrees.
    pub max_offset_deg: f64,
    /// Battery percentage lost per motion tick.
    pub battery_drain: f64,
    /// Largest elevation change per motion tick, in meters.
    pub elevation_jitter: f64,
    pub max_speed_kmh: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            motion_interval_secs: 5,
            alert_interval_secs: 30,
            alert_probability: 0.1,
            max_offset_deg: 0.00025,
            battery_drain: 0.1,
            elevation_jitter: 1.0,
            max_speed_kmh: 20.0,
        }
    }
}

impl SimulationConfig {
    pub fn motion_interval(&self) -> Duration {
        Duration::from_secs(self.motion_interval_secs.max(1))
    }

    pub fn alert_interval(&self) -> Duration {
        Duration::from_secs(self.alert_interval_secs.max(1))
    }

    /// Reject values the random generator cannot sample from: every
    /// magnitude must be finite and non-negative, and the alert
    /// probability at most 1.
    pub fn validate(&self) -> anyhow::Result<()> {
        for (name, value) in [
            ("alert_probability", self.alert_probability),
            ("max_offset_deg", self.max_offset_deg),
            ("battery_drain", self.battery_drain),
            ("elevation_jitter", self.elevation_jitter),
            ("max_speed_kmh", self.max_speed_kmh),
        ] {
            anyhow::ensure!(
                value.is_finite() && value >= 0.0,
                "{} must be a finite non-negative number, got {}",
                name,
                value
            );
        }
        anyhow::ensure!(
            self.alert_probability <= 1.0,
            "alert_probability must be at most 1, got {}",
            self.alert_probability
        );
        Ok(())
    }
}
