//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.
//!
//! Every configuration problem is a startup failure: the binary validates
//! once, before touching the transport, and exits non-zero with a
//! diagnostic. Nothing here is checked per request.

use serde::de::Error;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::error::Result;
use crate::noise::CovarianceTable;
use crate::trajectory::TrajectoryParameters;
use crate::wire::{SensorKind, WireFormat};

/// Serving mode, chosen at startup and never mixed within one process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Mode {
    /// Free-running periodic publication from process start
    Broadcast,
    /// Readings served on demand, gated on the launch trigger
    QueryReply,
}

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub sensor: SensorConfig,

    #[serde(default)]
    pub trajectory: TrajectoryConfig,

    #[serde(default)]
    pub broadcast: BroadcastConfig,

    #[serde(default)]
    pub launch: LaunchConfig,

    #[serde(default)]
    pub wire: WireConfig,

    /// Per-field variance overrides, merged over the calibrated defaults
    #[serde(default)]
    pub covariance: HashMap<SensorKind, HashMap<String, f64>>,
}

/// Simulated channel configuration
#[derive(Debug, Deserialize, Clone)]
pub struct SensorConfig {
    #[serde(default = "default_sensor_kind")]
    pub kind: SensorKind,

    /// Instance name; disambiguates multiple simulators sharing the topic
    /// namespace (the data topic is `devices/<id>`)
    #[serde(default = "default_sensor_id")]
    pub id: String,

    #[serde(default = "default_mode")]
    pub mode: Mode,
}

/// Launch initial conditions
#[derive(Debug, Deserialize, Clone)]
pub struct TrajectoryConfig {
    #[serde(default = "default_initial_speed")]
    pub initial_speed: f64,

    #[serde(default = "default_launch_angle_deg")]
    pub launch_angle_deg: f64,

    #[serde(default = "default_azimuth_deg")]
    pub azimuth_deg: f64,

    #[serde(default = "default_gravity")]
    pub gravity: f64,
}

/// Broadcast-mode loop configuration
#[derive(Debug, Deserialize, Clone)]
pub struct BroadcastConfig {
    #[serde(default = "default_period_ms")]
    pub period_ms: u64,
}

/// Launch-trigger subscription configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LaunchConfig {
    #[serde(default = "default_launch_topic")]
    pub topic: String,

    /// Designated trigger token; an inbound payload must equal it
    /// byte-for-byte to arm the gate
    #[serde(default = "default_launch_token")]
    pub token: String,
}

/// Wire format configuration
#[derive(Debug, Deserialize, Clone)]
pub struct WireConfig {
    #[serde(default = "default_wire_format")]
    pub format: WireFormat,
}

// Default value functions
fn default_sensor_kind() -> SensorKind { SensorKind::Kinematics }
fn default_sensor_id() -> String { "kinematics0".to_string() }
fn default_mode() -> Mode { Mode::QueryReply }

fn default_initial_speed() -> f64 { 100.0 }
fn default_launch_angle_deg() -> f64 { 75.0 }
fn default_azimuth_deg() -> f64 { 30.0 }
fn default_gravity() -> f64 { 9.81 }

fn default_period_ms() -> u64 { 100 }

fn default_launch_topic() -> String { "events/launch".to_string() }
fn default_launch_token() -> String { "LAUNCH".to_string() }

fn default_wire_format() -> WireFormat { WireFormat::Flat }

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            kind: default_sensor_kind(),
            id: default_sensor_id(),
            mode: default_mode(),
        }
    }
}

impl Default for TrajectoryConfig {
    fn default() -> Self {
        Self {
            initial_speed: default_initial_speed(),
            launch_angle_deg: default_launch_angle_deg(),
            azimuth_deg: default_azimuth_deg(),
            gravity: default_gravity(),
        }
    }
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self {
            period_ms: default_period_ms(),
        }
    }
}

impl Default for LaunchConfig {
    fn default() -> Self {
        Self {
            topic: default_launch_topic(),
            token: default_launch_token(),
        }
    }
}

impl Default for WireConfig {
    fn default() -> Self {
        Self {
            format: default_wire_format(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read, TOML parsing fails
    /// (including unknown sensor kind / mode / wire format values), or
    /// validation fails.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    pub fn validate(&self) -> Result<()> {
        if self.sensor.id.is_empty() {
            return Err(crate::error::SensorSimError::Config(
                toml::de::Error::custom("sensor id cannot be empty"),
            ));
        }

        let t = &self.trajectory;
        if !t.initial_speed.is_finite() || t.initial_speed <= 0.0 {
            return Err(crate::error::SensorSimError::Config(
                toml::de::Error::custom("initial_speed must be finite and > 0"),
            ));
        }

        // An angle of exactly 0 or 90 degrees degenerates the trajectory
        // (zero flight time or zero ground track)
        if !t.launch_angle_deg.is_finite()
            || t.launch_angle_deg <= 0.0
            || t.launch_angle_deg >= 90.0
        {
            return Err(crate::error::SensorSimError::Config(
                toml::de::Error::custom("launch_angle_deg must be strictly between 0 and 90"),
            ));
        }

        if !t.azimuth_deg.is_finite() {
            return Err(crate::error::SensorSimError::Config(
                toml::de::Error::custom("azimuth_deg must be finite"),
            ));
        }

        if !t.gravity.is_finite() || t.gravity <= 0.0 {
            return Err(crate::error::SensorSimError::Config(
                toml::de::Error::custom("gravity must be finite and > 0"),
            ));
        }

        if self.broadcast.period_ms == 0 || self.broadcast.period_ms > 60000 {
            return Err(crate::error::SensorSimError::Config(
                toml::de::Error::custom("period_ms must be between 1 and 60000"),
            ));
        }

        if self.launch.topic.is_empty() {
            return Err(crate::error::SensorSimError::Config(
                toml::de::Error::custom("launch topic cannot be empty"),
            ));
        }

        if self.launch.token.is_empty() {
            return Err(crate::error::SensorSimError::Config(
                toml::de::Error::custom("launch token cannot be empty"),
            ));
        }

        // Surface bad covariance overrides here rather than at server
        // construction so every configuration problem fails in one place
        CovarianceTable::with_overrides(&self.covariance)?;

        Ok(())
    }

    /// Topic the simulated readings are published or served on
    pub fn data_topic(&self) -> String {
        format!("devices/{}", self.sensor.id)
    }

    /// Launch initial conditions as trajectory parameters
    pub fn trajectory_params(&self) -> TrajectoryParameters {
        TrajectoryParameters {
            initial_speed: self.trajectory.initial_speed,
            launch_angle_deg: self.trajectory.launch_angle_deg,
            azimuth_deg: self.trajectory.azimuth_deg,
            gravity: self.trajectory.gravity,
        }
    }
}
