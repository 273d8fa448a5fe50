//! # Noise Module
//!
//! Calibrated Gaussian measurement noise.
//!
//! This module handles:
//! - Zero-mean Gaussian noise injection per field value
//! - The per-kind, per-field covariance (variance) table
//! - Merging configuration overrides over the calibrated defaults
//! - Startup validation of every variance an encoder will need
//!
//! The random source is a `StdRng` behind a mutex so one model can be
//! shared across concurrent request contexts. Tests inject a seed through
//! [`NoiseModel::seeded`]; production uses OS entropy.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use serde::de::Error;

use crate::error::{Result, SensorSimError};
use crate::wire::SensorKind;

/// Gaussian noise source shared by all channels of one process.
#[derive(Debug)]
pub struct NoiseModel {
    rng: Mutex<StdRng>,
}

impl NoiseModel {
    /// Noise model drawing from OS entropy
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_os_rng()),
        }
    }

    /// Noise model with a fixed seed, for reproducible distributions in
    /// tests
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// Perturb `value` with an independent draw from N(0, variance).
    ///
    /// A variance of zero (or below, which validation rejects anyway)
    /// degenerates to the exact value; no draw is consumed from the
    /// source in that case.
    pub fn noisy(&self, value: f64, variance: f64) -> f64 {
        if variance <= 0.0 {
            return value;
        }

        // Non-finite variances are rejected at startup
        match Normal::new(0.0, variance.sqrt()) {
            Ok(dist) => {
                let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
                value + dist.sample(&mut *rng)
            }
            Err(_) => value,
        }
    }
}

impl Default for NoiseModel {
    fn default() -> Self {
        Self::new()
    }
}

/// Calibrated default variance for every field of a sensor kind.
///
/// Values match the original pipeline calibration: coarse position,
/// velocity and acceleration channels, a precise gyro, and a meter-grade
/// altimeter.
const fn default_variance(kind: SensorKind) -> f64 {
    match kind {
        SensorKind::Imu => 100.0,
        SensorKind::Gyro => 0.01,
        SensorKind::Altitude => 1.0,
        SensorKind::Kinematics => 100.0,
    }
}

/// Per-kind, per-field measurement variance table.
///
/// Immutable once built: defaults merged with configuration overrides at
/// startup, validated, then only read.
#[derive(Debug, Clone)]
pub struct CovarianceTable {
    entries: HashMap<SensorKind, HashMap<String, f64>>,
}

impl Default for CovarianceTable {
    fn default() -> Self {
        let mut entries = HashMap::new();
        for kind in SensorKind::ALL {
            let fields = kind
                .field_names()
                .iter()
                .map(|&name| (name.to_string(), default_variance(kind)))
                .collect();
            entries.insert(kind, fields);
        }
        Self { entries }
    }
}

impl CovarianceTable {
    /// Build the table from defaults plus configuration overrides.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if an override names a field the
    /// sensor kind does not carry, or sets a negative or non-finite
    /// variance.
    pub fn with_overrides(overrides: &HashMap<SensorKind, HashMap<String, f64>>) -> Result<Self> {
        let mut table = Self::default();

        for (&kind, fields) in overrides {
            for (name, &variance) in fields {
                if !kind.field_names().contains(&name.as_str()) {
                    return Err(SensorSimError::Config(toml::de::Error::custom(format!(
                        "unknown covariance field {}.{}",
                        kind, name
                    ))));
                }
                if !variance.is_finite() || variance < 0.0 {
                    return Err(SensorSimError::Config(toml::de::Error::custom(format!(
                        "covariance {}.{} must be finite and >= 0, got {}",
                        kind, name, variance
                    ))));
                }
                if let Some(entry) = table.entries.get_mut(&kind) {
                    entry.insert(name.clone(), variance);
                }
            }
        }

        Ok(table)
    }

    /// Variances for one sensor kind in wire field order.
    ///
    /// Resolved once at server construction so per-request sampling never
    /// touches the string keys.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if a required field has no entry.
    pub fn variances(&self, kind: SensorKind) -> Result<Vec<f64>> {
        let fields = self.entries.get(&kind).ok_or_else(|| {
            SensorSimError::Config(toml::de::Error::custom(format!(
                "no covariance entries for sensor kind {}",
                kind
            )))
        })?;

        kind.field_names()
            .iter()
            .map(|&name| {
                fields.get(name).copied().ok_or_else(|| {
                    SensorSimError::Config(toml::de::Error::custom(format!(
                        "missing covariance entry {}.{}",
                        kind, name
                    )))
                })
            })
            .collect()
    }
}
