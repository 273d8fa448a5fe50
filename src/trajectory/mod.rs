//! # Trajectory Module
//!
//! Closed-form constant-gravity ballistics for the simulated projectile.
//!
//! This module handles:
//! - Initial-condition decomposition (speed, launch angle, azimuth)
//! - Position, velocity and acceleration as pure functions of elapsed time
//! - The synthetic angular-velocity oscillation
//! - Derived flight constants (total flight time, apex altitude)
//!
//! Everything here is pure, total and deterministic for a given elapsed
//! time; launch gating and noise live elsewhere. Callers never pass
//! negative time (the launch gate clamps pre-launch queries to the rest
//! case).

/// Simple 3D vector with f64 components.
///
/// x and y span the ground plane, z points up.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    /// Zero vector
    pub const ZERO: Vec3 = Vec3::new(0.0, 0.0, 0.0);

    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

/// Immutable launch initial conditions.
///
/// Validated by configuration before a model is built: `initial_speed > 0`,
/// `0 < launch_angle_deg < 90`, `gravity > 0`, all finite. These ranges
/// guarantee `flight_time > 0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrajectoryParameters {
    /// Launch speed in m/s
    pub initial_speed: f64,
    /// Elevation above the ground plane in degrees
    pub launch_angle_deg: f64,
    /// Heading in the ground plane in degrees (0 = +x)
    pub azimuth_deg: f64,
    /// Gravitational acceleration in m/s^2
    pub gravity: f64,
}

impl Default for TrajectoryParameters {
    fn default() -> Self {
        Self {
            initial_speed: 100.0,
            launch_angle_deg: 75.0,
            azimuth_deg: 30.0,
            gravity: 9.81,
        }
    }
}

/// Ballistic trajectory model for one fixed set of initial conditions.
///
/// # Examples
///
/// ```
/// use sensor_sim::trajectory::{TrajectoryModel, TrajectoryParameters};
///
/// let model = TrajectoryModel::new(&TrajectoryParameters::default());
/// let apex = model.position(model.flight_time() / 2.0);
/// assert!((apex.z - model.max_altitude()).abs() < 1e-6);
/// ```
#[derive(Debug, Clone)]
pub struct TrajectoryModel {
    /// Initial velocity components (m/s)
    v0: Vec3,
    /// Gravitational acceleration (m/s^2)
    gravity: f64,
    /// Time until return to launch altitude (s)
    flight_time: f64,
    /// Apex altitude above the launch point (m)
    max_altitude: f64,
}

impl TrajectoryModel {
    /// Build a model from validated parameters.
    ///
    /// The elevation angle splits the speed into vertical and horizontal
    /// parts; the azimuth splits the horizontal part across the ground
    /// plane.
    pub fn new(params: &TrajectoryParameters) -> Self {
        let elevation = params.launch_angle_deg.to_radians();
        let azimuth = params.azimuth_deg.to_radians();

        let horizontal = params.initial_speed * elevation.cos();
        let v0 = Vec3::new(
            horizontal * azimuth.cos(),
            horizontal * azimuth.sin(),
            params.initial_speed * elevation.sin(),
        );

        let flight_time = 2.0 * v0.z / params.gravity;
        let max_altitude = v0.z * v0.z / (2.0 * params.gravity);

        Self {
            v0,
            gravity: params.gravity,
            flight_time,
            max_altitude,
        }
    }

    /// Position at elapsed time `t` seconds, relative to the launch point
    pub fn position(&self, t: f64) -> Vec3 {
        Vec3::new(
            self.v0.x * t,
            self.v0.y * t,
            self.v0.z * t - 0.5 * self.gravity * t * t,
        )
    }

    /// Velocity at elapsed time `t` seconds
    pub fn velocity(&self, t: f64) -> Vec3 {
        Vec3::new(self.v0.x, self.v0.y, self.v0.z - self.gravity * t)
    }

    /// Acceleration: constant free fall, independent of time
    pub fn acceleration(&self) -> Vec3 {
        Vec3::new(0.0, 0.0, -self.gravity)
    }

    /// Synthetic body angular velocity at elapsed time `t` seconds.
    ///
    /// A three-axis oscillation over one flight-time period. Not derived
    /// from rigid-body dynamics; its only contract is determinism in `t`.
    pub fn angular_velocity(&self, t: f64) -> Vec3 {
        let phase = t * 2.0 * std::f64::consts::PI / self.flight_time;
        Vec3::new(
            0.5 * phase.sin(),
            0.3 * (1.5 * phase).cos(),
            0.8 * (0.7 * phase).sin(),
        )
    }

    /// Total time from launch until return to launch altitude, in seconds
    pub fn flight_time(&self) -> f64 {
        self.flight_time
    }

    /// Apex altitude above the launch point, in meters
    pub fn max_altitude(&self) -> f64 {
        self.max_altitude
    }
}
