//! # Wire Protocol Constants and Types
//!
//! Core definitions for the sensor wire contract: the closed set of sensor
//! kinds, their field layouts, and the framing constants shared by the
//! encoders.

use serde::Deserialize;

/// Sync byte opening every framed payload (always 0xA5)
pub const FRAME_SYNC_BYTE: u8 = 0xA5;

/// Width of one encoded field in bytes (IEEE-754 single precision)
pub const FIELD_WIDTH: usize = 4;

/// Overhead of a framed payload: sync(1) + length(1) + tag(1) + crc(1)
pub const FRAME_OVERHEAD: usize = 4;

/// Overhead of one vector-group record: group id(1) + component count(1)
pub const GROUP_HEADER_SIZE: usize = 2;

/// The simulated sensor channel.
///
/// A closed set: configuration values outside this enum fail to
/// deserialize, so an unknown sensor type is unrepresentable past startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SensorKind {
    /// Inertial accelerometer: 3-axis specific force
    Imu,
    /// Rate gyroscope: 3-axis angular velocity
    Gyro,
    /// Barometric altimeter: scalar altitude
    Altitude,
    /// Full kinematic state: position, velocity, acceleration
    Kinematics,
}

/// Binary encoding strategy, chosen per deployment.
///
/// The two strategies are never mixed within one channel's lifetime; the
/// downstream decoder is built against exactly one of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WireFormat {
    /// Bare little-endian f32 fields in fixed order, no header
    Flat,
    /// Self-describing frame: sync, length, sensor tag, vector-group
    /// records, CRC-8 trailer
    Framed,
}

/// Field group identifiers used by the framed encoding.
///
/// A 3-component vector record is reused for position, velocity,
/// acceleration and angular rate; altitude is a 1-component record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldGroup {
    Position,
    Velocity,
    Acceleration,
    AngularRate,
    Altitude,
}

impl FieldGroup {
    /// Group id byte on the wire
    pub const fn id(self) -> u8 {
        match self {
            FieldGroup::Position => 0x01,
            FieldGroup::Velocity => 0x02,
            FieldGroup::Acceleration => 0x03,
            FieldGroup::AngularRate => 0x04,
            FieldGroup::Altitude => 0x05,
        }
    }
}

impl SensorKind {
    /// All sensor kinds, for table-driven tests and validation sweeps
    pub const ALL: [SensorKind; 4] = [
        SensorKind::Imu,
        SensorKind::Gyro,
        SensorKind::Altitude,
        SensorKind::Kinematics,
    ];

    /// Sensor tag byte used by the framed encoding
    pub const fn wire_tag(self) -> u8 {
        match self {
            SensorKind::Imu => 0x01,
            SensorKind::Gyro => 0x02,
            SensorKind::Altitude => 0x03,
            SensorKind::Kinematics => 0x04,
        }
    }

    /// Field names in wire order.
    ///
    /// This order is the flat-encoding field order and the order in which
    /// covariance entries are resolved; changing it is a wire contract
    /// break.
    pub const fn field_names(self) -> &'static [&'static str] {
        match self {
            SensorKind::Imu => &["acceleration_x", "acceleration_y", "acceleration_z"],
            SensorKind::Gyro => &["omega_x", "omega_y", "omega_z"],
            SensorKind::Altitude => &["altitude"],
            SensorKind::Kinematics => &[
                "position_x",
                "position_y",
                "position_z",
                "velocity_x",
                "velocity_y",
                "velocity_z",
                "acceleration_x",
                "acceleration_y",
                "acceleration_z",
            ],
        }
    }

    /// Number of f32 fields carried by one reading of this kind
    pub const fn field_count(self) -> usize {
        self.field_names().len()
    }

    /// Vector-group structure of this kind for the framed encoding, as
    /// (group, component count) pairs covering the fields in wire order
    pub const fn groups(self) -> &'static [(FieldGroup, usize)] {
        match self {
            SensorKind::Imu => &[(FieldGroup::Acceleration, 3)],
            SensorKind::Gyro => &[(FieldGroup::AngularRate, 3)],
            SensorKind::Altitude => &[(FieldGroup::Altitude, 1)],
            SensorKind::Kinematics => &[
                (FieldGroup::Position, 3),
                (FieldGroup::Velocity, 3),
                (FieldGroup::Acceleration, 3),
            ],
        }
    }

    /// Configuration/topic name of this kind
    pub const fn as_str(self) -> &'static str {
        match self {
            SensorKind::Imu => "imu",
            SensorKind::Gyro => "gyro",
            SensorKind::Altitude => "altitude",
            SensorKind::Kinematics => "kinematics",
        }
    }
}

impl std::fmt::Display for SensorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One sensor reading: a kind tag plus its noisy field values in wire
/// order.
///
/// Transient: produced per request or per broadcast tick, encoded, and
/// dropped. `values.len()` always equals `kind.field_count()`.
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    pub kind: SensorKind,
    pub values: Vec<f32>,
}

impl Reading {
    /// Build a reading, checking the value count against the kind's layout
    pub fn new(kind: SensorKind, values: Vec<f32>) -> Self {
        debug_assert_eq!(values.len(), kind.field_count());
        Self { kind, values }
    }
}
