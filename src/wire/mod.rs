//! # Wire Module
//!
//! The binary contract between the simulator and downstream consumers.
//!
//! This module handles:
//! - The closed set of sensor kinds and their field layouts
//! - Flat encoding (bare little-endian f32 fields, Python-producer
//!   compatible)
//! - Framed encoding (sync + length + tag + vector-group records + CRC-8)
//! - The zero-length "trajectory complete" sentinel convention

pub mod encoder;
pub mod protocol;

pub use encoder::{encode_reading, encoded_len};
pub use protocol::{Reading, SensorKind, WireFormat};
