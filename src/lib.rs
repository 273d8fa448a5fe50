//! # Sensor Sim Library
//!
//! Synthetic ballistic sensor telemetry for exercising a downstream
//! fusion pipeline without physical hardware.
//!
//! This library models a single constant-gravity ballistic trajectory,
//! derives per-channel instrument readings at arbitrary query times,
//! injects calibrated Gaussian noise, and serializes each reading into a
//! fixed binary layout served or published over a pluggable pub/sub
//! transport.

pub mod config;
pub mod error;
pub mod launch;
pub mod noise;
pub mod server;
pub mod trajectory;
pub mod transport;
pub mod wire;
