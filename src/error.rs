//! # Error Types
//!
//! Custom error types for the sensor simulator using `thiserror`.

use thiserror::Error;

/// Main error type for the sensor simulator
#[derive(Debug, Error)]
pub enum SensorSimError {
    /// Configuration errors (parse and validation)
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// Transport adapter errors (session, publish, subscribe, reply)
    #[error("Transport error: {0}")]
    Transport(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for the sensor simulator
pub type Result<T> = std::result::Result<T, SensorSimError>;
