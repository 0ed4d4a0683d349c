//! # Error Types
//!
//! Custom error types for NXT Telemetry using `thiserror`.

use thiserror::Error;

/// Main error type for NXT Telemetry
#[derive(Debug, Error)]
pub enum NxtError {
    /// Payload handed to the decoder is not exactly one telemetry payload
    #[error("Invalid packet length: expected {expected} bytes, got {actual}")]
    InvalidPacketLength { expected: usize, actual: usize },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serial port errors
    #[error("Serial error: {0}")]
    Serial(String),

    /// None of the candidate serial devices could be opened
    #[error("No serial device found (tried: {0})")]
    SerialPortNotFound(String),

    /// Malformed row in a record CSV file
    #[error("CSV parse error at line {line}: {reason}")]
    CsvParse { line: usize, reason: String },
}

/// Result type alias for NXT Telemetry
pub type Result<T> = std::result::Result<T, NxtError>;
