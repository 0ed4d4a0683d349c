//! # NXT Telemetry Library
//!
//! Decode the telemetry stream of a LEGO Mindstorms NXT balancing robot and
//! estimate its motion.
//!
//! The brick sends fixed 34-byte packets over a serial link. This library
//! frames them out of the raw byte stream, decodes each payload into a
//! [`protocol::record::TelemetryRecord`], and runs a dead-reckoning estimator
//! over the records (distance, speed, heading, position, tail angle and body
//! tilt).

pub mod config;
pub mod error;
pub mod estimator;
pub mod protocol;
pub mod ring_buffer;
pub mod serial;
pub mod series;
pub mod session;
pub mod telemetry;
