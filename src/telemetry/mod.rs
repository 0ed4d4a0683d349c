//! # Telemetry Module
//!
//! Hands decoded records and state snapshots to the outside world.
//!
//! This module handles:
//! - The [`TelemetrySink`] seam used by the serial pump and the replay command
//! - CSV text output (records and snapshots, each with its header)
//! - Periodic status logging through `tracing`

pub mod sink;

pub use sink::{CsvSink, TelemetrySink, TracingSink};
