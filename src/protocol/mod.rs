//! # NXT Log Protocol Module
//!
//! Implementation of the NXT Bluetooth log stream carried over a serial link.
//!
//! This module handles:
//! - Frame synchronization on the 2-byte length header, with byte-wise resync
//! - Telemetry payload decoding (32 bytes, little-endian)
//! - Device tick wraparound correction
//! - Payload encoding (replay and test fixtures)

pub mod packet;
pub mod framer;
pub mod record;
pub mod encoder;
