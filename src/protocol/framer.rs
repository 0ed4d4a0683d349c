//! # Packet Framer
//!
//! Extracts fixed-length payloads from an unstructured byte stream.
//!
//! The framer is a two-state machine:
//!
//! - **ReadHeader**: collects the 2-byte little-endian length field. If the
//!   declared length is not [`PACKET_PAYLOAD_LEN`], only the oldest header byte
//!   is dropped and the remaining byte becomes the first byte of the next
//!   candidate header. This realigns on a corrupted or truncated stream one
//!   byte at a time.
//! - **ReadPayload**: collects exactly [`PACKET_PAYLOAD_LEN`] bytes, emits them
//!   and returns to ReadHeader.
//!
//! Malformed input never produces an error and never produces a payload.
//!
//! ## Usage
//!
//! ```
//! use nxt_telemetry::protocol::framer::PacketFramer;
//!
//! let mut framer = PacketFramer::new();
//! let mut stream = vec![0xAA, 0x20, 0x00]; // garbage byte, then header
//! stream.extend_from_slice(&[0u8; 32]);
//!
//! let payloads = framer.feed_slice(&stream);
//! assert_eq!(payloads.len(), 1);
//! assert_eq!(framer.discarded_bytes(), 1);
//! ```

use tracing::trace;

use super::packet::{Payload, PACKET_HEADER_LEN, PACKET_LEN, PACKET_PAYLOAD_LEN};

/// Framer state, derived from the byte cursor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramerState {
    /// Collecting the length header
    ReadHeader,
    /// Header accepted, collecting payload bytes
    ReadPayload,
}

/// Byte-stream packet framer with one-byte resynchronization.
#[derive(Debug, Clone)]
pub struct PacketFramer {
    header: [u8; PACKET_HEADER_LEN],
    payload: Payload,
    /// Bytes of the current packet received so far (header included).
    cursor: usize,
    packets: u64,
    discarded: u64,
}

impl Default for PacketFramer {
    fn default() -> Self {
        Self::new()
    }
}

impl PacketFramer {
    /// Creates a framer waiting for a header.
    pub fn new() -> Self {
        Self {
            header: [0; PACKET_HEADER_LEN],
            payload: [0; PACKET_PAYLOAD_LEN],
            cursor: 0,
            packets: 0,
            discarded: 0,
        }
    }

    /// Feeds one byte, returning a payload when one completes.
    pub fn feed(&mut self, byte: u8) -> Option<Payload> {
        if self.cursor < PACKET_HEADER_LEN {
            self.header[self.cursor] = byte;
            self.cursor += 1;

            if self.cursor == PACKET_HEADER_LEN {
                let declared = u16::from_le_bytes(self.header);
                if usize::from(declared) != PACKET_PAYLOAD_LEN {
                    trace!(
                        "Header declares {} bytes, dropping 0x{:02X} to resync",
                        declared,
                        self.header[0]
                    );
                    self.header[0] = self.header[1];
                    self.cursor = 1;
                    self.discarded += 1;
                }
            }
            None
        } else if self.cursor < PACKET_LEN {
            self.payload[self.cursor - PACKET_HEADER_LEN] = byte;
            self.cursor += 1;

            if self.cursor == PACKET_LEN {
                self.cursor = 0;
                self.header = [0; PACKET_HEADER_LEN];
                self.packets += 1;
                return Some(self.payload);
            }
            None
        } else {
            // Unreachable through the transitions above; restart cleanly.
            self.cursor = 0;
            None
        }
    }

    /// Feeds a batch of bytes, returning every payload completed by it.
    pub fn feed_slice(&mut self, bytes: &[u8]) -> Vec<Payload> {
        bytes.iter().filter_map(|&b| self.feed(b)).collect()
    }

    /// Current state of the machine.
    pub fn state(&self) -> FramerState {
        if self.cursor < PACKET_HEADER_LEN {
            FramerState::ReadHeader
        } else {
            FramerState::ReadPayload
        }
    }

    /// Payloads emitted since construction.
    pub fn packets(&self) -> u64 {
        self.packets
    }

    /// Bytes dropped by header resynchronization since construction.
    pub fn discarded_bytes(&self) -> u64 {
        self.discarded
    }
}
