//! # Serial Communication Module
//!
//! Handles the serial link to the NXT brick (Bluetooth SPP or USB adapter).
//!
//! This module handles:
//! - Opening the serial port at 57,600 baud, 8N1
//! - Async reads through the [`SerialPortIO`] seam
//! - Pumping received bytes through a [`Session`] into a [`TelemetrySink`]

pub mod port_trait;

pub use port_trait::{SerialPortIO, TokioSerialPort};

use crate::error::{NxtError, Result};
use crate::session::Session;
use crate::telemetry::TelemetrySink;
use async_trait::async_trait;
use std::io;
use tokio_serial::SerialPortBuilderExt;
use tracing::{debug, info, trace, warn};

/// Default NXT link baud rate
pub const NXT_BAUD_RATE: u32 = 57_600;

/// Consecutive empty reads after which the link is treated as closed
pub const MAX_EMPTY_READS: u32 = 20;

/// Pause between reads while the port reports end of stream
pub const EMPTY_READ_BACKOFF_MS: u64 = 50;

/// Default device paths to try (in order of preference)
pub const DEFAULT_DEVICE_PATHS: &[&str] = &[
    "/dev/rfcomm0", // Bluetooth SPP binding
    "/dev/ttyUSB0", // USB-to-serial adapters
];

/// NXT Serial Port Handler
///
/// Read side of the link to the brick. Implements [`SerialPortIO`] so it can be
/// handed straight to [`pump_once`].
pub struct NxtSerial {
    port: TokioSerialPort,
    device_path: String,
}

impl std::fmt::Debug for NxtSerial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NxtSerial")
            .field("device_path", &self.device_path)
            .finish_non_exhaustive()
    }
}

impl NxtSerial {
    /// Open the serial port at `path`
    ///
    /// # Arguments
    ///
    /// * `path` - Device path (e.g., "/dev/rfcomm0")
    /// * `baud_rate` - Line speed, normally [`NXT_BAUD_RATE`]
    ///
    /// # Errors
    ///
    /// Returns [`NxtError::Serial`] if the port cannot be opened
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use nxt_telemetry::serial::{NxtSerial, NXT_BAUD_RATE};
    ///
    /// #[tokio::main]
    /// async fn main() -> anyhow::Result<()> {
    ///     let serial = NxtSerial::open("/dev/rfcomm0", NXT_BAUD_RATE)?;
    ///     println!("Connected to: {}", serial.device_path());
    ///     Ok(())
    /// }
    /// ```
    pub fn open(path: &str, baud_rate: u32) -> Result<Self> {
        let port = Self::open_port(path, baud_rate)?;
        info!("Opened NXT link at {} ({} baud)", path, baud_rate);
        Ok(Self {
            port: TokioSerialPort::new(port),
            device_path: path.to_string(),
        })
    }

    /// Open the first device path that works
    ///
    /// # Arguments
    ///
    /// * `paths` - Device paths to try (e.g., &["/dev/rfcomm0"])
    /// * `baud_rate` - Line speed
    ///
    /// # Errors
    ///
    /// Returns [`NxtError::SerialPortNotFound`] listing every path tried
    pub fn open_with_paths(paths: &[&str], baud_rate: u32) -> Result<Self> {
        for path in paths {
            debug!("Trying to open serial port: {}", path);

            match Self::open(path, baud_rate) {
                Ok(serial) => return Ok(serial),
                Err(e) => {
                    warn!("Failed to open {}: {}", path, e);
                    continue;
                }
            }
        }

        Err(NxtError::SerialPortNotFound(paths.join(", ")))
    }

    /// Open a specific serial port with 8N1 settings and no flow control
    fn open_port(path: &str, baud_rate: u32) -> Result<tokio_serial::SerialStream> {
        let port = tokio_serial::new(path, baud_rate)
            .data_bits(tokio_serial::DataBits::Eight)
            .parity(tokio_serial::Parity::None)
            .stop_bits(tokio_serial::StopBits::One)
            .flow_control(tokio_serial::FlowControl::None)
            .open_native_async()
            .map_err(|e| NxtError::Serial(format!("Failed to open {}: {}", path, e)))?;

        Ok(port)
    }

    /// Get the device path of the opened serial port
    pub fn device_path(&self) -> &str {
        &self.device_path
    }
}

#[async_trait]
impl SerialPortIO for NxtSerial {
    async fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.port.read(buf).await
    }
}

/// Read one chunk from `port` and push it through `session` into `sink`
///
/// Each decoded unit is handed to the sink as a record followed by its
/// snapshot.
///
/// # Arguments
///
/// * `port` - Byte source
/// * `session` - Session receiving the bytes
/// * `sink` - Receiver of decoded units
/// * `buf` - Scratch buffer; its length bounds the chunk size
///
/// # Returns
///
/// * `Result<usize>` - Number of units decoded from this chunk. `Ok(0)` is
///   also returned at end of stream; [`EndOfStream`] tells the two apart.
///
/// # Errors
///
/// Returns [`NxtError::Serial`] if the read fails, or whatever the sink returns.
pub async fn pump_once<P, S>(port: &mut P, session: &mut Session, sink: &mut S, buf: &mut [u8]) -> Result<usize>
where
    P: SerialPortIO + ?Sized,
    S: TelemetrySink + ?Sized,
{
    let n = port
        .read(buf)
        .await
        .map_err(|e| NxtError::Serial(format!("Failed to read from port: {}", e)))?;

    if n == 0 {
        return Ok(0);
    }
    trace!("Read {} bytes", n);

    let updates = session.feed_bytes(&buf[..n]);
    for update in &updates {
        sink.on_record(&update.record)?;
        sink.on_snapshot(&update.snapshot)?;
    }

    Ok(updates.len())
}

/// Detects a closed link from the session's received-byte counter
///
/// [`pump_once`] returns `Ok(0)` both at end of stream and for a chunk that
/// completed no packet. A read that leaves [`Session::bytes_received`]
/// unchanged delivered no bytes at all.
#[derive(Debug, Clone)]
pub struct EndOfStream {
    last_received: u64,
    empty_reads: u32,
    limit: u32,
}

impl EndOfStream {
    /// Creates a tracker that gives up after `limit` consecutive empty reads (at least 1).
    pub fn new(limit: u32) -> Self {
        Self {
            last_received: 0,
            empty_reads: 0,
            limit: limit.max(1),
        }
    }

    /// Record one completed read
    ///
    /// # Arguments
    ///
    /// * `bytes_received` - [`Session::bytes_received`] after the read
    ///
    /// # Returns
    ///
    /// * `bool` - `true` once `limit` reads in a row delivered nothing
    pub fn observe(&mut self, bytes_received: u64) -> bool {
        if bytes_received == self.last_received {
            self.empty_reads += 1;
        } else {
            self.last_received = bytes_received;
            self.empty_reads = 0;
        }
        self.empty_reads >= self.limit
    }

    /// Consecutive empty reads so far.
    pub fn empty_reads(&self) -> u32 {
        self.empty_reads
    }
}
