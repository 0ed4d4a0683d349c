//! # Telemetry Sinks
//!
//! A sink receives every decoded record and every state snapshot once, in
//! arrival order. Sinks are composed by the caller; the session itself knows
//! nothing about them.

use std::io::Write;

use tracing::{debug, info};

use crate::error::Result;
use crate::estimator::state::STATE_CSV_HEADER;
use crate::estimator::StateSnapshot;
use crate::protocol::record::{TelemetryRecord, RECORD_CSV_HEADER};

/// Receiver of decoded telemetry units
#[cfg_attr(test, mockall::automock)]
pub trait TelemetrySink {
    /// Called once per decoded record.
    fn on_record(&mut self, record: &TelemetryRecord) -> Result<()>;

    /// Called once per state snapshot, right after its record.
    fn on_snapshot(&mut self, snapshot: &StateSnapshot) -> Result<()>;
}

impl<S: TelemetrySink + ?Sized> TelemetrySink for Box<S> {
    fn on_record(&mut self, record: &TelemetryRecord) -> Result<()> {
        (**self).on_record(record)
    }

    fn on_snapshot(&mut self, snapshot: &StateSnapshot) -> Result<()> {
        (**self).on_snapshot(snapshot)
    }
}

/// Fan-out: every sink sees every unit, in order. Stops at the first error.
impl<S: TelemetrySink> TelemetrySink for Vec<S> {
    fn on_record(&mut self, record: &TelemetryRecord) -> Result<()> {
        self.iter_mut().try_for_each(|sink| sink.on_record(record))
    }

    fn on_snapshot(&mut self, snapshot: &StateSnapshot) -> Result<()> {
        self.iter_mut().try_for_each(|sink| sink.on_snapshot(snapshot))
    }
}

/// Writes records and snapshots as CSV text.
///
/// Each writer gets its header line before its first row. Either writer may
/// be absent.
///
/// # Examples
///
/// ```
/// use nxt_telemetry::estimator::StateSnapshot;
/// use nxt_telemetry::telemetry::{CsvSink, TelemetrySink};
///
/// let mut sink = CsvSink::new(None::<Vec<u8>>, Some(Vec::new()));
/// sink.on_snapshot(&StateSnapshot::default())?;
///
/// let (_, snapshots) = sink.into_inner();
/// let text = String::from_utf8(snapshots.unwrap()).unwrap();
/// assert_eq!(text.lines().count(), 2);
/// # Ok::<(), nxt_telemetry::error::NxtError>(())
/// ```
#[derive(Debug)]
pub struct CsvSink<W: Write> {
    records: Option<W>,
    snapshots: Option<W>,
    records_header_written: bool,
    snapshots_header_written: bool,
}

impl<W: Write> CsvSink<W> {
    /// Creates a sink writing records and/or snapshots.
    pub fn new(records: Option<W>, snapshots: Option<W>) -> Self {
        Self {
            records,
            snapshots,
            records_header_written: false,
            snapshots_header_written: false,
        }
    }

    /// Flushes both writers.
    pub fn flush(&mut self) -> Result<()> {
        if let Some(w) = self.records.as_mut() {
            w.flush()?;
        }
        if let Some(w) = self.snapshots.as_mut() {
            w.flush()?;
        }
        Ok(())
    }

    /// Returns the record and snapshot writers.
    pub fn into_inner(self) -> (Option<W>, Option<W>) {
        (self.records, self.snapshots)
    }
}

impl<W: Write> TelemetrySink for CsvSink<W> {
    fn on_record(&mut self, record: &TelemetryRecord) -> Result<()> {
        if let Some(w) = self.records.as_mut() {
            if !self.records_header_written {
                writeln!(w, "{}", RECORD_CSV_HEADER)?;
                self.records_header_written = true;
            }
            writeln!(w, "{}", record.to_csv_row())?;
        }
        Ok(())
    }

    fn on_snapshot(&mut self, snapshot: &StateSnapshot) -> Result<()> {
        if let Some(w) = self.snapshots.as_mut() {
            if !self.snapshots_header_written {
                writeln!(w, "{}", STATE_CSV_HEADER)?;
                self.snapshots_header_written = true;
            }
            writeln!(w, "{}", snapshot.to_csv_row())?;
        }
        Ok(())
    }
}

/// Logs a status line every `interval` records and each snapshot at debug level.
#[derive(Debug, Clone)]
pub struct TracingSink {
    interval: u64,
    records: u64,
    last: Option<StateSnapshot>,
}

impl TracingSink {
    /// Creates a sink reporting every `interval` records (at least 1).
    pub fn new(interval: u64) -> Self {
        Self {
            interval: interval.max(1),
            records: 0,
            last: None,
        }
    }

    /// Records seen so far.
    pub fn records(&self) -> u64 {
        self.records
    }
}

impl TelemetrySink for TracingSink {
    fn on_record(&mut self, record: &TelemetryRecord) -> Result<()> {
        self.records += 1;
        if self.records % self.interval == 0 {
            match self.last {
                Some(s) => info!(
                    "Received {} records (tick {}, battery {} mV, distance {:.1} mm, direction {:.1} deg)",
                    self.records, record.rel_tick, record.battery, s.distance, s.direction
                ),
                None => info!(
                    "Received {} records (tick {}, battery {} mV)",
                    self.records, record.rel_tick, record.battery
                ),
            }
        }
        Ok(())
    }

    fn on_snapshot(&mut self, snapshot: &StateSnapshot) -> Result<()> {
        debug!(
            "State t={} ms pos=({:.1}, {:.1}) dir={:.1} posture={:.2}",
            snapshot.run_time, snapshot.position.x, snapshot.position.y, snapshot.direction, snapshot.posture
        );
        self.last = Some(*snapshot);
        Ok(())
    }
}
