//! # Session Module
//!
//! One logging session: owns the packet framer, the record decoder, the state
//! estimator and the history of everything decoded so far.
//!
//! A session is single-owner. Bytes from the serial link are fed on one task,
//! in arrival order; [`Session::reset`] replaces every stateful component so
//! the next record sets a new tick baseline and a new gyro calibration.
//!
//! ## Usage
//!
//! ```
//! use nxt_telemetry::estimator::EstimatorParams;
//! use nxt_telemetry::protocol::encoder::encode_packet;
//! use nxt_telemetry::protocol::record::TelemetryRecord;
//! use nxt_telemetry::session::Session;
//!
//! let mut session = Session::new(EstimatorParams::default());
//! let packet = encode_packet(&TelemetryRecord { sys_tick: 1_000, ..Default::default() });
//!
//! let updates = session.feed_bytes(&packet);
//! assert_eq!(updates.len(), 1);
//! assert_eq!(updates[0].record.rel_tick, 0);
//! assert_eq!(session.records().len(), 1);
//! ```

use std::io::BufRead;

use tracing::{debug, info, warn};

use crate::error::{NxtError, Result};
use crate::estimator::state::STATE_TEXT_HEADER;
use crate::estimator::{EstimatorParams, StateEstimator, StateSnapshot};
use crate::protocol::encoder::encode_payload;
use crate::protocol::framer::PacketFramer;
use crate::protocol::record::{RecordDecoder, TelemetryRecord, RECORD_CSV_HEADER, RECORD_TEXT_HEADER};

/// One decoded unit: a record and the estimate it produced.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionUpdate {
    pub record: TelemetryRecord,
    pub snapshot: StateSnapshot,
}

/// Framer, decoder, estimator and history of one logging session.
#[derive(Debug, Clone)]
pub struct Session {
    params: EstimatorParams,
    framer: PacketFramer,
    decoder: RecordDecoder,
    estimator: StateEstimator,
    records: Vec<TelemetryRecord>,
    snapshots: Vec<StateSnapshot>,
    bytes_received: u64,
}

impl Session {
    /// Creates an empty session.
    pub fn new(params: EstimatorParams) -> Self {
        let estimator = StateEstimator::new(params);
        let initial = estimator.snapshot();
        Self {
            params,
            framer: PacketFramer::new(),
            decoder: RecordDecoder::new(),
            estimator,
            records: Vec::new(),
            snapshots: vec![initial],
            bytes_received: 0,
        }
    }

    /// Feed one byte from the link
    ///
    /// # Returns
    ///
    /// * `Option<SessionUpdate>` - The decoded unit if this byte completed a packet
    pub fn feed(&mut self, byte: u8) -> Option<SessionUpdate> {
        self.bytes_received += 1;
        let payload = self.framer.feed(byte)?;
        match self.ingest_payload(&payload) {
            Ok(update) => Some(update),
            Err(e) => {
                // The framer only emits full payloads, so this is a logic error.
                warn!("Dropping framed payload: {}", e);
                None
            }
        }
    }

    /// Feed a batch of bytes, returning every unit decoded from it in order.
    pub fn feed_bytes(&mut self, bytes: &[u8]) -> Vec<SessionUpdate> {
        bytes.iter().filter_map(|&b| self.feed(b)).collect()
    }

    /// Decode an already framed payload and advance the estimate
    ///
    /// # Errors
    ///
    /// Returns [`NxtError::InvalidPacketLength`] if `payload` is not 32 bytes.
    pub fn ingest_payload(&mut self, payload: &[u8]) -> Result<SessionUpdate> {
        let record = self.decoder.decode(payload)?;
        Ok(self.ingest_record(record))
    }

    /// Advance the estimate with a decoded record and append both to the history.
    pub fn ingest_record(&mut self, record: TelemetryRecord) -> SessionUpdate {
        let snapshot = self.estimator.update(&record);
        debug!(
            "Record tick {} -> run_time {} ms, distance {:.2} mm",
            record.rel_tick, snapshot.run_time, snapshot.distance
        );

        self.records.push(record);
        self.snapshots.push(snapshot);

        SessionUpdate { record, snapshot }
    }

    /// Replay a record CSV stream through the decoder and estimator
    ///
    /// The first line is a header and is skipped, as are blank lines. The time
    /// column is fed as the device tick, so the first row becomes the tick
    /// baseline of this session.
    ///
    /// # Arguments
    ///
    /// * `reader` - Record CSV source
    ///
    /// # Returns
    ///
    /// * `Result<usize>` - Number of rows replayed
    ///
    /// # Errors
    ///
    /// Returns [`NxtError::CsvParse`] on the first malformed row, or
    /// [`NxtError::Io`] if reading fails. Rows before the failing one stay in
    /// the history.
    pub fn replay_csv<R: BufRead>(&mut self, reader: R) -> Result<usize> {
        let mut replayed = 0;

        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            let line_no = idx + 1;

            if idx == 0 {
                if line.trim() != RECORD_CSV_HEADER {
                    warn!("Unexpected record CSV header: {:?}", line.trim());
                }
                continue;
            }
            if line.trim().is_empty() {
                continue;
            }

            let parsed = TelemetryRecord::from_csv_row(&line, line_no)?;
            self.ingest_payload(&encode_payload(&parsed))?;
            replayed += 1;
        }

        info!("Replayed {} records", replayed);
        Ok(replayed)
    }

    /// Drop all state and history and start a fresh session.
    pub fn reset(&mut self) {
        info!(
            "Resetting session after {} records ({} bytes discarded)",
            self.records.len(),
            self.framer.discarded_bytes()
        );
        *self = Self::new(self.params);
    }

    /// Records in arrival order.
    pub fn records(&self) -> &[TelemetryRecord] {
        &self.records
    }

    /// Snapshots in arrival order, starting with the initial snapshot.
    pub fn snapshots(&self) -> &[StateSnapshot] {
        &self.snapshots
    }

    /// Latest record, if any.
    pub fn current_record(&self) -> Option<&TelemetryRecord> {
        self.records.last()
    }

    /// Latest estimate.
    pub fn current_snapshot(&self) -> StateSnapshot {
        self.estimator.snapshot()
    }

    /// Estimator, for inspecting calibration progress.
    pub fn estimator(&self) -> &StateEstimator {
        &self.estimator
    }

    /// Packets framed so far.
    pub fn packets(&self) -> u64 {
        self.framer.packets()
    }

    /// Bytes fed from the link so far.
    pub fn bytes_received(&self) -> u64 {
        self.bytes_received
    }

    /// Bytes dropped while resynchronizing.
    pub fn discarded_bytes(&self) -> u64 {
        self.framer.discarded_bytes()
    }

    /// Record history as display text: header line plus one fixed-width line per record.
    pub fn record_text(&self) -> String {
        text_block(RECORD_TEXT_HEADER, self.records.iter())
    }

    /// Estimate history as display text: header line plus one fixed-width
    /// line per update (the initial snapshot is not listed).
    pub fn state_text(&self) -> String {
        text_block(STATE_TEXT_HEADER, self.snapshots.iter().skip(1))
    }
}

fn text_block<T: std::fmt::Display>(header: &str, rows: impl Iterator<Item = T>) -> String {
    let mut text = String::from(header);
    text.push('\n');
    for row in rows {
        text.push_str(&row.to_string());
        text.push('\n');
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::encoder::encode_packet;
    use crate::protocol::packet::PACKET_PAYLOAD_LEN;
    use std::io::Cursor;

    fn record(sys_tick: u32, right: i32, left: i32) -> TelemetryRecord {
        TelemetryRecord {
            sys_tick,
            motor_count: [0, right, left],
            adc: [600, 0, 0, 0],
            ..Default::default()
        }
    }

    #[test]
    fn test_new_session_holds_initial_snapshot() {
        let session = Session::new(EstimatorParams::default());
        assert!(session.records().is_empty());
        assert_eq!(session.snapshots().len(), 1);
        assert!(session.current_record().is_none());
    }

    #[test]
    fn test_feed_bytes_decodes_stream_with_garbage() {
        let mut session = Session::new(EstimatorParams::default());
        let mut stream = vec![0x13, 0x37];
        stream.extend(encode_packet(&record(10_000, 0, 0)));
        stream.push(0x99);
        stream.extend(encode_packet(&record(10_500, 360, 360)));

        let updates = session.feed_bytes(&stream);
        assert_eq!(updates.len(), 2);
        assert_eq!(updates[0].record.rel_tick, 0);
        assert_eq!(updates[1].record.rel_tick, 500);
        assert_eq!(updates[1].snapshot.run_time, 500);
        assert!(updates[1].snapshot.distance > 0.0);

        assert_eq!(session.records().len(), 2);
        assert_eq!(session.snapshots().len(), 3);
        assert_eq!(session.packets(), 2);
        assert_eq!(session.discarded_bytes(), 3);
        assert_eq!(session.bytes_received(), stream.len() as u64);
        assert_eq!(session.current_snapshot(), updates[1].snapshot);
    }

    #[test]
    fn test_ingest_payload_rejects_wrong_length() {
        let mut session = Session::new(EstimatorParams::default());
        let result = session.ingest_payload(&[0u8; PACKET_PAYLOAD_LEN - 1]);
        assert!(matches!(result, Err(NxtError::InvalidPacketLength { .. })));
        assert!(session.records().is_empty());
    }

    #[test]
    fn test_reset_starts_new_baseline() {
        let mut session = Session::new(EstimatorParams::default());
        session.feed_bytes(&encode_packet(&record(1_000, 0, 0)));
        session.feed_bytes(&encode_packet(&record(2_000, 0, 0)));
        // Half a packet left in the framer
        session.feed_bytes(&encode_packet(&record(3_000, 0, 0))[..10]);

        session.reset();
        assert!(session.records().is_empty());
        assert_eq!(session.snapshots().len(), 1);
        assert_eq!(session.packets(), 0);
        assert_eq!(session.bytes_received(), 0);

        let updates = session.feed_bytes(&encode_packet(&record(50_000, 0, 0)));
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].record.rel_tick, 0);
    }

    #[test]
    fn test_replay_csv() {
        let csv = format!(
            "{}\n100,0,0,7000,0,0,0,600,0,0,0,0\n\n600,0,0,7000,0,360,360,600,0,0,0,0\n",
            RECORD_CSV_HEADER
        );
        let mut session = Session::new(EstimatorParams::default());
        let replayed = session.replay_csv(Cursor::new(csv)).unwrap();

        assert_eq!(replayed, 2);
        assert_eq!(session.records()[0].rel_tick, 0);
        assert_eq!(session.records()[1].rel_tick, 500);
        assert_eq!(session.records()[1].sys_tick, 600);
        assert_eq!(session.current_snapshot().run_time, 500);
    }

    #[test]
    fn test_replay_csv_reports_bad_line() {
        let csv = format!("{}\n0,0,0,0,0,0,0,0,0,0,0,0\n0,0,0\n", RECORD_CSV_HEADER);
        let mut session = Session::new(EstimatorParams::default());

        match session.replay_csv(Cursor::new(csv)) {
            Err(NxtError::CsvParse { line, .. }) => assert_eq!(line, 3),
            other => panic!("Expected CsvParse, got: {:?}", other),
        }
        assert_eq!(session.records().len(), 1);
    }

    #[test]
    fn test_record_and_state_text() {
        let mut session = Session::new(EstimatorParams::default());
        session.feed_bytes(&encode_packet(&record(0, 0, 0)));
        session.feed_bytes(&encode_packet(&record(4, 0, 0)));

        let records = session.record_text();
        let lines: Vec<&str> = records.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], RECORD_TEXT_HEADER);

        let states = session.state_text();
        let lines: Vec<&str> = states.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], STATE_TEXT_HEADER);
        assert!(lines[2].trim_start().starts_with("4,"));
    }
}
