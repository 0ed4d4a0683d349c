//! # Telemetry Record Decoder
//!
//! Interprets a validated payload as typed fields and corrects the device
//! tick for 32-bit wraparound.
//!
//! ## Payload Layout (little-endian)
//!
//! | Offset | Type | Field |
//! |--------|------|-------|
//! | 0  | u32 | sys_tick |
//! | 4  | i8  | data_left |
//! | 5  | i8  | data_right |
//! | 6  | u16 | battery |
//! | 8  | i32 | motor_count[0] (tail) |
//! | 12 | i32 | motor_count[1] (right wheel) |
//! | 16 | i32 | motor_count[2] (left wheel) |
//! | 20 | i16 | adc[0] (gyro) |
//! | 22 | i16 | adc[1] |
//! | 24 | i16 | adc[2] |
//! | 26 | i16 | adc[3] |
//! | 28 | i32 | i2c |
//!
//! ## Tick Correction
//!
//! The first record seen by a [`RecordDecoder`] fixes the tick baseline.
//! `rel_tick = sys_tick - baseline`, or `sys_tick + (u32::MAX - baseline)` once
//! the device clock has wrapped. Only one wrap between samples is corrected.

use std::fmt;

use tracing::debug;

use super::packet::*;
use crate::error::{NxtError, Result};

/// Record CSV header (field order of [`TelemetryRecord::to_csv_row`])
pub const RECORD_CSV_HEADER: &str =
    "Time,Data1,Data2,Battery,Motor Rev A,Motor Rev B,Motor Rev C,ADC S1,ADC S2,ADC S3,ADC S4,I2C";

/// Header line matching the column widths of the record `Display` form
pub const RECORD_TEXT_HEADER: &str =
    "  Time, Data1, Data2, Battery, MotorA, MotorB, MotorC, ADC1, ADC2, ADC3, ADC4, I2C";

/// Number of columns in a record CSV row
pub const RECORD_CSV_COLUMNS: usize = 12;

/// One decoded telemetry sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TelemetryRecord {
    /// Raw device clock in ms (wraps at 2^32)
    pub sys_tick: u32,

    /// User data byte (left)
    pub data_left: i8,

    /// User data byte (right)
    pub data_right: i8,

    /// Battery level in mV
    pub battery: u16,

    /// Motor encoder counts in degrees: tail, right wheel, left wheel
    pub motor_count: [i32; MOTOR_CHANNELS],

    /// A/D sensor values, channel 0 is the gyro
    pub adc: [i16; ADC_CHANNELS],

    /// I2C sensor value
    pub i2c: i32,

    /// Device clock relative to the first record of the session
    pub rel_tick: u32,
}

impl TelemetryRecord {
    /// Tail motor encoder count
    pub fn tail_count(&self) -> i32 {
        self.motor_count[MOTOR_TAIL]
    }

    /// Right wheel encoder count
    pub fn right_count(&self) -> i32 {
        self.motor_count[MOTOR_RIGHT]
    }

    /// Left wheel encoder count
    pub fn left_count(&self) -> i32 {
        self.motor_count[MOTOR_LEFT]
    }

    /// Raw gyro sensor reading
    pub fn gyro(&self) -> i16 {
        self.adc[ADC_GYRO]
    }

    /// CSV row in [`RECORD_CSV_HEADER`] order, without line terminator.
    ///
    /// The time column carries `rel_tick`.
    pub fn to_csv_row(&self) -> String {
        format!(
            "{},{},{},{},{},{},{},{},{},{},{},{}",
            self.rel_tick,
            self.data_left,
            self.data_right,
            self.battery,
            self.motor_count[0],
            self.motor_count[1],
            self.motor_count[2],
            self.adc[0],
            self.adc[1],
            self.adc[2],
            self.adc[3],
            self.i2c
        )
    }

    /// Parses one record CSV row.
    ///
    /// The time column is taken as the raw `sys_tick`; `rel_tick` is left at
    /// zero until the payload goes through a [`RecordDecoder`].
    ///
    /// # Errors
    ///
    /// Returns [`NxtError::CsvParse`] on a wrong column count or a value that
    /// does not fit its field type.
    pub fn from_csv_row(row: &str, line: usize) -> Result<Self> {
        let columns: Vec<&str> = row.split(',').map(str::trim).collect();
        if columns.len() != RECORD_CSV_COLUMNS {
            return Err(NxtError::CsvParse {
                line,
                reason: format!("expected {} columns, got {}", RECORD_CSV_COLUMNS, columns.len()),
            });
        }

        fn field<T: std::str::FromStr>(columns: &[&str], idx: usize, line: usize) -> Result<T>
        where
            T::Err: fmt::Display,
        {
            columns[idx].parse::<T>().map_err(|e| NxtError::CsvParse {
                line,
                reason: format!("column {} ({:?}): {}", idx + 1, columns[idx], e),
            })
        }

        Ok(Self {
            sys_tick: field(&columns, 0, line)?,
            data_left: field(&columns, 1, line)?,
            data_right: field(&columns, 2, line)?,
            battery: field(&columns, 3, line)?,
            motor_count: [
                field(&columns, 4, line)?,
                field(&columns, 5, line)?,
                field(&columns, 6, line)?,
            ],
            adc: [
                field(&columns, 7, line)?,
                field(&columns, 8, line)?,
                field(&columns, 9, line)?,
                field(&columns, 10, line)?,
            ],
            i2c: field(&columns, 11, line)?,
            rel_tick: 0,
        })
    }
}

impl fmt::Display for TelemetryRecord {
    /// Fixed-width text line aligned with [`RECORD_TEXT_HEADER`].
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:>6},{:>6},{:>6},{:>8},{:>7},{:>7},{:>7},{:>5},{:>5},{:>5},{:>5},{:>4}",
            self.rel_tick,
            self.data_left,
            self.data_right,
            self.battery,
            self.motor_count[0],
            self.motor_count[1],
            self.motor_count[2],
            self.adc[0],
            self.adc[1],
            self.adc[2],
            self.adc[3],
            self.i2c
        )
    }
}

/// Payload decoder owning the tick baseline of one session.
#[derive(Debug, Clone, Default)]
pub struct RecordDecoder {
    tick_offset: Option<u32>,
}

impl RecordDecoder {
    /// Creates a decoder with no tick baseline yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Tick baseline captured from the first decoded record, if any.
    pub fn tick_offset(&self) -> Option<u32> {
        self.tick_offset
    }

    /// Decode one payload into a [`TelemetryRecord`]
    ///
    /// # Arguments
    ///
    /// * `payload` - Payload bytes, without the length header
    ///
    /// # Errors
    ///
    /// Returns [`NxtError::InvalidPacketLength`] if `payload` is not exactly
    /// [`PACKET_PAYLOAD_LEN`] bytes.
    pub fn decode(&mut self, payload: &[u8]) -> Result<TelemetryRecord> {
        if payload.len() != PACKET_PAYLOAD_LEN {
            return Err(NxtError::InvalidPacketLength {
                expected: PACKET_PAYLOAD_LEN,
                actual: payload.len(),
            });
        }

        let u32_at = |at: usize| u32::from_le_bytes([payload[at], payload[at + 1], payload[at + 2], payload[at + 3]]);
        let i32_at = |at: usize| i32::from_le_bytes([payload[at], payload[at + 1], payload[at + 2], payload[at + 3]]);
        let i16_at = |at: usize| i16::from_le_bytes([payload[at], payload[at + 1]]);

        let sys_tick = u32_at(OFFSET_SYS_TICK);
        let rel_tick = self.relative_tick(sys_tick);

        Ok(TelemetryRecord {
            sys_tick,
            data_left: payload[OFFSET_DATA_LEFT] as i8,
            data_right: payload[OFFSET_DATA_RIGHT] as i8,
            battery: u16::from_le_bytes([payload[OFFSET_BATTERY], payload[OFFSET_BATTERY + 1]]),
            motor_count: [
                i32_at(OFFSET_MOTOR_COUNT),
                i32_at(OFFSET_MOTOR_COUNT + 4),
                i32_at(OFFSET_MOTOR_COUNT + 8),
            ],
            adc: [
                i16_at(OFFSET_ADC),
                i16_at(OFFSET_ADC + 2),
                i16_at(OFFSET_ADC + 4),
                i16_at(OFFSET_ADC + 6),
            ],
            i2c: i32_at(OFFSET_I2C),
            rel_tick,
        })
    }

    fn relative_tick(&mut self, sys_tick: u32) -> u32 {
        let offset = *self.tick_offset.get_or_insert_with(|| {
            debug!("Tick baseline set to {}", sys_tick);
            sys_tick
        });

        if sys_tick >= offset {
            sys_tick - offset
        } else {
            // Device clock wrapped past u32::MAX since the baseline.
            sys_tick + (u32::MAX - offset)
        }
    }
}
