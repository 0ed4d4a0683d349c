//! # Named Series
//!
//! Maps the display names used by charting front-ends to record and snapshot
//! values.
//!
//! ## Usage
//!
//! ```
//! use nxt_telemetry::series::{RecordField, StateField};
//!
//! let field: RecordField = "Motor Rev B".parse().unwrap();
//! assert_eq!(field, RecordField::MotorRevB);
//! assert_eq!(field.name(), "Motor Rev B");
//!
//! assert_eq!("Postural Sway".parse::<StateField>().unwrap(), StateField::PosturalSway);
//! assert!("Altitude".parse::<StateField>().is_err());
//! ```

use std::fmt;
use std::str::FromStr;

use crate::estimator::{Point, StateSnapshot};
use crate::protocol::record::TelemetryRecord;

/// Error returned when a series name is not recognized
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownSeries(pub String);

impl fmt::Display for UnknownSeries {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown series: {:?}", self.0)
    }
}

impl std::error::Error for UnknownSeries {}

/// Plottable telemetry record fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordField {
    Time,
    Data1,
    Data2,
    Battery,
    MotorRevA,
    MotorRevB,
    MotorRevC,
    AdcS1,
    AdcS2,
    AdcS3,
    AdcS4,
    I2c,
}

impl RecordField {
    /// All fields in record CSV column order.
    pub const ALL: [RecordField; 12] = [
        RecordField::Time,
        RecordField::Data1,
        RecordField::Data2,
        RecordField::Battery,
        RecordField::MotorRevA,
        RecordField::MotorRevB,
        RecordField::MotorRevC,
        RecordField::AdcS1,
        RecordField::AdcS2,
        RecordField::AdcS3,
        RecordField::AdcS4,
        RecordField::I2c,
    ];

    /// Display name of the series.
    pub fn name(self) -> &'static str {
        match self {
            RecordField::Time => "Time",
            RecordField::Data1 => "Data1",
            RecordField::Data2 => "Data2",
            RecordField::Battery => "Battery",
            RecordField::MotorRevA => "Motor Rev A",
            RecordField::MotorRevB => "Motor Rev B",
            RecordField::MotorRevC => "Motor Rev C",
            RecordField::AdcS1 => "ADC S1",
            RecordField::AdcS2 => "ADC S2",
            RecordField::AdcS3 => "ADC S3",
            RecordField::AdcS4 => "ADC S4",
            RecordField::I2c => "I2C",
        }
    }
}

impl fmt::Display for RecordField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for RecordField {
    type Err = UnknownSeries;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RecordField::ALL
            .into_iter()
            .find(|field| field.name() == s)
            .ok_or_else(|| UnknownSeries(s.to_string()))
    }
}

/// Plottable state snapshot fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateField {
    RunTime,
    MoveDistance,
    MoveSpeed,
    Direction,
    TurnAngle,
    PosturalSway,
    TailAngle,
    PositionCoordinate,
}

impl StateField {
    /// All fields in display order.
    pub const ALL: [StateField; 8] = [
        StateField::RunTime,
        StateField::MoveDistance,
        StateField::MoveSpeed,
        StateField::Direction,
        StateField::TurnAngle,
        StateField::PosturalSway,
        StateField::TailAngle,
        StateField::PositionCoordinate,
    ];

    /// Display name of the series.
    pub fn name(self) -> &'static str {
        match self {
            StateField::RunTime => "Run Time",
            StateField::MoveDistance => "Move Distance",
            StateField::MoveSpeed => "Move Speed",
            StateField::Direction => "Direction",
            StateField::TurnAngle => "Turn Angle",
            StateField::PosturalSway => "Postural Sway",
            StateField::TailAngle => "Tail Angle",
            StateField::PositionCoordinate => "Position Coordinate",
        }
    }
}

impl fmt::Display for StateField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for StateField {
    type Err = UnknownSeries;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StateField::ALL
            .into_iter()
            .find(|field| field.name() == s)
            .ok_or_else(|| UnknownSeries(s.to_string()))
    }
}

impl TelemetryRecord {
    /// Value of one series.
    pub fn value(&self, field: RecordField) -> f64 {
        match field {
            RecordField::Time => f64::from(self.rel_tick),
            RecordField::Data1 => f64::from(self.data_left),
            RecordField::Data2 => f64::from(self.data_right),
            RecordField::Battery => f64::from(self.battery),
            RecordField::MotorRevA => f64::from(self.motor_count[0]),
            RecordField::MotorRevB => f64::from(self.motor_count[1]),
            RecordField::MotorRevC => f64::from(self.motor_count[2]),
            RecordField::AdcS1 => f64::from(self.adc[0]),
            RecordField::AdcS2 => f64::from(self.adc[1]),
            RecordField::AdcS3 => f64::from(self.adc[2]),
            RecordField::AdcS4 => f64::from(self.adc[3]),
            RecordField::I2c => f64::from(self.i2c),
        }
    }

    /// Chart point: relative tick on x, series value on y.
    pub fn time_series_point(&self, field: RecordField) -> Point {
        Point::new(f64::from(self.rel_tick), self.value(field))
    }
}

impl StateSnapshot {
    /// Value of one series.
    ///
    /// `PositionCoordinate` has no scalar value and yields 0; use
    /// [`StateSnapshot::time_series_point`] for it.
    pub fn value(&self, field: StateField) -> f64 {
        match field {
            StateField::RunTime => f64::from(self.run_time),
            StateField::MoveDistance => self.distance,
            StateField::MoveSpeed => self.average_speed,
            StateField::Direction => self.direction,
            StateField::TurnAngle => self.turn_angle,
            StateField::PosturalSway => self.posture,
            StateField::TailAngle => self.tail_angle,
            StateField::PositionCoordinate => 0.0,
        }
    }

    /// Chart point: run time on x and series value on y, or the position
    /// itself for `PositionCoordinate`.
    pub fn time_series_point(&self, field: StateField) -> Point {
        match field {
            StateField::PositionCoordinate => self.position,
            other => Point::new(f64::from(self.run_time), self.value(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_field_names_round_trip() {
        for field in RecordField::ALL {
            assert_eq!(field.name().parse::<RecordField>(), Ok(field));
        }
    }

    #[test]
    fn test_state_field_names_round_trip() {
        for field in StateField::ALL {
            assert_eq!(field.to_string().parse::<StateField>(), Ok(field));
        }
    }

    #[test]
    fn test_unknown_name() {
        let err = "Motor Rev D".parse::<RecordField>().unwrap_err();
        assert_eq!(err, UnknownSeries("Motor Rev D".to_string()));
        assert!(err.to_string().contains("Motor Rev D"));
    }

    #[test]
    fn test_record_values() {
        let record = TelemetryRecord {
            rel_tick: 250,
            data_left: -3,
            battery: 8100,
            motor_count: [1, 2, 3],
            adc: [600, 0, 0, -7],
            i2c: 99,
            ..Default::default()
        };

        assert_eq!(record.value(RecordField::Data1), -3.0);
        assert_eq!(record.value(RecordField::Battery), 8100.0);
        assert_eq!(record.value(RecordField::MotorRevC), 3.0);
        assert_eq!(record.value(RecordField::AdcS4), -7.0);
        assert_eq!(record.time_series_point(RecordField::AdcS1), Point::new(250.0, 600.0));
    }

    #[test]
    fn test_state_points() {
        let snapshot = StateSnapshot {
            run_time: 40,
            distance: 12.5,
            posture: -1.25,
            position: Point::new(3.0, 4.0),
            ..StateSnapshot::default()
        };

        assert_eq!(snapshot.time_series_point(StateField::MoveDistance), Point::new(40.0, 12.5));
        assert_eq!(snapshot.time_series_point(StateField::PosturalSway), Point::new(40.0, -1.25));
        assert_eq!(snapshot.time_series_point(StateField::PositionCoordinate), Point::new(3.0, 4.0));
    }
}
