//! # State Estimator
//!
//! Turns successive [`TelemetryRecord`]s into [`StateSnapshot`]s.
//!
//! Each update runs these stages in order; later stages read the outputs of
//! earlier ones from the same update:
//!
//! 1. **Time**: run time since the first record, and time since the previous one
//! 2. **Distance**: wheel rotation since the first record -> travel
//!    `2πR · angle / 360`, distance is the mean of both wheels
//! 3. **Speed**: distance / run time in mm/s (0 while no time has elapsed)
//! 4. **Direction**: `start + (R / axle) · (angle_right - angle_left)`, in `[0, 360)`
//! 5. **Position**: integrate the step travel along the mid-step heading
//!    `turn_angle + step_turn / 2`
//! 6. **Tail angle**: tail encoder, normalized and unbounded variants
//! 7. **Posture**: gyro integration, see [`PostureFilter`]
//!
//! ## Usage
//!
//! ```
//! use nxt_telemetry::estimator::{EstimatorParams, StateEstimator};
//! use nxt_telemetry::protocol::record::TelemetryRecord;
//!
//! let mut estimator = StateEstimator::new(EstimatorParams::default());
//!
//! let start = TelemetryRecord::default();
//! let later = TelemetryRecord { rel_tick: 1000, motor_count: [0, 180, 180], ..Default::default() };
//!
//! estimator.update(&start);
//! let snapshot = estimator.update(&later);
//!
//! assert_eq!(snapshot.run_time, 1000);
//! assert!((snapshot.distance - 131.946).abs() < 1e-3);
//! ```

use std::f64::consts::PI;
use std::fmt;

use super::motor::MotorPair;
use super::normalize_degrees;
use super::posture::{PostureFilter, PostureParams};
use crate::protocol::record::TelemetryRecord;
use crate::ring_buffer::RingBuffer;

/// Default wheel radius in mm
pub const DEFAULT_WHEEL_RADIUS_MM: f64 = 42.0;

/// Default distance between the drive wheels in mm
pub const DEFAULT_AXLE_LENGTH_MM: f64 = 161.0;

/// Snapshot CSV header (field order of [`StateSnapshot::to_csv_row`])
pub const STATE_CSV_HEADER: &str =
    "RunTime,MoveDist,MoveSpd,Direction,TurnAngle,Posture,TailAngle,Position.X,Position.Y";

/// Header line matching the column widths of the snapshot `Display` form
pub const STATE_TEXT_HEADER: &str =
    "  RunTime, MoveDist, MoveSpd, Direction, TurnAngle, Posture, TailAngle, Position.X, Position.Y";

/// Planar point in mm
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Geometry, start pose and posture tuning of the estimator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EstimatorParams {
    /// Drive wheel radius in mm
    pub wheel_radius_mm: f64,
    /// Distance between the drive wheels in mm
    pub axle_length_mm: f64,
    /// Position at the first record, in mm
    pub start_position: Point,
    /// Heading at the first record, in degrees
    pub start_direction: f64,
    /// Posture filter tuning
    pub posture: PostureParams,
}

impl Default for EstimatorParams {
    fn default() -> Self {
        Self {
            wheel_radius_mm: DEFAULT_WHEEL_RADIUS_MM,
            axle_length_mm: DEFAULT_AXLE_LENGTH_MM,
            start_position: Point::default(),
            start_direction: 0.0,
            posture: PostureParams::default(),
        }
    }
}

/// One immutable state estimate.
///
/// Produced by value on every [`StateEstimator::update`]; it shares nothing
/// with the estimator.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StateSnapshot {
    /// Time since the first record in ms
    pub run_time: u32,
    /// Time since the previous record in ms
    pub moment_run_time: u32,
    /// Distance travelled since the first record in mm
    pub distance: f64,
    /// Distance travelled since the previous record in mm
    pub moment_distance: f64,
    /// Mean speed since the first record in mm/s
    pub average_speed: f64,
    /// Mean speed since the previous record in mm/s
    pub moment_average_speed: f64,
    /// Heading in degrees, `[0, 360)`
    pub direction: f64,
    /// Accumulated turn in degrees, unbounded
    pub turn_angle: f64,
    /// Position in mm
    pub position: Point,
    /// Tail motor angle in degrees, `[0, 360)`
    pub tail_angle: f64,
    /// Tail rotation since the first record in degrees, unbounded
    pub tail_turn_angle: f64,
    /// Tail rotation since the previous record in degrees
    pub moment_tail_turn_angle: f64,
    /// Body tilt estimate in degrees
    pub posture: f64,
}

impl StateSnapshot {
    /// Snapshot before any record: at rest at the start pose.
    pub fn initial(params: &EstimatorParams) -> Self {
        Self {
            direction: normalize_degrees(params.start_direction),
            position: params.start_position,
            ..Self::default()
        }
    }

    /// CSV row in [`STATE_CSV_HEADER`] order, two decimals for real values.
    pub fn to_csv_row(&self) -> String {
        format!(
            "{},{:.2},{:.2},{:.2},{:.2},{:.2},{:.2},{:.2},{:.2}",
            self.run_time,
            self.distance,
            self.average_speed,
            self.direction,
            self.turn_angle,
            self.posture,
            self.tail_angle,
            self.position.x,
            self.position.y
        )
    }
}

impl fmt::Display for StateSnapshot {
    /// Fixed-width text line aligned with [`STATE_TEXT_HEADER`].
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:>9},{:>9.2},{:>8.2},{:>10.2},{:>10.2},{:>8.2},{:>10.2},{:>11.2},{:>11.2}",
            self.run_time,
            self.distance,
            self.average_speed,
            self.direction,
            self.turn_angle,
            self.posture,
            self.tail_angle,
            self.position.x,
            self.position.y
        )
    }
}

/// Dead-reckoning and posture estimator for one logging session.
#[derive(Debug, Clone)]
pub struct StateEstimator {
    params: EstimatorParams,

    start_time: u32,
    run_time_log: RingBuffer<u32>,

    encoder_start: MotorPair<f64>,
    rotation_log: RingBuffer<MotorPair<f64>>,

    tail_start: f64,
    tail_log: RingBuffer<f64>,

    position: Point,
    turn_angle: f64,

    posture: PostureFilter,

    current: StateSnapshot,
}

impl StateEstimator {
    /// Creates an estimator at rest at the configured start pose.
    pub fn new(params: EstimatorParams) -> Self {
        Self {
            params,
            start_time: 0,
            run_time_log: RingBuffer::new(2),
            encoder_start: MotorPair::default(),
            rotation_log: RingBuffer::new(2),
            tail_start: 0.0,
            tail_log: RingBuffer::new(2),
            position: params.start_position,
            turn_angle: 0.0,
            posture: PostureFilter::new(params.posture),
            current: StateSnapshot::initial(&params),
        }
    }

    /// Parameters in use.
    pub fn params(&self) -> &EstimatorParams {
        &self.params
    }

    /// Latest snapshot, or the initial one before any update.
    pub fn snapshot(&self) -> StateSnapshot {
        self.current
    }

    /// Posture filter, for inspecting calibration progress.
    pub fn posture_filter(&self) -> &PostureFilter {
        &self.posture
    }

    /// Advance the estimate by one record
    ///
    /// # Arguments
    ///
    /// * `record` - Next decoded record, in arrival order
    ///
    /// # Returns
    ///
    /// * `StateSnapshot` - Copy of the new estimate
    pub fn update(&mut self, record: &TelemetryRecord) -> StateSnapshot {
        let mut next = StateSnapshot::initial(&self.params);

        self.update_time(record, &mut next);
        let step_travel = self.update_distance(record, &mut next);
        Self::update_speed(&mut next);
        self.update_direction(&mut next);
        self.update_position(step_travel, &mut next);
        self.update_tail(record, &mut next);
        next.posture = self.posture.update(f64::from(record.gyro()), next.moment_run_time);

        self.current = next;
        next
    }

    fn update_time(&mut self, record: &TelemetryRecord, next: &mut StateSnapshot) {
        let (run_time, moment) = match self.run_time_log.get(0) {
            None => {
                self.start_time = record.rel_tick;
                (0, 0)
            }
            Some(&previous) => {
                let run_time = record.rel_tick.wrapping_sub(self.start_time);
                (run_time, run_time.wrapping_sub(previous))
            }
        };

        self.run_time_log.append(run_time);
        next.run_time = run_time;
        next.moment_run_time = moment;
    }

    /// Returns the travel of each wheel since the previous record.
    fn update_distance(&mut self, record: &TelemetryRecord, next: &mut StateSnapshot) -> MotorPair<f64> {
        let counts = MotorPair::new(f64::from(record.right_count()), f64::from(record.left_count()));

        let (angle, step_travel) = match self.rotation_log.get(0).copied() {
            None => {
                self.encoder_start = counts;
                (MotorPair::default(), MotorPair::default())
            }
            Some(previous) => {
                let angle = counts.zip_with(self.encoder_start, |c, s| c - s);
                let travel = angle.map(|a| self.travel(a));
                next.distance = (travel.right + travel.left) / 2.0;

                let step_travel = angle.zip_with(previous, |a, p| a - p).map(|a| self.travel(a));
                next.moment_distance = (step_travel.right + step_travel.left) / 2.0;

                (angle, step_travel)
            }
        };

        self.rotation_log.append(angle);
        step_travel
    }

    fn update_speed(next: &mut StateSnapshot) {
        next.average_speed = if next.run_time == 0 {
            0.0
        } else {
            next.distance / f64::from(next.run_time) * 1000.0
        };

        next.moment_average_speed = if next.moment_run_time == 0 {
            0.0
        } else {
            next.moment_distance / f64::from(next.moment_run_time) * 1000.0
        };
    }

    fn update_direction(&self, next: &mut StateSnapshot) {
        let angle = self.rotation_log.get(0).copied().unwrap_or_default();
        let ratio = self.params.wheel_radius_mm / self.params.axle_length_mm;
        next.direction = normalize_degrees(self.params.start_direction + ratio * (angle.right - angle.left));
    }

    fn update_position(&mut self, step_travel: MotorPair<f64>, next: &mut StateSnapshot) {
        let step_turn = ((step_travel.right - step_travel.left) / self.params.axle_length_mm).to_degrees();
        let heading = (self.turn_angle + step_turn / 2.0).to_radians();

        self.position.x += next.moment_distance * heading.cos();
        self.position.y += next.moment_distance * heading.sin();
        self.turn_angle += step_turn;

        next.position = self.position;
        next.turn_angle = self.turn_angle;
    }

    fn update_tail(&mut self, record: &TelemetryRecord, next: &mut StateSnapshot) {
        let count = f64::from(record.tail_count());

        match self.tail_log.get(0) {
            None => self.tail_start = count,
            Some(&previous) => {
                next.moment_tail_turn_angle = count - previous;
                next.tail_turn_angle = count - self.tail_start;
            }
        }

        self.tail_log.append(count);
        next.tail_angle = normalize_degrees(count);
    }

    /// Linear travel in mm for a wheel rotation in degrees.
    fn travel(&self, angle_deg: f64) -> f64 {
        2.0 * PI * self.params.wheel_radius_mm * (angle_deg / 360.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::estimator::posture::{PostureState, StationaryReset};

    const EPS: f64 = 1e-9;

    fn record(rel_tick: u32, tail: i32, right: i32, left: i32, gyro: i16) -> TelemetryRecord {
        TelemetryRecord {
            rel_tick,
            sys_tick: rel_tick,
            motor_count: [tail, right, left],
            adc: [gyro, 0, 0, 0],
            ..Default::default()
        }
    }

    #[test]
    fn test_first_update_is_at_rest() {
        let mut estimator = StateEstimator::new(EstimatorParams::default());
        let snap = estimator.update(&record(5_000, 40, 1_000, -1_000, 600));

        assert_eq!(snap.run_time, 0);
        assert_eq!(snap.moment_run_time, 0);
        assert_eq!(snap.distance, 0.0);
        assert_eq!(snap.average_speed, 0.0);
        assert_eq!(snap.moment_average_speed, 0.0);
        assert_eq!(snap.direction, 0.0);
        assert_eq!(snap.turn_angle, 0.0);
        assert_eq!(snap.position, Point::default());
        assert_eq!(snap.tail_angle, 40.0);
        assert_eq!(snap.tail_turn_angle, 0.0);
        assert_eq!(snap.posture, 0.0);
    }

    #[test]
    fn test_run_time_is_relative_to_first_record() {
        let mut estimator = StateEstimator::new(EstimatorParams::default());
        estimator.update(&record(2_000, 0, 0, 0, 0));
        let a = estimator.update(&record(2_004, 0, 0, 0, 0));
        let b = estimator.update(&record(2_012, 0, 0, 0, 0));

        assert_eq!(a.run_time, 4);
        assert_eq!(a.moment_run_time, 4);
        assert_eq!(b.run_time, 12);
        assert_eq!(b.moment_run_time, 8);
    }

    #[test]
    fn test_odometry_right_wheel_full_turn() {
        let mut estimator = StateEstimator::new(EstimatorParams::default());
        estimator.update(&record(0, 0, 0, 0, 0));
        let snap = estimator.update(&record(1_000, 0, 360, 0, 0));

        let half_circumference = PI * DEFAULT_WHEEL_RADIUS_MM;
        assert!((snap.distance - half_circumference).abs() < EPS);
        assert!((snap.distance - 131.9).abs() < 0.1);
        assert!((snap.moment_distance - half_circumference).abs() < EPS);
        assert!((snap.average_speed - half_circumference).abs() < EPS);
        assert!((snap.moment_average_speed - half_circumference).abs() < EPS);

        // Right wheel travels 2 * 131.9 mm, left wheel stays put.
        let expected_turn = (2.0 * half_circumference / DEFAULT_AXLE_LENGTH_MM).to_degrees();
        assert!((snap.turn_angle - expected_turn).abs() < EPS);
        assert!((snap.direction - expected_turn).abs() < EPS);

        // Step heading is half the step turn.
        let heading = snap.position.y.atan2(snap.position.x).to_degrees();
        assert!((heading - (half_circumference / DEFAULT_AXLE_LENGTH_MM).to_degrees()).abs() < 1e-6);
        let travelled = snap.position.x.hypot(snap.position.y);
        assert!((travelled - half_circumference).abs() < EPS);
    }

    #[test]
    fn test_straight_line_motion() {
        let mut estimator = StateEstimator::new(EstimatorParams::default());
        estimator.update(&record(0, 0, 0, 0, 0));
        estimator.update(&record(500, 0, 180, 180, 0));
        let snap = estimator.update(&record(1_000, 0, 360, 360, 0));

        let circumference = 2.0 * PI * DEFAULT_WHEEL_RADIUS_MM;
        assert!((snap.distance - circumference).abs() < EPS);
        assert!((snap.moment_distance - circumference / 2.0).abs() < EPS);
        assert!((snap.position.x - circumference).abs() < EPS);
        assert!(snap.position.y.abs() < EPS);
        assert_eq!(snap.turn_angle, 0.0);
        assert_eq!(snap.direction, 0.0);
    }

    #[test]
    fn test_direction_wraps_negative_into_range() {
        let mut estimator = StateEstimator::new(EstimatorParams::default());
        estimator.update(&record(0, 0, 0, 0, 0));
        let snap = estimator.update(&record(100, 0, 0, 360, 0));

        let turn = DEFAULT_WHEEL_RADIUS_MM / DEFAULT_AXLE_LENGTH_MM * 360.0;
        assert!((snap.direction - (360.0 - turn)).abs() < EPS);
        assert!(snap.turn_angle < 0.0, "turn angle stays unbounded and signed");
    }

    #[test]
    fn test_direction_includes_start_heading() {
        let params = EstimatorParams { start_direction: 350.0, ..EstimatorParams::default() };
        let mut estimator = StateEstimator::new(params);
        estimator.update(&record(0, 0, 0, 0, 0));

        // 161 / 42 * 20 degrees of differential rotation turns the body by 20 degrees.
        let right = (DEFAULT_AXLE_LENGTH_MM / DEFAULT_WHEEL_RADIUS_MM * 20.0).round() as i32;
        let snap = estimator.update(&record(100, 0, right, 0, 0));
        let expected = normalize_degrees(350.0 + DEFAULT_WHEEL_RADIUS_MM / DEFAULT_AXLE_LENGTH_MM * right as f64);

        assert!((snap.direction - expected).abs() < EPS);
        assert!(snap.direction < 20.0);
    }

    #[test]
    fn test_direction_always_in_range() {
        let mut estimator = StateEstimator::new(EstimatorParams::default());
        let mut right = 0;
        let mut left = 0;
        for i in 0..200u32 {
            right += (i as i32 * 37) % 101 - 50;
            left -= (i as i32 * 53) % 97 - 48;
            let snap = estimator.update(&record(i * 10, 0, right, left, 0));
            assert!((0.0..360.0).contains(&snap.direction), "direction {}", snap.direction);
        }
    }

    #[test]
    fn test_position_starts_at_configured_point() {
        let params = EstimatorParams { start_position: Point::new(100.0, -50.0), ..EstimatorParams::default() };
        let mut estimator = StateEstimator::new(params);
        assert_eq!(estimator.snapshot().position, Point::new(100.0, -50.0));

        estimator.update(&record(0, 0, 0, 0, 0));
        let snap = estimator.update(&record(100, 0, 360, 360, 0));
        assert!((snap.position.x - (100.0 + 2.0 * PI * DEFAULT_WHEEL_RADIUS_MM)).abs() < EPS);
        assert!((snap.position.y + 50.0).abs() < EPS);
    }

    #[test]
    fn test_position_heading_ignores_start_direction() {
        let params = EstimatorParams { start_direction: 90.0, ..EstimatorParams::default() };
        let mut estimator = StateEstimator::new(params);

        estimator.update(&record(0, 0, 0, 0, 0));
        let snap = estimator.update(&record(1_000, 0, 360, 360, 0));

        // Travel follows the accumulated turn only
        assert_eq!(snap.turn_angle, 0.0);
        assert!((snap.position.x - 2.0 * PI * DEFAULT_WHEEL_RADIUS_MM).abs() < EPS);
        assert!(snap.position.y.abs() < EPS);

        // Direction still reports the start heading
        assert!((snap.direction - 90.0).abs() < EPS);
    }

    #[test]
    fn test_tail_angle_normalized_and_turn_unbounded() {
        let mut estimator = StateEstimator::new(EstimatorParams::default());
        let first = estimator.update(&record(0, -90, 0, 0, 0));
        assert_eq!(first.tail_angle, 270.0);

        let second = estimator.update(&record(100, 630, 0, 0, 0));
        assert_eq!(second.tail_angle, 270.0);
        assert_eq!(second.tail_turn_angle, 720.0);
        assert_eq!(second.moment_tail_turn_angle, 720.0);

        let third = estimator.update(&record(200, 600, 0, 0, 0));
        assert_eq!(third.tail_angle, 240.0);
        assert_eq!(third.tail_turn_angle, 690.0);
        assert_eq!(third.moment_tail_turn_angle, -30.0);
    }

    #[test]
    fn test_posture_zero_during_warm_up() {
        let mut estimator = StateEstimator::new(EstimatorParams::default());
        for i in 0..16u32 {
            let gyro = if i % 3 == 0 { i16::MAX } else { i16::MIN };
            let snap = estimator.update(&record(i * 4, 0, 0, 0, gyro));
            assert_eq!(snap.posture, 0.0, "update {}", i + 1);
        }
        assert_eq!(estimator.posture_filter().state(), PostureState::Ready);
    }

    #[test]
    fn test_posture_integrates_after_warm_up() {
        let params = EstimatorParams {
            posture: PostureParams {
                stationary_reset: StationaryReset::Disabled,
                ..PostureParams::default()
            },
            ..EstimatorParams::default()
        };
        let mut estimator = StateEstimator::new(params);
        for i in 0..16u32 {
            estimator.update(&record(i * 100, 0, 0, 0, 600));
        }
        let snap = estimator.update(&record(1_600, 0, 0, 0, 760));
        assert!((snap.posture - 0.5).abs() < EPS, "posture {}", snap.posture);
    }

    #[test]
    fn test_snapshots_are_independent_values() {
        let mut estimator = StateEstimator::new(EstimatorParams::default());
        estimator.update(&record(0, 0, 0, 0, 0));
        let early = estimator.update(&record(100, 0, 360, 360, 0));
        let early_copy = early;

        estimator.update(&record(200, 0, 720, 720, 0));
        assert_eq!(early, early_copy);
        assert_ne!(estimator.snapshot(), early);
    }

    #[test]
    fn test_snapshot_csv_row() {
        let snap = StateSnapshot {
            run_time: 1500,
            distance: 131.946,
            average_speed: 87.964,
            direction: 93.9,
            turn_angle: -12.3,
            posture: 0.0,
            tail_angle: 270.0,
            position: Point::new(90.1234, -3.0),
            ..StateSnapshot::default()
        };
        assert_eq!(snap.to_csv_row(), "1500,131.95,87.96,93.90,-12.30,0.00,270.00,90.12,-3.00");
    }

    #[test]
    fn test_snapshot_display_is_fixed_width() {
        let snap = StateSnapshot { run_time: 12, distance: 1.5, ..StateSnapshot::default() };
        let text = snap.to_string();
        assert!(text.starts_with("       12,     1.50,    0.00,"));
        assert_eq!(text.split(',').count(), 9);
    }

    #[test]
    fn test_initial_snapshot_uses_start_pose() {
        let params = EstimatorParams {
            start_position: Point::new(1.0, 2.0),
            start_direction: -90.0,
            ..EstimatorParams::default()
        };
        let snap = StateSnapshot::initial(&params);
        assert_eq!(snap.position, Point::new(1.0, 2.0));
        assert_eq!(snap.direction, 270.0);
        assert_eq!(snap.run_time, 0);
    }
}
