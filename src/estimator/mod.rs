//! # State Estimator Module
//!
//! Dead-reckoning and sensor integration over decoded telemetry records.
//!
//! This module handles:
//! - Run time, travelled distance and speed from the wheel encoders
//! - Heading and planar position via differential-drive kinematics
//! - Tail motor angle tracking
//! - Body tilt (posture) from the gyro, with bias calibration

pub mod motor;
pub mod posture;
pub mod state;

pub use motor::MotorPair;
pub use posture::{PostureFilter, PostureParams, PostureState, StationaryReset};
pub use state::{EstimatorParams, Point, StateEstimator, StateSnapshot};

/// Wrap an angle in degrees into `[0, 360)`.
///
/// # Examples
///
/// ```
/// use nxt_telemetry::estimator::normalize_degrees;
///
/// assert_eq!(normalize_degrees(370.0), 10.0);
/// assert_eq!(normalize_degrees(-90.0), 270.0);
/// assert_eq!(normalize_degrees(360.0), 0.0);
/// ```
pub fn normalize_degrees(angle: f64) -> f64 {
    let wrapped = angle.rem_euclid(360.0);
    // rem_euclid rounds tiny negative inputs up to exactly 360.0
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_degrees_range() {
        for angle in [-1080.5, -360.0, -0.25, 0.0, 359.999, 360.0, 725.0] {
            let n = normalize_degrees(angle);
            assert!((0.0..360.0).contains(&n), "{} -> {}", angle, n);
        }
    }

    #[test]
    fn test_normalize_degrees_tiny_negative() {
        assert_eq!(normalize_degrees(-1e-15), 0.0);
    }

    #[test]
    fn test_normalize_degrees_values() {
        assert_eq!(normalize_degrees(725.0), 5.0);
        assert_eq!(normalize_degrees(-450.0), 270.0);
    }
}
