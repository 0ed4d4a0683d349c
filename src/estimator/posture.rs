//! # Posture Filter
//!
//! Estimates body tilt by integrating the gyro's angular velocity.
//!
//! ## States
//!
//! - **Init**: posture is held at 0 while the calibration window fills. When
//!   the window is full its mean becomes the gyro bias and the filter moves to
//!   Ready. There is no way back; a new filter is needed to recalibrate.
//! - **Ready**: `av = mean(window) - bias` is integrated with the trapezoid
//!   rule over the last two samples. Steps whose magnitude is within the dead
//!   zone are dropped.
//!
//! ## Stationary Reset
//!
//! With [`StationaryReset::Threshold`], the posture is forced to 0 whenever
//! `|av|` is within the threshold. This cancels long-term drift, but it also
//! erases any real tilt held while the body is not rotating.

use tracing::debug;

use crate::ring_buffer::RingBuffer;

/// Default gyro calibration window (samples)
pub const DEFAULT_CALIBRATION_WINDOW: usize = 16;

/// Default dead zone applied to each integration step
pub const DEFAULT_DEAD_ZONE: f64 = 0.1;

/// Default stationary threshold on the angular velocity
pub const DEFAULT_STATIONARY_THRESHOLD: f64 = 0.05;

/// Policy applied when the angular velocity is near zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StationaryReset {
    /// Keep the integrated posture.
    Disabled,
    /// Force posture to 0 whenever `|av| <= threshold`.
    Threshold(f64),
}

impl Default for StationaryReset {
    fn default() -> Self {
        StationaryReset::Threshold(DEFAULT_STATIONARY_THRESHOLD)
    }
}

/// Tuning of the posture filter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PostureParams {
    /// Number of gyro samples averaged, both for calibration and per step.
    pub calibration_window: usize,
    /// Integration steps with `|delta| <= dead_zone` are treated as zero.
    pub dead_zone: f64,
    /// Near-zero angular velocity policy.
    pub stationary_reset: StationaryReset,
}

impl Default for PostureParams {
    fn default() -> Self {
        Self {
            calibration_window: DEFAULT_CALIBRATION_WINDOW,
            dead_zone: DEFAULT_DEAD_ZONE,
            stationary_reset: StationaryReset::default(),
        }
    }
}

/// Posture filter state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostureState {
    /// Filling the calibration window.
    Init,
    /// Bias known, integrating.
    Ready,
}

/// Two-state gyro integrator.
#[derive(Debug, Clone)]
pub struct PostureFilter {
    params: PostureParams,
    state: PostureState,
    gyro: RingBuffer<f64>,
    angular_velocity: RingBuffer<f64>,
    offset: f64,
    posture: f64,
}

impl PostureFilter {
    /// Creates a filter in the Init state.
    pub fn new(params: PostureParams) -> Self {
        Self {
            params,
            state: PostureState::Init,
            gyro: RingBuffer::new(params.calibration_window),
            angular_velocity: RingBuffer::new(2),
            offset: 0.0,
            posture: 0.0,
        }
    }

    /// Feeds one gyro sample and returns the updated posture.
    ///
    /// # Arguments
    ///
    /// * `gyro` - Raw gyro reading
    /// * `moment_run_time_ms` - Time since the previous sample in ms
    pub fn update(&mut self, gyro: f64, moment_run_time_ms: u32) -> f64 {
        self.gyro.append(gyro);

        match self.state {
            PostureState::Init => {
                self.posture = 0.0;
                if self.gyro.is_full() {
                    self.offset = self.gyro.average().unwrap_or(gyro);
                    self.angular_velocity.append(gyro - self.offset);
                    self.state = PostureState::Ready;
                    debug!("Gyro calibrated, bias {:.3}", self.offset);
                }
            }
            PostureState::Ready => {
                let av = self.gyro.average().unwrap_or(gyro) - self.offset;
                self.angular_velocity.append(av);

                let dt = f64::from(moment_run_time_ms) / 1000.0;
                let mut delta = self.angular_velocity.iter().take(2).sum::<f64>() * dt / 2.0;
                if delta.abs() <= self.params.dead_zone {
                    delta = 0.0;
                }
                self.posture += delta;

                if let StationaryReset::Threshold(threshold) = self.params.stationary_reset {
                    if av.abs() <= threshold {
                        self.posture = 0.0;
                    }
                }
            }
        }

        self.posture
    }

    /// Current state.
    pub fn state(&self) -> PostureState {
        self.state
    }

    /// Current posture estimate.
    pub fn posture(&self) -> f64 {
        self.posture
    }

    /// Gyro bias, valid once Ready.
    pub fn offset(&self) -> f64 {
        self.offset
    }

    /// Latest angular velocity, if any has been computed.
    pub fn angular_velocity(&self) -> Option<f64> {
        self.angular_velocity.get(0).copied()
    }

    /// Tuning in use.
    pub fn params(&self) -> &PostureParams {
        &self.params
    }
}
