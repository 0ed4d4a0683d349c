//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.
//!
//! Every section and every field is optional; missing values take the
//! defaults below.

use serde::de::Error;
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::error::{NxtError, Result};
use crate::estimator::{EstimatorParams, Point, PostureParams, StationaryReset};

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub serial: SerialConfig,
    #[serde(default)]
    pub estimator: EstimatorConfig,
    #[serde(default)]
    pub posture: PostureConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Serial port configuration
#[derive(Debug, Deserialize, Clone)]
pub struct SerialConfig {
    #[serde(default = "default_serial_port")]
    pub port: String,

    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,

    #[serde(default = "default_read_buffer_size")]
    pub read_buffer_size: usize,

    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

/// Robot geometry and start pose
#[derive(Debug, Deserialize, Clone)]
pub struct EstimatorConfig {
    #[serde(default)]
    pub start_x: f64,

    #[serde(default)]
    pub start_y: f64,

    #[serde(default)]
    pub start_direction: f64,

    #[serde(default = "default_wheel_radius_mm")]
    pub wheel_radius_mm: f64,

    #[serde(default = "default_axle_length_mm")]
    pub axle_length_mm: f64,
}

/// Gyro posture filter configuration
#[derive(Debug, Deserialize, Clone)]
pub struct PostureConfig {
    #[serde(default = "default_calibration_window")]
    pub calibration_window: usize,

    #[serde(default = "default_dead_zone")]
    pub dead_zone: f64,

    #[serde(default = "default_stationary_reset")]
    pub stationary_reset: bool,

    #[serde(default = "default_stationary_threshold")]
    pub stationary_threshold: f64,
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Directory for daily log files; empty disables file logging
    #[serde(default)]
    pub log_dir: String,

    #[serde(default = "default_status_interval")]
    pub status_interval: u64,

    #[serde(default = "default_echo_snapshots")]
    pub echo_snapshots: bool,
}

// Default value functions
fn default_serial_port() -> String { "/dev/rfcomm0".to_string() }
fn default_baud_rate() -> u32 { 57_600 }
fn default_read_buffer_size() -> usize { 256 }
fn default_timeout_ms() -> u64 { 100 }

fn default_wheel_radius_mm() -> f64 { 42.0 }
fn default_axle_length_mm() -> f64 { 161.0 }

fn default_calibration_window() -> usize { 16 }
fn default_dead_zone() -> f64 { 0.1 }
fn default_stationary_reset() -> bool { true }
fn default_stationary_threshold() -> f64 { 0.05 }

fn default_log_level() -> String { "info".to_string() }
fn default_status_interval() -> u64 { 1000 }
fn default_echo_snapshots() -> bool { true }

const ALLOWED_BAUD_RATES: [u32; 8] = [9600, 19200, 38400, 57600, 115200, 230400, 460800, 921600];
const ALLOWED_LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: default_serial_port(),
            baud_rate: default_baud_rate(),
            read_buffer_size: default_read_buffer_size(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            start_x: 0.0,
            start_y: 0.0,
            start_direction: 0.0,
            wheel_radius_mm: default_wheel_radius_mm(),
            axle_length_mm: default_axle_length_mm(),
        }
    }
}

impl Default for PostureConfig {
    fn default() -> Self {
        Self {
            calibration_window: default_calibration_window(),
            dead_zone: default_dead_zone(),
            stationary_reset: default_stationary_reset(),
            stationary_threshold: default_stationary_threshold(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            log_dir: String::new(),
            status_interval: default_status_interval(),
            echo_snapshots: default_echo_snapshots(),
        }
    }
}

fn invalid(msg: impl std::fmt::Display) -> NxtError {
    NxtError::Config(toml::de::Error::custom(msg))
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    ///
    /// * `Result<Config>` - Loaded and validated configuration
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use nxt_telemetry::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Parse and validate configuration from TOML text
    ///
    /// # Errors
    ///
    /// Returns [`NxtError::Config`] if parsing or validation fails
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Estimator parameters described by the `[estimator]` and `[posture]` sections
    pub fn estimator_params(&self) -> EstimatorParams {
        let stationary_reset = if self.posture.stationary_reset {
            StationaryReset::Threshold(self.posture.stationary_threshold)
        } else {
            StationaryReset::Disabled
        };

        EstimatorParams {
            wheel_radius_mm: self.estimator.wheel_radius_mm,
            axle_length_mm: self.estimator.axle_length_mm,
            start_position: Point::new(self.estimator.start_x, self.estimator.start_y),
            start_direction: self.estimator.start_direction,
            posture: PostureParams {
                calibration_window: self.posture.calibration_window,
                dead_zone: self.posture.dead_zone,
                stationary_reset,
            },
        }
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    fn validate(&self) -> Result<()> {
        // Serial
        if self.serial.port.is_empty() {
            return Err(invalid("serial port cannot be empty"));
        }

        if !ALLOWED_BAUD_RATES.contains(&self.serial.baud_rate) {
            return Err(invalid(
                "baud_rate must be one of: 9600, 19200, 38400, 57600, 115200, 230400, 460800, 921600",
            ));
        }

        if self.serial.read_buffer_size == 0 || self.serial.read_buffer_size > 65536 {
            return Err(invalid("read_buffer_size must be between 1 and 65536"));
        }

        if self.serial.timeout_ms == 0 || self.serial.timeout_ms > 10000 {
            return Err(invalid("timeout_ms must be between 1 and 10000"));
        }

        // Geometry
        for (name, value) in [
            ("wheel_radius_mm", self.estimator.wheel_radius_mm),
            ("axle_length_mm", self.estimator.axle_length_mm),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(invalid(format!("{} must be greater than 0", name)));
            }
        }

        for (name, value) in [
            ("start_x", self.estimator.start_x),
            ("start_y", self.estimator.start_y),
            ("start_direction", self.estimator.start_direction),
        ] {
            if !value.is_finite() {
                return Err(invalid(format!("{} must be a finite number", name)));
            }
        }

        // Posture filter
        if self.posture.calibration_window == 0 || self.posture.calibration_window > 1024 {
            return Err(invalid("calibration_window must be between 1 and 1024"));
        }

        for (name, value) in [
            ("dead_zone", self.posture.dead_zone),
            ("stationary_threshold", self.posture.stationary_threshold),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(invalid(format!("{} must be 0.0 or greater", name)));
            }
        }

        // Logging
        if !ALLOWED_LOG_LEVELS.contains(&self.logging.level.to_ascii_lowercase().as_str()) {
            return Err(invalid("level must be one of: trace, debug, info, warn, error"));
        }

        if self.logging.status_interval == 0 {
            return Err(invalid("status_interval must be greater than 0"));
        }

        Ok(())
    }
}
