//! Calibration configuration
//!
//! Numerical tolerances and parallelism settings, loadable from TOML:
//!
//! ```toml
//! singular_tol = 1e-12
//! degenerate_line_tol = 1e-3
//! parallel_threshold = 128
//! ```

use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

use crate::constants::{
    DEGENERATE_LINE_TOL, DISTINCT_TOL, PARALLEL_THRESHOLD, SIGN_TOL, SINGULAR_TOL,
    TOUCHSTONE_PRECISION,
};

/// Configuration loading errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },
}

/// Tolerances and execution settings shared by the calibrators
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CalibrationConfig {
    /// Relative determinant threshold for the one-port 3x3 solve
    #[serde(default = "default_singular_tol")]
    pub singular_tol: f64,

    /// Minimum distance between ideal reflection coefficients
    #[serde(default = "default_distinct_tol")]
    pub distinct_tol: f64,

    /// Relative TRL eigenvalue separation below which the line is degenerate
    #[serde(default = "default_degenerate_line_tol")]
    pub degenerate_line_tol: f64,

    /// Relative |Re(Gamma)| below which the reflect sign cannot pick a root
    #[serde(default = "default_sign_tol")]
    pub sign_tol: f64,

    /// Sweeps with at least this many points are processed on the rayon pool
    #[serde(default = "default_parallel_threshold")]
    pub parallel_threshold: usize,

    /// Decimals written per value in Touchstone output
    #[serde(default = "default_touchstone_precision")]
    pub touchstone_precision: usize,
}

fn default_singular_tol() -> f64 {
    SINGULAR_TOL
}

fn default_distinct_tol() -> f64 {
    DISTINCT_TOL
}

fn default_degenerate_line_tol() -> f64 {
    DEGENERATE_LINE_TOL
}

fn default_sign_tol() -> f64 {
    SIGN_TOL
}

fn default_parallel_threshold() -> usize {
    PARALLEL_THRESHOLD
}

fn default_touchstone_precision() -> usize {
    TOUCHSTONE_PRECISION
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            singular_tol: default_singular_tol(),
            distinct_tol: default_distinct_tol(),
            degenerate_line_tol: default_degenerate_line_tol(),
            sign_tol: default_sign_tol(),
            parallel_threshold: default_parallel_threshold(),
            touchstone_precision: default_touchstone_precision(),
        }
    }
}

impl CalibrationConfig {
    /// Parse configuration from TOML content
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: CalibrationConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    ///
    /// A missing file yields the default configuration.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::debug!(path = %path.display(), "config file not found, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let tolerances = [
            ("singular_tol", self.singular_tol),
            ("distinct_tol", self.distinct_tol),
            ("degenerate_line_tol", self.degenerate_line_tol),
            ("sign_tol", self.sign_tol),
        ];
        for (key, value) in tolerances {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidValue {
                    key: key.to_string(),
                    message: format!("expected a finite non-negative number, got {}", value),
                });
            }
        }
        if self.touchstone_precision > 17 {
            return Err(ConfigError::InvalidValue {
                key: "touchstone_precision".to_string(),
                message: format!("at most 17 decimals, got {}", self.touchstone_precision),
            });
        }
        Ok(())
    }
}
