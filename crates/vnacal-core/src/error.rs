//! Calibration error taxonomy
//!
//! Structural errors (`InvalidRange`, `DimensionMismatch`, `FrequencyMismatch`,
//! `Uncalibrated`, `IndexOutOfRange`) fail a whole call. Numerical errors carry
//! the frequency index they occurred at and are recorded per point.

use thiserror::Error;

/// Errors raised by grids, networks and calibrators
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CalError {
    #[error("Invalid range: {0}")]
    InvalidRange(String),

    #[error("Dimension mismatch: {0}")]
    DimensionMismatch(String),

    #[error("Frequency mismatch: {0}")]
    FrequencyMismatch(String),

    #[error("Singular calibration standards at frequency index {index}")]
    SingularStandards { index: usize },

    #[error("Cannot resolve TRL root choice at frequency index {index}")]
    AmbiguousRoot { index: usize },

    #[error("Line is degenerate with thru at frequency index {index}")]
    DegenerateLine { index: usize },

    #[error("Error box is not invertible at frequency index {index}")]
    SingularErrorBox { index: usize },

    #[error("Calibration has not been fitted")]
    Uncalibrated,

    #[error("Index {index} out of range for length {len}")]
    IndexOutOfRange { index: usize, len: usize },
}

impl CalError {
    /// Frequency index attached to a per-point error, if any
    pub fn frequency_index(&self) -> Option<usize> {
        match self {
            CalError::SingularStandards { index }
            | CalError::AmbiguousRoot { index }
            | CalError::DegenerateLine { index }
            | CalError::SingularErrorBox { index } => Some(*index),
            _ => None,
        }
    }

    /// Whether the error affects a single frequency point rather than the whole call
    #[inline]
    pub fn is_per_point(&self) -> bool {
        self.frequency_index().is_some()
    }
}
