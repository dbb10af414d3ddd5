//! Frequency module - the frequency grid of a calibration session
//!
//! A grid is built once, validated to be strictly increasing, and then shared
//! read-only (usually through an `Arc`) by every network measured on it.

use crate::constants::GRID_RTOL;
use crate::error::CalError;

/// Frequency unit enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FrequencyUnit {
    Hz,
    KHz,
    MHz,
    #[default]
    GHz,
}

impl FrequencyUnit {
    /// Get the multiplier to convert to Hz
    pub fn multiplier(&self) -> f64 {
        match self {
            FrequencyUnit::Hz => 1.0,
            FrequencyUnit::KHz => 1e3,
            FrequencyUnit::MHz => 1e6,
            FrequencyUnit::GHz => 1e9,
        }
    }

    /// Parse from string (case-insensitive)
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "hz" => Some(FrequencyUnit::Hz),
            "khz" => Some(FrequencyUnit::KHz),
            "mhz" => Some(FrequencyUnit::MHz),
            "ghz" => Some(FrequencyUnit::GHz),
            _ => None,
        }
    }

    /// Label used in Touchstone option lines
    pub fn label(&self) -> &'static str {
        match self {
            FrequencyUnit::Hz => "Hz",
            FrequencyUnit::KHz => "kHz",
            FrequencyUnit::MHz => "MHz",
            FrequencyUnit::GHz => "GHz",
        }
    }
}

/// Sweep type enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SweepType {
    #[default]
    Linear,
    Log,
}

/// A strictly increasing frequency grid
#[derive(Debug, Clone)]
pub struct Frequency {
    /// Frequency vector in Hz
    f: Vec<f64>,
    /// Display unit
    unit: FrequencyUnit,
    /// Sweep type (linear or log)
    sweep_type: SweepType,
}

/// Grids are equal when their points are; unit and sweep type are presentation only.
impl PartialEq for Frequency {
    fn eq(&self, other: &Self) -> bool {
        self.f == other.f
    }
}

impl Frequency {
    /// Create a new Frequency with start/stop/npoints
    ///
    /// # Arguments
    /// * `start` - Start frequency in the specified unit
    /// * `stop` - Stop frequency in the specified unit
    /// * `npoints` - Number of frequency points
    /// * `unit` - Frequency unit
    /// * `sweep_type` - Linear or logarithmic sweep
    ///
    /// # Errors
    /// `InvalidRange` if `npoints` is zero, `stop < start`, a log sweep starts
    /// at or below 0 Hz, or the points would not be strictly increasing.
    ///
    /// # Example
    /// ```
    /// use vnacal_core::frequency::{Frequency, FrequencyUnit, SweepType};
    /// let freq = Frequency::new(1.0, 10.0, 10, FrequencyUnit::GHz, SweepType::Linear).unwrap();
    /// assert_eq!(freq.npoints(), 10);
    /// ```
    pub fn new(
        start: f64,
        stop: f64,
        npoints: usize,
        unit: FrequencyUnit,
        sweep_type: SweepType,
    ) -> Result<Self, CalError> {
        if npoints < 1 {
            return Err(CalError::InvalidRange(
                "a frequency grid needs at least one point".to_string(),
            ));
        }
        if !start.is_finite() || !stop.is_finite() || stop < start {
            return Err(CalError::InvalidRange(format!(
                "stop ({}) must not be below start ({})",
                stop, start
            )));
        }
        if sweep_type == SweepType::Log && start <= 0.0 {
            return Err(CalError::InvalidRange(format!(
                "log sweep must start above 0, got {}",
                start
            )));
        }

        let mult = unit.multiplier();
        let start_hz = start * mult;
        let stop_hz = stop * mult;

        let f = if npoints == 1 {
            vec![start_hz]
        } else {
            match sweep_type {
                SweepType::Linear => {
                    let step = (stop_hz - start_hz) / (npoints - 1) as f64;
                    (0..npoints).map(|i| start_hz + i as f64 * step).collect()
                }
                SweepType::Log => {
                    let log_start = start_hz.ln();
                    let log_stop = stop_hz.ln();
                    let log_step = (log_stop - log_start) / (npoints - 1) as f64;
                    (0..npoints)
                        .map(|i| (log_start + i as f64 * log_step).exp())
                        .collect()
                }
            }
        };

        check_increasing(&f)?;

        Ok(Self {
            f,
            unit,
            sweep_type,
        })
    }

    /// Create from a frequency vector given in `unit`
    pub fn from_f(f: Vec<f64>, unit: FrequencyUnit) -> Result<Self, CalError> {
        if f.is_empty() {
            return Err(CalError::InvalidRange(
                "a frequency grid needs at least one point".to_string(),
            ));
        }
        let mult = unit.multiplier();
        let f_hz: Vec<f64> = f.iter().map(|&x| x * mult).collect();
        check_increasing(&f_hz)?;
        Ok(Self {
            f: f_hz,
            unit,
            sweep_type: SweepType::Linear, // default, actual sweep type unknown
        })
    }

    /// Frequency in Hz at `index`
    pub fn at(&self, index: usize) -> Result<f64, CalError> {
        self.f.get(index).copied().ok_or(CalError::IndexOutOfRange {
            index,
            len: self.f.len(),
        })
    }

    /// Get frequency vector in Hz
    #[inline]
    pub fn f(&self) -> &[f64] {
        &self.f
    }

    /// Get frequency vector in the current unit
    pub fn f_scaled(&self) -> Vec<f64> {
        let mult = self.unit.multiplier();
        self.f.iter().map(|&x| x / mult).collect()
    }

    /// Get the number of frequency points
    #[inline]
    pub fn npoints(&self) -> usize {
        self.f.len()
    }

    /// Get the start frequency in Hz
    #[inline]
    pub fn start(&self) -> f64 {
        self.f[0]
    }

    /// Get the stop frequency in Hz
    #[inline]
    pub fn stop(&self) -> f64 {
        self.f[self.f.len() - 1]
    }

    /// Get the current unit
    #[inline]
    pub fn unit(&self) -> FrequencyUnit {
        self.unit
    }

    /// Get the sweep type
    #[inline]
    pub fn sweep_type(&self) -> SweepType {
        self.sweep_type
    }

    /// Whether both grids hold the same points up to floating-point noise
    ///
    /// A grid rebuilt from Touchstone text differs from the generated one in
    /// the last bits; points within `GRID_RTOL` relative count as equal.
    pub fn matches(&self, other: &Frequency) -> bool {
        self.f.len() == other.f.len()
            && self
                .f
                .iter()
                .zip(&other.f)
                .all(|(a, b)| (a - b).abs() <= GRID_RTOL * a.abs().max(b.abs()))
    }
}

fn check_increasing(f: &[f64]) -> Result<(), CalError> {
    if let Some(bad) = f.iter().position(|x| !x.is_finite()) {
        return Err(CalError::InvalidRange(format!(
            "frequency at index {} is not finite",
            bad
        )));
    }
    if let Some(i) = f.windows(2).position(|w| w[1] <= w[0]) {
        return Err(CalError::InvalidRange(format!(
            "frequencies must be strictly increasing (index {}: {} then {})",
            i + 1,
            f[i],
            f[i + 1]
        )));
    }
    Ok(())
}
