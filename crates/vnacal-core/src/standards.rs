//! Standards library
//!
//! Ideal S-parameter responses of calibration standards, generated from
//! physical parameters on a shared frequency grid. Reference planes are
//! ideal, so short/open/load responses do not depend on frequency.

use std::f64::consts::PI;
use std::sync::Arc;

use ndarray::{arr2, Array3};
use num_complex::Complex64;

use crate::constants::SPEED_OF_LIGHT;
use crate::error::CalError;
use crate::frequency::Frequency;
use crate::network::Network;

/// What is known about a TRL reflect standard: the sign of its reflection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReflectKind {
    /// Short-like, Re(Gamma) < 0
    Short,
    /// Open-like, Re(Gamma) > 0
    Open,
}

impl ReflectKind {
    /// Reflection coefficient of the ideal standard
    pub fn nominal(&self) -> Complex64 {
        match self {
            ReflectKind::Short => Complex64::new(-1.0, 0.0),
            ReflectKind::Open => Complex64::new(1.0, 0.0),
        }
    }

    /// Whether `gamma` has this kind's sign
    ///
    /// Returns `None` when `|Re(gamma)| <= tol * |gamma|`, where the sign
    /// carries no information.
    pub fn agrees_with(&self, gamma: Complex64, tol: f64) -> Option<bool> {
        if gamma.re.abs() <= tol * gamma.norm() {
            return None;
        }
        Some(match self {
            ReflectKind::Short => gamma.re < 0.0,
            ReflectKind::Open => gamma.re > 0.0,
        })
    }
}

/// Approximate physical description of a TRL line standard
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineEstimate {
    /// Extra length over the thru (m)
    pub length: f64,
    /// Relative permittivity of the medium
    pub er: f64,
}

impl LineEstimate {
    pub fn new(length: f64, er: f64) -> Result<Self, CalError> {
        if !length.is_finite() || length < 0.0 {
            return Err(CalError::InvalidRange(format!(
                "line length must be finite and non-negative, got {}",
                length
            )));
        }
        if !er.is_finite() || er <= 0.0 {
            return Err(CalError::InvalidRange(format!(
                "relative permittivity must be positive, got {}",
                er
            )));
        }
        Ok(Self { length, er })
    }

    /// Phase constant beta = 2 pi f / (c / sqrt(er)) in rad/m
    #[inline]
    pub fn beta(&self, f: f64) -> f64 {
        2.0 * PI * f / (SPEED_OF_LIGHT / self.er.sqrt())
    }

    /// exp(-j beta length) at frequency `f` (Hz)
    #[inline]
    pub fn propagation(&self, f: f64) -> Complex64 {
        Complex64::from_polar(1.0, -self.beta(f) * self.length)
    }
}

/// One-port standard with the same reflection at every frequency
pub fn one_port(frequency: &Arc<Frequency>, gamma: Complex64) -> Result<Network, CalError> {
    Network::constant(frequency.clone(), arr2(&[[gamma]]).view())
}

/// Ideal short, S11 = -1
pub fn short(frequency: &Arc<Frequency>) -> Result<Network, CalError> {
    Ok(one_port(frequency, ReflectKind::Short.nominal())?.with_name("short"))
}

/// Ideal open, S11 = +1
pub fn open(frequency: &Arc<Frequency>) -> Result<Network, CalError> {
    Ok(one_port(frequency, ReflectKind::Open.nominal())?.with_name("open"))
}

/// Ideal matched load, S11 = 0
pub fn load(frequency: &Arc<Frequency>) -> Result<Network, CalError> {
    Ok(one_port(frequency, Complex64::new(0.0, 0.0))?.with_name("load"))
}

/// Ideal zero-length thru, S21 = S12 = 1
pub fn thru(frequency: &Arc<Frequency>) -> Result<Network, CalError> {
    let zero = Complex64::new(0.0, 0.0);
    let one = Complex64::new(1.0, 0.0);
    Ok(Network::constant(frequency.clone(), arr2(&[[zero, one], [one, zero]]).view())?
        .with_name("thru"))
}

/// Matched lossless line of `length` metres in a medium of relative permittivity `er`
pub fn line(frequency: &Arc<Frequency>, length: f64, er: f64) -> Result<Network, CalError> {
    let estimate = LineEstimate::new(length, er)?;
    let f = frequency.f();
    let s = Array3::from_shape_fn((f.len(), 2, 2), |(k, i, j)| {
        if i == j {
            Complex64::new(0.0, 0.0)
        } else {
            estimate.propagation(f[k])
        }
    });
    Ok(Network::with_default_z0(frequency.clone(), s)?.with_name("line"))
}

/// Two-port reflect: the same `gamma` on both ports, no transmission
pub fn reflect(frequency: &Arc<Frequency>, gamma: Complex64) -> Result<Network, CalError> {
    let zero = Complex64::new(0.0, 0.0);
    Ok(Network::constant(frequency.clone(), arr2(&[[gamma, zero], [zero, gamma]]).view())?
        .with_name("reflect"))
}
