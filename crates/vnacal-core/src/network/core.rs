//! Core Network struct and constructors
//!
//! Contains the fundamental Network data structure and factory methods.

use std::sync::Arc;

use ndarray::{Array1, Array2, Array3, ArrayView2, Axis};
use num_complex::Complex64;

use crate::error::CalError;
use crate::frequency::Frequency;

/// Default reference impedance in ohms
pub const DEFAULT_Z0: f64 = 50.0;

/// An N-port electrical network on a shared frequency grid
///
/// Networks are immutable: every operation that changes data returns a new
/// Network on the same grid.
#[derive(Debug, Clone)]
pub struct Network {
    /// Frequency grid, shared with every network of the session
    frequency: Arc<Frequency>,
    /// S-parameter data [nfreq, nports, nports]
    s: Array3<Complex64>,
    /// Reference impedance (per port)
    z0: Array1<Complex64>,
    /// Network name
    name: Option<String>,
}

impl Network {
    /// Create a new Network from S-parameters
    ///
    /// # Errors
    /// `DimensionMismatch` if the first axis differs from the grid length, the
    /// matrices are not square, or `z0` does not have one entry per port.
    pub fn new(
        frequency: Arc<Frequency>,
        s: Array3<Complex64>,
        z0: Array1<Complex64>,
    ) -> Result<Self, CalError> {
        let (nfreq, rows, cols) = s.dim();
        if nfreq != frequency.npoints() {
            return Err(CalError::DimensionMismatch(format!(
                "{} S-matrices for {} frequency points",
                nfreq,
                frequency.npoints()
            )));
        }
        if rows != cols || rows == 0 {
            return Err(CalError::DimensionMismatch(format!(
                "S-matrices must be square and non-empty, got {}x{}",
                rows, cols
            )));
        }
        if z0.len() != rows {
            return Err(CalError::DimensionMismatch(format!(
                "{} reference impedances for {} ports",
                z0.len(),
                rows
            )));
        }

        Ok(Self {
            frequency,
            s,
            z0,
            name: None,
        })
    }

    /// Create from one square matrix per frequency point, with 50 ohm ports
    pub fn from_matrices(
        frequency: Arc<Frequency>,
        matrices: &[Array2<Complex64>],
    ) -> Result<Self, CalError> {
        if matrices.len() != frequency.npoints() {
            return Err(CalError::DimensionMismatch(format!(
                "{} S-matrices for {} frequency points",
                matrices.len(),
                frequency.npoints()
            )));
        }

        let (rows, cols) = matrices[0].dim();
        if let Some(bad) = matrices.iter().position(|m| m.dim() != (rows, cols)) {
            return Err(CalError::DimensionMismatch(format!(
                "matrix at index {} is {:?}, expected {:?}",
                bad,
                matrices[bad].dim(),
                (rows, cols)
            )));
        }

        let views: Vec<ArrayView2<Complex64>> = matrices.iter().map(|m| m.view()).collect();
        let s = ndarray::stack(Axis(0), &views)
            .map_err(|e| CalError::DimensionMismatch(e.to_string()))?;
        Self::with_default_z0(frequency, s)
    }

    /// Create with a 50 ohm reference on every port
    pub fn with_default_z0(
        frequency: Arc<Frequency>,
        s: Array3<Complex64>,
    ) -> Result<Self, CalError> {
        let nports = s.shape()[1];
        let z0 = Array1::from_elem(nports, Complex64::new(DEFAULT_Z0, 0.0));
        Self::new(frequency, s, z0)
    }

    /// Create a network whose S-matrix is the same at every frequency
    pub fn constant(frequency: Arc<Frequency>, s: ArrayView2<Complex64>) -> Result<Self, CalError> {
        let nfreq = frequency.npoints();
        let (rows, cols) = s.dim();
        let data = Array3::from_shape_fn((nfreq, rows, cols), |(_, i, j)| s[[i, j]]);
        Self::with_default_z0(frequency, data)
    }

    /// Return a copy carrying `name`
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Shared frequency grid
    #[inline]
    pub fn frequency(&self) -> &Arc<Frequency> {
        &self.frequency
    }

    /// S-parameter data [nfreq, nports, nports]
    #[inline]
    pub fn s(&self) -> &Array3<Complex64> {
        &self.s
    }

    /// S-matrix at frequency index `f`
    #[inline]
    pub fn s_at(&self, f: usize) -> ArrayView2<'_, Complex64> {
        self.s.index_axis(Axis(0), f)
    }

    /// Reference impedance per port
    #[inline]
    pub fn z0(&self) -> &Array1<Complex64> {
        &self.z0
    }

    /// Network name, if any
    #[inline]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Get the number of ports
    #[inline]
    pub fn nports(&self) -> usize {
        self.s.shape()[1]
    }

    /// Get the number of frequency points
    #[inline]
    pub fn nfreq(&self) -> usize {
        self.s.shape()[0]
    }

    /// S-parameter `S[port_out][port_in]` at frequency index `f` (0-based ports)
    pub fn s_parameter(
        &self,
        f: usize,
        port_out: usize,
        port_in: usize,
    ) -> Result<Complex64, CalError> {
        self.check_ports(port_out, port_in)?;
        if f >= self.nfreq() {
            return Err(CalError::IndexOutOfRange {
                index: f,
                len: self.nfreq(),
            });
        }
        Ok(self.s[[f, port_out, port_in]])
    }

    /// Whether both networks live on the same frequency points
    pub fn same_grid(&self, other: &Network) -> bool {
        Arc::ptr_eq(&self.frequency, &other.frequency) || self.frequency.matches(&other.frequency)
    }

    /// Fail with `FrequencyMismatch` unless `other` shares this grid
    pub fn check_same_grid(&self, other: &Network) -> Result<(), CalError> {
        if self.same_grid(other) {
            Ok(())
        } else {
            Err(CalError::FrequencyMismatch(format!(
                "{} has {} points ({:.6e}..{:.6e} Hz), {} has {} points ({:.6e}..{:.6e} Hz)",
                self.label(),
                self.nfreq(),
                self.frequency.start(),
                self.frequency.stop(),
                other.label(),
                other.nfreq(),
                other.frequency.start(),
                other.frequency.stop()
            )))
        }
    }

    /// Fail with `DimensionMismatch` unless this is an `nports`-port network
    pub fn check_nports(&self, nports: usize) -> Result<(), CalError> {
        if self.nports() == nports {
            Ok(())
        } else {
            Err(CalError::DimensionMismatch(format!(
                "{} is a {}-port, expected a {}-port",
                self.label(),
                self.nports(),
                nports
            )))
        }
    }

    pub(crate) fn check_ports(&self, port_out: usize, port_in: usize) -> Result<(), CalError> {
        let n = self.nports();
        for port in [port_out, port_in] {
            if port >= n {
                return Err(CalError::IndexOutOfRange { index: port, len: n });
            }
        }
        Ok(())
    }

    fn label(&self) -> &str {
        self.name.as_deref().unwrap_or("network")
    }
}
