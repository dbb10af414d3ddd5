//! Network operations
//!
//! Two-port cascading.

use ndarray::Array3;
use num_complex::Complex64;

use super::core::Network;
use crate::error::CalError;
use crate::math::transforms::{cascade_s, from_matrix2, to_matrix2};

impl Network {
    /// Cascade with another network (self ** other)
    ///
    /// Only valid for 2-port networks. Connects port 2 of self to port 1 of other.
    ///
    /// # Errors
    /// `DimensionMismatch` for non 2-ports, `FrequencyMismatch` for different
    /// grids and `SingularErrorBox` if the internal loop gain is exactly one at
    /// some point.
    pub fn cascade(&self, other: &Network) -> Result<Network, CalError> {
        self.check_nports(2)?;
        other.check_nports(2)?;
        self.check_same_grid(other)?;

        let nfreq = self.nfreq();
        let mut s_result = Array3::<Complex64>::zeros((nfreq, 2, 2));

        for f in 0..nfreq {
            let s_a = to_matrix2(self.s_at(f));
            let s_b = to_matrix2(other.s_at(f));
            let s_ab = cascade_s(&s_a, &s_b).ok_or(CalError::SingularErrorBox { index: f })?;
            s_result
                .index_axis_mut(ndarray::Axis(0), f)
                .assign(&from_matrix2(&s_ab));
        }

        Network::new(self.frequency().clone(), s_result, self.z0().clone())
    }
}
