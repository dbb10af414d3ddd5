//! Derived network properties
//!
//! Magnitude and phase views of the S-parameters for display consumers.

use ndarray::{s, Array3};

use super::core::Network;
use crate::error::CalError;
use crate::math::conversions::{complex_2_db, complex_2_degree};

impl Network {
    /// Get S-parameter magnitude in dB
    #[inline]
    pub fn s_db(&self) -> Array3<f64> {
        self.s().mapv(complex_2_db)
    }

    /// Get S-parameter magnitude (linear)
    #[inline]
    pub fn s_mag(&self) -> Array3<f64> {
        self.s().mapv(|c| c.norm())
    }

    /// Get S-parameter phase in degrees
    #[inline]
    pub fn s_deg(&self) -> Array3<f64> {
        self.s().mapv(complex_2_degree)
    }

    /// 20*log10(|S[port_out][port_in]|), one value per frequency
    ///
    /// The iterator is computed lazily from the stored data; call again to
    /// restart it.
    pub fn magnitude_db(
        &self,
        port_out: usize,
        port_in: usize,
    ) -> Result<impl Iterator<Item = f64> + Clone + '_, CalError> {
        self.check_ports(port_out, port_in)?;
        Ok(self
            .s()
            .slice(s![.., port_out, port_in])
            .into_iter()
            .map(|c| complex_2_db(*c)))
    }

    /// Phase of S[port_out][port_in] in degrees, one value per frequency
    pub fn phase_deg(
        &self,
        port_out: usize,
        port_in: usize,
    ) -> Result<impl Iterator<Item = f64> + Clone + '_, CalError> {
        self.check_ports(port_out, port_in)?;
        Ok(self
            .s()
            .slice(s![.., port_out, port_in])
            .into_iter()
            .map(|c| complex_2_degree(*c)))
    }
}
