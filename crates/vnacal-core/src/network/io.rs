//! Network I/O functions
//!
//! Conversion between networks and Touchstone records.

use std::path::Path;
use std::sync::Arc;

use ndarray::Array1;
use num_complex::Complex64;

use super::core::Network;
use crate::touchstone::{SParamFormat, Touchstone, TouchstoneError};

impl Network {
    /// Create from a Touchstone file (port count from the `.sNp` extension)
    pub fn from_touchstone<P: AsRef<Path>>(path: P) -> Result<Self, TouchstoneError> {
        let ts = Touchstone::from_file(path)?;
        Self::from_touchstone_data(ts)
    }

    /// Create from Touchstone content string
    ///
    /// # Arguments
    /// * `content` - Touchstone file content as string
    /// * `nports` - Number of ports (typically derived from file extension, e.g., .s2p = 2 ports)
    pub fn from_touchstone_str(content: &str, nports: usize) -> Result<Self, TouchstoneError> {
        let ts = Touchstone::from_str(content, nports)?;
        Self::from_touchstone_data(ts)
    }

    fn from_touchstone_data(ts: Touchstone) -> Result<Self, TouchstoneError> {
        let z0 = Array1::from_elem(ts.nports, Complex64::new(ts.z0, 0.0));
        let name = ts.comments.first().cloned();
        let ntwk = Network::new(Arc::new(ts.frequency), ts.s, z0)?;
        Ok(match name {
            Some(name) => ntwk.with_name(name),
            None => ntwk,
        })
    }

    /// Write the network to a Touchstone file
    ///
    /// # Arguments
    /// * `path` - Path to output file (should have .sNp extension)
    /// * `format` - Output format (MA, DB or RI)
    /// * `precision` - Decimals per value
    pub fn write_touchstone<P: AsRef<Path>>(
        &self,
        path: P,
        format: SParamFormat,
        precision: usize,
    ) -> Result<(), TouchstoneError> {
        self.to_touchstone(format, precision).write(path)
    }

    /// Render the network as Touchstone text
    pub fn to_touchstone_string(&self, format: SParamFormat, precision: usize) -> String {
        self.to_touchstone(format, precision).to_string()
    }

    /// Convert Network to Touchstone format
    ///
    /// Touchstone v1 carries a single reference impedance; port 1's is used.
    pub fn to_touchstone(&self, format: SParamFormat, precision: usize) -> Touchstone {
        Touchstone {
            nports: self.nports(),
            frequency: self.frequency().as_ref().clone(),
            s: self.s().clone(),
            z0: self.z0()[0].re,
            comments: self.name().map(|n| vec![n.to_string()]).unwrap_or_default(),
            format,
            precision,
        }
    }
}
