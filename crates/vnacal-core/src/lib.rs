//! vnacal-core: Vector network analyzer calibration engine
//!
//! Fits error models from measured calibration standards and removes them
//! from device-under-test measurements.
//!
//! ## Modules
//!
//! - `frequency` - Frequency grid shared by every network of a session
//! - `network` - N-port S-parameter data, cascading and Touchstone I/O
//! - `standards` - Ideal responses of short/open/load/thru/line/reflect
//! - `calibration` - One-port SOL and two-port TRL calibrators
//! - `touchstone` - Touchstone v1 (`.s1p`/`.s2p`) reader and writer
//! - `math` - Conversions, S/T transforms and 2x2/3x3 linear algebra
//! - `config` - Numerical tolerances loaded from TOML
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use vnacal_core::{standards, Frequency, FrequencyUnit, Network, OnePort, SweepType};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let freq = Arc::new(Frequency::new(1.0, 10.0, 101, FrequencyUnit::GHz, SweepType::Linear)?);
//! let short = Network::from_touchstone("short.s1p")?;
//! let open = Network::from_touchstone("open.s1p")?;
//! let load = Network::from_touchstone("load.s1p")?;
//!
//! let mut cal = OnePort::new();
//! cal.fit(
//!     [&short, &open, &load],
//!     [&standards::short(&freq)?, &standards::open(&freq)?, &standards::load(&freq)?],
//! )?;
//! let dut = cal.apply_cal(&Network::from_touchstone("dut.s1p")?)?.into_network()?;
//! # Ok(())
//! # }
//! ```

pub mod calibration;
pub mod config;
pub mod constants;
pub mod error;
pub mod frequency;
pub mod math;
pub mod network;
pub mod standards;
pub mod touchstone;

pub use calibration::{
    CorrectedNetwork, ErrorModel, ErrorTerms, OnePort, OnePortModel, OnePortTerms, Trl, TrlHints,
    TrlModel, TrlTerms,
};
pub use config::{CalibrationConfig, ConfigError};
pub use error::CalError;
pub use frequency::{Frequency, FrequencyUnit, SweepType};
pub use network::Network;
pub use standards::{LineEstimate, ReflectKind};
pub use touchstone::{SParamFormat, TouchstoneError};
