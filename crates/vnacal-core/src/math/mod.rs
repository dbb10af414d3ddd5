//! Mathematical functions module
//!
//! Unit conversions, two-port S/T transforms and the small fixed-size linear
//! algebra used by the calibrators.

pub mod conversions;
pub mod linalg;
pub mod transforms;

pub use conversions::*;
