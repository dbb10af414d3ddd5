//! Network module - N-port electrical network representation
//!
//! Provides the core Network struct and the operations calibration needs:
//! derived magnitude/phase views, two-port cascading and Touchstone I/O.

mod core;
mod derived;
mod io;
mod operators;

pub use core::{Network, DEFAULT_Z0};
