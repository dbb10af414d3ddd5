//! Touchstone file I/O module
//!
//! Provides reading and writing of Touchstone v1 (.snp) files.

pub mod parser;
pub mod writer;

pub use parser::{OptionLine, SParamFormat, Touchstone, TouchstoneError};
