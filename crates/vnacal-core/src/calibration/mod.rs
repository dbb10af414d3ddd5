//! Calibration module
//!
//! Error-model fitting from measured standards and correction of DUT
//! measurements. Every frequency point is solved independently; sweeps with
//! at least `parallel_threshold` points are spread over the rayon pool.
//!
//! - [`OnePort`]: 3-term short/open/load calibration
//! - [`Trl`]: 7-term thru/reflect/line calibration

pub mod model;
pub mod one_port;
pub mod trl;

pub use model::{CorrectedNetwork, ErrorModel, ErrorTerms, OnePortTerms, TrlSolution, TrlTerms};
pub use one_port::{OnePort, OnePortModel};
pub use trl::{Trl, TrlHints, TrlModel};

use rayon::prelude::*;

/// Evaluate `op` for every frequency index, in order
///
/// Runs on the rayon pool once `n` reaches `threshold`. The indexed collect
/// keeps the output identical to the sequential path.
pub(crate) fn map_points<T, F>(n: usize, threshold: usize, op: F) -> Vec<T>
where
    T: Send,
    F: Fn(usize) -> T + Sync + Send,
{
    if n >= threshold {
        (0..n).into_par_iter().map(op).collect()
    } else {
        (0..n).map(op).collect()
    }
}
