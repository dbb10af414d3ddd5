//! One-port SOL (Short-Open-Load) calibration
//!
//! Each frequency point solves the bilinear 3-term model directly. With
//! `de = e00 * e11 - e10e01` the model is linear in `[e00, de, e11]`:
//!
//! ```text
//! [ 1  -Si  Sm*Si ] [ e00 ]   [ Sm ]
//! [ 1  -Oi  Om*Oi ] [ de  ] = [ Om ]
//! [ 1  -Li  Lm*Li ] [ e11 ]   [ Lm ]
//! ```

use nalgebra::{Matrix3, Vector3};
use num_complex::Complex64;
use tracing::{debug, warn};

use super::map_points;
use super::model::{CorrectedNetwork, ErrorModel, OnePortTerms};
use crate::config::CalibrationConfig;
use crate::error::CalError;
use crate::math::linalg::solve3;
use crate::network::Network;

pub type OnePortModel = ErrorModel<OnePortTerms>;

/// 3-term one-port calibrator
#[derive(Debug, Clone, Default)]
pub struct OnePort {
    config: CalibrationConfig,
    model: Option<OnePortModel>,
}

impl OnePort {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: CalibrationConfig) -> Self {
        Self {
            config,
            model: None,
        }
    }

    pub fn config(&self) -> &CalibrationConfig {
        &self.config
    }

    /// Fit the error model from three measured standards and their ideals
    ///
    /// Both arrays are ordered (short, open, load); any three standards with
    /// distinct reflections work. Points that cannot be solved are recorded
    /// as `SingularStandards` in the model instead of failing the fit.
    ///
    /// # Errors
    /// `DimensionMismatch` if a network is not a 1-port, `FrequencyMismatch`
    /// if the grids differ.
    pub fn fit(
        &mut self,
        measured: [&Network; 3],
        ideals: [&Network; 3],
    ) -> Result<&OnePortModel, CalError> {
        let reference = measured[0];
        for ntwk in measured.iter().chain(ideals.iter()) {
            ntwk.check_nports(1)?;
            reference.check_same_grid(ntwk)?;
        }

        let config = &self.config;
        let points = map_points(reference.nfreq(), config.parallel_threshold, |f| {
            let gm = measured.map(|n| n.s()[[f, 0, 0]]);
            let gi = ideals.map(|n| n.s()[[f, 0, 0]]);
            solve_point(f, gm, gi, config)
        });

        let model = OnePortModel::from_points(
            reference.frequency().clone(),
            points,
            config.parallel_threshold,
        );
        for e in model.failures() {
            warn!(
                index = ?e.frequency_index(),
                error = %e,
                "one-port fit failed at frequency point"
            );
        }
        debug!(
            npoints = model.nfreq(),
            failed = model.failures().len(),
            "one-port error model fitted"
        );

        Ok(self.model.insert(model))
    }

    /// The fitted model, `Uncalibrated` before [`OnePort::fit`]
    pub fn error_model(&self) -> Result<&OnePortModel, CalError> {
        self.model.as_ref().ok_or(CalError::Uncalibrated)
    }

    /// Correct a measured 1-port DUT
    ///
    /// `Gi = (Gm - e00) / (e10e01 + e11 * (Gm - e00))` at every point.
    pub fn apply_cal(&self, dut: &Network) -> Result<CorrectedNetwork, CalError> {
        let corrected = self.error_model()?.correct(dut)?;
        debug!(
            npoints = dut.nfreq(),
            failed = corrected.failures().len(),
            "one-port correction applied"
        );
        Ok(corrected)
    }
}

fn solve_point(
    index: usize,
    measured: [Complex64; 3],
    ideals: [Complex64; 3],
    config: &CalibrationConfig,
) -> Result<OnePortTerms, CalError> {
    let singular = CalError::SingularStandards { index };
    for (a, b) in [(0, 1), (0, 2), (1, 2)] {
        if (ideals[a] - ideals[b]).norm() <= config.distinct_tol {
            return Err(singular);
        }
    }

    let one = Complex64::new(1.0, 0.0);
    let [sm, om, lm] = measured;
    let [si, oi, li] = ideals;
    #[rustfmt::skip]
    let a = Matrix3::new(
        one, -si, sm * si,
        one, -oi, om * oi,
        one, -li, lm * li,
    );
    let b = Vector3::new(sm, om, lm);

    let x = solve3(&a, &b, config.singular_tol).ok_or(singular)?;
    let (e00, de, e11) = (x[0], x[1], x[2]);
    Ok(OnePortTerms {
        e00,
        e11,
        e10e01: e00 * e11 - de,
    })
}
