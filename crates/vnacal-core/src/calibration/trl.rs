//! TRL (Thru-Reflect-Line) calibration
//!
//! With the port-1 box X and port-2 box Y as T-matrices, every two-port
//! measurement reads `M = X * A * Y`. The thru (A = I) and the line
//! (A = diag(l, 1/l)) give
//!
//! ```text
//! P = M_line * inv(M_thru) = X * diag(l, 1/l) * inv(X)
//! ```
//!
//! so the columns of X are eigenvectors of P up to scale. Normalising
//! X[1][1] = 1 leaves one unknown k, fixed by the reflect measured on both
//! ports up to its sign. The sign is resolved from the known kind of the
//! reflect (short-like or open-like).

use std::f64::consts::PI;

use nalgebra::Matrix2;
use num_complex::Complex64;
use tracing::{debug, warn};

use super::map_points;
use super::model::{CorrectedNetwork, ErrorModel, TrlSolution, TrlTerms};
use crate::config::CalibrationConfig;
use crate::constants::{NEAR_ZERO, SPEED_OF_LIGHT};
use crate::error::CalError;
use crate::math::conversions::unwrap_rad;
use crate::math::linalg::{eig2, Eigen2};
use crate::math::transforms::{inverse2, s2t, to_matrix2};
use crate::network::Network;
use crate::standards::{LineEstimate, ReflectKind};

pub type TrlModel = ErrorModel<TrlTerms>;

/// Partial knowledge about the TRL standards
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TrlHints {
    /// Sign of the reflect; without it no root can be chosen
    pub reflect: Option<ReflectKind>,
    /// Approximate line, used to pick the forward propagation eigenvalue
    pub line: Option<LineEstimate>,
}

impl TrlHints {
    pub fn new(reflect: ReflectKind) -> Self {
        Self {
            reflect: Some(reflect),
            line: None,
        }
    }

    pub fn with_line(mut self, line: LineEstimate) -> Self {
        self.line = Some(line);
        self
    }
}

/// 7-term TRL calibrator
#[derive(Debug, Clone, Default)]
pub struct Trl {
    config: CalibrationConfig,
    model: Option<TrlModel>,
}

impl Trl {
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

    /// Fit the 7-term model from measured thru, reflect and line
    ///
    /// The reflect is the same unknown one-port on both ports (S21 = S12 = 0).
    /// Points where the line is degenerate with the thru, the root cannot be
    /// chosen or the standards are singular are recorded in the model.
    ///
    /// # Errors
    /// `DimensionMismatch` unless all three are 2-ports, `FrequencyMismatch`
    /// if the grids differ.
    pub fn fit(
        &mut self,
        thru: &Network,
        reflect: &Network,
        line: &Network,
        hints: &TrlHints,
    ) -> Result<&TrlModel, CalError> {
        for ntwk in [thru, reflect, line] {
            ntwk.check_nports(2)?;
            thru.check_same_grid(ntwk)?;
        }
        if hints.reflect.is_none() {
            warn!("TRL fit without a reflect kind, every root choice is ambiguous");
        }

        let config = &self.config;
        let f = thru.frequency().f();
        let points = map_points(thru.nfreq(), config.parallel_threshold, |i| {
            let gamma = (reflect.s()[[i, 0, 0]], reflect.s()[[i, 1, 1]]);
            solve_point(
                i,
                f[i],
                &to_matrix2(thru.s_at(i)),
                gamma,
                &to_matrix2(line.s_at(i)),
                hints,
                config,
            )
        });

        let model =
            TrlModel::from_points(thru.frequency().clone(), points, config.parallel_threshold);
        for e in model.failures() {
            warn!(index = ?e.frequency_index(), error = %e, "TRL fit failed at frequency point");
        }
        debug!(
            npoints = model.nfreq(),
            failed = model.failures().len(),
            line_hint = hints.line.is_some(),
            "TRL error model fitted"
        );

        Ok(self.model.insert(model))
    }

    /// The fitted model, `Uncalibrated` before [`Trl::fit`]
    pub fn error_model(&self) -> Result<&TrlModel, CalError> {
        self.model.as_ref().ok_or(CalError::Uncalibrated)
    }

    /// De-embed a measured 2-port DUT
    pub fn apply_cal(&self, dut: &Network) -> Result<CorrectedNetwork, CalError> {
        let corrected = self.error_model()?.correct(dut)?;
        debug!(
            npoints = dut.nfreq(),
            failed = corrected.failures().len(),
            "TRL correction applied"
        );
        Ok(corrected)
    }
}

impl ErrorModel<TrlTerms> {
    /// Solved exp(-gamma * length) per point, `None` where the fit failed
    pub fn line_propagation(&self) -> Vec<Option<Complex64>> {
        self.solutions().map(|s| s.map(|s| s.line_propagation)).collect()
    }

    /// Solved reflect coefficient per point, `None` where the fit failed
    pub fn reflect_coefficient(&self) -> Vec<Option<Complex64>> {
        self.solutions().map(|s| s.map(|s| s.reflect)).collect()
    }

    /// Effective relative permittivity of the line medium
    ///
    /// `length` is the line length minus the thru length, in metres. The
    /// propagation phase is unwrapped across the solved points, so the first
    /// of them must see less than one wavelength of line.
    pub fn effective_permittivity(&self, length: f64) -> Result<Vec<Option<f64>>, CalError> {
        if !length.is_finite() || length <= 0.0 {
            return Err(CalError::InvalidRange(format!(
                "line length must be positive, got {}",
                length
            )));
        }

        let solved: Vec<(usize, f64)> = self
            .solutions()
            .enumerate()
            .filter_map(|(i, s)| s.map(|s| (i, (-s.line_propagation.arg()).rem_euclid(2.0 * PI))))
            .collect();
        let phases: Vec<f64> = solved.iter().map(|&(_, p)| p).collect();
        let unwrapped = unwrap_rad(&phases);

        let f = self.frequency().f();
        let mut er = vec![None; self.nfreq()];
        for (&(i, _), theta) in solved.iter().zip(unwrapped) {
            let ratio = SPEED_OF_LIGHT * theta / (2.0 * PI * f[i] * length);
            er[i] = Some(ratio * ratio);
        }
        Ok(er)
    }

    fn solutions(&self) -> impl Iterator<Item = Option<TrlSolution>> + '_ {
        self.points()
            .iter()
            .map(|p| p.as_ref().ok().and_then(|t| t.solved))
    }
}

/// Index of the eigenvalue belonging to the forward wave exp(-gamma * l)
///
/// With an estimate, the eigenvalue closest to it. Otherwise the eigenvector
/// with the larger |v0 / v1|: that column of X is [-de, -e11] while the other
/// is [e00, 1], and |e00| < |de / e11| for any usable coupler.
fn forward_root(eig: &Eigen2, estimate: Option<Complex64>) -> usize {
    match estimate {
        Some(est) => {
            if (eig.values[0] - est).norm() <= (eig.values[1] - est).norm() {
                0
            } else {
                1
            }
        }
        None => {
            let [a, b] = eig.vectors;
            // |a0/a1| >= |b0/b1| without dividing
            if a[0].norm() * b[1].norm() >= b[0].norm() * a[1].norm() {
                0
            } else {
                1
            }
        }
    }
}

#[inline]
fn checked_div(num: Complex64, den: Complex64) -> Option<Complex64> {
    if den.norm() < NEAR_ZERO {
        None
    } else {
        Some(num / den)
    }
}

fn solve_point(
    index: usize,
    f_hz: f64,
    thru: &Matrix2<Complex64>,
    reflect: (Complex64, Complex64),
    line: &Matrix2<Complex64>,
    hints: &TrlHints,
    config: &CalibrationConfig,
) -> Result<TrlTerms, CalError> {
    let singular = || CalError::SingularStandards { index };

    let t_thru = s2t(thru).ok_or_else(singular)?;
    let t_line = s2t(line).ok_or_else(singular)?;
    let t_thru_inv = inverse2(&t_thru).ok_or_else(singular)?;

    let eig = eig2(&(t_line * t_thru_inv));
    if eig.separation() <= config.degenerate_line_tol {
        return Err(CalError::DegenerateLine { index });
    }

    let fwd = forward_root(&eig, hints.line.map(|l| l.propagation(f_hz)));
    let (v1, v2) = (eig.vectors[fwd], eig.vectors[1 - fwd]);
    let v = Matrix2::new(v1[0], v2[0], v1[1], v2[1]);
    let (v11, v12, v21, v22) = (v[(0, 0)], v[(0, 1)], v[(1, 0)], v[(1, 1)]);
    let c = inverse2(&v).ok_or_else(singular)? * t_thru;
    let (c11, c12, c21, c22) = (c[(0, 0)], c[(0, 1)], c[(1, 0)], c[(1, 1)]);

    // u = k * G from port 1, w = G / k from port 2
    let (g1, g2) = reflect;
    let u = checked_div(v12 - g1 * v22, g1 * v21 - v11).ok_or_else(singular)?;
    let w = checked_div(c21 + g2 * c22, c11 + g2 * c12).ok_or_else(singular)?;
    let k = checked_div(u, w).ok_or_else(singular)?.sqrt();
    if k.norm() < NEAR_ZERO {
        return Err(singular());
    }

    let kind = hints.reflect.ok_or(CalError::AmbiguousRoot { index })?;
    let (k, gamma) = match kind.agrees_with(u / k, config.sign_tol) {
        Some(true) => (k, u / k),
        Some(false) => (-k, -u / k),
        None => return Err(CalError::AmbiguousRoot { index }),
    };

    if v22.norm() < NEAR_ZERO || c22.norm() < NEAR_ZERO {
        return Err(singular());
    }
    let e00 = v12 / v22;
    let e11 = -v21 * k / v22;
    let de = -v11 * k / v22;
    let e22 = c12 / (k * c22);
    let e33 = -c21 / c22;
    let df = -c11 / (k * c22);

    Ok(TrlTerms {
        e00,
        e11,
        e10e01: e00 * e11 - de,
        e22,
        e33,
        e23e32: e22 * e33 - df,
        e10e32: (v22 * c22).inv(),
        solved: Some(TrlSolution {
            line_propagation: eig.values[fwd],
            reflect: gamma,
        }),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frequency::{Frequency, FrequencyUnit, SweepType};
    use crate::standards;
    use approx::assert_relative_eq;
    use std::sync::Arc;

    fn c(re: f64, im: f64) -> Complex64 {
        Complex64::new(re, im)
    }

    fn grid(n: usize) -> Arc<Frequency> {
        Arc::new(Frequency::new(1.0, 5.0, n, FrequencyUnit::GHz, SweepType::Linear).unwrap())
    }

    #[test]
    fn test_ideal_instrument() {
        let freq = grid(5);
        let thru = standards::thru(&freq).unwrap();
        let reflect = standards::reflect(&freq, c(-1.0, 0.0)).unwrap();
        let line = standards::line(&freq, 0.01, 1.0).unwrap();

        let mut cal = Trl::new();
        let model = cal
            .fit(&thru, &reflect, &line, &TrlHints::new(ReflectKind::Short))
            .unwrap();
        assert!(model.is_complete());
        for i in 0..freq.npoints() {
            let t = model.terms(i).unwrap();
            for term in [t.e00, t.e11, t.e22, t.e33] {
                assert_relative_eq!(term.norm(), 0.0, epsilon = 1e-12);
            }
            for term in [t.e10e01, t.e23e32, t.e10e32] {
                assert_relative_eq!(term.re, 1.0, epsilon = 1e-12);
                assert_relative_eq!(term.im, 0.0, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_forward_root_with_estimate() {
        let l = Complex64::from_polar(1.0, -1.0);
        let p = Matrix2::new(l.inv(), c(0.0, 0.0), c(0.0, 0.0), l);
        let eig = eig2(&p);
        let k = forward_root(&eig, Some(Complex64::from_polar(1.0, -0.9)));
        assert_relative_eq!((eig.values[k] - l).norm(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_missing_kind_is_ambiguous() {
        let freq = grid(3);
        let thru = standards::thru(&freq).unwrap();
        let reflect = standards::reflect(&freq, c(-1.0, 0.0)).unwrap();
        let line = standards::line(&freq, 0.01, 1.0).unwrap();

        let mut cal = Trl::new();
        let model = cal
            .fit(&thru, &reflect, &line, &TrlHints::default())
            .unwrap();
        assert_eq!(
            model.terms(2).unwrap_err(),
            CalError::AmbiguousRoot { index: 2 }
        );
        assert_eq!(model.failures().len(), 3);
    }

    #[test]
    fn test_purely_reactive_reflect_is_ambiguous() {
        let freq = grid(2);
        let thru = standards::thru(&freq).unwrap();
        let reflect = standards::reflect(&freq, c(0.0, 1.0)).unwrap();
        let line = standards::line(&freq, 0.01, 1.0).unwrap();

        let mut cal = Trl::new();
        let model = cal
            .fit(&thru, &reflect, &line, &TrlHints::new(ReflectKind::Open))
            .unwrap();
        assert_eq!(
            model.terms(0).unwrap_err(),
            CalError::AmbiguousRoot { index: 0 }
        );
    }

    #[test]
    fn test_fit_rejects_one_port() {
        let freq = grid(3);
        let thru = standards::thru(&freq).unwrap();
        let short = standards::short(&freq).unwrap();
        let mut cal = Trl::new();
        assert!(matches!(
            cal.fit(&thru, &short, &thru, &TrlHints::new(ReflectKind::Short)),
            Err(CalError::DimensionMismatch(_))
        ));
        assert_eq!(cal.error_model().unwrap_err(), CalError::Uncalibrated);
    }

    #[test]
    fn test_effective_permittivity_rejects_bad_length() {
        let freq = grid(2);
        let model = TrlModel::from_points(freq, Vec::new(), 1);
        assert!(matches!(
            model.effective_permittivity(0.0),
            Err(CalError::InvalidRange(_))
        ));
    }
}
