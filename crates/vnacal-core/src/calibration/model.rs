//! Error models
//!
//! An [`ErrorModel`] holds one set of error terms per frequency point, or the
//! error that prevented solving that point. The per-point terms implement
//! [`ErrorTerms`], which maps a measured S-matrix to the actual one and back.

use std::sync::Arc;

use nalgebra::Matrix2;
use ndarray::{arr2, Array2, Array3, ArrayView2, Axis};
use num_complex::Complex64;
use tracing::warn;

use super::map_points;
use crate::constants::{NEAR_ZERO, PARALLEL_THRESHOLD};
use crate::error::CalError;
use crate::frequency::Frequency;
use crate::math::transforms::{cascade_s, from_matrix2, inverse2, t2s, to_matrix2};
use crate::network::Network;

/// Error terms valid at a single frequency point
pub trait ErrorTerms: Clone + Send + Sync + std::fmt::Debug {
    /// Port count of the networks these terms correct
    const NPORTS: usize;

    /// Measured S-matrix to actual S-matrix (the inverse model)
    fn correct(
        &self,
        index: usize,
        measured: ArrayView2<Complex64>,
    ) -> Result<Array2<Complex64>, CalError>;

    /// Actual S-matrix to what the instrument would measure (the forward model)
    fn embed(
        &self,
        index: usize,
        actual: ArrayView2<Complex64>,
    ) -> Result<Array2<Complex64>, CalError>;
}

/// 3-term one-port error model
///
/// ```text
/// Gm = e00 + e10e01 * G / (1 - e11 * G)
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OnePortTerms {
    /// Directivity
    pub e00: Complex64,
    /// Source match
    pub e11: Complex64,
    /// Reflection tracking
    pub e10e01: Complex64,
}

impl OnePortTerms {
    /// Terms of a perfect instrument
    pub fn ideal() -> Self {
        Self {
            e00: Complex64::new(0.0, 0.0),
            e11: Complex64::new(0.0, 0.0),
            e10e01: Complex64::new(1.0, 0.0),
        }
    }

    /// e00 * e11 - e10e01
    #[inline]
    pub fn delta(&self) -> Complex64 {
        self.e00 * self.e11 - self.e10e01
    }

    /// Actual reflection from a measured one, `None` if the model is singular there
    pub fn correct_gamma(&self, measured: Complex64) -> Option<Complex64> {
        let num = measured - self.e00;
        let den = self.e10e01 + self.e11 * num;
        if den.norm() < NEAR_ZERO {
            return None;
        }
        Some(num / den)
    }

    /// Measured reflection for an actual one
    pub fn embed_gamma(&self, actual: Complex64) -> Option<Complex64> {
        let den = Complex64::new(1.0, 0.0) - self.e11 * actual;
        if den.norm() < NEAR_ZERO {
            return None;
        }
        Some(self.e00 + self.e10e01 * actual / den)
    }
}

impl ErrorTerms for OnePortTerms {
    const NPORTS: usize = 1;

    fn correct(
        &self,
        index: usize,
        measured: ArrayView2<Complex64>,
    ) -> Result<Array2<Complex64>, CalError> {
        self.correct_gamma(measured[[0, 0]])
            .map(|g| arr2(&[[g]]))
            .ok_or(CalError::SingularErrorBox { index })
    }

    fn embed(
        &self,
        index: usize,
        actual: ArrayView2<Complex64>,
    ) -> Result<Array2<Complex64>, CalError> {
        self.embed_gamma(actual[[0, 0]])
            .map(|g| arr2(&[[g]]))
            .ok_or(CalError::SingularErrorBox { index })
    }
}

/// Quantities a TRL fit solves for besides the error terms
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrlSolution {
    /// exp(-gamma * length) of the line relative to the thru
    pub line_propagation: Complex64,
    /// Reflection coefficient of the reflect standard
    pub reflect: Complex64,
}

/// 7-term two-port error model (error boxes X at port 1 and Y at port 2)
///
/// Box X is normalised to e10 = 1:
///
/// ```text
/// S_X = | e00  e10e01 |     T_Y = 1/e10e32 * | -(e22 e33 - e23e32)  e22 |
///       | 1    e11    |                      | -e33                 1   |
/// ```
///
/// Y is oriented with its port 1 facing the DUT.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrlTerms {
    pub e00: Complex64,
    pub e11: Complex64,
    pub e10e01: Complex64,
    pub e22: Complex64,
    pub e33: Complex64,
    pub e23e32: Complex64,
    /// Forward transmission tracking
    pub e10e32: Complex64,
    /// Present when the terms come from a TRL fit
    pub solved: Option<TrlSolution>,
}

impl TrlTerms {
    /// Port-1 reflection model (directivity e00, source match e11)
    pub fn port1(&self) -> OnePortTerms {
        OnePortTerms {
            e00: self.e00,
            e11: self.e11,
            e10e01: self.e10e01,
        }
    }

    /// Port-2 reflection model as seen from the instrument (directivity e33, source match e22)
    pub fn port2(&self) -> OnePortTerms {
        OnePortTerms {
            e00: self.e33,
            e11: self.e22,
            e10e01: self.e23e32,
        }
    }

    /// Reverse transmission tracking e23e01
    pub fn e23e01(&self) -> Option<Complex64> {
        if self.e10e32.norm() < NEAR_ZERO {
            return None;
        }
        Some(self.e10e01 * self.e23e32 / self.e10e32)
    }

    /// Box X as an S-matrix
    pub fn box_x(&self) -> Matrix2<Complex64> {
        Matrix2::new(self.e00, self.e10e01, Complex64::new(1.0, 0.0), self.e11)
    }

    /// Box Y as an S-matrix, `None` without forward transmission
    pub fn box_y(&self) -> Option<Matrix2<Complex64>> {
        if self.e10e32.norm() < NEAR_ZERO {
            return None;
        }
        Some(Matrix2::new(
            self.e22,
            self.e23e32 / self.e10e32,
            self.e10e32,
            self.e33,
        ))
    }

    fn box_x_t(&self) -> Matrix2<Complex64> {
        let one = Complex64::new(1.0, 0.0);
        Matrix2::new(-self.port1().delta(), self.e00, -self.e11, one)
    }

    fn box_y_t(&self) -> Option<Matrix2<Complex64>> {
        if self.e10e32.norm() < NEAR_ZERO {
            return None;
        }
        let one = Complex64::new(1.0, 0.0);
        let delta_f = self.e22 * self.e33 - self.e23e32;
        Some(Matrix2::new(-delta_f, self.e22, -self.e33, one) / self.e10e32)
    }
}

impl ErrorTerms for TrlTerms {
    const NPORTS: usize = 2;

    /// inv(X) * DUT * inv(Y), cascaded in the S domain
    fn correct(
        &self,
        index: usize,
        measured: ArrayView2<Complex64>,
    ) -> Result<Array2<Complex64>, CalError> {
        let singular = CalError::SingularErrorBox { index };
        let x_inv = inverse2(&self.box_x_t())
            .and_then(|t| t2s(&t))
            .ok_or_else(|| singular.clone())?;
        let y_inv = self
            .box_y_t()
            .and_then(|t| inverse2(&t))
            .and_then(|t| t2s(&t))
            .ok_or_else(|| singular.clone())?;

        cascade_s(&x_inv, &to_matrix2(measured))
            .and_then(|s| cascade_s(&s, &y_inv))
            .map(|s| from_matrix2(&s))
            .ok_or(singular)
    }

    fn embed(
        &self,
        index: usize,
        actual: ArrayView2<Complex64>,
    ) -> Result<Array2<Complex64>, CalError> {
        let singular = CalError::SingularErrorBox { index };
        let y = self.box_y().ok_or_else(|| singular.clone())?;
        cascade_s(&self.box_x(), &to_matrix2(actual))
            .and_then(|s| cascade_s(&s, &y))
            .map(|s| from_matrix2(&s))
            .ok_or(singular)
    }
}

/// Per-point error terms on a frequency grid
#[derive(Debug, Clone)]
pub struct ErrorModel<T> {
    frequency: Arc<Frequency>,
    points: Vec<Result<T, CalError>>,
    parallel_threshold: usize,
}

impl<T: ErrorTerms> ErrorModel<T> {
    pub(crate) fn from_points(
        frequency: Arc<Frequency>,
        points: Vec<Result<T, CalError>>,
        parallel_threshold: usize,
    ) -> Self {
        Self {
            frequency,
            points,
            parallel_threshold,
        }
    }

    /// Build a model from known terms, e.g. to synthesise measurements
    pub fn from_terms(frequency: Arc<Frequency>, terms: Vec<T>) -> Result<Self, CalError> {
        if terms.len() != frequency.npoints() {
            return Err(CalError::DimensionMismatch(format!(
                "{} error term sets for {} frequency points",
                terms.len(),
                frequency.npoints()
            )));
        }
        Ok(Self::from_points(
            frequency,
            terms.into_iter().map(Ok).collect(),
            PARALLEL_THRESHOLD,
        ))
    }

    /// Same model, processed on the rayon pool from `threshold` points on
    pub fn with_parallel_threshold(mut self, threshold: usize) -> Self {
        self.parallel_threshold = threshold;
        self
    }

    #[inline]
    pub fn frequency(&self) -> &Arc<Frequency> {
        &self.frequency
    }

    #[inline]
    pub fn nfreq(&self) -> usize {
        self.points.len()
    }

    /// Per-point terms or the error that prevented solving them
    #[inline]
    pub fn points(&self) -> &[Result<T, CalError>] {
        &self.points
    }

    /// Terms at frequency index `index`
    ///
    /// # Errors
    /// `IndexOutOfRange` for a bad index, otherwise the error recorded when
    /// the point could not be solved.
    pub fn terms(&self, index: usize) -> Result<&T, CalError> {
        match self.points.get(index) {
            Some(Ok(terms)) => Ok(terms),
            Some(Err(e)) => Err(e.clone()),
            None => Err(CalError::IndexOutOfRange {
                index,
                len: self.points.len(),
            }),
        }
    }

    /// Errors of the points that could not be solved
    pub fn failures(&self) -> Vec<&CalError> {
        self.points.iter().filter_map(|p| p.as_ref().err()).collect()
    }

    /// Whether every point was solved
    pub fn is_complete(&self) -> bool {
        self.points.iter().all(Result::is_ok)
    }

    /// Correct a measured DUT
    ///
    /// Structural problems fail the call. Points whose terms are missing or
    /// whose correction is singular are NaN in the result and listed in
    /// [`CorrectedNetwork::failures`].
    pub fn correct(&self, measured: &Network) -> Result<CorrectedNetwork, CalError> {
        let (s, failures) = self.map_network(measured, |terms, f, m| terms.correct(f, m))?;
        for e in &failures {
            warn!(index = ?e.frequency_index(), error = %e, "frequency point not corrected");
        }

        let network = Network::new(self.frequency.clone(), s, measured.z0().clone())?;
        let network = match measured.name() {
            Some(name) => network.with_name(name),
            None => network,
        };
        Ok(CorrectedNetwork { network, failures })
    }

    /// What the instrument described by this model would measure for `actual`
    ///
    /// # Errors
    /// Fails with the first per-point error if any point cannot be embedded.
    pub fn embed(&self, actual: &Network) -> Result<Network, CalError> {
        let (s, failures) = self.map_network(actual, |terms, f, a| terms.embed(f, a))?;
        if let Some(first) = failures.into_iter().next() {
            return Err(first);
        }
        let network = Network::new(self.frequency.clone(), s, actual.z0().clone())?;
        Ok(match actual.name() {
            Some(name) => network.with_name(name),
            None => network,
        })
    }

    fn map_network<F>(
        &self,
        input: &Network,
        op: F,
    ) -> Result<(Array3<Complex64>, Vec<CalError>), CalError>
    where
        F: Fn(&T, usize, ArrayView2<Complex64>) -> Result<Array2<Complex64>, CalError>
            + Sync
            + Send,
    {
        input.check_nports(T::NPORTS)?;
        self.check_grid(input)?;

        let n = self.points.len();
        let results = map_points(n, self.parallel_threshold, |f| match &self.points[f] {
            Ok(terms) => op(terms, f, input.s_at(f)),
            Err(e) => Err(e.clone()),
        });

        let nan = Complex64::new(f64::NAN, f64::NAN);
        let mut s = Array3::from_elem((n, T::NPORTS, T::NPORTS), nan);
        let mut failures = Vec::new();
        for (f, result) in results.into_iter().enumerate() {
            match result {
                Ok(m) => s.index_axis_mut(Axis(0), f).assign(&m),
                Err(e) => failures.push(e),
            }
        }
        Ok((s, failures))
    }

    fn check_grid(&self, ntwk: &Network) -> Result<(), CalError> {
        if Arc::ptr_eq(&self.frequency, ntwk.frequency())
            || self.frequency.matches(ntwk.frequency())
        {
            return Ok(());
        }
        Err(CalError::FrequencyMismatch(format!(
            "error model has {} points ({:.6e}..{:.6e} Hz), {} has {} points",
            self.frequency.npoints(),
            self.frequency.start(),
            self.frequency.stop(),
            ntwk.name().unwrap_or("network"),
            ntwk.nfreq()
        )))
    }
}

/// Result of applying a calibration
///
/// Points listed in `failures` hold NaN in the network.
#[derive(Debug, Clone)]
pub struct CorrectedNetwork {
    network: Network,
    failures: Vec<CalError>,
}

impl CorrectedNetwork {
    #[inline]
    pub fn network(&self) -> &Network {
        &self.network
    }

    /// Per-point errors in frequency order
    #[inline]
    pub fn failures(&self) -> &[CalError] {
        &self.failures
    }

    #[inline]
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// The corrected network, or the first per-point failure
    pub fn into_network(self) -> Result<Network, CalError> {
        match self.failures.into_iter().next() {
            Some(first) => Err(first),
            None => Ok(self.network),
        }
    }

    pub fn into_parts(self) -> (Network, Vec<CalError>) {
        (self.network, self.failures)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frequency::{FrequencyUnit, SweepType};
    use approx::assert_relative_eq;

    fn c(re: f64, im: f64) -> Complex64 {
        Complex64::new(re, im)
    }

    fn grid(n: usize) -> Arc<Frequency> {
        Arc::new(Frequency::new(1.0, 2.0, n, FrequencyUnit::GHz, SweepType::Linear).unwrap())
    }

    fn sample_trl() -> TrlTerms {
        TrlTerms {
            e00: c(0.1, 0.05),
            e11: c(0.05, -0.1),
            e10e01: c(0.8, 0.1),
            e22: c(-0.07, 0.02),
            e33: c(0.03, 0.06),
            e23e32: c(0.75, -0.2),
            e10e32: c(0.85, 0.05),
            solved: None,
        }
    }

    #[test]
    fn test_one_port_terms_inverse() {
        let terms = OnePortTerms {
            e00: c(0.05, 0.02),
            e11: c(0.1, -0.05),
            e10e01: c(0.9, 0.1),
        };
        let actual = c(0.3, -0.4);
        let measured = terms.embed_gamma(actual).unwrap();
        let back = terms.correct_gamma(measured).unwrap();
        assert_relative_eq!(back.re, actual.re, epsilon = 1e-12);
        assert_relative_eq!(back.im, actual.im, epsilon = 1e-12);
    }

    #[test]
    fn test_one_port_singular_point() {
        let terms = OnePortTerms {
            e00: c(0.0, 0.0),
            e11: c(1.0, 0.0),
            e10e01: c(0.0, 0.0),
        };
        let err = terms.correct(4, arr2(&[[c(0.0, 0.0)]]).view()).unwrap_err();
        assert_eq!(err, CalError::SingularErrorBox { index: 4 });
    }

    #[test]
    fn test_trl_terms_box_t_matches_s() {
        let terms = sample_trl();
        let x_t = crate::math::transforms::s2t(&terms.box_x()).unwrap();
        let y_t = crate::math::transforms::s2t(&terms.box_y().unwrap()).unwrap();
        for (a, b) in x_t.iter().zip(terms.box_x_t().iter()) {
            assert_relative_eq!(a.re, b.re, epsilon = 1e-12);
            assert_relative_eq!(a.im, b.im, epsilon = 1e-12);
        }
        for (a, b) in y_t.iter().zip(terms.box_y_t().unwrap().iter()) {
            assert_relative_eq!(a.re, b.re, epsilon = 1e-12);
            assert_relative_eq!(a.im, b.im, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_trl_terms_correct_undoes_embed() {
        let terms = sample_trl();
        let dut = arr2(&[[c(0.2, 0.1), c(0.6, -0.3)], [c(0.6, -0.3), c(-0.1, 0.25)]]);
        let measured = terms.embed(0, dut.view()).unwrap();
        let back = terms.correct(0, measured.view()).unwrap();
        for (a, b) in back.iter().zip(dut.iter()) {
            assert_relative_eq!(a.re, b.re, epsilon = 1e-12);
            assert_relative_eq!(a.im, b.im, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_trl_terms_correct_isolating_dut() {
        let terms = sample_trl();
        let dut = arr2(&[[c(-1.0, 0.0), c(0.0, 0.0)], [c(0.0, 0.0), c(1.0, 0.0)]]);
        let measured = terms.embed(0, dut.view()).unwrap();
        let back = terms.correct(0, measured.view()).unwrap();
        assert_relative_eq!(back[[0, 0]].re, -1.0, epsilon = 1e-12);
        assert_relative_eq!(back[[1, 1]].re, 1.0, epsilon = 1e-12);
        assert_relative_eq!(back[[1, 0]].norm(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_model_records_failures() {
        let freq = grid(3);
        let points = vec![
            Ok(OnePortTerms::ideal()),
            Err(CalError::SingularStandards { index: 1 }),
            Ok(OnePortTerms::ideal()),
        ];
        let model = ErrorModel::from_points(freq.clone(), points, PARALLEL_THRESHOLD);
        assert!(!model.is_complete());
        assert_eq!(model.failures(), vec![&CalError::SingularStandards { index: 1 }]);
        assert_eq!(model.terms(1), Err(CalError::SingularStandards { index: 1 }));
        assert_eq!(
            model.terms(3),
            Err(CalError::IndexOutOfRange { index: 3, len: 3 })
        );

        let dut = Network::constant(freq, arr2(&[[c(0.5, 0.0)]]).view()).unwrap();
        let corrected = model.correct(&dut).unwrap();
        assert_eq!(corrected.failures().len(), 1);
        assert!(corrected.network().s()[[1, 0, 0]].re.is_nan());
        assert_relative_eq!(corrected.network().s()[[2, 0, 0]].re, 0.5);
        assert_eq!(
            corrected.into_network().unwrap_err(),
            CalError::SingularStandards { index: 1 }
        );
    }

    #[test]
    fn test_model_rejects_other_grid() {
        let model = ErrorModel::from_terms(grid(3), vec![OnePortTerms::ideal(); 3]).unwrap();
        let dut = Network::constant(grid(4), arr2(&[[c(0.5, 0.0)]]).view()).unwrap();
        assert!(matches!(
            model.correct(&dut),
            Err(CalError::FrequencyMismatch(_))
        ));
        assert!(matches!(
            ErrorModel::from_terms(grid(3), vec![OnePortTerms::ideal(); 2]),
            Err(CalError::DimensionMismatch(_))
        ));
    }
}
