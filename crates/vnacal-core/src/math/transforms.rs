//! Two-port S <-> T transformations and cascading
//!
//! All functions work on fixed-size `nalgebra::Matrix2<Complex64>` values for a
//! single frequency point. T-parameters follow the wave convention
//! `[b1, a1]^T = T [a2, b2]^T`, so cascading two networks multiplies their
//! T-matrices left to right:
//!
//! ```text
//! T = 1/S21 * | -(S11 S22 - S12 S21)   S11 |
//!             |  -S22                  1   |
//! ```

use nalgebra::Matrix2;
use ndarray::{Array2, ArrayView2};
use num_complex::Complex64;

use crate::constants::NEAR_ZERO;

/// Copy a 2x2 ndarray view into a fixed-size matrix
#[inline]
pub fn to_matrix2(s: ArrayView2<Complex64>) -> Matrix2<Complex64> {
    Matrix2::new(s[[0, 0]], s[[0, 1]], s[[1, 0]], s[[1, 1]])
}

/// Copy a fixed-size matrix into an owned ndarray
#[inline]
pub fn from_matrix2(m: &Matrix2<Complex64>) -> Array2<Complex64> {
    Array2::from_shape_fn((2, 2), |(i, j)| m[(i, j)])
}

/// Convert S-parameters to T-parameters
///
/// Returns `None` when S21 vanishes (no transmission, T undefined).
pub fn s2t(s: &Matrix2<Complex64>) -> Option<Matrix2<Complex64>> {
    let (s11, s12, s21, s22) = (s[(0, 0)], s[(0, 1)], s[(1, 0)], s[(1, 1)]);
    if s21.norm() < NEAR_ZERO {
        return None;
    }
    let det = s11 * s22 - s12 * s21;
    let one = Complex64::new(1.0, 0.0);
    Some(Matrix2::new(-det, s11, -s22, one) / s21)
}

/// Convert T-parameters to S-parameters
///
/// Returns `None` when T22 vanishes.
pub fn t2s(t: &Matrix2<Complex64>) -> Option<Matrix2<Complex64>> {
    let (t11, t12, t21, t22) = (t[(0, 0)], t[(0, 1)], t[(1, 0)], t[(1, 1)]);
    if t22.norm() < NEAR_ZERO {
        return None;
    }
    let det = t11 * t22 - t12 * t21;
    let one = Complex64::new(1.0, 0.0);
    Some(Matrix2::new(t12, det, one, -t21) / t22)
}

/// Invert a 2x2 complex matrix
///
/// Returns `None` when the determinant is negligible relative to the entries.
pub fn inverse2(m: &Matrix2<Complex64>) -> Option<Matrix2<Complex64>> {
    let (a, b, c, d) = (m[(0, 0)], m[(0, 1)], m[(1, 0)], m[(1, 1)]);
    let det = a * d - b * c;
    let scale = m.iter().map(|x| x.norm()).fold(0.0_f64, f64::max);
    if scale == 0.0 || det.norm() < NEAR_ZERO * scale * scale {
        return None;
    }
    Some(Matrix2::new(d, -b, -c, a) / det)
}

/// Cascade two 2-ports in the S domain (port 2 of `a` into port 1 of `b`)
///
/// Unlike the T-matrix product this stays defined when either network has
/// zero transmission. Returns `None` if the internal loop `1 - S22a S11b`
/// vanishes.
pub fn cascade_s(a: &Matrix2<Complex64>, b: &Matrix2<Complex64>) -> Option<Matrix2<Complex64>> {
    let denom = Complex64::new(1.0, 0.0) - a[(1, 1)] * b[(0, 0)];
    if denom.norm() < NEAR_ZERO {
        return None;
    }

    let s11 = a[(0, 0)] + (a[(0, 1)] * a[(1, 0)] * b[(0, 0)]) / denom;
    let s12 = (a[(0, 1)] * b[(0, 1)]) / denom;
    let s21 = (a[(1, 0)] * b[(1, 0)]) / denom;
    let s22 = b[(1, 1)] + (b[(0, 1)] * b[(1, 0)] * a[(1, 1)]) / denom;

    Some(Matrix2::new(s11, s12, s21, s22))
}
