//! Small fixed-size linear algebra
//!
//! The calibration algorithms only ever need 2x2 eigen-decompositions and
//! 3x3 solves, so everything here works on `nalgebra` fixed-size matrices.

use nalgebra::{Matrix2, Matrix3, Vector2, Vector3};
use num_complex::Complex64;

use crate::constants::NEAR_ZERO;

/// Eigenvalues and unit-norm eigenvectors of a 2x2 complex matrix
#[derive(Debug, Clone, Copy)]
pub struct Eigen2 {
    pub values: [Complex64; 2],
    pub vectors: [Vector2<Complex64>; 2],
}

impl Eigen2 {
    /// Relative separation |l1 - l2| / (|l1| + |l2|)
    pub fn separation(&self) -> f64 {
        let [l1, l2] = self.values;
        let scale = l1.norm() + l2.norm();
        if scale == 0.0 {
            0.0
        } else {
            (l1 - l2).norm() / scale
        }
    }
}

/// Eigen-decomposition of a 2x2 complex matrix
///
/// Eigenvalues come from the characteristic polynomial written as
/// `((p11 - p22)^2 + 4 p12 p21)` to avoid cancelling the trace. For each
/// eigenvalue the better conditioned of the two null-space candidates is
/// kept.
pub fn eig2(p: &Matrix2<Complex64>) -> Eigen2 {
    let (p11, p12, p21, p22) = (p[(0, 0)], p[(0, 1)], p[(1, 0)], p[(1, 1)]);
    let half_trace = (p11 + p22) * 0.5;
    let disc = ((p11 - p22) * (p11 - p22) + p12 * p21 * 4.0).sqrt() * 0.5;
    let values = [half_trace + disc, half_trace - disc];

    let vectors = [0, 1].map(|k| {
        let lambda = values[k];
        let from_row1 = Vector2::new(p12, lambda - p11);
        let from_row2 = Vector2::new(lambda - p22, p21);
        let v = if from_row1.norm() >= from_row2.norm() {
            from_row1
        } else {
            from_row2
        };
        let norm = v.norm();
        if norm < NEAR_ZERO {
            // P is a multiple of the identity; any basis works
            let mut e = Vector2::zeros();
            e[k] = Complex64::new(1.0, 0.0);
            e
        } else {
            v.unscale(norm)
        }
    });

    Eigen2 { values, vectors }
}

/// Solve `a x = b` for a 3x3 complex system
///
/// Returns `None` when `|det(a)|` is below `tol` times the product of the row
/// norms (Hadamard's bound), i.e. when the rows are numerically dependent.
pub fn solve3(
    a: &Matrix3<Complex64>,
    b: &Vector3<Complex64>,
    tol: f64,
) -> Option<Vector3<Complex64>> {
    let hadamard: f64 = (0..3).map(|i| a.row(i).norm()).product();
    if hadamard == 0.0 || a.determinant().norm() <= tol * hadamard {
        return None;
    }
    a.lu().solve(b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn c(re: f64, im: f64) -> Complex64 {
        Complex64::new(re, im)
    }

    #[test]
    fn test_eig2_satisfies_definition() {
        let p = Matrix2::new(c(0.3, 0.4), c(1.2, -0.1), c(-0.5, 0.2), c(0.9, -0.7));
        let eig = eig2(&p);
        for k in 0..2 {
            let lhs = p * eig.vectors[k];
            let rhs = eig.vectors[k] * eig.values[k];
            for i in 0..2 {
                assert_relative_eq!(lhs[i].re, rhs[i].re, epsilon = 1e-12);
                assert_relative_eq!(lhs[i].im, rhs[i].im, epsilon = 1e-12);
            }
            assert_relative_eq!(eig.vectors[k].norm(), 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_eig2_diagonal() {
        let lambda = Complex64::from_polar(1.0, -0.8);
        let p = Matrix2::new(lambda, c(0.0, 0.0), c(0.0, 0.0), lambda.inv());
        let eig = eig2(&p);
        assert!(eig.separation() > 0.5);
        // each eigenvector is a basis vector
        for k in 0..2 {
            let v = eig.vectors[k];
            assert_relative_eq!(v[0].norm() * v[1].norm(), 0.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_eig2_identity_is_degenerate() {
        let eig = eig2(&Matrix2::identity());
        assert_relative_eq!(eig.separation(), 0.0);
        assert_relative_eq!(eig.vectors[0][0].re, 1.0);
        assert_relative_eq!(eig.vectors[1][1].re, 1.0);
    }

    #[test]
    fn test_solve3() {
        let a = Matrix3::new(
            c(1.0, 0.0),
            c(1.0, 0.0),
            c(-1.0, 0.0),
            c(1.0, 0.0),
            c(-1.0, 0.0),
            c(1.0, 0.0),
            c(1.0, 0.0),
            c(0.0, 0.0),
            c(2.0, 0.0),
        );
        let x = Vector3::new(c(0.05, 0.0), c(-0.1, 0.2), c(0.3, 0.0));
        let b = a * x;
        let solved = solve3(&a, &b, 1e-12).unwrap();
        for i in 0..3 {
            assert_relative_eq!(solved[i].re, x[i].re, epsilon = 1e-12);
            assert_relative_eq!(solved[i].im, x[i].im, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_solve3_singular() {
        let row = [c(1.0, 0.0), c(0.0, 0.0), c(0.0, 0.0)];
        let a = Matrix3::from_rows(&[
            nalgebra::RowVector3::from(row),
            nalgebra::RowVector3::from(row),
            nalgebra::RowVector3::new(c(0.0, 0.0), c(1.0, 0.0), c(1.0, 0.0)),
        ]);
        let b = Vector3::new(c(1.0, 0.0), c(1.0, 0.0), c(1.0, 0.0));
        assert!(solve3(&a, &b, 1e-12).is_none());
    }
}
