//! Unit conversion functions
//!
//! Conversions between complex values and the (magnitude, dB, degree)
//! encodings used by Touchstone records and display consumers.

use num_complex::Complex64;
use std::f64::consts::PI;

/// Convert complex number to magnitude
#[inline]
pub fn complex_2_magnitude(z: Complex64) -> f64 {
    z.norm()
}

/// Convert complex number to dB (20*log10(|z|))
#[inline]
pub fn complex_2_db(z: Complex64) -> f64 {
    20.0 * z.norm().log10()
}

/// Convert complex number to phase in degrees
#[inline]
pub fn complex_2_degree(z: Complex64) -> f64 {
    z.arg() * 180.0 / PI
}

/// Convert dB to magnitude (10^(dB/20))
#[inline]
pub fn db_2_magnitude(db: f64) -> f64 {
    10.0_f64.powf(db / 20.0)
}

/// Convert (magnitude, degree) to complex
pub fn magdeg_2_reim(mag: f64, deg: f64) -> Complex64 {
    Complex64::from_polar(mag, degree_2_radian(deg))
}

/// Convert (dB, degree) to complex
pub fn dbdeg_2_reim(db: f64, deg: f64) -> Complex64 {
    magdeg_2_reim(db_2_magnitude(db), deg)
}

/// Convert degrees to radians
#[inline]
pub fn degree_2_radian(deg: f64) -> f64 {
    deg * PI / 180.0
}

/// Remove 2*pi jumps from a phase sequence (radians), like numpy's `unwrap`
pub fn unwrap_rad(phase: &[f64]) -> Vec<f64> {
    let mut out = Vec::with_capacity(phase.len());
    let mut correction = 0.0;
    for (i, &p) in phase.iter().enumerate() {
        if i > 0 {
            let delta = p - phase[i - 1];
            let wrapped = (delta + PI).rem_euclid(2.0 * PI) - PI;
            correction += wrapped - delta;
        }
        out.push(p + correction);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_complex_2_magnitude() {
        // 5 = |3 + 4j|
        let z = Complex64::new(3.0, 4.0);
        assert_relative_eq!(complex_2_magnitude(z), 5.0, epsilon = 1e-10);
    }

    #[test]
    fn test_complex_2_db() {
        let z = Complex64::new(0.0, 10.0);
        assert_relative_eq!(complex_2_db(z), 20.0, epsilon = 1e-10);
    }

    #[test]
    fn test_complex_2_degree() {
        // 90° = angle(0 + 1j)
        let z = Complex64::new(0.0, 1.0);
        assert_relative_eq!(complex_2_degree(z), 90.0, epsilon = 1e-10);
    }

    #[test]
    fn test_magdeg_2_reim() {
        let z = magdeg_2_reim(1.0, 90.0);
        assert_relative_eq!(z.re, 0.0, epsilon = 1e-10);
        assert_relative_eq!(z.im, 1.0, epsilon = 1e-10);
    }

    #[test]
    fn test_dbdeg_2_reim() {
        let z = dbdeg_2_reim(20.0, 90.0);
        assert_relative_eq!(z.re, 0.0, epsilon = 1e-10);
        assert_relative_eq!(z.im, 10.0, epsilon = 1e-10);
    }

    #[test]
    fn test_unwrap_rad() {
        let wrapped = [3.0, -3.0, -1.0, 2.5, -2.0];
        let unwrapped = unwrap_rad(&wrapped);
        assert_relative_eq!(unwrapped[0], 3.0);
        assert_relative_eq!(unwrapped[1], -3.0 + 2.0 * PI, epsilon = 1e-12);
        assert_relative_eq!(unwrapped[2], -1.0 + 2.0 * PI, epsilon = 1e-12);
        assert_relative_eq!(unwrapped[3], 2.5, epsilon = 1e-12);
        assert_relative_eq!(unwrapped[4], -2.0 + 2.0 * PI, epsilon = 1e-12);
        for w in unwrapped.windows(2) {
            assert!((w[1] - w[0]).abs() <= PI);
        }
    }
}
