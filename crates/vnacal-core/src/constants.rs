//! Numerical and physical constants
//!
//! Tolerance defaults used by [`crate::config::CalibrationConfig`] and the
//! speed of light used by the standards library.

/// Tolerance for detecting near-zero values in division and singularity checks.
pub const NEAR_ZERO: f64 = 1e-15;

/// Speed of light in vacuum (m/s).
pub const SPEED_OF_LIGHT: f64 = 299_792_458.0;

/// Default relative determinant tolerance for the 3x3 one-port solve.
pub const SINGULAR_TOL: f64 = 1e-12;

/// Default tolerance below which two ideal reflection coefficients count as equal.
pub const DISTINCT_TOL: f64 = 1e-12;

/// Default relative eigenvalue separation below which a TRL line is degenerate.
///
/// For a lossless line this is roughly |sin(theta)|, so the default flags
/// points within about 0.06 degrees of a half-wavelength multiple.
pub const DEGENERATE_LINE_TOL: f64 = 1e-3;

/// Default relative size of Re(Gamma) below which the reflect sign is undecidable.
pub const SIGN_TOL: f64 = 1e-6;

/// Default number of frequency points from which per-point work runs on the rayon pool.
pub const PARALLEL_THRESHOLD: usize = 64;

/// Default number of decimals written to Touchstone data lines.
pub const TOUCHSTONE_PRECISION: usize = 6;

/// Relative tolerance under which two frequency points count as the same.
pub const GRID_RTOL: f64 = 1e-9;
