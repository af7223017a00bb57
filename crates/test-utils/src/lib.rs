//! Shared test support for the nowcast crates.
//!
//! - `generators`: synthetic magnetometer traces with known dB/dt, rendered
//!   as CSV partitions (optionally gzipped)
//! - `fixtures`: a fixed reference clock, small registries and partition
//!   bodies with known defects
//! - `assert_approx_eq!` for float comparisons
//!
//! Pulled in as a dev-dependency only:
//!
//! ```toml
//! [dev-dependencies]
//! test-utils = { path = "../test-utils" }
//! ```

pub mod fixtures;
pub mod generators;

// Re-export commonly used items at the crate root
pub use fixtures::*;
pub use generators::*;

/// Default tolerance for dB/dt comparisons, in nT/min.
pub const DBDT_TOLERANCE: f64 = 1e-9;

/// Asserts two floats are within a tolerance of each other.
///
/// The two-argument form uses [`DBDT_TOLERANCE`], which is enough to absorb
/// the rounding in `|ΔB| / Δt` for exact synthetic series.
///
/// ```
/// use test_utils::assert_approx_eq;
///
/// assert_approx_eq!(30.0 / 3.0, 10.0);
/// assert_approx_eq!(12.004, 12.0, 0.01);
/// ```
#[macro_export]
macro_rules! assert_approx_eq {
    ($actual:expr, $expected:expr) => {
        $crate::assert_approx_eq!($actual, $expected, $crate::DBDT_TOLERANCE)
    };
    ($actual:expr, $expected:expr, $tolerance:expr) => {{
        let (actual, expected, tolerance) = ($actual as f64, $expected as f64, $tolerance as f64);
        let diff = (actual - expected).abs();
        assert!(
            diff <= tolerance,
            "values differ by {} (tolerance {}): actual {}, expected {}",
            diff,
            tolerance,
            actual,
            expected
        );
    }};
}
