//! Shared test utilities for the scia-l1c workspace.
//!
//! - [`L1cProductBuilder`] writes small synthetic Level-1C products with
//!   exactly the states, clusters and records a test needs.
//! - [`generators`] produces wavelength grids, signals and ground tracks
//!   for those records.
//! - [`paths`] and the `require_*` macros locate optional real products
//!   and skip the test when none is available.
//!
//! ```ignore
//! use test_utils::{L1cProductBuilder, StateSpec, ClusterSpec, NADIR, Stamp};
//!
//! let state = StateSpec::new(Stamp::new(1462, 0, 0), NADIR, 7, 32, 16)
//!     .cluster(ClusterSpec::new(0, 1, 0, 4, 1));
//! let product = L1cProductBuilder::new().state(state).write_temp();
//! ```

pub mod builder;
pub mod generators;
pub mod paths;

pub use builder::*;
pub use generators::*;
pub use paths::*;

/// Resolve a named real product or return early from the test.
///
/// ```ignore
/// let path = require_test_file!("SCI_NLC_1PNPDE20040102_093921_000060632023_00165_09804_0000.N1");
/// ```
#[macro_export]
macro_rules! require_test_file {
    ($name:expr) => {{
        match $crate::find_test_file($name) {
            Some(path) => path,
            None => {
                eprintln!(
                    "SKIPPED: product '{}' not found; set SCIA_L1C_DATA or TEST_DATA_DIR",
                    $name
                );
                return;
            }
        }
    }};
}

/// Resolve any real Level-1C product in the search directories or
/// return early from the test.
#[macro_export]
macro_rules! require_l1c_product {
    () => {{
        match $crate::find_any_product() {
            Some(path) => path,
            None => {
                eprintln!("SKIPPED: no SCI_NLC_1P*.N1 product found; set SCIA_L1C_DATA or TEST_DATA_DIR");
                return;
            }
        }
    }};
}

/// Assert `|left - right| <= epsilon`, comparing as `f64`.
#[macro_export]
macro_rules! assert_approx_eq {
    ($left:expr, $right:expr, $epsilon:expr) => {{
        let left: f64 = $left as f64;
        let right: f64 = $right as f64;
        let epsilon: f64 = $epsilon as f64;
        let diff = (left - right).abs();
        if diff > epsilon {
            panic!(
                "assertion failed: `(left ≈ right)`\n  left: `{:?}`,\n right: `{:?}`,\n  diff: `{:?}` > epsilon `{:?}`",
                left, right, diff, epsilon
            );
        }
    }};
}

/// Element-wise [`assert_approx_eq!`] over two slices of equal length,
/// e.g. co-added signals against expected means.
#[macro_export]
macro_rules! assert_slices_approx_eq {
    ($left:expr, $right:expr, $epsilon:expr) => {{
        let left = $left;
        let right = $right;
        assert_eq!(left.len(), right.len(), "slice lengths differ");
        for (i, (l, r)) in left.iter().zip(right.iter()).enumerate() {
            let diff = (*l as f64 - *r as f64).abs();
            if diff > $epsilon as f64 {
                panic!(
                    "assertion failed at index {}: `{:?}` vs `{:?}` (diff {:?})",
                    i, l, r, diff
                );
            }
        }
    }};
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_assert_approx_eq_passes() {
        assert_approx_eq!(1.0001, 1.0, 0.001);
        assert_approx_eq!(-5.5_f32, -5.500001_f32, 0.0001);
    }

    #[test]
    #[should_panic(expected = "assertion failed")]
    fn test_assert_approx_eq_fails() {
        assert_approx_eq!(1.1, 1.0, 0.001);
    }

    #[test]
    fn test_assert_slices_approx_eq_passes() {
        assert_slices_approx_eq!(&[3.5001_f32, 0.5], &[3.5_f32, 0.5], 0.001);
    }

    #[test]
    #[should_panic(expected = "at index 1")]
    fn test_assert_slices_approx_eq_reports_index() {
        assert_slices_approx_eq!(&[1.0_f32, 2.5], &[1.0_f32, 2.0], 0.001);
    }
}
