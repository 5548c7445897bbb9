//! Invariant checking.
//!
//! Cheap postconditions use [`debug_assert!`] directly. Structural checks
//! that walk whole data structures are guarded by the `debug-checks`
//! feature so that release benchmarks are unaffected; an assertion failure
//! of either kind indicates a bug, not a recoverable error.

/// Assert an expensive structural invariant. Compiled to nothing unless the
/// `debug-checks` feature is enabled.
#[macro_export]
macro_rules! heavy_assert {
    ($($arg:tt)*) => {{
        #[cfg(feature = "debug-checks")]
        {
            assert!($($arg)*);
        }
    }};
}

/// Like [`heavy_assert!`] for equality comparisons.
#[macro_export]
macro_rules! heavy_assert_eq {
    ($($arg:tt)*) => {{
        #[cfg(feature = "debug-checks")]
        {
            assert_eq!($($arg)*);
        }
    }};
}
