//! Error taxonomy for the numeric core

use thiserror::Error;

/// Failures the numeric core can raise.
///
/// Threshold misses are *not* errors: they travel in the result record and the
/// process exit code. Everything here aborts the evaluation before a record
/// is printed.
#[derive(Debug, Error)]
pub enum Error {
    /// A caller-supplied value is outside the function's domain.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// S(Q-1) < S(Q) < S(Q+1) failed under the selected strategy.
    #[error("harmonic sum is not strictly increasing around Q={q} in {method} mode")]
    Monotonicity {
        /// Q at which the point check ran
        q: u64,
        /// Strategy that produced the offending values
        method: &'static str,
    },

    /// Float-mode S(Q) disagrees with the recorded reference value.
    #[error("S(Q) baseline mismatch: got {got:.12}, expected {expected:.12}")]
    Baseline {
        /// Computed float-mode sum
        got: f64,
        /// Recorded reference value
        expected: f64,
    },

    /// The per-q override table could not be read.
    #[error("per-q table: {0}")]
    Table(#[from] csv::Error),
}

/// Convenience alias used across the crate.
pub type Result<T> = std::result::Result<T, Error>;
