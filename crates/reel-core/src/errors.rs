//! # Errors
//!
//! Typed failures surfaced by the library.
//!
//! Startup failures (`UnknownVariant`, `ResourceFetch`, `Parse`) abort a movie
//! before the first frame. `IndexOutOfRange` and `ClipBudget` are contract
//! violations: plans are validated against trajectory lengths when they are
//! built, so these should only surface from tests or broken plans.

use thiserror::Error;

pub type ReelResult<T> = Result<T, ReelError>;

#[derive(Debug, Error)]
pub enum ReelError {
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("unknown movie variant selector: {0}")]
    UnknownVariant(i64),

    #[error("failed to fetch resource: {path}")]
    ResourceFetch {
        path: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("{path}:{line}: {message}")]
    Parse {
        path: String,
        line: usize,
        message: String,
    },

    #[error("trajectory index {index} out of range (len {len})")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("clip '{clip}' budget {budget} with step {step} overruns trajectory of length {len}")]
    ClipBudget {
        clip: String,
        budget: usize,
        step: usize,
        len: usize,
    },

    #[error("capture failed: {0}")]
    Capture(#[source] anyhow::Error),
}
