//! Error types for argo-core operations.

use thiserror::Error;

/// Fatal errors. Anything in here aborts a run; degraded time handling is
/// reported through [`crate::decode::DecodeFailure`] and
/// [`crate::pipeline::TimeStatus`] instead.
#[derive(Error, Debug)]
pub enum ArgoError {
    #[error("Fetch failed for float {float_id}: {message}")]
    Fetch { float_id: u64, message: String },

    #[error("No data returned for float {float_id}")]
    EmptyDataset { float_id: u64 },

    #[error("Could not write '{filename}': {message}")]
    Persist { filename: String, message: String },

    #[error("Invalid interval: {0}")]
    InvalidInterval(String),

    #[error("Invalid day window: {0}")]
    InvalidDays(String),

    #[error("Unknown dimension: {0}")]
    UnknownDimension(String),

    #[error("Index {index} out of range for dimension '{dim}' of length {len}")]
    IndexOutOfRange { dim: String, index: usize, len: usize },

    #[error("Shape mismatch for '{name}': expected {expected} values, got {actual}")]
    ShapeMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },

    #[error("Duplicate variable: {0}")]
    DuplicateVariable(String),
}

pub type Result<T> = std::result::Result<T, ArgoError>;
