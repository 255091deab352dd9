use ndarray::ShapeError;
use thiserror::Error;

/// Errors raised by the analysis functions.
///
/// Degenerate numeric input (zero variance, zero range) is not an error:
/// those cases produce non-finite values instead.
#[derive(Debug, Error)]
pub enum Error {
    #[error("array rank must be in {expected}, but is {rank}")]
    UnsupportedRank { rank: usize, expected: &'static str },

    #[error("correlation mode must be \"pair\" or \"mean\", but is {0:?}")]
    InvalidMode(String),

    #[error("axis {axis} is out of bounds for array of rank {rank}")]
    InvalidAxis { axis: usize, rank: usize },

    #[error("at least {required} valid samples are required, but only {valid} remain")]
    InsufficientData { valid: usize, required: usize },

    #[error("series lengths must match, but are {0} and {1}")]
    LengthMismatch(usize, usize),

    #[error("invalid {name}: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error(transparent)]
    Shape(#[from] ShapeError),
}

pub type Result<T> = std::result::Result<T, Error>;
