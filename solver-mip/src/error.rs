//! Error types for the MIP solver.

use solver_core::ModelError;
use thiserror::Error;

/// Errors that can occur during MIP solving.
///
/// Infeasible, unbounded and limit outcomes are reported through
/// [`MipStatus`](crate::MipStatus), not here.
#[derive(Error, Debug)]
pub enum MipError {
    /// Problem validation failed
    #[error("Invalid problem: {0}")]
    InvalidProblem(String),

    /// Malformed model file
    #[error("Parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    /// Reading a model file failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal invariant violated (a bug, not a solver outcome)
    #[error("Internal error: {0}")]
    Internal(String),

    /// External solver failed
    #[error("Backend error: {0}")]
    Backend(String),
}

impl From<ModelError> for MipError {
    fn from(err: ModelError) -> Self {
        MipError::InvalidProblem(err.to_string())
    }
}

/// Result type for MIP operations.
pub type MipResult<T> = Result<T, MipError>;
