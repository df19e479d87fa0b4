//! Pipeline Error Types
//!
//! Every stage of the explanation pipeline surfaces one of these kinds.
//! Local recovery is limited to the documented empty-result cases; anything
//! else propagates to the request boundary.

use std::time::Duration;
use thiserror::Error;

use crate::solver::SolverError;

/// Errors raised by the explanation pipeline
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Malformed request data: bad identifier, missing unit, absent
    /// precondition field
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A characterization needs at least two summarized entities
    #[error("at least two summarized entities are required to characterize a unit")]
    InsufficientUnit,

    /// Graph database could not be reached or answered with an error
    #[error("upstream unavailable: {0}")]
    Upstream(String),

    /// Per-request deadline exceeded; no partial output is emitted
    #[error("request deadline exceeded after {elapsed:?}")]
    Timeout { elapsed: Duration },

    /// Solver rejected a rendered program
    #[error("solver error: {0}")]
    Solver(#[from] SolverError),

    /// Invariant violation or unexpected internal state
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<reqwest::Error> for PipelineError {
    fn from(err: reqwest::Error) -> Self {
        PipelineError::Upstream(err.to_string())
    }
}

/// Result type for pipeline operations
pub type PipelineResult<T> = Result<T, PipelineError>;
