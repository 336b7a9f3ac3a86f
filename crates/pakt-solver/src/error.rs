use thiserror::Error;

use crate::problem::ProblemSet;

#[derive(Error, Debug)]
pub enum SolverError {
    /// The request has no solution; the problem set explains which rules
    /// and jobs cannot be satisfied together. This is the normal failure
    /// mode, not a bug.
    #[error("unsolvable request: {0}")]
    Unsolvable(ProblemSet),

    /// An internal solver invariant was violated.
    #[error("internal solver error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, SolverError>;
