use thiserror::Error;

use crate::utils::convergence::ConvergedReason;

// Unified error type for laplace-xy

#[derive(Error, Debug)]
pub enum KError {
    #[error("capability error: {0}")]
    Capability(String),
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("solver failed to converge: {reason} after {iterations} iterations (residual {residual:e})")]
    Convergence {
        reason: ConvergedReason,
        iterations: usize,
        residual: f64,
    },
    #[error("factorization error: {0}")]
    FactorError(String),
    #[error("solve error: {0}")]
    SolveError(String),
    #[error("indefinite matrix detected (p^T A p changed sign)")]
    IndefiniteMatrix,
    #[error("indefinite preconditioner detected (beta < 0)")]
    IndefinitePreconditioner,
    #[error("zero pivot at row {0}")]
    ZeroPivot(usize),
}

impl KError {
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        KError::Configuration(msg.into())
    }
}
