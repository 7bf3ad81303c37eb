//! Error types for contact-interaction inference

use thiserror::Error;

/// Workspace error type
#[derive(Error, Debug)]
pub enum Error {
    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Malformed input (bin edges, table shapes, domains)
    #[error("Validation error: {0}")]
    Validation(String),

    /// A computed quantity is not a finite real number.
    #[error("Numeric fault: {0}")]
    NumericFault(String),

    /// Root finder or minimizer did not converge.
    ///
    /// Recoverable: the caller may retry with another bracket or start point.
    #[error("No convergence: {0}")]
    NonConvergence(String),

    /// Computation error
    #[error("Computation error: {0}")]
    Computation(String),
}

impl Error {
    /// `true` for [`Error::NonConvergence`].
    pub fn is_non_convergence(&self) -> bool {
        matches!(self, Error::NonConvergence(_))
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Return `Err(NumericFault)` unless `value` is finite.
///
/// `what` is a short description used in the diagnostic message.
pub fn ensure_finite(value: f64, what: impl FnOnce() -> String) -> Result<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(Error::NumericFault(format!("{} is {}", what(), value)))
    }
}
