//! Façade error taxonomy.
//!
//! Four user-visible families: malformed identifiers (local, fail fast,
//! never touch the network), empty resolutions, ambiguous resolutions
//! (carrying the conflicting candidates), and remote failures passed
//! through with the platform's message intact.

use strata_client::ClientError;
use strata_ident::{InvalidFilter, InvalidIdentifier, ResolveError};

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    InvalidIdentifier(#[from] InvalidIdentifier),

    #[error(transparent)]
    InvalidFilter(#[from] InvalidFilter),

    /// Not-found or ambiguous resolution.
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Remote(#[from] ClientError),

    /// Invalid option combinations and values, caught before any request.
    #[error("{0}")]
    Invalid(String),

    #[error("unexpected response shape: {0}")]
    Shape(String),

    #[error("timed out after {seconds}s waiting for {what}")]
    WaitTimeout { seconds: u64, what: String },

    #[error("{what} failed: {message}")]
    ActionFailed { what: String, message: String },
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        ApiError::Invalid(msg.into())
    }

    pub fn shape(msg: impl Into<String>) -> Self {
        ApiError::Shape(msg.into())
    }
}
