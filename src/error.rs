//! Error taxonomy for the pipeline (spec §7).
//!
//! A single `thiserror`-derived enum carries every failure mode the library
//! surfaces. Internal detail is logged, never returned to callers; the
//! variants here are what orchestrators match on and what the binary edge
//! wraps into `anyhow`. `is_transient` drives the retry classification used
//! by the provider clients (spec §4.2): HTTP 429, any 5xx, or a
//! network/transport error is worth retrying; everything else is fatal.

use thiserror::Error;

/// The errors produced by the corpusqa pipeline.
#[derive(Debug, Error)]
pub enum QaError {
    /// A caller-supplied value was missing or invalid.
    #[error("validation error: {0}")]
    Validation(String),

    /// A provider returned a non-success HTTP status.
    #[error("upstream error (status {status}): {message}")]
    Upstream { status: u16, message: String },

    /// A network or transport failure talking to a provider.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// A storage/database failure.
    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),

    /// No cached answer exists (or it has expired) for the requested id.
    #[error("answer not found")]
    AnswerNotFound,

    /// PDF text extraction failed.
    #[error("extraction error: {0}")]
    Extract(String),

    /// An embedding vector's length did not match the configured dimension.
    #[error("dimension mismatch: got {got}, want {want}")]
    DimensionMismatch { got: usize, want: usize },

    /// An internal invariant was violated.
    #[error("internal error: {0}")]
    Internal(String),
}

impl QaError {
    /// Whether the error is worth retrying: HTTP 429, any 5xx, or a
    /// network/transport error (spec §4.2). All other errors are fatal.
    pub fn is_transient(&self) -> bool {
        match self {
            QaError::Upstream { status, .. } => *status == 429 || (500..=599).contains(status),
            QaError::Network(_) => true,
            _ => false,
        }
    }
}
