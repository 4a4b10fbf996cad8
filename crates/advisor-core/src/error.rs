//! Error types for the streaming client
//!
//! Server-sent `[ERROR]` sentinels are not represented here - they arrive
//! mid-stream and land in the session's `error_detail` instead. Cancellation
//! is a distinct terminal outcome, never an error.

use thiserror::Error;

/// Errors raised when starting or driving a streaming session
#[derive(Debug, Error)]
pub enum StreamError {
    /// No bearer token available. Raised before any transport connection
    /// is attempted.
    #[error("authentication required: no token available")]
    AuthRequired,

    /// Connection-level failure (network interruption, non-2xx response,
    /// malformed stream). Carries a generic message, never server text.
    #[error("transport error: {0}")]
    Transport(String),

    /// Client configuration could not be loaded or is invalid
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
