//! Typed errors callers branch on
//!
//! Everything else travels as `anyhow::Error` with context attached.

/// Failures that stop a run before any state is touched
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SyncError {
    #[error("unauthorized")]
    Unauthorized,

    #[error("unknown action: {0}")]
    UnknownAction(String),

    #[error("misconfigured: {0}")]
    Misconfigured(String),
}
