//! Error types for the evsync ecosystem.
//!
//! Read-side absence (unknown uid, trashed or malformed records) is not an
//! error; those surface as `None` or are filtered out of listings.

use thiserror::Error;

/// Errors that can occur in evsync operations.
#[derive(Error, Debug)]
pub enum EvSyncError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Feed not found: {0}")]
    FeedNotFound(String),
}

/// Result type alias for evsync operations.
pub type EvSyncResult<T> = Result<T, EvSyncError>;
