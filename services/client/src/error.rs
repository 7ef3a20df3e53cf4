//! services/client/src/error.rs
//!
//! Defines the primary error type for the entire client service.

use crate::config::ConfigError;
use bedtijd_core::ports::PortError;

/// The primary error type for the `client` service.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents an error that propagated up from one of the remote ports.
    /// Local state is left intact; the operation can be retried.
    #[error("Service Port Error: {0}")]
    Port(#[from] PortError),

    /// An operation that requires an authenticated user was called without
    /// one.
    #[error("Not authenticated")]
    NotAuthenticated,

    /// The photo blob was uploaded but recording its reference against the
    /// entry failed. The blob exists, unreferenced; the caller could retry
    /// the attach without re-uploading.
    #[error("Photo uploaded to {storage_path} but could not be attached: {source}")]
    PhotoAttach {
        storage_path: String,
        source: PortError,
    },

    /// Represents a standard Input/Output error (e.g., persisting
    /// preferences).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A catch-all for any other unexpected errors.
    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}

impl StoreError {
    /// Whether the underlying failure was a rejected authorization, which
    /// signals a stale session rather than a network problem.
    pub fn is_unauthorized(&self) -> bool {
        matches!(
            self,
            StoreError::Port(PortError::Unauthorized)
                | StoreError::PhotoAttach {
                    source: PortError::Unauthorized,
                    ..
                }
        )
    }
}
