//! crates/bedtijd_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the remote collaborator.
//! These traits form the boundary of the hexagonal architecture, allowing the
//! store to be independent of the concrete backend (auth provider, row
//! storage with row-level access control, object storage).

use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;
use uuid::Uuid;

use crate::domain::{AuthSession, Entry, EntryPatch, NewQuestion, Question};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from the remote service.
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    /// A uniqueness constraint or no-overwrite rule was violated remotely.
    #[error("Conflict: {0}")]
    Conflict(String),
    /// The write was rejected by row-level access control. The caller should
    /// treat the session as invalid.
    #[error("Unauthorized")]
    Unauthorized,
    /// A retryable network failure. Local state stays authoritative.
    #[error("Transient failure: {0}")]
    Transient(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

impl PortError {
    /// Whether the failure is worth retrying without operator intervention.
    pub fn is_transient(&self) -> bool {
        matches!(self, PortError::Transient(_))
    }
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Session Lifecycle Events
//=========================================================================================

/// A change notification from the auth collaborator.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    SignedIn(AuthSession),
    SignedOut,
    TokenRefreshed(AuthSession),
}

/// A boxed stream of session lifecycle events, alive for the lifetime of the
/// application.
pub type SessionEventStream = Pin<Box<dyn Stream<Item = SessionEvent> + Send>>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait AuthService: Send + Sync {
    /// Attempts to restore a previously established session from persisted
    /// credentials. `Ok(None)` is the normal unauthenticated state, not an
    /// error.
    async fn restore_session(&self) -> PortResult<Option<AuthSession>>;

    /// Subscribes to sign-in, sign-out, and token-refresh notifications.
    fn session_events(&self) -> SessionEventStream;

    /// Ends the current session and notifies subscribers.
    async fn sign_out(&self) -> PortResult<()>;
}

#[async_trait]
pub trait EntryTableService: Send + Sync {
    /// Fetches all entries owned by the given user.
    async fn list_entries(&self, owner_id: Uuid) -> PortResult<Vec<Entry>>;

    /// Inserts a new entry row and returns it with its remote id assigned.
    /// A second insert for the same (owner, question) pair violates the
    /// remote uniqueness constraint and surfaces as `Conflict`.
    async fn insert_entry(&self, entry: &Entry) -> PortResult<Entry>;

    /// Updates an existing row in place.
    async fn update_entry(&self, id: Uuid, patch: &EntryPatch) -> PortResult<Entry>;

    /// Records an uploaded photo's storage reference against an entry.
    async fn insert_photo(&self, entry_id: Uuid, storage_path: &str) -> PortResult<()>;
}

#[async_trait]
pub trait QuestionTableService: Send + Sync {
    /// Lists questions visible to the caller. Row-level access control
    /// filters unpublished rows for non-admin readers.
    async fn list_questions(&self) -> PortResult<Vec<Question>>;

    /// Creates a question. Rejected remotely for non-admin callers.
    async fn insert_question(&self, question: &NewQuestion) -> PortResult<Question>;

    /// Edits a question. Rejected remotely for non-admin callers.
    async fn update_question(&self, id: i64, question: &NewQuestion) -> PortResult<Question>;
}

#[async_trait]
pub trait ObjectStorageService: Send + Sync {
    /// Uploads a blob under the given path with no-overwrite semantics and
    /// returns the stored path. An existing object surfaces as `Conflict`.
    async fn upload(&self, path: &str, bytes: &[u8]) -> PortResult<String>;
}
