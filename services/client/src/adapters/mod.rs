//! services/client/src/adapters/mod.rs
//!
//! Concrete implementations of the core ports against a Supabase-style
//! backend: GoTrue auth, PostgREST rows, and object storage. Shared HTTP
//! error mapping lives here so every adapter surfaces the same taxonomy.

pub mod auth;
pub mod rest;
pub mod storage;

pub use auth::SupabaseAuthAdapter;
pub use rest::SupabaseRestAdapter;
pub use storage::SupabaseStorageAdapter;

use std::sync::{Arc, RwLock};

use bedtijd_core::ports::PortError;

/// The access token shared between the auth adapter (which writes it on
/// restore/refresh) and the row/storage adapters (which send it as the
/// bearer credential). `None` means requests go out with the anon key only.
pub type TokenStore = Arc<RwLock<Option<String>>>;

pub fn new_token_store() -> TokenStore {
    Arc::new(RwLock::new(None))
}

/// Maps a reqwest transport failure into the port taxonomy. Anything that
/// never reached the server is retryable.
pub(crate) fn transport_error(e: reqwest::Error) -> PortError {
    if e.is_connect() || e.is_timeout() || e.is_request() {
        PortError::Transient(e.to_string())
    } else {
        PortError::Unexpected(e.to_string())
    }
}

/// Maps a non-success HTTP response into the port taxonomy. 401/403 means
/// the write was rejected by access control; 409 is a uniqueness or
/// no-overwrite violation; 5xx is retryable.
pub(crate) async fn error_from_response(response: reqwest::Response) -> PortError {
    let status = response.status();
    let detail = response.text().await.unwrap_or_default();
    match status.as_u16() {
        401 | 403 => PortError::Unauthorized,
        404 => PortError::NotFound(detail),
        409 => PortError::Conflict(detail),
        500..=599 => PortError::Transient(format!("{}: {}", status, detail)),
        _ => PortError::Unexpected(format!("{}: {}", status, detail)),
    }
}

/// Reads the current bearer token, falling back to the anon key.
pub(crate) fn bearer(tokens: &TokenStore, anon_key: &str) -> String {
    tokens
        .read()
        .expect("token store poisoned")
        .clone()
        .unwrap_or_else(|| anon_key.to_string())
}
