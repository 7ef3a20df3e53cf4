//! services/client/src/adapters/storage.rs
//!
//! Object-storage implementation of the upload port. Uploads never
//! overwrite: the time-suffixed paths chosen by the photo orchestrator make
//! collisions unlikely, and the backend rejects the remainder with a
//! conflict.

use async_trait::async_trait;
use bedtijd_core::ports::{ObjectStorageService, PortError, PortResult};
use tracing::debug;
use url::Url;

use super::{bearer, error_from_response, transport_error, TokenStore};
use crate::config::Config;

/// An adapter that implements the `ObjectStorageService` port against a
/// Supabase-style storage endpoint.
#[derive(Clone)]
pub struct SupabaseStorageAdapter {
    http: reqwest::Client,
    base: Url,
    anon_key: String,
    bucket: String,
    tokens: TokenStore,
}

impl SupabaseStorageAdapter {
    pub fn new(http: reqwest::Client, config: &Config, tokens: TokenStore) -> Self {
        Self {
            http,
            base: config.supabase_url.clone(),
            anon_key: config.supabase_anon_key.clone(),
            bucket: config.storage_bucket.clone(),
            tokens,
        }
    }
}

#[async_trait]
impl ObjectStorageService for SupabaseStorageAdapter {
    async fn upload(&self, path: &str, bytes: &[u8]) -> PortResult<String> {
        let url = self
            .base
            .join(&format!("/storage/v1/object/{}/{}", self.bucket, path))
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let response = self
            .http
            .post(url)
            .header("apikey", &self.anon_key)
            .bearer_auth(bearer(&self.tokens, &self.anon_key))
            .header("x-upsert", "false")
            .header("content-type", "application/octet-stream")
            .body(bytes.to_vec())
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }
        debug!(path, size = bytes.len(), "blob uploaded");
        Ok(path.to_string())
    }
}
