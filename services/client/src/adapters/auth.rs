//! services/client/src/adapters/auth.rs
//!
//! GoTrue-style implementation of the `AuthService` port. A session is
//! restored by exchanging the refresh token persisted in the session file;
//! sign-in performed by the login surface lands here the same way. Session
//! lifecycle notifications fan out over an internal broadcast channel.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bedtijd_core::domain::{AuthSession, User};
use bedtijd_core::ports::{AuthService, PortError, PortResult, SessionEvent, SessionEventStream};
use chrono::{DateTime, Duration, Utc};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, warn};
use url::Url;
use uuid::Uuid;

use super::{bearer, error_from_response, transport_error, TokenStore};
use crate::config::Config;

/// Buffer size for session lifecycle notifications.
const SESSION_EVENT_CAPACITY: usize = 16;

/// Re-exchange the refresh token this long before the access token expires.
const REFRESH_MARGIN_SECS: i64 = 60;

/// Delay before retrying a refresh that failed on the network.
const REFRESH_RETRY_SECS: i64 = 30;

//=========================================================================================
// Wire Types
//=========================================================================================

/// The credential persisted between runs.
#[derive(Serialize, Deserialize)]
struct StoredCredential {
    refresh_token: String,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    expires_in: i64,
    user: WireUser,
}

#[derive(Deserialize)]
struct WireUser {
    id: Uuid,
    email: Option<String>,
    #[serde(default)]
    app_metadata: AppMetadata,
}

#[derive(Deserialize, Default)]
struct AppMetadata {
    role: Option<String>,
}

impl WireUser {
    fn to_domain(self) -> User {
        User {
            id: self.id,
            email: self.email,
            is_admin: self.app_metadata.role.as_deref() == Some("admin"),
        }
    }
}

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements the `AuthService` port against a GoTrue-style
/// auth endpoint. Once a session is established it keeps itself alive: a
/// background task re-exchanges the refresh token ahead of every expiry and
/// emits `TokenRefreshed` for the session manager.
#[derive(Clone)]
pub struct SupabaseAuthAdapter {
    http: reqwest::Client,
    base: Url,
    anon_key: String,
    session_file: PathBuf,
    tokens: TokenStore,
    events: broadcast::Sender<SessionEvent>,
    refresh_started: Arc<AtomicBool>,
}

impl SupabaseAuthAdapter {
    pub fn new(http: reqwest::Client, config: &Config, tokens: TokenStore) -> Self {
        let (events, _) = broadcast::channel(SESSION_EVENT_CAPACITY);
        Self {
            http,
            base: config.supabase_url.clone(),
            anon_key: config.supabase_anon_key.clone(),
            session_file: config.session_file.clone(),
            tokens,
            events,
            refresh_started: Arc::new(AtomicBool::new(false)),
        }
    }

    fn endpoint(&self, path: &str) -> PortResult<Url> {
        self.base
            .join(path)
            .map_err(|e| PortError::Unexpected(e.to_string()))
    }

    fn read_credential(&self) -> Option<StoredCredential> {
        let raw = std::fs::read_to_string(&self.session_file).ok()?;
        match serde_json::from_str(&raw) {
            Ok(credential) => Some(credential),
            Err(e) => {
                warn!(error = %e, "ignoring malformed session file");
                None
            }
        }
    }

    fn persist_credential(&self, refresh_token: &str) {
        let credential = StoredCredential {
            refresh_token: refresh_token.to_string(),
        };
        match serde_json::to_string(&credential) {
            Ok(raw) => {
                if let Err(e) = std::fs::write(&self.session_file, raw) {
                    warn!(error = %e, "failed to persist session credential");
                }
            }
            Err(e) => warn!(error = %e, "failed to serialize session credential"),
        }
    }

    fn emit(&self, event: SessionEvent) {
        // No subscribers yet is fine.
        let _ = self.events.send(event);
    }

    /// Exchanges the refresh token for a fresh session, rotating the
    /// persisted credential and publishing the new access token for the
    /// row/storage adapters. A rejected token surfaces as `Unauthorized`.
    async fn exchange(&self, refresh_token: &str) -> PortResult<AuthSession> {
        let url = self.endpoint("/auth/v1/token?grant_type=refresh_token")?;
        let body = StoredCredential {
            refresh_token: refresh_token.to_string(),
        };
        let response = self
            .http
            .post(url)
            .header("apikey", &self.anon_key)
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            if matches!(
                response.status(),
                StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN
            ) {
                return Err(PortError::Unauthorized);
            }
            return Err(error_from_response(response).await);
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        self.persist_credential(&token.refresh_token);
        *self.tokens.write().expect("token store poisoned") = Some(token.access_token.clone());

        Ok(AuthSession {
            user: token.user.to_domain(),
            access_token: token.access_token,
            expires_at: Utc::now() + Duration::seconds(token.expires_in),
        })
    }

    /// Spawns the session-lifetime refresh task: sleep until shortly before
    /// the access token expires, re-exchange the persisted refresh token,
    /// and notify listeners. The task ends when the credential disappears
    /// (sign-out) or the refresh token is rejected.
    fn schedule_refresh(&self, expires_at: DateTime<Utc>) {
        if self.refresh_started.swap(true, Ordering::SeqCst) {
            return;
        }
        let adapter = self.clone();
        tokio::spawn(async move {
            let mut next = expires_at;
            loop {
                let wait = (next - Utc::now() - Duration::seconds(REFRESH_MARGIN_SECS))
                    .to_std()
                    .unwrap_or_default();
                tokio::time::sleep(wait).await;

                let Some(credential) = adapter.read_credential() else {
                    debug!("no persisted credential, stopping token refresh");
                    return;
                };
                match adapter.exchange(&credential.refresh_token).await {
                    Ok(session) => {
                        next = session.expires_at;
                        debug!(expires_at = %next, "access token refreshed");
                        adapter.emit(SessionEvent::TokenRefreshed(session));
                    }
                    Err(e) if e.is_transient() => {
                        warn!(error = %e, "token refresh failed, retrying");
                        next = Utc::now()
                            + Duration::seconds(REFRESH_MARGIN_SECS + REFRESH_RETRY_SECS);
                    }
                    Err(e) => {
                        warn!(error = %e, "token refresh rejected, stopping");
                        return;
                    }
                }
            }
        });
    }
}

//=========================================================================================
// `AuthService` Trait Implementation
//=========================================================================================

#[async_trait]
impl AuthService for SupabaseAuthAdapter {
    async fn restore_session(&self) -> PortResult<Option<AuthSession>> {
        // 1. No persisted credential is the normal logged-out state.
        let Some(credential) = self.read_credential() else {
            debug!("no persisted credential, starting logged out");
            return Ok(None);
        };

        // 2. Exchange the refresh token for a fresh session, then keep it
        //    alive for the lifetime of the process.
        match self.exchange(&credential.refresh_token).await {
            Ok(session) => {
                self.emit(SessionEvent::SignedIn(session.clone()));
                self.schedule_refresh(session.expires_at);
                Ok(Some(session))
            }
            Err(PortError::Unauthorized) => {
                // A rejected refresh token means the credential expired:
                // that is the default unauthenticated state, not an error.
                warn!("persisted credential rejected");
                let _ = std::fs::remove_file(&self.session_file);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    fn session_events(&self) -> SessionEventStream {
        let rx = self.events.subscribe();
        Box::pin(futures::stream::unfold(rx, |mut rx| async move {
            loop {
                match rx.recv().await {
                    Ok(event) => return Some((event, rx)),
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        warn!(missed, "session event listener lagged");
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => return None,
                }
            }
        }))
    }

    async fn sign_out(&self) -> PortResult<()> {
        let url = self.endpoint("/auth/v1/logout")?;
        let result = self
            .http
            .post(url)
            .header("apikey", &self.anon_key)
            .bearer_auth(bearer(&self.tokens, &self.anon_key))
            .send()
            .await;

        // Local sign-out proceeds even when the remote revoke fails; the
        // credential is gone either way.
        match result {
            Ok(response) if !response.status().is_success() => {
                warn!(status = %response.status(), "remote sign-out rejected");
            }
            Err(e) => warn!(error = %e, "remote sign-out failed"),
            Ok(_) => {}
        }

        let _ = std::fs::remove_file(&self.session_file);
        *self.tokens.write().expect("token store poisoned") = None;
        self.emit(SessionEvent::SignedOut);
        Ok(())
    }
}
