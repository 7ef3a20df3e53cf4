//! services/client/src/store/session.rs
//!
//! Owns the authenticated-user identity and its lifecycle: session restore
//! at startup, a long-lived listener for sign-in/sign-out/refresh
//! notifications from the auth collaborator, and local invalidation when a
//! write is rejected by access control.

use std::sync::{Arc, RwLock};

use bedtijd_core::domain::{AuthSession, User};
use bedtijd_core::ports::{AuthService, SessionEvent};
use futures::StreamExt;
use tokio::sync::{watch, OnceCell};
use tracing::{info, warn};

use crate::error::StoreError;

/// Session manager. Consumers observe the user through a watch channel; UI
/// routing gates on `None` (redirect to login) versus `Some` (authenticated).
pub struct SessionManager {
    auth: Arc<dyn AuthService>,
    user_tx: watch::Sender<Option<User>>,
    session: Arc<RwLock<Option<AuthSession>>>,
    /// Makes `init` idempotent: one restore, one listener registration, no
    /// matter how often or concurrently it is called.
    init_cell: OnceCell<()>,
}

impl SessionManager {
    pub fn new(auth: Arc<dyn AuthService>) -> Self {
        let (user_tx, _) = watch::channel(None);
        Self {
            auth,
            user_tx,
            session: Arc::new(RwLock::new(None)),
            init_cell: OnceCell::new(),
        }
    }

    /// Restores a previously established session, if any, and registers the
    /// lifetime listener for session-change notifications.
    ///
    /// Failure to restore is not an error: a transient network failure or a
    /// missing credential both resolve to the logged-out state. Returns the
    /// resulting user.
    pub async fn init(&self) -> Result<Option<User>, StoreError> {
        self.init_cell
            .get_or_init(|| async {
                match self.auth.restore_session().await {
                    Ok(Some(session)) => {
                        info!(user = %session.user.id, "session restored");
                        self.set_session(Some(session));
                    }
                    Ok(None) => {
                        info!("no persisted session; starting logged out");
                    }
                    Err(e) => {
                        // Fail open to the logged-out state; never fatal.
                        warn!(error = %e, "session restore failed, treating as logged out");
                    }
                }
                self.spawn_listener();
            })
            .await;
        Ok(self.current_user())
    }

    /// The currently authenticated user, if any.
    pub fn current_user(&self) -> Option<User> {
        self.user_tx.borrow().clone()
    }

    /// The full session, including tokens. Most callers want
    /// [`current_user`](Self::current_user) instead.
    pub fn current_session(&self) -> Option<AuthSession> {
        self.session.read().expect("session state poisoned").clone()
    }

    /// Subscribes to user changes (sign-in, sign-out, invalidation).
    pub fn subscribe(&self) -> watch::Receiver<Option<User>> {
        self.user_tx.subscribe()
    }

    /// Marks the session invalid locally, e.g. after a write was rejected by
    /// row-level access control. The stored session is dropped along with
    /// the user, and the UI observing the watch channel re-prompts for
    /// authentication.
    pub fn invalidate(&self) {
        warn!("session invalidated; user must re-authenticate");
        *self.session.write().expect("session state poisoned") = None;
        self.user_tx.send_if_modified(|user| user.take().is_some());
    }

    /// Ends the session with the auth collaborator. Local state clears via
    /// the resulting `SignedOut` notification.
    pub async fn sign_out(&self) -> Result<(), StoreError> {
        self.auth.sign_out().await?;
        Ok(())
    }

    fn set_session(&self, session: Option<AuthSession>) {
        let user = session.as_ref().map(|s| s.user.clone());
        *self.session.write().expect("session state poisoned") = session;
        // Only notify watchers when the identity actually changed; a token
        // refresh for the same user is not a sign-in.
        self.user_tx.send_if_modified(|current| {
            if *current == user {
                false
            } else {
                *current = user;
                true
            }
        });
    }

    fn spawn_listener(&self) {
        let mut events = self.auth.session_events();
        let user_tx = self.user_tx.clone();
        let session = Arc::clone(&self.session);
        tokio::spawn(async move {
            while let Some(event) = events.next().await {
                match event {
                    SessionEvent::SignedIn(new) | SessionEvent::TokenRefreshed(new) => {
                        let user = Some(new.user.clone());
                        *session.write().expect("session state poisoned") = Some(new);
                        user_tx.send_if_modified(|current| {
                            if *current == user {
                                false
                            } else {
                                *current = user;
                                true
                            }
                        });
                    }
                    SessionEvent::SignedOut => {
                        *session.write().expect("session state poisoned") = None;
                        user_tx.send_if_modified(|current| current.take().is_some());
                    }
                }
            }
        });
    }
}
