//! services/client/src/store/mod.rs
//!
//! The application store: the single source of truth the UI reads from and
//! writes through. It owns the session manager, the entry cache, the photo
//! orchestrator, and the preference store, and exposes the operation set the
//! UI is allowed to call. The cache map itself is never handed out mutably;
//! mutation happens only through these operations.

pub mod entries;
pub mod photos;
pub mod prefs;
pub mod session;

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use bedtijd_core::domain::{
    Entry, EntryPatch, Language, NewQuestion, Preferences, Question, User,
};
use bedtijd_core::i18n;
use bedtijd_core::ports::{
    AuthService, EntryTableService, ObjectStorageService, QuestionTableService,
};
use tokio::sync::{broadcast, watch, OnceCell};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::StoreError;
use entries::{EntryCache, EntryEvent, SyncState};
use photos::PhotoOrchestrator;
use prefs::PreferenceStore;
use session::SessionManager;

/// The shared application store, created once at startup.
pub struct AppStore {
    session: SessionManager,
    entries: Arc<EntryCache>,
    photos: PhotoOrchestrator,
    prefs: PreferenceStore,
    questions_port: Arc<dyn QuestionTableService>,
    questions: Arc<RwLock<Vec<Question>>>,
    /// Guards initialization: one session restore, one bulk load, one
    /// lifecycle reactor, no matter how often `init` is called.
    init_cell: OnceCell<()>,
    reactor_started: AtomicBool,
}

impl AppStore {
    pub fn new(
        auth: Arc<dyn AuthService>,
        entry_table: Arc<dyn EntryTableService>,
        questions_port: Arc<dyn QuestionTableService>,
        storage: Arc<dyn ObjectStorageService>,
        prefs_path: Option<PathBuf>,
    ) -> Self {
        let entries = Arc::new(EntryCache::new(Arc::clone(&entry_table)));
        Self {
            session: SessionManager::new(auth),
            photos: PhotoOrchestrator::new(storage, entry_table),
            prefs: PreferenceStore::new(prefs_path),
            entries,
            questions_port,
            questions: Arc::new(RwLock::new(Vec::new())),
            init_cell: OnceCell::new(),
            reactor_started: AtomicBool::new(false),
        }
    }

    //=====================================================================================
    // Initialization and Session
    //=====================================================================================

    /// Bootstraps the store: restores the session and, when authenticated,
    /// loads the question list and performs the entry bulk load so the cache
    /// can be trusted before the UI renders.
    ///
    /// Idempotent: repeated or concurrent calls perform one restore and one
    /// bulk load. A failed bulk load leaves the store uninitialized so a
    /// later `init` retries it (the session restore itself stays one-shot).
    pub async fn init(&self) -> Result<Option<User>, StoreError> {
        self.init_cell
            .get_or_try_init(|| async {
                let user = self.session.init().await?;
                self.spawn_reactor();
                if let Some(user) = user {
                    self.refresh_questions().await?;
                    let count = self.entries.load_all(user.id).await?;
                    info!(user = %user.id, count, "store initialized");
                } else {
                    info!("store initialized without a session");
                }
                Ok::<(), StoreError>(())
            })
            .await?;
        Ok(self.session.current_user())
    }

    /// The currently authenticated user, if any.
    pub fn user(&self) -> Option<User> {
        self.session.current_user()
    }

    /// Subscribes to user changes; UI routing gates on this.
    pub fn subscribe_user(&self) -> watch::Receiver<Option<User>> {
        self.session.subscribe()
    }

    pub async fn sign_out(&self) -> Result<(), StoreError> {
        self.session.sign_out().await
    }

    //=====================================================================================
    // Entry Operations
    //=====================================================================================

    /// Synchronous cache read for one question; never blocks on network I/O.
    pub fn entry(&self, question_id: i64) -> Option<Entry> {
        self.entries.entry(question_id)
    }

    /// Snapshot of all cached entries keyed by question id.
    pub fn entries(&self) -> std::collections::HashMap<i64, Entry> {
        self.entries.entries()
    }

    /// The per-question synchronization state.
    pub fn entry_state(&self, question_id: i64) -> SyncState {
        self.entries.state(question_id)
    }

    /// Subscribes to per-question entry change notifications.
    pub fn subscribe_entries(&self) -> broadcast::Receiver<EntryEvent> {
        self.entries.subscribe()
    }

    /// Records a local draft edit without persisting (the notes textarea).
    pub fn edit_draft(&self, question_id: i64, patch: &EntryPatch) -> Result<(), StoreError> {
        let owner = self.owner()?;
        self.entries.edit_draft(owner, question_id, patch);
        Ok(())
    }

    /// Saves the user's answer for a question, creating the remote entry on
    /// first save and updating it in place afterwards.
    pub async fn save_entry(
        &self,
        question_id: i64,
        patch: EntryPatch,
    ) -> Result<Entry, StoreError> {
        self.write(question_id, patch).await
    }

    /// Marks a question as skipped, through the same create-or-update path.
    pub async fn skip_question(&self, question_id: i64) -> Result<Entry, StoreError> {
        self.write(question_id, EntryPatch::skipped()).await
    }

    /// Flags a question as inappropriate, recording the reason. An empty
    /// reason is recorded as given, never dropped.
    pub async fn flag_question(
        &self,
        question_id: i64,
        reason: impl Into<String>,
    ) -> Result<Entry, StoreError> {
        self.write(question_id, EntryPatch::flagged(reason)).await
    }

    /// Uploads a photo and attaches it to the question's entry, creating the
    /// entry first if it does not exist remotely yet.
    pub async fn attach_photo(
        &self,
        question_id: i64,
        file_name: &str,
        bytes: &[u8],
    ) -> Result<String, StoreError> {
        let owner = self.owner()?;
        let result = self
            .photos
            .attach_photo(&self.entries, owner, question_id, file_name, bytes)
            .await;
        self.check_authorization(&result);
        result
    }

    async fn write(&self, question_id: i64, patch: EntryPatch) -> Result<Entry, StoreError> {
        let owner = self.owner()?;
        let result = self.entries.write(owner, question_id, patch).await;
        self.check_authorization(&result);
        result
    }

    fn owner(&self) -> Result<Uuid, StoreError> {
        self.session
            .current_user()
            .map(|u| u.id)
            .ok_or(StoreError::NotAuthenticated)
    }

    /// A write rejected by row-level access control means the session is
    /// stale; invalidate it so the UI re-prompts for authentication.
    fn check_authorization<T>(&self, result: &Result<T, StoreError>) {
        if let Err(e) = result {
            if e.is_unauthorized() {
                self.session.invalidate();
            }
        }
    }

    //=====================================================================================
    // Questions
    //=====================================================================================

    /// The loaded question list, ordered by day number.
    pub fn questions(&self) -> Vec<Question> {
        self.questions.read().expect("question list poisoned").clone()
    }

    /// Reloads the question list from the remote store. Row-level access
    /// control filters unpublished questions for non-admin users.
    pub async fn refresh_questions(&self) -> Result<(), StoreError> {
        let mut list = self.questions_port.list_questions().await?;
        list.sort_by_key(|q| (q.day_number, q.id));
        *self.questions.write().expect("question list poisoned") = list;
        Ok(())
    }

    /// Admin: adds a question. Rejected remotely for non-admin users.
    pub async fn add_question(&self, question: NewQuestion) -> Result<Question, StoreError> {
        let created = self.questions_port.insert_question(&question).await?;
        let mut list = self.questions.write().expect("question list poisoned");
        list.push(created.clone());
        list.sort_by_key(|q| (q.day_number, q.id));
        Ok(created)
    }

    /// Admin: edits a question. Rejected remotely for non-admin users.
    pub async fn update_question(
        &self,
        id: i64,
        question: NewQuestion,
    ) -> Result<Question, StoreError> {
        let updated = self.questions_port.update_question(id, &question).await?;
        let mut list = self.questions.write().expect("question list poisoned");
        if let Some(existing) = list.iter_mut().find(|q| q.id == id) {
            *existing = updated.clone();
        }
        list.sort_by_key(|q| (q.day_number, q.id));
        Ok(updated)
    }

    //=====================================================================================
    // Preferences and Translation
    //=====================================================================================

    pub fn preferences(&self) -> Preferences {
        self.prefs.current()
    }

    pub fn language(&self) -> Language {
        self.prefs.language()
    }

    /// Updates the shared language; every component reading preferences sees
    /// the change immediately.
    pub fn set_language(&self, language: Language) {
        self.prefs.set_language(language);
    }

    pub fn set_notify_bedtime(&self, enabled: bool) {
        self.prefs.set_notify_bedtime(enabled);
    }

    pub fn set_notify_new_questions(&self, enabled: bool) {
        self.prefs.set_notify_new_questions(enabled);
    }

    pub fn set_bedtime(&self, bedtime: Option<String>) {
        self.prefs.set_bedtime(bedtime);
    }

    pub fn subscribe_preferences(&self) -> watch::Receiver<Preferences> {
        self.prefs.subscribe()
    }

    /// Translates a UI string in the current language.
    pub fn text<'a>(&self, key: &'a str) -> &'a str {
        i18n::translate(key, self.prefs.language())
    }

    //=====================================================================================
    // Lifecycle Reactor
    //=====================================================================================

    /// Reacts to sign-in/sign-out after startup: a fresh sign-in loads
    /// questions and entries for the new user; a sign-out drops the cache.
    fn spawn_reactor(&self) {
        if self.reactor_started.swap(true, Ordering::SeqCst) {
            return;
        }
        let mut user_rx = self.session.subscribe();
        let entries = Arc::clone(&self.entries);
        let questions_port = Arc::clone(&self.questions_port);
        let questions = Arc::clone(&self.questions);
        tokio::spawn(async move {
            while user_rx.changed().await.is_ok() {
                let user = user_rx.borrow_and_update().clone();
                match user {
                    Some(user) => {
                        match questions_port.list_questions().await {
                            Ok(mut list) => {
                                list.sort_by_key(|q| (q.day_number, q.id));
                                *questions.write().expect("question list poisoned") = list;
                            }
                            Err(e) => warn!(error = %e, "question reload after sign-in failed"),
                        }
                        if let Err(e) = entries.load_all(user.id).await {
                            warn!(error = %e, "entry reload after sign-in failed");
                        }
                    }
                    None => {
                        entries.clear();
                        questions.write().expect("question list poisoned").clear();
                    }
                }
            }
        });
    }
}
