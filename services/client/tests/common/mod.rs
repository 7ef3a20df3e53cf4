//! services/client/tests/common/mod.rs
//!
//! In-memory implementations of the remote ports for the store tests:
//! a row/object backend with call counters, injectable failures, and a
//! pause gate for exercising in-flight interleavings, plus a scriptable
//! auth collaborator.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bedtijd_core::domain::{AuthSession, Entry, EntryPatch, NewQuestion, Question, User};
use bedtijd_core::ports::{
    AuthService, EntryTableService, ObjectStorageService, PortError, PortResult,
    QuestionTableService, SessionEvent, SessionEventStream,
};
use chrono::{Duration, Utc};
use client_lib::store::AppStore;
use tokio::sync::{broadcast, Notify};
use uuid::Uuid;

//=========================================================================================
// Mock Row + Object Backend
//=========================================================================================

#[derive(Default)]
pub struct MockBackend {
    pub rows: Mutex<HashMap<(Uuid, i64), Entry>>,
    pub photos: Mutex<Vec<(Uuid, String)>>,
    pub uploads: Mutex<Vec<String>>,
    pub insert_calls: AtomicUsize,
    pub update_calls: AtomicUsize,
    pub list_calls: AtomicUsize,
    pub fail_writes: AtomicBool,
    pub fail_uploads: AtomicBool,
    pub fail_photo_insert: AtomicBool,
    pub reject_writes: AtomicBool,
    paused: AtomicBool,
    release: Notify,
}

impl MockBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Makes subsequent writes park until [`release_writes`] is called,
    /// simulating network latency.
    pub fn pause_writes(&self) {
        self.paused.store(true, Ordering::SeqCst);
    }

    pub fn release_writes(&self) {
        self.paused.store(false, Ordering::SeqCst);
        self.release.notify_waiters();
    }

    async fn wait_if_paused(&self) {
        while self.paused.load(Ordering::SeqCst) {
            self.release.notified().await;
        }
    }

    fn write_failure(&self) -> Option<PortError> {
        if self.reject_writes.load(Ordering::SeqCst) {
            return Some(PortError::Unauthorized);
        }
        if self.fail_writes.load(Ordering::SeqCst) {
            return Some(PortError::Transient("simulated network failure".into()));
        }
        None
    }

    /// Inserts a pre-existing remote row, as if written in a prior session.
    pub fn seed_entry(&self, owner_id: Uuid, question_id: i64, notes: &str) -> Entry {
        let mut entry = Entry::draft(owner_id, question_id);
        entry.id = Some(Uuid::new_v4());
        entry.notes = notes.to_string();
        self.rows
            .lock()
            .unwrap()
            .insert((owner_id, question_id), entry.clone());
        entry
    }

    pub fn row(&self, owner_id: Uuid, question_id: i64) -> Option<Entry> {
        self.rows
            .lock()
            .unwrap()
            .get(&(owner_id, question_id))
            .cloned()
    }

    pub fn write_count(&self) -> usize {
        self.insert_calls.load(Ordering::SeqCst) + self.update_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EntryTableService for MockBackend {
    async fn list_entries(&self, owner_id: Uuid) -> PortResult<Vec<Entry>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        let rows = self.rows.lock().unwrap();
        Ok(rows
            .values()
            .filter(|e| e.owner_id == owner_id)
            .cloned()
            .collect())
    }

    async fn insert_entry(&self, entry: &Entry) -> PortResult<Entry> {
        self.insert_calls.fetch_add(1, Ordering::SeqCst);
        self.wait_if_paused().await;
        if let Some(failure) = self.write_failure() {
            return Err(failure);
        }
        let mut rows = self.rows.lock().unwrap();
        let key = (entry.owner_id, entry.question_id);
        if rows.contains_key(&key) {
            return Err(PortError::Conflict(format!(
                "duplicate entry for question {}",
                entry.question_id
            )));
        }
        let mut stored = entry.clone();
        stored.id = Some(Uuid::new_v4());
        rows.insert(key, stored.clone());
        Ok(stored)
    }

    async fn update_entry(&self, id: Uuid, patch: &EntryPatch) -> PortResult<Entry> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        self.wait_if_paused().await;
        if let Some(failure) = self.write_failure() {
            return Err(failure);
        }
        let mut rows = self.rows.lock().unwrap();
        let row = rows
            .values_mut()
            .find(|e| e.id == Some(id))
            .ok_or_else(|| PortError::NotFound(format!("entry {}", id)))?;
        row.apply(patch);
        Ok(row.clone())
    }

    async fn insert_photo(&self, entry_id: Uuid, storage_path: &str) -> PortResult<()> {
        if self.fail_photo_insert.load(Ordering::SeqCst) {
            return Err(PortError::Transient("simulated attach failure".into()));
        }
        let rows = self.rows.lock().unwrap();
        if !rows.values().any(|e| e.id == Some(entry_id)) {
            return Err(PortError::NotFound(format!("entry {}", entry_id)));
        }
        self.photos
            .lock()
            .unwrap()
            .push((entry_id, storage_path.to_string()));
        Ok(())
    }
}

#[async_trait]
impl ObjectStorageService for MockBackend {
    async fn upload(&self, path: &str, _bytes: &[u8]) -> PortResult<String> {
        if self.fail_uploads.load(Ordering::SeqCst) {
            return Err(PortError::Transient("simulated upload failure".into()));
        }
        let mut uploads = self.uploads.lock().unwrap();
        if uploads.iter().any(|p| p == path) {
            return Err(PortError::Conflict(format!("object exists: {}", path)));
        }
        uploads.push(path.to_string());
        Ok(path.to_string())
    }
}

//=========================================================================================
// Mock Auth Collaborator
//=========================================================================================

pub struct MockAuth {
    pub session: Mutex<Option<AuthSession>>,
    pub restore_calls: AtomicUsize,
    pub fail_restore: AtomicBool,
    pub events: broadcast::Sender<SessionEvent>,
}

impl MockAuth {
    pub fn new(session: Option<AuthSession>) -> Arc<Self> {
        let (events, _) = broadcast::channel(16);
        Arc::new(Self {
            session: Mutex::new(session),
            restore_calls: AtomicUsize::new(0),
            fail_restore: AtomicBool::new(false),
            events,
        })
    }
}

#[async_trait]
impl AuthService for MockAuth {
    async fn restore_session(&self) -> PortResult<Option<AuthSession>> {
        self.restore_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_restore.load(Ordering::SeqCst) {
            return Err(PortError::Transient("simulated restore failure".into()));
        }
        Ok(self.session.lock().unwrap().clone())
    }

    fn session_events(&self) -> SessionEventStream {
        let rx = self.events.subscribe();
        Box::pin(futures::stream::unfold(rx, |mut rx| async move {
            loop {
                match rx.recv().await {
                    Ok(event) => return Some((event, rx)),
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => return None,
                }
            }
        }))
    }

    async fn sign_out(&self) -> PortResult<()> {
        *self.session.lock().unwrap() = None;
        let _ = self.events.send(SessionEvent::SignedOut);
        Ok(())
    }
}

//=========================================================================================
// Mock Question Table
//=========================================================================================

#[derive(Default)]
pub struct MockQuestions {
    pub rows: Mutex<Vec<Question>>,
    pub list_calls: AtomicUsize,
}

impl MockQuestions {
    pub fn new(rows: Vec<Question>) -> Arc<Self> {
        Arc::new(Self {
            rows: Mutex::new(rows),
            list_calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl QuestionTableService for MockQuestions {
    async fn list_questions(&self) -> PortResult<Vec<Question>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.rows.lock().unwrap().clone())
    }

    async fn insert_question(&self, question: &NewQuestion) -> PortResult<Question> {
        let mut rows = self.rows.lock().unwrap();
        let id = rows.iter().map(|q| q.id).max().unwrap_or(0) + 1;
        let created = Question {
            id,
            title: question.title.clone(),
            main: question.main.clone(),
            deep: question.deep.clone(),
            photo_hint: question.photo_hint,
            day_number: question.day_number,
            published: question.published,
        };
        rows.push(created.clone());
        Ok(created)
    }

    async fn update_question(&self, id: i64, question: &NewQuestion) -> PortResult<Question> {
        let mut rows = self.rows.lock().unwrap();
        let row = rows
            .iter_mut()
            .find(|q| q.id == id)
            .ok_or_else(|| PortError::NotFound(format!("question {}", id)))?;
        row.title = question.title.clone();
        row.main = question.main.clone();
        row.deep = question.deep.clone();
        row.photo_hint = question.photo_hint;
        row.day_number = question.day_number;
        row.published = question.published;
        Ok(row.clone())
    }
}

//=========================================================================================
// Harness
//=========================================================================================

pub fn test_user() -> User {
    User {
        id: Uuid::new_v4(),
        email: Some("ouder@example.com".to_string()),
        is_admin: false,
    }
}

pub fn test_session(user: User) -> AuthSession {
    AuthSession {
        user,
        access_token: "test-access-token".to_string(),
        expires_at: Utc::now() + Duration::hours(1),
    }
}

pub struct Harness {
    pub store: Arc<AppStore>,
    pub backend: Arc<MockBackend>,
    pub auth: Arc<MockAuth>,
    pub questions: Arc<MockQuestions>,
    pub user: User,
}

impl Harness {
    /// Builds a store wired to mocks with an authenticated session, without
    /// initializing it.
    pub fn new() -> Self {
        let user = test_user();
        let backend = MockBackend::new();
        let auth = MockAuth::new(Some(test_session(user.clone())));
        let questions = MockQuestions::new(Vec::new());
        let store = Arc::new(AppStore::new(
            auth.clone(),
            backend.clone(),
            questions.clone(),
            backend.clone(),
            None,
        ));
        Self {
            store,
            backend,
            auth,
            questions,
            user,
        }
    }

    /// Builds and initializes an authenticated store.
    pub async fn initialized() -> Self {
        let harness = Self::new();
        harness
            .store
            .init()
            .await
            .expect("store initialization failed");
        harness
    }
}
