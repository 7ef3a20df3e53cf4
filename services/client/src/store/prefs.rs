//! services/client/src/store/prefs.rs
//!
//! UI-affecting but low-stakes state: the current language plus the
//! notification toggles. One shared watch channel, so every component reads
//! the same value the moment it changes. Persistence is best-effort JSON on
//! disk; a failure to write is logged and otherwise ignored.

use std::path::PathBuf;

use bedtijd_core::domain::{Language, Preferences};
use tokio::sync::watch;
use tracing::{debug, warn};

pub struct PreferenceStore {
    tx: watch::Sender<Preferences>,
    path: Option<PathBuf>,
}

impl PreferenceStore {
    /// Creates the store, loading persisted preferences when a path is
    /// given. A missing or unreadable file yields the defaults (Dutch,
    /// notifications off).
    pub fn new(path: Option<PathBuf>) -> Self {
        let initial = path
            .as_deref()
            .and_then(|p| match std::fs::read_to_string(p) {
                Ok(raw) => match serde_json::from_str::<Preferences>(&raw) {
                    Ok(prefs) => Some(prefs),
                    Err(e) => {
                        warn!(error = %e, "ignoring malformed preference file");
                        None
                    }
                },
                Err(_) => None,
            })
            .unwrap_or_default();
        let (tx, _) = watch::channel(initial);
        Self { tx, path }
    }

    /// The current preferences snapshot.
    pub fn current(&self) -> Preferences {
        self.tx.borrow().clone()
    }

    pub fn language(&self) -> Language {
        self.tx.borrow().language
    }

    /// Subscribes to preference changes.
    pub fn subscribe(&self) -> watch::Receiver<Preferences> {
        self.tx.subscribe()
    }

    pub fn set_language(&self, language: Language) {
        self.update(|p| p.language = language);
    }

    pub fn set_notify_bedtime(&self, enabled: bool) {
        self.update(|p| p.notify_bedtime = enabled);
    }

    pub fn set_notify_new_questions(&self, enabled: bool) {
        self.update(|p| p.notify_new_questions = enabled);
    }

    pub fn set_bedtime(&self, bedtime: Option<String>) {
        self.update(|p| p.bedtime = bedtime);
    }

    fn update(&self, apply: impl FnOnce(&mut Preferences)) {
        self.tx.send_modify(apply);
        self.persist();
    }

    fn persist(&self) {
        let Some(path) = self.path.as_deref() else {
            return;
        };
        let snapshot = self.tx.borrow().clone();
        match serde_json::to_string_pretty(&snapshot) {
            Ok(raw) => {
                if let Err(e) = std::fs::write(path, raw) {
                    warn!(path = %path.display(), error = %e, "failed to persist preferences");
                } else {
                    debug!(path = %path.display(), "preferences persisted");
                }
            }
            Err(e) => warn!(error = %e, "failed to serialize preferences"),
        }
    }
}
