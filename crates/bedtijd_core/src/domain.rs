//! crates/bedtijd_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any backend wire format.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An admin-curated prompt with optional deep follow-ups and a day ordering.
///
/// Questions are immutable once published; `published` gates visibility to
/// non-admin readers (enforced remotely, mirrored here for display).
#[derive(Debug, Clone, PartialEq)]
pub struct Question {
    pub id: i64,
    pub title: String,
    pub main: String,
    pub deep: Vec<String>,
    pub photo_hint: bool,
    pub day_number: i32,
    pub published: bool,
}

/// Input for creating or editing a question through the admin surface.
#[derive(Debug, Clone)]
pub struct NewQuestion {
    pub title: String,
    pub main: String,
    pub deep: Vec<String>,
    pub photo_hint: bool,
    pub day_number: i32,
    pub published: bool,
}

/// The lifecycle status of an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryStatus {
    Answered,
    Skipped,
    Flagged,
}

impl Default for EntryStatus {
    fn default() -> Self {
        EntryStatus::Answered
    }
}

/// One user's recorded response to one question.
///
/// `id` is `None` until the first successful remote persist and is assigned
/// exactly once by the remote store. At most one entry exists per
/// (owner, question) pair.
///
/// Invariant: `flag_reason` is `Some` if and only if `status` is `Flagged`.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub id: Option<Uuid>,
    pub question_id: i64,
    pub owner_id: Uuid,
    pub notes: String,
    pub status: EntryStatus,
    pub flag_reason: Option<String>,
    pub photos: Vec<String>,
}

impl Entry {
    /// Creates an empty local draft for a question, before any persist.
    pub fn draft(owner_id: Uuid, question_id: i64) -> Self {
        Self {
            id: None,
            question_id,
            owner_id,
            notes: String::new(),
            status: EntryStatus::Answered,
            flag_reason: None,
            photos: Vec::new(),
        }
    }

    /// Applies a partial update. Fields absent from the patch are left
    /// untouched, which is what preserves `flag_reason` across a plain
    /// notes save. Setting any non-flagged status clears `flag_reason`.
    pub fn apply(&mut self, patch: &EntryPatch) {
        if let Some(notes) = &patch.notes {
            self.notes = notes.clone();
        }
        if let Some(status) = patch.status {
            self.status = status;
            if status != EntryStatus::Flagged {
                self.flag_reason = None;
            }
        }
        if let Some(reason) = &patch.flag_reason {
            self.flag_reason = Some(reason.clone());
        }
    }

    /// The full-field patch equivalent of this entry, used when pushing the
    /// latest local state to an existing remote row.
    pub fn as_patch(&self) -> EntryPatch {
        EntryPatch {
            notes: Some(self.notes.clone()),
            status: Some(self.status),
            flag_reason: self.flag_reason.clone(),
        }
    }
}

/// A partial update to an entry. `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct EntryPatch {
    pub notes: Option<String>,
    pub status: Option<EntryStatus>,
    pub flag_reason: Option<String>,
}

impl EntryPatch {
    /// A patch that only replaces the notes text.
    pub fn notes(notes: impl Into<String>) -> Self {
        Self {
            notes: Some(notes.into()),
            ..Default::default()
        }
    }

    /// The patch applied by the skip operation.
    pub fn skipped() -> Self {
        Self {
            status: Some(EntryStatus::Skipped),
            ..Default::default()
        }
    }

    /// The patch applied by the flag operation. An empty reason is still
    /// recorded, never dropped.
    pub fn flagged(reason: impl Into<String>) -> Self {
        Self {
            status: Some(EntryStatus::Flagged),
            flag_reason: Some(reason.into()),
            ..Default::default()
        }
    }
}

/// The authenticated user, used throughout the store.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: Uuid,
    pub email: Option<String>,
    pub is_admin: bool,
}

/// An authenticated identity and its validity window.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub user: User,
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
}

/// The UI language. Dutch is the app's default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Nl,
    En,
}

impl Default for Language {
    fn default() -> Self {
        Language::Nl
    }
}

impl Language {
    pub fn as_str(self) -> &'static str {
        match self {
            Language::Nl => "nl",
            Language::En => "en",
        }
    }

    /// Parses a language tag, tolerant of case and region suffixes.
    pub fn parse(value: &str) -> Option<Self> {
        let lang = value.trim().to_ascii_lowercase();
        match lang.split(['-', '_']).next().unwrap_or("") {
            "nl" => Some(Language::Nl),
            "en" => Some(Language::En),
            _ => None,
        }
    }
}

/// Per-device UI preferences. Low-stakes state with best-effort persistence;
/// not required to be consistent across devices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    pub language: Language,
    pub notify_bedtime: bool,
    pub notify_new_questions: bool,
    /// Bedtime as "HH:MM", used for the reminder toggle.
    pub bedtime: Option<String>,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            language: Language::Nl,
            notify_bedtime: false,
            notify_new_questions: false,
            bedtime: None,
        }
    }
}
