//! services/client/src/adapters/rest.rs
//!
//! PostgREST-style implementation of the row-storage ports. Row-level access
//! control lives server-side: a caller can only read or write entries where
//! `owner_id` is their own id, and non-admin reads of `questions` are
//! filtered to `published = true`. This adapter only arranges the requests
//! and maps the failures.

use async_trait::async_trait;
use bedtijd_core::domain::{Entry, EntryPatch, EntryStatus, NewQuestion, Question};
use bedtijd_core::ports::{EntryTableService, PortError, PortResult, QuestionTableService};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use url::Url;
use uuid::Uuid;

use super::{bearer, error_from_response, transport_error, TokenStore};
use crate::config::Config;

/// Select clause that embeds each entry's photo references.
const ENTRY_SELECT: &str = "*,photos(storage_path)";

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter implementing `EntryTableService` and `QuestionTableService`
/// against a PostgREST-style endpoint.
#[derive(Clone)]
pub struct SupabaseRestAdapter {
    http: reqwest::Client,
    base: Url,
    anon_key: String,
    tokens: TokenStore,
}

impl SupabaseRestAdapter {
    pub fn new(http: reqwest::Client, config: &Config, tokens: TokenStore) -> Self {
        Self {
            http,
            base: config.supabase_url.clone(),
            anon_key: config.supabase_anon_key.clone(),
            tokens,
        }
    }

    fn request(&self, method: Method, relation: &str) -> PortResult<reqwest::RequestBuilder> {
        let url = self
            .base
            .join(&format!("/rest/v1/{}", relation))
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(self
            .http
            .request(method, url)
            .header("apikey", &self.anon_key)
            .bearer_auth(bearer(&self.tokens, &self.anon_key)))
    }

    /// Sends a request expecting a single returned row (PostgREST returns a
    /// representation as a one-element array).
    async fn send_returning_row<T: serde::de::DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> PortResult<T> {
        let response = request
            .header("Prefer", "return=representation")
            .send()
            .await
            .map_err(transport_error)?;
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }
        let mut rows: Vec<T> = response
            .json()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        if rows.is_empty() {
            return Err(PortError::Unexpected(
                "remote store returned no representation".to_string(),
            ));
        }
        Ok(rows.remove(0))
    }
}

//=========================================================================================
// "Impure" Wire Record Structs
//=========================================================================================

#[derive(Deserialize)]
struct PhotoRecord {
    storage_path: String,
}

#[derive(Deserialize)]
struct EntryRecord {
    id: Uuid,
    question_id: i64,
    owner_id: Uuid,
    notes: String,
    status: EntryStatus,
    flag_reason: Option<String>,
    #[serde(default)]
    photos: Vec<PhotoRecord>,
}

impl EntryRecord {
    fn to_domain(self) -> Entry {
        Entry {
            id: Some(self.id),
            question_id: self.question_id,
            owner_id: self.owner_id,
            notes: self.notes,
            status: self.status,
            flag_reason: self.flag_reason,
            photos: self.photos.into_iter().map(|p| p.storage_path).collect(),
        }
    }
}

#[derive(Serialize)]
struct InsertEntryBody<'a> {
    question_id: i64,
    owner_id: Uuid,
    notes: &'a str,
    status: EntryStatus,
    flag_reason: Option<&'a str>,
}

#[derive(Deserialize)]
struct QuestionRecord {
    id: i64,
    title: String,
    main: String,
    #[serde(default)]
    deep: Vec<String>,
    photo_hint: bool,
    day_number: i32,
    published: bool,
}

impl QuestionRecord {
    fn to_domain(self) -> Question {
        Question {
            id: self.id,
            title: self.title,
            main: self.main,
            deep: self.deep,
            photo_hint: self.photo_hint,
            day_number: self.day_number,
            published: self.published,
        }
    }
}

#[derive(Serialize)]
struct QuestionBody<'a> {
    title: &'a str,
    main: &'a str,
    deep: &'a [String],
    photo_hint: bool,
    day_number: i32,
    published: bool,
}

impl<'a> QuestionBody<'a> {
    fn from_new(question: &'a NewQuestion) -> Self {
        Self {
            title: &question.title,
            main: &question.main,
            deep: &question.deep,
            photo_hint: question.photo_hint,
            day_number: question.day_number,
            published: question.published,
        }
    }
}

/// Builds the wire body for a partial entry update. `flag_reason` is set to
/// an explicit null when the status moves away from flagged, mirroring the
/// domain patch semantics.
fn patch_body(patch: &EntryPatch) -> Map<String, Value> {
    let mut body = Map::new();
    if let Some(notes) = &patch.notes {
        body.insert("notes".to_string(), json!(notes));
    }
    if let Some(status) = patch.status {
        body.insert("status".to_string(), json!(status));
        if status != EntryStatus::Flagged {
            body.insert("flag_reason".to_string(), Value::Null);
        }
    }
    if let Some(reason) = &patch.flag_reason {
        body.insert("flag_reason".to_string(), json!(reason));
    }
    body
}

//=========================================================================================
// `EntryTableService` Trait Implementation
//=========================================================================================

#[async_trait]
impl EntryTableService for SupabaseRestAdapter {
    async fn list_entries(&self, owner_id: Uuid) -> PortResult<Vec<Entry>> {
        let filter = format!("eq.{}", owner_id);
        let response = self
            .request(Method::GET, "entries")?
            .query(&[
                ("select", ENTRY_SELECT),
                ("owner_id", filter.as_str()),
            ])
            .send()
            .await
            .map_err(transport_error)?;
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }
        let records: Vec<EntryRecord> = response
            .json()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn insert_entry(&self, entry: &Entry) -> PortResult<Entry> {
        let body = InsertEntryBody {
            question_id: entry.question_id,
            owner_id: entry.owner_id,
            notes: &entry.notes,
            status: entry.status,
            flag_reason: entry.flag_reason.as_deref(),
        };
        let request = self
            .request(Method::POST, "entries")?
            .query(&[("select", ENTRY_SELECT)])
            .json(&body);
        let record: EntryRecord = self.send_returning_row(request).await?;
        Ok(record.to_domain())
    }

    async fn update_entry(&self, id: Uuid, patch: &EntryPatch) -> PortResult<Entry> {
        let filter = format!("eq.{}", id);
        let request = self
            .request(Method::PATCH, "entries")?
            .query(&[("select", ENTRY_SELECT), ("id", filter.as_str())])
            .json(&patch_body(patch));
        let record: EntryRecord = self.send_returning_row(request).await?;
        Ok(record.to_domain())
    }

    async fn insert_photo(&self, entry_id: Uuid, storage_path: &str) -> PortResult<()> {
        let response = self
            .request(Method::POST, "photos")?
            .header("Prefer", "return=minimal")
            .json(&json!({ "entry_id": entry_id, "storage_path": storage_path }))
            .send()
            .await
            .map_err(transport_error)?;
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }
        Ok(())
    }
}

//=========================================================================================
// `QuestionTableService` Trait Implementation
//=========================================================================================

#[async_trait]
impl QuestionTableService for SupabaseRestAdapter {
    async fn list_questions(&self) -> PortResult<Vec<Question>> {
        let response = self
            .request(Method::GET, "questions")?
            .query(&[("select", "*"), ("order", "day_number.asc")])
            .send()
            .await
            .map_err(transport_error)?;
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }
        let records: Vec<QuestionRecord> = response
            .json()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn insert_question(&self, question: &NewQuestion) -> PortResult<Question> {
        let request = self
            .request(Method::POST, "questions")?
            .json(&QuestionBody::from_new(question));
        let record: QuestionRecord = self.send_returning_row(request).await?;
        Ok(record.to_domain())
    }

    async fn update_question(&self, id: i64, question: &NewQuestion) -> PortResult<Question> {
        let request = self
            .request(Method::PATCH, "questions")?
            .query(&[("id", &format!("eq.{}", id))])
            .json(&QuestionBody::from_new(question));
        let record: QuestionRecord = self.send_returning_row(request).await?;
        Ok(record.to_domain())
    }
}
