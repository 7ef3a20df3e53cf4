//! services/client/src/store/photos.rs
//!
//! Coordinates a photo upload with entry creation. A photo reference is
//! meaningless without a persisted entry, so the orchestrator first drives
//! the create-or-update path and only uploads once a remote entry id exists.

use std::sync::Arc;

use bedtijd_core::ports::{EntryTableService, ObjectStorageService};
use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::StoreError;
use crate::store::entries::EntryCache;

pub struct PhotoOrchestrator {
    storage: Arc<dyn ObjectStorageService>,
    table: Arc<dyn EntryTableService>,
}

impl PhotoOrchestrator {
    pub fn new(storage: Arc<dyn ObjectStorageService>, table: Arc<dyn EntryTableService>) -> Self {
        Self { storage, table }
    }

    /// Attaches a photo to the entry for `question_id`, creating the entry
    /// remotely first if needed. Returns the storage path of the uploaded
    /// blob.
    ///
    /// Failure ordering matters here:
    /// - ensure-entry failure aborts before any upload;
    /// - upload failure leaves no photo record behind;
    /// - attach failure after a successful upload is the distinct partial
    ///   failure [`StoreError::PhotoAttach`] — the blob exists, unreferenced.
    pub async fn attach_photo(
        &self,
        cache: &EntryCache,
        owner_id: Uuid,
        question_id: i64,
        file_name: &str,
        bytes: &[u8],
    ) -> Result<String, StoreError> {
        // 1. A persisted entry must exist before anything is uploaded.
        let entry_id = cache.ensure_persisted(owner_id, question_id).await?;

        // 2. Upload under a path namespaced by owner and question, with a
        //    time suffix to avoid collisions. No-overwrite semantics come
        //    from the storage port.
        let path = format!(
            "{}/{}/{}-{}",
            owner_id,
            question_id,
            Utc::now().timestamp_millis(),
            file_name
        );
        let storage_path = self.storage.upload(&path, bytes).await?;

        // 3. Record the reference against the entry. From here on the blob
        //    exists, so a failure is surfaced as a partial one rather than
        //    swallowed; cleanup of the orphaned blob is out of scope.
        if let Err(source) = self.table.insert_photo(entry_id, &storage_path).await {
            warn!(
                question_id,
                storage_path, error = %source,
                "photo uploaded but could not be attached"
            );
            return Err(StoreError::PhotoAttach {
                storage_path,
                source,
            });
        }

        cache.record_photo(question_id, &storage_path);
        info!(question_id, storage_path, "photo attached");
        Ok(storage_path)
    }
}
