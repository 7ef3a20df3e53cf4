//! services/client/src/store/entries.rs
//!
//! The entry cache: the in-memory mapping from question id to the current
//! user's answer record, and the only path through which the UI reads or
//! writes entries.
//!
//! Every mutation is optimistic: the local record changes immediately, then
//! the remote write is serialized behind a per-question FIFO gate, so writes
//! for one question are applied remotely in the order they were issued and at
//! most one is in flight at a time. A failed remote write leaves the local
//! record in place for retry; user input is never reverted.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use bedtijd_core::domain::{Entry, EntryPatch};
use bedtijd_core::ports::EntryTableService;
use tokio::sync::broadcast;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::StoreError;

/// Buffer size for the change-notification channel.
const ENTRY_EVENT_CAPACITY: usize = 64;

//=========================================================================================
// Cache State
//=========================================================================================

/// The synchronization state of one question's entry, as seen by the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    /// No local or remote record.
    Absent,
    /// Local edits only; nothing persisted yet.
    Draft,
    /// Has a remote id and the local record matches the remote one.
    Persisted,
    /// Has a remote id but local edits are pending confirmation.
    PersistedDirty,
}

/// A change notification for one question's entry.
#[derive(Debug, Clone)]
pub struct EntryEvent {
    pub question_id: i64,
}

/// Per-question cache slot.
struct Slot {
    /// The optimistic local record. This is what the UI reads.
    local: Entry,
    /// The last remote-confirmed copy, `None` until the first persist.
    synced: Option<Entry>,
    /// FIFO write gate: at most one remote write in flight per question,
    /// applied in acquisition order.
    gate: Arc<tokio::sync::Mutex<()>>,
}

//=========================================================================================
// EntryCache
//=========================================================================================

/// The single shared mutable resource of the store. Only the operations on
/// this type mutate the map; it is never handed out for direct mutation.
pub struct EntryCache {
    table: Arc<dyn EntryTableService>,
    slots: Mutex<HashMap<i64, Slot>>,
    /// Serializes bulk loads so a duplicate init cannot double-load.
    load_lock: tokio::sync::Mutex<()>,
    events: broadcast::Sender<EntryEvent>,
}

impl EntryCache {
    pub fn new(table: Arc<dyn EntryTableService>) -> Self {
        let (events, _) = broadcast::channel(ENTRY_EVENT_CAPACITY);
        Self {
            table,
            slots: Mutex::new(HashMap::new()),
            load_lock: tokio::sync::Mutex::new(()),
            events,
        }
    }

    /// Subscribes to per-question change notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<EntryEvent> {
        self.events.subscribe()
    }

    /// Synchronous cache read; never touches the network.
    pub fn entry(&self, question_id: i64) -> Option<Entry> {
        let slots = self.slots.lock().expect("entry cache poisoned");
        slots.get(&question_id).map(|s| s.local.clone())
    }

    /// Snapshot of every cached entry, keyed by question id.
    pub fn entries(&self) -> HashMap<i64, Entry> {
        let slots = self.slots.lock().expect("entry cache poisoned");
        slots.iter().map(|(k, s)| (*k, s.local.clone())).collect()
    }

    /// The synchronization state of one question's entry.
    pub fn state(&self, question_id: i64) -> SyncState {
        let slots = self.slots.lock().expect("entry cache poisoned");
        match slots.get(&question_id) {
            None => SyncState::Absent,
            Some(slot) if slot.local.id.is_none() => SyncState::Draft,
            Some(slot) if slot.synced.as_ref() == Some(&slot.local) => SyncState::Persisted,
            Some(_) => SyncState::PersistedDirty,
        }
    }

    /// Records a local draft edit without issuing a remote write
    /// (the `absent -> draft` transition backing the notes textarea).
    pub fn edit_draft(&self, owner_id: Uuid, question_id: i64, patch: &EntryPatch) {
        {
            let mut slots = self.slots.lock().expect("entry cache poisoned");
            let slot = slots
                .entry(question_id)
                .or_insert_with(|| Slot::draft(owner_id, question_id));
            slot.local.apply(patch);
        }
        self.notify(question_id);
    }

    /// The create-or-update write path shared by save, skip, and flag.
    ///
    /// The patch is applied to the local slot immediately; the remote write
    /// then runs behind the per-question gate, snapshotting the slot's
    /// latest local record once the gate is acquired. A write whose snapshot
    /// already matches the confirmed remote state is elided, which is what
    /// makes a repeated skip a single remote update.
    pub async fn write(
        &self,
        owner_id: Uuid,
        question_id: i64,
        patch: EntryPatch,
    ) -> Result<Entry, StoreError> {
        // 1. Optimistic local update, and grab the write gate handle.
        let gate = {
            let mut slots = self.slots.lock().expect("entry cache poisoned");
            let slot = slots
                .entry(question_id)
                .or_insert_with(|| Slot::draft(owner_id, question_id));
            slot.local.apply(&patch);
            Arc::clone(&slot.gate)
        };
        self.notify(question_id);

        // 2. Serialize the remote write. Tokio's mutex queues waiters in
        //    FIFO order, which is the per-question ordering guarantee.
        let _in_flight = gate.lock().await;

        // 3. Snapshot the latest local state now that we hold the gate; a
        //    save issued while an earlier one was in flight carries the
        //    newest record.
        let Some((desired, synced)) = ({
            let slots = self.slots.lock().expect("entry cache poisoned");
            slots
                .get(&question_id)
                .map(|slot| (slot.local.clone(), slot.synced.clone()))
        }) else {
            // The cache was cleared (sign-out) while this write waited.
            return Err(StoreError::Internal(
                "entry evicted while a write was queued".to_string(),
            ));
        };

        if synced.as_ref() == Some(&desired) {
            debug!(question_id, "entry already in sync, eliding remote write");
            return Ok(desired);
        }

        // 4. Insert on first persist, update in place afterwards.
        let result = match synced.as_ref().and_then(|s| s.id) {
            Some(id) => {
                let remote_patch = desired.as_patch();
                self.table.update_entry(id, &remote_patch).await
            }
            None => self.table.insert_entry(&desired).await,
        };

        match result {
            Ok(confirmed) => {
                self.confirm(question_id, confirmed.clone());
                Ok(confirmed)
            }
            Err(e) => {
                // Local state stays authoritative so the user can retry.
                warn!(question_id, error = %e, "remote entry write failed, keeping local state");
                Err(StoreError::Port(e))
            }
        }
    }

    /// Makes sure a persisted entry exists for the question and returns its
    /// remote id. Used by the photo orchestrator, which must never reference
    /// an unpersisted entry.
    pub async fn ensure_persisted(
        &self,
        owner_id: Uuid,
        question_id: i64,
    ) -> Result<Uuid, StoreError> {
        if let Some(id) = self.entry(question_id).and_then(|e| e.id) {
            return Ok(id);
        }
        let entry = self
            .write(owner_id, question_id, EntryPatch::default())
            .await?;
        entry.id.ok_or_else(|| {
            StoreError::Internal("remote store returned an entry without an id".to_string())
        })
    }

    /// Bulk load: fetches all entries owned by the user and rebuilds the
    /// cache keyed by question id, overwriting any pre-session local drafts
    /// for those keys. Loads are serialized and idempotent, so a duplicate
    /// init neither duplicates entries nor races a second fetch against the
    /// first.
    pub async fn load_all(&self, owner_id: Uuid) -> Result<usize, StoreError> {
        let _loading = self.load_lock.lock().await;
        let fetched = self.table.list_entries(owner_id).await?;
        let count = fetched.len();

        let changed: Vec<i64> = {
            let mut slots = self.slots.lock().expect("entry cache poisoned");
            let mut changed = Vec::with_capacity(count);
            for entry in fetched {
                let question_id = entry.question_id;
                let gate = slots
                    .get(&question_id)
                    .map(|s| Arc::clone(&s.gate))
                    .unwrap_or_default();
                slots.insert(
                    question_id,
                    Slot {
                        local: entry.clone(),
                        synced: Some(entry),
                        gate,
                    },
                );
                changed.push(question_id);
            }
            changed
        };

        for question_id in changed {
            self.notify(question_id);
        }
        debug!(count, "entry bulk load complete");
        Ok(count)
    }

    /// Appends a confirmed photo reference to the cached entry. Both the
    /// local and confirmed copies change, so the slot stays `Persisted`.
    pub fn record_photo(&self, question_id: i64, storage_path: &str) {
        {
            let mut slots = self.slots.lock().expect("entry cache poisoned");
            if let Some(slot) = slots.get_mut(&question_id) {
                slot.local.photos.push(storage_path.to_string());
                if let Some(synced) = slot.synced.as_mut() {
                    synced.photos.push(storage_path.to_string());
                }
            }
        }
        self.notify(question_id);
    }

    /// Drops all cached entries (sign-out).
    pub fn clear(&self) {
        let keys: Vec<i64> = {
            let mut slots = self.slots.lock().expect("entry cache poisoned");
            let keys = slots.keys().copied().collect();
            slots.clear();
            keys
        };
        for question_id in keys {
            self.notify(question_id);
        }
    }

    /// Records the remote-confirmed row. The confirmed photos/fields become
    /// the sync baseline; local keeps any edits applied while the write was
    /// in flight, only adopting the remote-assigned id.
    fn confirm(&self, question_id: i64, confirmed: Entry) {
        {
            let mut slots = self.slots.lock().expect("entry cache poisoned");
            if let Some(slot) = slots.get_mut(&question_id) {
                if slot.local.id.is_none() {
                    slot.local.id = confirmed.id;
                }
                slot.synced = Some(confirmed);
            }
        }
        self.notify(question_id);
    }

    fn notify(&self, question_id: i64) {
        // No receivers is fine; the UI may not have subscribed yet.
        let _ = self.events.send(EntryEvent { question_id });
    }
}

impl Slot {
    fn draft(owner_id: Uuid, question_id: i64) -> Self {
        Self {
            local: Entry::draft(owner_id, question_id),
            synced: None,
            gate: Arc::default(),
        }
    }
}
