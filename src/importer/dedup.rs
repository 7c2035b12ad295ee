use std::collections::HashMap;

use crate::models::{ConversationRecord, DedupIndexEntry, EpochMillis};
use crate::store::{RecordStore, RecordStoreExt, StoreError};

/// Classification of an incoming record against what is already stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    New,
    /// Strictly newer than the stored copy
    Updated,
    Skip,
}

impl Verdict {
    pub fn accepted(self) -> bool {
        !matches!(self, Verdict::Skip)
    }
}

/// An incoming record supersedes an existing one only if strictly newer.
pub fn freshness(existing: Option<EpochMillis>, incoming: EpochMillis) -> Verdict {
    match existing {
        None => Verdict::New,
        Some(known) if incoming > known => Verdict::Updated,
        Some(_) => Verdict::Skip,
    }
}

/// Existence/freshness checks against the `conv_index` collection.
pub struct DedupIndex<'a, S: ?Sized> {
    store: &'a S,
}

impl<'a, S: RecordStore + ?Sized> DedupIndex<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Classify a batch with one index lookup.
    ///
    /// Records repeating an id earlier in the same batch are judged against that earlier
    /// record when it was accepted.
    pub fn classify(&self, batch: &[ConversationRecord]) -> Result<Vec<Verdict>, StoreError> {
        let ids: Vec<&str> = batch.iter().map(|r| r.id.as_str()).collect();
        let mut known: HashMap<String, EpochMillis> = self
            .store
            .get_many::<DedupIndexEntry>(&ids)?
            .into_iter()
            .map(|(id, entry)| (id, entry.update_time))
            .collect();

        Ok(batch
            .iter()
            .map(|record| {
                let verdict = freshness(known.get(&record.id).copied(), record.updated_at);
                if verdict.accepted() {
                    known.insert(record.id.clone(), record.updated_at);
                }
                verdict
            })
            .collect())
    }

    /// Write accepted records, then their index entries, each as one atomic batch.
    pub fn record(&self, accepted: &[ConversationRecord]) -> Result<(), StoreError> {
        if accepted.is_empty() {
            return Ok(());
        }
        let entries: Vec<DedupIndexEntry> = accepted
            .iter()
            .map(|r| DedupIndexEntry { id: r.id.clone(), update_time: r.updated_at })
            .collect();
        self.store.put_batch(accepted)?;
        self.store.put_batch(&entries)
    }
}
