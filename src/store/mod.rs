//! Persistent record store.
//!
//! The import pipeline, search index and bundle export only talk to storage through
//! [`RecordStore`]: named collections of JSON records keyed by a caller-supplied id,
//! with atomic multi-record batch writes and read-your-writes consistency.
//!
//! - [`MemoryStore`] keeps everything in process (tests, throwaway runs)
//! - [`FileStore`] keeps one append-only log per collection in a data directory
//!
//! Typed access goes through [`RecordStoreExt`], which (de)serializes any [`Record`].

pub mod file;
pub mod memory;

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use crate::models::{
    Asset, ConversationRecord, DedupIndexEntry, HistoryEvent, ImportCheckpoint, Moment,
    ModelLabel, PromptProfile,
};

pub use file::FileStore;
pub use memory::MemoryStore;

/// Named collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Collection {
    Conversations,
    Moments,
    Prompts,
    Assets,
    ModelLabels,
    HistoryEvents,
    Meta,
    ImportState,
    ConvIndex,
}

impl Collection {
    pub const ALL: [Collection; 9] = [
        Collection::Conversations,
        Collection::Moments,
        Collection::Prompts,
        Collection::Assets,
        Collection::ModelLabels,
        Collection::HistoryEvents,
        Collection::Meta,
        Collection::ImportState,
        Collection::ConvIndex,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Collection::Conversations => "conversations",
            Collection::Moments => "moments",
            Collection::Prompts => "prompt_profiles",
            Collection::Assets => "assets",
            Collection::ModelLabels => "model_labels",
            Collection::HistoryEvents => "history_events",
            Collection::Meta => "meta",
            Collection::ImportState => "import_state",
            Collection::ConvIndex => "conv_index",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("record serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("collection {collection} is corrupt: {message}")]
    Corrupt { collection: Collection, message: String },

    #[error("store lock poisoned")]
    Poisoned,
}

/// Untyped storage contract. Implementations must apply a `put_values` call atomically.
pub trait RecordStore {
    fn get_value(&self, collection: Collection, id: &str) -> Result<Option<Value>, StoreError>;

    /// All records of a collection, ordered by id.
    fn get_all_values(&self, collection: Collection) -> Result<Vec<Value>, StoreError>;

    fn put_values(
        &self,
        collection: Collection,
        records: Vec<(String, Value)>,
    ) -> Result<(), StoreError>;

    fn delete(&self, collection: Collection, id: &str) -> Result<(), StoreError>;

    fn count(&self, collection: Collection) -> Result<usize, StoreError> {
        Ok(self.get_all_values(collection)?.len())
    }
}

/// A serde type living in a fixed collection.
pub trait Record: Serialize + DeserializeOwned {
    const COLLECTION: Collection;

    fn record_id(&self) -> &str;
}

/// Typed helpers over any [`RecordStore`].
pub trait RecordStoreExt: RecordStore {
    fn get<T: Record>(&self, id: &str) -> Result<Option<T>, StoreError> {
        self.get_value(T::COLLECTION, id)?.map(decode).transpose()
    }

    /// Fetch several ids at once; missing ids are absent from the map.
    fn get_many<T: Record>(&self, ids: &[&str]) -> Result<HashMap<String, T>, StoreError> {
        let mut found = HashMap::with_capacity(ids.len());
        for id in ids {
            if let Some(record) = self.get::<T>(id)? {
                found.insert((*id).to_string(), record);
            }
        }
        Ok(found)
    }

    fn get_all<T: Record>(&self) -> Result<Vec<T>, StoreError> {
        self.get_all_values(T::COLLECTION)?.into_iter().map(decode).collect()
    }

    fn put<T: Record>(&self, record: &T) -> Result<(), StoreError> {
        self.put_batch(std::slice::from_ref(record))
    }

    fn put_batch<T: Record>(&self, records: &[T]) -> Result<(), StoreError> {
        if records.is_empty() {
            return Ok(());
        }
        let values = records
            .iter()
            .map(|r| Ok((r.record_id().to_string(), serde_json::to_value(r)?)))
            .collect::<Result<Vec<_>, StoreError>>()?;
        self.put_values(T::COLLECTION, values)
    }

    fn delete_record<T: Record>(&self, id: &str) -> Result<(), StoreError> {
        self.delete(T::COLLECTION, id)
    }
}

impl<S: RecordStore + ?Sized> RecordStoreExt for S {}

fn decode<T: Record>(value: Value) -> Result<T, StoreError> {
    Ok(serde_json::from_value(value)?)
}

macro_rules! impl_record {
    ($ty:ty, $collection:expr) => {
        impl Record for $ty {
            const COLLECTION: Collection = $collection;

            fn record_id(&self) -> &str {
                &self.id
            }
        }
    };
}

impl_record!(ConversationRecord, Collection::Conversations);
impl_record!(Moment, Collection::Moments);
impl_record!(PromptProfile, Collection::Prompts);
impl_record!(Asset, Collection::Assets);
impl_record!(ModelLabel, Collection::ModelLabels);
impl_record!(HistoryEvent, Collection::HistoryEvents);
impl_record!(ImportCheckpoint, Collection::ImportState);
impl_record!(DedupIndexEntry, Collection::ConvIndex);
