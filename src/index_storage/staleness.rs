//! The `search_state` flag: set by writers, cleared after a rebuild is cached.

use serde::{Deserialize, Serialize};

use crate::models::EpochMillis;
use crate::store::{Collection, Record, RecordStore, RecordStoreExt, StoreError};

const SEARCH_STATE_ID: &str = "search_state";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchState {
    pub id: String,
    pub dirty: bool,
    pub updated_at: EpochMillis,
}

impl Record for SearchState {
    const COLLECTION: Collection = Collection::Meta;

    fn record_id(&self) -> &str {
        &self.id
    }
}

fn set_dirty<S: RecordStore + ?Sized>(store: &S, dirty: bool) -> Result<(), StoreError> {
    store.put(&SearchState {
        id: SEARCH_STATE_ID.to_string(),
        dirty,
        updated_at: EpochMillis::now(),
    })
}

/// Flag the search index as out of date.
pub fn mark_search_dirty<S: RecordStore + ?Sized>(store: &S) -> Result<(), StoreError> {
    set_dirty(store, true)
}

pub fn mark_search_clean<S: RecordStore + ?Sized>(store: &S) -> Result<(), StoreError> {
    set_dirty(store, false)
}

/// A store that has never recorded a state counts as clean; a missing cache is
/// detected separately.
pub fn is_search_dirty<S: RecordStore + ?Sized>(store: &S) -> Result<bool, StoreError> {
    Ok(store.get::<SearchState>(SEARCH_STATE_ID)?.is_some_and(|s| s.dirty))
}
