use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use serde_json::Value;

use super::{Collection, RecordStore, StoreError};

/// In-process store. Batches are applied under one lock, so they are atomic.
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: Mutex<HashMap<Collection, BTreeMap<String, Value>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RecordStore for MemoryStore {
    fn get_value(&self, collection: Collection, id: &str) -> Result<Option<Value>, StoreError> {
        let guard = self.collections.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(guard.get(&collection).and_then(|records| records.get(id)).cloned())
    }

    fn get_all_values(&self, collection: Collection) -> Result<Vec<Value>, StoreError> {
        let guard = self.collections.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(guard
            .get(&collection)
            .map(|records| records.values().cloned().collect())
            .unwrap_or_default())
    }

    fn put_values(
        &self,
        collection: Collection,
        records: Vec<(String, Value)>,
    ) -> Result<(), StoreError> {
        let mut guard = self.collections.lock().map_err(|_| StoreError::Poisoned)?;
        guard.entry(collection).or_default().extend(records);
        Ok(())
    }

    fn delete(&self, collection: Collection, id: &str) -> Result<(), StoreError> {
        let mut guard = self.collections.lock().map_err(|_| StoreError::Poisoned)?;
        if let Some(records) = guard.get_mut(&collection) {
            records.remove(id);
        }
        Ok(())
    }

    fn count(&self, collection: Collection) -> Result<usize, StoreError> {
        let guard = self.collections.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(guard.get(&collection).map_or(0, BTreeMap::len))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_put_overwrites_and_delete_removes() {
        let store = MemoryStore::new();
        store.put_values(Collection::Meta, vec![("k".to_string(), json!({"v": 1}))]).unwrap();
        store.put_values(Collection::Meta, vec![("k".to_string(), json!({"v": 2}))]).unwrap();
        assert_eq!(store.get_value(Collection::Meta, "k").unwrap(), Some(json!({"v": 2})));
        assert_eq!(store.count(Collection::Meta).unwrap(), 1);

        store.delete(Collection::Meta, "k").unwrap();
        assert_eq!(store.get_value(Collection::Meta, "k").unwrap(), None);
    }

    #[test]
    fn test_collections_are_isolated() {
        let store = MemoryStore::new();
        store.put_values(Collection::Moments, vec![("a".to_string(), json!(1))]).unwrap();
        assert_eq!(store.get_value(Collection::Prompts, "a").unwrap(), None);
        assert!(store.get_all_values(Collection::Prompts).unwrap().is_empty());
    }
}
