use tracing::debug;

use crate::models::{EpochMillis, ImportCheckpoint, ImportStats};
use crate::store::{RecordStore, RecordStoreExt, StoreError};

/// Import progress keyed by file signature.
pub struct CheckpointStore<'a, S: ?Sized> {
    store: &'a S,
}

impl<'a, S: RecordStore + ?Sized> CheckpointStore<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    pub fn load(&self, signature: &str) -> Result<Option<ImportCheckpoint>, StoreError> {
        self.store.get::<ImportCheckpoint>(signature)
    }

    /// Persist a snapshot of `stats` for `signature`.
    ///
    /// A snapshot behind the stored one is not written, so `processed_count` never
    /// decreases for a signature.
    pub fn save(&self, signature: &str, stats: &ImportStats) -> Result<(), StoreError> {
        if let Some(existing) = self.load(signature)?
            && existing.processed_count > stats.processed
        {
            debug!(
                "Keeping checkpoint at {} (snapshot at {} is behind)",
                existing.processed_count, stats.processed
            );
            return Ok(());
        }

        let checkpoint = ImportCheckpoint {
            id: signature.to_string(),
            processed_count: stats.processed,
            saved_count: stats.saved,
            skipped_count: stats.skipped,
            updated_at: EpochMillis::now(),
        };
        self.store.put(&checkpoint)?;
        debug!("Saved checkpoint at {} processed items", stats.processed);
        Ok(())
    }

    pub fn clear(&self, signature: &str) -> Result<(), StoreError> {
        self.store.delete_record::<ImportCheckpoint>(signature)
    }

    /// Every pending checkpoint, ordered by signature.
    pub fn list(&self) -> Result<Vec<ImportCheckpoint>, StoreError> {
        self.store.get_all::<ImportCheckpoint>()
    }
}
