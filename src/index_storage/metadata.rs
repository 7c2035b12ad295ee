//! Cache metadata

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::IndexStats;

/// Cache schema version for invalidation on format changes
pub const CACHE_VERSION: u32 = 2;

/// Written next to the serialized index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexMetadata {
    pub version: u32,
    pub doc_count: usize,
    pub gram_count: usize,
    pub built_at: DateTime<Utc>,
}

impl IndexMetadata {
    pub fn new(stats: IndexStats) -> Self {
        Self {
            version: CACHE_VERSION,
            doc_count: stats.doc_count,
            gram_count: stats.gram_count,
            built_at: Utc::now(),
        }
    }
}
