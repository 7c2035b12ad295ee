use serde::{Deserialize, Serialize};

use super::time::EpochMillis;

/// Shadow of a stored conversation used for existence/freshness checks
/// without loading message bodies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DedupIndexEntry {
    pub id: String,
    pub update_time: EpochMillis,
}

/// Persisted import progress for one input file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportCheckpoint {
    /// File signature this checkpoint belongs to
    pub id: String,
    pub processed_count: usize,
    pub saved_count: usize,
    pub skipped_count: usize,
    pub updated_at: EpochMillis,
}

/// Counters accumulated during a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportStats {
    pub processed: usize,
    pub saved: usize,
    pub skipped: usize,
}

/// Final counts of a completed (or cancelled) run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportResult {
    pub saved: usize,
    pub skipped: usize,
    pub processed: usize,
    pub history_events_created: usize,
}

impl From<ImportStats> for ImportResult {
    fn from(stats: ImportStats) -> Self {
        Self {
            saved: stats.saved,
            skipped: stats.skipped,
            processed: stats.processed,
            history_events_created: 0,
        }
    }
}
