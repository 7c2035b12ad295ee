//! Resumable import of conversation exports.
//!
//! # Error Handling Strategy
//!
//! - **Per-object problems** (malformed JSON, objects that normalize to nothing) are logged
//!   and counted as processed; they never abort a run.
//!
//! - **Fatal problems** (missing archive entry, unsupported compression, unreadable root,
//!   storage write failure) abort the run with an [`ImportFailure`] that carries the
//!   counts that were durably recorded. A best-effort checkpoint of that durable state is
//!   saved first, so a later resume does not redo landed work.
//!
//! - **Cancellation** is not an error: it returns [`ImportOutcome::Cancelled`] after
//!   flushing pending records and saving a checkpoint.

pub mod checkpoint;
pub mod dedup;
pub mod events;
pub mod pipeline;
pub mod signature;
pub mod timeline;

use std::io;

use thiserror::Error;

pub use checkpoint::CheckpointStore;
pub use dedup::{DedupIndex, Verdict};
pub use events::{CancelToken, Event, EventSink, NullSink, Phase};
pub use pipeline::{ImportOptions, ImportOutcome, ImportPipeline};
pub use signature::file_signature;
pub use timeline::TimelineStats;

use crate::archive::ArchiveError;
use crate::models::ImportStats;
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum ImportError {
    #[error(transparent)]
    Archive(#[from] ArchiveError),

    #[error("malformed input: {0}")]
    MalformedRoot(String),

    #[error("input is {size} bytes, larger than the {limit} byte limit")]
    InputTooLarge { size: u64, limit: u64 },

    #[error("storage write failed: {0}")]
    Storage(#[from] StoreError),

    #[error("I/O error: {0}")]
    Io(#[source] io::Error),
}

impl From<io::Error> for ImportError {
    /// Archive problems detected while streaming an entry surface as I/O errors.
    fn from(error: io::Error) -> Self {
        if !error.get_ref().is_some_and(|inner| inner.is::<ArchiveError>()) {
            return ImportError::Io(error);
        }
        match error.into_inner().map(|inner| inner.downcast::<ArchiveError>()) {
            Some(Ok(archive)) => ImportError::Archive(*archive),
            _ => ImportError::Io(io::Error::other("archive entry could not be read")),
        }
    }
}

/// A fatal import error together with the counts recorded before it happened.
#[derive(Debug, Error)]
#[error(
    "{error} (processed {}, saved {}, skipped {})",
    .stats.processed,
    .stats.saved,
    .stats.skipped
)]
pub struct ImportFailure {
    #[source]
    pub error: ImportError,
    pub stats: ImportStats,
}

impl ImportFailure {
    pub fn new(error: impl Into<ImportError>, stats: ImportStats) -> Self {
        Self { error: error.into(), stats }
    }
}
