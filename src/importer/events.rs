//! Progress reporting and cooperative cancellation.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;

use crate::models::{ImportCheckpoint, ImportResult};

/// Stage a long-running operation is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Replaying items already covered by a checkpoint
    Skip,
    Import,
    /// Collecting search documents
    Documents,
    /// Building and sorting postings
    Postings,
    /// Writing asset entries into a bundle
    Assets,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Skip => "skip",
            Phase::Import => "import",
            Phase::Documents => "documents",
            Phase::Postings => "postings",
            Phase::Assets => "assets",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Status(String),
    Progress { phase: Phase, done: usize, total: Option<usize> },
    CheckpointFound { checkpoint: ImportCheckpoint, signature: String },
    Done(ImportResult),
    Cancelled(ImportResult),
    Error(String),
}

/// Receiver of progress events. Emitting never fails the operation.
pub trait EventSink {
    fn emit(&self, event: Event);
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: Event) {}
}

impl EventSink for Sender<Event> {
    fn emit(&self, event: Event) {
        // A dropped receiver just means nobody is listening anymore
        let _ = self.send(event);
    }
}

impl<F: Fn(Event)> EventSink for F {
    fn emit(&self, event: Event) {
        self(event)
    }
}

/// Shared cancellation flag, polled at batch and checkpoint boundaries.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
