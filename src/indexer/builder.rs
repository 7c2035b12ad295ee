//! Index building over the record store.
//!
//! # Error Handling Strategy
//!
//! - **Storage reads** propagate as [`StoreError`]; a build never produces a partial index
//!   from a failed read.
//! - **Cancellation** is polled between conversations and between entity kinds, and
//!   yields `Ok(None)`.

use std::thread;

use tracing::{debug, info};

use super::documents::{
    conversation_documents, history_document, moment_document, prompt_document,
};
use super::state::IndexState;
use crate::config::SearchConfig;
use crate::importer::{CancelToken, Event, EventSink, NullSink, Phase};
use crate::models::{ConversationRecord, HistoryEvent, Moment, PromptProfile};
use crate::store::{RecordStore, RecordStoreExt, StoreError};

/// Builds an [`IndexState`] from every conversation, moment, prompt and history event.
pub struct IndexBuilder<'a, S: RecordStore + ?Sized> {
    store: &'a S,
    config: &'a SearchConfig,
    events: &'a dyn EventSink,
    cancel: CancelToken,
}

impl<'a, S: RecordStore + ?Sized> IndexBuilder<'a, S> {
    pub fn new(store: &'a S, config: &'a SearchConfig) -> Self {
        Self { store, config, events: &NullSink, cancel: CancelToken::new() }
    }

    pub fn with_events(mut self, events: &'a dyn EventSink) -> Self {
        self.events = events;
        self
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Build a fresh index.
    ///
    /// Conversations are indexed first, then moments, prompts and history events, so
    /// document ordinals follow that order.
    ///
    /// # Returns
    ///
    /// The built index, or `None` if the build was cancelled.
    ///
    /// # Errors
    ///
    /// Returns an error if any collection cannot be read.
    pub fn build(&self) -> Result<Option<IndexState>, StoreError> {
        self.status("Building search index");
        let mut state = IndexState::new();

        let conversations = self.store.get_all::<ConversationRecord>()?;
        let total = conversations.len();
        for (i, conv) in conversations.iter().enumerate() {
            if self.cancel.is_cancelled() {
                info!("Index build cancelled after {} conversations", i);
                return Ok(None);
            }
            for doc in conversation_documents(conv, self.config.chunk_chars) {
                state.add(doc);
            }
            if i % self.config.yield_every.max(1) == 0 {
                self.progress(Phase::Documents, i, Some(total));
                thread::yield_now();
            }
        }

        for moment in self.store.get_all::<Moment>()? {
            state.add(moment_document(&moment));
        }
        if self.cancel.is_cancelled() {
            return Ok(None);
        }
        for prompt in self.store.get_all::<PromptProfile>()? {
            state.add(prompt_document(&prompt));
        }
        if self.cancel.is_cancelled() {
            return Ok(None);
        }
        for event in self.store.get_all::<HistoryEvent>()? {
            state.add(history_document(&event));
        }
        if self.cancel.is_cancelled() {
            return Ok(None);
        }

        let stats = state.stats();
        self.progress(Phase::Documents, total, Some(total));
        state.finish();
        self.progress(Phase::Postings, stats.gram_count, Some(stats.gram_count));

        info!("Indexed {} documents, {} grams", stats.doc_count, stats.gram_count);
        self.status("Search index ready");
        Ok(Some(state))
    }

    fn progress(&self, phase: Phase, done: usize, total: Option<usize>) {
        self.events.emit(Event::Progress { phase, done, total });
    }

    fn status(&self, message: &str) {
        debug!("{}", message);
        self.events.emit(Event::Status(message.to_string()));
    }
}
