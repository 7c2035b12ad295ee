//! Data models for the album.
//!
//! - [`ConversationRecord`] / [`Message`] - canonical conversations produced by import
//! - [`Moment`], [`PromptProfile`], [`HistoryEvent`], [`Asset`], [`ModelLabel`] - user entities
//! - [`DedupIndexEntry`] / [`ImportCheckpoint`] - import bookkeeping
//! - [`SearchDocument`] / [`SearchHits`] - trigram index units and query results
//!
//! Record-level timestamps are [`EpochMillis`]; message timestamps stay in the
//! source-native [`EpochSeconds`].

pub mod conversation;
pub mod entities;
pub mod import;
pub mod search;
pub mod time;

pub use conversation::{ConversationRecord, Message, Role, distinct_models};
pub use entities::{Asset, HistoryEvent, HistoryLinks, Moment, ModelLabel, PromptProfile};
pub use import::{DedupIndexEntry, ImportCheckpoint, ImportResult, ImportStats};
pub use search::{DocKind, IndexStats, SearchDocument, SearchHits};
pub use time::{EpochMillis, EpochSeconds};
