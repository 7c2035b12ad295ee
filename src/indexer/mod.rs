//! Trigram search index.
//!
//! Every conversation (in chunks), moment, prompt and history event becomes a
//! [`SearchDocument`](crate::models::SearchDocument). Each document's normalized text is
//! split into distinct 3-character grams, and each gram maps to the sorted ordinals of
//! the documents containing it.
//!
//! - [`IndexBuilder`] reads the store and produces an [`IndexState`]
//! - [`IndexState::query`] intersects postings, or scans previews for short queries
//!
//! The index is never updated in place. Any store write makes it stale, and callers
//! rebuild it (see [`crate::index_storage`] for the staleness flag and disk cache).

pub mod builder;
pub mod documents;
pub mod normalize;
pub mod state;

pub use builder::IndexBuilder;
pub use documents::{SourceDocument, chunk_text};
pub use normalize::normalize;
pub use state::IndexState;
