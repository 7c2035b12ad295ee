//! Persistent search index storage.
//!
//! Caches the built index on disk so a search does not rebuild it every time. Uses a
//! two-file approach inside `<data>/cache/`:
//! - `index-metadata.json`: JSON metadata (version, counts, build time)
//! - `search-index.bin`: bincode-serialized [`IndexState`](crate::indexer::IndexState)
//!
//! Staleness lives in the record store itself, as the `search_state` meta record that
//! writers flag dirty after changing indexed collections.

pub mod metadata;
pub mod persistence;
pub mod staleness;

pub use metadata::{CACHE_VERSION, IndexMetadata};
pub use persistence::{get_cache_dir, load_index, load_metadata, save_index};
pub use staleness::{SearchState, is_search_dirty, mark_search_clean, mark_search_dirty};
