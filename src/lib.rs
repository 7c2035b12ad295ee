//! Memory Album - import, search and export LLM conversation history
//!
//! This library ingests conversation exports (ZIP archives or raw JSON, in either the
//! graph-structured or the generic session schema) into a local record store, and
//! serves them back through a trigram search index and portable album bundles:
//!
//! - Streaming ZIP reading and writing without buffering whole entries
//! - Incremental parsing of huge top-level JSON arrays
//! - Resumable, deduplicating imports with periodic checkpoints
//! - A 3-gram inverted index over conversations, moments, prompts and history
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//!
//! use memory_album::config::Config;
//! use memory_album::importer::{ImportOptions, ImportPipeline};
//! use memory_album::indexer::IndexBuilder;
//! use memory_album::store::FileStore;
//!
//! let store = FileStore::open(Path::new("/tmp/album"))?;
//! let config = Config::default();
//! ImportPipeline::new(&store, &config.import)
//!     .import(Path::new("export.zip"), ImportOptions::default())?;
//!
//! if let Some(index) = IndexBuilder::new(&store, &config.search).build()? {
//!     let hits = index.query("sunset", 50);
//!     println!("{} conversations", hits.conversations.len());
//! }
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod archive;
pub mod cli;
pub mod config;
pub mod export;
pub mod importer;
pub mod index_storage;
pub mod indexer;
pub mod models;
pub mod moments;
pub mod parsers;
pub mod store;
pub mod utils;

// Re-export commonly used types
pub use config::Config;
pub use importer::{ImportOptions, ImportOutcome, ImportPipeline};
pub use indexer::{IndexBuilder, IndexState};
pub use models::{ConversationRecord, SearchHits};
pub use store::{FileStore, MemoryStore, RecordStore};
