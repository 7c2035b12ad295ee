//! Tunables for import and search, loaded from an optional `config.toml` in the data
//! directory. Every field has a default, so a missing file or a partial file is fine.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const CONFIG_FILE_NAME: &str = "config.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub import: ImportConfig,
    #[serde(default)]
    pub search: SearchConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportConfig {
    /// Records per dedup lookup and storage write
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Processed items between checkpoint saves
    #[serde(default = "default_checkpoint_interval")]
    pub checkpoint_interval: usize,

    /// Processed items between cooperative yields
    #[serde(default = "default_import_yield_every")]
    pub yield_every: usize,

    /// Ceiling on bytes retained for a single streamed object
    #[serde(default = "default_max_buffered_bytes")]
    pub max_buffered_bytes: usize,

    /// Bytes inspected to detect the input format
    #[serde(default = "default_head_sample_bytes")]
    pub head_sample_bytes: usize,

    /// Entry names looked up inside ZIP archives, in priority order
    #[serde(default = "default_archive_entry_names")]
    pub archive_entry_names: Vec<String>,

    /// Inputs larger than this are rejected
    #[serde(default = "default_max_file_bytes")]
    pub max_file_bytes: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Maximum characters per conversation chunk
    #[serde(default = "default_chunk_chars")]
    pub chunk_chars: usize,

    #[serde(default = "default_max_results_per_kind")]
    pub max_results_per_kind: usize,

    /// Documents between cooperative yields while building
    #[serde(default = "default_search_yield_every")]
    pub yield_every: usize,
}

fn default_batch_size() -> usize {
    25
}

fn default_checkpoint_interval() -> usize {
    25
}

fn default_import_yield_every() -> usize {
    50
}

fn default_max_buffered_bytes() -> usize {
    100 * 1024 * 1024
}

fn default_head_sample_bytes() -> usize {
    64 * 1024
}

fn default_archive_entry_names() -> Vec<String> {
    vec!["conversations.json".to_string(), "conversations.json.txt".to_string()]
}

fn default_max_file_bytes() -> u64 {
    4 * 1024 * 1024 * 1024
}

fn default_chunk_chars() -> usize {
    6000
}

fn default_max_results_per_kind() -> usize {
    50
}

fn default_search_yield_every() -> usize {
    10
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            checkpoint_interval: default_checkpoint_interval(),
            yield_every: default_import_yield_every(),
            max_buffered_bytes: default_max_buffered_bytes(),
            head_sample_bytes: default_head_sample_bytes(),
            archive_entry_names: default_archive_entry_names(),
            max_file_bytes: default_max_file_bytes(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            chunk_chars: default_chunk_chars(),
            max_results_per_kind: default_max_results_per_kind(),
            yield_every: default_search_yield_every(),
        }
    }
}

impl Config {
    /// Load `config.toml` from `data_dir`, falling back to defaults if it is absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read, parsed, or validated.
    pub fn load_from(data_dir: &Path) -> Result<Self> {
        let path = data_dir.join(CONFIG_FILE_NAME);
        if !path.exists() {
            debug!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        debug!("Loading config from {}", path.display());
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.import.batch_size == 0 {
            bail!("import.batch_size must be at least 1");
        }
        if self.import.checkpoint_interval == 0 {
            bail!("import.checkpoint_interval must be at least 1");
        }
        if self.import.archive_entry_names.is_empty() {
            bail!("import.archive_entry_names must name at least one entry");
        }
        if self.import.head_sample_bytes == 0 {
            bail!("import.head_sample_bytes must be at least 1");
        }
        // A chunk must be able to hold at least one gram
        if self.search.chunk_chars < 3 {
            bail!("search.chunk_chars must be at least 3");
        }
        if self.search.max_results_per_kind == 0 {
            bail!("search.max_results_per_kind must be at least 1");
        }
        Ok(())
    }
}
