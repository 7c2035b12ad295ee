//! Cache persistence: load/save with atomic writes

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use bincode::config;
use tracing::{debug, warn};

use super::metadata::{CACHE_VERSION, IndexMetadata};
use crate::indexer::IndexState;

const CACHE_DIRNAME: &str = "cache";
const METADATA_FILENAME: &str = "index-metadata.json";
const INDEX_FILENAME: &str = "search-index.bin";

/// Cache directory inside the data directory, created if missing
pub fn get_cache_dir(data_dir: &Path) -> Result<PathBuf> {
    let cache_dir = data_dir.join(CACHE_DIRNAME);
    if !cache_dir.exists() {
        fs::create_dir_all(&cache_dir).context("Failed to create cache directory")?;
    }
    Ok(cache_dir)
}

/// Load the cached index and its metadata.
///
/// Returns `None` if the cache is missing, corrupted, or from another version; the
/// caller should rebuild.
///
/// # Errors
///
/// Returns an error only if the cache directory cannot be created or read.
pub fn load_index(data_dir: &Path) -> Result<Option<(IndexState, IndexMetadata)>> {
    let cache_dir = get_cache_dir(data_dir)?;
    let metadata_path = cache_dir.join(METADATA_FILENAME);
    let index_path = cache_dir.join(INDEX_FILENAME);

    if !metadata_path.exists() || !index_path.exists() {
        debug!("No cached index in {}", cache_dir.display());
        return Ok(None);
    }

    let metadata_json =
        fs::read_to_string(&metadata_path).context("Failed to read metadata file")?;
    let metadata: IndexMetadata = match serde_json::from_str(&metadata_json) {
        Ok(metadata) => metadata,
        Err(e) => {
            warn!("Cached index metadata is corrupt ({}), rebuilding index", e);
            return Ok(None);
        }
    };

    if metadata.version != CACHE_VERSION {
        warn!(
            "Cache version mismatch (expected {}, found {}), rebuilding index",
            CACHE_VERSION, metadata.version
        );
        return Ok(None);
    }

    let index_bytes = fs::read(&index_path).context("Failed to read index file")?;
    match bincode::serde::decode_from_slice::<IndexState, _>(&index_bytes, config::standard()) {
        Ok((state, _)) if state.stats().doc_count == metadata.doc_count => {
            Ok(Some((state, metadata)))
        }
        Ok(_) => {
            warn!("Cached index does not match its metadata, rebuilding index");
            Ok(None)
        }
        Err(e) => {
            warn!("Cached index is corrupt ({}), rebuilding index", e);
            Ok(None)
        }
    }
}

/// Read only the metadata of a cached index, if present and parseable.
pub fn load_metadata(data_dir: &Path) -> Result<Option<IndexMetadata>> {
    let path = data_dir.join(CACHE_DIRNAME).join(METADATA_FILENAME);
    if !path.exists() {
        return Ok(None);
    }
    let metadata_json = fs::read_to_string(&path).context("Failed to read metadata file")?;
    Ok(serde_json::from_str(&metadata_json).ok())
}

/// Save index and metadata atomically (temp file + rename for each).
///
/// The index is written before the metadata, so a crash in between leaves metadata
/// that no longer matches and the next load rebuilds.
pub fn save_index(data_dir: &Path, state: &IndexState) -> Result<IndexMetadata> {
    let cache_dir = get_cache_dir(data_dir)?;
    let metadata = IndexMetadata::new(state.stats());

    let index_bytes = bincode::serde::encode_to_vec(state, config::standard())
        .context("Failed to serialize index")?;
    write_atomic(&cache_dir, INDEX_FILENAME, &index_bytes)?;

    let metadata_json =
        serde_json::to_string_pretty(&metadata).context("Failed to serialize metadata")?;
    write_atomic(&cache_dir, METADATA_FILENAME, metadata_json.as_bytes())?;

    Ok(metadata)
}

fn write_atomic(dir: &Path, name: &str, bytes: &[u8]) -> Result<()> {
    let path = dir.join(name);
    let temp = dir.join(format!("{}.tmp", name));
    fs::write(&temp, bytes).with_context(|| format!("Failed to write {} temp file", name))?;
    fs::rename(&temp, &path).with_context(|| format!("Failed to rename {} temp file", name))?;
    Ok(())
}
