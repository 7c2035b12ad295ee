use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};

/// Environment variable overriding the data directory
pub const DATA_DIR_ENV: &str = "MEMORY_ALBUM_DIR";

const APP_DIR_NAME: &str = "memory-album";

/// Resolve the album data directory
///
/// Precedence: explicit flag, then `MEMORY_ALBUM_DIR`, then the platform data
/// directory (`~/.local/share/memory-album` on Linux).
///
/// # Errors
///
/// Returns an error if neither override is set and the platform has no data directory.
pub fn get_data_dir(flag: Option<PathBuf>) -> Result<PathBuf> {
    let from_env = env::var_os(DATA_DIR_ENV).map(PathBuf::from);
    resolve_data_dir(flag, from_env, dirs::data_dir())
}

fn resolve_data_dir(
    flag: Option<PathBuf>,
    from_env: Option<PathBuf>,
    platform: Option<PathBuf>,
) -> Result<PathBuf> {
    if let Some(dir) = flag.or(from_env).filter(|d| !d.as_os_str().is_empty()) {
        return Ok(dir);
    }
    let base = platform.context("No platform data directory; set MEMORY_ALBUM_DIR")?;
    Ok(base.join(APP_DIR_NAME))
}
