use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;
use std::time::UNIX_EPOCH;

use sha2::{Digest, Sha256};

/// Bytes hashed from each end of the file
const SAMPLE_BYTES: u64 = 8 * 1024;

/// Content-derived identity of an input file: `name:size:mtime_ms:hash`.
///
/// The hash is the first 8 bytes (hex) of SHA-256 over the first 8 KiB followed by the
/// last 8 KiB, so signing a multi-gigabyte export costs two small reads. For files under
/// 8 KiB both samples are the whole file.
///
/// # Errors
///
/// Returns an error if the file cannot be opened, stat'ed, or read.
pub fn file_signature(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    let metadata = file.metadata()?;
    let size = metadata.len();
    let mtime_ms = metadata
        .modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map_or(0, |d| d.as_millis());
    let name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();

    let sample = SAMPLE_BYTES.min(size);
    let mut head = vec![0u8; sample as usize];
    file.read_exact(&mut head)?;
    let mut tail = vec![0u8; sample as usize];
    file.seek(SeekFrom::Start(size - sample))?;
    file.read_exact(&mut tail)?;

    let mut hasher = Sha256::new();
    hasher.update(&head);
    hasher.update(&tail);
    let digest = hasher.finalize();

    Ok(format!("{}:{}:{}:{}", name, size, mtime_ms, hex::encode(&digest[..8])))
}
