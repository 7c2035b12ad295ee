//! File-backed record store.
//!
//! Each collection is an append-only JSON-lines log (`<collection>.jsonl`). Every write
//! call becomes exactly one line, synced before the in-memory view is updated:
//!
//! ```text
//! {"put":[["openai:abc",{...}],["openai:def",{...}]]}
//! {"delete":"openai:abc"}
//! ```
//!
//! A crash mid-write leaves at most one torn trailing line, which is dropped (and the
//! file truncated) on the next open, so a batch either fully lands or not at all. A torn
//! line followed by valid lines means the log was damaged some other way and is
//! reported as [`StoreError::Corrupt`].
//!
//! Logs whose superseded entries outnumber live records are compacted on open: the
//! live set is rewritten to a temp file which then atomically replaces the log.

use std::collections::{BTreeMap, HashMap};
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use super::{Collection, RecordStore, StoreError};

/// Compaction only kicks in once a log has at least this many dead entries
const MIN_DEAD_ENTRIES_FOR_COMPACTION: usize = 256;

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum LogOp {
    Put(Vec<(String, Value)>),
    Delete(String),
}

#[derive(Debug)]
struct CollectionLog {
    records: BTreeMap<String, Value>,
    file: File,
    len: u64,
}

impl CollectionLog {
    fn append(&mut self, collection: Collection, op: &LogOp) -> Result<(), StoreError> {
        let mut line = serde_json::to_vec(op)?;
        line.push(b'\n');

        let result = self.file.write_all(&line).and_then(|_| self.file.sync_data());
        if let Err(e) = result {
            // Drop whatever part of the line made it to disk so later appends stay parseable
            if let Err(trunc) = self.file.set_len(self.len) {
                warn!("Failed to roll back partial write to {}: {}", collection, trunc);
            }
            return Err(e.into());
        }

        self.len += line.len() as u64;
        Ok(())
    }
}

/// Append-only, per-collection log store rooted at a directory.
#[derive(Debug)]
pub struct FileStore {
    root: PathBuf,
    logs: Mutex<HashMap<Collection, CollectionLog>>,
}

impl FileStore {
    /// Open (creating if needed) a store in `root`, replaying every collection log.
    pub fn open(root: &Path) -> Result<Self, StoreError> {
        fs::create_dir_all(root)?;

        let mut logs = HashMap::new();
        for collection in Collection::ALL {
            let path = log_path(root, collection);
            let log = open_log(&path, collection)?;
            logs.insert(collection, log);
        }

        Ok(Self { root: root.to_path_buf(), logs: Mutex::new(logs) })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn with_log<T>(
        &self,
        collection: Collection,
        f: impl FnOnce(&mut CollectionLog) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut guard = self.logs.lock().map_err(|_| StoreError::Poisoned)?;
        let log = guard.get_mut(&collection).ok_or_else(|| StoreError::Corrupt {
            collection,
            message: "collection log not opened".to_string(),
        })?;
        f(log)
    }
}

impl RecordStore for FileStore {
    fn get_value(&self, collection: Collection, id: &str) -> Result<Option<Value>, StoreError> {
        self.with_log(collection, |log| Ok(log.records.get(id).cloned()))
    }

    fn get_all_values(&self, collection: Collection) -> Result<Vec<Value>, StoreError> {
        self.with_log(collection, |log| Ok(log.records.values().cloned().collect()))
    }

    fn put_values(
        &self,
        collection: Collection,
        records: Vec<(String, Value)>,
    ) -> Result<(), StoreError> {
        if records.is_empty() {
            return Ok(());
        }
        self.with_log(collection, |log| {
            let op = LogOp::Put(records);
            log.append(collection, &op)?;
            if let LogOp::Put(records) = op {
                log.records.extend(records);
            }
            Ok(())
        })
    }

    fn delete(&self, collection: Collection, id: &str) -> Result<(), StoreError> {
        self.with_log(collection, |log| {
            if !log.records.contains_key(id) {
                return Ok(());
            }
            log.append(collection, &LogOp::Delete(id.to_string()))?;
            log.records.remove(id);
            Ok(())
        })
    }

    fn count(&self, collection: Collection) -> Result<usize, StoreError> {
        self.with_log(collection, |log| Ok(log.records.len()))
    }
}

fn log_path(root: &Path, collection: Collection) -> PathBuf {
    root.join(format!("{}.jsonl", collection.name()))
}

fn open_log(path: &Path, collection: Collection) -> Result<CollectionLog, StoreError> {
    let mut records = BTreeMap::new();
    let mut dead_entries = 0usize;
    let mut good_len = 0u64;
    let mut torn_at: Option<u64> = None;

    if path.exists() {
        let mut reader = BufReader::new(File::open(path)?);
        let mut line = Vec::new();
        let mut offset = 0u64;

        loop {
            line.clear();
            // Raw bytes: a torn write may stop inside a multi-byte character
            let read = reader.read_until(b'\n', &mut line)?;
            if read == 0 {
                break;
            }
            let line_start = offset;
            offset += read as u64;

            if line.trim_ascii().is_empty() {
                if torn_at.is_none() {
                    good_len = offset;
                }
                continue;
            }

            // A line without its newline never finished writing
            let complete = line.ends_with(b"\n");
            match serde_json::from_slice::<LogOp>(line.trim_ascii_end()) {
                Ok(op) if complete => {
                    if let Some(at) = torn_at {
                        let message =
                            format!("unreadable entry at byte {} in {}", at, path.display());
                        return Err(StoreError::Corrupt { collection, message });
                    }
                    dead_entries += apply(&mut records, op);
                    good_len = offset;
                }
                _ => {
                    if torn_at.is_none() {
                        torn_at = Some(line_start);
                    }
                }
            }
        }
    }

    if let Some(at) = torn_at {
        warn!("Discarding torn trailing write in {} at byte {}", path.display(), at);
    }

    let compact = dead_entries >= MIN_DEAD_ENTRIES_FOR_COMPACTION && dead_entries > records.len();
    if compact {
        debug!(
            "Compacting {} ({} live, {} dead entries)",
            path.display(),
            records.len(),
            dead_entries
        );
        good_len = rewrite_log(path, &records)?;
    }

    let file = OpenOptions::new().create(true).append(true).open(path)?;
    if file.metadata()?.len() != good_len {
        file.set_len(good_len)?;
    }

    Ok(CollectionLog { records, file, len: good_len })
}

/// Apply one log entry, returning how many previously written entries it made dead.
fn apply(records: &mut BTreeMap<String, Value>, op: LogOp) -> usize {
    match op {
        LogOp::Put(batch) => {
            let mut dead = 0;
            for (id, value) in batch {
                if records.insert(id, value).is_some() {
                    dead += 1;
                }
            }
            dead
        }
        // The delete entry itself is dead weight too
        LogOp::Delete(id) => usize::from(records.remove(&id).is_some()) + 1,
    }
}

fn rewrite_log(path: &Path, records: &BTreeMap<String, Value>) -> Result<u64, StoreError> {
    let temp = path.with_extension("jsonl.tmp");
    {
        let mut writer = BufWriter::new(File::create(&temp)?);
        for (id, value) in records {
            let op = LogOp::Put(vec![(id.clone(), value.clone())]);
            serde_json::to_writer(&mut writer, &op)?;
            writer.write_all(b"\n")?;
        }
        writer.flush()?;
        writer.get_ref().sync_all()?;
    }
    fs::rename(&temp, path)?;
    Ok(fs::metadata(path)?.len())
}
