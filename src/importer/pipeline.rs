use std::fs::File;
use std::io::{self, Cursor, Read, Seek, SeekFrom};
use std::mem;
use std::path::Path;
use std::thread;

use serde_json::Value;
use tracing::{debug, info, warn};

use super::checkpoint::CheckpointStore;
use super::dedup::DedupIndex;
use super::events::{CancelToken, Event, EventSink, NullSink, Phase};
use super::signature::file_signature;
use super::timeline::{TimelineStats, persist_events};
use super::{ImportError, ImportFailure};
use crate::archive::ArchiveReader;
use crate::config::ImportConfig;
use crate::index_storage::mark_search_dirty;
use crate::models::{ConversationRecord, ImportCheckpoint, ImportResult, ImportStats};
use crate::parsers::{ArrayStream, InputFormat, InputSchema, sessions_from_document, sniff_format};
use crate::store::RecordStore;

const ZIP_MAGIC: &[u8; 4] = b"PK\x03\x04";

type ValueStream = Box<dyn Iterator<Item = io::Result<Value>>>;

/// Skipped items between progress reports while replaying up to a checkpoint
const SKIP_PROGRESS_EVERY: usize = 100;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportOptions {
    /// Continue from a stored checkpoint instead of reporting it
    pub resume: bool,
    /// Ignore a stored checkpoint and run from the start
    pub skip_checkpoint_prompt: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ImportOutcome {
    Completed(ImportResult),
    /// A checkpoint exists and the caller has to choose between resume and restart
    CheckpointFound { checkpoint: ImportCheckpoint, signature: String },
    Cancelled(ImportResult),
}

/// Streams one input file into the store.
pub struct ImportPipeline<'a, S: RecordStore + ?Sized> {
    store: &'a S,
    config: &'a ImportConfig,
    events: &'a dyn EventSink,
    cancel: CancelToken,
}

impl<'a, S: RecordStore + ?Sized> ImportPipeline<'a, S> {
    pub fn new(store: &'a S, config: &'a ImportConfig) -> Self {
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

    /// Import `path`, a ZIP archive or a raw JSON export.
    ///
    /// # Arguments
    ///
    /// * `path` - Input file
    /// * `options` - Checkpoint handling
    ///
    /// # Returns
    ///
    /// [`ImportOutcome::CheckpointFound`] without touching the store when a checkpoint
    /// exists and neither option is set; otherwise the completed or cancelled counts.
    ///
    /// # Errors
    ///
    /// Returns [`ImportFailure`] for fatal errors, carrying the durably recorded counts.
    pub fn import(
        &self,
        path: &Path,
        options: ImportOptions,
    ) -> Result<ImportOutcome, ImportFailure> {
        let result = self.run(path, options);
        if let Err(failure) = &result {
            self.events.emit(Event::Error(failure.to_string()));
        }
        result
    }

    fn run(&self, path: &Path, options: ImportOptions) -> Result<ImportOutcome, ImportFailure> {
        let fail = |e: ImportError| ImportFailure::new(e, ImportStats::default());

        let size = path.metadata().map_err(|e| fail(e.into()))?.len();
        if size > self.config.max_file_bytes {
            let limit = self.config.max_file_bytes;
            return Err(fail(ImportError::InputTooLarge { size, limit }));
        }

        self.status("Computing file signature");
        let signature = file_signature(path).map_err(|e| fail(e.into()))?;
        let checkpoints = CheckpointStore::new(self.store);
        let checkpoint = checkpoints.load(&signature).map_err(|e| fail(e.into()))?;

        let checkpoint = match checkpoint {
            Some(checkpoint) if !options.resume && !options.skip_checkpoint_prompt => {
                info!("Found checkpoint at {} items for {}", checkpoint.processed_count, signature);
                self.events.emit(Event::CheckpointFound {
                    checkpoint: checkpoint.clone(),
                    signature: signature.clone(),
                });
                return Ok(ImportOutcome::CheckpointFound { checkpoint, signature });
            }
            Some(checkpoint) if options.resume => Some(checkpoint),
            _ => None,
        };

        let mut run = Run::new(self, signature, checkpoint.as_ref());
        let outcome = match run.execute(path) {
            Ok(outcome) => outcome,
            Err(error) => return Err(run.abort(error)),
        };
        Ok(outcome)
    }

    fn status(&self, message: impl Into<String>) {
        let message = message.into();
        debug!("{}", message);
        self.events.emit(Event::Status(message));
    }
}

/// Mutable state of one import run.
struct Run<'p, 'a, S: RecordStore + ?Sized> {
    pipeline: &'p ImportPipeline<'a, S>,
    signature: String,
    /// Items covered by the checkpoint being resumed
    skip_until: usize,
    stats: ImportStats,
    /// Latest counts whose writes have all landed
    durable: ImportStats,
    saved_at_start: usize,
    pending: Vec<ConversationRecord>,
    timeline: TimelineStats,
}

impl<'p, 'a, S: RecordStore + ?Sized> Run<'p, 'a, S> {
    fn new(
        pipeline: &'p ImportPipeline<'a, S>,
        signature: String,
        checkpoint: Option<&ImportCheckpoint>,
    ) -> Self {
        // Seeding saved/skipped keeps resumed totals equal to an uninterrupted run's
        let stats = ImportStats {
            processed: 0,
            saved: checkpoint.map_or(0, |c| c.saved_count),
            skipped: checkpoint.map_or(0, |c| c.skipped_count),
        };
        Self {
            pipeline,
            signature,
            skip_until: checkpoint.map_or(0, |c| c.processed_count),
            stats,
            durable: stats,
            saved_at_start: stats.saved,
            pending: Vec::new(),
            timeline: TimelineStats::new(),
        }
    }

    fn config(&self) -> &ImportConfig {
        self.pipeline.config
    }

    fn execute(&mut self, path: &Path) -> Result<ImportOutcome, ImportError> {
        let content = self.open_content(path)?;
        let (format, content) = self.sniff(content)?;

        let (schema, items, total): (InputSchema, ValueStream, Option<usize>) = match format {
            InputFormat::Stream(schema) => {
                debug!("Streaming {:?} array", schema);
                let stream = ArrayStream::new(content, self.config().max_buffered_bytes);
                (schema, Box::new(stream), None)
            }
            InputFormat::Document => {
                self.pipeline.status("Reading session document");
                let document = read_document(content)?;
                let sessions = sessions_from_document(document);
                let total = sessions.len();
                (InputSchema::GenericSession, Box::new(sessions.into_iter().map(Ok)), Some(total))
            }
        };

        if self.skip_until > 0 {
            self.pipeline.status(format!("Resuming after {} items", self.skip_until));
        } else {
            self.pipeline.status("Importing");
        }

        for item in items {
            let value: Value = item?;
            self.stats.processed += 1;
            let processed = self.stats.processed;

            if processed <= self.skip_until {
                if processed % SKIP_PROGRESS_EVERY == 0 {
                    self.progress(Phase::Skip, Some(self.skip_until));
                }
            } else if let Some(record) = schema.normalize(value) {
                self.pending.push(record);
            }

            if self.pending.len() >= self.config().batch_size {
                self.flush()?;
                self.progress(Phase::Import, total);
            }
            if processed > self.skip_until && processed % self.config().checkpoint_interval == 0 {
                self.flush()?;
                self.save_checkpoint()?;
            }
            if self.pending.is_empty() {
                self.durable = self.stats;
            }

            let at_yield = processed % self.config().yield_every.max(1) == 0;
            if at_yield {
                thread::yield_now();
            }
            let at_boundary = at_yield
                || processed % self.config().batch_size == 0
                || processed % self.config().checkpoint_interval == 0;
            if at_boundary && self.pipeline.cancel.is_cancelled() {
                return self.cancel();
            }
        }

        self.finish()
    }

    /// Open the raw file, or the export entry inside it when it is a ZIP archive.
    fn open_content(&self, path: &Path) -> Result<Box<dyn Read>, ImportError> {
        let mut file = File::open(path)?;
        let mut magic = [0u8; 4];
        let is_zip = path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("zip"))
            || (file.read_exact(&mut magic).is_ok() && &magic == ZIP_MAGIC);
        file.seek(SeekFrom::Start(0))?;

        if !is_zip {
            return Ok(Box::new(file));
        }

        self.pipeline.status("Reading archive");
        let names: Vec<&str> =
            self.config().archive_entry_names.iter().map(String::as_str).collect();
        let (entry, reader) = ArchiveReader::new(file)?.open_first(&names)?;
        info!("Reading {} ({} bytes) from archive", entry.name, entry.uncompressed_size);
        Ok(Box::new(reader))
    }

    /// Read the head sample, decide the format, and hand back a reader over all content.
    fn sniff(
        &self,
        mut content: Box<dyn Read>,
    ) -> Result<(InputFormat, Box<dyn Read>), ImportError> {
        let mut head = Vec::with_capacity(self.config().head_sample_bytes);
        (&mut content).take(self.config().head_sample_bytes as u64).read_to_end(&mut head)?;

        let format = sniff_format(&head).ok_or_else(|| {
            ImportError::MalformedRoot("content is neither a JSON array nor an object".to_string())
        })?;
        Ok((format, Box::new(Cursor::new(head).chain(content))))
    }

    /// Classify and write pending records.
    fn flush(&mut self) -> Result<(), ImportError> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let batch = mem::take(&mut self.pending);
        let index = DedupIndex::new(self.pipeline.store);
        let verdicts = index.classify(&batch)?;

        let mut accepted = Vec::with_capacity(batch.len());
        let mut skipped = 0;
        for (record, verdict) in batch.into_iter().zip(verdicts) {
            if verdict.accepted() {
                accepted.push(record);
            } else {
                skipped += 1;
            }
        }

        index.record(&accepted)?;
        for record in &accepted {
            self.timeline.observe(record);
        }
        self.stats.saved += accepted.len();
        self.stats.skipped += skipped;
        self.durable = self.stats;
        debug!("Flushed batch: {} saved, {} skipped", accepted.len(), skipped);
        Ok(())
    }

    fn save_checkpoint(&self) -> Result<(), ImportError> {
        CheckpointStore::new(self.pipeline.store).save(&self.signature, &self.durable)?;
        Ok(())
    }

    fn progress(&self, phase: Phase, total: Option<usize>) {
        self.pipeline.events.emit(Event::Progress { phase, done: self.stats.processed, total });
    }

    fn cancel(&mut self) -> Result<ImportOutcome, ImportError> {
        self.flush()?;
        self.durable = self.stats;
        self.save_checkpoint()?;
        // Facts from the items seen so far merge with those of the resumed run
        let history_events_created = self.persist_timeline()?;
        self.mark_dirty_if_saved()?;

        let result = ImportResult { history_events_created, ..ImportResult::from(self.stats) };
        info!("Import cancelled after {} items; resumable", self.stats.processed);
        self.pipeline.events.emit(Event::Cancelled(result));
        Ok(ImportOutcome::Cancelled(result))
    }

    fn finish(&mut self) -> Result<ImportOutcome, ImportError> {
        self.flush()?;
        self.durable = self.stats;
        CheckpointStore::new(self.pipeline.store).clear(&self.signature)?;
        let history_events_created = self.persist_timeline()?;
        self.mark_dirty_if_saved()?;

        let result = ImportResult { history_events_created, ..ImportResult::from(self.stats) };
        info!(
            "Import finished: {} processed, {} saved, {} skipped, {} history events",
            result.processed, result.saved, result.skipped, result.history_events_created
        );
        self.pipeline.events.emit(Event::Done(result));
        Ok(ImportOutcome::Completed(result))
    }

    fn persist_timeline(&mut self) -> Result<usize, ImportError> {
        let events = mem::take(&mut self.timeline).into_events();
        let written = persist_events(self.pipeline.store, events)?;
        if written > 0 {
            mark_search_dirty(self.pipeline.store)?;
        }
        Ok(written)
    }

    fn mark_dirty_if_saved(&self) -> Result<(), ImportError> {
        if self.stats.saved > self.saved_at_start {
            mark_search_dirty(self.pipeline.store)?;
        }
        Ok(())
    }

    /// Turn a fatal error into a failure, saving the durable snapshot first.
    fn abort(&self, error: ImportError) -> ImportFailure {
        warn!("Import failed: {}", error);
        if self.durable.processed > 0
            && let Err(e) = self.save_checkpoint()
        {
            warn!("Could not save checkpoint after failure: {}", e);
        }
        ImportFailure::new(error, self.durable)
    }
}

fn read_document(mut content: Box<dyn Read>) -> Result<Value, ImportError> {
    let mut bytes = Vec::new();
    content.read_to_end(&mut bytes)?;
    serde_json::from_slice(&bytes).map_err(|e| ImportError::MalformedRoot(e.to_string()))
}
