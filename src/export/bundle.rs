use std::io::Write;

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::{debug, info};

use super::manifest::{AlbumManifest, AssetRef, MANIFEST_VERSION};
use crate::archive::{EntryContent, ZipWriter};
use crate::importer::{CancelToken, Event, EventSink, NullSink, Phase};
use crate::models::{
    Asset, ConversationRecord, EpochMillis, HistoryEvent, Moment, ModelLabel, PromptProfile,
};
use crate::store::{RecordStore, RecordStoreExt};
use crate::utils::encode_entry_component;

const FULL_PREFIX: &str = "album";
const MANIFEST_ENTRY: &str = "album/album.json";
const ASSET_PROGRESS_EVERY: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportKind {
    /// Manifest with every entity plus asset files, as a ZIP
    Full,
    /// Manifest without conversations or assets, as JSON
    Lite,
    /// Asset files only, as a ZIP
    AssetsOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportSummary {
    pub kind: ExportKind,
    /// ZIP entries written; zero for a lite export
    pub entries: usize,
    pub conversations: usize,
    pub assets: usize,
}

/// Writes album bundles from the record store.
pub struct BundleExporter<'a, S: RecordStore + ?Sized> {
    store: &'a S,
    events: &'a dyn EventSink,
    cancel: CancelToken,
}

impl<'a, S: RecordStore + ?Sized> BundleExporter<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store, events: &NullSink, cancel: CancelToken::new() }
    }

    pub fn with_events(mut self, events: &'a dyn EventSink) -> Self {
        self.events = events;
        self
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Write a bundle of `kind` to `out`.
    ///
    /// # Returns
    ///
    /// The summary, or `None` if cancelled. A cancelled ZIP is left without its central
    /// directory and should be discarded.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read, an asset file cannot be streamed,
    /// or the archive exceeds ZIP32 limits.
    pub fn export<W: Write>(&self, kind: ExportKind, out: W) -> Result<Option<ExportSummary>> {
        let summary = match kind {
            ExportKind::Full => self.full(out)?,
            ExportKind::Lite => Some(self.lite(out)?),
            ExportKind::AssetsOnly => self.assets_only(out)?,
        };
        if let Some(summary) = &summary {
            info!(
                "Exported {:?} bundle: {} entries, {} conversations, {} assets",
                summary.kind, summary.entries, summary.conversations, summary.assets
            );
            self.events.emit(Event::Status("Export complete".to_string()));
        }
        Ok(summary)
    }

    fn full<W: Write>(&self, out: W) -> Result<Option<ExportSummary>> {
        self.status("Collecting album records");
        let conversations = self.store.get_all::<ConversationRecord>()?;
        let assets = self.store.get_all::<Asset>()?;
        let conversation_count = conversations.len();

        let mut manifest = self.manifest(true)?;
        manifest.conversations = Some(conversations);
        manifest.assets = Some(assets.iter().map(AssetRef::from).collect());

        self.status("Adding album.json");
        let json = serde_json::to_vec(&manifest).context("Failed to serialize album manifest")?;
        let mut zip = ZipWriter::new(out);
        zip.add_entry(MANIFEST_ENTRY, EntryContent::Bytes(json), EpochMillis::now().0)
            .context("Failed to add album.json")?;

        let asset_prefix = format!("{}/assets", FULL_PREFIX);
        if !self.add_assets(&mut zip, &asset_prefix, &assets)? {
            return Ok(None);
        }
        let entries = zip.entry_count();
        zip.finish().context("Failed to finish album archive")?;

        Ok(Some(ExportSummary {
            kind: ExportKind::Full,
            entries,
            conversations: conversation_count,
            assets: assets.len(),
        }))
    }

    fn lite<W: Write>(&self, mut out: W) -> Result<ExportSummary> {
        self.status("Collecting album records");
        let manifest = self.manifest(false)?;
        serde_json::to_writer(&mut out, &manifest).context("Failed to write album JSON")?;
        out.flush().context("Failed to flush album JSON")?;
        Ok(ExportSummary { kind: ExportKind::Lite, entries: 0, conversations: 0, assets: 0 })
    }

    fn assets_only<W: Write>(&self, out: W) -> Result<Option<ExportSummary>> {
        let assets = self.store.get_all::<Asset>()?;
        let mut zip = ZipWriter::new(out);
        if !self.add_assets(&mut zip, "assets", &assets)? {
            return Ok(None);
        }
        let entries = zip.entry_count();
        zip.finish().context("Failed to finish asset archive")?;
        Ok(Some(ExportSummary {
            kind: ExportKind::AssetsOnly,
            entries,
            conversations: 0,
            assets: assets.len(),
        }))
    }

    /// Manifest of the entities every bundle carries.
    fn manifest(&self, include_conversations: bool) -> Result<AlbumManifest> {
        Ok(AlbumManifest {
            version: MANIFEST_VERSION,
            exported_at: Utc::now(),
            include_conversations,
            history: self.store.get_all::<HistoryEvent>()?,
            moments: self.store.get_all::<Moment>()?,
            prompts: self.store.get_all::<PromptProfile>()?,
            labels: self.store.get_all::<ModelLabel>()?,
            conversations: None,
            assets: None,
        })
    }

    /// Stream every asset file into `zip` under `prefix`.
    ///
    /// Returns `false` if cancelled.
    fn add_assets<W: Write>(
        &self,
        zip: &mut ZipWriter<W>,
        prefix: &str,
        assets: &[Asset],
    ) -> Result<bool> {
        self.status("Adding assets");
        for (i, asset) in assets.iter().enumerate() {
            if self.cancel.is_cancelled() {
                info!("Export cancelled after {} of {} assets", i, assets.len());
                return Ok(false);
            }
            let name = asset_entry_name(prefix, asset);
            debug!("Adding {} from {}", name, asset.path.display());
            zip.add_entry(&name, EntryContent::File(asset.path.clone()), asset.updated_at.0)
                .with_context(|| format!("Failed to add asset {}", asset.id))?;
            if i % ASSET_PROGRESS_EVERY == 0 {
                self.events.emit(Event::Progress {
                    phase: Phase::Assets,
                    done: i,
                    total: Some(assets.len()),
                });
            }
        }
        Ok(true)
    }

    fn status(&self, message: &str) {
        debug!("{}", message);
        self.events.emit(Event::Status(message.to_string()));
    }
}

/// `<prefix>/<percent-encoded id>.<ext>`
pub fn asset_entry_name(prefix: &str, asset: &Asset) -> String {
    format!("{}/{}.{}", prefix, encode_entry_component(&asset.id), asset.extension())
}
