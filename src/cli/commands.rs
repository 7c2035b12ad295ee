use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::config::Config;
use crate::export::{BundleExporter, ExportKind};
use crate::importer::{
    CheckpointStore, Event, ImportOptions, ImportOutcome, ImportPipeline, file_signature,
};
use crate::index_storage::{
    is_search_dirty, load_index, load_metadata, mark_search_clean, save_index,
};
use crate::indexer::{IndexBuilder, IndexState};
use crate::models::{DocKind, Moment, SearchHits};
use crate::moments::{MomentSelection, create_moment};
use crate::store::{Collection, FileStore, RecordStore, RecordStoreExt};
use crate::utils::{DATA_DIR_ENV, format_path_with_tilde, get_data_dir, sanitize_line};

const PREVIEW_CHARS: usize = 80;
const INPUT_EXTENSIONS: [&str; 2] = ["json", "zip"];

#[derive(Parser)]
#[command(name = "memory-album")]
#[command(version = "0.1.0")]
#[command(about = "Import, search and export LLM conversation history", long_about = None)]
pub struct Cli {
    /// Album data directory
    #[arg(long, global = true, env = DATA_DIR_ENV)]
    pub data_dir: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Import an export file, or every .json/.zip file in a directory
    Import {
        path: PathBuf,

        /// Continue from a saved checkpoint
        #[arg(long, conflicts_with = "restart")]
        resume: bool,

        /// Delete a saved checkpoint and start over
        #[arg(long)]
        restart: bool,

        /// Do not stop at a saved checkpoint; run from the start without deleting it
        #[arg(short, long)]
        yes: bool,
    },

    /// Rebuild the search index
    Index,

    /// Search conversations, moments, prompts and history
    Search {
        query: String,

        /// Print hits as JSON
        #[arg(long)]
        json: bool,
    },

    /// Write an album bundle
    Export {
        out: PathBuf,

        /// Entities without conversations or assets, as JSON
        #[arg(long, conflicts_with = "assets_only")]
        lite: bool,

        /// Asset files only, as a ZIP
        #[arg(long)]
        assets_only: bool,
    },

    /// Show record counts, pending checkpoints and index freshness
    Stats,

    /// List or clear pending import checkpoints
    Checkpoints {
        /// Delete every pending checkpoint
        #[arg(long)]
        clear: bool,
    },

    /// Create or list moments
    Moment {
        #[command(subcommand)]
        action: MomentCommand,
    },
}

#[derive(Subcommand)]
pub enum MomentCommand {
    /// Keep messages FROM..=TO of a conversation as a moment
    Add {
        /// Conversation id, e.g. openai:abc123
        conv_id: String,

        /// Index of the first message (0-based)
        from: usize,

        /// Index of the last message, inclusive
        to: usize,

        #[arg(short, long, default_value = "")]
        title: String,

        /// Tag to attach; repeatable
        #[arg(long = "tag")]
        tags: Vec<String>,
    },

    /// List stored moments
    List,
}

/// Album opened for one command.
struct Album {
    data_dir: PathBuf,
    config: Config,
    store: FileStore,
}

impl Album {
    fn open(flag: Option<PathBuf>) -> Result<Self> {
        let data_dir = get_data_dir(flag)?;
        let store = FileStore::open(&data_dir)
            .with_context(|| format!("Failed to open album at {}", data_dir.display()))?;
        let config = Config::load_from(&data_dir)?;
        debug!("Opened album at {}", data_dir.display());
        Ok(Self { data_dir, config, store })
    }
}

pub fn run(cli: Cli) -> Result<()> {
    let Some(command) = cli.command else {
        println!("Use --help for usage information");
        return Ok(());
    };
    let album = Album::open(cli.data_dir)?;

    match command {
        Commands::Import { path, resume, restart, yes } => {
            let options = ImportOptions { resume, skip_checkpoint_prompt: yes };
            import(&album, &path, options, restart)
        }
        Commands::Index => index(&album),
        Commands::Search { query, json } => search(&album, &query, json),
        Commands::Export { out, lite, assets_only } => {
            let kind = match (lite, assets_only) {
                (true, _) => ExportKind::Lite,
                (_, true) => ExportKind::AssetsOnly,
                _ => ExportKind::Full,
            };
            export(&album, &out, kind)
        }
        Commands::Stats => show_stats(&album),
        Commands::Checkpoints { clear } => checkpoints(&album, clear),
        Commands::Moment { action: MomentCommand::Add { conv_id, from, to, title, tags } } => {
            let selection = MomentSelection { conv_id, from_idx: from, to_idx: to, title, tags };
            add_moment(&album, &selection)
        }
        Commands::Moment { action: MomentCommand::List } => list_moments(&album),
    }
}

/// Input files under `path`: the file itself, or matching files in a directory sorted
/// by path.
fn collect_inputs(path: &Path) -> Result<Vec<PathBuf>> {
    if !path.is_dir() {
        return Ok(vec![path.to_path_buf()]);
    }

    let mut inputs = Vec::new();
    for entry in WalkDir::new(path).follow_links(false) {
        let entry = entry.with_context(|| format!("Failed to walk {}", path.display()))?;
        let matches = entry.path().extension().and_then(|e| e.to_str()).is_some_and(|e| {
            INPUT_EXTENSIONS.iter().any(|known| e.eq_ignore_ascii_case(known))
        });
        if entry.file_type().is_file() && matches {
            inputs.push(entry.into_path());
        }
    }
    inputs.sort();
    if inputs.is_empty() {
        bail!("No .json or .zip files found in {}", path.display());
    }
    Ok(inputs)
}

fn import(album: &Album, path: &Path, options: ImportOptions, restart: bool) -> Result<()> {
    let sink = |event: Event| {
        if let Event::Progress { phase, done, total } = event {
            match total {
                Some(total) => debug!("{}: {}/{}", phase, done, total),
                None => debug!("{}: {}", phase, done),
            }
        }
    };
    let pipeline = ImportPipeline::new(&album.store, &album.config.import).with_events(&sink);

    for input in collect_inputs(path)? {
        let shown = format_path_with_tilde(&input);
        if restart {
            let signature = file_signature(&input)
                .with_context(|| format!("Failed to read {}", input.display()))?;
            CheckpointStore::new(&album.store).clear(&signature)?;
        }

        info!("Importing {}", shown);
        let outcome = pipeline
            .import(&input, options)
            .with_context(|| format!("Import of {} failed", shown))?;

        match outcome {
            ImportOutcome::Completed(result) => println!(
                "{}: saved {}, skipped {}, processed {}, history events {}",
                shown,
                result.saved,
                result.skipped,
                result.processed,
                result.history_events_created
            ),
            ImportOutcome::CheckpointFound { checkpoint, .. } => println!(
                "{}: checkpoint at {} items (saved {}, skipped {}); \
                 re-run with --resume to continue or --restart to start over",
                shown, checkpoint.processed_count, checkpoint.saved_count, checkpoint.skipped_count
            ),
            ImportOutcome::Cancelled(result) => println!(
                "{}: cancelled after {} items (saved {}, skipped {})",
                shown, result.processed, result.saved, result.skipped
            ),
        }
    }
    Ok(())
}

fn rebuild_index(album: &Album) -> Result<IndexState> {
    let state = IndexBuilder::new(&album.store, &album.config.search)
        .build()?
        .context("Index build was cancelled")?;
    save_index(&album.data_dir, &state)?;
    mark_search_clean(&album.store)?;
    Ok(state)
}

fn index(album: &Album) -> Result<()> {
    let state = rebuild_index(album)?;
    let stats = state.stats();
    println!("Indexed {} documents ({} grams)", stats.doc_count, stats.gram_count);
    Ok(())
}

/// Cached index unless the store changed since it was built or no cache exists.
fn current_index(album: &Album) -> Result<IndexState> {
    if is_search_dirty(&album.store)? {
        info!("Album changed since the last index build, rebuilding");
        return rebuild_index(album);
    }
    match load_index(&album.data_dir)? {
        Some((state, _)) => Ok(state),
        None => rebuild_index(album),
    }
}

fn search(album: &Album, query: &str, json: bool) -> Result<()> {
    let state = current_index(album)?;
    let hits = state.query(query, album.config.search.max_results_per_kind);

    if json {
        println!("{}", serde_json::to_string_pretty(&hits)?);
        return Ok(());
    }
    print_hits(&state, &hits);
    Ok(())
}

fn print_hits(state: &IndexState, hits: &SearchHits) {
    if hits.is_empty() {
        println!("No matches");
        return;
    }

    let mut previews: HashMap<(DocKind, &str), &str> = HashMap::new();
    for doc in state.documents() {
        previews.entry((doc.kind, doc.ref_id.as_str())).or_insert(doc.preview_text.as_str());
    }

    let sections = [
        (DocKind::Conversation, "Conversations"),
        (DocKind::Moment, "Moments"),
        (DocKind::Prompt, "Prompts"),
        (DocKind::History, "History"),
    ];
    for (kind, heading) in sections {
        let ids = hits.ids(kind);
        if ids.is_empty() {
            continue;
        }
        println!("{} ({})", heading, ids.len());
        for id in ids {
            let preview = previews.get(&(kind, id.as_str())).copied().unwrap_or("");
            println!(
                "  {}  {}",
                sanitize_line(id, PREVIEW_CHARS),
                sanitize_line(preview, PREVIEW_CHARS)
            );
        }
    }
}

fn export(album: &Album, out: &Path, kind: ExportKind) -> Result<()> {
    let partial = out.with_file_name(format!(
        "{}.partial",
        out.file_name().and_then(|n| n.to_str()).unwrap_or("album")
    ));
    let file = File::create(&partial)
        .with_context(|| format!("Failed to create {}", partial.display()))?;
    let mut writer = BufWriter::new(file);

    let summary = BundleExporter::new(&album.store).export(kind, &mut writer)?;
    writer.flush().context("Failed to flush export")?;
    drop(writer);

    let Some(summary) = summary else {
        fs::remove_file(&partial).ok();
        bail!("Export was cancelled");
    };
    fs::rename(&partial, out).with_context(|| format!("Failed to write {}", out.display()))?;

    println!(
        "Wrote {} ({} conversations, {} assets)",
        format_path_with_tilde(out),
        summary.conversations,
        summary.assets
    );
    Ok(())
}

fn show_stats(album: &Album) -> Result<()> {
    println!("Memory Album Statistics");
    println!("=======================");
    for (collection, label) in [
        (Collection::Conversations, "Conversations"),
        (Collection::Moments, "Moments"),
        (Collection::Prompts, "Prompts"),
        (Collection::HistoryEvents, "History events"),
        (Collection::Assets, "Assets"),
        (Collection::ModelLabels, "Model labels"),
    ] {
        println!("{}: {}", label, album.store.count(collection)?);
    }

    let pending = CheckpointStore::new(&album.store).list()?;
    println!("Pending checkpoints: {}", pending.len());

    let index_state = match load_metadata(&album.data_dir)? {
        None => "not built".to_string(),
        Some(_) if is_search_dirty(&album.store)? => "stale".to_string(),
        Some(metadata) => format!(
            "fresh ({} documents, built {})",
            metadata.doc_count,
            metadata.built_at.format("%Y-%m-%d %H:%M:%S")
        ),
    };
    println!("Search index: {}", index_state);
    println!();
    println!("Data directory: {}", format_path_with_tilde(&album.data_dir));
    Ok(())
}

fn checkpoints(album: &Album, clear: bool) -> Result<()> {
    let store = CheckpointStore::new(&album.store);
    let pending = store.list()?;
    if pending.is_empty() {
        println!("No pending checkpoints");
        return Ok(());
    }

    for checkpoint in &pending {
        println!(
            "{}  processed {}, saved {}, skipped {}, updated {}",
            sanitize_line(&checkpoint.id, PREVIEW_CHARS),
            checkpoint.processed_count,
            checkpoint.saved_count,
            checkpoint.skipped_count,
            checkpoint.updated_at
        );
    }
    if clear {
        for checkpoint in &pending {
            store.clear(&checkpoint.id)?;
        }
        println!("Cleared {} checkpoints", pending.len());
    }
    Ok(())
}

fn add_moment(album: &Album, selection: &MomentSelection) -> Result<()> {
    let shown = sanitize_line(&selection.conv_id, PREVIEW_CHARS);
    let moment = create_moment(&album.store, selection)
        .with_context(|| format!("Could not create a moment from {}", shown))?;
    println!(
        "Created moment {} \"{}\" (messages {}..={}, models: {})",
        moment.id,
        sanitize_line(&moment.title, PREVIEW_CHARS),
        moment.from_idx,
        moment.to_idx,
        if moment.models.is_empty() { "none".to_string() } else { moment.models.join(", ") }
    );
    Ok(())
}

fn list_moments(album: &Album) -> Result<()> {
    let moments: Vec<Moment> = album.store.get_all()?;
    if moments.is_empty() {
        println!("No moments");
        return Ok(());
    }
    for moment in &moments {
        println!(
            "{}  {}  {} {}..={}",
            moment.id,
            sanitize_line(&moment.title, PREVIEW_CHARS),
            sanitize_line(&moment.conv_id, PREVIEW_CHARS),
            moment.from_idx,
            moment.to_idx
        );
    }
    Ok(())
}
