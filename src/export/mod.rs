//! Album bundles built on the ZIP writer.
//!
//! - **Full**: `album/album.json` with every entity plus `album/assets/<id>.<ext>`
//! - **Lite**: the manifest without conversations or assets, as plain JSON
//! - **Assets only**: a ZIP of `assets/<id>.<ext>`
//!
//! # Error Handling Strategy
//!
//! Export is all-or-nothing from the caller's point of view: a storage read failure,
//! an unreadable asset file or a ZIP32 limit aborts with an `anyhow` error carrying the
//! entry that failed. Cancellation is polled between assets and returns `Ok(None)`.

pub mod bundle;
pub mod manifest;

pub use bundle::{BundleExporter, ExportKind, ExportSummary};
pub use manifest::{AlbumManifest, AssetRef, MANIFEST_VERSION};
