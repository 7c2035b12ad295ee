/// Bundle export tests reading archives back through the ZIP reader
mod common;

use std::fs;
use std::io::{Cursor, Read};

use common::{AlbumDir, realistic_inputs};
use memory_album::archive::ArchiveReader;
use memory_album::config::Config;
use memory_album::export::{AlbumManifest, BundleExporter, ExportKind};
use memory_album::importer::{ImportOptions, ImportPipeline};
use memory_album::models::{Asset, EpochMillis};
use memory_album::store::RecordStoreExt;

fn read_entry(zip: &[u8], name: &str) -> Vec<u8> {
    let reader = ArchiveReader::new(Cursor::new(zip.to_vec())).unwrap();
    let (_, mut stream) = reader.open_first(&[name]).unwrap();
    let mut out = Vec::new();
    stream.read_to_end(&mut out).unwrap();
    out
}

#[test]
fn test_full_export_round_trip() {
    let album = AlbumDir::new();
    let store = album.open_store();
    for input in realistic_inputs(&album) {
        ImportPipeline::new(&store, &Config::default().import)
            .import(&input, ImportOptions::default())
            .unwrap();
    }
    let blob = album.write_input("photo.jpg", vec![7u8; 300_000]);
    store
        .put(&Asset {
            id: "photo:1".to_string(),
            mime_type: "image/jpeg".to_string(),
            updated_at: EpochMillis(1_700_000_000_000),
            path: blob,
        })
        .unwrap();

    let mut zip = Vec::new();
    let summary =
        BundleExporter::new(&store).export(ExportKind::Full, &mut zip).unwrap().unwrap();
    assert_eq!(summary.conversations, 3);
    assert_eq!(summary.assets, 1);

    let mut reader = ArchiveReader::new(Cursor::new(zip.clone())).unwrap();
    let names: Vec<String> = reader.entries().unwrap().into_iter().map(|e| e.name).collect();
    assert_eq!(names, vec!["album/album.json", "album/assets/photo%3A1.jpeg"]);

    let manifest: AlbumManifest =
        serde_json::from_slice(&read_entry(&zip, "album/album.json")).unwrap();
    assert_eq!(manifest.conversations.as_ref().map(Vec::len), Some(3));
    assert!(manifest.history.iter().any(|h| h.id == "hist:first-words"));
    assert_eq!(read_entry(&zip, "album/assets/photo%3A1.jpeg"), vec![7u8; 300_000]);
}

#[test]
fn test_export_to_file_is_readable() {
    let album = AlbumDir::new();
    let store = album.open_store();
    let out = album.inputs_dir().join("assets.zip");

    let file = fs::File::create(&out).unwrap();
    BundleExporter::new(&store).export(ExportKind::AssetsOnly, file).unwrap().unwrap();

    let reader = ArchiveReader::new(fs::File::open(&out).unwrap()).unwrap();
    assert!(reader.is_empty());
}
