/// CLI binary integration tests using assert_cmd
///
/// These tests invoke the actual binary and verify command-line behavior
mod common;

use std::process::Command;

use assert_cmd::prelude::*;
use common::{AlbumDir, GraphExportBuilder, path_str, realistic_inputs};
use predicates::prelude::*;

fn album_cmd(album: &AlbumDir) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_memory-album"));
    cmd.env("MEMORY_ALBUM_DIR", album.data_dir()).env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_cli_import_directory_then_stats() {
    let album = AlbumDir::new();
    realistic_inputs(&album);

    album_cmd(&album)
        .args(["import", path_str(&album.inputs_dir())])
        .assert()
        .success()
        .stdout(predicate::str::contains("export.zip: saved 2, skipped 0"))
        .stdout(predicate::str::contains("sessions.json: saved 1, skipped 0"));

    album_cmd(&album)
        .arg("stats")
        .assert()
        .success()
        .stdout(predicate::str::contains("Memory Album Statistics"))
        .stdout(predicate::str::contains("Conversations: 3"))
        .stdout(predicate::str::contains("Pending checkpoints: 0"))
        .stdout(predicate::str::contains("Search index: not built"));
}

#[test]
fn test_cli_search_builds_index_on_demand() {
    let album = AlbumDir::new();
    realistic_inputs(&album);
    album_cmd(&album).args(["import", path_str(&album.inputs_dir())]).assert().success();

    album_cmd(&album)
        .args(["search", "lentils"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Conversations (1)"))
        .stdout(predicate::str::contains("openai:recipe"))
        .stdout(predicate::str::contains("Dinner ideas"));

    album_cmd(&album)
        .arg("stats")
        .assert()
        .success()
        .stdout(predicate::str::contains("Search index: fresh"));
}

#[test]
fn test_cli_search_json_output() {
    let album = AlbumDir::new();
    realistic_inputs(&album);
    album_cmd(&album).args(["import", path_str(&album.inputs_dir())]).assert().success();

    let output = album_cmd(&album).args(["search", "sunset", "--json"]).output().unwrap();
    assert!(output.status.success());
    let hits: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(hits["conversations"], serde_json::json!(["claude:s-1", "openai:trip"]));
}

#[test]
fn test_cli_search_no_matches() {
    let album = AlbumDir::new();
    album_cmd(&album)
        .args(["search", "anything"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No matches"));
}

#[test]
fn test_cli_index_command() {
    let album = AlbumDir::new();
    realistic_inputs(&album);
    album_cmd(&album).args(["import", path_str(&album.inputs_dir())]).assert().success();

    album_cmd(&album)
        .arg("index")
        .assert()
        .success()
        .stdout(predicate::str::contains("Indexed"));
    assert!(album.data_dir().join("cache").join("search-index.bin").exists());
}

#[test]
fn test_cli_export_lite() {
    let album = AlbumDir::new();
    realistic_inputs(&album);
    album_cmd(&album).args(["import", path_str(&album.inputs_dir())]).assert().success();

    let out = album.inputs_dir().join("album-data.json");
    album_cmd(&album)
        .args(["export", path_str(&out), "--lite"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Wrote"));

    let manifest: serde_json::Value =
        serde_json::from_slice(&std::fs::read(&out).unwrap()).unwrap();
    assert_eq!(manifest["version"], 2);
    assert_eq!(manifest["includeConversations"], false);
}

#[test]
fn test_cli_checkpoint_found_then_restart() {
    let album = AlbumDir::new();
    let input = album.write_input("export.json", GraphExportBuilder::new().many(30, 1.0).build());

    // Leave a checkpoint behind with a cancelled library run
    {
        let store = album.open_store();
        let config = memory_album::config::ImportConfig::default();
        let cancel = memory_album::importer::CancelToken::new();
        cancel.cancel();
        memory_album::importer::ImportPipeline::new(&store, &config)
            .with_cancel(cancel)
            .import(&input, memory_album::importer::ImportOptions::default())
            .unwrap();
    }

    album_cmd(&album)
        .args(["import", path_str(&input)])
        .assert()
        .success()
        .stdout(predicate::str::contains("checkpoint at 25 items"));

    album_cmd(&album)
        .args(["checkpoints"])
        .assert()
        .success()
        .stdout(predicate::str::contains("processed 25, saved 25, skipped 0"));

    album_cmd(&album)
        .args(["import", path_str(&input), "--restart"])
        .assert()
        .success()
        .stdout(predicate::str::contains("saved 5, skipped 25"));

    album_cmd(&album)
        .args(["checkpoints"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No pending checkpoints"));
}

#[test]
fn test_cli_import_missing_file_fails() {
    let album = AlbumDir::new();
    album_cmd(&album)
        .args(["import", "/nonexistent/export.zip"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Import of"));
}

#[test]
fn test_cli_no_command_shows_help_message() {
    let album = AlbumDir::new();
    album_cmd(&album)
        .assert()
        .success()
        .stdout(predicate::str::contains("Use --help for usage information"));
}

#[test]
fn test_cli_help_flag() {
    let album = AlbumDir::new();
    album_cmd(&album)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Import, search and export"));
}

#[test]
fn test_cli_moment_add_then_search_and_list() {
    let album = AlbumDir::new();
    realistic_inputs(&album);
    album_cmd(&album).args(["import", path_str(&album.inputs_dir())]).assert().success();

    album_cmd(&album)
        .args(["moment", "add", "openai:trip", "0", "1", "--title", "Pier sunset"])
        .args(["--tag", "beach"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"Pier sunset\" (messages 0..=1, models: gpt-4o)"));

    album_cmd(&album)
        .args(["search", "pier sunset"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Moments (1)"))
        .stdout(predicate::str::contains("Pier sunset"));

    album_cmd(&album)
        .args(["moment", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Pier sunset  openai:trip 0..=1"));
}

#[test]
fn test_cli_moment_add_rejects_bad_range_and_unknown_conversation() {
    let album = AlbumDir::new();
    realistic_inputs(&album);
    album_cmd(&album).args(["import", path_str(&album.inputs_dir())]).assert().success();

    album_cmd(&album)
        .args(["moment", "add", "openai:trip", "1", "5"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid for a conversation of 2 messages"));

    album_cmd(&album)
        .args(["moment", "add", "openai:nope", "0", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));

    album_cmd(&album)
        .args(["moment", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No moments"));
}
