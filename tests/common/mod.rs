//! Shared test utilities for integration tests
#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use memory_album::archive::{EntryContent, ZipWriter};
use memory_album::store::FileStore;
use serde_json::{Value, json};
use tempfile::TempDir;

const MODIFIED_MS: i64 = 1_700_000_000_000;

/// Temporary album data directory with a scratch area for input files
pub struct AlbumDir {
    temp_dir: TempDir,
}

impl AlbumDir {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        fs::create_dir(temp_dir.path().join("data")).expect("Failed to create data dir");
        fs::create_dir(temp_dir.path().join("inputs")).expect("Failed to create inputs dir");
        Self { temp_dir }
    }

    pub fn data_dir(&self) -> PathBuf {
        self.temp_dir.path().join("data")
    }

    pub fn inputs_dir(&self) -> PathBuf {
        self.temp_dir.path().join("inputs")
    }

    pub fn open_store(&self) -> FileStore {
        FileStore::open(&self.data_dir()).expect("Failed to open store")
    }

    /// Write `content` to `inputs/<name>`
    pub fn write_input(&self, name: &str, content: impl AsRef<[u8]>) -> PathBuf {
        let path = self.inputs_dir().join(name);
        fs::write(&path, content).expect("Failed to write input file");
        path
    }

    /// Store `content` as `entry` inside the ZIP `inputs/<name>`
    pub fn write_zip_input(&self, name: &str, entry: &str, content: impl Into<Vec<u8>>) -> PathBuf {
        let mut zip = ZipWriter::new(Vec::new());
        zip.add_entry(entry, EntryContent::Bytes(content.into()), MODIFIED_MS)
            .expect("Failed to add zip entry");
        let bytes = zip.finish().expect("Failed to finish zip");
        self.write_input(name, bytes)
    }
}

/// One message of a test conversation: role, text, epoch seconds, model
#[derive(Clone)]
pub struct MessageSpec {
    pub role: String,
    pub text: String,
    pub ts: Option<f64>,
    pub model: Option<String>,
}

impl MessageSpec {
    pub fn user(text: &str, ts: f64) -> Self {
        Self { role: "user".to_string(), text: text.to_string(), ts: Some(ts), model: None }
    }

    pub fn assistant(text: &str, ts: f64, model: &str) -> Self {
        Self {
            role: "assistant".to_string(),
            text: text.to_string(),
            ts: Some(ts),
            model: Some(model.to_string()),
        }
    }

    pub fn untimed(mut self) -> Self {
        self.ts = None;
        self
    }
}

/// Builder for graph-structured exports (`[{id, title, mapping: {...}}]`)
#[derive(Default)]
pub struct GraphExportBuilder {
    conversations: Vec<Value>,
}

impl GraphExportBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a conversation whose mapping holds one node per message, in the given order
    pub fn conversation(
        mut self,
        id: &str,
        title: &str,
        update_time: f64,
        messages: &[MessageSpec],
    ) -> Self {
        let mut mapping = serde_json::Map::new();
        mapping.insert(
            "root".to_string(),
            json!({"id": "root", "message": null, "parent": null, "children": []}),
        );
        for (i, m) in messages.iter().enumerate() {
            let node_id = format!("{}-n{}", id, i);
            let node = json!({
                "id": node_id,
                "parent": "root",
                "children": [],
                "message": {
                    "author": {"role": m.role},
                    "content": {"content_type": "text", "parts": [m.text]},
                    "create_time": m.ts,
                    "metadata": {"model_slug": m.model}
                }
            });
            mapping.insert(node_id, node);
        }
        self.conversations.push(json!({
            "id": id,
            "title": title,
            "create_time": update_time - 100.0,
            "update_time": update_time,
            "current_node": format!("{}-n0", id),
            "mapping": mapping
        }));
        self
    }

    /// Add `count` simple conversations `conv-0..conv-<count>`
    pub fn many(mut self, count: usize, update_time: f64) -> Self {
        for i in 0..count {
            let text = format!("message number {} about topic {}", i, i % 7);
            self = self.conversation(
                &format!("conv-{}", i),
                &format!("Conversation {}", i),
                update_time,
                &[MessageSpec::user(&text, update_time - 50.0)],
            );
        }
        self
    }

    /// Add an arbitrary raw value to the array
    pub fn raw(mut self, value: Value) -> Self {
        self.conversations.push(value);
        self
    }

    pub fn build(&self) -> String {
        serde_json::to_string_pretty(&self.conversations).expect("Failed to serialize export")
    }
}

/// Builder for generic session lists (`[{provider, sessionId, title, messages}]`)
#[derive(Default)]
pub struct SessionListBuilder {
    sessions: Vec<Value>,
}

impl SessionListBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn session(
        mut self,
        provider: &str,
        session_id: &str,
        title: &str,
        updated_at_ms: i64,
        messages: &[MessageSpec],
    ) -> Self {
        let messages: Vec<Value> = messages
            .iter()
            .map(|m| json!({"role": m.role, "text": m.text, "ts": m.ts, "model": m.model}))
            .collect();
        self.sessions.push(json!({
            "provider": provider,
            "sessionId": session_id,
            "title": title,
            "updatedAt": updated_at_ms,
            "messages": messages
        }));
        self
    }

    /// Bare array form
    pub fn build_array(&self) -> String {
        serde_json::to_string(&self.sessions).expect("Failed to serialize sessions")
    }

    /// `{"sessions": [...]}` document form
    pub fn build_document(&self) -> String {
        serde_json::to_string(&json!({"sessions": self.sessions}))
            .expect("Failed to serialize sessions")
    }
}

/// Write a small realistic album input set: a graph export and a session document
pub fn realistic_inputs(album: &AlbumDir) -> Vec<PathBuf> {
    let export = GraphExportBuilder::new()
        .conversation(
            "trip",
            "Planning the beach trip",
            1_700_000_300.0,
            &[
                MessageSpec::user("Where should we watch the sunset?", 1_700_000_100.0),
                MessageSpec::assistant("The western pier is lovely.", 1_700_000_110.0, "gpt-4o"),
            ],
        )
        .conversation(
            "recipe",
            "Dinner ideas",
            1_700_000_600.0,
            &[MessageSpec::user("Something with lentils please", 1_700_000_500.0)],
        )
        .build();
    let sessions = SessionListBuilder::new()
        .session(
            "claude",
            "s-1",
            "Poetry night",
            1_700_000_900_000,
            &[
                MessageSpec::user("Write a haiku about the sunset", 1_700_000_800.0),
                MessageSpec::assistant("Amber light dissolves", 1_700_000_810.0, "claude-3"),
            ],
        )
        .build_document();
    vec![
        album.write_zip_input("export.zip", "conversations.json", export),
        album.write_input("sessions.json", sessions),
    ]
}

pub fn path_str(path: &Path) -> &str {
    path.to_str().expect("temp paths are UTF-8")
}
