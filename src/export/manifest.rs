use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{
    Asset, ConversationRecord, HistoryEvent, Moment, ModelLabel, PromptProfile,
};

pub const MANIFEST_VERSION: u32 = 2;

/// Asset listing in the manifest; the bytes travel as separate entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetRef {
    pub id: String,
    #[serde(rename = "type")]
    pub mime_type: String,
}

impl From<&Asset> for AssetRef {
    fn from(asset: &Asset) -> Self {
        Self { id: asset.id.clone(), mime_type: asset.mime_type.clone() }
    }
}

/// Contents of `album.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlbumManifest {
    pub version: u32,
    pub exported_at: DateTime<Utc>,
    pub include_conversations: bool,
    pub history: Vec<HistoryEvent>,
    pub moments: Vec<Moment>,
    pub prompts: Vec<PromptProfile>,
    pub labels: Vec<ModelLabel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversations: Option<Vec<ConversationRecord>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assets: Option<Vec<AssetRef>>,
}
