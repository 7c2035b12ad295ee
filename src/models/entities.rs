use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::time::EpochMillis;

/// A highlighted span of a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Moment {
    pub id: String,
    pub conv_id: String,
    #[serde(default)]
    pub title: String,
    pub created_at: EpochMillis,
    pub updated_at: EpochMillis,
    #[serde(default)]
    pub from_idx: usize,
    #[serde(default)]
    pub to_idx: usize,
    #[serde(default)]
    pub models: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub image_id: Option<String>,
    #[serde(default)]
    pub prompt_profile_id: Option<String>,
    #[serde(default)]
    pub goodbye: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptProfile {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub companion: String,
    #[serde(default)]
    pub content: String,
    pub updated_at: EpochMillis,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryLinks {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conv_id: Option<String>,
}

/// A timeline fact, either user-authored or derived during import (`auto`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEvent {
    pub id: String,
    pub ts: EpochMillis,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub detail: String,
    #[serde(default)]
    pub memory: String,
    #[serde(default)]
    pub provider: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub links: HistoryLinks,
    #[serde(default)]
    pub auto: bool,
}

/// Binary attachment. The bytes live in the file at `path`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Asset {
    pub id: String,
    #[serde(default)]
    pub mime_type: String,
    pub updated_at: EpochMillis,
    pub path: PathBuf,
}

impl Asset {
    /// File extension derived from the MIME subtype (`image/png` -> `png`).
    pub fn extension(&self) -> &str {
        self.mime_type
            .split_once('/')
            .map(|(_, sub)| sub)
            .filter(|sub| !sub.is_empty())
            .unwrap_or("bin")
    }
}

/// Display label override for a model. Kept opaque apart from its id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelLabel {
    pub id: String,
    #[serde(flatten)]
    pub fields: serde_json::Map<String, serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn asset(mime: &str) -> Asset {
        Asset {
            id: "a1".to_string(),
            mime_type: mime.to_string(),
            updated_at: EpochMillis(0),
            path: PathBuf::from("/tmp/a1"),
        }
    }

    #[test]
    fn test_asset_extension() {
        assert_eq!(asset("image/png").extension(), "png");
        assert_eq!(asset("").extension(), "bin");
        assert_eq!(asset("image/").extension(), "bin");
    }

    #[test]
    fn test_model_label_keeps_unknown_fields() {
        let label: ModelLabel =
            serde_json::from_str(r#"{"id":"openai:gpt-4o","name":"Four","color":"red"}"#).unwrap();
        assert_eq!(label.id, "openai:gpt-4o");
        assert_eq!(label.fields["name"], "Four");
        let back = serde_json::to_value(&label).unwrap();
        assert_eq!(back["color"], "red");
    }

    #[test]
    fn test_moment_defaults_optional_fields() {
        let moment: Moment = serde_json::from_str(
            r#"{"id":"m1","convId":"openai:c1","createdAt":1,"updatedAt":2}"#,
        )
        .unwrap();
        assert!(moment.tags.is_empty());
        assert_eq!(moment.goodbye, "");
        assert!(moment.image_id.is_none());
    }
}
