//! Normalizer for graph-structured exports, where each conversation carries a node-id
//! keyed `mapping` of message nodes.
//!
//! Branch policy: every node with non-empty text is collected and ordered by creation
//! time, untimed nodes last in document order. Parent/child links and `current_node` are
//! ignored, so messages from abandoned branches are kept and interleaved by time rather
//! than pruned as a walk from the current leaf would do.

use std::cmp::Ordering;

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use super::deserializers::{lenient_seconds, lenient_string};
use crate::models::{ConversationRecord, EpochMillis, EpochSeconds, Message, Role, distinct_models};

pub const PROVIDER: &str = "openai";
pub const UNTITLED: &str = "(no title)";

#[derive(Debug, Deserialize)]
struct RawConversation {
    #[serde(default, deserialize_with = "lenient_string")]
    id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    conversation_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    title: Option<String>,
    #[serde(default, deserialize_with = "lenient_seconds")]
    create_time: Option<EpochSeconds>,
    #[serde(default, deserialize_with = "lenient_seconds")]
    update_time: Option<EpochSeconds>,
    #[serde(default)]
    mapping: Value,
}

#[derive(Debug, Deserialize)]
struct RawNode {
    #[serde(default)]
    message: Option<RawMessage>,
}

#[derive(Debug, Deserialize)]
struct RawMessage {
    #[serde(default)]
    author: Option<RawAuthor>,
    #[serde(default)]
    content: Option<RawContent>,
    #[serde(default, deserialize_with = "lenient_seconds")]
    create_time: Option<EpochSeconds>,
    #[serde(default)]
    metadata: Option<RawMetadata>,
}

#[derive(Debug, Deserialize)]
struct RawAuthor {
    #[serde(default, deserialize_with = "lenient_string")]
    role: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawContent {
    #[serde(default)]
    parts: Value,
}

#[derive(Debug, Deserialize)]
struct RawMetadata {
    #[serde(default, deserialize_with = "lenient_string")]
    model_slug: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    model: Option<String>,
}

/// Map one raw conversation to a canonical record.
///
/// Returns `None` for conversations without an id or without any text-bearing message.
pub fn normalize(value: Value) -> Option<ConversationRecord> {
    let raw: RawConversation = match serde_json::from_value(value) {
        Ok(raw) => raw,
        Err(e) => {
            warn!("Skipping conversation with unexpected shape: {}", e);
            return None;
        }
    };

    let Some(raw_id) = raw.id.or(raw.conversation_id) else {
        debug!("Dropping conversation without an id");
        return None;
    };

    let messages = collect_messages(raw.mapping);
    if messages.is_empty() {
        debug!("Dropping conversation {} with no messages", raw_id);
        return None;
    }

    let newest = messages.iter().filter_map(|m| m.timestamp).map(EpochSeconds::to_millis).max();
    let created = raw.create_time.map(EpochSeconds::to_millis);
    let updated = raw.update_time.map(EpochSeconds::to_millis);

    Some(ConversationRecord {
        id: ConversationRecord::canonical_id(PROVIDER, &raw_id),
        provider: PROVIDER.to_string(),
        title: raw.title.unwrap_or_else(|| UNTITLED.to_string()),
        created_at: created.or(updated).or(newest).unwrap_or(EpochMillis(0)),
        updated_at: updated.or(created).or(newest).unwrap_or(EpochMillis(0)),
        models: distinct_models(&messages),
        raw_id,
        messages,
    })
}

fn collect_messages(mapping: Value) -> Vec<Message> {
    let Value::Object(nodes) = mapping else {
        return Vec::new();
    };

    let mut messages: Vec<Message> = nodes
        .into_iter()
        .filter_map(|(node_id, node)| match serde_json::from_value::<RawNode>(node) {
            Ok(node) => node.message.and_then(to_message),
            Err(e) => {
                debug!("Skipping node {}: {}", node_id, e);
                None
            }
        })
        .collect();

    // Stable: equal or missing timestamps keep document order
    messages.sort_by(|a, b| match (a.timestamp, b.timestamp) {
        (Some(x), Some(y)) => x.0.total_cmp(&y.0),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
    messages
}

fn to_message(raw: RawMessage) -> Option<Message> {
    let role = raw.author?.role?;
    let Value::Array(parts) = raw.content?.parts else {
        return None;
    };

    let text = parts.iter().filter_map(Value::as_str).collect::<Vec<_>>().join("\n");
    if text.trim().is_empty() {
        return None;
    }

    let model = raw.metadata.and_then(|m| m.model_slug.or(m.model));
    Some(Message { role: Role::from(role), text, timestamp: raw.create_time, model })
}
