//! Normalizer for generic session lists: `[{provider, sessionId, title, messages}]`,
//! optionally wrapped as `{"sessions": [...]}` or `{"conversations": [...]}`.

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};
use uuid::Uuid;

use super::deserializers::{lenient_millis, lenient_seconds, lenient_string};
use super::graph_export::UNTITLED;
use crate::models::{
    ConversationRecord, EpochMillis, EpochSeconds, Message, Role, distinct_models,
};

pub const DEFAULT_PROVIDER: &str = "other";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSession {
    #[serde(default, deserialize_with = "lenient_string")]
    provider: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    session_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    title: Option<String>,
    #[serde(default, deserialize_with = "lenient_millis")]
    created_at: Option<EpochMillis>,
    #[serde(default, deserialize_with = "lenient_millis")]
    updated_at: Option<EpochMillis>,
    #[serde(default)]
    messages: Value,
}

#[derive(Debug, Deserialize)]
struct RawMessage {
    #[serde(default, deserialize_with = "lenient_string")]
    role: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    text: Option<String>,
    #[serde(default, deserialize_with = "lenient_seconds")]
    ts: Option<EpochSeconds>,
    #[serde(default, deserialize_with = "lenient_seconds")]
    create_time: Option<EpochSeconds>,
    #[serde(default, deserialize_with = "lenient_string")]
    model: Option<String>,
}

/// Pull the session list out of a whole-document input.
pub fn sessions_from_document(document: Value) -> Vec<Value> {
    match document {
        Value::Array(items) => items,
        Value::Object(mut map) => ["sessions", "conversations"]
            .iter()
            .find_map(|key| match map.remove(*key) {
                Some(Value::Array(items)) => Some(items),
                _ => None,
            })
            .unwrap_or_default(),
        _ => Vec::new(),
    }
}

/// Map one session object to a canonical record.
///
/// Returns `None` when no message has non-blank text. A session without an id gets a
/// freshly generated one, so such sessions are not idempotent across re-imports.
pub fn normalize(value: Value) -> Option<ConversationRecord> {
    let raw: RawSession = match serde_json::from_value(value) {
        Ok(raw) => raw,
        Err(e) => {
            warn!("Skipping session with unexpected shape: {}", e);
            return None;
        }
    };

    let messages = match raw.messages {
        Value::Array(items) => items.into_iter().filter_map(to_message).collect::<Vec<_>>(),
        _ => Vec::new(),
    };
    if messages.is_empty() {
        debug!("Dropping session without messages");
        return None;
    }

    let provider = raw.provider.unwrap_or_else(|| DEFAULT_PROVIDER.to_string());
    let raw_id = raw
        .session_id
        .or(raw.id)
        .unwrap_or_else(|| format!("sess_{}", Uuid::new_v4().simple()));

    let newest = messages.iter().filter_map(|m| m.timestamp).map(EpochSeconds::to_millis).max();
    let created_at = raw.created_at.or(raw.updated_at).or(newest).unwrap_or(EpochMillis(0));

    Some(ConversationRecord {
        id: ConversationRecord::canonical_id(&provider, &raw_id),
        title: raw.title.unwrap_or_else(|| UNTITLED.to_string()),
        updated_at: raw.updated_at.unwrap_or(created_at),
        created_at,
        models: distinct_models(&messages),
        provider,
        raw_id,
        messages,
    })
}

fn to_message(value: Value) -> Option<Message> {
    let raw: RawMessage = serde_json::from_value(value).ok()?;
    let text = raw.text.filter(|t| !t.trim().is_empty())?;
    Some(Message {
        role: raw.role.map(Role::from).unwrap_or(Role::User),
        text,
        timestamp: raw.ts.or(raw.create_time),
        model: raw.model,
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_defaults_for_missing_fields() {
        let record = normalize(json!({
            "id": "s1",
            "messages": [{"text": "hello"}, {"role": 7, "text": "again", "ts": 3}]
        }))
        .unwrap();

        assert_eq!(record.id, "other:s1");
        assert_eq!(record.title, UNTITLED);
        assert!(record.messages.iter().all(|m| m.role == Role::User));
        assert_eq!(record.created_at, EpochMillis(3_000));
        assert_eq!(record.updated_at, EpochMillis(3_000));
    }

    #[test]
    fn test_session_id_preferred_over_id() {
        let record = normalize(json!({
            "provider": "claude",
            "sessionId": "sess-9",
            "id": "ignored",
            "createdAt": 1000,
            "messages": [{"role": "assistant", "text": "hi", "model": "opus"}]
        }))
        .unwrap();

        assert_eq!(record.id, "claude:sess-9");
        assert_eq!(record.created_at, EpochMillis(1000));
        assert_eq!(record.updated_at, EpochMillis(1000));
        assert_eq!(record.models, vec!["opus"]);
        assert_eq!(record.messages[0].role, Role::Assistant);
    }

    #[test]
    fn test_blank_messages_dropped() {
        let record = normalize(json!({
            "id": "s1",
            "messages": [{"text": "  "}, {"text": 5}, "junk", {"text": "kept", "create_time": 2}]
        }))
        .unwrap();
        assert_eq!(record.messages.len(), 1);
        assert_eq!(record.messages[0].timestamp, Some(EpochSeconds(2.0)));

        assert!(normalize(json!({"id": "s2", "messages": [{"text": ""}]})).is_none());
        assert!(normalize(json!({"id": "s3"})).is_none());
    }

    #[test]
    fn test_missing_id_gets_generated_token() {
        let messages = json!([{"text": "hi"}]);
        let a = normalize(json!({"messages": messages.clone()})).unwrap();
        let b = normalize(json!({"messages": messages})).unwrap();
        assert!(a.raw_id.starts_with("sess_"));
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_sessions_from_document_shapes() {
        assert_eq!(sessions_from_document(json!([{"id": 1}])).len(), 1);
        assert_eq!(sessions_from_document(json!({"sessions": [{}, {}]})).len(), 2);
        assert_eq!(sessions_from_document(json!({"conversations": [{}]})).len(), 1);
        assert!(sessions_from_document(json!({"other": []})).is_empty());
        assert!(sessions_from_document(json!("text")).is_empty());
    }
}
