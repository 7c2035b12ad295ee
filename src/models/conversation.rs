use std::fmt;

use serde::{Deserialize, Serialize};

use super::time::{EpochMillis, EpochSeconds};

/// Author role of a message. Unknown roles are preserved verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Role {
    User,
    Assistant,
    System,
    Other(String),
}

impl Role {
    pub fn as_str(&self) -> &str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
            Role::Other(s) => s,
        }
    }
}

impl From<String> for Role {
    fn from(value: String) -> Self {
        match value.as_str() {
            "user" => Role::User,
            "assistant" => Role::Assistant,
            "system" => Role::System,
            _ => Role::Other(value),
        }
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        match role {
            Role::Other(s) => s,
            other => other.as_str().to_string(),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub text: String,
    /// Source-native epoch seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<EpochSeconds>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

/// Canonical conversation, the unit of import and deduplication.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationRecord {
    /// `provider:rawId`, stable across re-imports of the same source conversation
    pub id: String,
    pub provider: String,
    pub raw_id: String,
    pub title: String,
    pub created_at: EpochMillis,
    pub updated_at: EpochMillis,
    /// Distinct model names in first-seen order
    pub models: Vec<String>,
    pub messages: Vec<Message>,
}

impl ConversationRecord {
    pub fn canonical_id(provider: &str, raw_id: &str) -> String {
        format!("{}:{}", provider, raw_id)
    }

    pub fn first_with_role(&self, role: &Role) -> Option<&Message> {
        self.messages.iter().find(|m| &m.role == role)
    }
}

/// Collect distinct model names across messages, preserving first-seen order.
pub fn distinct_models(messages: &[Message]) -> Vec<String> {
    let mut models: Vec<String> = Vec::new();
    for model in messages.iter().filter_map(|m| m.model.as_deref()) {
        if !model.is_empty() && !models.iter().any(|m| m == model) {
            models.push(model.to_string());
        }
    }
    models
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(role: Role, model: Option<&str>) -> Message {
        Message { role, text: "hi".to_string(), timestamp: None, model: model.map(String::from) }
    }

    #[test]
    fn test_role_roundtrips_unknown_values() {
        let role: Role = serde_json::from_str(r#""tool""#).unwrap();
        assert_eq!(role, Role::Other("tool".to_string()));
        assert_eq!(serde_json::to_string(&role).unwrap(), r#""tool""#);
        assert_eq!(serde_json::to_string(&Role::Assistant).unwrap(), r#""assistant""#);
    }

    #[test]
    fn test_distinct_models_keeps_first_seen_order() {
        let messages = vec![
            message(Role::User, None),
            message(Role::Assistant, Some("gpt-4o")),
            message(Role::Assistant, Some("o1")),
            message(Role::Assistant, Some("gpt-4o")),
        ];
        assert_eq!(distinct_models(&messages), vec!["gpt-4o", "o1"]);
    }

    #[test]
    fn test_record_uses_camel_case_fields() {
        let record = ConversationRecord {
            id: "openai:abc".to_string(),
            provider: "openai".to_string(),
            raw_id: "abc".to_string(),
            title: "t".to_string(),
            created_at: EpochMillis(1),
            updated_at: EpochMillis(2),
            models: vec![],
            messages: vec![],
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["rawId"], "abc");
        assert_eq!(json["updatedAt"], 2);
    }
}
