//! Timeline facts derived from newly saved conversations: the earliest first exchange,
//! and the first appearance of each provider/model pair.

use std::collections::BTreeMap;

use crate::models::{ConversationRecord, EpochMillis, HistoryEvent, HistoryLinks, Role};
use crate::store::{RecordStore, RecordStoreExt, StoreError};

pub const FIRST_WORDS_ID: &str = "hist:first-words";
const EXCERPT_CHARS: usize = 180;

#[derive(Debug, Clone)]
struct FirstContact {
    ts: EpochMillis,
    conv_id: String,
    provider: String,
    model: String,
    you: Option<String>,
    them: Option<String>,
}

#[derive(Debug, Clone)]
struct FirstSeen {
    ts: EpochMillis,
    conv_id: String,
}

/// Accumulates timeline facts while an import runs.
#[derive(Debug, Default)]
pub struct TimelineStats {
    earliest: Option<FirstContact>,
    models: BTreeMap<(String, String), FirstSeen>,
}

impl TimelineStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, conv: &ConversationRecord) {
        let first_user = conv.first_with_role(&Role::User);
        let first_reply = conv.first_with_role(&Role::Assistant);
        let ts = first_user
            .and_then(|m| m.timestamp)
            .map_or(conv.created_at, |t| t.to_millis());

        if self.earliest.as_ref().is_none_or(|e| ts < e.ts) {
            self.earliest = Some(FirstContact {
                ts,
                conv_id: conv.id.clone(),
                provider: conv.provider.clone(),
                model: conv.models.first().cloned().unwrap_or_default(),
                you: first_user.map(|m| excerpt(&m.text)),
                them: first_reply.map(|m| excerpt(&m.text)),
            });
        }

        for message in &conv.messages {
            let Some(model) = message.model.as_deref() else {
                continue;
            };
            let ts = message.timestamp.map_or(conv.created_at, |t| t.to_millis());
            let key = (conv.provider.clone(), model.to_string());
            match self.models.get(&key) {
                Some(seen) if seen.ts <= ts => {}
                _ => {
                    self.models.insert(key, FirstSeen { ts, conv_id: conv.id.clone() });
                }
            }
        }
    }

    /// Events ordered by timestamp.
    pub fn into_events(self) -> Vec<HistoryEvent> {
        let mut events = Vec::with_capacity(self.models.len() + 1);

        if let Some(first) = self.earliest {
            let you = first.you.map(|t| format!("You: {}", t));
            let them = first.them.map(|t| format!("Them: {}", t));
            let detail = [you, them].into_iter().flatten().collect::<Vec<_>>().join("\n");
            events.push(HistoryEvent {
                id: FIRST_WORDS_ID.to_string(),
                ts: first.ts,
                title: "First words".to_string(),
                detail,
                memory: String::new(),
                provider: first.provider,
                model: first.model,
                links: HistoryLinks { conv_id: Some(first.conv_id) },
                auto: true,
            });
        }

        for ((provider, model), seen) in self.models {
            events.push(HistoryEvent {
                id: model_event_id(&provider, &model),
                ts: seen.ts,
                title: format!("Model debut: {}", model),
                detail: "First time this model appears.".to_string(),
                memory: String::new(),
                provider,
                model,
                links: HistoryLinks { conv_id: Some(seen.conv_id) },
                auto: true,
            });
        }

        events.sort_by_key(|e| e.ts);
        events
    }
}

pub fn model_event_id(provider: &str, model: &str) -> String {
    format!("hist:model:{}:{}", provider, model)
}

/// Persist derived events, keeping any stored event that is as early or earlier.
///
/// # Returns
///
/// The number of events written.
pub fn persist_events<S: RecordStore + ?Sized>(
    store: &S,
    events: Vec<HistoryEvent>,
) -> Result<usize, StoreError> {
    let ids: Vec<&str> = events.iter().map(|e| e.id.as_str()).collect();
    let existing = store.get_many::<HistoryEvent>(&ids)?;

    let fresh: Vec<HistoryEvent> = events
        .into_iter()
        .filter(|e| existing.get(&e.id).is_none_or(|old| e.ts < old.ts))
        .collect();
    store.put_batch(&fresh)?;
    Ok(fresh.len())
}

fn excerpt(text: &str) -> String {
    text.chars().take(EXCERPT_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EpochSeconds, Message};
    use crate::store::MemoryStore;

    fn message(role: Role, text: &str, ts: f64, model: Option<&str>) -> Message {
        Message {
            role,
            text: text.to_string(),
            timestamp: Some(EpochSeconds(ts)),
            model: model.map(String::from),
        }
    }

    fn conv(id: &str, messages: Vec<Message>) -> ConversationRecord {
        ConversationRecord {
            id: format!("openai:{}", id),
            provider: "openai".to_string(),
            raw_id: id.to_string(),
            title: id.to_string(),
            created_at: EpochMillis(0),
            updated_at: EpochMillis(0),
            models: crate::models::distinct_models(&messages),
            messages,
        }
    }

    #[test]
    fn test_earliest_first_contact_wins() {
        let mut stats = TimelineStats::new();
        stats.observe(&conv("late", vec![message(Role::User, "later hello", 200.0, None)]));
        stats.observe(&conv(
            "early",
            vec![
                message(Role::User, &"x".repeat(300), 100.0, None),
                message(Role::Assistant, "reply", 101.0, Some("gpt-4")),
            ],
        ));

        let events = stats.into_events();
        let first = events.iter().find(|e| e.id == FIRST_WORDS_ID).unwrap();
        assert_eq!(first.ts, EpochMillis(100_000));
        assert_eq!(first.links.conv_id.as_deref(), Some("openai:early"));
        assert_eq!(first.model, "gpt-4");
        let lines: Vec<_> = first.detail.lines().collect();
        assert_eq!(lines[0].chars().count(), "You: ".len() + 180);
        assert_eq!(lines[1], "Them: reply");
    }

    #[test]
    fn test_model_first_seen_per_provider() {
        let mut stats = TimelineStats::new();
        stats.observe(&conv("a", vec![message(Role::Assistant, "a", 50.0, Some("gpt-4"))]));
        stats.observe(&conv("b", vec![message(Role::Assistant, "b", 20.0, Some("gpt-4"))]));
        stats.observe(&conv("c", vec![message(Role::Assistant, "c", 30.0, Some("o1"))]));

        let events = stats.into_events();
        let gpt4 = events.iter().find(|e| e.id == model_event_id("openai", "gpt-4")).unwrap();
        assert_eq!(gpt4.ts, EpochMillis(20_000));
        assert_eq!(gpt4.links.conv_id.as_deref(), Some("openai:b"));
        assert!(events.windows(2).all(|w| w[0].ts <= w[1].ts));
        assert_eq!(events.len(), 3);
    }

    #[test]
    fn test_persist_keeps_earlier_existing_events() {
        let store = MemoryStore::new();
        let mut stats = TimelineStats::new();
        stats.observe(&conv("a", vec![message(Role::User, "hi", 10.0, Some("m"))]));
        assert_eq!(persist_events(&store, stats.into_events()).unwrap(), 2);

        let mut later = TimelineStats::new();
        later.observe(&conv("b", vec![message(Role::User, "hi", 99.0, Some("m"))]));
        assert_eq!(persist_events(&store, later.into_events()).unwrap(), 0);

        let mut earlier = TimelineStats::new();
        earlier.observe(&conv("c", vec![message(Role::User, "hi", 1.0, None)]));
        assert_eq!(persist_events(&store, earlier.into_events()).unwrap(), 1);
        let first = store.get::<HistoryEvent>(FIRST_WORDS_ID).unwrap().unwrap();
        assert_eq!(first.ts, EpochMillis(1_000));
    }

    #[test]
    fn test_no_conversations_no_events() {
        assert!(TimelineStats::new().into_events().is_empty());
    }
}
