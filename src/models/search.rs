use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocKind {
    Conversation,
    Moment,
    Prompt,
    History,
}

impl DocKind {
    /// Prefix used in document ids (`c:<id>:<chunk>`, `m:<id>`, ...)
    pub fn prefix(self) -> &'static str {
        match self {
            DocKind::Conversation => "c",
            DocKind::Moment => "m",
            DocKind::Prompt => "p",
            DocKind::History => "h",
        }
    }
}

/// One indexed unit: a conversation chunk or a whole moment/prompt/history entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchDocument {
    pub id: String,
    pub kind: DocKind,
    /// Id of the owning entity; shared by every chunk of a conversation
    pub ref_id: String,
    pub preview_text: String,
}

/// Query result: owning entity ids grouped by kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHits {
    pub conversations: Vec<String>,
    pub moments: Vec<String>,
    pub prompts: Vec<String>,
    pub history: Vec<String>,
}

impl SearchHits {
    pub fn ids(&self, kind: DocKind) -> &[String] {
        match kind {
            DocKind::Conversation => &self.conversations,
            DocKind::Moment => &self.moments,
            DocKind::Prompt => &self.prompts,
            DocKind::History => &self.history,
        }
    }

    pub(crate) fn ids_mut(&mut self, kind: DocKind) -> &mut Vec<String> {
        match kind {
            DocKind::Conversation => &mut self.conversations,
            DocKind::Moment => &mut self.moments,
            DocKind::Prompt => &mut self.prompts,
            DocKind::History => &mut self.history,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    pub fn total(&self) -> usize {
        self.conversations.len() + self.moments.len() + self.prompts.len() + self.history.len()
    }
}

/// Size of a built index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexStats {
    pub doc_count: usize,
    pub gram_count: usize,
}
