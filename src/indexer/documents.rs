//! Turning stored entities into search documents.

use crate::models::{
    ConversationRecord, DocKind, HistoryEvent, Moment, PromptProfile, SearchDocument,
};

/// A document together with the text its grams come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDocument {
    pub document: SearchDocument,
    pub text: String,
}

impl SourceDocument {
    fn new(kind: DocKind, id: String, ref_id: &str, preview: &str, text: String) -> Self {
        let document = SearchDocument {
            id,
            kind,
            ref_id: ref_id.to_string(),
            preview_text: preview.to_string(),
        };
        Self { document, text }
    }
}

/// Split `text` on line boundaries into chunks of at most `max_chars` characters.
///
/// Lines longer than `max_chars` are cut into `max_chars` pieces. Blank chunks are
/// dropped.
pub fn chunk_text(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut chunks = Vec::new();
    let mut buf = String::new();
    let mut buf_chars = 0;

    for line in text.split('\n') {
        for piece in split_long_line(line, max_chars) {
            let piece_chars = piece.chars().count();
            if buf_chars + piece_chars + 1 > max_chars {
                push_chunk(&mut chunks, &mut buf);
                buf_chars = 0;
            }
            if !buf.is_empty() {
                buf.push('\n');
                buf_chars += 1;
            }
            buf.push_str(piece);
            buf_chars += piece_chars;
        }
    }
    push_chunk(&mut chunks, &mut buf);
    chunks
}

fn split_long_line(line: &str, max_chars: usize) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut rest = line;
    while let Some((cut, _)) = rest.char_indices().nth(max_chars) {
        pieces.push(&rest[..cut]);
        rest = &rest[cut..];
    }
    pieces.push(rest);
    pieces
}

fn push_chunk(chunks: &mut Vec<String>, buf: &mut String) {
    let chunk = std::mem::take(buf);
    if !chunk.trim().is_empty() {
        chunks.push(chunk);
    }
}

/// One document per chunk of title plus `role\ntext` message blocks.
pub fn conversation_documents(
    conv: &ConversationRecord,
    chunk_chars: usize,
) -> Vec<SourceDocument> {
    let body = conv
        .messages
        .iter()
        .map(|m| format!("{}\n{}", m.role, m.text))
        .collect::<Vec<_>>()
        .join("\n\n");
    let text = format!("{}\n{}", conv.title, body);

    chunk_text(&text, chunk_chars)
        .into_iter()
        .enumerate()
        .map(|(k, chunk)| {
            let id = format!("{}:{}:{}", DocKind::Conversation.prefix(), conv.id, k);
            SourceDocument::new(DocKind::Conversation, id, &conv.id, &conv.title, chunk)
        })
        .collect()
}

pub fn moment_document(moment: &Moment) -> SourceDocument {
    let text = format!("{}\n{}\n{}", moment.title, moment.tags.join(" "), moment.goodbye);
    SourceDocument::new(
        DocKind::Moment,
        entity_doc_id(DocKind::Moment, &moment.id),
        &moment.id,
        preview_or(&moment.title, "Moment"),
        text,
    )
}

pub fn prompt_document(prompt: &PromptProfile) -> SourceDocument {
    let text = format!("{}\n{}\n{}", prompt.name, prompt.content, prompt.companion);
    SourceDocument::new(
        DocKind::Prompt,
        entity_doc_id(DocKind::Prompt, &prompt.id),
        &prompt.id,
        preview_or(&prompt.name, "Prompt"),
        text,
    )
}

pub fn history_document(event: &HistoryEvent) -> SourceDocument {
    let text = [
        event.title.as_str(),
        event.detail.as_str(),
        event.memory.as_str(),
        event.model.as_str(),
        event.provider.as_str(),
    ]
    .join("\n");
    SourceDocument::new(
        DocKind::History,
        entity_doc_id(DocKind::History, &event.id),
        &event.id,
        preview_or(&event.title, "History"),
        text,
    )
}

fn entity_doc_id(kind: DocKind, id: &str) -> String {
    format!("{}:{}", kind.prefix(), id)
}

fn preview_or<'a>(text: &'a str, fallback: &'a str) -> &'a str {
    if text.is_empty() { fallback } else { text }
}
