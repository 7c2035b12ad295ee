//! Input parsing: format sniffing, streamed array parsing and schema normalizers.
//!
//! # Error Handling Strategy
//!
//! This module follows a **graceful degradation** approach:
//!
//! - **Individual object failures**: A malformed JSON object in the stream, or one that does
//!   not fit its schema, is logged at `warn` and skipped. One bad conversation never stops
//!   an import.
//!
//! - **Root failures**: Input whose first byte is neither `[` nor `{` cannot be any supported
//!   format; [`sniff_format`] returns `None` and the caller treats it as fatal.
//!
//! - **Lenient fields**: Field-level type mismatches (a number where a string is expected,
//!   `null` timestamps) fall back to defaults through the deserializers in
//!   [`deserializers`] rather than rejecting the whole object.

pub mod array_stream;
pub mod deserializers;
pub mod generic_session;
pub mod graph_export;

use std::sync::LazyLock;

use regex::bytes::Regex;
use serde_json::Value;

pub use array_stream::ArrayStream;
pub use generic_session::sessions_from_document;

use crate::models::ConversationRecord;

/// Object keys that only graph-structured exports carry
static GRAPH_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""(?:mapping|current_node)"\s*:"#).expect("valid marker regex"));

/// Shape of one conversation object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputSchema {
    /// Node-id keyed `mapping` of messages
    GraphExport,
    /// Session objects with a flat `messages` list
    GenericSession,
}

impl InputSchema {
    /// Normalize one raw object, `None` if it yields no usable conversation.
    pub fn normalize(self, value: Value) -> Option<ConversationRecord> {
        match self {
            InputSchema::GraphExport => graph_export::normalize(value),
            InputSchema::GenericSession => generic_session::normalize(value),
        }
    }
}

/// How the content must be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    /// Top-level array, streamed one object at a time
    Stream(InputSchema),
    /// A generic session document small enough to parse whole
    Document,
}

/// Decide the input format from the first bytes of content.
///
/// Returns `None` if the first non-whitespace byte is neither `[` nor `{`.
pub fn sniff_format(head: &[u8]) -> Option<InputFormat> {
    let first = head.iter().find(|b| !b.is_ascii_whitespace())?;
    match first {
        b'[' if GRAPH_MARKER.is_match(head) => Some(InputFormat::Stream(InputSchema::GraphExport)),
        b'[' => Some(InputFormat::Stream(InputSchema::GenericSession)),
        b'{' => Some(InputFormat::Document),
        _ => None,
    }
}
