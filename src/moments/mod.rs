//! Moments cut from a stored conversation.
//!
//! A moment covers an inclusive range of message positions. Its model list is derived
//! from the messages inside that range only, in order of first appearance.

use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::index_storage::mark_search_dirty;
use crate::models::{ConversationRecord, EpochMillis, Moment, distinct_models};
use crate::store::{RecordStore, RecordStoreExt, StoreError};

pub const DEFAULT_MOMENT_TITLE: &str = "Moment";

#[derive(Debug, Error)]
pub enum MomentError {
    #[error("conversation {0} not found")]
    ConversationNotFound(String),

    #[error("message range {from}..={to} is invalid for a conversation of {len} messages")]
    InvalidRange { from: usize, to: usize, len: usize },

    #[error(transparent)]
    Storage(#[from] StoreError),
}

/// Which part of which conversation to keep.
#[derive(Debug, Clone, Default)]
pub struct MomentSelection {
    pub conv_id: String,
    pub from_idx: usize,
    /// Inclusive
    pub to_idx: usize,
    /// Blank titles fall back to [`DEFAULT_MOMENT_TITLE`]
    pub title: String,
    pub tags: Vec<String>,
}

/// Build a moment from `conv` without storing it.
pub fn moment_from_selection(
    conv: &ConversationRecord,
    selection: &MomentSelection,
) -> Result<Moment, MomentError> {
    let len = conv.messages.len();
    let (from, to) = (selection.from_idx, selection.to_idx);
    if from > to || to >= len {
        return Err(MomentError::InvalidRange { from, to, len });
    }

    let title = selection.title.trim();
    let now = EpochMillis::now();
    Ok(Moment {
        id: format!("moment_{}", Uuid::new_v4().simple()),
        conv_id: conv.id.clone(),
        title: if title.is_empty() { DEFAULT_MOMENT_TITLE } else { title }.to_string(),
        created_at: now,
        updated_at: now,
        from_idx: from,
        to_idx: to,
        models: distinct_models(&conv.messages[from..=to]),
        tags: selection.tags.clone(),
        image_id: None,
        prompt_profile_id: None,
        goodbye: String::new(),
    })
}

/// Create and store a moment, marking the search index stale.
pub fn create_moment<S: RecordStore + ?Sized>(
    store: &S,
    selection: &MomentSelection,
) -> Result<Moment, MomentError> {
    let conv = store
        .get::<ConversationRecord>(&selection.conv_id)?
        .ok_or_else(|| MomentError::ConversationNotFound(selection.conv_id.clone()))?;

    let moment = moment_from_selection(&conv, selection)?;
    store.put(&moment)?;
    mark_search_dirty(store)?;
    info!(
        "Created moment {} from {} messages {}..={}",
        moment.id, conv.id, moment.from_idx, moment.to_idx
    );
    Ok(moment)
}
