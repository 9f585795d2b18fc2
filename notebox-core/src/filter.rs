//! Listing filters for notes.

use serde::{Deserialize, Serialize};

use crate::Note;

/// Filter applied when listing notes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::IntoParams))]
#[cfg_attr(feature = "openapi", into_params(parameter_in = Query))]
#[serde(default)]
pub struct NoteFilter {
    /// Only notes carrying this exact tag.
    pub tag: Option<String>,
    /// Case-insensitive substring match on the title.
    pub title_contains: Option<String>,
    /// Include soft-deleted notes.
    pub include_deleted: bool,
}

impl NoteFilter {
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    pub fn with_title_contains(mut self, needle: impl Into<String>) -> Self {
        self.title_contains = Some(needle.into());
        self
    }

    pub fn including_deleted(mut self) -> Self {
        self.include_deleted = true;
        self
    }

    /// Evaluate the filter against a note.
    pub fn matches(&self, note: &Note) -> bool {
        if !note.is_visible(self.include_deleted) {
            return false;
        }
        if let Some(needle) = self.title_contains.as_deref().filter(|s| !s.is_empty()) {
            if !note.title.to_lowercase().contains(&needle.to_lowercase()) {
                return false;
            }
        }
        if let Some(tag) = self.tag.as_deref().filter(|s| !s.is_empty()) {
            if !note.tags.iter().any(|t| t == tag) {
                return false;
            }
        }
        true
    }
}
