//! Notebox Core - Entity Types
//!
//! Pure data structures shared by every other crate: the note record and its
//! inputs, client identities, filters, configuration and the error taxonomy.
//! This crate performs no I/O.

pub mod config;
pub mod error;
pub mod filter;
pub mod identity;

pub use config::KvConfig;
pub use error::{ConfigError, NoteboxError, NoteboxResult, StorageError, ValidationError};
pub use filter::NoteFilter;
pub use identity::ClientId;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// IDENTITY TYPES
// ============================================================================

/// Note identifier, assigned by the persistence layer.
pub type NoteId = i64;

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

// ============================================================================
// FIELD LIMITS
// ============================================================================

/// Maximum title length in characters.
pub const TITLE_MAX_CHARS: usize = 100;

/// Maximum body length in characters.
pub const BODY_MAX_CHARS: usize = 5000;

/// Maximum length of a single tag in characters.
pub const TAG_MAX_CHARS: usize = 30;

// ============================================================================
// NOTE
// ============================================================================

/// A stored note.
///
/// The persistence layer owns this record. Copies held in the key-value cache
/// are snapshots that may lag behind by up to the cache TTL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Note {
    pub id: NoteId,
    pub title: String,
    #[serde(alias = "content")]
    pub body: String,
    /// Tags in insertion order.
    #[serde(default)]
    pub tags: Vec<String>,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub created_at: Timestamp,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub updated_at: Timestamp,
    #[serde(default)]
    pub is_deleted: bool,
    #[serde(default)]
    #[cfg_attr(feature = "openapi", schema(value_type = Option<String>, format = "date-time"))]
    pub deleted_at: Option<Timestamp>,
}

impl Note {
    /// Whether this note may be returned to a caller that did or did not ask
    /// for deleted notes.
    pub fn is_visible(&self, include_deleted: bool) -> bool {
        include_deleted || !self.is_deleted
    }

    /// Mark the note as soft-deleted at the given instant.
    pub fn mark_deleted(&mut self, at: Timestamp) {
        self.is_deleted = true;
        self.deleted_at = Some(at);
        self.updated_at = at;
    }

    /// Apply a partial update, bumping `updated_at`.
    pub fn apply(&mut self, update: NoteUpdate, at: Timestamp) {
        if let Some(title) = update.title {
            self.title = title;
        }
        if let Some(body) = update.body {
            self.body = body;
        }
        if let Some(tags) = update.tags {
            self.tags = tags;
        }
        self.updated_at = at;
    }
}

/// Input for creating a note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct NewNote {
    pub title: String,
    #[serde(alias = "content")]
    pub body: String,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

impl NewNote {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            tags: None,
        }
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = Some(tags.into_iter().map(Into::into).collect());
        self
    }

    /// Check field lengths.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_text("title", &self.title, TITLE_MAX_CHARS)?;
        validate_text("body", &self.body, BODY_MAX_CHARS)?;
        if let Some(tags) = &self.tags {
            validate_tags(tags)?;
        }
        Ok(())
    }

    /// Tags as stored: absent input becomes an empty list.
    pub fn stored_tags(&self) -> Vec<String> {
        self.tags.clone().unwrap_or_default()
    }
}

/// Partial update of a note. `None` leaves the field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct NoteUpdate {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, alias = "content")]
    pub body: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

impl NoteUpdate {
    pub fn has_any_updates(&self) -> bool {
        self.title.is_some() || self.body.is_some() || self.tags.is_some()
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.has_any_updates() {
            return Err(ValidationError::NoUpdates);
        }
        if let Some(title) = &self.title {
            validate_text("title", title, TITLE_MAX_CHARS)?;
        }
        if let Some(body) = &self.body {
            validate_text("body", body, BODY_MAX_CHARS)?;
        }
        if let Some(tags) = &self.tags {
            validate_tags(tags)?;
        }
        Ok(())
    }
}

fn validate_text(field: &str, value: &str, max: usize) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::RequiredFieldMissing {
            field: field.to_string(),
        });
    }
    let len = value.chars().count();
    if len > max {
        return Err(ValidationError::InvalidLength {
            field: field.to_string(),
            min: 1,
            max,
            actual: len,
        });
    }
    Ok(())
}

fn validate_tags(tags: &[String]) -> Result<(), ValidationError> {
    for (index, tag) in tags.iter().enumerate() {
        let len = tag.chars().count();
        if len == 0 || len > TAG_MAX_CHARS {
            return Err(ValidationError::InvalidLength {
                field: format!("tags[{}]", index),
                min: 1,
                max: TAG_MAX_CHARS,
                actual: len,
            });
        }
    }
    Ok(())
}

// ============================================================================
// TESTS
// ============================================================================
