//! Note Service
//!
//! Coordinates the note repository, the record cache and the recently
//! viewed tracker. Key-value failures never surface from here; only
//! persistence and validation errors do.

use std::sync::Arc;

use notebox_core::{ClientId, NewNote, Note, NoteFilter, NoteId, NoteUpdate};
use notebox_storage::{NoteRepository, RecentItemsTracker, RecordCache};
use tracing::{debug, info};

use crate::error::{ApiError, ApiResult};
use crate::telemetry::metrics;

/// Note operations shared by all handlers.
#[derive(Clone)]
pub struct NoteService {
    repo: Arc<dyn NoteRepository>,
    cache: RecordCache,
    recent: RecentItemsTracker,
}

impl NoteService {
    pub fn new(repo: Arc<dyn NoteRepository>, cache: RecordCache, recent: RecentItemsTracker) -> Self {
        Self {
            repo,
            cache,
            recent,
        }
    }

    pub fn repository(&self) -> &Arc<dyn NoteRepository> {
        &self.repo
    }

    /// Validate, persist and cache a new note.
    pub async fn create(&self, input: NewNote) -> ApiResult<Note> {
        input.validate()?;
        let note = self.repo.create(input).await?;
        self.cache.put(&note).await;
        info!(note_id = note.id, "Note created");
        Ok(note)
    }

    /// Fetch one note.
    ///
    /// With `use_cache` the record cache is consulted first; a cached note
    /// that is deleted counts as a miss unless `include_deleted` is set. On a
    /// miss the repository is read and the result cached. A non-deleted
    /// note is pushed onto the caller's recently viewed list when the caller
    /// is known.
    pub async fn get(
        &self,
        id: NoteId,
        client: Option<&ClientId>,
        use_cache: bool,
        include_deleted: bool,
    ) -> ApiResult<Note> {
        let cached = if use_cache {
            let lookup = self.cache.lookup(id).await;
            metrics::record_cache_lookup(lookup.label());
            lookup
                .into_note()
                .filter(|note| note.is_visible(include_deleted))
        } else {
            None
        };

        let note = match cached {
            Some(note) => {
                debug!(note_id = id, "Served note from cache");
                note
            }
            None => {
                let note = self
                    .repo
                    .get(id, include_deleted)
                    .await?
                    .ok_or_else(|| ApiError::note_not_found(id))?;
                self.cache.put(&note).await;
                note
            }
        };

        if !note.is_deleted {
            if let Some(client) = client {
                self.recent.push(client, note.id).await;
            }
        }

        Ok(note)
    }

    /// List notes straight from the repository, newest first.
    pub async fn list(&self, filter: &NoteFilter) -> ApiResult<Vec<Note>> {
        Ok(self.repo.list(filter).await?)
    }

    /// The caller's recently viewed notes, most recent first.
    ///
    /// Ids whose notes are gone or deleted are skipped. Reading this list
    /// does not itself count as a view.
    pub async fn recent(&self, client: Option<&ClientId>) -> ApiResult<Vec<Note>> {
        let Some(client) = client else {
            return Ok(Vec::new());
        };

        let ids = self.recent.list(client).await;
        let mut notes = Vec::with_capacity(ids.len());
        for id in ids {
            let lookup = self.cache.lookup(id).await;
            metrics::record_cache_lookup(lookup.label());
            let cached = lookup.into_note().filter(|note| !note.is_deleted);

            let note = match cached {
                Some(note) => Some(note),
                None => {
                    let fetched = self.repo.get(id, false).await?;
                    if let Some(note) = &fetched {
                        self.cache.put(note).await;
                    }
                    fetched
                }
            };
            notes.extend(note);
        }
        Ok(notes)
    }

    /// Apply a partial update. The cached copy is dropped rather than
    /// rewritten.
    pub async fn update(&self, id: NoteId, update: NoteUpdate) -> ApiResult<Note> {
        update.validate()?;
        let note = self
            .repo
            .update(id, update)
            .await?
            .ok_or_else(|| ApiError::note_not_found(id))?;
        self.cache.invalidate(id).await;
        info!(note_id = id, "Note updated");
        Ok(note)
    }

    /// Soft-delete a visible note and drop its cached copy.
    pub async fn delete(&self, id: NoteId) -> ApiResult<Note> {
        let existing = self
            .repo
            .get(id, false)
            .await?
            .ok_or_else(|| ApiError::note_not_found(id))?;
        let deleted = self.repo.soft_delete(existing).await?;
        self.cache.invalidate(id).await;
        info!(note_id = id, "Note deleted");
        Ok(deleted)
    }
}

// =============================================================================
// TESTS
// =============================================================================
