//! Note persistence.
//!
//! The repository is the authority for notes; the key-value layer only ever
//! holds copies. The PostgreSQL implementation lives in the API crate next to
//! its connection pool.

use std::collections::BTreeMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;
use notebox_core::{
    NewNote, Note, NoteFilter, NoteId, NoteUpdate, NoteboxResult, StorageError,
};

/// Async persistence for notes.
#[async_trait]
pub trait NoteRepository: Send + Sync {
    /// Backend name for logs and health output.
    fn backend(&self) -> &'static str;

    /// Insert a note, assigning its id and timestamps.
    async fn create(&self, input: NewNote) -> NoteboxResult<Note>;

    /// Fetch one note. Soft-deleted notes are returned only when asked for.
    async fn get(&self, id: NoteId, include_deleted: bool) -> NoteboxResult<Option<Note>>;

    /// Notes matching `filter`, newest first (ties broken by id, descending).
    async fn list(&self, filter: &NoteFilter) -> NoteboxResult<Vec<Note>>;

    /// Apply a partial update to a live note. `None` if absent or deleted.
    async fn update(&self, id: NoteId, update: NoteUpdate) -> NoteboxResult<Option<Note>>;

    /// Mark a note deleted and return the stored result. Rows are never removed.
    async fn soft_delete(&self, note: Note) -> NoteboxResult<Note>;

    /// Readiness probe.
    async fn ping(&self) -> NoteboxResult<()>;
}

// ============================================================================
// IN-MEMORY REPOSITORY
// ============================================================================

#[derive(Debug, Default)]
struct Inner {
    next_id: NoteId,
    notes: BTreeMap<NoteId, Note>,
}

/// Repository held in process memory. Used by tests and the `memory`
/// storage backend.
#[derive(Debug, Default)]
pub struct InMemoryNoteRepository {
    inner: RwLock<Inner>,
}

impl InMemoryNoteRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored notes, deleted ones included.
    pub fn note_count(&self) -> usize {
        self.inner.read().map(|inner| inner.notes.len()).unwrap_or(0)
    }
}

#[async_trait]
impl NoteRepository for InMemoryNoteRepository {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn create(&self, input: NewNote) -> NoteboxResult<Note> {
        let mut inner = self.inner.write().map_err(|_| StorageError::LockPoisoned)?;
        inner.next_id += 1;
        let now = Utc::now();
        let note = Note {
            id: inner.next_id,
            tags: input.stored_tags(),
            title: input.title,
            body: input.body,
            created_at: now,
            updated_at: now,
            is_deleted: false,
            deleted_at: None,
        };
        inner.notes.insert(note.id, note.clone());
        Ok(note)
    }

    async fn get(&self, id: NoteId, include_deleted: bool) -> NoteboxResult<Option<Note>> {
        let inner = self.inner.read().map_err(|_| StorageError::LockPoisoned)?;
        Ok(inner
            .notes
            .get(&id)
            .filter(|n| n.is_visible(include_deleted))
            .cloned())
    }

    async fn list(&self, filter: &NoteFilter) -> NoteboxResult<Vec<Note>> {
        let inner = self.inner.read().map_err(|_| StorageError::LockPoisoned)?;
        let mut notes: Vec<Note> = inner
            .notes
            .values()
            .filter(|n| filter.matches(n))
            .cloned()
            .collect();
        notes.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(notes)
    }

    async fn update(&self, id: NoteId, update: NoteUpdate) -> NoteboxResult<Option<Note>> {
        let mut inner = self.inner.write().map_err(|_| StorageError::LockPoisoned)?;
        match inner.notes.get_mut(&id).filter(|n| !n.is_deleted) {
            Some(note) => {
                note.apply(update, Utc::now());
                Ok(Some(note.clone()))
            }
            None => Ok(None),
        }
    }

    async fn soft_delete(&self, note: Note) -> NoteboxResult<Note> {
        let mut inner = self.inner.write().map_err(|_| StorageError::LockPoisoned)?;
        let stored = inner
            .notes
            .get_mut(&note.id)
            .ok_or(StorageError::NotFound { id: note.id })?;
        if !stored.is_deleted {
            stored.mark_deleted(Utc::now());
        }
        Ok(stored.clone())
    }

    async fn ping(&self) -> NoteboxResult<()> {
        self.inner
            .read()
            .map(|_| ())
            .map_err(|_| StorageError::LockPoisoned.into())
    }
}
