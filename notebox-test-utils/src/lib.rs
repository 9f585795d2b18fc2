//! Notebox Test Utilities
//!
//! Shared test infrastructure for the Notebox workspace:
//! - Proptest generators for notes, inputs and client identities
//! - Fixtures for common scenarios
//! - Assertions for note listings and error results

pub use notebox_core::{
    ClientId, NewNote, Note, NoteFilter, NoteId, NoteUpdate, NoteboxError, NoteboxResult,
    StorageError, Timestamp, ValidationError, BODY_MAX_CHARS, TAG_MAX_CHARS, TITLE_MAX_CHARS,
};

use chrono::Utc;

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for Notebox types.

    use super::*;
    use proptest::prelude::*;

    /// A positive note id.
    pub fn arb_note_id() -> impl Strategy<Value = NoteId> {
        1i64..1_000_000
    }

    /// A timestamp between 2020 and 2030.
    pub fn arb_timestamp() -> impl Strategy<Value = Timestamp> {
        (1577836800i64..1893456000i64).prop_map(|secs| {
            chrono::DateTime::from_timestamp(secs, 0).unwrap_or_else(Utc::now)
        })
    }

    /// A client identity shaped like an IPv4 address.
    pub fn arb_client_id() -> impl Strategy<Value = ClientId> {
        any::<[u8; 4]>().prop_map(|o| ClientId::new(format!("{}.{}.{}.{}", o[0], o[1], o[2], o[3])))
    }

    /// A title within the length limit, never blank.
    pub fn arb_title() -> impl Strategy<Value = String> {
        "[A-Za-z0-9][A-Za-z0-9 ]{0,99}"
    }

    /// A body within the length limit, never blank.
    pub fn arb_body() -> impl Strategy<Value = String> {
        "[a-z][a-z .,\n]{0,400}"
    }

    pub fn arb_tag() -> impl Strategy<Value = String> {
        "[a-z][a-z0-9-]{0,29}"
    }

    pub fn arb_tags() -> impl Strategy<Value = Vec<String>> {
        prop::collection::vec(arb_tag(), 0..6)
    }

    /// A creation payload that passes validation.
    pub fn arb_new_note() -> impl Strategy<Value = NewNote> {
        (arb_title(), arb_body(), prop::option::of(arb_tags())).prop_map(|(title, body, tags)| {
            NewNote { title, body, tags }
        })
    }

    /// A stored, live note.
    pub fn arb_note() -> impl Strategy<Value = Note> {
        (arb_note_id(), arb_new_note(), arb_timestamp()).prop_map(|(id, input, created_at)| Note {
            id,
            tags: input.stored_tags(),
            title: input.title,
            body: input.body,
            created_at,
            updated_at: created_at,
            is_deleted: false,
            deleted_at: None,
        })
    }

    /// A sequence of viewed note ids drawn from a small pool so that repeats
    /// are common.
    pub fn arb_view_sequence(max_len: usize) -> impl Strategy<Value = Vec<NoteId>> {
        prop::collection::vec(1i64..12, 0..max_len)
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built values for common testing scenarios.

    use super::*;

    /// A live note with fixed content.
    pub fn note(id: NoteId) -> Note {
        let now = Utc::now();
        Note {
            id,
            title: format!("Note {}", id),
            body: "Remember the milk".to_string(),
            tags: vec!["home".to_string()],
            created_at: now,
            updated_at: now,
            is_deleted: false,
            deleted_at: None,
        }
    }

    /// A soft-deleted note.
    pub fn deleted_note(id: NoteId) -> Note {
        let mut n = note(id);
        n.mark_deleted(Utc::now());
        n
    }

    pub fn new_note(title: &str) -> NewNote {
        NewNote::new(title, "Body text").with_tags(["test"])
    }

    pub fn client(ip: &str) -> ClientId {
        ClientId::new(ip)
    }
}

// ============================================================================
// ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertions for Notebox-specific validation.

    use super::*;

    /// Assert that a NoteboxResult is Ok.
    #[track_caller]
    pub fn assert_ok<T: std::fmt::Debug>(result: &NoteboxResult<T>) {
        assert!(result.is_ok(), "Expected Ok, got Err: {:?}", result);
    }

    /// Assert that a NoteboxResult is a validation error.
    #[track_caller]
    pub fn assert_validation_error<T: std::fmt::Debug>(result: &NoteboxResult<T>) {
        match result {
            Err(NoteboxError::Validation(_)) => {}
            other => panic!("Expected Validation error, got: {:?}", other),
        }
    }

    /// Assert that a NoteboxResult is a NotFound storage error for `id`.
    #[track_caller]
    pub fn assert_not_found<T: std::fmt::Debug>(result: &NoteboxResult<T>, id: NoteId) {
        match result {
            Err(NoteboxError::Storage(StorageError::NotFound { id: got })) => {
                assert_eq!(*got, id, "Wrong id in NotFound error");
            }
            other => panic!("Expected NotFound error for {}, got: {:?}", id, other),
        }
    }

    /// Assert that notes are ordered newest first, ties by id descending.
    #[track_caller]
    pub fn assert_newest_first(notes: &[Note]) {
        for pair in notes.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            let ordered = a.created_at > b.created_at || (a.created_at == b.created_at && a.id > b.id);
            assert!(ordered, "Notes {} and {} are out of order", a.id, b.id);
        }
    }

    /// Assert that a recent list has no duplicates and respects `max_len`.
    #[track_caller]
    pub fn assert_recent_list_bounded(ids: &[NoteId], max_len: usize) {
        assert!(ids.len() <= max_len, "Recent list has {} entries, max {}", ids.len(), max_len);
        let mut seen = std::collections::HashSet::new();
        for id in ids {
            assert!(seen.insert(id), "Recent list contains {} twice", id);
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
