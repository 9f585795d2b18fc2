//! Note REST API Routes
//!
//! Axum route handlers for note operations. Handlers are thin: validation,
//! persistence and the key-value features live in [`NoteService`].

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Extension, Json, Router,
};
use notebox_core::{NewNote, Note, NoteFilter, NoteId, NoteUpdate};
use serde::{Deserialize, Serialize};

use crate::error::ApiResult;
#[cfg(feature = "openapi")]
use crate::error::ApiError;
use crate::middleware::ClientIdentity;
use crate::services::NoteService;
use crate::state::AppState;

// ============================================================================
// REQUEST / RESPONSE TYPES
// ============================================================================

/// Response for listing notes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ListNotesResponse {
    pub total: usize,
    pub items: Vec<Note>,
}

impl From<Vec<Note>> for ListNotesResponse {
    fn from(items: Vec<Note>) -> Self {
        Self {
            total: items.len(),
            items,
        }
    }
}

fn default_use_cache() -> bool {
    true
}

/// Query parameters for fetching one note.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::IntoParams))]
#[cfg_attr(feature = "openapi", into_params(parameter_in = Query))]
pub struct GetNoteParams {
    /// Consult the record cache before the database.
    #[serde(default = "default_use_cache")]
    pub use_cache: bool,
    /// Return the note even if it was soft-deleted.
    #[serde(default)]
    pub include_deleted: bool,
}

impl Default for GetNoteParams {
    fn default() -> Self {
        Self {
            use_cache: true,
            include_deleted: false,
        }
    }
}

// ============================================================================
// ROUTE HANDLERS
// ============================================================================

/// POST /notes - Create a new note
#[cfg_attr(feature = "openapi", utoipa::path(
    post,
    path = "/notes",
    tag = "Notes",
    request_body = NewNote,
    responses(
        (status = 201, description = "Note created successfully", body = Note),
        (status = 400, description = "Invalid request", body = ApiError),
        (status = 429, description = "Rate limit exceeded", body = ApiError),
    ),
))]
pub async fn create_note(
    State(notes): State<NoteService>,
    Json(req): Json<NewNote>,
) -> ApiResult<impl IntoResponse> {
    let note = notes.create(req).await?;
    Ok((StatusCode::CREATED, Json(note)))
}

/// GET /notes - List notes with filters
#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/notes",
    tag = "Notes",
    params(NoteFilter),
    responses(
        (status = 200, description = "List of notes, newest first", body = ListNotesResponse),
        (status = 429, description = "Rate limit exceeded", body = ApiError),
    ),
))]
pub async fn list_notes(
    State(notes): State<NoteService>,
    Query(filter): Query<NoteFilter>,
) -> ApiResult<impl IntoResponse> {
    let items = notes.list(&filter).await?;
    Ok(Json(ListNotesResponse::from(items)))
}

/// GET /notes/recent - The caller's recently viewed notes
#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/notes/recent",
    tag = "Notes",
    responses(
        (status = 200, description = "Recently viewed notes, most recent first", body = Vec<Note>),
        (status = 429, description = "Rate limit exceeded", body = ApiError),
    ),
))]
pub async fn recent_notes(
    State(notes): State<NoteService>,
    identity: Option<Extension<ClientIdentity>>,
) -> ApiResult<impl IntoResponse> {
    let client = identity.and_then(|Extension(identity)| identity.0);
    let items = notes.recent(client.as_ref()).await?;
    Ok(Json(items))
}

/// GET /notes/{id} - Get a note by ID
#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/notes/{id}",
    tag = "Notes",
    params(
        ("id" = i64, Path, description = "Note ID"),
        GetNoteParams,
    ),
    responses(
        (status = 200, description = "Note details", body = Note),
        (status = 404, description = "Note not found", body = ApiError),
        (status = 429, description = "Rate limit exceeded", body = ApiError),
    ),
))]
pub async fn get_note(
    State(notes): State<NoteService>,
    Path(id): Path<NoteId>,
    Query(params): Query<GetNoteParams>,
    identity: Option<Extension<ClientIdentity>>,
) -> ApiResult<impl IntoResponse> {
    let client = identity.and_then(|Extension(identity)| identity.0);
    let note = notes
        .get(id, client.as_ref(), params.use_cache, params.include_deleted)
        .await?;
    Ok(Json(note))
}

/// PATCH /notes/{id} - Update a note
#[cfg_attr(feature = "openapi", utoipa::path(
    patch,
    path = "/notes/{id}",
    tag = "Notes",
    params(
        ("id" = i64, Path, description = "Note ID")
    ),
    request_body = NoteUpdate,
    responses(
        (status = 200, description = "Note updated successfully", body = Note),
        (status = 400, description = "Invalid request", body = ApiError),
        (status = 404, description = "Note not found", body = ApiError),
        (status = 429, description = "Rate limit exceeded", body = ApiError),
    ),
))]
pub async fn update_note(
    State(notes): State<NoteService>,
    Path(id): Path<NoteId>,
    Json(req): Json<NoteUpdate>,
) -> ApiResult<impl IntoResponse> {
    let note = notes.update(id, req).await?;
    Ok(Json(note))
}

/// DELETE /notes/{id} - Soft-delete a note
#[cfg_attr(feature = "openapi", utoipa::path(
    delete,
    path = "/notes/{id}",
    tag = "Notes",
    params(
        ("id" = i64, Path, description = "Note ID")
    ),
    responses(
        (status = 200, description = "Note deleted; the deleted note is returned", body = Note),
        (status = 404, description = "Note not found or already deleted", body = ApiError),
        (status = 429, description = "Rate limit exceeded", body = ApiError),
    ),
))]
pub async fn delete_note(
    State(notes): State<NoteService>,
    Path(id): Path<NoteId>,
) -> ApiResult<impl IntoResponse> {
    let note = notes.delete(id).await?;
    Ok(Json(note))
}

// ============================================================================
// ROUTER
// ============================================================================

/// Create the note router.
pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_notes).post(create_note))
        .route("/recent", get(recent_notes))
        .route("/:id", get(get_note).patch(update_note).delete(delete_note))
}
