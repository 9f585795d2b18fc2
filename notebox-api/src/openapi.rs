//! OpenAPI Specification for Notebox API
//!
//! Generated with utoipa from the route annotations and the schema derives
//! on the core types.

use utoipa::OpenApi;

use crate::error::{ApiError, ErrorCode};
use crate::routes::health::{ComponentHealth, HealthDetails, HealthResponse, HealthStatus};
use crate::routes::note::ListNotesResponse;
use crate::routes::{health, note};
use crate::telemetry::metrics;
use notebox_core::{NewNote, Note, NoteUpdate};

/// OpenAPI document for Notebox API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Notebox API",
        description = "Notes with a Redis-backed cache, rate limiter and recently viewed list",
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    servers(
        (url = "http://localhost:3000", description = "Local Development")
    ),
    tags(
        (name = "Notes", description = "Note CRUD and recently viewed notes"),
        (name = "Health", description = "Liveness and readiness probes"),
        (name = "Observability", description = "Prometheus metrics")
    ),
    paths(
        note::create_note,
        note::list_notes,
        note::recent_notes,
        note::get_note,
        note::update_note,
        note::delete_note,
        health::ping,
        health::liveness,
        health::readiness,
        metrics::metrics_handler,
    ),
    components(
        schemas(
            ApiError, ErrorCode,
            Note, NewNote, NoteUpdate, ListNotesResponse,
            HealthResponse, HealthStatus, HealthDetails, ComponentHealth,
        )
    )
)]
pub struct ApiDoc;

impl ApiDoc {
    /// Generate OpenAPI spec as JSON string.
    pub fn to_json() -> Result<String, serde_json::Error> {
        let openapi = Self::openapi();
        serde_json::to_string_pretty(&openapi)
    }
}
