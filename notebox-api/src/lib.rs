//! Notebox API - HTTP Layer
//!
//! Axum server exposing notes over REST. Notes persist in PostgreSQL (or in
//! memory); a key-value store provides the record cache, per-client rate
//! limiting and recently viewed lists, all of which degrade silently when
//! the store is unavailable.

pub mod config;
pub mod constants;
pub mod db;
pub mod error;
pub mod macros;
pub mod middleware;
#[cfg(feature = "openapi")]
pub mod openapi;
pub mod routes;
pub mod services;
pub mod state;
pub mod telemetry;

// Re-export commonly used types
pub use config::{ApiConfig, StorageBackend};
pub use db::{DbConfig, PgNoteRepository};
pub use error::{ApiError, ApiResult, ErrorCode};
pub use middleware::{rate_limit_middleware, ClientIdentity, RateLimitState};
#[cfg(feature = "openapi")]
pub use openapi::ApiDoc;
pub use routes::create_api_router;
pub use services::NoteService;
pub use state::AppState;
