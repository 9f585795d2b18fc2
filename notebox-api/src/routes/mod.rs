//! REST API Routes Module
//!
//! Includes:
//! - Note CRUD and recently viewed notes under /notes (rate limited)
//! - Health check endpoints (Kubernetes-compatible)
//! - Prometheus metrics at /metrics
//! - OpenAPI document at /openapi.json (with the `openapi` feature)
//! - CORS support for browser-based clients

pub mod health;
pub mod note;

use std::time::Duration;

use axum::{
    http::{header, header::HeaderName, HeaderValue, Method},
    middleware::{from_fn, from_fn_with_state},
    routing::get,
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::ApiConfig;
use crate::constants::{RATE_LIMIT_LIMIT_HEADER, RATE_LIMIT_REMAINING_HEADER};
use crate::middleware::rate_limit_middleware;
use crate::state::AppState;
use crate::telemetry::{metrics_handler, observability_middleware};

pub use health::create_router as health_router;
pub use note::create_router as note_router;

// ============================================================================
// OPENAPI ENDPOINT
// ============================================================================

/// Handler for /openapi.json endpoint.
#[cfg(feature = "openapi")]
async fn openapi_json() -> impl axum::response::IntoResponse {
    use utoipa::OpenApi;
    axum::Json(crate::openapi::ApiDoc::openapi())
}

// ============================================================================
// CORS LAYER
// ============================================================================

/// Build the CORS layer from ApiConfig.
///
/// In development mode (empty origins), allows all origins.
/// Otherwise only the configured origins are allowed.
fn build_cors_layer(config: &ApiConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .max_age(Duration::from_secs(config.cors_max_age_secs));

    if config.cors_origins.is_empty() {
        // Development mode: allow all origins
        tracing::info!("CORS: Development mode - allowing all origins");
        cors.allow_origin(Any).allow_headers(Any).expose_headers(Any)
    } else {
        tracing::info!(
            "CORS: Production mode - allowing origins: {:?}",
            config.cors_origins
        );
        let origins: Vec<HeaderValue> = config
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();

        cors.allow_origin(origins)
            .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
            .expose_headers([
                HeaderName::from_static(RATE_LIMIT_LIMIT_HEADER),
                HeaderName::from_static(RATE_LIMIT_REMAINING_HEADER),
                header::RETRY_AFTER,
            ])
    }
}

// ============================================================================
// ROUTER
// ============================================================================

/// Create the complete API router.
///
/// # Middleware Order (outer to inner)
/// 1. CORS - handles preflight requests
/// 2. HTTP trace layer
/// 3. Observability - span and metrics
/// 4. Rate limiting (only on /notes)
pub fn create_api_router(state: AppState) -> Router {
    let note_routes = note::create_router().layer(from_fn_with_state(
        state.rate_limit.clone(),
        rate_limit_middleware,
    ));

    #[allow(unused_mut)]
    let mut router = Router::new()
        .nest("/notes", note_routes)
        .nest("/health", health::create_router())
        .route("/metrics", get(metrics_handler));

    #[cfg(feature = "openapi")]
    {
        router = router.route("/openapi.json", get(openapi_json));
    }

    let cors = build_cors_layer(&state.config);

    // Applied innermost-first so each layer sees an axum `Body` (CORS requires
    // `ResBody: Default`); resulting order is CORS -> trace -> observability.
    router
        .layer(from_fn(observability_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
