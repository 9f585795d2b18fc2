//! Client identity and rate limiting middleware.

use std::net::{IpAddr, SocketAddr};

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use notebox_core::ClientId;
use notebox_storage::{RateDecision, RateLimiter};
use tracing::debug;

use crate::constants::{MIN_RETRY_AFTER_SECS, RATE_LIMIT_LIMIT_HEADER, RATE_LIMIT_REMAINING_HEADER};
use crate::error::ApiError;
use crate::telemetry::metrics;

// ============================================================================
// CLIENT IDENTITY
// ============================================================================

/// Identity of the caller, inserted into request extensions.
///
/// `None` when the peer address could not be determined; such callers share
/// the `unknown` rate-limit bucket and have no recently viewed list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIdentity(pub Option<ClientId>);

impl ClientIdentity {
    pub fn known(&self) -> Option<&ClientId> {
        self.0.as_ref()
    }

    /// Key used for rate limiting.
    pub fn rate_limit_id(&self) -> ClientId {
        self.0.clone().unwrap_or_else(ClientId::unknown)
    }
}

fn header_ip(headers: &HeaderMap) -> Option<IpAddr> {
    // X-Forwarded-For can contain multiple IPs; the first is the client
    if let Some(forwarded_for) = headers.get("x-forwarded-for").and_then(|h| h.to_str().ok()) {
        if let Some(ip) = forwarded_for
            .split(',')
            .next()
            .and_then(|first| first.trim().parse().ok())
        {
            return Some(ip);
        }
    }

    headers
        .get("x-real-ip")
        .and_then(|h| h.to_str().ok())
        .and_then(|real_ip| real_ip.trim().parse().ok())
}

/// Resolve the caller of `request`.
///
/// Proxy headers are consulted only when `trust_proxy_headers` is set;
/// otherwise the socket peer address is authoritative.
pub fn resolve_client(request: &Request, trust_proxy_headers: bool) -> ClientIdentity {
    if trust_proxy_headers {
        if let Some(ip) = header_ip(request.headers()) {
            return ClientIdentity(Some(ClientId::from(ip)));
        }
    }

    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| ClientId::from(addr.ip()));
    ClientIdentity(peer)
}

// ============================================================================
// RATE LIMITING
// ============================================================================

/// State for the rate limit middleware.
#[derive(Debug, Clone)]
pub struct RateLimitState {
    pub limiter: RateLimiter,
    pub enabled: bool,
    pub trust_proxy_headers: bool,
}

impl RateLimitState {
    pub fn new(limiter: RateLimiter, enabled: bool, trust_proxy_headers: bool) -> Self {
        Self {
            limiter,
            enabled,
            trust_proxy_headers,
        }
    }
}

/// Error type for rate limit middleware.
#[derive(Debug)]
pub struct RateLimitError {
    /// Seconds until the window resets
    pub retry_after: u64,
    pub limit: u64,
}

impl IntoResponse for RateLimitError {
    fn into_response(self) -> Response {
        let error = ApiError::too_many_requests(Some(self.retry_after));

        let mut response = (StatusCode::TOO_MANY_REQUESTS, axum::Json(error)).into_response();
        let headers = response.headers_mut();
        headers.insert(header::RETRY_AFTER, HeaderValue::from(self.retry_after));
        headers.insert(
            HeaderName::from_static(RATE_LIMIT_LIMIT_HEADER),
            HeaderValue::from(self.limit),
        );
        headers.insert(
            HeaderName::from_static(RATE_LIMIT_REMAINING_HEADER),
            HeaderValue::from(0u64),
        );

        response
    }
}

/// Rate limiting middleware.
///
/// Resolves the caller, stores a [`ClientIdentity`] in the request
/// extensions and, when enabled, counts the request against the caller's
/// fixed window. Over the limit it returns 429 with `Retry-After`. When the
/// key-value store is unavailable the request proceeds unchecked.
pub async fn rate_limit_middleware(
    State(state): State<RateLimitState>,
    mut request: Request,
    next: Next,
) -> Result<Response, RateLimitError> {
    let identity = resolve_client(&request, state.trust_proxy_headers);
    let rate_id = identity.rate_limit_id();
    request.extensions_mut().insert(identity);

    // Skip if rate limiting is disabled
    if !state.enabled {
        return Ok(next.run(request).await);
    }

    let decision = state.limiter.check(&rate_id).await;
    metrics::record_rate_decision(decision.label());

    match decision {
        RateDecision::Limited {
            count,
            limit,
            retry_after,
        } => {
            let retry_after = retry_after.as_secs().max(MIN_RETRY_AFTER_SECS);
            debug!(client = %rate_id, count, limit, retry_after, "Rate limit exceeded");
            Err(RateLimitError { retry_after, limit })
        }
        allowed => {
            let mut response = next.run(request).await;
            let headers = response.headers_mut();
            headers.insert(
                HeaderName::from_static(RATE_LIMIT_LIMIT_HEADER),
                HeaderValue::from(state.limiter.max_requests()),
            );
            if let Some(remaining) = allowed.remaining() {
                headers.insert(
                    HeaderName::from_static(RATE_LIMIT_REMAINING_HEADER),
                    HeaderValue::from(remaining),
                );
            }
            Ok(response)
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, middleware, routing::get, Extension, Router};
    use notebox_storage::{KvClient, MemoryStore};
    use std::sync::Arc;
    use std::time::Duration;
    use tower::ServiceExt; // for `oneshot`

    fn test_app(max: u64, enabled: bool, trust: bool) -> (Router, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let limiter = RateLimiter::new(KvClient::new(store.clone()), max, Duration::from_secs(60));
        let state = RateLimitState::new(limiter, enabled, trust);

        let app = Router::new()
            .route(
                "/whoami",
                get(|Extension(identity): Extension<ClientIdentity>| async move {
                    identity
                        .known()
                        .map(|c| c.to_string())
                        .unwrap_or_else(|| "none".to_string())
                }),
            )
            .layer(middleware::from_fn_with_state(state, rate_limit_middleware));
        (app, store)
    }

    fn request_from(ip: &str) -> Result<Request, String> {
        let addr: SocketAddr = format!("{}:40000", ip).parse().map_err(|e| format!("{:?}", e))?;
        Request::builder()
            .uri("/whoami")
            .extension(ConnectInfo(addr))
            .body(Body::empty())
            .map_err(|e| e.to_string())
    }

    async fn body_text(response: Response) -> Result<String, String> {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .map_err(|e| e.to_string())?;
        String::from_utf8(bytes.to_vec()).map_err(|e| e.to_string())
    }

    #[tokio::test]
    async fn test_allowed_requests_carry_headers() -> Result<(), String> {
        let (app, _) = test_app(5, true, false);
        let response = app
            .oneshot(request_from("10.0.0.1")?)
            .await
            .map_err(|e| format!("Request failed: {:?}", e))?;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(RATE_LIMIT_LIMIT_HEADER),
            Some(&HeaderValue::from(5u64))
        );
        assert_eq!(
            response.headers().get(RATE_LIMIT_REMAINING_HEADER),
            Some(&HeaderValue::from(4u64))
        );
        assert_eq!(body_text(response).await?, "10.0.0.1");
        Ok(())
    }

    #[tokio::test]
    async fn test_over_limit_returns_429() -> Result<(), String> {
        let (app, _) = test_app(1, true, false);
        let first = app
            .clone()
            .oneshot(request_from("10.0.0.2")?)
            .await
            .map_err(|e| format!("Request failed: {:?}", e))?;
        assert_eq!(first.status(), StatusCode::OK);

        let second = app
            .oneshot(request_from("10.0.0.2")?)
            .await
            .map_err(|e| format!("Request failed: {:?}", e))?;
        assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);

        let retry_after: u64 = second
            .headers()
            .get(header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok())
            .ok_or("missing Retry-After")?;
        assert!((1..=60).contains(&retry_after));

        let body = body_text(second).await?;
        assert!(body.contains("TOO_MANY_REQUESTS"));
        Ok(())
    }

    #[tokio::test]
    async fn test_store_outage_fails_open() -> Result<(), String> {
        let (app, store) = test_app(1, true, false);
        store.set_offline(true);
        for _ in 0..3 {
            let response = app
                .clone()
                .oneshot(request_from("10.0.0.3")?)
                .await
                .map_err(|e| format!("Request failed: {:?}", e))?;
            assert_eq!(response.status(), StatusCode::OK);
            assert!(response.headers().get(RATE_LIMIT_REMAINING_HEADER).is_none());
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_disabled_still_resolves_identity() -> Result<(), String> {
        let (app, store) = test_app(1, false, false);
        let response = app
            .oneshot(request_from("10.0.0.4")?)
            .await
            .map_err(|e| format!("Request failed: {:?}", e))?;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await?, "10.0.0.4");
        assert_eq!(store.command_count(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_proxy_headers_ignored_unless_trusted() -> Result<(), String> {
        let mut request = request_from("10.0.0.5")?;
        request
            .headers_mut()
            .insert("x-forwarded-for", HeaderValue::from_static("203.0.113.9, 10.0.0.5"));
        assert_eq!(
            resolve_client(&request, false),
            ClientIdentity(Some(ClientId::new("10.0.0.5")))
        );
        assert_eq!(
            resolve_client(&request, true),
            ClientIdentity(Some(ClientId::new("203.0.113.9")))
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_unknown_peer_shares_bucket() -> Result<(), String> {
        let (app, _) = test_app(1, true, false);
        let anonymous = || {
            Request::builder()
                .uri("/whoami")
                .body(Body::empty())
                .map_err(|e| e.to_string())
        };

        let first = app
            .clone()
            .oneshot(anonymous()?)
            .await
            .map_err(|e| format!("Request failed: {:?}", e))?;
        assert_eq!(body_text(first).await?, "none");

        let second = app
            .oneshot(anonymous()?)
            .await
            .map_err(|e| format!("Request failed: {:?}", e))?;
        assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
        Ok(())
    }
}
