//! API Configuration Module
//!
//! Configuration for binding, CORS, rate limiting and storage selection.
//! Loaded from environment variables with sensible defaults for development.

use std::net::SocketAddr;

use crate::constants::{DEFAULT_BIND_HOST, DEFAULT_CORS_MAX_AGE_SECS, DEFAULT_PORT};
use crate::error::{ApiError, ApiResult};

// ============================================================================
// STORAGE BACKEND
// ============================================================================

/// Where notes are persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StorageBackend {
    /// PostgreSQL through the connection pool.
    #[default]
    Postgres,
    /// Process memory; lost on restart.
    Memory,
}

impl StorageBackend {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "postgres" | "postgresql" | "pg" => Some(Self::Postgres),
            "memory" | "mem" | "in-memory" => Some(Self::Memory),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Postgres => "postgres",
            Self::Memory => "memory",
        }
    }
}

// ============================================================================
// API CONFIGURATION
// ============================================================================

/// API configuration for binding, CORS and request protection.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Host to bind to.
    pub bind_host: String,

    /// Port to listen on.
    pub port: u16,

    // ========================================================================
    // CORS Configuration
    // ========================================================================
    /// Allowed CORS origins (comma-separated in env var).
    /// Empty means allow all origins (dev mode).
    pub cors_origins: Vec<String>,

    /// Max age for CORS preflight cache in seconds.
    pub cors_max_age_secs: u64,

    // ========================================================================
    // Rate Limiting Configuration
    // ========================================================================
    /// Whether the per-client rate limiter guards `/notes`.
    pub rate_limit_enabled: bool,

    /// Honor `X-Forwarded-For` / `X-Real-IP` when resolving the client.
    /// Only safe behind a proxy that overwrites them.
    pub trust_proxy_headers: bool,

    // ========================================================================
    // Storage
    // ========================================================================
    pub storage: StorageBackend,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_host: DEFAULT_BIND_HOST.to_string(),
            port: DEFAULT_PORT,
            cors_origins: Vec::new(),
            cors_max_age_secs: DEFAULT_CORS_MAX_AGE_SECS,
            rate_limit_enabled: true,
            trust_proxy_headers: false,
            storage: StorageBackend::Postgres,
        }
    }
}

impl ApiConfig {
    /// Create ApiConfig from environment variables.
    ///
    /// Environment variables:
    /// - `NOTEBOX_API_BIND`: Host to bind (default: 0.0.0.0)
    /// - `PORT` or `NOTEBOX_API_PORT`: Port (default: 3000)
    /// - `NOTEBOX_CORS_ORIGINS`: Comma-separated allowed origins (empty = allow all)
    /// - `NOTEBOX_CORS_MAX_AGE_SECS`: Preflight cache duration (default: 86400)
    /// - `NOTEBOX_RATE_LIMIT_ENABLED`: "true" or "false" (default: true)
    /// - `NOTEBOX_TRUST_PROXY_HEADERS`: "true" or "false" (default: false)
    /// - `NOTEBOX_STORAGE`: "postgres" or "memory" (default: postgres)
    pub fn from_env() -> ApiResult<Self> {
        let bind_host =
            std::env::var("NOTEBOX_API_BIND").unwrap_or_else(|_| DEFAULT_BIND_HOST.to_string());

        let port = match std::env::var("PORT")
            .ok()
            .or_else(|| std::env::var("NOTEBOX_API_PORT").ok())
        {
            Some(raw) => raw
                .parse::<u16>()
                .map_err(|_| ApiError::invalid_input(format!("Invalid port value: {}", raw)))?,
            None => DEFAULT_PORT,
        };

        let cors_origins = std::env::var("NOTEBOX_CORS_ORIGINS")
            .ok()
            .map(|s| {
                s.split(',')
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let cors_max_age_secs = std::env::var("NOTEBOX_CORS_MAX_AGE_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_CORS_MAX_AGE_SECS);

        let rate_limit_enabled = std::env::var("NOTEBOX_RATE_LIMIT_ENABLED")
            .ok()
            .map(|s| s.to_lowercase() != "false")
            .unwrap_or(true);

        let trust_proxy_headers = std::env::var("NOTEBOX_TRUST_PROXY_HEADERS")
            .ok()
            .map(|s| s.to_lowercase() == "true")
            .unwrap_or(false);

        let storage = match std::env::var("NOTEBOX_STORAGE") {
            Ok(raw) => StorageBackend::parse(&raw).ok_or_else(|| {
                ApiError::invalid_input(format!("Unknown storage backend: {}", raw))
            })?,
            Err(_) => StorageBackend::default(),
        };

        Ok(Self {
            bind_host,
            port,
            cors_origins,
            cors_max_age_secs,
            rate_limit_enabled,
            trust_proxy_headers,
            storage,
        })
    }

    /// Socket address to listen on.
    pub fn bind_addr(&self) -> ApiResult<SocketAddr> {
        let addr = format!("{}:{}", self.bind_host, self.port);
        addr.parse::<SocketAddr>()
            .map_err(|e| ApiError::invalid_input(format!("Invalid bind address {}: {}", addr, e)))
    }

    /// Check if a given origin is allowed.
    pub fn is_origin_allowed(&self, origin: &str) -> bool {
        // Dev mode: allow all
        self.cors_origins.is_empty() || self.cors_origins.iter().any(|allowed| allowed == origin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ApiConfig::default();
        assert!(config.cors_origins.is_empty());
        assert!(config.rate_limit_enabled);
        assert!(!config.trust_proxy_headers);
        assert_eq!(config.storage, StorageBackend::Postgres);
        assert_eq!(config.port, 3000);
    }

    #[test]
    fn test_bind_addr() -> Result<(), String> {
        let config = ApiConfig {
            bind_host: "127.0.0.1".to_string(),
            port: 8080,
            ..Default::default()
        };
        let addr = config.bind_addr().map_err(|e| e.to_string())?;
        assert_eq!(addr.port(), 8080);

        let bad = ApiConfig {
            bind_host: "not a host".to_string(),
            ..Default::default()
        };
        assert!(bad.bind_addr().is_err());
        Ok(())
    }

    #[test]
    fn test_storage_backend_parse() {
        assert_eq!(StorageBackend::parse("Memory"), Some(StorageBackend::Memory));
        assert_eq!(StorageBackend::parse("postgresql"), Some(StorageBackend::Postgres));
        assert_eq!(StorageBackend::parse("sqlite"), None);
    }

    #[test]
    fn test_origin_allowed() {
        let mut config = ApiConfig::default();
        assert!(config.is_origin_allowed("https://anything.com"));

        config.cors_origins = vec!["https://notes.example.com".to_string()];
        assert!(config.is_origin_allowed("https://notes.example.com"));
        assert!(!config.is_origin_allowed("https://evil.com"));
    }
}
