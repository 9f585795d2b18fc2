//! Key-value layer configuration
//!
//! Settings consumed by the cache, rate limiter and recent-items tracker.
//! Loaded from environment variables with defaults suitable for development.

use std::time::Duration;

use crate::ConfigError;

/// Default key-value store address.
pub const DEFAULT_REDIS_URL: &str = "redis://localhost:6379/0";

/// Default per-command timeout in milliseconds.
pub const DEFAULT_COMMAND_TIMEOUT_MS: u64 = 250;

/// Default maximum number of requests per client per window.
pub const DEFAULT_RATE_LIMIT: u64 = 100;

/// Default rate-limit window in seconds.
pub const DEFAULT_RATE_LIMIT_WINDOW_SECS: u64 = 600;

/// Default cached note TTL in seconds.
pub const DEFAULT_NOTE_CACHE_TTL_SECS: u64 = 300;

/// Default length of a client's recently viewed list.
pub const DEFAULT_RECENT_NOTES_LIMIT: usize = 5;

/// Configuration for everything backed by the key-value store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KvConfig {
    /// Store address. `None` runs without a key-value store; every feature
    /// backed by it then behaves as if the store were unreachable.
    pub url: Option<String>,
    /// Upper bound on a single command or pipeline round trip.
    pub command_timeout: Duration,
    /// Maximum requests per client per window.
    pub rate_limit: u64,
    /// Length of a rate-limit window.
    pub rate_limit_window: Duration,
    /// Time-to-live of a cached note.
    pub cache_ttl: Duration,
    /// Maximum length of a recently viewed list.
    pub recent_limit: usize,
    /// Idle time after which a recently viewed list expires.
    pub recent_window: Duration,
}

impl Default for KvConfig {
    fn default() -> Self {
        Self {
            url: Some(DEFAULT_REDIS_URL.to_string()),
            command_timeout: Duration::from_millis(DEFAULT_COMMAND_TIMEOUT_MS),
            rate_limit: DEFAULT_RATE_LIMIT,
            rate_limit_window: Duration::from_secs(DEFAULT_RATE_LIMIT_WINDOW_SECS),
            cache_ttl: Duration::from_secs(DEFAULT_NOTE_CACHE_TTL_SECS),
            recent_limit: DEFAULT_RECENT_NOTES_LIMIT,
            recent_window: Duration::from_secs(DEFAULT_RATE_LIMIT_WINDOW_SECS),
        }
    }
}

impl KvConfig {
    /// Create KvConfig from environment variables.
    ///
    /// Environment variables:
    /// - `REDIS_URL`: store address; empty disables the store (default: redis://localhost:6379/0)
    /// - `REDIS_TIMEOUT_MS`: per-command timeout (default: 250)
    /// - `RATE_LIMIT`: requests per window per client (default: 100)
    /// - `RATE_LIMIT_WINDOW`: window length in seconds (default: 600)
    /// - `NOTE_CACHE_TTL`: cached note TTL in seconds (default: 300)
    /// - `RECENT_NOTES_LIMIT`: recent list length (default: 5)
    /// - `RECENT_NOTES_WINDOW`: recent list expiry in seconds (default: `RATE_LIMIT_WINDOW`)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Unset keys fall back to defaults;
    /// set but unparsable keys are errors.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let url = match lookup("REDIS_URL") {
            Some(value) if value.trim().is_empty() => None,
            Some(value) => Some(value.trim().to_string()),
            None => Some(DEFAULT_REDIS_URL.to_string()),
        };

        let command_timeout = Duration::from_millis(parse_or(
            &lookup,
            "REDIS_TIMEOUT_MS",
            DEFAULT_COMMAND_TIMEOUT_MS,
        )?);
        let rate_limit = parse_or(&lookup, "RATE_LIMIT", DEFAULT_RATE_LIMIT)?;
        let window_secs = parse_or(&lookup, "RATE_LIMIT_WINDOW", DEFAULT_RATE_LIMIT_WINDOW_SECS)?;
        let cache_ttl_secs = parse_or(&lookup, "NOTE_CACHE_TTL", DEFAULT_NOTE_CACHE_TTL_SECS)?;
        let recent_limit = parse_or(&lookup, "RECENT_NOTES_LIMIT", DEFAULT_RECENT_NOTES_LIMIT)?;
        // The recent list follows the rate-limit window unless set on its own.
        let recent_window_secs = parse_or(&lookup, "RECENT_NOTES_WINDOW", window_secs)?;

        let config = Self {
            url,
            command_timeout,
            rate_limit,
            rate_limit_window: Duration::from_secs(window_secs),
            cache_ttl: Duration::from_secs(cache_ttl_secs),
            recent_limit,
            recent_window: Duration::from_secs(recent_window_secs),
        };
        config.validate()?;
        Ok(config)
    }

    /// Configuration without a key-value store.
    pub fn disabled() -> Self {
        Self {
            url: None,
            ..Self::default()
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_rate_limit(mut self, max_requests: u64, window: Duration) -> Self {
        self.rate_limit = max_requests;
        self.rate_limit_window = window;
        self
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    pub fn with_recent(mut self, limit: usize, window: Duration) -> Self {
        self.recent_limit = limit;
        self.recent_window = window;
        self
    }

    pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    /// Reject values the store cannot express (zero-second expiries,
    /// empty lists, zero limits).
    pub fn validate(&self) -> Result<(), ConfigError> {
        ensure_positive("RATE_LIMIT", self.rate_limit)?;
        ensure_positive("RATE_LIMIT_WINDOW", self.rate_limit_window.as_secs())?;
        ensure_positive("NOTE_CACHE_TTL", self.cache_ttl.as_secs())?;
        ensure_positive("RECENT_NOTES_LIMIT", self.recent_limit as u64)?;
        ensure_positive("RECENT_NOTES_WINDOW", self.recent_window.as_secs())?;
        ensure_positive("REDIS_TIMEOUT_MS", self.command_timeout.as_millis() as u64)?;
        Ok(())
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            field: key.to_string(),
            value: raw.clone(),
            reason: e.to_string(),
        }),
    }
}

fn ensure_positive(field: &str, value: u64) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(ConfigError::InvalidValue {
            field: field.to_string(),
            value: "0".to_string(),
            reason: "must be greater than zero".to_string(),
        });
    }
    Ok(())
}
