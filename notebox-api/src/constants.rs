//! Constants for Notebox API
//!
//! Centralized constant values used throughout the API.

// ============================================================================
// SERVER
// ============================================================================

/// Default bind host.
pub const DEFAULT_BIND_HOST: &str = "0.0.0.0";

/// Default listening port.
pub const DEFAULT_PORT: u16 = 3000;

// ============================================================================
// CORS
// ============================================================================

/// Default CORS max age in seconds (24 hours)
pub const DEFAULT_CORS_MAX_AGE_SECS: u64 = 86400;

// ============================================================================
// RATE LIMITING
// ============================================================================

/// Header carrying the per-window request limit.
pub const RATE_LIMIT_LIMIT_HEADER: &str = "x-ratelimit-limit";

/// Header carrying the requests left in the current window.
pub const RATE_LIMIT_REMAINING_HEADER: &str = "x-ratelimit-remaining";

/// Smallest `Retry-After` value sent with a 429.
pub const MIN_RETRY_AFTER_SECS: u64 = 1;

// ============================================================================
// DATABASE
// ============================================================================

/// Table holding notes.
pub const NOTES_TABLE: &str = "notes";
