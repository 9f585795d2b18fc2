//! Fixed-window rate limiter.
//!
//! One counter per client identity. The first request of a window creates
//! the counter and starts its expiry; later requests only increment it, so a
//! window never stretches. When the store is unavailable every request is
//! let through.

use std::time::Duration;

use notebox_core::ClientId;

use crate::kv::{KvClient, WindowCount};

/// Key under which a client's request counter lives.
pub fn rate_key(client: &ClientId) -> String {
    format!("rate:ip:{}", client)
}

/// Outcome of a rate-limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    /// Within the limit.
    Allowed { count: u64, limit: u64 },
    /// Over the limit for the rest of the current window.
    Limited {
        count: u64,
        limit: u64,
        retry_after: Duration,
    },
    /// The store could not be consulted; the request is let through.
    Bypassed,
}

impl RateDecision {
    pub fn is_allowed(&self) -> bool {
        !matches!(self, Self::Limited { .. })
    }

    /// Requests left in the current window, when known.
    pub fn remaining(&self) -> Option<u64> {
        match self {
            Self::Allowed { count, limit } => Some(limit.saturating_sub(*count)),
            Self::Limited { .. } => Some(0),
            Self::Bypassed => None,
        }
    }

    /// Label used in metrics.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Allowed { .. } => "allowed",
            Self::Limited { .. } => "limited",
            Self::Bypassed => "bypassed",
        }
    }
}

/// Per-client fixed-window limiter.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    kv: KvClient,
    max_requests: u64,
    window: Duration,
}

impl RateLimiter {
    pub fn new(kv: KvClient, max_requests: u64, window: Duration) -> Self {
        Self {
            kv,
            max_requests,
            window,
        }
    }

    pub fn max_requests(&self) -> u64 {
        self.max_requests
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Count this request against `client` and decide whether it may proceed.
    pub async fn check(&self, client: &ClientId) -> RateDecision {
        let key = rate_key(client);
        let window = self.window;
        let counted = self
            .kv
            .call("rate_limit.check", |store| async move {
                store.incr_window(&key, window).await
            })
            .await;

        match counted {
            None => RateDecision::Bypassed,
            Some(WindowCount { count, ttl }) => {
                let count = u64::try_from(count).unwrap_or(0);
                if count > self.max_requests {
                    RateDecision::Limited {
                        count,
                        limit: self.max_requests,
                        retry_after: ttl.unwrap_or(self.window),
                    }
                } else {
                    RateDecision::Allowed {
                        count,
                        limit: self.max_requests,
                    }
                }
            }
        }
    }
}
