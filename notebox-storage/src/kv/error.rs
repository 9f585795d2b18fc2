//! Key-value store errors.

use std::time::Duration;

use thiserror::Error;

/// Errors raised by a key-value store command.
///
/// None of these reach request handlers: [`super::KvClient::call`] turns every
/// variant into a degraded result.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum KvError {
    #[error("Key-value connection failed: {reason}")]
    Connection { reason: String },

    #[error("Key-value command {op} timed out after {after:?}")]
    Timeout { op: &'static str, after: Duration },

    #[error("Key-value command failed: {reason}")]
    Command { reason: String },

    #[error("Unexpected key-value reply: {reason}")]
    Protocol { reason: String },
}

/// Result type alias for key-value operations.
pub type KvResult<T> = Result<T, KvError>;

impl KvError {
    pub fn connection(reason: impl Into<String>) -> Self {
        Self::Connection {
            reason: reason.into(),
        }
    }

    pub fn command(reason: impl Into<String>) -> Self {
        Self::Command {
            reason: reason.into(),
        }
    }

    /// Short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Connection { .. } => "connection",
            Self::Timeout { .. } => "timeout",
            Self::Command { .. } => "command",
            Self::Protocol { .. } => "protocol",
        }
    }
}

impl From<redis::RedisError> for KvError {
    fn from(err: redis::RedisError) -> Self {
        // Driver-level socket timeouts count as connection trouble; our own
        // per-command deadline is reported as `Timeout` by the caller.
        if err.is_timeout()
            || err.is_io_error()
            || err.is_connection_refusal()
            || err.is_connection_dropped()
        {
            return Self::Connection {
                reason: err.to_string(),
            };
        }
        match err.kind() {
            redis::ErrorKind::TypeError => Self::Protocol {
                reason: err.to_string(),
            },
            _ => Self::Command {
                reason: err.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_error_maps_to_protocol() {
        let err = redis::RedisError::from((redis::ErrorKind::TypeError, "bad reply"));
        let kv: KvError = err.into();
        assert_eq!(kv.kind(), "protocol");
    }

    #[test]
    fn test_response_error_maps_to_command() {
        let err = redis::RedisError::from((redis::ErrorKind::ResponseError, "WRONGTYPE"));
        let kv: KvError = err.into();
        assert_eq!(kv.kind(), "command");
    }

    #[test]
    fn test_io_error_maps_to_connection() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let kv: KvError = redis::RedisError::from(io).into();
        assert_eq!(kv.kind(), "connection");
    }

    #[test]
    fn test_timeout_display_names_operation() {
        let err = KvError::Timeout {
            op: "GET",
            after: Duration::from_millis(250),
        };
        assert!(err.to_string().contains("GET"));
    }
}
