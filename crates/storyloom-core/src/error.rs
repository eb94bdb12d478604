//! Error types for Storyloom.

use thiserror::Error;

/// A shared error type for the entire Storyloom application.
///
/// Failures of the response recovery pipeline never show up here: recovery
/// always resolves to a usable turn. Everything else that can reach a caller
/// (engine transport, persistence, validation of loaded records, state
/// machine misuse) is one of these variants.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoryError {
    /// Entity not found error with type information
    #[error("Entity not found: {entity_type} '{id}'")]
    NotFound {
        entity_type: &'static str,
        id: String,
    },

    /// The story engine could not be reached or answered with an error.
    /// Surfaced once at the call site; never retried automatically.
    #[error("Story engine request failed{}: {message}", .status.map(|s| format!(" (HTTP {s})")).unwrap_or_default())]
    TransientNetwork {
        status: Option<u16>,
        message: String,
    },

    /// A story engine request exceeded the configured timeout
    #[error("Story engine request timed out after {seconds}s")]
    Timeout { seconds: u64 },

    /// A stored session record is malformed or does not belong to the caller
    #[error("Invalid session data: {0}")]
    Validation(String),

    /// Persistence store error
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {format} - {message}")]
    Serialization { format: String, message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// An operation was invoked in a session state that does not accept it
    #[error("Cannot {operation} while session is {state}")]
    InvalidState {
        operation: &'static str,
        state: String,
    },

    /// The owning session was left before an async result arrived
    #[error("Session is no longer active")]
    SessionInactive,

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl StoryError {
    // ============================================================================
    // Constructor helpers
    // ============================================================================

    /// Creates a NotFound error
    pub fn not_found(entity_type: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type,
            id: id.into(),
        }
    }

    /// Creates a TransientNetwork error without an HTTP status
    pub fn network(message: impl Into<String>) -> Self {
        Self::TransientNetwork {
            status: None,
            message: message.into(),
        }
    }

    /// Creates a TransientNetwork error for a rejected HTTP request
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self::TransientNetwork {
            status: Some(status),
            message: message.into(),
        }
    }

    /// Creates a Validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Creates a Persistence error
    pub fn persistence(message: impl Into<String>) -> Self {
        Self::Persistence(message.into())
    }

    /// Creates a Config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Creates an InvalidState error
    pub fn invalid_state(operation: &'static str, state: impl ToString) -> Self {
        Self::InvalidState {
            operation,
            state: state.to_string(),
        }
    }

    /// Creates an Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    // ============================================================================
    // Type checking methods
    // ============================================================================

    /// Check if this is a NotFound error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if this error came from the story engine boundary.
    ///
    /// Timeouts count as transient: both leave the session recoverable by the
    /// user submitting again.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::TransientNetwork { .. } | Self::Timeout { .. })
    }

    /// Check if this is a validation error
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Check if this is a persistence error
    pub fn is_persistence(&self) -> bool {
        matches!(self, Self::Persistence(_))
    }
}

// ============================================================================
// From implementations for automatic conversion
// ============================================================================

impl From<std::io::Error> for StoryError {
    fn from(err: std::io::Error) -> Self {
        Self::Persistence(format!("{} (kind: {:?})", err, err.kind()))
    }
}

impl From<serde_json::Error> for StoryError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            format: "JSON".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for StoryError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::ser::Error> for StoryError {
    fn from(err: toml::ser::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

/// A type alias for `Result<T, StoryError>`.
pub type Result<T> = std::result::Result<T, StoryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_error_display_includes_status() {
        let err = StoryError::TransientNetwork {
            status: Some(503),
            message: "overloaded".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Story engine request failed (HTTP 503): overloaded"
        );
        assert_eq!(
            StoryError::network("offline").to_string(),
            "Story engine request failed: offline"
        );
    }

    #[test]
    fn test_transient_covers_timeouts() {
        assert!(StoryError::Timeout { seconds: 60 }.is_transient());
        assert!(StoryError::network("x").is_transient());
        assert!(!StoryError::persistence("disk full").is_transient());
    }

    #[test]
    fn test_io_error_maps_to_persistence() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: StoryError = io.into();
        assert!(err.is_persistence());
    }
}
