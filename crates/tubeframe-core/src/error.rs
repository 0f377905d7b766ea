//! Error types for tubeframe core

use thiserror::Error;

/// Result type alias for bridge operations
pub type Result<T> = std::result::Result<T, Error>;

/// Bridge error types
#[derive(Error, Debug)]
pub enum Error {
    // Initialization errors
    #[error("Failed to initialize transport: {0}")]
    TransportInit(String),

    #[error("Player is already initialized")]
    AlreadyInitialized,

    #[error("Player has been released")]
    Released,

    // Protocol errors
    #[error("Unknown inbound event: {0}")]
    UnknownEvent(String),

    #[error("Malformed payload for {event}: {reason}")]
    MalformedPayload { event: String, reason: String },

    #[error("Unknown remote command: {0}")]
    UnknownCommand(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // Surface errors
    #[error("Embedding surface error: {0}")]
    Surface(String),
}

impl Error {
    /// Create a malformed payload error
    pub fn malformed(event: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::MalformedPayload {
            event: event.into(),
            reason: reason.into(),
        }
    }

    /// Returns true if this error ends the usefulness of the player instance.
    ///
    /// Protocol and surface errors are absorbed by the delivery task; only
    /// setup failures reach host code.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::TransportInit(_) | Error::AlreadyInitialized | Error::Released
        )
    }

    /// Returns the error code for logging
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::TransportInit(_) => "TRANSPORT_INIT",
            Error::AlreadyInitialized => "ALREADY_INITIALIZED",
            Error::Released => "RELEASED",
            Error::UnknownEvent(_) => "UNKNOWN_EVENT",
            Error::MalformedPayload { .. } => "MALFORMED_PAYLOAD",
            Error::UnknownCommand(_) => "UNKNOWN_COMMAND",
            Error::Json(_) => "JSON",
            Error::Surface(_) => "SURFACE",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        assert!(Error::TransportInit("no webview".into()).is_fatal());
        assert!(Error::AlreadyInitialized.is_fatal());
        assert!(!Error::UnknownEvent("onFoo".into()).is_fatal());
        assert!(!Error::malformed("onStateChange", "not a number").is_fatal());
    }

    #[test]
    fn test_error_display() {
        let err = Error::malformed("onCurrentSecond", "expected number");
        assert_eq!(
            err.to_string(),
            "Malformed payload for onCurrentSecond: expected number"
        );
        assert_eq!(err.error_code(), "MALFORMED_PAYLOAD");
    }
}
