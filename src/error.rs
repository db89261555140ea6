//! Error types for the session client.

/// Top-level error type for the SAMi session client.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Event channel send/receive error.
    #[error("channel error: {0}")]
    Channel(String),

    /// HTTP or WebSocket transport error.
    #[error("transport error: {0}")]
    Transport(String),

    /// Malformed or unexpected wire payload.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Speech capture capability error.
    #[error("speech error: {0}")]
    Speech(String),

    /// Camera or file frame acquisition error.
    #[error("capture error: {0}")]
    Capture(String),

    /// Remote media resolution error.
    #[error("media error: {0}")]
    Media(String),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, ClientError>;

/// A blocking user-facing alert with remediation guidance.
///
/// Emitted only by capability failures (speech permission denied, speech
/// network error, missing capability, camera access denied). Everything else
/// degrades to a transcript entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UiAlert {
    /// Human-readable message shown to the user.
    pub message: String,
}

impl UiAlert {
    /// Create an alert from any displayable message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
