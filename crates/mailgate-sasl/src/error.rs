//! Error types for SASL decoding.

/// Result type alias for SASL operations.
pub type Result<T> = std::result::Result<T, Error>;

/// SASL decoding errors.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Payload is not valid base64.
    #[error("Invalid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    /// JSON encoding or decoding error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Payload is not valid UTF-8.
    #[error("Payload is not valid UTF-8")]
    NonUtf8,

    /// Payload does not follow the mechanism's format.
    #[error("Malformed {mechanism} response: {reason}")]
    Malformed {
        /// Mechanism name (e.g., `PLAIN`).
        mechanism: &'static str,
        /// What was wrong with the payload.
        reason: String,
    },
}

impl Error {
    /// Creates a malformed-payload error.
    #[must_use]
    pub fn malformed(mechanism: &'static str, reason: impl Into<String>) -> Self {
        Self::Malformed {
            mechanism,
            reason: reason.into(),
        }
    }
}
