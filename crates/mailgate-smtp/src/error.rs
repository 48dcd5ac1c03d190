//! Error types for session operations.

use std::io;

use mailgate_sasl::OAuthBearerError;

use crate::types::{EnhancedCode, ReplyCode, SmtpError};

/// Result type alias for session operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors a session reports back to the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Rejection with an exact reply code.
    #[error(transparent)]
    Smtp(#[from] SmtpError),

    /// Command issued out of order (e.g., RCPT before MAIL).
    #[error("Bad sequence of commands: {0}")]
    BadSequence(String),

    /// I/O error, typically while reading the message body.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Message body exceeded the size limit.
    #[error("Message exceeds size limit: {0} bytes")]
    MessageTooLarge(usize),

    /// Any other backend failure.
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

impl Error {
    /// Creates a sequencing error.
    #[must_use]
    pub fn bad_sequence(reason: impl Into<String>) -> Self {
        Self::BadSequence(reason.into())
    }

    /// Returns the coded error if this is one.
    #[must_use]
    pub const fn as_smtp(&self) -> Option<&SmtpError> {
        match self {
            Self::Smtp(err) => Some(err),
            _ => None,
        }
    }

    /// Maps this error to the reply the protocol layer sends.
    ///
    /// Coded errors pass through unchanged; everything else gets a default
    /// code for its kind.
    #[must_use]
    pub fn to_smtp_error(&self) -> SmtpError {
        match self {
            Self::Smtp(err) => err.clone(),
            Self::BadSequence(reason) => SmtpError::new(
                ReplyCode::BAD_SEQUENCE,
                EnhancedCode::new(5, 5, 1),
                format!("Bad sequence of commands: {reason}"),
            ),
            Self::Io(err) => SmtpError::new(
                ReplyCode::LOCAL_ERROR,
                EnhancedCode::new(4, 3, 0),
                format!("Local error in processing: {err}"),
            ),
            Self::MessageTooLarge(_) => SmtpError::MESSAGE_TOO_BIG,
            Self::Backend(err) => SmtpError::new(
                ReplyCode::TRANSACTION_FAILED,
                EnhancedCode::new(5, 0, 0),
                format!("Error: transaction failed: {err}"),
            ),
        }
    }

    /// Returns true if the mapped reply is a permanent error (5xx).
    #[must_use]
    pub fn is_permanent(&self) -> bool {
        self.to_smtp_error().is_permanent()
    }

    /// Returns true if the mapped reply is a transient error (4xx).
    #[must_use]
    pub fn is_transient(&self) -> bool {
        self.to_smtp_error().is_transient()
    }
}

/// Failure of an OAUTHBEARER exchange.
///
/// Kept apart from [`Error`] because the mechanism answers failures with a
/// JSON challenge instead of a reply line.
#[derive(Debug, thiserror::Error)]
pub enum BearerAuthError {
    /// Token rejected; the payload is sent to the client as the challenge.
    #[error(transparent)]
    Rejected(#[from] OAuthBearerError),

    /// Coded failure answered with an ordinary reply (e.g., unsupported).
    #[error(transparent)]
    Smtp(#[from] Error),
}

impl From<SmtpError> for BearerAuthError {
    fn from(err: SmtpError) -> Self {
        Self::Smtp(Error::Smtp(err))
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;

    #[test]
    fn smtp_error_passes_through() {
        let err = Error::from(SmtpError::AUTH_REQUIRED);
        assert_eq!(err.as_smtp(), Some(&SmtpError::AUTH_REQUIRED));
        assert_eq!(err.to_smtp_error(), SmtpError::AUTH_REQUIRED);
    }

    #[test]
    fn bad_sequence_maps_to_503() {
        let reply = Error::bad_sequence("RCPT before MAIL").to_smtp_error();
        assert_eq!(reply.code, ReplyCode::BAD_SEQUENCE);
        assert_eq!(reply.enhanced, Some(EnhancedCode::new(5, 5, 1)));
        assert!(reply.message.contains("RCPT before MAIL"));
    }

    #[test]
    fn io_maps_to_transient() {
        let err = Error::from(io::Error::new(io::ErrorKind::UnexpectedEof, "eof"));
        assert!(err.is_transient());
        assert_eq!(err.to_smtp_error().code, ReplyCode::LOCAL_ERROR);
    }

    #[test]
    fn too_large_maps_to_fixed_reply() {
        assert_eq!(
            Error::MessageTooLarge(10).to_smtp_error(),
            SmtpError::MESSAGE_TOO_BIG
        );
    }

    #[test]
    fn backend_maps_to_554() {
        let err = Error::from(anyhow::anyhow!("disk on fire"));
        let reply = err.to_smtp_error();
        assert_eq!(reply.code, ReplyCode::TRANSACTION_FAILED);
        assert_eq!(reply.message, "Error: transaction failed: disk on fire");
        assert!(err.as_smtp().is_none());
    }

    #[test]
    fn bearer_error_keeps_payload() {
        let err = BearerAuthError::from(OAuthBearerError::invalid_token());
        match err {
            BearerAuthError::Rejected(payload) => assert_eq!(payload.status, "invalid_token"),
            BearerAuthError::Smtp(_) => panic!("expected Rejected"),
        }
    }

    #[test]
    fn bearer_error_from_sentinel() {
        let err = BearerAuthError::from(SmtpError::AUTH_UNSUPPORTED);
        match err {
            BearerAuthError::Smtp(inner) => {
                assert_eq!(inner.as_smtp(), Some(&SmtpError::AUTH_UNSUPPORTED));
            }
            BearerAuthError::Rejected(_) => panic!("expected Smtp"),
        }
    }
}
