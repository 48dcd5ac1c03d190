//! Protocol-coded errors returned by sessions.

use std::borrow::Cow;

use super::reply::{EnhancedCode, ReplyCode};

/// An error carrying the exact reply the protocol layer should send.
///
/// Well-known rejections are associated constants, so callers compare
/// against the constant rather than inspecting the message:
///
/// ```
/// use mailgate_smtp::SmtpError;
///
/// let err = SmtpError::AUTH_REQUIRED;
/// assert_eq!(err, SmtpError::AUTH_REQUIRED);
/// assert_eq!(err.code.as_u16(), 502);
/// assert_eq!(err.enhanced.unwrap().to_string(), "5.7.0");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, thiserror::Error)]
#[error("SMTP error {code}: {message}")]
pub struct SmtpError {
    /// Three-digit reply code.
    pub code: ReplyCode,
    /// Enhanced status code, if one applies.
    pub enhanced: Option<EnhancedCode>,
    /// Human-readable reply text.
    pub message: Cow<'static, str>,
}

impl SmtpError {
    /// Creates an error with an enhanced status code.
    #[must_use]
    pub fn new(
        code: ReplyCode,
        enhanced: EnhancedCode,
        message: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self {
            code,
            enhanced: Some(enhanced),
            message: message.into(),
        }
    }

    /// Creates an error without an enhanced status code.
    #[must_use]
    pub fn without_enhanced(code: ReplyCode, message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            code,
            enhanced: None,
            message: message.into(),
        }
    }

    const fn fixed(code: u16, enhanced: (u8, u16, u16), message: &'static str) -> Self {
        Self {
            code: ReplyCode::new(code),
            enhanced: Some(EnhancedCode::new(enhanced.0, enhanced.1, enhanced.2)),
            message: Cow::Borrowed(message),
        }
    }

    /// Returns true if this is a transient error (4xx).
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        self.code.is_transient()
    }

    /// Returns true if this is a permanent error (5xx).
    #[must_use]
    pub const fn is_permanent(&self) -> bool {
        self.code.is_permanent()
    }
}

// Fixed rejections
impl SmtpError {
    /// 502 5.7.0: a transaction command was issued before authenticating.
    pub const AUTH_REQUIRED: Self = Self::fixed(502, (5, 7, 0), "Please authenticate first");
    /// 502 5.7.0: the backend does not implement this authentication mechanism.
    pub const AUTH_UNSUPPORTED: Self =
        Self::fixed(502, (5, 7, 0), "Authentication not supported");
    /// 535 5.7.8: the credentials were rejected.
    pub const AUTH_INVALID: Self =
        Self::fixed(535, (5, 7, 8), "Authentication credentials invalid");
    /// 530 5.7.10: REQUIRETLS was requested on a plaintext connection.
    pub const ENCRYPTION_REQUIRED: Self =
        Self::fixed(530, (5, 7, 10), "REQUIRETLS needs a TLS connection");
    /// 550 5.1.1: the recipient mailbox does not exist.
    pub const NO_SUCH_MAILBOX: Self = Self::fixed(550, (5, 1, 1), "Mailbox does not exist");
    /// 552 5.2.2: the recipient mailbox is over quota.
    pub const MAILBOX_FULL: Self = Self::fixed(552, (5, 2, 2), "Mailbox full");
    /// 452 4.5.3: the transaction already has the maximum number of recipients.
    pub const TOO_MANY_RECIPIENTS: Self = Self::fixed(452, (4, 5, 3), "Too many recipients");
    /// 552 5.3.4: the message exceeds the size limit.
    pub const MESSAGE_TOO_BIG: Self =
        Self::fixed(552, (5, 3, 4), "Message exceeds fixed maximum message size");
    /// 555 5.6.7: SMTPUTF8 was requested but is not supported.
    pub const UTF8_NOT_SUPPORTED: Self = Self::fixed(555, (5, 6, 7), "SMTPUTF8 not supported");
    /// 504 5.5.4: the BODY= type is not supported.
    pub const BODY_TYPE_NOT_SUPPORTED: Self =
        Self::fixed(504, (5, 5, 4), "BODY type not supported");
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

    fn auth_required() -> SmtpError {
        SmtpError::AUTH_REQUIRED
    }

    #[test]
    fn sentinels_compare_equal_when_obtained_separately() {
        assert_eq!(auth_required(), SmtpError::AUTH_REQUIRED);
        assert_eq!(SmtpError::AUTH_UNSUPPORTED.clone(), SmtpError::AUTH_UNSUPPORTED);
    }

    #[test]
    fn auth_sentinels_carry_502_5_7_0() {
        for err in [SmtpError::AUTH_REQUIRED, SmtpError::AUTH_UNSUPPORTED] {
            assert_eq!(err.code, ReplyCode::NOT_IMPLEMENTED);
            assert_eq!(err.enhanced, Some(EnhancedCode::new(5, 7, 0)));
            assert!(err.is_permanent());
        }
    }

    #[test]
    fn auth_sentinels_are_distinct() {
        assert_ne!(SmtpError::AUTH_REQUIRED, SmtpError::AUTH_UNSUPPORTED);
    }

    #[test]
    fn equality_is_not_by_message_alone() {
        let lookalike = SmtpError::new(
            ReplyCode::new(550),
            EnhancedCode::new(5, 7, 0),
            "Please authenticate first",
        );
        assert_ne!(lookalike, SmtpError::AUTH_REQUIRED);
    }

    #[test]
    fn display() {
        assert_eq!(
            SmtpError::AUTH_REQUIRED.to_string(),
            "SMTP error 502: Please authenticate first"
        );
    }

    #[test]
    fn owned_message() {
        let err = SmtpError::new(
            ReplyCode::MAILBOX_UNAVAILABLE,
            EnhancedCode::new(5, 1, 1),
            format!("<{}> unknown", "bob@example.com"),
        );
        assert_eq!(err.message, "<bob@example.com> unknown");
    }

    #[test]
    fn without_enhanced() {
        let err = SmtpError::without_enhanced(ReplyCode::LOCAL_ERROR, "try later");
        assert!(err.enhanced.is_none());
        assert!(err.is_transient());
    }
}
