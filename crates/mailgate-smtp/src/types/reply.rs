//! SMTP reply codes and RFC 3463 enhanced status codes.

/// SMTP reply code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ReplyCode(u16);

impl ReplyCode {
    /// Creates a new reply code.
    #[must_use]
    pub const fn new(code: u16) -> Self {
        Self(code)
    }

    /// Returns the numeric code.
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self.0
    }

    /// Returns true if this is a success code (2xx).
    #[must_use]
    pub const fn is_success(self) -> bool {
        self.0 >= 200 && self.0 < 300
    }

    /// Returns true if this is a transient error (4xx).
    #[must_use]
    pub const fn is_transient(self) -> bool {
        self.0 >= 400 && self.0 < 500
    }

    /// Returns true if this is a permanent error (5xx).
    #[must_use]
    pub const fn is_permanent(self) -> bool {
        self.0 >= 500 && self.0 < 600
    }

    /// Returns true if this is an intermediate reply (3xx).
    #[must_use]
    pub const fn is_intermediate(self) -> bool {
        self.0 >= 300 && self.0 < 400
    }
}

impl std::fmt::Display for ReplyCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:03}", self.0)
    }
}

// Common reply codes
impl ReplyCode {
    /// 250 Requested mail action okay, completed
    pub const OK: Self = Self(250);
    /// 421 Service not available, closing transmission channel
    pub const SERVICE_UNAVAILABLE: Self = Self(421);
    /// 450 Mailbox unavailable (busy)
    pub const MAILBOX_BUSY: Self = Self(450);
    /// 451 Local error in processing
    pub const LOCAL_ERROR: Self = Self(451);
    /// 452 Insufficient system storage
    pub const INSUFFICIENT_STORAGE: Self = Self(452);
    /// 500 Syntax error, command unrecognized
    pub const SYNTAX_ERROR: Self = Self(500);
    /// 501 Syntax error in parameters or arguments
    pub const PARAMETER_ERROR: Self = Self(501);
    /// 502 Command not implemented
    pub const NOT_IMPLEMENTED: Self = Self(502);
    /// 503 Bad sequence of commands
    pub const BAD_SEQUENCE: Self = Self(503);
    /// 504 Command parameter not implemented
    pub const PARAMETER_NOT_IMPLEMENTED: Self = Self(504);
    /// 530 Must issue STARTTLS / encryption required
    pub const ENCRYPTION_REQUIRED: Self = Self(530);
    /// 535 Authentication credentials invalid
    pub const AUTH_FAILED: Self = Self(535);
    /// 550 Mailbox unavailable (not found, access denied)
    pub const MAILBOX_UNAVAILABLE: Self = Self(550);
    /// 552 Exceeded storage allocation
    pub const EXCEEDED_STORAGE: Self = Self(552);
    /// 553 Mailbox name not allowed
    pub const MAILBOX_NAME_INVALID: Self = Self(553);
    /// 554 Transaction failed
    pub const TRANSACTION_FAILED: Self = Self(554);
    /// 555 MAIL FROM/RCPT TO parameters not recognized or not implemented
    pub const PARAMETERS_NOT_RECOGNIZED: Self = Self(555);
}

/// Enhanced status code (RFC 3463), written `class.subject.detail`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EnhancedCode {
    /// Class: 2 (success), 4 (persistent transient), 5 (permanent).
    pub class: u8,
    /// Subject, 0-999.
    pub subject: u16,
    /// Detail, 0-999.
    pub detail: u16,
}

impl EnhancedCode {
    /// Creates a new enhanced code.
    #[must_use]
    pub const fn new(class: u8, subject: u16, detail: u16) -> Self {
        Self {
            class,
            subject,
            detail,
        }
    }

    /// Parses `class.subject.detail`.
    ///
    /// Returns `None` unless the class is 2, 4 or 5 and the other parts are
    /// at most three digits.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        let mut parts = s.split('.');
        let class = parts.next()?.parse::<u8>().ok()?;
        let subject = parse_part(parts.next()?)?;
        let detail = parse_part(parts.next()?)?;
        if parts.next().is_some() || !matches!(class, 2 | 4 | 5) {
            return None;
        }
        Some(Self::new(class, subject, detail))
    }

    /// Returns true if the class is 2.
    #[must_use]
    pub const fn is_success(self) -> bool {
        self.class == 2
    }

    /// Returns true if the class is 4.
    #[must_use]
    pub const fn is_transient(self) -> bool {
        self.class == 4
    }

    /// Returns true if the class is 5.
    #[must_use]
    pub const fn is_permanent(self) -> bool {
        self.class == 5
    }
}

fn parse_part(s: &str) -> Option<u16> {
    if s.is_empty() || s.len() > 3 || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

impl std::fmt::Display for EnhancedCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.class, self.subject, self.detail)
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

    mod reply_code_tests {
        use super::*;

        #[test]
        fn success_codes() {
            assert!(ReplyCode::OK.is_success());
            assert!(!ReplyCode::OK.is_transient());
            assert!(!ReplyCode::OK.is_permanent());
            assert!(!ReplyCode::OK.is_intermediate());
        }

        #[test]
        fn intermediate_codes() {
            assert!(ReplyCode::new(354).is_intermediate());
            assert!(ReplyCode::new(334).is_intermediate());
        }

        #[test]
        fn transient_errors() {
            assert!(ReplyCode::MAILBOX_BUSY.is_transient());
            assert!(ReplyCode::SERVICE_UNAVAILABLE.is_transient());
            assert!(ReplyCode::LOCAL_ERROR.is_transient());
            assert!(ReplyCode::INSUFFICIENT_STORAGE.is_transient());
        }

        #[test]
        fn permanent_errors() {
            assert!(ReplyCode::MAILBOX_UNAVAILABLE.is_permanent());
            assert!(ReplyCode::NOT_IMPLEMENTED.is_permanent());
            assert!(ReplyCode::BAD_SEQUENCE.is_permanent());
            assert!(ReplyCode::ENCRYPTION_REQUIRED.is_permanent());
            assert!(ReplyCode::AUTH_FAILED.is_permanent());
        }

        #[test]
        fn display() {
            assert_eq!(format!("{}", ReplyCode::OK), "250");
            assert_eq!(format!("{}", ReplyCode::NOT_IMPLEMENTED), "502");
        }

        #[test]
        fn ordering() {
            assert!(ReplyCode::OK < ReplyCode::MAILBOX_BUSY);
            assert!(ReplyCode::MAILBOX_BUSY < ReplyCode::MAILBOX_UNAVAILABLE);
        }
    }

    mod enhanced_code_tests {
        use super::*;

        #[test]
        fn display() {
            assert_eq!(EnhancedCode::new(5, 7, 0).to_string(), "5.7.0");
            assert_eq!(EnhancedCode::new(4, 5, 3).to_string(), "4.5.3");
            assert_eq!(EnhancedCode::new(5, 7, 10).to_string(), "5.7.10");
        }

        #[test]
        fn parse_valid() {
            assert_eq!(EnhancedCode::parse("5.7.0"), Some(EnhancedCode::new(5, 7, 0)));
            assert_eq!(
                EnhancedCode::parse("2.0.0"),
                Some(EnhancedCode::new(2, 0, 0))
            );
            assert_eq!(
                EnhancedCode::parse("4.999.999"),
                Some(EnhancedCode::new(4, 999, 999))
            );
        }

        #[test]
        fn parse_rejects_bad_class() {
            assert_eq!(EnhancedCode::parse("3.0.0"), None);
            assert_eq!(EnhancedCode::parse("x.0.0"), None);
        }

        #[test]
        fn parse_rejects_bad_shape() {
            assert_eq!(EnhancedCode::parse("5.7"), None);
            assert_eq!(EnhancedCode::parse("5.7.0.1"), None);
            assert_eq!(EnhancedCode::parse("5.1000.0"), None);
            assert_eq!(EnhancedCode::parse("5..0"), None);
            assert_eq!(EnhancedCode::parse("5.+1.0"), None);
        }

        #[test]
        fn class_predicates() {
            assert!(EnhancedCode::new(2, 0, 0).is_success());
            assert!(EnhancedCode::new(4, 2, 2).is_transient());
            assert!(EnhancedCode::new(5, 2, 2).is_permanent());
        }
    }
}
