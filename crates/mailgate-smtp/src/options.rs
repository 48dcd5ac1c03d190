//! MAIL FROM parameters.

/// Value of the `BODY=` parameter (RFC 6152, RFC 3030).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BodyType {
    /// `7BIT`
    SevenBit,
    /// `8BITMIME`
    EightBitMime,
    /// `BINARYMIME`
    BinaryMime,
}

impl BodyType {
    /// Parses a `BODY=` value, case-insensitively.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "7BIT" => Some(Self::SevenBit),
            "8BITMIME" => Some(Self::EightBitMime),
            "BINARYMIME" => Some(Self::BinaryMime),
            _ => None,
        }
    }

    /// Returns the parameter keyword.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SevenBit => "7BIT",
            Self::EightBitMime => "8BITMIME",
            Self::BinaryMime => "BINARYMIME",
        }
    }
}

impl std::fmt::Display for BodyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Envelope parameters passed with MAIL FROM.
///
/// Immutable once handed to a session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MailOptions {
    /// `BODY=` value. `None` means the client did not declare one.
    pub body: Option<BodyType>,
    /// `SIZE=` value in bytes. `0` means not declared, not an empty message.
    pub size: usize,
    /// `REQUIRETLS` (RFC 8689): reject unless the transport is TLS.
    pub require_tls: bool,
    /// `SMTPUTF8` (RFC 6531): envelope or headers contain UTF-8.
    pub utf8: bool,
    /// Decoded `AUTH=` identity (RFC 4954) with angle brackets stripped.
    ///
    /// `None` means no `AUTH=` parameter; `Some("")` means `AUTH=<>`.
    pub auth: Option<String>,
}

impl MailOptions {
    /// Creates options with nothing declared.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the body type.
    #[must_use]
    pub const fn with_body(mut self, body: BodyType) -> Self {
        self.body = Some(body);
        self
    }

    /// Sets the declared size.
    #[must_use]
    pub const fn with_size(mut self, size: usize) -> Self {
        self.size = size;
        self
    }

    /// Sets the REQUIRETLS flag.
    #[must_use]
    pub const fn with_require_tls(mut self, require_tls: bool) -> Self {
        self.require_tls = require_tls;
        self
    }

    /// Sets the SMTPUTF8 flag.
    #[must_use]
    pub const fn with_utf8(mut self, utf8: bool) -> Self {
        self.utf8 = utf8;
        self
    }

    /// Sets the asserted authorization identity. An empty string is `AUTH=<>`.
    #[must_use]
    pub fn with_auth(mut self, identity: impl Into<String>) -> Self {
        self.auth = Some(identity.into());
        self
    }

    /// Returns the declared size, or `None` when undeclared.
    #[must_use]
    pub const fn declared_size(&self) -> Option<usize> {
        if self.size == 0 { None } else { Some(self.size) }
    }

    /// Returns true if an `AUTH=` parameter was given, empty or not.
    #[must_use]
    pub const fn has_auth_param(&self) -> bool {
        self.auth.is_some()
    }

    /// Returns true for `AUTH=<>`.
    #[must_use]
    pub fn is_auth_empty(&self) -> bool {
        self.auth.as_deref() == Some("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod body_type_tests {
        use super::*;

        #[test]
        fn parse() {
            assert_eq!(BodyType::parse("7BIT"), Some(BodyType::SevenBit));
            assert_eq!(BodyType::parse("8bitmime"), Some(BodyType::EightBitMime));
            assert_eq!(BodyType::parse("BINARYMIME"), Some(BodyType::BinaryMime));
            assert_eq!(BodyType::parse("QUOTED"), None);
        }

        #[test]
        fn display() {
            assert_eq!(BodyType::EightBitMime.to_string(), "8BITMIME");
        }
    }

    mod mail_options_tests {
        use super::*;

        #[test]
        fn default_declares_nothing() {
            let opts = MailOptions::new();
            assert_eq!(opts.body, None);
            assert_eq!(opts.declared_size(), None);
            assert!(!opts.require_tls);
            assert!(!opts.utf8);
            assert!(!opts.has_auth_param());
        }

        #[test]
        fn declared_size() {
            assert_eq!(MailOptions::new().with_size(1024).declared_size(), Some(1024));
        }

        #[test]
        fn empty_auth_is_not_absent_auth() {
            let empty = MailOptions::new().with_auth("");
            let absent = MailOptions::new();

            assert!(empty.has_auth_param());
            assert!(empty.is_auth_empty());
            assert!(!absent.has_auth_param());
            assert!(!absent.is_auth_empty());
            assert_ne!(empty, absent);
        }

        #[test]
        fn named_auth() {
            let opts = MailOptions::new().with_auth("alice@example.com");
            assert_eq!(opts.auth.as_deref(), Some("alice@example.com"));
            assert!(!opts.is_auth_empty());
        }

        #[test]
        fn builder_chain() {
            let opts = MailOptions::new()
                .with_body(BodyType::BinaryMime)
                .with_require_tls(true)
                .with_utf8(true);
            assert_eq!(opts.body, Some(BodyType::BinaryMime));
            assert!(opts.require_tls);
            assert!(opts.utf8);
        }
    }
}
