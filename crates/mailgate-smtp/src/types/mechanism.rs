//! SASL mechanisms a session can offer.

/// SASL authentication mechanism.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthMechanism {
    /// PLAIN - plaintext authentication
    Plain,
    /// `OAUTHBEARER` - RFC 7628 `OAuth2`
    OAuthBearer,
}

impl AuthMechanism {
    /// Parses an authentication mechanism name.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "PLAIN" => Some(Self::Plain),
            "OAUTHBEARER" => Some(Self::OAuthBearer),
            _ => None,
        }
    }

    /// Returns the mechanism name as a string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Plain => "PLAIN",
            Self::OAuthBearer => "OAUTHBEARER",
        }
    }
}

impl std::fmt::Display for AuthMechanism {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_known() {
        assert_eq!(AuthMechanism::parse("PLAIN"), Some(AuthMechanism::Plain));
        assert_eq!(AuthMechanism::parse("plain"), Some(AuthMechanism::Plain));
        assert_eq!(
            AuthMechanism::parse("OAUTHBEARER"),
            Some(AuthMechanism::OAuthBearer)
        );
    }

    #[test]
    fn parse_unknown() {
        assert_eq!(AuthMechanism::parse("CRAM-MD5"), None);
        assert_eq!(AuthMechanism::parse(""), None);
    }

    #[test]
    fn as_str() {
        assert_eq!(AuthMechanism::Plain.as_str(), "PLAIN");
        assert_eq!(AuthMechanism::OAuthBearer.to_string(), "OAUTHBEARER");
    }
}
