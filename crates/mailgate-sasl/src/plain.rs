//! PLAIN mechanism (RFC 4616).

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::error::{Error, Result};

const MECHANISM: &str = "PLAIN";

/// Credentials carried by a PLAIN response.
///
/// The message is `authzid NUL authcid NUL passwd`. An empty authorization
/// identity means "act as the authentication identity".
#[derive(Clone, PartialEq, Eq)]
pub struct PlainCredentials {
    /// Authorization identity, `None` when the client sent it empty.
    pub authzid: Option<String>,
    /// Authentication identity (username).
    pub username: String,
    /// Password.
    pub password: String,
}

impl PlainCredentials {
    /// Decodes a base64 PLAIN response as sent after `AUTH PLAIN`.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload is not base64 or not a valid PLAIN
    /// message.
    pub fn decode(response: &str) -> Result<Self> {
        let raw = STANDARD.decode(response.trim())?;
        Self::from_bytes(&raw)
    }

    /// Parses an already decoded PLAIN message.
    ///
    /// # Errors
    ///
    /// Returns an error if the message does not have exactly three NUL
    /// separated fields, or if the username or password is empty.
    pub fn from_bytes(raw: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(raw).map_err(|_| Error::NonUtf8)?;
        let fields: Vec<&str> = text.split('\0').collect();
        let [authzid, username, password] = fields.as_slice() else {
            return Err(Error::malformed(
                MECHANISM,
                format!("expected 3 fields, got {}", fields.len()),
            ));
        };

        if username.is_empty() {
            return Err(Error::malformed(MECHANISM, "empty authentication identity"));
        }
        if password.is_empty() {
            return Err(Error::malformed(MECHANISM, "empty password"));
        }

        Ok(Self {
            authzid: (!authzid.is_empty()).then(|| (*authzid).to_string()),
            username: (*username).to_string(),
            password: (*password).to_string(),
        })
    }

    /// Returns the identity the client wants to act as.
    #[must_use]
    pub fn effective_identity(&self) -> &str {
        self.authzid.as_deref().unwrap_or(&self.username)
    }
}

// Keeps the password out of logs.
impl std::fmt::Debug for PlainCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlainCredentials")
            .field("authzid", &self.authzid)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Generates a PLAIN initial response with an empty authorization identity.
///
/// Format: `\0<username>\0<password>` (base64 encoded)
///
/// # Example
///
/// ```
/// use mailgate_sasl::plain::{plain_response, PlainCredentials};
///
/// let response = plain_response("user@example.com", "password123");
/// let creds = PlainCredentials::decode(&response).unwrap();
/// assert_eq!(creds.username, "user@example.com");
/// ```
#[must_use]
pub fn plain_response(username: &str, password: &str) -> String {
    let auth_string = format!("\0{username}\0{password}");
    STANDARD.encode(auth_string.as_bytes())
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
    fn test_plain_response_format() {
        let response = plain_response("test", "pass");
        let decoded = STANDARD.decode(&response).unwrap();
        let decoded_str = String::from_utf8(decoded).unwrap();

        assert_eq!(decoded_str, "\0test\0pass");
    }

    #[test]
    fn test_decode_without_authzid() {
        let creds = PlainCredentials::decode(&plain_response("alice", "secret")).unwrap();
        assert_eq!(creds.authzid, None);
        assert_eq!(creds.username, "alice");
        assert_eq!(creds.password, "secret");
        assert_eq!(creds.effective_identity(), "alice");
    }

    #[test]
    fn test_decode_with_authzid() {
        let creds = PlainCredentials::from_bytes(b"admin\0alice\0secret").unwrap();
        assert_eq!(creds.authzid.as_deref(), Some("admin"));
        assert_eq!(creds.effective_identity(), "admin");
    }

    #[test]
    fn test_password_may_contain_special_chars() {
        let creds = PlainCredentials::decode(&plain_response("user", "pass@word!")).unwrap();
        assert_eq!(creds.password, "pass@word!");
    }

    #[test]
    fn test_rejects_missing_field() {
        let err = PlainCredentials::from_bytes(b"alice\0secret").unwrap_err();
        assert!(matches!(err, Error::Malformed { mechanism: "PLAIN", .. }));
    }

    #[test]
    fn test_rejects_extra_field() {
        assert!(PlainCredentials::from_bytes(b"\0alice\0secret\0more").is_err());
    }

    #[test]
    fn test_rejects_empty_username() {
        assert!(PlainCredentials::from_bytes(b"\0\0secret").is_err());
    }

    #[test]
    fn test_rejects_empty_password() {
        assert!(PlainCredentials::from_bytes(b"\0alice\0").is_err());
    }

    #[test]
    fn test_rejects_bad_base64() {
        let err = PlainCredentials::decode("not base64!").unwrap_err();
        assert!(matches!(err, Error::Base64(_)));
    }

    #[test]
    fn test_rejects_non_utf8() {
        let err = PlainCredentials::from_bytes(b"\0al\xffice\0secret").unwrap_err();
        assert!(matches!(err, Error::NonUtf8));
    }

    #[test]
    fn test_debug_redacts_password() {
        let creds = PlainCredentials::from_bytes(b"\0alice\0hunter2").unwrap();
        let debug = format!("{creds:?}");
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("alice"));
    }
}
