//! OAUTHBEARER mechanism (RFC 7628).
//!
//! The client sends a GS2 header followed by `\x01` separated key/value
//! pairs:
//!
//! ```text
//! n,a=user@example.com,\x01host=mx.example.com\x01port=587\x01auth=Bearer <token>\x01\x01
//! ```
//!
//! On failure the server does not answer with a plain reply line. It sends a
//! base64 JSON challenge ([`OAuthBearerError::challenge`]), waits for the
//! client's dummy `\x01` response, and only then fails the exchange.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

const MECHANISM: &str = "OAUTHBEARER";
const SEPARATOR: char = '\x01';

/// Options carried by an OAUTHBEARER initial client response.
#[derive(Clone, PartialEq, Eq)]
pub struct OAuthBearerOptions {
    /// Authorization identity from the GS2 header (`a=`), if present.
    pub username: Option<String>,
    /// Bearer token from the `auth` field.
    pub token: String,
    /// Host the client connected to, if sent.
    pub host: Option<String>,
    /// Port the client connected to, if sent.
    pub port: Option<u16>,
}

impl OAuthBearerOptions {
    /// Creates options with only a token.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            username: None,
            token: token.into(),
            host: None,
            port: None,
        }
    }

    /// Sets the authorization identity.
    #[must_use]
    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Decodes a base64 initial client response.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload is not base64 or not a valid
    /// OAUTHBEARER message.
    pub fn decode(response: &str) -> Result<Self> {
        let raw = STANDARD.decode(response.trim())?;
        let text = std::str::from_utf8(&raw).map_err(|_| Error::NonUtf8)?;
        Self::parse(text)
    }

    /// Parses a decoded initial client response.
    ///
    /// # Errors
    ///
    /// Returns an error if the GS2 header is invalid, channel binding is
    /// requested, or the `auth` field is missing or not a bearer token.
    pub fn parse(message: &str) -> Result<Self> {
        let (cb_flag, rest) = message
            .split_once(',')
            .ok_or_else(|| Error::malformed(MECHANISM, "missing GS2 header"))?;
        match cb_flag {
            "n" | "y" => {}
            flag if flag.starts_with("p=") => {
                return Err(Error::malformed(MECHANISM, "channel binding not supported"));
            }
            flag => {
                return Err(Error::malformed(
                    MECHANISM,
                    format!("invalid channel binding flag {flag:?}"),
                ));
            }
        }

        let (authzid, rest) = rest
            .split_once(',')
            .ok_or_else(|| Error::malformed(MECHANISM, "unterminated GS2 header"))?;
        let username = match authzid {
            "" => None,
            a => Some(unescape_saslname(a.strip_prefix("a=").ok_or_else(|| {
                Error::malformed(MECHANISM, format!("invalid authzid {a:?}"))
            })?)?),
        };

        let kvpairs = rest
            .strip_prefix(SEPARATOR)
            .and_then(|r| r.strip_suffix("\x01\x01"))
            .ok_or_else(|| Error::malformed(MECHANISM, "invalid key/value framing"))?;

        let mut token = None;
        let mut host = None;
        let mut port = None;
        for pair in kvpairs.split(SEPARATOR) {
            let (key, value) = pair
                .split_once('=')
                .ok_or_else(|| Error::malformed(MECHANISM, format!("invalid pair {pair:?}")))?;
            match key {
                "auth" => token = Some(parse_bearer(value)?),
                "host" => host = Some(value.to_string()),
                "port" => {
                    port = Some(value.parse::<u16>().map_err(|_| {
                        Error::malformed(MECHANISM, format!("invalid port {value:?}"))
                    })?);
                }
                // Unknown keys are allowed by the RFC.
                _ => {}
            }
        }

        let token = token.ok_or_else(|| Error::malformed(MECHANISM, "missing auth field"))?;
        Ok(Self {
            username,
            token,
            host,
            port,
        })
    }
}

// Keeps the token out of logs.
impl std::fmt::Debug for OAuthBearerOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthBearerOptions")
            .field("username", &self.username)
            .field("token", &"<redacted>")
            .field("host", &self.host)
            .field("port", &self.port)
            .finish()
    }
}

fn parse_bearer(value: &str) -> Result<String> {
    let (scheme, token) = value
        .split_once(' ')
        .ok_or_else(|| Error::malformed(MECHANISM, "auth field has no scheme"))?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(Error::malformed(
            MECHANISM,
            format!("unsupported auth scheme {scheme:?}"),
        ));
    }
    let token = token.trim();
    if token.is_empty() {
        return Err(Error::malformed(MECHANISM, "empty bearer token"));
    }
    Ok(token.to_string())
}

/// Reverses the GS2 `saslname` escaping (`=2C` for `,`, `=3D` for `=`).
fn unescape_saslname(name: &str) -> Result<String> {
    let mut out = String::with_capacity(name.len());
    let mut rest = name;
    while let Some(pos) = rest.find('=') {
        out.push_str(&rest[..pos]);
        let escape = rest.get(pos + 1..pos + 3);
        match escape {
            Some("2C") => out.push(','),
            Some("3D") => out.push('='),
            _ => {
                return Err(Error::malformed(
                    MECHANISM,
                    format!("invalid escape in authzid {name:?}"),
                ));
            }
        }
        rest = &rest[pos + 3..];
    }
    out.push_str(rest);
    Ok(out)
}

/// Generates OAUTHBEARER initial response (RFC 7628).
///
/// Format: `n,a=<user>,\x01auth=Bearer <token>\x01\x01`
///
/// # Example
///
/// ```
/// use mailgate_sasl::oauthbearer::{oauthbearer_response, OAuthBearerOptions};
///
/// let response = oauthbearer_response("user@example.com", "ya29.a0");
/// let opts = OAuthBearerOptions::decode(&response).unwrap();
/// assert_eq!(opts.token, "ya29.a0");
/// ```
#[must_use]
pub fn oauthbearer_response(user: &str, token: &str) -> String {
    let auth_string = format!("n,a={user},\x01auth=Bearer {token}\x01\x01");
    STANDARD.encode(auth_string.as_bytes())
}

/// Structured OAUTHBEARER failure (RFC 7628 section 3.2.2).
///
/// Serialized as `{"status":"invalid_token","schemes":"bearer","scope":"..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("OAUTHBEARER authentication failed: {status}")]
pub struct OAuthBearerError {
    /// Error status (e.g., `invalid_token`).
    pub status: String,
    /// Authentication schemes supported.
    pub schemes: String,
    /// `OAuth2` scope required.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

impl OAuthBearerError {
    /// Creates an error with the given status and schemes.
    #[must_use]
    pub fn new(status: impl Into<String>, schemes: impl Into<String>) -> Self {
        Self {
            status: status.into(),
            schemes: schemes.into(),
            scope: None,
        }
    }

    /// The usual rejection for an unknown or expired token.
    #[must_use]
    pub fn invalid_token() -> Self {
        Self::new("invalid_token", "bearer")
    }

    /// Sets the required scope.
    #[must_use]
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    /// Serializes the error to its JSON form.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Returns the base64 encoded JSON sent as the server challenge.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn challenge(&self) -> Result<String> {
        Ok(STANDARD.encode(self.to_json()?))
    }
}

/// Parses an OAUTHBEARER error JSON body.
///
/// # Errors
///
/// Returns an error if the response cannot be parsed.
pub fn parse_oauth_error(response: &str) -> Result<OAuthBearerError> {
    Ok(serde_json::from_str(response)?)
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

    mod options_tests {
        use super::*;

        #[test]
        fn test_parse_rfc_example() {
            let msg = "n,a=user@example.com,\x01host=server.example.com\x01port=143\x01auth=Bearer vF9dft4qmTc2Nvb3RlckBhbHRhdmlzdGEuY29tCg==\x01\x01";
            let opts = OAuthBearerOptions::parse(msg).unwrap();
            assert_eq!(opts.username.as_deref(), Some("user@example.com"));
            assert_eq!(opts.host.as_deref(), Some("server.example.com"));
            assert_eq!(opts.port, Some(143));
            assert_eq!(opts.token, "vF9dft4qmTc2Nvb3RlckBhbHRhdmlzdGEuY29tCg==");
        }

        #[test]
        fn test_parse_without_authzid() {
            let opts = OAuthBearerOptions::parse("n,,\x01auth=Bearer abc\x01\x01").unwrap();
            assert_eq!(opts.username, None);
            assert_eq!(opts.token, "abc");
            assert_eq!(opts.host, None);
            assert_eq!(opts.port, None);
        }

        #[test]
        fn test_scheme_is_case_insensitive() {
            let opts = OAuthBearerOptions::parse("n,,\x01auth=bearer abc\x01\x01").unwrap();
            assert_eq!(opts.token, "abc");
        }

        #[test]
        fn test_decode_round_trip_with_encoder() {
            let response = oauthbearer_response("test@test.com", "abc");
            let opts = OAuthBearerOptions::decode(&response).unwrap();
            assert_eq!(opts.username.as_deref(), Some("test@test.com"));
            assert_eq!(opts.token, "abc");
        }

        #[test]
        fn test_unescapes_authzid() {
            let opts =
                OAuthBearerOptions::parse("n,a=a=2Cb=3Dc,\x01auth=Bearer t\x01\x01").unwrap();
            assert_eq!(opts.username.as_deref(), Some("a,b=c"));
        }

        #[test]
        fn test_rejects_bad_escape() {
            assert!(OAuthBearerOptions::parse("n,a=a=ZZ,\x01auth=Bearer t\x01\x01").is_err());
        }

        #[test]
        fn test_rejects_channel_binding() {
            let err = OAuthBearerOptions::parse("p=tls-unique,,\x01auth=Bearer t\x01\x01")
                .unwrap_err();
            assert!(err.to_string().contains("channel binding"));
        }

        #[test]
        fn test_rejects_missing_auth() {
            assert!(OAuthBearerOptions::parse("n,,\x01host=x\x01\x01").is_err());
        }

        #[test]
        fn test_rejects_non_bearer_scheme() {
            assert!(OAuthBearerOptions::parse("n,,\x01auth=Basic abc\x01\x01").is_err());
        }

        #[test]
        fn test_rejects_bad_framing() {
            assert!(OAuthBearerOptions::parse("n,,auth=Bearer abc").is_err());
        }

        #[test]
        fn test_rejects_bad_port() {
            assert!(
                OAuthBearerOptions::parse("n,,\x01port=99999\x01auth=Bearer t\x01\x01").is_err()
            );
        }

        #[test]
        fn test_debug_redacts_token() {
            let opts = OAuthBearerOptions::new("sekrit").with_username("alice");
            let debug = format!("{opts:?}");
            assert!(!debug.contains("sekrit"));
            assert!(debug.contains("alice"));
        }
    }

    mod error_tests {
        use super::*;

        #[test]
        fn test_to_json_omits_missing_scope() {
            let json = OAuthBearerError::invalid_token().to_json().unwrap();
            assert_eq!(json, r#"{"status":"invalid_token","schemes":"bearer"}"#);
        }

        #[test]
        fn test_to_json_with_scope() {
            let err = OAuthBearerError::invalid_token().with_scope("mail");
            let json = err.to_json().unwrap();
            assert!(json.contains(r#""scope":"mail""#));
        }

        #[test]
        fn test_challenge_is_base64_json() {
            let err = OAuthBearerError::invalid_token();
            let decoded = STANDARD.decode(err.challenge().unwrap()).unwrap();
            let parsed = parse_oauth_error(std::str::from_utf8(&decoded).unwrap()).unwrap();
            assert_eq!(parsed, err);
        }

        #[test]
        fn test_parse_oauth_error() {
            let json = r#"{"status":"401","schemes":"bearer","scope":"https://mail.google.com/"}"#;
            let error = parse_oauth_error(json).unwrap();

            assert_eq!(error.status, "401");
            assert_eq!(error.schemes, "bearer");
            assert_eq!(error.scope.as_deref(), Some("https://mail.google.com/"));
        }

        #[test]
        fn test_display() {
            let err = OAuthBearerError::invalid_token();
            assert_eq!(err.to_string(), "OAUTHBEARER authentication failed: invalid_token");
        }
    }
}
