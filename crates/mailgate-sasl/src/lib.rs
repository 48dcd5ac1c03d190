//! # mailgate-sasl
//!
//! SASL types exchanged between a mail server's protocol layer and its
//! session logic.
//!
//! The protocol layer owns the challenge/response exchange. This crate only
//! decodes what the client sent and encodes what the server must answer:
//!
//! - **PLAIN** (RFC 4616): [`PlainCredentials`]
//! - **OAUTHBEARER** (RFC 7628): [`OAuthBearerOptions`] and the structured
//!   failure [`OAuthBearerError`]
//!
//! ## Quick Start
//!
//! ```
//! use mailgate_sasl::{OAuthBearerError, OAuthBearerOptions, PlainCredentials};
//! use mailgate_sasl::plain::plain_response;
//!
//! let creds = PlainCredentials::decode(&plain_response("alice", "secret"))?;
//! assert_eq!(creds.username, "alice");
//!
//! let opts = OAuthBearerOptions::parse("n,a=alice,\x01auth=Bearer t0k3n\x01\x01")?;
//! assert_eq!(opts.token, "t0k3n");
//!
//! // Sent back to the client as the failure challenge
//! let challenge = OAuthBearerError::invalid_token().challenge()?;
//! assert!(!challenge.is_empty());
//! # Ok::<(), mailgate_sasl::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod error;
pub mod oauthbearer;
pub mod plain;

pub use error::{Error, Result};
pub use oauthbearer::{OAuthBearerError, OAuthBearerOptions};
pub use plain::PlainCredentials;
