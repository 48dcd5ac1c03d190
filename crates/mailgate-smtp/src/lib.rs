//! # mailgate-smtp
//!
//! The contract between an SMTP/LMTP server's protocol layer and the logic
//! that decides what to do with mail.
//!
//! ## Features
//!
//! - **Session lifecycle**: [`Backend`] creates one [`Session`] per connection;
//!   the protocol layer drives it through RSET, AUTH, MAIL, RCPT, DATA and QUIT
//! - **LMTP per-recipient status**: optional [`LmtpSession`] extension, found
//!   at runtime through [`Session::as_lmtp`]
//! - **Coded rejections**: [`SmtpError`] carries the reply code, RFC 3463
//!   enhanced code and text; well-known rejections are constants such as
//!   [`SmtpError::AUTH_REQUIRED`]
//! - **Transaction tracking**: [`Transaction`] enforces command order for
//!   session implementations
//!
//! ## Quick Start
//!
//! ```ignore
//! use mailgate_smtp::{delivery, Backend, ConnContext, MailOptions, Protocol};
//!
//! let conn = ConnContext::new(Protocol::Lmtp);
//! let mut session = backend.new_session(&conn).await?;
//!
//! session.mail("alice@example.com", &MailOptions::new()).await?;
//! session.rcpt("bob@example.com").await?;
//! session.rcpt("carol@example.com").await?;
//!
//! let recipients = vec!["bob@example.com".into(), "carol@example.com".into()];
//! let outcome = delivery::submit(session.as_mut(), conn.protocol, &mut body, &recipients).await;
//! for rcpt in outcome.recipients() {
//!     // one reply line per recipient
//! }
//!
//! session.logout().await?;
//! ```
//!
//! ## Transaction States
//!
//! ```text
//! ┌──────┐
//! │ Idle │ ─── mail() ───→ SenderSet ─── rcpt() ───→ RecipientAdded ─── data() ───→ BodySubmitted
//! └──────┘
//!    ↑
//!    └─── reset() from any state
//! ```
//!
//! ## Modules
//!
//! - [`delivery`]: DATA submission with LMTP capability query and fallback
//! - [`session`]: The backend and session traits
//! - [`transaction`]: Transaction state tracking
//! - [`types`]: Reply codes, enhanced codes, coded errors

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod conn;
pub mod delivery;
mod error;
mod options;
pub mod session;
pub mod transaction;
pub mod types;

pub use conn::{ConnContext, Protocol};
pub use delivery::{Delivery, RecipientOutcome, RecipientStatuses};
pub use error::{BearerAuthError, Error, Result};
pub use options::{BodyType, MailOptions};
pub use session::{Backend, Body, LmtpSession, Session, StatusCollector};
pub use transaction::{Transaction, TransactionState};
pub use types::{AuthMechanism, EnhancedCode, ReplyCode, SmtpError};

pub use mailgate_sasl::{OAuthBearerError, OAuthBearerOptions};
