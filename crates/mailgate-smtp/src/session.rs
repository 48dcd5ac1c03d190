//! The contract between the protocol layer and backend logic.
//!
//! The protocol layer accepts a connection, asks a [`Backend`] for a
//! [`Session`], and calls the session once per command. A returned error
//! becomes the reply; `Ok` is acknowledged with the usual success reply.
//!
//! # Example
//!
//! ```
//! use async_trait::async_trait;
//! use mailgate_smtp::{Backend, Body, ConnContext, MailOptions, Result, Session, SmtpError};
//! use tokio::io::AsyncReadExt;
//!
//! struct Sink;
//!
//! struct SinkSession {
//!     authenticated: bool,
//! }
//!
//! #[async_trait]
//! impl Backend for Sink {
//!     async fn new_session(&self, _conn: &ConnContext) -> Result<Box<dyn Session>> {
//!         Ok(Box::new(SinkSession { authenticated: false }))
//!     }
//! }
//!
//! #[async_trait]
//! impl Session for SinkSession {
//!     fn reset(&mut self) {}
//!
//!     async fn logout(&mut self) -> Result<()> {
//!         Ok(())
//!     }
//!
//!     async fn mail(&mut self, _from: &str, _opts: &MailOptions) -> Result<()> {
//!         if !self.authenticated {
//!             return Err(SmtpError::AUTH_REQUIRED.into());
//!         }
//!         Ok(())
//!     }
//!
//!     async fn rcpt(&mut self, _to: &str) -> Result<()> {
//!         Ok(())
//!     }
//!
//!     async fn data(&mut self, body: &mut Body<'_>) -> Result<()> {
//!         let mut discard = Vec::new();
//!         body.read_to_end(&mut discard).await?;
//!         Ok(())
//!     }
//! }
//! ```

use async_trait::async_trait;
use mailgate_sasl::OAuthBearerOptions;
use tokio::io::AsyncRead;

use crate::conn::ConnContext;
use crate::error::{BearerAuthError, Result};
use crate::options::MailOptions;
use crate::types::{AuthMechanism, SmtpError};

/// Message body stream, borrowed for the duration of one call.
///
/// The protocol layer reclaims the stream as soon as the call returns, so a
/// session must finish reading (or give up) before returning.
pub type Body<'a> = dyn AsyncRead + Unpin + Send + 'a;

/// Produces one [`Session`] per accepted connection.
///
/// Called concurrently from many connection tasks; any state shared between
/// sessions must be synchronized by the implementer.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Creates the session for a new connection.
    ///
    /// An error rejects the connection.
    async fn new_session(&self, conn: &ConnContext) -> Result<Box<dyn Session>>;

    /// Mechanisms the protocol layer should advertise in EHLO/LHLO.
    ///
    /// Empty by default, so AUTH is not advertised.
    fn auth_mechanisms(&self) -> Vec<AuthMechanism> {
        Vec::new()
    }
}

/// Per-connection session logic.
///
/// Methods are called sequentially by the connection's command loop.
#[async_trait]
pub trait Session: Send {
    /// Discards the transaction in progress. Never fails; may be repeated.
    fn reset(&mut self);

    /// Frees everything held by the session. Called once at teardown, possibly
    /// mid-transaction. An error is only logged by the caller.
    async fn logout(&mut self) -> Result<()>;

    /// Authenticates with SASL PLAIN.
    async fn auth_plain(&mut self, username: &str, password: &str) -> Result<()> {
        let _ = (username, password);
        Err(SmtpError::AUTH_UNSUPPORTED.into())
    }

    /// Authenticates with SASL OAUTHBEARER.
    ///
    /// A rejected token should be reported as
    /// [`BearerAuthError::Rejected`] so the client receives the JSON
    /// challenge the mechanism requires.
    async fn auth_oauthbearer(
        &mut self,
        opts: &OAuthBearerOptions,
    ) -> std::result::Result<(), BearerAuthError> {
        let _ = opts;
        Err(SmtpError::AUTH_UNSUPPORTED.into())
    }

    /// Starts a transaction with the given reverse-path.
    ///
    /// Must fail with [`SmtpError::AUTH_REQUIRED`] when authentication is
    /// mandatory and missing, and must fail when `opts.require_tls` is set on
    /// a connection without TLS.
    async fn mail(&mut self, from: &str, opts: &MailOptions) -> Result<()>;

    /// Adds a recipient. The same address may be added more than once.
    async fn rcpt(&mut self, to: &str) -> Result<()>;

    /// Receives the message body; the result applies to every recipient.
    ///
    /// `body` must not be read after this returns.
    async fn data(&mut self, body: &mut Body<'_>) -> Result<()>;

    /// Returns the LMTP extension if this session implements it.
    fn as_lmtp(&mut self) -> Option<&mut dyn LmtpSession> {
        None
    }
}

/// Per-recipient delivery status for LMTP.
///
/// Implement it alongside [`Session`] and override [`Session::as_lmtp`]:
///
/// ```ignore
/// fn as_lmtp(&mut self) -> Option<&mut dyn LmtpSession> {
///     Some(self)
/// }
/// ```
#[async_trait]
pub trait LmtpSession: Session {
    /// LMTP variant of [`Session::data`].
    ///
    /// Call `status.set_status` once for each distinct recipient address of
    /// the transaction, even if it was added several times. Recipients that
    /// get no status receive this method's return value instead. The sink
    /// is only valid until this returns.
    async fn lmtp_data(
        &mut self,
        body: &mut Body<'_>,
        status: &mut dyn StatusCollector,
    ) -> Result<()>;
}

/// Write-only sink for per-recipient outcomes.
pub trait StatusCollector: Send {
    /// Reports the outcome for one recipient: `Ok` accepts, `Err` rejects
    /// with that error's reply.
    fn set_status(&mut self, rcpt: &str, status: std::result::Result<(), SmtpError>);
}
