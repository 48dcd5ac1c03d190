//! Per-connection session over the shared store.

use std::sync::Arc;

use async_trait::async_trait;
use mailgate_sasl::{OAuthBearerError, OAuthBearerOptions, PlainCredentials};
use mailgate_smtp::{
    BearerAuthError, Body, BodyType, ConnContext, Error, LmtpSession, MailOptions, Result, Session,
    SmtpError, StatusCollector, Transaction,
};
use tokio::io::AsyncReadExt;
use tracing::{debug, info, warn};

use crate::config::BackendConfig;
use crate::store::{Envelope, MailboxStore};

/// Session that delivers into a [`MailboxStore`].
///
/// Policy comes from [`BackendConfig`]: authentication, REQUIRETLS,
/// SMTPUTF8 and `BODY=` support, size and recipient limits.
#[derive(Debug)]
pub struct MemorySession {
    conn: ConnContext,
    config: Arc<BackendConfig>,
    store: MailboxStore,
    user: Option<String>,
    tx: Transaction,
}

impl MemorySession {
    pub(crate) fn new(conn: ConnContext, config: Arc<BackendConfig>, store: MailboxStore) -> Self {
        Self {
            conn,
            config,
            store,
            user: None,
            tx: Transaction::new(),
        }
    }

    /// Returns the authenticated user, if any.
    #[must_use]
    pub fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }

    /// Returns the transaction in progress.
    #[must_use]
    pub const fn transaction(&self) -> &Transaction {
        &self.tx
    }

    /// Authenticates from a base64 SASL PLAIN initial response.
    ///
    /// An authorization identity other than the username is refused.
    ///
    /// # Errors
    ///
    /// Returns [`SmtpError::AUTH_INVALID`] for undecodable responses and
    /// whatever [`Session::auth_plain`] returns otherwise.
    pub async fn auth_plain_response(&mut self, response: &str) -> Result<()> {
        let credentials = PlainCredentials::decode(response).map_err(|err| {
            warn!(conn = self.conn.id, error = %err, "Malformed PLAIN response");
            Error::from(SmtpError::AUTH_INVALID)
        })?;
        if credentials.effective_identity() != credentials.username {
            warn!(
                conn = self.conn.id,
                username = %credentials.username,
                "PLAIN authorization identity refused"
            );
            return Err(SmtpError::AUTH_INVALID.into());
        }
        self.auth_plain(&credentials.username, &credentials.password)
            .await
    }

    fn check_authenticated(&self) -> Result<()> {
        if self.config.require_auth && self.user.is_none() {
            debug!(conn = self.conn.id, "MAIL before authentication");
            return Err(SmtpError::AUTH_REQUIRED.into());
        }
        Ok(())
    }

    fn check_options(&self, opts: &MailOptions) -> Result<()> {
        if opts.require_tls && !self.conn.tls {
            return Err(SmtpError::ENCRYPTION_REQUIRED.into());
        }
        if opts.utf8 && !self.config.allow_smtputf8 {
            return Err(SmtpError::UTF8_NOT_SUPPORTED.into());
        }
        if opts.body == Some(BodyType::BinaryMime) && !self.config.allow_binarymime {
            return Err(SmtpError::BODY_TYPE_NOT_SUPPORTED.into());
        }
        if opts
            .declared_size()
            .is_some_and(|size| size > self.config.max_message_size)
        {
            return Err(SmtpError::MESSAGE_TOO_BIG.into());
        }
        Ok(())
    }

    /// Marks the body submitted and reads it, up to the size limit.
    async fn receive(&mut self, body: &mut Body<'_>) -> Result<Vec<u8>> {
        self.tx.mark_submitted()?;

        let limit = self.config.max_message_size;
        let cap = u64::try_from(limit).unwrap_or(u64::MAX).saturating_add(1);
        let mut buf = Vec::new();
        (&mut *body).take(cap).read_to_end(&mut buf).await?;
        if buf.len() > limit {
            warn!(conn = self.conn.id, limit, "Message body over size limit");
            return Err(Error::MessageTooLarge(limit));
        }
        debug!(conn = self.conn.id, size = buf.len(), "Body received");
        Ok(buf)
    }

    fn envelope(&self) -> Envelope {
        let opts = self.tx.options();
        Envelope {
            from: self.tx.sender().unwrap_or_default().to_string(),
            body_type: opts.body,
            utf8: opts.utf8,
            auth: opts.auth.clone(),
            user: self.user.clone(),
            conn_id: self.conn.id,
        }
    }
}

#[async_trait]
impl Session for MemorySession {
    fn reset(&mut self) {
        debug!(conn = self.conn.id, "Transaction reset");
        self.tx.reset();
    }

    async fn logout(&mut self) -> Result<()> {
        info!(conn = self.conn.id, user = ?self.user, "Session closed");
        self.tx.reset();
        self.user = None;
        Ok(())
    }

    async fn auth_plain(&mut self, username: &str, password: &str) -> Result<()> {
        if self.config.users.is_empty() {
            return Err(SmtpError::AUTH_UNSUPPORTED.into());
        }
        if self.user.is_some() {
            return Err(Error::bad_sequence("already authenticated"));
        }
        match self.config.users.get(username) {
            Some(expected) if expected == password => {
                info!(conn = self.conn.id, username, "Authenticated with PLAIN");
                self.user = Some(username.to_string());
                Ok(())
            }
            _ => {
                warn!(conn = self.conn.id, username, "PLAIN authentication failed");
                Err(SmtpError::AUTH_INVALID.into())
            }
        }
    }

    async fn auth_oauthbearer(
        &mut self,
        opts: &OAuthBearerOptions,
    ) -> std::result::Result<(), BearerAuthError> {
        if self.config.bearer_tokens.is_empty() {
            return Err(SmtpError::AUTH_UNSUPPORTED.into());
        }
        if self.user.is_some() {
            return Err(Error::bad_sequence("already authenticated").into());
        }
        let owner = self.config.bearer_tokens.get(&opts.token);
        match owner {
            Some(owner) if opts.username.as_ref().is_none_or(|u| u == owner) => {
                info!(conn = self.conn.id, username = %owner, "Authenticated with OAUTHBEARER");
                self.user = Some(owner.clone());
                Ok(())
            }
            _ => {
                warn!(
                    conn = self.conn.id,
                    username = ?opts.username,
                    "OAUTHBEARER token rejected"
                );
                Err(OAuthBearerError::invalid_token().into())
            }
        }
    }

    async fn mail(&mut self, from: &str, opts: &MailOptions) -> Result<()> {
        self.check_authenticated()?;
        self.check_options(opts)?;
        self.tx.begin(from, opts)?;
        debug!(conn = self.conn.id, from, auth = ?opts.auth, "Sender accepted");
        Ok(())
    }

    async fn rcpt(&mut self, to: &str) -> Result<()> {
        self.tx.check_open()?;
        if self.tx.recipients().len() >= self.config.max_recipients {
            return Err(SmtpError::TOO_MANY_RECIPIENTS.into());
        }
        if !self.store.accepts(to).await {
            debug!(conn = self.conn.id, rcpt = to, "Unknown recipient");
            return Err(SmtpError::NO_SUCH_MAILBOX.into());
        }
        self.tx.add_recipient(to)?;
        debug!(conn = self.conn.id, rcpt = to, "Recipient accepted");
        Ok(())
    }

    async fn data(&mut self, body: &mut Body<'_>) -> Result<()> {
        let message = self.receive(body).await?;
        let envelope = self.envelope();
        let rcpts = self.tx.distinct_recipients();
        self.store
            .deliver_all(&rcpts, &envelope, &message)
            .await
            .map_err(|err| {
                warn!(conn = self.conn.id, error = %err, "Delivery refused");
                Error::from(err)
            })?;
        Ok(())
    }

    fn as_lmtp(&mut self) -> Option<&mut dyn LmtpSession> {
        Some(self)
    }
}

#[async_trait]
impl LmtpSession for MemorySession {
    async fn lmtp_data(
        &mut self,
        body: &mut Body<'_>,
        status: &mut dyn StatusCollector,
    ) -> Result<()> {
        let message = self.receive(body).await?;
        let envelope = self.envelope();
        for rcpt in self.tx.distinct_recipients() {
            let outcome = self
                .store
                .deliver(rcpt, &envelope, &message)
                .await
                .map(drop)
                .map_err(|err| {
                    debug!(conn = self.conn.id, rcpt, error = %err, "Recipient refused");
                    err.to_smtp_error()
                });
            status.set_status(rcpt, outcome);
        }
        Ok(())
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
    use mailgate_smtp::{Protocol, TransactionState};
    use tokio_test::io::Builder;

    fn session_with(config: BackendConfig, conn: ConnContext) -> MemorySession {
        let store = MailboxStore::from_config(&config);
        MemorySession::new(conn, Arc::new(config), store)
    }

    fn session(config: BackendConfig) -> MemorySession {
        session_with(config, ConnContext::new(Protocol::Smtp))
    }

    fn open() -> BackendConfig {
        BackendConfig::new()
            .mailbox("bob@example.com", 0)
            .mailbox("carol@example.com", 0)
    }

    mod auth {
        use super::*;

        fn secured() -> BackendConfig {
            open()
                .require_auth(true)
                .user("alice", "secret")
                .bearer_token("t0k3n", "alice")
        }

        #[tokio::test]
        async fn mail_requires_auth() {
            let mut s = session(secured());
            let err = s.mail("alice@example.com", &MailOptions::new()).await.unwrap_err();
            assert_eq!(err.as_smtp(), Some(&SmtpError::AUTH_REQUIRED));
        }

        #[tokio::test]
        async fn plain_success_unlocks_mail() {
            let mut s = session(secured());
            s.auth_plain("alice", "secret").await.unwrap();
            assert_eq!(s.user(), Some("alice"));
            s.mail("alice@example.com", &MailOptions::new()).await.unwrap();
        }

        #[tokio::test]
        async fn plain_bad_password() {
            let mut s = session(secured());
            let err = s.auth_plain("alice", "wrong").await.unwrap_err();
            assert_eq!(err.as_smtp(), Some(&SmtpError::AUTH_INVALID));
            assert!(s.user().is_none());
        }

        #[tokio::test]
        async fn plain_twice_is_a_sequencing_error() {
            let mut s = session(secured());
            s.auth_plain("alice", "secret").await.unwrap();
            let err = s.auth_plain("alice", "secret").await.unwrap_err();
            assert!(matches!(err, Error::BadSequence(_)));
        }

        #[tokio::test]
        async fn plain_without_users_is_unsupported() {
            let mut s = session(open());
            let err = s.auth_plain("alice", "secret").await.unwrap_err();
            assert_eq!(err.as_smtp(), Some(&SmtpError::AUTH_UNSUPPORTED));
        }

        #[tokio::test]
        async fn plain_response() {
            let mut s = session(secured());
            let response = mailgate_sasl::plain::plain_response("alice", "secret");
            s.auth_plain_response(&response).await.unwrap();
            assert_eq!(s.user(), Some("alice"));
        }

        #[tokio::test]
        async fn plain_response_garbage() {
            let mut s = session(secured());
            let err = s.auth_plain_response("!!!").await.unwrap_err();
            assert_eq!(err.as_smtp(), Some(&SmtpError::AUTH_INVALID));
        }

        #[tokio::test]
        async fn bearer_success() {
            let mut s = session(secured());
            let opts = OAuthBearerOptions::new("t0k3n").with_username("alice");
            s.auth_oauthbearer(&opts).await.unwrap();
            assert_eq!(s.user(), Some("alice"));
        }

        #[tokio::test]
        async fn bearer_wrong_user_is_rejected_with_payload() {
            let mut s = session(secured());
            let opts = OAuthBearerOptions::new("t0k3n").with_username("mallory");
            match s.auth_oauthbearer(&opts).await.unwrap_err() {
                BearerAuthError::Rejected(payload) => assert_eq!(payload.status, "invalid_token"),
                BearerAuthError::Smtp(err) => panic!("expected rejection, got {err}"),
            }
        }

        #[tokio::test]
        async fn bearer_without_tokens_is_unsupported() {
            let mut s = session(open());
            match s.auth_oauthbearer(&OAuthBearerOptions::new("x")).await.unwrap_err() {
                BearerAuthError::Smtp(err) => {
                    assert_eq!(err.as_smtp(), Some(&SmtpError::AUTH_UNSUPPORTED));
                }
                BearerAuthError::Rejected(_) => panic!("expected coded error"),
            }
        }

        #[tokio::test]
        async fn logout_drops_auth() {
            let mut s = session(secured());
            s.auth_plain("alice", "secret").await.unwrap();
            s.logout().await.unwrap();
            assert!(s.user().is_none());
        }
    }

    mod policy {
        use super::*;

        #[tokio::test]
        async fn requiretls_on_plaintext() {
            let mut s = session(open());
            let opts = MailOptions::new().with_require_tls(true);
            let err = s.mail("a@example.com", &opts).await.unwrap_err();
            assert_eq!(err.as_smtp(), Some(&SmtpError::ENCRYPTION_REQUIRED));
            assert_eq!(s.transaction().state(), TransactionState::Idle);
        }

        #[tokio::test]
        async fn requiretls_on_tls() {
            let mut s = session_with(open(), ConnContext::new(Protocol::Smtp).with_tls(true));
            let opts = MailOptions::new().with_require_tls(true);
            s.mail("a@example.com", &opts).await.unwrap();
        }

        #[tokio::test]
        async fn smtputf8_disabled() {
            let mut s = session(open().allow_smtputf8(false));
            let err = s
                .mail("a@example.com", &MailOptions::new().with_utf8(true))
                .await
                .unwrap_err();
            assert_eq!(err.as_smtp(), Some(&SmtpError::UTF8_NOT_SUPPORTED));
        }

        #[tokio::test]
        async fn binarymime_disabled() {
            let mut s = session(open());
            let opts = MailOptions::new().with_body(BodyType::BinaryMime);
            let err = s.mail("a@example.com", &opts).await.unwrap_err();
            assert_eq!(err.as_smtp(), Some(&SmtpError::BODY_TYPE_NOT_SUPPORTED));

            let mut s = session(open().allow_binarymime(true));
            s.mail("a@example.com", &opts).await.unwrap();
        }

        #[tokio::test]
        async fn declared_size_over_limit() {
            let mut s = session(open().max_message_size(10));
            let err = s
                .mail("a@example.com", &MailOptions::new().with_size(11))
                .await
                .unwrap_err();
            assert_eq!(err.as_smtp(), Some(&SmtpError::MESSAGE_TOO_BIG));
        }

        #[tokio::test]
        async fn unknown_recipient() {
            let mut s = session(open());
            s.mail("a@example.com", &MailOptions::new()).await.unwrap();
            let err = s.rcpt("dave@example.com").await.unwrap_err();
            assert_eq!(err.as_smtp(), Some(&SmtpError::NO_SUCH_MAILBOX));
        }

        #[tokio::test]
        async fn recipient_limit_counts_duplicates() {
            let mut s = session(open().max_recipients(2));
            s.mail("a@example.com", &MailOptions::new()).await.unwrap();
            s.rcpt("bob@example.com").await.unwrap();
            s.rcpt("bob@example.com").await.unwrap();
            let err = s.rcpt("carol@example.com").await.unwrap_err();
            assert_eq!(err.as_smtp(), Some(&SmtpError::TOO_MANY_RECIPIENTS));
        }

        #[tokio::test]
        async fn rcpt_before_mail() {
            let mut s = session(open());
            let err = s.rcpt("bob@example.com").await.unwrap_err();
            assert!(matches!(err, Error::BadSequence(_)));
        }
    }

    mod data {
        use super::*;

        async fn ready(s: &mut MemorySession) {
            s.mail("alice@example.com", &MailOptions::new()).await.unwrap();
            s.rcpt("bob@example.com").await.unwrap();
        }

        #[tokio::test]
        async fn body_over_limit() {
            let mut s = session(open().max_message_size(4));
            ready(&mut s).await;
            let mut body = Builder::new().read(b"12345").build();
            let err = s.data(&mut body).await.unwrap_err();
            assert!(matches!(err, Error::MessageTooLarge(4)));
            assert_eq!(s.store.count("bob@example.com").await, 0);
        }

        #[tokio::test]
        async fn body_at_limit() {
            let mut s = session(open().max_message_size(5));
            ready(&mut s).await;
            let mut body = Builder::new().read(b"12345").build();
            s.data(&mut body).await.unwrap();
            assert_eq!(s.store.count("bob@example.com").await, 1);
        }

        #[tokio::test]
        async fn data_without_recipients() {
            let mut s = session(open());
            s.mail("alice@example.com", &MailOptions::new()).await.unwrap();
            let mut body = Builder::new().build();
            let err = s.data(&mut body).await.unwrap_err();
            assert!(matches!(err, Error::BadSequence(_)));
        }

        #[tokio::test]
        async fn envelope_is_recorded() {
            let mut s = session(open());
            let opts = MailOptions::new()
                .with_auth("")
                .with_body(BodyType::EightBitMime);
            s.mail("alice@example.com", &opts).await.unwrap();
            s.rcpt("bob@example.com").await.unwrap();
            let mut body = Builder::new().read(b"hi").build();
            s.data(&mut body).await.unwrap();

            let stored = s.store.messages("bob@example.com").await;
            assert_eq!(stored[0].from, "alice@example.com");
            assert_eq!(stored[0].auth.as_deref(), Some(""));
            assert_eq!(stored[0].body_type, Some(BodyType::EightBitMime));
            assert_eq!(stored[0].conn_id, s.conn.id);
        }
    }
}
