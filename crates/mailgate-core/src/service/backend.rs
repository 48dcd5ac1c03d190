//! Session factory.

use std::sync::Arc;

use async_trait::async_trait;
use mailgate_smtp::{AuthMechanism, Backend, ConnContext, Session};
use tracing::info;

use super::session::MemorySession;
use crate::config::BackendConfig;
use crate::error::{Error, Result};
use crate::store::MailboxStore;

/// Backend delivering into a shared [`MailboxStore`].
#[derive(Debug, Clone)]
pub struct MemoryBackend {
    config: Arc<BackendConfig>,
    store: MailboxStore,
}

impl MemoryBackend {
    /// Creates a backend after validating `config`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] listing every problem found.
    pub fn new(config: BackendConfig) -> Result<Self> {
        config.validate().map_err(Error::Config)?;
        let store = MailboxStore::from_config(&config);
        info!(
            mailboxes = config.mailboxes.len(),
            require_auth = config.require_auth,
            "Backend ready"
        );
        Ok(Self {
            config: Arc::new(config),
            store,
        })
    }

    /// Returns the configuration in use.
    #[must_use]
    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    /// Returns a handle to the shared store.
    #[must_use]
    pub fn store(&self) -> MailboxStore {
        self.store.clone()
    }

    /// Creates a session without boxing it.
    #[must_use]
    pub fn session(&self, conn: &ConnContext) -> MemorySession {
        MemorySession::new(conn.clone(), Arc::clone(&self.config), self.store.clone())
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn new_session(&self, conn: &ConnContext) -> mailgate_smtp::Result<Box<dyn Session>> {
        info!(
            conn = conn.id,
            protocol = ?conn.protocol,
            remote = ?conn.remote_addr,
            tls = conn.tls,
            "New session"
        );
        Ok(Box::new(self.session(conn)))
    }

    fn auth_mechanisms(&self) -> Vec<AuthMechanism> {
        let mut mechanisms = Vec::new();
        if !self.config.users.is_empty() {
            mechanisms.push(AuthMechanism::Plain);
        }
        if !self.config.bearer_tokens.is_empty() {
            mechanisms.push(AuthMechanism::OAuthBearer);
        }
        mechanisms
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
    use crate::config::ConfigError;
    use mailgate_smtp::Protocol;

    #[test]
    fn rejects_invalid_config() {
        let err = MemoryBackend::new(BackendConfig::new()).unwrap_err();
        assert!(matches!(err, Error::Config(ref e) if e == &[ConfigError::NoMailboxes]));
    }

    #[test]
    fn advertises_configured_mechanisms() {
        let none = MemoryBackend::new(BackendConfig::new().auto_create_mailboxes(true)).unwrap();
        assert!(none.auth_mechanisms().is_empty());

        let both = MemoryBackend::new(
            BackendConfig::new()
                .auto_create_mailboxes(true)
                .user("alice", "pw")
                .bearer_token("tok", "alice"),
        )
        .unwrap();
        assert_eq!(
            both.auth_mechanisms(),
            vec![AuthMechanism::Plain, AuthMechanism::OAuthBearer]
        );
    }

    #[tokio::test]
    async fn sessions_share_the_store() {
        let backend =
            MemoryBackend::new(BackendConfig::new().mailbox("bob@example.com", 0)).unwrap();
        let conn = ConnContext::new(Protocol::Smtp);
        let _first = backend.new_session(&conn).await.unwrap();
        let _second = backend.new_session(&conn).await.unwrap();
        assert_eq!(backend.store().mailboxes().await, vec!["bob@example.com"]);
    }
}
