//! Shared mailbox store.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info};

use super::model::{Envelope, StoredMessage};
use crate::config::BackendConfig;
use crate::{Error, Result};

#[derive(Debug, Default)]
struct Mailbox {
    /// Maximum messages held; `0` is unlimited.
    quota: usize,
    messages: Vec<StoredMessage>,
}

impl Mailbox {
    const fn with_quota(quota: usize) -> Self {
        Self {
            quota,
            messages: Vec::new(),
        }
    }

    fn is_full(&self) -> bool {
        self.quota != 0 && self.messages.len() >= self.quota
    }
}

#[derive(Debug, Default)]
struct Inner {
    mailboxes: HashMap<String, Mailbox>,
    next_id: u64,
}

impl Inner {
    /// Checks that `rcpt` can take one more message.
    fn check(&self, rcpt: &str, auto_create: bool) -> Result<()> {
        match self.mailboxes.get(rcpt) {
            Some(mailbox) if mailbox.is_full() => Err(Error::MailboxFull(rcpt.to_string())),
            Some(_) => Ok(()),
            None if auto_create => Ok(()),
            None => Err(Error::MailboxNotFound(rcpt.to_string())),
        }
    }

    fn insert(&mut self, rcpt: &str, envelope: &Envelope, body: &[u8]) -> u64 {
        self.next_id += 1;
        let id = self.next_id;
        let message = StoredMessage::new(id, rcpt, envelope, body.to_vec());
        self.mailboxes
            .entry(rcpt.to_string())
            .or_default()
            .messages
            .push(message);
        id
    }
}

/// Mailboxes shared by every session of a backend.
///
/// Cloning is cheap and yields a handle to the same storage.
#[derive(Debug, Clone, Default)]
pub struct MailboxStore {
    inner: Arc<RwLock<Inner>>,
    auto_create: bool,
}

impl MailboxStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new(auto_create: bool) -> Self {
        Self {
            inner: Arc::default(),
            auto_create,
        }
    }

    /// Creates a store holding the mailboxes of `config`.
    #[must_use]
    pub fn from_config(config: &BackendConfig) -> Self {
        let mailboxes = config
            .mailboxes
            .iter()
            .map(|(address, quota)| (address.clone(), Mailbox::with_quota(*quota)))
            .collect();
        Self {
            inner: Arc::new(RwLock::new(Inner {
                mailboxes,
                next_id: 0,
            })),
            auto_create: config.auto_create_mailboxes,
        }
    }

    /// Adds a mailbox, or changes the quota of an existing one.
    pub async fn add_mailbox(&self, address: impl Into<String>, quota: usize) {
        let address = address.into();
        debug!(mailbox = %address, quota, "Adding mailbox");
        let mut inner = self.inner.write().await;
        inner.mailboxes.entry(address).or_default().quota = quota;
    }

    /// Returns true if mail for `address` would be accepted at RCPT time.
    pub async fn accepts(&self, address: &str) -> bool {
        self.auto_create || self.inner.read().await.mailboxes.contains_key(address)
    }

    /// Checks that `address` can take one more message.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MailboxNotFound`] or [`Error::MailboxFull`].
    pub async fn check(&self, address: &str) -> Result<()> {
        self.inner.read().await.check(address, self.auto_create)
    }

    /// Delivers a copy of `body` to one mailbox.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MailboxNotFound`] or [`Error::MailboxFull`]; nothing
    /// is stored in that case.
    pub async fn deliver(&self, rcpt: &str, envelope: &Envelope, body: &[u8]) -> Result<u64> {
        let mut inner = self.inner.write().await;
        inner.check(rcpt, self.auto_create)?;
        let id = inner.insert(rcpt, envelope, body);
        info!(id, rcpt, from = %envelope.from, size = body.len(), "Message stored");
        Ok(id)
    }

    /// Delivers a copy of `body` to every mailbox in `rcpts`, or to none.
    ///
    /// All mailboxes are checked under one lock before anything is stored.
    ///
    /// # Errors
    ///
    /// Returns the first check failure.
    pub async fn deliver_all(
        &self,
        rcpts: &[&str],
        envelope: &Envelope,
        body: &[u8],
    ) -> Result<Vec<u64>> {
        let mut inner = self.inner.write().await;
        for rcpt in rcpts {
            inner.check(rcpt, self.auto_create)?;
        }
        let ids: Vec<u64> = rcpts
            .iter()
            .map(|rcpt| inner.insert(rcpt, envelope, body))
            .collect();
        info!(
            recipients = rcpts.len(),
            from = %envelope.from,
            size = body.len(),
            "Message stored for all recipients"
        );
        Ok(ids)
    }

    /// Returns the messages held by `address`, oldest first.
    pub async fn messages(&self, address: &str) -> Vec<StoredMessage> {
        self.inner
            .read()
            .await
            .mailboxes
            .get(address)
            .map(|mailbox| mailbox.messages.clone())
            .unwrap_or_default()
    }

    /// Returns the number of messages held by `address`.
    pub async fn count(&self, address: &str) -> usize {
        self.inner
            .read()
            .await
            .mailboxes
            .get(address)
            .map_or(0, |mailbox| mailbox.messages.len())
    }

    /// Returns every mailbox address, sorted.
    pub async fn mailboxes(&self) -> Vec<String> {
        let mut addresses: Vec<String> =
            self.inner.read().await.mailboxes.keys().cloned().collect();
        addresses.sort();
        addresses
    }

    /// Exports the messages of `address` as a JSON array.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub async fn export_json(&self, address: &str) -> Result<String> {
        let messages = self.messages(address).await;
        Ok(serde_json::to_string_pretty(&messages)?)
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

    fn envelope() -> Envelope {
        Envelope {
            from: "alice@example.com".to_string(),
            ..Envelope::default()
        }
    }

    async fn store() -> MailboxStore {
        let store = MailboxStore::new(false);
        store.add_mailbox("bob@example.com", 1).await;
        store.add_mailbox("carol@example.com", 0).await;
        store
    }

    mod deliver {
        use super::*;

        #[tokio::test]
        async fn stores_and_counts() {
            let store = store().await;
            let id = store
                .deliver("carol@example.com", &envelope(), b"hello")
                .await
                .unwrap();
            assert_eq!(id, 1);
            assert_eq!(store.count("carol@example.com").await, 1);
            let messages = store.messages("carol@example.com").await;
            assert_eq!(messages[0].body, b"hello");
            assert_eq!(messages[0].rcpt, "carol@example.com");
        }

        #[tokio::test]
        async fn unknown_mailbox() {
            let store = store().await;
            let err = store.deliver("dave@example.com", &envelope(), b"x").await;
            assert!(matches!(err, Err(Error::MailboxNotFound(_))));
        }

        #[tokio::test]
        async fn quota() {
            let store = store().await;
            store.deliver("bob@example.com", &envelope(), b"1").await.unwrap();
            let err = store.deliver("bob@example.com", &envelope(), b"2").await;
            assert!(matches!(err, Err(Error::MailboxFull(_))));
            assert_eq!(store.count("bob@example.com").await, 1);
        }

        #[tokio::test]
        async fn auto_create() {
            let store = MailboxStore::new(true);
            assert!(store.accepts("new@example.com").await);
            store.deliver("new@example.com", &envelope(), b"x").await.unwrap();
            assert_eq!(store.mailboxes().await, vec!["new@example.com"]);
        }
    }

    mod deliver_all {
        use super::*;

        #[tokio::test]
        async fn all_or_nothing() {
            let store = store().await;
            store.deliver("bob@example.com", &envelope(), b"fill").await.unwrap();

            let err = store
                .deliver_all(&["carol@example.com", "bob@example.com"], &envelope(), b"x")
                .await;
            assert!(matches!(err, Err(Error::MailboxFull(_))));
            assert_eq!(store.count("carol@example.com").await, 0);
        }

        #[tokio::test]
        async fn stores_one_copy_each() {
            let store = store().await;
            let ids = store
                .deliver_all(&["bob@example.com", "carol@example.com"], &envelope(), b"x")
                .await
                .unwrap();
            assert_eq!(ids, vec![1, 2]);
            assert_eq!(store.count("bob@example.com").await, 1);
            assert_eq!(store.count("carol@example.com").await, 1);
        }
    }

    #[tokio::test]
    async fn from_config_uses_quotas() {
        let config = BackendConfig::new().mailbox("bob@example.com", 1);
        let store = MailboxStore::from_config(&config);
        assert!(store.accepts("bob@example.com").await);
        assert!(!store.accepts("carol@example.com").await);
        store.deliver("bob@example.com", &envelope(), b"1").await.unwrap();
        assert!(matches!(
            store.check("bob@example.com").await,
            Err(Error::MailboxFull(_))
        ));
    }

    #[tokio::test]
    async fn clones_share_storage() {
        let store = store().await;
        let handle = store.clone();
        handle.deliver("carol@example.com", &envelope(), b"x").await.unwrap();
        assert_eq!(store.count("carol@example.com").await, 1);
    }

    #[tokio::test]
    async fn export_json() {
        let store = store().await;
        store.deliver("carol@example.com", &envelope(), b"hi").await.unwrap();
        let json = store.export_json("carol@example.com").await.unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value[0]["from"], "alice@example.com");
        assert_eq!(value[0]["body"], "hi");
    }
}
