//! Backend configuration.
//!
//! Loaded from JSON or built in code:
//!
//! ```
//! use mailgate_core::BackendConfig;
//!
//! let config = BackendConfig::from_json(r#"{
//!     "require_auth": true,
//!     "users": { "alice": "secret" },
//!     "mailboxes": { "bob@example.com": 100 }
//! }"#)?;
//! assert!(config.require_auth);
//! # Ok::<(), mailgate_core::Error>(())
//! ```

use std::collections::HashMap;

use serde::Deserialize;

use crate::error::{Error, Result};

/// Default maximum message size (25 MiB).
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 25 * 1024 * 1024;

/// Default maximum recipients per transaction (RFC 5321 minimum).
pub const DEFAULT_MAX_RECIPIENTS: usize = 100;

/// Configuration for [`MemoryBackend`](crate::MemoryBackend).
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BackendConfig {
    /// Reject MAIL until the client authenticates.
    pub require_auth: bool,
    /// PLAIN credentials: username to password.
    pub users: HashMap<String, String>,
    /// OAUTHBEARER tokens: token to username.
    pub bearer_tokens: HashMap<String, String>,
    /// Known mailboxes: address to quota in messages (`0` = unlimited).
    pub mailboxes: HashMap<String, usize>,
    /// Create unknown mailboxes on first delivery instead of rejecting RCPT.
    pub auto_create_mailboxes: bool,
    /// Largest accepted body in bytes.
    pub max_message_size: usize,
    /// Largest number of RCPT entries per transaction.
    pub max_recipients: usize,
    /// Accept SMTPUTF8 transactions.
    pub allow_smtputf8: bool,
    /// Accept `BODY=BINARYMIME`.
    pub allow_binarymime: bool,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            require_auth: false,
            users: HashMap::new(),
            bearer_tokens: HashMap::new(),
            mailboxes: HashMap::new(),
            auto_create_mailboxes: false,
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            max_recipients: DEFAULT_MAX_RECIPIENTS,
            allow_smtputf8: true,
            allow_binarymime: false,
        }
    }
}

impl BackendConfig {
    /// Creates a configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses and validates a JSON configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is invalid or fails validation.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate().map_err(Error::Config)?;
        Ok(config)
    }

    /// Requires authentication before MAIL.
    #[must_use]
    pub const fn require_auth(mut self, require: bool) -> Self {
        self.require_auth = require;
        self
    }

    /// Adds a PLAIN user.
    #[must_use]
    pub fn user(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.users.insert(username.into(), password.into());
        self
    }

    /// Adds an OAUTHBEARER token for a user.
    #[must_use]
    pub fn bearer_token(mut self, token: impl Into<String>, username: impl Into<String>) -> Self {
        self.bearer_tokens.insert(token.into(), username.into());
        self
    }

    /// Adds a mailbox with a quota in messages (`0` = unlimited).
    #[must_use]
    pub fn mailbox(mut self, address: impl Into<String>, quota: usize) -> Self {
        self.mailboxes.insert(address.into(), quota);
        self
    }

    /// Creates unknown mailboxes on demand.
    #[must_use]
    pub const fn auto_create_mailboxes(mut self, enabled: bool) -> Self {
        self.auto_create_mailboxes = enabled;
        self
    }

    /// Sets the maximum message size in bytes.
    #[must_use]
    pub const fn max_message_size(mut self, bytes: usize) -> Self {
        self.max_message_size = bytes;
        self
    }

    /// Sets the maximum recipients per transaction.
    #[must_use]
    pub const fn max_recipients(mut self, count: usize) -> Self {
        self.max_recipients = count;
        self
    }

    /// Enables or disables SMTPUTF8.
    #[must_use]
    pub const fn allow_smtputf8(mut self, enabled: bool) -> Self {
        self.allow_smtputf8 = enabled;
        self
    }

    /// Enables or disables `BODY=BINARYMIME`.
    #[must_use]
    pub const fn allow_binarymime(mut self, enabled: bool) -> Self {
        self.allow_binarymime = enabled;
        self
    }

    /// Returns true if any authentication mechanism is configured.
    #[must_use]
    pub fn auth_enabled(&self) -> bool {
        !self.users.is_empty() || !self.bearer_tokens.is_empty()
    }

    /// Checks the configuration for contradictions.
    ///
    /// # Errors
    ///
    /// Returns every problem found.
    pub fn validate(&self) -> std::result::Result<(), Vec<ConfigError>> {
        let mut errors = Vec::new();

        if self.max_message_size == 0 {
            errors.push(ConfigError::ZeroMessageSize);
        }
        if self.max_recipients == 0 {
            errors.push(ConfigError::ZeroRecipients);
        }
        if self.require_auth && !self.auth_enabled() {
            errors.push(ConfigError::AuthWithoutUsers);
        }
        if self.mailboxes.is_empty() && !self.auto_create_mailboxes {
            errors.push(ConfigError::NoMailboxes);
        }
        for user in self.users.keys().chain(self.bearer_tokens.values()) {
            if user.is_empty() {
                errors.push(ConfigError::EmptyUsername);
                break;
            }
        }
        for address in self.mailboxes.keys() {
            if address.is_empty() {
                errors.push(ConfigError::EmptyMailbox);
                break;
            }
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

/// A problem found by [`BackendConfig::validate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// `max_message_size` is zero.
    ZeroMessageSize,
    /// `max_recipients` is zero.
    ZeroRecipients,
    /// `require_auth` is set but nobody can authenticate.
    AuthWithoutUsers,
    /// No mailboxes and auto-creation is off, so every RCPT would fail.
    NoMailboxes,
    /// A username is empty.
    EmptyUsername,
    /// A mailbox address is empty.
    EmptyMailbox,
}

impl ConfigError {
    /// Get human-readable error message.
    #[must_use]
    pub const fn message(&self) -> &'static str {
        match self {
            Self::ZeroMessageSize => "max_message_size must be greater than zero",
            Self::ZeroRecipients => "max_recipients must be greater than zero",
            Self::AuthWithoutUsers => "require_auth is set but no users or tokens are configured",
            Self::NoMailboxes => "no mailboxes configured and auto_create_mailboxes is off",
            Self::EmptyUsername => "usernames must not be empty",
            Self::EmptyMailbox => "mailbox addresses must not be empty",
        }
    }

    /// Get the field name this error relates to.
    #[must_use]
    pub const fn field(&self) -> &'static str {
        match self {
            Self::ZeroMessageSize => "max_message_size",
            Self::ZeroRecipients => "max_recipients",
            Self::AuthWithoutUsers => "require_auth",
            Self::NoMailboxes | Self::EmptyMailbox => "mailboxes",
            Self::EmptyUsername => "users",
        }
    }
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ConfigError {}

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
    fn defaults() {
        let config = BackendConfig::new();
        assert!(!config.require_auth);
        assert_eq!(config.max_message_size, DEFAULT_MAX_MESSAGE_SIZE);
        assert_eq!(config.max_recipients, DEFAULT_MAX_RECIPIENTS);
        assert!(config.allow_smtputf8);
        assert!(!config.allow_binarymime);
        assert!(!config.auth_enabled());
    }

    #[test]
    fn builder() {
        let config = BackendConfig::new()
            .require_auth(true)
            .user("alice", "secret")
            .bearer_token("t0k3n", "alice")
            .mailbox("bob@example.com", 2)
            .max_recipients(5);
        assert!(config.auth_enabled());
        assert_eq!(config.mailboxes.get("bob@example.com"), Some(&2));
        assert_eq!(config.bearer_tokens.get("t0k3n").map(String::as_str), Some("alice"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn from_json_fills_defaults() {
        let config = BackendConfig::from_json(r#"{"auto_create_mailboxes": true}"#).unwrap();
        assert!(config.auto_create_mailboxes);
        assert_eq!(config.max_recipients, DEFAULT_MAX_RECIPIENTS);
    }

    #[test]
    fn from_json_rejects_unknown_fields() {
        let err = BackendConfig::from_json(r#"{"auto_create_mailboxes": true, "bogus": 1}"#)
            .unwrap_err();
        assert!(matches!(err, Error::Serde(_)));
    }

    #[test]
    fn from_json_runs_validation() {
        let err = BackendConfig::from_json(r#"{"require_auth": true}"#).unwrap_err();
        let Error::Config(errors) = err else {
            panic!("expected validation failure");
        };
        assert!(errors.contains(&ConfigError::AuthWithoutUsers));
        assert!(errors.contains(&ConfigError::NoMailboxes));
    }

    #[test]
    fn validate_collects_all_errors() {
        let config = BackendConfig::new()
            .auto_create_mailboxes(true)
            .max_message_size(0)
            .max_recipients(0);
        let errors = config.validate().unwrap_err();
        assert_eq!(
            errors,
            vec![ConfigError::ZeroMessageSize, ConfigError::ZeroRecipients]
        );
    }

    #[test]
    fn validate_rejects_empty_names() {
        let config = BackendConfig::new().user("", "pw").mailbox("", 0);
        let errors = config.validate().unwrap_err();
        assert!(errors.contains(&ConfigError::EmptyUsername));
        assert!(errors.contains(&ConfigError::EmptyMailbox));
    }

    #[test]
    fn config_error_fields() {
        assert_eq!(ConfigError::NoMailboxes.field(), "mailboxes");
        assert_eq!(
            ConfigError::ZeroRecipients.to_string(),
            "max_recipients must be greater than zero"
        );
    }
}
