//! Error types for the core library.

use mailgate_smtp::{EnhancedCode, ReplyCode, SmtpError};
use thiserror::Error;

use crate::config::ConfigError;

/// Errors that can occur in core operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// Configuration failed validation.
    #[error("Configuration error: {}", join(.0))]
    Config(Vec<ConfigError>),

    /// Mailbox not found.
    #[error("Mailbox not found: {0}")]
    MailboxNotFound(String),

    /// Mailbox quota reached.
    #[error("Mailbox full: {0}")]
    MailboxFull(String),
}

fn join(errors: &[ConfigError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl From<Error> for mailgate_smtp::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::MailboxNotFound(_) => SmtpError::NO_SUCH_MAILBOX.into(),
            Error::MailboxFull(_) => SmtpError::MAILBOX_FULL.into(),
            other => Self::Backend(anyhow::Error::new(other)),
        }
    }
}

impl Error {
    /// Maps this error to the reply a client receives.
    #[must_use]
    pub fn to_smtp_error(&self) -> SmtpError {
        match self {
            Self::MailboxNotFound(_) => SmtpError::NO_SUCH_MAILBOX,
            Self::MailboxFull(_) => SmtpError::MAILBOX_FULL,
            other => SmtpError::new(
                ReplyCode::LOCAL_ERROR,
                EnhancedCode::new(4, 3, 0),
                format!("Local error in processing: {other}"),
            ),
        }
    }
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

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
    fn mailbox_errors_map_to_fixed_replies() {
        let err = Error::MailboxNotFound("dave".into());
        assert_eq!(err.to_smtp_error(), SmtpError::NO_SUCH_MAILBOX);
        let smtp: mailgate_smtp::Error = Error::MailboxFull("bob".into()).into();
        assert_eq!(smtp.as_smtp(), Some(&SmtpError::MAILBOX_FULL));
    }

    #[test]
    fn config_error_lists_every_problem() {
        let err = Error::Config(vec![ConfigError::ZeroRecipients, ConfigError::NoMailboxes]);
        assert_eq!(
            err.to_string(),
            "Configuration error: max_recipients must be greater than zero; \
             no mailboxes configured and auto_create_mailboxes is off"
        );
        assert!(err.to_smtp_error().is_transient());
    }

    #[test]
    fn other_errors_become_backend_failures() {
        let smtp: mailgate_smtp::Error = Error::Config(vec![ConfigError::ZeroRecipients]).into();
        assert!(matches!(smtp, mailgate_smtp::Error::Backend(_)));
    }
}
