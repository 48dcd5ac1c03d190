//! Transaction state tracking for session implementations.
//!
//! ```text
//! ┌──────┐  begin   ┌───────────┐  add_recipient  ┌────────────────┐  mark_submitted  ┌───────────────┐
//! │ Idle │ ───────→ │ SenderSet │ ──────────────→ │ RecipientAdded │ ───────────────→ │ BodySubmitted │
//! └──────┘          └───────────┘                 └────────────────┘                  └───────────────┘
//!     ↑                                                                                       │
//!     └──────────────────────────────── reset (from any state) ───────────────────────────────┘
//! ```
//!
//! A new `begin` is also accepted from `BodySubmitted`, which starts a fresh
//! transaction on the same connection.

use crate::error::{Error, Result};
use crate::options::MailOptions;

/// Where a transaction stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransactionState {
    /// No transaction in progress.
    #[default]
    Idle,
    /// MAIL FROM accepted.
    SenderSet,
    /// At least one RCPT TO accepted.
    RecipientAdded,
    /// DATA completed; only reset or a new MAIL FROM may follow.
    BodySubmitted,
}

/// Envelope of the transaction in progress.
#[derive(Debug, Clone, Default)]
pub struct Transaction {
    state: TransactionState,
    sender: Option<String>,
    options: MailOptions,
    recipients: Vec<String>,
}

impl Transaction {
    /// Creates an idle transaction.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current state.
    #[must_use]
    pub const fn state(&self) -> TransactionState {
        self.state
    }

    /// Returns the reverse-path, if MAIL FROM was accepted.
    #[must_use]
    pub fn sender(&self) -> Option<&str> {
        self.sender.as_deref()
    }

    /// Returns the MAIL FROM parameters of the current transaction.
    #[must_use]
    pub const fn options(&self) -> &MailOptions {
        &self.options
    }

    /// Returns every accepted recipient in order, duplicates included.
    #[must_use]
    pub fn recipients(&self) -> &[String] {
        &self.recipients
    }

    /// Returns each recipient address once, in first-seen order.
    #[must_use]
    pub fn distinct_recipients(&self) -> Vec<&str> {
        let mut seen = Vec::with_capacity(self.recipients.len());
        for rcpt in &self.recipients {
            if !seen.contains(&rcpt.as_str()) {
                seen.push(rcpt.as_str());
            }
        }
        seen
    }

    /// Starts a transaction.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BadSequence`] if a transaction is already open.
    pub fn begin(&mut self, from: &str, options: &MailOptions) -> Result<()> {
        match self.state {
            TransactionState::Idle | TransactionState::BodySubmitted => {
                self.recipients.clear();
                self.sender = Some(from.to_string());
                self.options = options.clone();
                self.state = TransactionState::SenderSet;
                Ok(())
            }
            TransactionState::SenderSet | TransactionState::RecipientAdded => {
                Err(Error::bad_sequence("nested MAIL command"))
            }
        }
    }

    /// Adds a recipient. Duplicates are kept as separate entries.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BadSequence`] unless MAIL FROM was accepted.
    pub fn add_recipient(&mut self, to: &str) -> Result<()> {
        self.check_open()?;
        self.recipients.push(to.to_string());
        self.state = TransactionState::RecipientAdded;
        Ok(())
    }

    /// Checks that a recipient may be added now.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BadSequence`] unless MAIL FROM was accepted.
    pub fn check_open(&self) -> Result<()> {
        match self.state {
            TransactionState::SenderSet | TransactionState::RecipientAdded => Ok(()),
            TransactionState::Idle | TransactionState::BodySubmitted => {
                Err(Error::bad_sequence("need MAIL before RCPT"))
            }
        }
    }

    /// Checks that a body may be submitted now.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BadSequence`] without recipients or after a body was
    /// already submitted.
    pub fn check_ready(&self) -> Result<()> {
        match self.state {
            TransactionState::RecipientAdded => Ok(()),
            TransactionState::Idle => Err(Error::bad_sequence("need MAIL before DATA")),
            TransactionState::SenderSet => Err(Error::bad_sequence("need RCPT before DATA")),
            TransactionState::BodySubmitted => {
                Err(Error::bad_sequence("body already submitted for this transaction"))
            }
        }
    }

    /// Records that the body was submitted.
    ///
    /// # Errors
    ///
    /// Same as [`Transaction::check_ready`].
    pub fn mark_submitted(&mut self) -> Result<()> {
        self.check_ready()?;
        self.state = TransactionState::BodySubmitted;
        Ok(())
    }

    /// Discards the transaction. Never fails and may be repeated.
    pub fn reset(&mut self) {
        self.state = TransactionState::Idle;
        self.sender = None;
        self.options = MailOptions::default();
        self.recipients.clear();
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

    fn with_recipients(rcpts: &[&str]) -> Transaction {
        let mut tx = Transaction::new();
        tx.begin("alice@example.com", &MailOptions::new()).unwrap();
        for rcpt in rcpts {
            tx.add_recipient(rcpt).unwrap();
        }
        tx
    }

    mod happy_path {
        use super::*;

        #[test]
        fn full_cycle() {
            let mut tx = with_recipients(&["bob@example.com"]);
            assert_eq!(tx.state(), TransactionState::RecipientAdded);
            tx.mark_submitted().unwrap();
            assert_eq!(tx.state(), TransactionState::BodySubmitted);
        }

        #[test]
        fn keeps_duplicates_in_order() {
            let tx = with_recipients(&["bob", "carol", "bob"]);
            assert_eq!(tx.recipients(), ["bob", "carol", "bob"]);
            assert_eq!(tx.distinct_recipients(), vec!["bob", "carol"]);
        }

        #[test]
        fn begin_after_submission_starts_fresh() {
            let mut tx = with_recipients(&["bob"]);
            tx.mark_submitted().unwrap();
            tx.begin("dave@example.com", &MailOptions::new()).unwrap();
            assert_eq!(tx.state(), TransactionState::SenderSet);
            assert!(tx.recipients().is_empty());
            assert_eq!(tx.sender(), Some("dave@example.com"));
        }

        #[test]
        fn keeps_options_verbatim() {
            let mut tx = Transaction::new();
            tx.begin("a", &MailOptions::new().with_auth("")).unwrap();
            tx.add_recipient("b").unwrap();
            assert!(tx.options().is_auth_empty());
        }
    }

    mod sequencing {
        use super::*;

        #[test]
        fn rcpt_before_mail() {
            let mut tx = Transaction::new();
            assert!(matches!(tx.add_recipient("bob"), Err(Error::BadSequence(_))));
        }

        #[test]
        fn nested_mail() {
            let mut tx = with_recipients(&["bob"]);
            assert!(matches!(
                tx.begin("eve", &MailOptions::new()),
                Err(Error::BadSequence(_))
            ));
            assert_eq!(tx.recipients(), ["bob"]);
        }

        #[test]
        fn data_without_recipients() {
            let mut tx = Transaction::new();
            tx.begin("alice", &MailOptions::new()).unwrap();
            assert!(matches!(tx.check_ready(), Err(Error::BadSequence(_))));
        }

        #[test]
        fn data_twice() {
            let mut tx = with_recipients(&["bob"]);
            tx.mark_submitted().unwrap();
            assert!(matches!(tx.mark_submitted(), Err(Error::BadSequence(_))));
        }

        #[test]
        fn rcpt_after_submission() {
            let mut tx = with_recipients(&["bob"]);
            tx.mark_submitted().unwrap();
            assert!(tx.add_recipient("carol").is_err());
        }
    }

    mod reset {
        use super::*;

        #[test]
        fn clears_everything_from_any_state() {
            for rcpts in [&[][..], &["bob"][..], &["bob", "bob"][..]] {
                let mut tx = with_recipients(rcpts);
                tx.reset();
                assert_eq!(tx.state(), TransactionState::Idle);
                assert!(tx.sender().is_none());
                assert!(tx.recipients().is_empty());
                assert_eq!(tx.options(), &MailOptions::default());
            }
        }

        #[test]
        fn is_idempotent() {
            let mut tx = Transaction::new();
            tx.reset();
            tx.reset();
            assert_eq!(tx.state(), TransactionState::Idle);
        }

        #[test]
        fn then_begin_has_no_residual_recipients() {
            let mut tx = with_recipients(&["bob", "carol"]);
            tx.reset();
            tx.begin("alice", &MailOptions::new()).unwrap();
            tx.add_recipient("dave").unwrap();
            assert_eq!(tx.recipients(), ["dave"]);
        }
    }
}
