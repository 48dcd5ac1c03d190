//! DATA submission with the LMTP capability query.
//!
//! [`submit`] is what a protocol layer calls once the body stream is ready.
//! On LMTP connections it asks the session for [`LmtpSession`] and, if
//! present, collects one status per recipient; otherwise it falls back to
//! [`Session::data`] and applies the single outcome to every recipient.

use std::collections::HashMap;

use crate::conn::Protocol;
use crate::session::{Body, Session, StatusCollector};
use crate::types::SmtpError;

/// Outcome for one recipient: `Ok` accepted, `Err` rejected.
pub type Outcome = Result<(), SmtpError>;

/// Outcome for one RCPT entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipientOutcome {
    /// Recipient address as given to RCPT TO.
    pub rcpt: String,
    /// Delivery outcome.
    pub outcome: Outcome,
}

/// Result of submitting a body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// SMTP: one reply for the whole message.
    Single(Outcome),
    /// LMTP: one reply per RCPT entry, in RCPT order.
    PerRecipient(Vec<RecipientOutcome>),
}

impl Delivery {
    /// Returns the per-recipient outcomes, if any.
    #[must_use]
    pub fn recipients(&self) -> &[RecipientOutcome] {
        match self {
            Self::Single(_) => &[],
            Self::PerRecipient(outcomes) => outcomes,
        }
    }

    /// Returns the outcome reported for `rcpt`.
    ///
    /// For [`Delivery::Single`] this is the shared outcome.
    #[must_use]
    pub fn outcome_for(&self, rcpt: &str) -> Option<&Outcome> {
        match self {
            Self::Single(outcome) => Some(outcome),
            Self::PerRecipient(outcomes) => outcomes
                .iter()
                .find(|o| o.rcpt == rcpt)
                .map(|o| &o.outcome),
        }
    }

    /// Returns true if every recipient was accepted.
    #[must_use]
    pub fn all_accepted(&self) -> bool {
        match self {
            Self::Single(outcome) => outcome.is_ok(),
            Self::PerRecipient(outcomes) => outcomes.iter().all(|o| o.outcome.is_ok()),
        }
    }
}

/// Status collector used by [`submit`].
///
/// Accepts one report per known recipient while open. Reports for unknown
/// recipients, repeated reports, and anything after [`seal`](Self::seal) are
/// ignored, logged, and counted as violations.
#[derive(Debug, Default)]
pub struct RecipientStatuses {
    statuses: HashMap<String, Option<Outcome>>,
    sealed: bool,
    violations: usize,
}

impl RecipientStatuses {
    /// Creates a collector expecting the given recipients.
    pub fn new<'a>(recipients: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            statuses: recipients
                .into_iter()
                .map(|rcpt| (rcpt.to_string(), None))
                .collect(),
            sealed: false,
            violations: 0,
        }
    }

    /// Closes the collector; every later report is a violation.
    pub const fn seal(&mut self) {
        self.sealed = true;
    }

    /// Returns true once sealed.
    #[must_use]
    pub const fn is_sealed(&self) -> bool {
        self.sealed
    }

    /// Number of reports that broke the contract.
    #[must_use]
    pub const fn violations(&self) -> usize {
        self.violations
    }

    /// Returns the status reported for `rcpt`, if any.
    #[must_use]
    pub fn get(&self, rcpt: &str) -> Option<&Outcome> {
        self.statuses.get(rcpt).and_then(Option::as_ref)
    }

    /// Returns recipients that have not been reported yet.
    #[must_use]
    pub fn pending(&self) -> Vec<&str> {
        let mut pending: Vec<&str> = self
            .statuses
            .iter()
            .filter(|(_, status)| status.is_none())
            .map(|(rcpt, _)| rcpt.as_str())
            .collect();
        pending.sort_unstable();
        pending
    }

    /// Builds one outcome per RCPT entry, using `fallback` for recipients
    /// without a status.
    #[must_use]
    pub fn resolve(&self, recipients: &[String], fallback: &Outcome) -> Vec<RecipientOutcome> {
        recipients
            .iter()
            .map(|rcpt| RecipientOutcome {
                rcpt: rcpt.clone(),
                outcome: self.get(rcpt).unwrap_or(fallback).clone(),
            })
            .collect()
    }
}

impl StatusCollector for RecipientStatuses {
    fn set_status(&mut self, rcpt: &str, status: Outcome) {
        if self.sealed {
            self.violations += 1;
            tracing::error!(rcpt, "Status reported after LMTP data returned");
            return;
        }
        match self.statuses.get_mut(rcpt) {
            None => {
                self.violations += 1;
                tracing::warn!(rcpt, "Status reported for unknown recipient");
            }
            Some(slot) if slot.is_some() => {
                self.violations += 1;
                tracing::warn!(rcpt, "Status reported twice, keeping the first");
            }
            Some(slot) => {
                tracing::debug!(rcpt, accepted = status.is_ok(), "Recipient status");
                *slot = Some(status);
            }
        }
    }
}

/// Submits a body to `session` and collects outcomes.
///
/// `recipients` are the accepted RCPT entries in order, duplicates included;
/// LMTP yields one outcome per entry. The body is fully handed to the
/// session before this returns.
pub async fn submit(
    session: &mut dyn Session,
    protocol: Protocol,
    body: &mut Body<'_>,
    recipients: &[String],
) -> Delivery {
    if protocol == Protocol::Smtp {
        return Delivery::Single(single(session, body).await);
    }

    let Some(lmtp) = session.as_lmtp() else {
        tracing::debug!("Session has no LMTP extension, using one outcome for all");
        let outcome = single(session, body).await;
        return Delivery::PerRecipient(
            recipients
                .iter()
                .map(|rcpt| RecipientOutcome {
                    rcpt: rcpt.clone(),
                    outcome: outcome.clone(),
                })
                .collect(),
        );
    };

    let mut statuses = RecipientStatuses::new(recipients.iter().map(String::as_str));
    let fallback = lmtp
        .lmtp_data(body, &mut statuses)
        .await
        .map_err(|e| e.to_smtp_error());
    statuses.seal();

    let pending = statuses.pending();
    if !pending.is_empty() {
        tracing::debug!(?pending, "Recipients inherit LMTP data result");
    }
    if statuses.violations() > 0 {
        tracing::warn!(violations = statuses.violations(), "LMTP status contract violated");
    }

    Delivery::PerRecipient(statuses.resolve(recipients, &fallback))
}

async fn single(session: &mut dyn Session, body: &mut Body<'_>) -> Outcome {
    let outcome = session.data(body).await.map_err(|e| e.to_smtp_error());
    if let Err(err) = &outcome {
        tracing::debug!(code = err.code.as_u16(), message = %err.message, "Message rejected");
    }
    outcome
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
    use crate::types::{EnhancedCode, ReplyCode};

    fn rcpts(list: &[&str]) -> Vec<String> {
        list.iter().map(ToString::to_string).collect()
    }

    mod collector_tests {
        use super::*;

        #[test]
        fn accepts_one_report_per_recipient() {
            let mut statuses = RecipientStatuses::new(["bob", "carol"]);
            statuses.set_status("bob", Err(SmtpError::MAILBOX_FULL));
            assert_eq!(statuses.get("bob"), Some(&Err(SmtpError::MAILBOX_FULL)));
            assert_eq!(statuses.get("carol"), None);
            assert_eq!(statuses.pending(), vec!["carol"]);
            assert_eq!(statuses.violations(), 0);
        }

        #[test]
        fn first_report_wins() {
            let mut statuses = RecipientStatuses::new(["bob"]);
            statuses.set_status("bob", Ok(()));
            statuses.set_status("bob", Err(SmtpError::MAILBOX_FULL));
            assert_eq!(statuses.get("bob"), Some(&Ok(())));
            assert_eq!(statuses.violations(), 1);
        }

        #[test]
        fn unknown_recipient_is_a_violation() {
            let mut statuses = RecipientStatuses::new(["bob"]);
            statuses.set_status("mallory", Ok(()));
            assert_eq!(statuses.get("mallory"), None);
            assert_eq!(statuses.violations(), 1);
        }

        #[test]
        fn report_after_seal_is_detected_and_ignored() {
            let mut statuses = RecipientStatuses::new(["bob"]);
            statuses.seal();
            assert!(statuses.is_sealed());
            statuses.set_status("bob", Ok(()));
            assert_eq!(statuses.get("bob"), None);
            assert_eq!(statuses.violations(), 1);
        }

        #[test]
        fn resolve_repeats_outcome_for_duplicates() {
            let mut statuses = RecipientStatuses::new(["bob", "carol"]);
            statuses.set_status("bob", Err(SmtpError::MAILBOX_FULL));
            let entries = rcpts(&["bob", "carol", "bob"]);
            let resolved = statuses.resolve(&entries, &Ok(()));

            assert_eq!(resolved.len(), 3);
            assert_eq!(resolved[0].outcome, Err(SmtpError::MAILBOX_FULL));
            assert_eq!(resolved[1].outcome, Ok(()));
            assert_eq!(resolved[2].outcome, Err(SmtpError::MAILBOX_FULL));
        }

        #[test]
        fn resolve_uses_error_fallback() {
            let statuses = RecipientStatuses::new(["bob"]);
            let fallback = Err(SmtpError::new(
                ReplyCode::LOCAL_ERROR,
                EnhancedCode::new(4, 3, 0),
                "try later",
            ));
            let resolved = statuses.resolve(&rcpts(&["bob"]), &fallback);
            assert_eq!(resolved[0].outcome, fallback);
        }
    }

    mod delivery_tests {
        use super::*;

        #[test]
        fn single_outcome_applies_to_any_recipient() {
            let delivery = Delivery::Single(Err(SmtpError::MAILBOX_FULL));
            assert_eq!(
                delivery.outcome_for("anyone"),
                Some(&Err(SmtpError::MAILBOX_FULL))
            );
            assert!(delivery.recipients().is_empty());
            assert!(!delivery.all_accepted());
        }

        #[test]
        fn per_recipient_lookup() {
            let delivery = Delivery::PerRecipient(vec![
                RecipientOutcome {
                    rcpt: "bob".into(),
                    outcome: Ok(()),
                },
                RecipientOutcome {
                    rcpt: "carol".into(),
                    outcome: Err(SmtpError::NO_SUCH_MAILBOX),
                },
            ]);
            assert_eq!(delivery.outcome_for("bob"), Some(&Ok(())));
            assert_eq!(
                delivery.outcome_for("carol"),
                Some(&Err(SmtpError::NO_SUCH_MAILBOX))
            );
            assert_eq!(delivery.outcome_for("dave"), None);
            assert!(!delivery.all_accepted());
        }
    }
}
