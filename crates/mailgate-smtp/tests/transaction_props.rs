//! Property tests for transaction tracking.

use mailgate_smtp::{MailOptions, RecipientStatuses, StatusCollector, Transaction, TransactionState};
use proptest::prelude::*;

fn addresses() -> impl Strategy<Value = Vec<String>> {
    proptest::collection::vec("[a-d]@example\\.com", 1..12)
}

proptest! {
    #[test]
    fn distinct_recipients_are_unique_and_ordered(rcpts in addresses()) {
        let mut tx = Transaction::new();
        tx.begin("alice@example.com", &MailOptions::new()).unwrap();
        for rcpt in &rcpts {
            tx.add_recipient(rcpt).unwrap();
        }

        prop_assert_eq!(tx.recipients().len(), rcpts.len());

        let distinct = tx.distinct_recipients();
        let mut expected: Vec<&str> = Vec::new();
        for rcpt in &rcpts {
            if !expected.contains(&rcpt.as_str()) {
                expected.push(rcpt);
            }
        }
        prop_assert_eq!(distinct, expected);
    }

    #[test]
    fn reset_leaves_no_residue(
        first in addresses(),
        second in addresses(),
        submit in any::<bool>(),
    ) {
        let mut tx = Transaction::new();
        tx.begin("alice@example.com", &MailOptions::new().with_auth("")).unwrap();
        for rcpt in &first {
            tx.add_recipient(rcpt).unwrap();
        }
        if submit {
            tx.mark_submitted().unwrap();
        }

        tx.reset();
        prop_assert_eq!(tx.state(), TransactionState::Idle);

        tx.begin("bob@example.com", &MailOptions::new()).unwrap();
        prop_assert!(!tx.options().has_auth_param());
        for rcpt in &second {
            tx.add_recipient(rcpt).unwrap();
        }
        prop_assert_eq!(tx.recipients(), second.as_slice());
    }

    #[test]
    fn one_report_per_distinct_address_is_violation_free(rcpts in addresses()) {
        let mut tx = Transaction::new();
        tx.begin("alice@example.com", &MailOptions::new()).unwrap();
        for rcpt in &rcpts {
            tx.add_recipient(rcpt).unwrap();
        }

        let mut statuses = RecipientStatuses::new(tx.distinct_recipients());
        for rcpt in tx.distinct_recipients() {
            statuses.set_status(rcpt, Ok(()));
        }
        statuses.seal();

        prop_assert_eq!(statuses.violations(), 0);
        prop_assert!(statuses.pending().is_empty());
        let resolved = statuses.resolve(tx.recipients(), &Ok(()));
        prop_assert_eq!(resolved.len(), rcpts.len());
    }
}
