//! Property tests for per-recipient status reporting.

use std::collections::HashMap;

use mailgate_core::{BackendConfig, MemoryBackend};
use mailgate_smtp::{
    ConnContext, LmtpSession, MailOptions, Protocol, Session, SmtpError, StatusCollector,
};
use proptest::prelude::*;

/// Records every report, including repeats.
#[derive(Default)]
struct Counting {
    reports: HashMap<String, usize>,
}

impl StatusCollector for Counting {
    fn set_status(&mut self, rcpt: &str, _status: Result<(), SmtpError>) {
        *self.reports.entry(rcpt.to_string()).or_default() += 1;
    }
}

const MAILBOXES: [&str; 4] = [
    "a@example.com",
    "b@example.com",
    "c@example.com",
    "d@example.com",
];

fn backend() -> MemoryBackend {
    let config = MAILBOXES
        .iter()
        .fold(BackendConfig::new(), |config, mailbox| config.mailbox(*mailbox, 0));
    MemoryBackend::new(config).unwrap()
}

proptest! {
    #[test]
    fn one_report_per_distinct_address(
        picks in proptest::collection::vec(0..MAILBOXES.len(), 1..20),
    ) {
        let backend = backend();
        let reports = tokio_test::block_on(async {
            let mut session = backend.session(&ConnContext::new(Protocol::Lmtp));
            session.mail("sender@example.com", &MailOptions::new()).await.unwrap();
            for &i in &picks {
                session.rcpt(MAILBOXES[i]).await.unwrap();
            }
            let mut collector = Counting::default();
            let mut body: &[u8] = b"hello";
            session.lmtp_data(&mut body, &mut collector).await.unwrap();
            collector.reports
        });

        let mut distinct: Vec<&str> = picks.iter().map(|&i| MAILBOXES[i]).collect();
        distinct.sort_unstable();
        distinct.dedup();

        prop_assert_eq!(reports.len(), distinct.len());
        for rcpt in distinct {
            prop_assert_eq!(reports.get(rcpt), Some(&1));
        }
    }

    #[test]
    fn reset_then_new_transaction_stores_only_new_recipients(
        first in proptest::collection::vec(0..MAILBOXES.len(), 1..6),
        second in 0..MAILBOXES.len(),
    ) {
        let backend = backend();
        tokio_test::block_on(async {
            let mut session = backend.session(&ConnContext::new(Protocol::Smtp));
            session.mail("sender@example.com", &MailOptions::new()).await.unwrap();
            for &i in &first {
                session.rcpt(MAILBOXES[i]).await.unwrap();
            }
            session.reset();

            session.mail("sender@example.com", &MailOptions::new()).await.unwrap();
            session.rcpt(MAILBOXES[second]).await.unwrap();
            let mut body: &[u8] = b"x";
            session.data(&mut body).await.unwrap();
        });

        let store = backend.store();
        for (i, mailbox) in MAILBOXES.iter().enumerate() {
            let expected = usize::from(i == second);
            prop_assert_eq!(tokio_test::block_on(store.count(mailbox)), expected);
        }
    }
}
