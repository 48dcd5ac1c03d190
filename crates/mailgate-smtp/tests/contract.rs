//! Contract tests for the delivery seam.
//!
//! These use small scripted sessions to check how `delivery::submit`
//! chooses between the single-outcome and per-recipient paths.

use std::io;

use async_trait::async_trait;
use tokio::io::AsyncReadExt;
use tokio_test::io::Builder;

use mailgate_smtp::{
    Backend, Body, ConnContext, Delivery, LmtpSession, MailOptions, Protocol, ReplyCode, Result,
    Session, SmtpError, StatusCollector, Transaction, delivery,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Per-recipient status a scripted session will report.
#[derive(Clone)]
enum Script {
    /// Report this outcome.
    Report(std::result::Result<(), SmtpError>),
    /// Report nothing; inherit the return value.
    Silent,
}

/// Session scripted by recipient address.
struct ScriptedSession {
    tx: Transaction,
    lmtp: bool,
    script: Vec<(String, Script)>,
    result: std::result::Result<(), SmtpError>,
    /// Report once per RCPT entry instead of once per address.
    report_duplicates: bool,
    body: Vec<u8>,
    data_calls: usize,
    lmtp_calls: usize,
}

impl ScriptedSession {
    fn new(lmtp: bool) -> Self {
        Self {
            tx: Transaction::new(),
            lmtp,
            script: Vec::new(),
            result: Ok(()),
            report_duplicates: false,
            body: Vec::new(),
            data_calls: 0,
            lmtp_calls: 0,
        }
    }

    fn script(mut self, rcpt: &str, script: Script) -> Self {
        self.script.push((rcpt.to_string(), script));
        self
    }

    fn returning(mut self, result: std::result::Result<(), SmtpError>) -> Self {
        self.result = result;
        self
    }

    async fn read_body(&mut self, body: &mut Body<'_>) -> Result<()> {
        self.tx.mark_submitted()?;
        body.read_to_end(&mut self.body).await?;
        Ok(())
    }
}

#[async_trait]
impl Session for ScriptedSession {
    fn reset(&mut self) {
        self.tx.reset();
    }

    async fn logout(&mut self) -> Result<()> {
        Ok(())
    }

    async fn mail(&mut self, from: &str, opts: &MailOptions) -> Result<()> {
        self.tx.begin(from, opts)
    }

    async fn rcpt(&mut self, to: &str) -> Result<()> {
        self.tx.add_recipient(to)
    }

    async fn data(&mut self, body: &mut Body<'_>) -> Result<()> {
        self.data_calls += 1;
        self.read_body(body).await?;
        self.result.clone().map_err(Into::into)
    }

    fn as_lmtp(&mut self) -> Option<&mut dyn LmtpSession> {
        if self.lmtp { Some(self) } else { None }
    }
}

#[async_trait]
impl LmtpSession for ScriptedSession {
    async fn lmtp_data(
        &mut self,
        body: &mut Body<'_>,
        status: &mut dyn StatusCollector,
    ) -> Result<()> {
        self.lmtp_calls += 1;
        self.read_body(body).await?;

        let targets: Vec<String> = if self.report_duplicates {
            self.tx.recipients().to_vec()
        } else {
            self.tx
                .distinct_recipients()
                .into_iter()
                .map(String::from)
                .collect()
        };
        for rcpt in targets {
            let script = self
                .script
                .iter()
                .find(|(r, _)| *r == rcpt)
                .map_or(Script::Report(Ok(())), |(_, s)| s.clone());
            if let Script::Report(outcome) = script {
                status.set_status(&rcpt, outcome);
            }
        }
        self.result.clone().map_err(Into::into)
    }
}

async fn open(session: &mut ScriptedSession, rcpts: &[&str]) -> Vec<String> {
    session
        .mail("alice@example.com", &MailOptions::new().with_auth("alice"))
        .await
        .unwrap();
    for rcpt in rcpts {
        session.rcpt(rcpt).await.unwrap();
    }
    rcpts.iter().map(ToString::to_string).collect()
}

fn mailbox_full() -> SmtpError {
    SmtpError::new(
        ReplyCode::EXCEEDED_STORAGE,
        mailgate_smtp::EnhancedCode::new(5, 2, 2),
        "mailbox full",
    )
}

#[tokio::test]
async fn bob_rejected_carol_inherits_success() {
    init_tracing();
    let mut session = ScriptedSession::new(true)
        .script("bob", Script::Report(Err(mailbox_full())))
        .script("carol", Script::Silent);
    let rcpts = open(&mut session, &["bob", "carol"]).await;
    let mut body = Builder::new().read(b"Subject: hi\r\n\r\nhello\r\n").build();

    let delivery = delivery::submit(&mut session, Protocol::Lmtp, &mut body, &rcpts).await;

    assert_eq!(delivery.outcome_for("bob"), Some(&Err(mailbox_full())));
    assert_eq!(delivery.outcome_for("carol"), Some(&Ok(())));
    assert_eq!(session.lmtp_calls, 1);
    assert_eq!(session.data_calls, 0);
    assert_eq!(session.body, b"Subject: hi\r\n\r\nhello\r\n");
}

#[tokio::test]
async fn silent_recipients_inherit_error_return() {
    let mut session = ScriptedSession::new(true)
        .script("bob", Script::Report(Ok(())))
        .script("carol", Script::Silent)
        .returning(Err(SmtpError::MAILBOX_FULL));
    let rcpts = open(&mut session, &["bob", "carol"]).await;
    let mut body = Builder::new().read(b"x").build();

    let delivery = delivery::submit(&mut session, Protocol::Lmtp, &mut body, &rcpts).await;

    assert_eq!(delivery.outcome_for("bob"), Some(&Ok(())));
    assert_eq!(
        delivery.outcome_for("carol"),
        Some(&Err(SmtpError::MAILBOX_FULL))
    );
}

#[tokio::test]
async fn duplicate_recipients_get_one_entry_each() {
    let mut session =
        ScriptedSession::new(true).script("bob", Script::Report(Err(mailbox_full())));
    let rcpts = open(&mut session, &["bob", "carol", "bob"]).await;
    let mut body = Builder::new().read(b"x").build();

    let delivery = delivery::submit(&mut session, Protocol::Lmtp, &mut body, &rcpts).await;

    let entries = delivery.recipients();
    assert_eq!(entries.len(), 3);
    assert_eq!(entries[0].rcpt, "bob");
    assert_eq!(entries[2].rcpt, "bob");
    assert_eq!(entries[0].outcome, entries[2].outcome);
    assert_eq!(entries[1].outcome, Ok(()));
}

#[tokio::test]
async fn repeated_reports_keep_the_first() {
    let mut session =
        ScriptedSession::new(true).script("bob", Script::Report(Err(mailbox_full())));
    session.report_duplicates = true;
    let rcpts = open(&mut session, &["bob", "bob"]).await;
    let mut body = Builder::new().read(b"x").build();

    let delivery = delivery::submit(&mut session, Protocol::Lmtp, &mut body, &rcpts).await;

    assert!(
        delivery
            .recipients()
            .iter()
            .all(|o| o.outcome == Err(mailbox_full()))
    );
}

#[tokio::test]
async fn lmtp_without_extension_falls_back_to_data() {
    let mut session = ScriptedSession::new(false).returning(Err(SmtpError::MAILBOX_FULL));
    let rcpts = open(&mut session, &["bob", "carol"]).await;
    let mut body = Builder::new().read(b"hello").build();

    let delivery = delivery::submit(&mut session, Protocol::Lmtp, &mut body, &rcpts).await;

    assert_eq!(session.data_calls, 1);
    assert_eq!(session.lmtp_calls, 0);
    let entries = delivery.recipients();
    assert_eq!(entries.len(), 2);
    assert!(
        entries
            .iter()
            .all(|o| o.outcome == Err(SmtpError::MAILBOX_FULL))
    );
}

#[tokio::test]
async fn smtp_uses_single_outcome_even_with_extension() {
    let mut session =
        ScriptedSession::new(true).script("bob", Script::Report(Err(mailbox_full())));
    let rcpts = open(&mut session, &["bob", "carol"]).await;
    let mut body = Builder::new().read(b"hello").build();

    let delivery = delivery::submit(&mut session, Protocol::Smtp, &mut body, &rcpts).await;

    assert_eq!(delivery, Delivery::Single(Ok(())));
    assert_eq!(session.data_calls, 1);
    assert_eq!(session.lmtp_calls, 0);
}

#[tokio::test]
async fn body_read_error_becomes_transient_reply() {
    let mut session = ScriptedSession::new(false);
    let rcpts = open(&mut session, &["bob"]).await;
    let mut body = Builder::new()
        .read(b"partial")
        .read_error(io::Error::new(io::ErrorKind::ConnectionReset, "reset"))
        .build();

    let delivery = delivery::submit(&mut session, Protocol::Smtp, &mut body, &rcpts).await;

    let Delivery::Single(Err(err)) = delivery else {
        panic!("expected single rejection");
    };
    assert_eq!(err.code, ReplyCode::LOCAL_ERROR);
    assert!(err.is_transient());
}

#[tokio::test]
async fn second_submission_is_a_sequencing_error() {
    let mut session = ScriptedSession::new(false);
    let rcpts = open(&mut session, &["bob"]).await;

    let mut first = Builder::new().read(b"one").build();
    let delivery = delivery::submit(&mut session, Protocol::Smtp, &mut first, &rcpts).await;
    assert!(delivery.all_accepted());

    let mut second = Builder::new().build();
    let delivery = delivery::submit(&mut session, Protocol::Smtp, &mut second, &rcpts).await;
    let Delivery::Single(Err(err)) = delivery else {
        panic!("expected sequencing rejection");
    };
    assert_eq!(err.code, ReplyCode::BAD_SEQUENCE);
}

#[tokio::test]
async fn default_auth_methods_are_unsupported() {
    let mut session = ScriptedSession::new(false);

    let err = session.auth_plain("alice", "secret").await.unwrap_err();
    assert_eq!(err.as_smtp(), Some(&SmtpError::AUTH_UNSUPPORTED));

    let opts = mailgate_smtp::OAuthBearerOptions::new("token");
    match session.auth_oauthbearer(&opts).await.unwrap_err() {
        mailgate_smtp::BearerAuthError::Smtp(err) => {
            assert_eq!(err.as_smtp(), Some(&SmtpError::AUTH_UNSUPPORTED));
        }
        mailgate_smtp::BearerAuthError::Rejected(_) => panic!("expected coded error"),
    }
}

struct ScriptedBackend;

#[async_trait]
impl Backend for ScriptedBackend {
    async fn new_session(&self, _conn: &ConnContext) -> Result<Box<dyn Session>> {
        Ok(Box::new(ScriptedSession::new(false)))
    }
}

#[tokio::test]
async fn default_backend_advertises_no_mechanisms() {
    let backend = ScriptedBackend;
    assert!(backend.auth_mechanisms().is_empty());

    let mut session = backend
        .new_session(&ConnContext::new(Protocol::Smtp))
        .await
        .unwrap();
    let err = session.auth_plain("alice", "secret").await.unwrap_err();
    assert_eq!(err.as_smtp(), Some(&SmtpError::AUTH_UNSUPPORTED));
}
