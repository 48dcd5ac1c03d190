//! End-to-end session tests against the in-memory backend.

use mailgate_core::{BackendConfig, MemoryBackend};
use mailgate_smtp::{
    Backend, ConnContext, Delivery, MailOptions, Protocol, Session, SmtpError, delivery,
};
use tokio_test::io::Builder;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn rcpts(list: &[&str]) -> Vec<String> {
    list.iter().map(ToString::to_string).collect()
}

/// Bob holds one message and is already full; Carol is unlimited.
async fn bob_full_backend() -> MemoryBackend {
    let backend = MemoryBackend::new(
        BackendConfig::new()
            .mailbox("bob@example.com", 1)
            .mailbox("carol@example.com", 0),
    )
    .unwrap();
    let mut session = backend.session(&ConnContext::new(Protocol::Smtp));
    session.mail("x@example.com", &MailOptions::new()).await.unwrap();
    session.rcpt("bob@example.com").await.unwrap();
    let mut body = Builder::new().read(b"filler").build();
    session.data(&mut body).await.unwrap();
    backend
}

mod lmtp {
    use super::*;

    #[tokio::test]
    async fn bob_rejected_carol_accepted() {
        init_tracing();
        let backend = bob_full_backend().await;
        let conn = ConnContext::new(Protocol::Lmtp);
        let mut session = backend.new_session(&conn).await.unwrap();

        session.mail("alice@example.com", &MailOptions::new()).await.unwrap();
        session.rcpt("bob@example.com").await.unwrap();
        session.rcpt("carol@example.com").await.unwrap();

        let list = rcpts(&["bob@example.com", "carol@example.com"]);
        let mut body = Builder::new().read(b"Subject: hi\r\n\r\nhello\r\n").build();
        let outcome = delivery::submit(session.as_mut(), conn.protocol, &mut body, &list).await;

        assert_eq!(
            outcome.outcome_for("bob@example.com"),
            Some(&Err(SmtpError::MAILBOX_FULL))
        );
        assert_eq!(outcome.outcome_for("carol@example.com"), Some(&Ok(())));
        assert_eq!(backend.store().count("bob@example.com").await, 1);
        assert_eq!(backend.store().count("carol@example.com").await, 1);
    }

    #[tokio::test]
    async fn duplicate_recipient_stored_once() {
        let backend = bob_full_backend().await;
        let conn = ConnContext::new(Protocol::Lmtp);
        let mut session = backend.new_session(&conn).await.unwrap();

        session.mail("alice@example.com", &MailOptions::new()).await.unwrap();
        for rcpt in ["carol@example.com", "bob@example.com", "carol@example.com"] {
            session.rcpt(rcpt).await.unwrap();
        }

        let list = rcpts(&["carol@example.com", "bob@example.com", "carol@example.com"]);
        let mut body = Builder::new().read(b"x").build();
        let outcome = delivery::submit(session.as_mut(), conn.protocol, &mut body, &list).await;

        let entries = outcome.recipients();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].outcome, Ok(()));
        assert_eq!(entries[1].outcome, Err(SmtpError::MAILBOX_FULL));
        assert_eq!(entries[2].outcome, Ok(()));
        assert_eq!(backend.store().count("carol@example.com").await, 1);
    }
}

mod smtp {
    use super::*;

    #[tokio::test]
    async fn single_outcome_is_all_or_nothing() {
        let backend = bob_full_backend().await;
        let conn = ConnContext::new(Protocol::Smtp);
        let mut session = backend.new_session(&conn).await.unwrap();

        session.mail("alice@example.com", &MailOptions::new()).await.unwrap();
        session.rcpt("carol@example.com").await.unwrap();
        session.rcpt("bob@example.com").await.unwrap();

        let list = rcpts(&["carol@example.com", "bob@example.com"]);
        let mut body = Builder::new().read(b"x").build();
        let outcome = delivery::submit(session.as_mut(), conn.protocol, &mut body, &list).await;

        assert_eq!(outcome, Delivery::Single(Err(SmtpError::MAILBOX_FULL)));
        assert_eq!(backend.store().count("carol@example.com").await, 0);
    }

    #[tokio::test]
    async fn second_transaction_after_submission() {
        let backend = bob_full_backend().await;
        let mut session = backend.session(&ConnContext::new(Protocol::Smtp));

        for _ in 0..2 {
            session.mail("alice@example.com", &MailOptions::new()).await.unwrap();
            session.rcpt("carol@example.com").await.unwrap();
            let mut body = Builder::new().read(b"x").build();
            session.data(&mut body).await.unwrap();
        }
        assert_eq!(backend.store().count("carol@example.com").await, 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn concurrent_sessions_respect_quota() {
        const QUOTA: usize = 5;
        const SESSIONS: usize = 50;

        let backend =
            MemoryBackend::new(BackendConfig::new().mailbox("bob@example.com", QUOTA)).unwrap();

        let tasks: Vec<_> = (0..SESSIONS)
            .map(|i| {
                let backend = backend.clone();
                tokio::spawn(async move {
                    let mut session = backend.session(&ConnContext::new(Protocol::Smtp));
                    let from = format!("sender{i}@example.com");
                    session.mail(&from, &MailOptions::new()).await.unwrap();
                    session.rcpt("bob@example.com").await.unwrap();
                    let mut body = Builder::new().read(b"x").build();
                    session.data(&mut body).await
                })
            })
            .collect();

        let mut accepted = 0;
        for task in tasks {
            match task.await.unwrap() {
                Ok(()) => accepted += 1,
                Err(err) => assert_eq!(err.as_smtp(), Some(&SmtpError::MAILBOX_FULL)),
            }
        }

        assert_eq!(accepted, QUOTA);
        assert_eq!(backend.store().count("bob@example.com").await, QUOTA);
    }
}

mod auth {
    use super::*;

    fn secured() -> MemoryBackend {
        MemoryBackend::new(
            BackendConfig::new()
                .require_auth(true)
                .user("alice", "secret")
                .mailbox("bob@example.com", 0),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn mail_without_auth_is_exactly_auth_required() {
        let backend = secured();
        let mut session = backend
            .new_session(&ConnContext::new(Protocol::Smtp))
            .await
            .unwrap();

        let err = session
            .mail("alice@example.com", &MailOptions::new())
            .await
            .unwrap_err();

        assert_eq!(err.as_smtp(), Some(&SmtpError::AUTH_REQUIRED));
        let reply = err.to_smtp_error();
        assert_eq!(reply.code.as_u16(), 502);
        assert_eq!(reply.enhanced.map(|e| e.to_string()).as_deref(), Some("5.7.0"));
    }

    #[tokio::test]
    async fn asserted_identity_is_kept_verbatim() {
        let backend = secured();
        let mut session = backend.session(&ConnContext::new(Protocol::Smtp));
        session.auth_plain("alice", "secret").await.unwrap();

        for opts in [MailOptions::new().with_auth(""), MailOptions::new()] {
            session.mail("alice@example.com", &opts).await.unwrap();
            session.rcpt("bob@example.com").await.unwrap();
            let mut body = Builder::new().read(b"x").build();
            session.data(&mut body).await.unwrap();
            session.reset();
        }

        let stored = backend.store().messages("bob@example.com").await;
        assert_eq!(stored[0].auth.as_deref(), Some(""));
        assert_eq!(stored[1].auth, None);
        assert!(stored.iter().all(|m| m.user.as_deref() == Some("alice")));
    }
}

mod lifecycle {
    use super::*;

    #[tokio::test]
    async fn reset_leaves_no_residual_recipients() {
        let backend = bob_full_backend().await;
        let mut session = backend.session(&ConnContext::new(Protocol::Smtp));

        session.mail("alice@example.com", &MailOptions::new()).await.unwrap();
        session.rcpt("bob@example.com").await.unwrap();
        session.reset();
        session.reset();

        session.mail("alice@example.com", &MailOptions::new()).await.unwrap();
        session.rcpt("carol@example.com").await.unwrap();
        assert_eq!(session.transaction().recipients(), ["carol@example.com"]);

        let mut body = Builder::new().read(b"x").build();
        session.data(&mut body).await.unwrap();
        assert_eq!(backend.store().count("bob@example.com").await, 1);
        assert_eq!(backend.store().count("carol@example.com").await, 1);
    }

    #[tokio::test]
    async fn logout_mid_transaction() {
        let backend = bob_full_backend().await;
        let mut session = backend.session(&ConnContext::new(Protocol::Lmtp));
        session.mail("alice@example.com", &MailOptions::new()).await.unwrap();
        session.rcpt("carol@example.com").await.unwrap();

        session.logout().await.unwrap();
        assert!(session.transaction().recipients().is_empty());
        assert!(session.transaction().sender().is_none());
    }
}
