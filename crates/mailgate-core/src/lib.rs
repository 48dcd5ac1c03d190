//! # mailgate-core
//!
//! A complete backend for the `mailgate-smtp` session contract, storing mail
//! in memory.
//!
//! This crate provides:
//! - **Configuration** - JSON-loadable [`BackendConfig`] with validation
//! - **Mailbox Store** - shared [`MailboxStore`] with per-mailbox quotas
//! - **Sessions** - [`MemoryBackend`] and [`MemorySession`], covering
//!   authentication, transaction policy, single-outcome DATA and LMTP
//!   per-recipient delivery
//!
//! ```
//! use mailgate_core::{BackendConfig, MemoryBackend};
//! use mailgate_smtp::{delivery, Backend, ConnContext, MailOptions, Protocol, Session};
//!
//! # tokio_test::block_on(async {
//! let backend = MemoryBackend::new(
//!     BackendConfig::new()
//!         .mailbox("bob@example.com", 1)
//!         .mailbox("carol@example.com", 0),
//! )?;
//! let conn = ConnContext::new(Protocol::Lmtp);
//! let mut session = backend.new_session(&conn).await?;
//!
//! session.mail("alice@example.com", &MailOptions::new()).await?;
//! session.rcpt("bob@example.com").await?;
//! session.rcpt("carol@example.com").await?;
//!
//! let rcpts = ["bob@example.com".to_string(), "carol@example.com".to_string()];
//! let mut body: &[u8] = b"Subject: hello\r\n\r\nhi\r\n";
//! let outcome = delivery::submit(session.as_mut(), conn.protocol, &mut body, &rcpts).await;
//! assert!(outcome.all_accepted());
//! assert_eq!(backend.store().count("carol@example.com").await, 1);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! # }).unwrap();
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod config;
mod error;
pub mod service;
pub mod store;

pub use config::{BackendConfig, ConfigError};
pub use error::{Error, Result};
pub use service::{MemoryBackend, MemorySession};
pub use store::{Envelope, MailboxStore, StoredMessage};
