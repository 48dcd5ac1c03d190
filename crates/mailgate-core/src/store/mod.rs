//! In-memory mailbox storage.
//!
//! One [`MailboxStore`] is shared by every session of a backend. Mailboxes
//! have a quota counted in messages.

mod model;
mod repository;

pub use model::{Envelope, StoredMessage};
pub use repository::MailboxStore;
