//! Reference backend built on the in-memory store.
//!
//! [`MemoryBackend`] hands out one [`MemorySession`] per connection. All
//! sessions share the backend's [`MailboxStore`](crate::MailboxStore).

mod backend;
mod session;

pub use backend::MemoryBackend;
pub use session::MemorySession;
