//! Core SMTP types.

mod mechanism;
mod reply;
mod status;

pub use mechanism::AuthMechanism;
pub use reply::{EnhancedCode, ReplyCode};
pub use status::SmtpError;
