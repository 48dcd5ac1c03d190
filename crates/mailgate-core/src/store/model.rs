//! Stored message models.

use chrono::{DateTime, Utc};
use mailgate_smtp::BodyType;
use serde::{Serialize, Serializer};

/// Envelope data captured from a transaction, copied into every stored copy.
#[derive(Debug, Clone, Default)]
pub struct Envelope {
    /// Reverse-path from MAIL FROM.
    pub from: String,
    /// `BODY=` value, if declared.
    pub body_type: Option<BodyType>,
    /// SMTPUTF8 flag.
    pub utf8: bool,
    /// Asserted `AUTH=` identity, kept exactly as given.
    pub auth: Option<String>,
    /// User authenticated on the connection, if any.
    pub user: Option<String>,
    /// Connection that submitted the message.
    pub conn_id: u64,
}

/// A message delivered to one mailbox.
#[derive(Debug, Clone, Serialize)]
pub struct StoredMessage {
    /// Store-wide message id.
    pub id: u64,
    /// Reverse-path.
    pub from: String,
    /// Mailbox the message was delivered to.
    pub rcpt: String,
    /// Raw message body.
    #[serde(serialize_with = "lossy_text")]
    pub body: Vec<u8>,
    /// `BODY=` value, if declared.
    #[serde(serialize_with = "body_keyword")]
    pub body_type: Option<BodyType>,
    /// SMTPUTF8 flag.
    pub utf8: bool,
    /// Asserted `AUTH=` identity. `Some("")` is `AUTH=<>`.
    pub auth: Option<String>,
    /// Authenticated user.
    pub user: Option<String>,
    /// Submitting connection.
    pub conn_id: u64,
    /// When the message was stored.
    pub received_at: DateTime<Utc>,
}

impl StoredMessage {
    /// Builds a stored copy of `body` for `rcpt`.
    #[must_use]
    pub fn new(id: u64, rcpt: impl Into<String>, envelope: &Envelope, body: Vec<u8>) -> Self {
        Self {
            id,
            from: envelope.from.clone(),
            rcpt: rcpt.into(),
            body,
            body_type: envelope.body_type,
            utf8: envelope.utf8,
            auth: envelope.auth.clone(),
            user: envelope.user.clone(),
            conn_id: envelope.conn_id,
            received_at: Utc::now(),
        }
    }

    /// Returns the body as text, replacing invalid UTF-8.
    #[must_use]
    pub fn body_text(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }
}

fn lossy_text<S: Serializer>(body: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&String::from_utf8_lossy(body))
}

#[allow(clippy::ref_option)]
fn body_keyword<S: Serializer>(
    body_type: &Option<BodyType>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match body_type {
        Some(body_type) => serializer.serialize_some(body_type.as_str()),
        None => serializer.serialize_none(),
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

    fn envelope() -> Envelope {
        Envelope {
            from: "alice@example.com".to_string(),
            body_type: Some(BodyType::EightBitMime),
            utf8: false,
            auth: Some(String::new()),
            user: Some("alice".to_string()),
            conn_id: 7,
        }
    }

    #[test]
    fn copies_envelope() {
        let msg = StoredMessage::new(1, "bob@example.com", &envelope(), b"hi".to_vec());
        assert_eq!(msg.from, "alice@example.com");
        assert_eq!(msg.rcpt, "bob@example.com");
        assert_eq!(msg.auth.as_deref(), Some(""));
        assert_eq!(msg.conn_id, 7);
        assert_eq!(msg.body_text(), "hi");
    }

    #[test]
    fn serializes_to_json() {
        let msg = StoredMessage::new(3, "bob@example.com", &envelope(), b"Subject: x\r\n".to_vec());
        let json: serde_json::Value = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["id"], 3);
        assert_eq!(json["body"], "Subject: x\r\n");
        assert_eq!(json["body_type"], "8BITMIME");
        assert_eq!(json["auth"], "");
        assert!(json["received_at"].is_string());
    }

    #[test]
    fn absent_auth_serializes_as_null() {
        let mut env = envelope();
        env.auth = None;
        env.body_type = None;
        let msg = StoredMessage::new(1, "bob", &env, Vec::new());
        let json: serde_json::Value = serde_json::to_value(&msg).unwrap();
        assert!(json["auth"].is_null());
        assert!(json["body_type"].is_null());
    }
}
