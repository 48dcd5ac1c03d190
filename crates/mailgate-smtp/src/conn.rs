//! Per-connection context handed to the backend.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Protocol spoken on a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Protocol {
    /// SMTP/ESMTP: one reply per message.
    #[default]
    Smtp,
    /// LMTP (RFC 2033): one reply per recipient after DATA.
    Lmtp,
}

/// What the transport layer knows about a connection.
///
/// Sessions only need `tls` (to enforce REQUIRETLS) and `protocol`; the rest
/// is carried for logging and policy.
#[derive(Debug, Clone)]
pub struct ConnContext {
    /// Monotonic connection id, for log correlation.
    pub id: u64,
    /// Peer address, if the transport has one.
    pub remote_addr: Option<SocketAddr>,
    /// Argument of the last HELO/EHLO/LHLO.
    pub hostname: Option<String>,
    /// True once the connection is protected by TLS.
    pub tls: bool,
    /// Protocol spoken.
    pub protocol: Protocol,
}

impl ConnContext {
    /// Creates a context for a new plaintext connection.
    #[must_use]
    pub fn new(protocol: Protocol) -> Self {
        Self {
            id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
            remote_addr: None,
            hostname: None,
            tls: false,
            protocol,
        }
    }

    /// Sets the peer address.
    #[must_use]
    pub const fn with_remote_addr(mut self, addr: SocketAddr) -> Self {
        self.remote_addr = Some(addr);
        self
    }

    /// Sets the client hostname.
    #[must_use]
    pub fn with_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = Some(hostname.into());
        self
    }

    /// Marks the connection as TLS-protected.
    #[must_use]
    pub const fn with_tls(mut self, tls: bool) -> Self {
        self.tls = tls;
        self
    }

    /// Returns true if this is an LMTP connection.
    #[must_use]
    pub fn is_lmtp(&self) -> bool {
        self.protocol == Protocol::Lmtp
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique() {
        let a = ConnContext::new(Protocol::Smtp);
        let b = ConnContext::new(Protocol::Smtp);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn defaults_to_plaintext() {
        let conn = ConnContext::new(Protocol::Lmtp);
        assert!(!conn.tls);
        assert!(conn.is_lmtp());
        assert!(conn.remote_addr.is_none());
    }

    #[test]
    fn builder() {
        let addr: SocketAddr = "192.0.2.1:2525".parse().unwrap();
        let conn = ConnContext::new(Protocol::Smtp)
            .with_remote_addr(addr)
            .with_hostname("client.example.com")
            .with_tls(true);
        assert_eq!(conn.remote_addr, Some(addr));
        assert_eq!(conn.hostname.as_deref(), Some("client.example.com"));
        assert!(conn.tls);
        assert!(!conn.is_lmtp());
    }
}
