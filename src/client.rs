//! Client identity resolution.
//!
//! A client is identified by the first address in its `X-Forwarded-For`
//! header, then by the connection's remote address. When neither is usable
//! every such request shares the [`UNKNOWN_CLIENT`] bucket rather than being
//! refused.

use http::HeaderMap;
use std::fmt;
use std::net::SocketAddr;

/// Identifier shared by requests whose origin cannot be resolved.
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Header consulted before the socket address.
pub const FORWARDED_FOR: &str = "x-forwarded-for";

/// The key a client's quota is tracked under.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClientIdentifier(String);

impl ClientIdentifier {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn unknown() -> Self {
        Self(UNKNOWN_CLIENT.to_string())
    }

    /// Resolve from a raw forwarded-for value and a remote address string.
    ///
    /// The remote address may carry a port, which is dropped so that every
    /// connection from one host shares a bucket.
    pub fn resolve(forwarded_for: Option<&str>, remote_addr: Option<&str>) -> Self {
        if let Some(first) = forwarded_for.and_then(first_forwarded) {
            return Self::new(first);
        }

        match remote_addr.map(str::trim).filter(|s| !s.is_empty()) {
            Some(addr) => Self::new(strip_port(addr)),
            None => Self::unknown(),
        }
    }

    /// Resolve from request headers and the accepted socket's peer address.
    pub fn from_headers(headers: &HeaderMap, remote_addr: Option<SocketAddr>) -> Self {
        let forwarded_for = headers
            .get(FORWARDED_FOR)
            .and_then(|v| v.to_str().ok());

        if let Some(first) = forwarded_for.and_then(first_forwarded) {
            return Self::new(first);
        }

        match remote_addr {
            Some(addr) => Self::new(addr.ip().to_string()),
            None => Self::unknown(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_unknown(&self) -> bool {
        self.0 == UNKNOWN_CLIENT
    }
}

impl fmt::Display for ClientIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn first_forwarded(value: &str) -> Option<&str> {
    value
        .split(',')
        .next()
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn strip_port(addr: &str) -> String {
    if let Ok(sock) = addr.parse::<SocketAddr>() {
        return sock.ip().to_string();
    }
    addr.to_string()
}
