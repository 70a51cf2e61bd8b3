//! Upstream resolver descriptor parsing
//!
//! The host hands the relay a free-form upstream string such as
//! `udp:127.0.0.1:53`, `doh:https://dns.example/dns-query` or a bare
//! `8.8.8.8:53`. The string is parsed once per session start; deeper
//! validation of DoH/DoT addresses is the transport's concern.

use std::fmt;

use crate::{QdynnError, Result};

/// How the transport reaches the recursive resolver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    /// Plain DNS over UDP, address is `host:port`
    Udp,
    /// DNS over HTTPS, address is a URL
    Doh,
    /// DNS over TLS, address is a server name
    Dot,
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scheme::Udp => write!(f, "udp"),
            Scheme::Doh => write!(f, "doh"),
            Scheme::Dot => write!(f, "dot"),
        }
    }
}

/// Parsed `(scheme, address)` pair, immutable for one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamDescriptor {
    pub scheme: Scheme,
    pub address: String,
}

impl fmt::Display for UpstreamDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.scheme, self.address)
    }
}

/// Parse an upstream specification string.
///
/// Grammar: `("udp:" | "doh:" | "dot:")? <address>`, where a
/// `udp:`-prefixed or unprefixed address must be `host:port`.
pub fn parse_upstream(spec: &str) -> Result<UpstreamDescriptor> {
    let spec = spec.trim();
    if spec.is_empty() {
        return Err(QdynnError::InvalidUpstream("empty".to_string()));
    }

    if let Some(rest) = spec.strip_prefix("udp:") {
        if !is_host_port(rest) {
            return Err(QdynnError::InvalidUpstream("bad udp host:port".to_string()));
        }
        return Ok(UpstreamDescriptor {
            scheme: Scheme::Udp,
            address: rest.to_string(),
        });
    }

    if let Some(rest) = spec.strip_prefix("doh:") {
        return Ok(UpstreamDescriptor {
            scheme: Scheme::Doh,
            address: rest.to_string(),
        });
    }

    if let Some(rest) = spec.strip_prefix("dot:") {
        return Ok(UpstreamDescriptor {
            scheme: Scheme::Dot,
            address: rest.to_string(),
        });
    }

    if is_host_port(spec) {
        return Ok(UpstreamDescriptor {
            scheme: Scheme::Udp,
            address: spec.to_string(),
        });
    }

    Err(QdynnError::InvalidUpstream("unknown format".to_string()))
}

/// `host:port` check in the spirit of Go's `net.SplitHostPort`:
/// a non-empty host (bracketed for IPv6) followed by a numeric port.
fn is_host_port(addr: &str) -> bool {
    if let Some(rest) = addr.strip_prefix('[') {
        match rest.split_once("]:") {
            Some((host, port)) => !host.is_empty() && port.parse::<u16>().is_ok(),
            None => false,
        }
    } else {
        match addr.rsplit_once(':') {
            // An unbracketed host with embedded colons is a raw IPv6
            // address, which is ambiguous without brackets.
            Some((host, port)) => {
                !host.is_empty() && !host.contains(':') && port.parse::<u16>().is_ok()
            }
            None => false,
        }
    }
}
