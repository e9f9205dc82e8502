//! Read-only runtime facts exposed to templates

use serde::Serialize;
use std::net::{IpAddr, ToSocketAddrs};

/// Name of the global object templates use to reach the runtime extras,
/// e.g. `{{ ccr_extras.local_addr }}`.
pub const EXTRAS_GLOBAL: &str = "ccr_extras";

/// Loopback address exposed as `ccr_extras.loopback_addr`
pub const LOOPBACK_ADDR: &str = "127.0.0.1";

/// Host facts available to every template.
///
/// Built once per invocation and handed to the [`Renderer`](crate::Renderer).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuntimeExtras {
    /// IPv4 address the local host name resolves to
    pub local_addr: String,
    /// Always `127.0.0.1`
    pub loopback_addr: String,
}

impl RuntimeExtras {
    /// Create extras with an explicit local address
    #[must_use]
    pub fn new(local_addr: impl Into<String>) -> Self {
        Self {
            local_addr: local_addr.into(),
            loopback_addr: LOOPBACK_ADDR.to_string(),
        }
    }

    /// Detect the local address by resolving the host name.
    ///
    /// Falls back to the loopback address when the host name cannot be
    /// resolved to an IPv4 address.
    #[must_use]
    pub fn detect() -> Self {
        match resolve_local_addr() {
            Some(addr) => {
                tracing::debug!(local_addr = %addr, "Resolved local address");
                Self::new(addr.to_string())
            }
            None => {
                tracing::warn!("Could not resolve host name; using loopback as local address");
                Self::new(LOOPBACK_ADDR)
            }
        }
    }
}

fn resolve_local_addr() -> Option<IpAddr> {
    let host = hostname::get().ok()?;
    let host = host.to_str()?;
    (host, 0)
        .to_socket_addrs()
        .ok()?
        .map(|addr| addr.ip())
        .find(IpAddr::is_ipv4)
}
