//! Host-reachable address of a published container port.

use std::fmt;

use super::RunningContainer;

const LOCALHOST: &str = "localhost";
const WILDCARD_ADDRESSES: &[&str] = &["", "0.0.0.0", "::"];

/// Host platform, which decides how a bound address is turned into a host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostPlatform {
    /// macOS, where the engine runs in a VM and the bound address is used as is.
    Darwin,
    /// Every other platform.
    Other,
}

impl HostPlatform {
    /// Return the platform this binary was compiled for.
    #[must_use]
    pub const fn current() -> Self {
        if cfg!(target_os = "macos") {
            Self::Darwin
        } else {
            Self::Other
        }
    }
}

/// Host and port a client uses to reach a service container.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    host: String,
    port: u16,
}

impl Endpoint {
    /// Create an endpoint from a host name or address and a port.
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Resolve the endpoint for `container_port` of a running container.
    ///
    /// A specific bound address is used directly. Wildcard or empty addresses
    /// resolve to `localhost`. On macOS a non-empty bound address is always
    /// preferred. Returns `None` when the port is not published.
    #[must_use]
    pub fn resolve(
        container: &RunningContainer,
        container_port: &str,
        platform: HostPlatform,
    ) -> Option<Self> {
        let port = container.host_port(container_port)?;
        let bound_ip = container.bound_ip(container_port).unwrap_or_default();
        Some(Self::new(resolve_host(bound_ip, platform), port))
    }

    /// Return the host name or address.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Return the host port.
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }

    /// Return `host:port`, bracketing IPv6 literals.
    #[must_use]
    pub fn authority(&self) -> String {
        if self.host.contains(':') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.authority())
    }
}

fn resolve_host(bound_ip: &str, platform: HostPlatform) -> String {
    match platform {
        HostPlatform::Darwin if !bound_ip.is_empty() => String::from(bound_ip),
        _ if WILDCARD_ADDRESSES.iter().any(|wildcard| *wildcard == bound_ip) => {
            String::from(LOCALHOST)
        }
        _ => String::from(bound_ip),
    }
}
