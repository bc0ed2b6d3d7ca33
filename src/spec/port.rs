//! Port publication and restart policy settings.

use std::fmt;

const DEFAULT_PROTOCOL: &str = "tcp";

/// A single container port published on the host.
///
/// The container port is stored in engine form (`5432/tcp`). A bare number is
/// normalised to TCP. When `host_port` is `None` the engine assigns an
/// ephemeral host port, which the lifecycle reads back after start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortMapping {
    container_port: String,
    host_port: Option<u16>,
}

impl PortMapping {
    /// Map `container_port` to `host_port`.
    #[must_use]
    pub fn new(container_port: impl AsRef<str>, host_port: Option<u16>) -> Self {
        Self {
            container_port: normalize_container_port(container_port.as_ref()),
            host_port,
        }
    }

    /// Map a TCP container port to a fixed host port.
    #[must_use]
    pub fn tcp(container_port: u16, host_port: u16) -> Self {
        Self::new(container_port.to_string(), Some(host_port))
    }

    /// Replace the host side of the mapping.
    #[must_use]
    pub const fn with_host_port(mut self, host_port: Option<u16>) -> Self {
        self.host_port = host_port;
        self
    }

    /// Return the container port in engine form, e.g. `6379/tcp`.
    #[must_use]
    pub fn container_port(&self) -> &str {
        &self.container_port
    }

    /// Return the requested host port, if fixed.
    #[must_use]
    pub const fn host_port(&self) -> Option<u16> {
        self.host_port
    }
}

fn normalize_container_port(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.contains('/') {
        String::from(trimmed)
    } else {
        format!("{trimmed}/{DEFAULT_PROTOCOL}")
    }
}

/// Engine restart policy applied to the container.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RestartPolicy {
    /// Never restart.
    #[default]
    No,
    /// Always restart.
    Always,
    /// Restart unless explicitly stopped.
    UnlessStopped,
    /// Restart when the process exits non-zero.
    OnFailure,
}

impl RestartPolicy {
    /// Return the engine's name for the policy.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::No => "no",
            Self::Always => "always",
            Self::UnlessStopped => "unless-stopped",
            Self::OnFailure => "on-failure",
        }
    }
}

impl fmt::Display for RestartPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
