//! Container engine connection and container management.
//!
//! This module connects to Docker or Podman and drives fixture containers
//! through the object-safe [`ContainerEngine`] seam. The socket endpoint is
//! resolved through a priority-based fallback chain:
//!
//! 1. CLI argument (`--engine-socket`)
//! 2. Config file (`engine_socket` in TOML)
//! 3. `TESTDOCK_ENGINE_SOCKET` environment variable
//! 4. `DOCKER_HOST` environment variable
//! 5. `CONTAINER_HOST` environment variable
//! 6. `PODMAN_HOST` environment variable
//! 7. Platform default (`/var/run/docker.sock` on Unix)

mod connection;
mod endpoint;

pub(crate) use connection::expiry_deadline;
pub use connection::{
    ContainerEngine, EXPIRES_AT_LABEL, EngineConnector, EngineFuture, MANAGED_LABEL,
    PublishedPort, RunningContainer, SocketResolver,
};
#[cfg(test)]
pub(crate) use connection::{MockEngine, inspect_response, server_error};
pub use endpoint::{Endpoint, HostPlatform};
