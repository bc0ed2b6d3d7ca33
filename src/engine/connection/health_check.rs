//! Health check and connect-and-verify functionality.
//!
//! The lifecycle pings the engine before touching any container so an
//! unreachable daemon is reported separately from a container that failed to
//! start.

use std::sync::Arc;
use std::time::Duration;

use bollard::Docker;
use bollard::errors::Error as BollardError;

use super::error_classification::classify_connection_error;
use super::{ContainerEngine, EngineConnector, HEALTH_CHECK_TIMEOUT_SECS, SocketResolver};
use crate::error::{ContainerError, TestdockError};

impl EngineConnector {
    /// Ping with timeout, classifying transport failures against `socket`.
    pub(super) async fn ping_with_timeout(
        engine: &dyn ContainerEngine,
        socket: Option<&str>,
    ) -> Result<(), ContainerError> {
        let timeout = Duration::from_secs(HEALTH_CHECK_TIMEOUT_SECS);

        tokio::time::timeout(timeout, engine.ping())
            .await
            .map_err(|_| ContainerError::HealthCheckTimeout {
                seconds: HEALTH_CHECK_TIMEOUT_SECS,
            })?
            .map_err(|error| classify_ping_error(&error, socket))
    }

    /// Verify the container engine is responsive (async version).
    ///
    /// Sends a ping request and waits at most ten seconds for the answer.
    ///
    /// # Errors
    ///
    /// Returns `ContainerError::HealthCheckFailed` if the engine does not
    /// respond correctly.
    ///
    /// Returns `ContainerError::HealthCheckTimeout` if the check times out.
    pub async fn health_check_async(engine: &dyn ContainerEngine) -> Result<(), TestdockError> {
        Self::ping_with_timeout(engine, None)
            .await
            .map_err(TestdockError::from)
    }

    /// Verify the container engine is responsive.
    ///
    /// This is the synchronous version that creates a dedicated tokio runtime.
    /// Use [`Self::health_check_async`] when already in an async context.
    ///
    /// # Errors
    ///
    /// Returns `ContainerError::RuntimeCreationFailed` if the tokio runtime
    /// cannot be created, otherwise the errors of [`Self::health_check_async`].
    pub fn health_check(engine: &dyn ContainerEngine) -> Result<(), TestdockError> {
        let rt = Self::create_runtime()?;
        rt.block_on(Self::health_check_async(engine))
    }

    /// Create a tokio runtime for synchronous operations.
    pub(crate) fn create_runtime() -> Result<tokio::runtime::Runtime, TestdockError> {
        tokio::runtime::Runtime::new().map_err(|e| {
            TestdockError::from(ContainerError::RuntimeCreationFailed {
                message: e.to_string(),
            })
        })
    }

    /// Connect to the engine at `socket` and verify it responds.
    ///
    /// A missing or unreadable Unix socket is only noticed on the first
    /// request; it is reported as `SocketNotFound` or `PermissionDenied`.
    ///
    /// # Errors
    ///
    /// Returns the connection error, or the classified ping failure.
    pub async fn connect_and_verify_async(
        socket: impl AsRef<str>,
    ) -> Result<Arc<dyn ContainerEngine>, TestdockError> {
        let socket_str = socket.as_ref();
        let docker: Docker = Self::connect(socket_str)?;
        Self::ping_with_timeout(&docker, Some(socket_str)).await?;
        Ok(Arc::new(docker))
    }

    /// Resolve the socket with fallback, connect, and verify the engine.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`Self::connect_and_verify_async`].
    pub async fn connect_with_fallback_and_verify_async<E: mockable::Env>(
        config_socket: Option<&str>,
        resolver: &SocketResolver<'_, E>,
    ) -> Result<Arc<dyn ContainerEngine>, TestdockError> {
        let socket = Self::resolve_socket(config_socket, resolver);
        tracing::debug!(%socket, "connecting to container engine");
        Self::connect_and_verify_async(socket).await
    }
}

fn classify_ping_error(error: &BollardError, socket: Option<&str>) -> ContainerError {
    match (error, socket) {
        (BollardError::DockerResponseServerError { .. }, _) | (_, None) => {
            ContainerError::HealthCheckFailed {
                message: error.to_string(),
            }
        }
        (_, Some(socket_uri)) => classify_connection_error(error, socket_uri),
    }
}
