//! Semantic error types for testdock.
//!
//! This module defines the error hierarchy for testdock, following the
//! principle of using semantic error enums (via `thiserror`) for conditions the
//! caller might inspect or match on, while reserving opaque errors
//! (`eyre::Report`) for the binary boundary.
//!
//! Startup failures of a fixture are never raised from `up`; they are captured
//! as a [`FixtureError`] inside the returned resource and surface when the test
//! asks for that resource.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

/// Errors that can occur during configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be parsed.
    #[error("failed to parse configuration file: {message}")]
    ParseError {
        /// A description of the parse error.
        message: String,
    },

    /// A configuration value failed validation.
    #[error("invalid configuration value for '{field}': {reason}")]
    InvalidValue {
        /// The name of the invalid field.
        field: String,
        /// The reason the value is invalid.
        reason: String,
    },

    /// The `OrthoConfig` library returned an error during configuration loading.
    #[error("configuration loading failed: {0}")]
    OrthoConfig(Arc<ortho_config::OrthoError>),
}

/// Errors that can occur while talking to the container engine.
#[derive(Debug, Error)]
pub enum ContainerError {
    /// Failed to connect to the container engine socket.
    #[error("failed to connect to container engine: {message}")]
    ConnectionFailed {
        /// A description of the connection failure.
        message: String,
    },

    /// The container engine socket was not found.
    #[error("container engine socket not found: {path}")]
    SocketNotFound {
        /// The path where the socket was expected.
        path: PathBuf,
    },

    /// Permission denied when accessing the container engine socket.
    #[error("permission denied accessing container socket: {path}")]
    PermissionDenied {
        /// The path to the socket.
        path: PathBuf,
    },

    /// Failed to create the Tokio runtime backing a blocking helper.
    #[error("failed to create async runtime: {message}")]
    RuntimeCreationFailed {
        /// A description of the runtime failure.
        message: String,
    },

    /// Health check failed - engine did not respond correctly.
    #[error("container engine health check failed: {message}")]
    HealthCheckFailed {
        /// A description of the health check failure.
        message: String,
    },

    /// Health check timed out.
    #[error("container engine health check timed out after {seconds} seconds")]
    HealthCheckTimeout {
        /// The timeout duration in seconds.
        seconds: u64,
    },

    /// Removing a container failed for a reason other than it being gone.
    #[error("failed to purge container '{container}': {message}")]
    PurgeFailed {
        /// The ID or name of the container.
        container: String,
        /// A description of the removal failure.
        message: String,
    },

    /// Listing containers failed.
    #[error("failed to list containers: {message}")]
    ListFailed {
        /// A description of the listing failure.
        message: String,
    },

    /// The expiry timer for a container could not be spawned.
    #[error("failed to schedule expiry for container '{container}': {message}")]
    ExpiryNotScheduled {
        /// The ID or name of the container.
        container: String,
        /// Why the timer could not be spawned.
        message: String,
    },
}

/// Startup and teardown failures of a single fixture.
///
/// Values are cloneable so a registry can hand the original failure back to
/// every caller that asks for the resource.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FixtureError {
    /// The connection spec was incomplete before the engine was contacted.
    #[error("invalid fixture specification for '{field}': {reason}")]
    InvalidSpec {
        /// The offending spec field.
        field: String,
        /// Why the value was rejected.
        reason: String,
    },

    /// The container engine could not be reached.
    #[error("container engine unavailable: {message}")]
    EngineUnavailable {
        /// A description of the engine failure.
        message: String,
    },

    /// The engine rejected the create or start request.
    #[error("failed to start container '{name}': {message}")]
    ContainerStartFailed {
        /// The configured container name.
        name: String,
        /// The engine's error message.
        message: String,
    },

    /// The readiness probe never succeeded within the wait budget.
    #[error(
        "container '{name}' not ready after {attempts} attempt(s) in {waited:?}: {last_failure}"
    )]
    ReadinessTimeout {
        /// The configured container name.
        name: String,
        /// Number of probe attempts made.
        attempts: u32,
        /// Wall-clock time spent polling.
        waited: Duration,
        /// The failure reported by the last probe attempt.
        last_failure: String,
    },

    /// The service answered but the client library rejected the connection.
    #[error("failed to construct client for '{name}': {message}")]
    ClientConstructionFailed {
        /// The configured container name.
        name: String,
        /// The client library's error message.
        message: String,
    },

    /// The post-ready step (schema migrations) failed.
    #[error("post-ready migration failed for '{name}': {message}")]
    MigrationFailed {
        /// The configured container name.
        name: String,
        /// The migration runner's error message.
        message: String,
    },

    /// Closing the typed client during cleanup failed.
    #[error("failed to close client for '{name}': {message}")]
    CloseFailed {
        /// The configured container name.
        name: String,
        /// The client library's error message.
        message: String,
    },
}

/// Errors raised when looking resources up in a registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// No resource has been registered under the name.
    #[error("resource not found: {name}")]
    NotFound {
        /// The requested resource name.
        name: String,
    },

    /// The resource exists but its client is not of the requested type.
    #[error("resource '{name}' does not hold a client of type {expected}")]
    WrongClientType {
        /// The requested resource name.
        name: String,
        /// The requested client type.
        expected: &'static str,
    },

    /// The resource has been cleaned up and no longer holds a client.
    #[error("resource '{name}' has been released")]
    Released {
        /// The requested resource name.
        name: String,
    },
}

/// A failure reported by a backend adapter, probe attempt, or client library.
///
/// Adapters flatten library errors into a message; the lifecycle then wraps
/// the message in the [`FixtureError`] variant matching the step that failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ServiceFailure {
    message: String,
}

impl ServiceFailure {
    /// Create a failure from any displayable message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Return the failure message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Top-level error type for testdock.
///
/// This enum aggregates all domain-specific errors into a single type. At the
/// binary boundary these errors are converted to `eyre::Report`.
#[derive(Debug, Error)]
pub enum TestdockError {
    /// An error occurred during configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// An error occurred while talking to the container engine.
    #[error(transparent)]
    Container(#[from] ContainerError),

    /// A fixture failed to start or to tear down.
    #[error(transparent)]
    Fixture(#[from] FixtureError),

    /// A registry lookup failed.
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// A specialised `Result` type for testdock operations.
pub type Result<T> = std::result::Result<T, TestdockError>;
