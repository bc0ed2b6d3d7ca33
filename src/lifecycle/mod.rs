//! The retry-connect lifecycle shared by every service adapter.
//!
//! [`Lifecycle::up_async`] takes a finished spec through these steps:
//!
//! 1. validate the spec
//! 2. ping the engine
//! 3. reuse or create and start the container
//! 4. schedule its expiry (best-effort)
//! 5. resolve the host endpoint of the primary port
//! 6. poll the adapter's readiness probe with exponential backoff
//! 7. build the typed client
//! 8. bind the teardown
//! 9. run the adapter's post-ready step
//!
//! Any failure is recorded in the returned [`Resource`] instead of being
//! raised, so one broken fixture does not stop its siblings from starting.

mod readiness;
mod resource;
mod state;

use std::sync::Arc;
use std::time::{Duration, SystemTime};

pub use readiness::{MAX_BACKOFF, NotReady, ProbeFuture, ReadinessProbe, RetryPolicy, wait_until_ready};
pub use resource::{CleanupFuture, Fixture, Resource, ResourceState, Teardown};
pub use state::LifecycleState;
use state::StateTracker;

use crate::engine::{
    ContainerEngine, Endpoint, EngineConnector, HostPlatform, RunningContainer, SocketResolver,
    expiry_deadline,
};
use crate::error::{FixtureError, TestdockError};
use crate::services::ServiceAdapter;
use crate::spec::ConnectionSpec;

/// Drives fixtures from spec to ready client on one container engine.
///
/// The engine handle is shared by every fixture started through the same
/// lifecycle.
#[derive(Clone)]
pub struct Lifecycle {
    engine: Arc<dyn ContainerEngine>,
    platform: HostPlatform,
}

impl std::fmt::Debug for Lifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lifecycle")
            .field("platform", &self.platform)
            .finish_non_exhaustive()
    }
}

impl Lifecycle {
    /// Create a lifecycle on an existing engine handle.
    #[must_use]
    pub fn new(engine: Arc<dyn ContainerEngine>) -> Self {
        Self {
            engine,
            platform: HostPlatform::current(),
        }
    }

    /// Override the host platform used to resolve endpoints.
    #[must_use]
    pub const fn with_platform(mut self, platform: HostPlatform) -> Self {
        self.platform = platform;
        self
    }

    /// Return the shared engine handle.
    #[must_use]
    pub const fn engine(&self) -> &Arc<dyn ContainerEngine> {
        &self.engine
    }

    /// Resolve the engine socket, connect, and verify the engine answers.
    ///
    /// `config_socket` wins over `DOCKER_HOST`, `CONTAINER_HOST`, and
    /// `PODMAN_HOST`, which win over the platform default.
    ///
    /// # Errors
    ///
    /// Returns the connection or health-check failure.
    pub async fn connect_async(config_socket: Option<&str>) -> Result<Self, TestdockError> {
        let env = mockable::DefaultEnv::new();
        let resolver = SocketResolver::new(&env);
        let engine =
            EngineConnector::connect_with_fallback_and_verify_async(config_socket, &resolver)
                .await?;
        Ok(Self::new(engine))
    }

    /// Connect to the engine, blocking on `runtime`.
    ///
    /// # Panics
    ///
    /// Panics when called from within an async context; use [`Self::connect_async`]
    /// there instead.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`Self::connect_async`].
    pub fn connect(
        runtime: &tokio::runtime::Handle,
        config_socket: Option<&str>,
    ) -> Result<Self, TestdockError> {
        runtime.block_on(Self::connect_async(config_socket))
    }

    /// Start the fixture described by `spec` and return its resource.
    ///
    /// Never fails: startup errors are recorded in the resource. A readiness
    /// timeout leaves the container running for inspection.
    pub async fn up_async<A: ServiceAdapter>(
        &self,
        adapter: &A,
        spec: &ConnectionSpec<A::Settings>,
    ) -> Resource<A::Client> {
        let name = spec.name();
        let mut tracker = StateTracker::new(name);
        let mut warnings = Vec::new();

        let resource = match self.start(adapter, spec, &mut tracker, &mut warnings).await {
            Ok(started) => started,
            Err(error) => {
                tracker.advance(LifecycleState::Failed);
                tracing::warn!(fixture = name, %error, "fixture failed to start");
                Resource::failed(name, error)
            }
        };
        resource.with_warnings(warnings)
    }

    /// Start the fixture, blocking on `runtime`.
    ///
    /// # Panics
    ///
    /// Panics when called from within an async context; use [`Self::up_async`]
    /// there instead.
    pub fn up<A: ServiceAdapter>(
        &self,
        runtime: &tokio::runtime::Handle,
        adapter: &A,
        spec: &ConnectionSpec<A::Settings>,
    ) -> Resource<A::Client> {
        runtime.block_on(self.up_async(adapter, spec))
    }

    async fn start<A: ServiceAdapter>(
        &self,
        adapter: &A,
        spec: &ConnectionSpec<A::Settings>,
        tracker: &mut StateTracker<'_>,
        warnings: &mut Vec<String>,
    ) -> Result<Resource<A::Client>, FixtureError> {
        let name = spec.name();
        let container_spec = spec.container();
        container_spec.validate()?;
        let port = container_spec
            .port()
            .ok_or_else(|| FixtureError::InvalidSpec {
                field: String::from("port"),
                reason: String::from("a primary port mapping is required"),
            })?;

        EngineConnector::health_check_async(self.engine.as_ref())
            .await
            .map_err(|error| FixtureError::EngineUnavailable {
                message: error.to_string(),
            })?;

        tracker.advance(LifecycleState::Starting);
        let expire_secs = container_spec.resource_expire_secs();
        let expires_at = expiry_deadline(SystemTime::now(), expire_secs);
        let container =
            EngineConnector::realize_async(self.engine.as_ref(), container_spec, expires_at)
                .await?;
        if expires_at.is_some() {
            self.schedule_expiry(&container, expire_secs, warnings);
        }

        let endpoint = Endpoint::resolve(&container, port.container_port(), self.platform)
            .ok_or_else(|| FixtureError::ContainerStartFailed {
                name: String::from(name),
                message: format!("port {} is not published", port.container_port()),
            })?;

        tracker.advance(LifecycleState::WaitingReady);
        let probe = adapter.readiness_probe(spec);
        let policy = RetryPolicy::new(container_spec.pool_max_wait(), container_spec.initial_backoff());
        let attempts = wait_until_ready(&probe, &endpoint, policy)
            .await
            .map_err(|not_ready| FixtureError::ReadinessTimeout {
                name: String::from(name),
                attempts: not_ready.attempts,
                waited: not_ready.waited,
                last_failure: not_ready.last_failure.to_string(),
            })?;

        let client = adapter.connect(spec, &endpoint).await.map_err(|failure| {
            FixtureError::ClientConstructionFailed {
                name: String::from(name),
                message: failure.to_string(),
            }
        })?;

        let teardown = Teardown::new(Arc::clone(&self.engine), container.id());
        if let Err(failure) = adapter.after_ready(&client, spec).await {
            let error = FixtureError::MigrationFailed {
                name: String::from(name),
                message: failure.to_string(),
            };
            tracker.advance(LifecycleState::Failed);
            tracing::warn!(fixture = name, %error, "post-ready step failed");
            return Ok(Resource::failed_with(name, error, Some(client), Some(teardown)));
        }

        tracker.advance(LifecycleState::Ready);
        tracing::info!(
            fixture = name,
            %endpoint,
            attempts,
            reused = container.reused(),
            "fixture ready"
        );
        Ok(Resource::ready(name, client, container, endpoint, teardown))
    }

    fn schedule_expiry(&self, container: &RunningContainer, expire_secs: u64, warnings: &mut Vec<String>) {
        let after = Duration::from_secs(expire_secs);
        match EngineConnector::schedule_expiry(Arc::clone(&self.engine), container.id(), after) {
            Ok(_) => {
                tracing::debug!(fixture = container.name(), expire_secs, "container expiry scheduled");
            }
            Err(error) => {
                tracing::warn!(fixture = container.name(), %error, "container expiry not scheduled");
                warnings.push(error.to_string());
            }
        }
    }
}
