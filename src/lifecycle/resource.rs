//! The outward-facing result of `up` and its teardown.

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::mem;
use std::pin::Pin;
use std::sync::Arc;

use super::LifecycleState;
use crate::engine::{ContainerEngine, Endpoint, EngineConnector, RunningContainer};
use crate::error::{FixtureError, TestdockError};
use crate::services::ServiceClient;

/// Boxed future returned by [`Fixture::cleanup`].
pub type CleanupFuture<'a> = Pin<Box<dyn Future<Output = Result<(), TestdockError>> + Send + 'a>>;

/// Bound removal of a fixture's container.
///
/// Only exists once a container was started and its client built, so a
/// fixture that never got that far has nothing callable to tear down.
pub struct Teardown {
    engine: Arc<dyn ContainerEngine>,
    container_id: String,
}

impl Teardown {
    pub(crate) fn new(engine: Arc<dyn ContainerEngine>, container_id: impl Into<String>) -> Self {
        Self {
            engine,
            container_id: container_id.into(),
        }
    }

    /// Return the engine ID of the container this teardown removes.
    #[must_use]
    pub fn container_id(&self) -> &str {
        &self.container_id
    }

    /// Close `client`, then purge the container. Both steps are attempted;
    /// the first failure is returned.
    async fn run<C: ServiceClient>(self, name: &str, client: Option<C>) -> Result<(), TestdockError> {
        let closed = close_client(name, client).await;
        let purged = EngineConnector::purge_async(self.engine.as_ref(), &self.container_id)
            .await
            .map_err(TestdockError::from);
        if purged.is_ok() {
            tracing::info!(fixture = name, container = %self.container_id, "fixture released");
        }
        closed.and(purged)
    }
}

impl fmt::Debug for Teardown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Teardown")
            .field("container_id", &self.container_id)
            .finish_non_exhaustive()
    }
}

async fn close_client<C: ServiceClient>(name: &str, client: Option<C>) -> Result<(), TestdockError> {
    let Some(live) = client else {
        return Ok(());
    };
    live.shutdown().await.map_err(|failure| {
        TestdockError::from(FixtureError::CloseFailed {
            name: String::from(name),
            message: failure.to_string(),
        })
    })
}

/// Phase of a [`Resource`].
pub enum ResourceState<C> {
    /// The service answered and its client is live.
    Ready {
        /// The typed client.
        client: C,
        /// The engine handle of the running container.
        container: RunningContainer,
        /// Where the client connects.
        endpoint: Endpoint,
        /// Removes the container on cleanup.
        teardown: Teardown,
    },
    /// Startup stopped at `error`.
    ///
    /// A failure after the client was built (post-ready step) keeps both the
    /// client and the teardown so cleanup still removes the container.
    Failed {
        /// The startup failure.
        error: FixtureError,
        /// The client, when it was built before the failure.
        client: Option<C>,
        /// The teardown, when the container outlived the failure.
        teardown: Option<Teardown>,
    },
    /// Cleanup has run; the startup error, if any, is kept for reporting.
    Released {
        /// The startup failure recorded before cleanup.
        error: Option<FixtureError>,
    },
}

/// A started (or failed) fixture with its typed client.
///
/// Startup failures never escape `up`; they are recorded here and surface
/// through [`Resource::error`] or a registry lookup.
pub struct Resource<C> {
    name: String,
    state: ResourceState<C>,
    warnings: Vec<String>,
}

impl<C: ServiceClient> Resource<C> {
    pub(crate) fn ready(
        name: impl Into<String>,
        client: C,
        container: RunningContainer,
        endpoint: Endpoint,
        teardown: Teardown,
    ) -> Self {
        Self::with_state(
            name,
            ResourceState::Ready {
                client,
                container,
                endpoint,
                teardown,
            },
        )
    }

    pub(crate) fn failed(name: impl Into<String>, error: FixtureError) -> Self {
        Self::failed_with(name, error, None, None)
    }

    pub(crate) fn failed_with(
        name: impl Into<String>,
        error: FixtureError,
        client: Option<C>,
        teardown: Option<Teardown>,
    ) -> Self {
        Self::with_state(
            name,
            ResourceState::Failed {
                error,
                client,
                teardown,
            },
        )
    }

    fn with_state(name: impl Into<String>, state: ResourceState<C>) -> Self {
        Self {
            name: name.into(),
            state,
            warnings: Vec::new(),
        }
    }

    pub(crate) fn with_warnings(mut self, warnings: Vec<String>) -> Self {
        self.warnings = warnings;
        self
    }

    /// Return the configured container name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Return the startup failure, if any.
    #[must_use]
    pub const fn error(&self) -> Option<&FixtureError> {
        match &self.state {
            ResourceState::Ready { .. } => None,
            ResourceState::Failed { error, .. } => Some(error),
            ResourceState::Released { error } => error.as_ref(),
        }
    }

    /// Return the typed client while the resource is ready.
    #[must_use]
    pub const fn client(&self) -> Option<&C> {
        match &self.state {
            ResourceState::Ready { client, .. } => Some(client),
            _ => None,
        }
    }

    /// Return the endpoint the client connects to while ready.
    #[must_use]
    pub const fn endpoint(&self) -> Option<&Endpoint> {
        match &self.state {
            ResourceState::Ready { endpoint, .. } => Some(endpoint),
            _ => None,
        }
    }

    /// Return the running container while ready.
    #[must_use]
    pub const fn container(&self) -> Option<&RunningContainer> {
        match &self.state {
            ResourceState::Ready { container, .. } => Some(container),
            _ => None,
        }
    }

    /// Return non-fatal problems met during startup.
    #[must_use]
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// Return the full phase, including any held teardown.
    #[must_use]
    pub const fn phase(&self) -> &ResourceState<C> {
        &self.state
    }

    /// Return the lifecycle state this resource is in.
    #[must_use]
    pub const fn state(&self) -> LifecycleState {
        match &self.state {
            ResourceState::Ready { .. } => LifecycleState::Ready,
            ResourceState::Failed { .. } => LifecycleState::Failed,
            ResourceState::Released { .. } => LifecycleState::Released,
        }
    }

    /// Close the client and remove the container.
    ///
    /// Runs at most once: the resource is marked released before the
    /// teardown starts, so later calls return `Ok(())` without touching the
    /// engine. A failed resource without a teardown has nothing to remove.
    ///
    /// # Errors
    ///
    /// Returns `FixtureError::CloseFailed` when the client refuses to close
    /// or `ContainerError::PurgeFailed` when the engine refuses the removal.
    /// Both steps are attempted before the first failure is returned.
    pub async fn cleanup_async(&mut self) -> Result<(), TestdockError> {
        let previous = mem::replace(&mut self.state, ResourceState::Released { error: None });
        let (error, client, teardown) = match previous {
            ResourceState::Ready {
                client, teardown, ..
            } => (None, Some(client), Some(teardown)),
            ResourceState::Failed {
                error,
                client,
                teardown,
            } => (Some(error), client, teardown),
            ResourceState::Released { error } => {
                self.state = ResourceState::Released { error };
                return Ok(());
            }
        };
        self.state = ResourceState::Released { error };

        match teardown {
            Some(bound) => bound.run(&self.name, client).await,
            None => close_client(&self.name, client).await,
        }
    }

    /// Close the client and remove the container, blocking on `runtime`.
    ///
    /// # Panics
    ///
    /// Panics when called from within an async context; use [`Self::cleanup_async`]
    /// there instead.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`Self::cleanup_async`].
    pub fn cleanup(&mut self, runtime: &tokio::runtime::Handle) -> Result<(), TestdockError> {
        runtime.block_on(self.cleanup_async())
    }
}

impl<C> fmt::Debug for Resource<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let phase = match &self.state {
            ResourceState::Ready { .. } => "ready",
            ResourceState::Failed { .. } => "failed",
            ResourceState::Released { .. } => "released",
        };
        f.debug_struct("Resource")
            .field("name", &self.name)
            .field("phase", &phase)
            .field("warnings", &self.warnings)
            .finish_non_exhaustive()
    }
}

/// Object-safe view of a [`Resource`], stored by the registry.
pub trait Fixture: Send + Sync + fmt::Debug {
    /// Return the configured container name.
    fn name(&self) -> &str;

    /// Return the startup failure, if any.
    fn error(&self) -> Option<&FixtureError>;

    /// Return the lifecycle state.
    fn state(&self) -> LifecycleState;

    /// Return non-fatal problems met during startup.
    fn warnings(&self) -> &[String];

    /// Close the client and remove the container; see
    /// [`Resource::cleanup_async`].
    fn cleanup(&mut self) -> CleanupFuture<'_>;

    /// Return `self` for downcasting to the typed [`Resource`].
    fn as_any(&self) -> &dyn Any;
}

impl<C: ServiceClient> Fixture for Resource<C> {
    fn name(&self) -> &str {
        Self::name(self)
    }

    fn error(&self) -> Option<&FixtureError> {
        Self::error(self)
    }

    fn state(&self) -> LifecycleState {
        Self::state(self)
    }

    fn warnings(&self) -> &[String] {
        Self::warnings(self)
    }

    fn cleanup(&mut self) -> CleanupFuture<'_> {
        Box::pin(self.cleanup_async())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
