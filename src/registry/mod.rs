//! Named collection of started fixtures.
//!
//! Tests set every fixture up once, then look resources up by name. A lookup
//! of a fixture that failed to start returns its original startup error, so
//! the failure is reported where the resource is used rather than as a
//! generic "not found".

use std::collections::HashMap;

use crate::error::{RegistryError, TestdockError};
use crate::lifecycle::{Fixture, Lifecycle, LifecycleState, Resource};
use crate::services::{Container, ServiceClient};

/// Fixtures keyed by container name.
#[derive(Default)]
pub struct Registry {
    resources: HashMap<String, Box<dyn Fixture>>,
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("names", &self.names())
            .finish()
    }
}

impl Registry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `fixture` under its name, replacing any earlier entry.
    pub fn register(&mut self, fixture: Box<dyn Fixture>) {
        let name = String::from(fixture.name());
        if self.resources.insert(name.clone(), fixture).is_some() {
            tracing::debug!(fixture = %name, "replaced registered fixture");
        }
    }

    /// Return the fixture registered under `name`.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::NotFound` when nothing is registered under
    /// `name`, or the fixture's own startup error when it failed to start.
    pub fn get_by_name(&self, name: &str) -> Result<&dyn Fixture, TestdockError> {
        let fixture = self.lookup(name)?;
        fixture
            .error()
            .map_or_else(|| Ok(fixture), |error| Err(TestdockError::from(error.clone())))
    }

    /// Return the typed client of the fixture registered under `name`.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`Self::get_by_name`], `WrongClientType` when
    /// the fixture holds a different client type, and `Released` once the
    /// fixture has been cleaned up.
    pub fn client<C: ServiceClient>(&self, name: &str) -> Result<&C, TestdockError> {
        let fixture = self.get_by_name(name)?;
        let resource = fixture
            .as_any()
            .downcast_ref::<Resource<C>>()
            .ok_or_else(|| RegistryError::WrongClientType {
                name: String::from(name),
                expected: std::any::type_name::<C>(),
            })?;
        resource.client().ok_or_else(|| {
            TestdockError::from(RegistryError::Released {
                name: String::from(name),
            })
        })
    }

    /// Start each container in order and register every result.
    ///
    /// A failing container does not stop the ones after it; its error is
    /// reported by later lookups.
    pub async fn setup_async(&mut self, lifecycle: &Lifecycle, containers: &[&dyn Container]) {
        for container in containers {
            let fixture = container.up(lifecycle).await;
            if fixture.state() == LifecycleState::Ready {
                tracing::info!(fixture = fixture.name(), "fixture registered");
            } else {
                tracing::warn!(fixture = fixture.name(), "registered fixture that failed to start");
            }
            self.register(fixture);
        }
    }

    /// Start and register containers, blocking on `runtime`.
    ///
    /// # Panics
    ///
    /// Panics when called from within an async context; use [`Self::setup_async`]
    /// there instead.
    pub fn setup(
        &mut self,
        runtime: &tokio::runtime::Handle,
        lifecycle: &Lifecycle,
        containers: &[&dyn Container],
    ) {
        runtime.block_on(self.setup_async(lifecycle, containers));
    }

    /// Clean up every registered fixture.
    ///
    /// Every fixture is attempted; entries stay registered in the released
    /// state.
    ///
    /// # Errors
    ///
    /// Returns the first cleanup error encountered.
    pub async fn cleanup_all_async(&mut self) -> Result<(), TestdockError> {
        let mut first_error = None;
        for (name, fixture) in &mut self.resources {
            if let Err(error) = fixture.cleanup().await {
                tracing::warn!(fixture = %name, %error, "fixture cleanup failed");
                first_error.get_or_insert(error);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Clean up every registered fixture, blocking on `runtime`.
    ///
    /// # Panics
    ///
    /// Panics when called from within an async context; use [`Self::cleanup_all_async`]
    /// there instead.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`Self::cleanup_all_async`].
    pub fn cleanup_all(&mut self, runtime: &tokio::runtime::Handle) -> Result<(), TestdockError> {
        runtime.block_on(self.cleanup_all_async())
    }

    /// Return the registered names in sorted order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.resources.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Return the number of registered fixtures.
    #[must_use]
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    /// Return whether nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    fn lookup(&self, name: &str) -> Result<&dyn Fixture, RegistryError> {
        self.resources
            .get(name)
            .map(Box::as_ref)
            .ok_or_else(|| RegistryError::NotFound {
                name: String::from(name),
            })
    }
}
