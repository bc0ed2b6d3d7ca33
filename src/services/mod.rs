//! Backend adapters and the contract they implement.
//!
//! A [`ServiceAdapter`] supplies everything backend-specific about a fixture:
//! its canonical defaults, the readiness probe, the typed client factory, and
//! an optional post-ready step. The retry-connect lifecycle itself is shared
//! and lives in [`crate::lifecycle`].

#[cfg(feature = "minio")]
pub mod minio;
#[cfg(feature = "postgres")]
pub mod postgres;
#[cfg(feature = "redis")]
pub mod redis;
#[cfg(test)]
pub(crate) mod test_support;

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use crate::engine::Endpoint;
use crate::error::ServiceFailure;
use crate::lifecycle::{Fixture, Lifecycle, ReadinessProbe, Resource};
use crate::spec::ConnectionSpec;

/// Boxed future type returned by adapter and client operations.
pub type ServiceFuture<'a, T> =
    Pin<Box<dyn Future<Output = Result<T, ServiceFailure>> + Send + 'a>>;

/// Boxed future type returned by [`Container::up`].
pub type FixtureFuture<'a> = Pin<Box<dyn Future<Output = Box<dyn Fixture>> + Send + 'a>>;

/// A typed client handed to tests once its service is ready.
pub trait ServiceClient: Send + Sync + 'static {
    /// Close the client, releasing pooled connections.
    fn shutdown(self) -> ServiceFuture<'static, ()>;
}

/// Backend-specific half of the retry-connect lifecycle.
pub trait ServiceAdapter: Send + Sync + 'static {
    /// Backend payload carried by the connection spec.
    type Settings: Clone + fmt::Debug + Send + Sync + 'static;
    /// Client returned to tests.
    type Client: ServiceClient;
    /// Readiness probe polled until the service answers.
    type Probe: ReadinessProbe;

    /// Return the canonical default spec for this backend.
    fn defaults(&self) -> ConnectionSpec<Self::Settings>;

    /// Return environment entries derived from the payload.
    ///
    /// They are placed before caller-supplied entries, so the caller wins.
    fn derived_env(&self, settings: &Self::Settings) -> Vec<String>;

    /// Build the readiness probe for `spec`.
    fn readiness_probe(&self, spec: &ConnectionSpec<Self::Settings>) -> Self::Probe;

    /// Build the typed client bound to `endpoint`.
    fn connect<'a>(
        &'a self,
        spec: &'a ConnectionSpec<Self::Settings>,
        endpoint: &'a Endpoint,
    ) -> ServiceFuture<'a, Self::Client>;

    /// Run the post-ready step, such as schema migrations.
    fn after_ready<'a>(
        &'a self,
        _client: &'a Self::Client,
        _spec: &'a ConnectionSpec<Self::Settings>,
    ) -> ServiceFuture<'a, ()> {
        Box::pin(async { Ok(()) })
    }

    /// Return the URL a client uses to reach the service at `endpoint`.
    fn connection_url(&self, spec: &ConnectionSpec<Self::Settings>, endpoint: &Endpoint) -> String;
}

/// A configured fixture: an adapter paired with its finished spec.
#[derive(Debug, Clone)]
pub struct ServiceContainer<A: ServiceAdapter> {
    adapter: A,
    spec: ConnectionSpec<A::Settings>,
}

impl<A: ServiceAdapter> ServiceContainer<A> {
    /// Pair an adapter with a spec.
    #[must_use]
    pub const fn new(adapter: A, spec: ConnectionSpec<A::Settings>) -> Self {
        Self { adapter, spec }
    }

    /// Return the adapter.
    #[must_use]
    pub const fn adapter(&self) -> &A {
        &self.adapter
    }

    /// Return the finished spec.
    #[must_use]
    pub const fn spec(&self) -> &ConnectionSpec<A::Settings> {
        &self.spec
    }

    /// Start the fixture and return its typed resource.
    pub async fn up_async(&self, lifecycle: &Lifecycle) -> Resource<A::Client> {
        lifecycle.up_async(&self.adapter, &self.spec).await
    }

    /// Start the fixture, blocking on `runtime`.
    ///
    /// # Panics
    ///
    /// Panics when called from within an async context; use [`Self::up_async`]
    /// there instead.
    pub fn up(&self, runtime: &tokio::runtime::Handle, lifecycle: &Lifecycle) -> Resource<A::Client> {
        runtime.block_on(self.up_async(lifecycle))
    }
}

/// Object-safe view of a [`ServiceContainer`] used by the registry.
pub trait Container: Send + Sync {
    /// Return the configured container name.
    fn name(&self) -> &str;

    /// Start the fixture and return it type-erased.
    fn up<'a>(&'a self, lifecycle: &'a Lifecycle) -> FixtureFuture<'a>;
}

impl<A: ServiceAdapter> Container for ServiceContainer<A> {
    fn name(&self) -> &str {
        self.spec.name()
    }

    fn up<'a>(&'a self, lifecycle: &'a Lifecycle) -> FixtureFuture<'a> {
        Box::pin(async move {
            let resource = self.up_async(lifecycle).await;
            Box::new(resource) as Box<dyn Fixture>
        })
    }
}
