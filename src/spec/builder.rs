//! Option surface for assembling a [`ConnectionSpec`].

use std::time::Duration;

use super::{ConnectionSpec, ContainerSpec, PortMapping, RestartPolicy};
use crate::config::FixtureDefaults;
use crate::services::{ServiceAdapter, ServiceContainer};

/// Builder seeded with an adapter's defaults.
///
/// Setters are applied in call order: a later call overrides an earlier one
/// and the defaults. Backend-specific setters are inherent methods on
/// `SpecBuilder<Postgres>`, `SpecBuilder<Redis>`, and `SpecBuilder<Minio>`.
///
/// # Example
///
/// ```ignore
/// use testdock::services::postgres::Postgres;
///
/// let fixture = Postgres::builder()
///     .name("orders-db")
///     .database("orders")
///     .host_port(None)
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct SpecBuilder<A: ServiceAdapter> {
    adapter: A,
    container: ContainerSpec,
    settings: A::Settings,
    env: Vec<String>,
}

impl<A: ServiceAdapter> SpecBuilder<A> {
    /// Start from the adapter's canonical defaults.
    #[must_use]
    pub fn new(adapter: A) -> Self {
        let ConnectionSpec { container, payload } = adapter.defaults();
        Self {
            adapter,
            container,
            settings: payload,
            env: Vec::new(),
        }
    }

    /// Set the container name.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.container = self.container.with_name(name);
        self
    }

    /// Set repository and tag from an image reference such as `redis:7`.
    #[must_use]
    pub fn image(mut self, image: &str) -> Self {
        self.container = self.container.with_image(image);
        self
    }

    /// Set the image repository.
    #[must_use]
    pub fn repository(mut self, repository: impl Into<String>) -> Self {
        self.container = self.container.with_repository(repository);
        self
    }

    /// Set the image tag.
    #[must_use]
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.container = self.container.with_tag(tag);
        self
    }

    /// Replace the caller-supplied environment entries (`KEY=value`).
    #[must_use]
    pub fn env(mut self, env: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.env = env.into_iter().map(Into::into).collect();
        self
    }

    /// Append one environment entry.
    #[must_use]
    pub fn push_env(mut self, key: &str, value: &str) -> Self {
        self.env.push(format!("{key}={value}"));
        self
    }

    /// Override the image command.
    #[must_use]
    pub fn cmd(mut self, cmd: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.container = self
            .container
            .with_cmd(cmd.into_iter().map(Into::into).collect());
        self
    }

    /// Override the image entrypoint.
    #[must_use]
    pub fn entrypoint(mut self, entrypoint: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.container = self
            .container
            .with_entrypoint(entrypoint.into_iter().map(Into::into).collect());
        self
    }

    /// Override the working directory.
    #[must_use]
    pub fn working_dir(mut self, working_dir: impl Into<String>) -> Self {
        self.container = self.container.with_working_dir(working_dir);
        self
    }

    /// Set whether the engine removes the container once it stops.
    #[must_use]
    pub fn auto_remove(mut self, auto_remove: bool) -> Self {
        self.container = self.container.with_auto_remove(auto_remove);
        self
    }

    /// Set the restart policy.
    #[must_use]
    pub fn restart_policy(mut self, policy: RestartPolicy) -> Self {
        self.container = self.container.with_restart_policy(policy);
        self
    }

    /// Set the expiry in seconds; `0` disables expiry.
    #[must_use]
    pub fn resource_expire(mut self, seconds: u64) -> Self {
        self.container = self.container.with_resource_expire_secs(seconds);
        self
    }

    /// Set the readiness polling budget.
    #[must_use]
    pub fn pool_max_wait(mut self, max_wait: Duration) -> Self {
        self.container = self.container.with_pool_max_wait(max_wait);
        self
    }

    /// Set the first sleep between readiness attempts.
    #[must_use]
    pub fn initial_backoff(mut self, backoff: Duration) -> Self {
        self.container = self.container.with_initial_backoff(backoff);
        self
    }

    /// Replace the primary port mapping.
    #[must_use]
    pub fn port(mut self, port: PortMapping) -> Self {
        self.container = self.container.with_port(Some(port));
        self
    }

    /// Change the host side of the primary port; `None` requests an
    /// ephemeral port.
    #[must_use]
    pub fn host_port(mut self, host_port: Option<u16>) -> Self {
        let port = self
            .container
            .port()
            .cloned()
            .map(|mapping| mapping.with_host_port(host_port));
        self.container = self.container.with_port(port);
        self
    }

    /// Add or replace an engine label.
    #[must_use]
    pub fn label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.container = self.container.with_label(key, value);
        self
    }

    /// Apply configured global defaults at this point in the chain.
    #[must_use]
    pub fn apply_defaults(mut self, defaults: &FixtureDefaults) -> Self {
        self.container = self
            .container
            .with_pool_max_wait(defaults.pool_max_wait())
            .with_initial_backoff(defaults.initial_backoff())
            .with_resource_expire_secs(defaults.resource_expire_secs)
            .with_auto_remove(defaults.auto_remove);
        self
    }

    /// Mutate the backend payload; used by backend-specific setters.
    #[must_use]
    pub(crate) fn map_settings(mut self, update: impl FnOnce(&mut A::Settings)) -> Self {
        update(&mut self.settings);
        self
    }

    /// Finish the spec and pair it with the adapter.
    ///
    /// Environment entries derived from the payload come first, followed by
    /// the caller's entries, so a caller entry for the same key wins.
    #[must_use]
    pub fn build(self) -> ServiceContainer<A> {
        let mut env = self.adapter.derived_env(&self.settings);
        env.extend(self.env);
        let container = self.container.with_env(env);
        ServiceContainer::new(self.adapter, ConnectionSpec::new(container, self.settings))
    }
}
