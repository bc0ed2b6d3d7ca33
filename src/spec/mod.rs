//! Declarative description of a service container.
//!
//! A [`ConnectionSpec`] pairs the engine-level [`ContainerSpec`] with a
//! backend payload `P` (credentials, database name, migration settings).
//! Keeping the payload as a type parameter means adapters read their own
//! settings directly; nothing is recovered by downcasting.
//!
//! Specs are produced by [`SpecBuilder`], which starts from one canonical
//! default set per backend and applies the caller's setters in call order.

mod builder;
mod port;

use std::collections::BTreeMap;
use std::time::Duration;

pub use builder::SpecBuilder;
pub use port::{PortMapping, RestartPolicy};

use crate::error::FixtureError;

/// Seconds after which a fixture container is force-removed by default.
pub const DEFAULT_RESOURCE_EXPIRE_SECS: u64 = 60;

/// Default upper bound on readiness polling.
pub const DEFAULT_POOL_MAX_WAIT: Duration = Duration::from_secs(50);

/// Default first sleep between readiness attempts.
pub const DEFAULT_INITIAL_BACKOFF: Duration = Duration::from_millis(50);

const DEFAULT_TAG: &str = "latest";

/// Engine-level settings for one container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerSpec {
    name: String,
    repository: String,
    tag: String,
    env: Vec<String>,
    cmd: Option<Vec<String>>,
    entrypoint: Option<Vec<String>>,
    working_dir: Option<String>,
    auto_remove: bool,
    restart_policy: RestartPolicy,
    resource_expire_secs: u64,
    pool_max_wait: Duration,
    initial_backoff: Duration,
    port: Option<PortMapping>,
    labels: BTreeMap<String, String>,
}

impl ContainerSpec {
    /// Create a spec for `repository:tag` named `name` with shared defaults.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        repository: impl Into<String>,
        tag: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            repository: repository.into(),
            tag: tag.into(),
            env: Vec::new(),
            cmd: None,
            entrypoint: None,
            working_dir: None,
            auto_remove: true,
            restart_policy: RestartPolicy::No,
            resource_expire_secs: DEFAULT_RESOURCE_EXPIRE_SECS,
            pool_max_wait: DEFAULT_POOL_MAX_WAIT,
            initial_backoff: DEFAULT_INITIAL_BACKOFF,
            port: None,
            labels: BTreeMap::new(),
        }
    }

    /// Replace the container name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Replace repository and tag from an image reference.
    ///
    /// A reference without a tag, such as `redis` or
    /// `registry.local:5000/redis`, selects the `latest` tag.
    #[must_use]
    pub fn with_image(mut self, image: &str) -> Self {
        let (repository, tag) = split_image(image);
        self.repository = repository;
        self.tag = tag;
        self
    }

    /// Replace the image repository.
    #[must_use]
    pub fn with_repository(mut self, repository: impl Into<String>) -> Self {
        self.repository = repository.into();
        self
    }

    /// Replace the image tag.
    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = tag.into();
        self
    }

    /// Replace the environment entries (`KEY=value`).
    #[must_use]
    pub fn with_env(mut self, env: Vec<String>) -> Self {
        self.env = env;
        self
    }

    /// Override the image command.
    #[must_use]
    pub fn with_cmd(mut self, cmd: Vec<String>) -> Self {
        self.cmd = Some(cmd);
        self
    }

    /// Override the image entrypoint.
    #[must_use]
    pub fn with_entrypoint(mut self, entrypoint: Vec<String>) -> Self {
        self.entrypoint = Some(entrypoint);
        self
    }

    /// Override the working directory.
    #[must_use]
    pub fn with_working_dir(mut self, working_dir: impl Into<String>) -> Self {
        self.working_dir = Some(working_dir.into());
        self
    }

    /// Set whether the engine removes the container once it stops.
    #[must_use]
    pub const fn with_auto_remove(mut self, auto_remove: bool) -> Self {
        self.auto_remove = auto_remove;
        self
    }

    /// Set the restart policy.
    #[must_use]
    pub const fn with_restart_policy(mut self, policy: RestartPolicy) -> Self {
        self.restart_policy = policy;
        self
    }

    /// Set the expiry in seconds; `0` disables expiry.
    #[must_use]
    pub const fn with_resource_expire_secs(mut self, seconds: u64) -> Self {
        self.resource_expire_secs = seconds;
        self
    }

    /// Set the readiness polling budget.
    #[must_use]
    pub const fn with_pool_max_wait(mut self, max_wait: Duration) -> Self {
        self.pool_max_wait = max_wait;
        self
    }

    /// Set the first sleep between readiness attempts.
    #[must_use]
    pub const fn with_initial_backoff(mut self, backoff: Duration) -> Self {
        self.initial_backoff = backoff;
        self
    }

    /// Set or clear the primary published port.
    #[must_use]
    pub fn with_port(mut self, port: Option<PortMapping>) -> Self {
        self.port = port;
        self
    }

    /// Add or replace an engine label.
    #[must_use]
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    /// Return the container name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Return the image repository.
    #[must_use]
    pub fn repository(&self) -> &str {
        &self.repository
    }

    /// Return the image tag.
    #[must_use]
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Return the full image reference, `repository:tag`.
    #[must_use]
    pub fn image(&self) -> String {
        format!("{}:{}", self.repository, self.tag)
    }

    /// Return environment entries in `KEY=value` form, in engine order.
    #[must_use]
    pub fn env(&self) -> &[String] {
        &self.env
    }

    /// Return the command override.
    #[must_use]
    pub fn cmd(&self) -> Option<&[String]> {
        self.cmd.as_deref()
    }

    /// Return the entrypoint override.
    #[must_use]
    pub fn entrypoint(&self) -> Option<&[String]> {
        self.entrypoint.as_deref()
    }

    /// Return the working-directory override.
    #[must_use]
    pub fn working_dir(&self) -> Option<&str> {
        self.working_dir.as_deref()
    }

    /// Whether the engine removes the container once it stops.
    #[must_use]
    pub const fn auto_remove(&self) -> bool {
        self.auto_remove
    }

    /// Return the restart policy.
    #[must_use]
    pub const fn restart_policy(&self) -> RestartPolicy {
        self.restart_policy
    }

    /// Seconds until the container is force-removed; `0` disables expiry.
    #[must_use]
    pub const fn resource_expire_secs(&self) -> u64 {
        self.resource_expire_secs
    }

    /// Return the readiness polling budget.
    #[must_use]
    pub const fn pool_max_wait(&self) -> Duration {
        self.pool_max_wait
    }

    /// Return the first sleep between readiness attempts.
    #[must_use]
    pub const fn initial_backoff(&self) -> Duration {
        self.initial_backoff
    }

    /// Return the primary published port.
    #[must_use]
    pub const fn port(&self) -> Option<&PortMapping> {
        self.port.as_ref()
    }

    /// Return extra engine labels.
    #[must_use]
    pub const fn labels(&self) -> &BTreeMap<String, String> {
        &self.labels
    }

    /// Check the fields the engine cannot do without.
    ///
    /// # Errors
    ///
    /// Returns `FixtureError::InvalidSpec` when the name, repository, or tag
    /// is empty or whitespace-only.
    pub fn validate(&self) -> Result<(), FixtureError> {
        for (field, value) in [
            ("name", &self.name),
            ("repository", &self.repository),
            ("tag", &self.tag),
        ] {
            if value.trim().is_empty() {
                return Err(FixtureError::InvalidSpec {
                    field: String::from(field),
                    reason: String::from("cannot be empty"),
                });
            }
        }
        Ok(())
    }
}

fn split_image(image: &str) -> (String, String) {
    let trimmed = image.trim();
    match trimmed.rsplit_once(':') {
        Some((repository, tag)) if !tag.contains('/') => (String::from(repository), String::from(tag)),
        _ => (String::from(trimmed), String::from(DEFAULT_TAG)),
    }
}

/// A container spec plus the backend payload its adapter needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionSpec<P> {
    container: ContainerSpec,
    payload: P,
}

impl<P> ConnectionSpec<P> {
    /// Pair a container spec with a backend payload.
    #[must_use]
    pub const fn new(container: ContainerSpec, payload: P) -> Self {
        Self { container, payload }
    }

    /// Return the container name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.container.name()
    }

    /// Return the engine-level settings.
    #[must_use]
    pub const fn container(&self) -> &ContainerSpec {
        &self.container
    }

    /// Return the backend payload.
    #[must_use]
    pub const fn payload(&self) -> &P {
        &self.payload
    }
}
