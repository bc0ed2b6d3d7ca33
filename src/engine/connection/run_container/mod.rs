//! Realizing a container spec on the engine.
//!
//! A container with the configured name that is already running is reused so
//! repeated `up` calls never start a duplicate. A stopped leftover is purged
//! and recreated. Otherwise the container is created and started; a container
//! that was created but failed to start is removed again on a best-effort
//! basis.

use std::collections::HashMap;

use bollard::models::{
    ContainerCreateBody, ContainerInspectResponse, HostConfig, PortBinding, PortMap,
    RestartPolicy as EngineRestartPolicy, RestartPolicyNameEnum,
};
use bollard::query_parameters::{CreateContainerOptions, CreateContainerOptionsBuilder};

use super::error_classification::is_not_found;
use super::purge::{EXPIRES_AT_LABEL, MANAGED_LABEL};
use super::{ContainerEngine, EngineConnector};
use crate::error::FixtureError;
use crate::spec::{ContainerSpec, PortMapping, RestartPolicy};

/// A container port published on the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedPort {
    container_port: String,
    host_ip: String,
    host_port: u16,
}

impl PublishedPort {
    /// Describe a published port.
    #[must_use]
    pub fn new(container_port: impl Into<String>, host_ip: impl Into<String>, host_port: u16) -> Self {
        Self {
            container_port: container_port.into(),
            host_ip: host_ip.into(),
            host_port,
        }
    }

    /// Return the container port in engine form, e.g. `5432/tcp`.
    #[must_use]
    pub fn container_port(&self) -> &str {
        &self.container_port
    }

    /// Return the host address the port is bound to; empty when unspecified.
    #[must_use]
    pub fn host_ip(&self) -> &str {
        &self.host_ip
    }

    /// Return the host port.
    #[must_use]
    pub const fn host_port(&self) -> u16 {
        self.host_port
    }
}

/// Handle to a started container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunningContainer {
    id: String,
    name: String,
    published: Vec<PublishedPort>,
    reused: bool,
}

impl RunningContainer {
    /// Return the engine-assigned container ID.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Return the configured container name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Return every published port binding.
    #[must_use]
    pub fn published(&self) -> &[PublishedPort] {
        &self.published
    }

    /// Whether an already-running container was adopted instead of started.
    #[must_use]
    pub const fn reused(&self) -> bool {
        self.reused
    }

    /// Return the first host port bound to `container_port`.
    #[must_use]
    pub fn host_port(&self, container_port: &str) -> Option<u16> {
        self.binding(container_port).map(PublishedPort::host_port)
    }

    /// Return the host address bound to `container_port`.
    #[must_use]
    pub fn bound_ip(&self, container_port: &str) -> Option<&str> {
        self.binding(container_port).map(PublishedPort::host_ip)
    }

    fn binding(&self, container_port: &str) -> Option<&PublishedPort> {
        self.published
            .iter()
            .find(|port| port.container_port == container_port)
    }
}

impl EngineConnector {
    /// Reuse, or create and start, the container described by `spec`.
    ///
    /// `expires_at` is the Unix time written to the expiry label; `None`
    /// leaves the label off.
    ///
    /// # Errors
    ///
    /// Returns `FixtureError::ContainerStartFailed` carrying the engine's
    /// message when inspecting, creating, or starting the container fails.
    pub async fn realize_async(
        engine: &dyn ContainerEngine,
        spec: &ContainerSpec,
        expires_at: Option<u64>,
    ) -> Result<RunningContainer, FixtureError> {
        if let Some(running) = reuse_or_clear(engine, spec.name()).await? {
            return Ok(running);
        }
        create_and_start(engine, spec, expires_at).await
    }
}

/// Return the running container named `name`, removing a stopped one.
async fn reuse_or_clear(
    engine: &dyn ContainerEngine,
    name: &str,
) -> Result<Option<RunningContainer>, FixtureError> {
    match engine.inspect_container(name).await {
        Ok(existing) if is_running(&existing) => {
            tracing::info!(container = name, "reusing running container");
            Ok(Some(running_container_from_inspect(existing, name, true)))
        }
        Ok(existing) => {
            let stale = existing.id.unwrap_or_else(|| String::from(name));
            tracing::info!(container = name, "removing stopped container before recreating it");
            EngineConnector::purge_async(engine, &stale)
                .await
                .map_err(|error| start_failed(name, error))?;
            Ok(None)
        }
        Err(error) if is_not_found(&error) => Ok(None),
        Err(error) => Err(start_failed(name, error)),
    }
}

/// Create and start a fresh container; a container that fails to start is
/// removed again.
async fn create_and_start(
    engine: &dyn ContainerEngine,
    spec: &ContainerSpec,
    expires_at: Option<u64>,
) -> Result<RunningContainer, FixtureError> {
    let name = spec.name();
    let id = engine
        .create_container(Some(build_create_options(name)), build_create_body(spec, expires_at))
        .await
        .map_err(|error| start_failed(name, error))?;

    let started = match engine.start_container(&id).await {
        Ok(()) => engine.inspect_container(&id).await,
        Err(error) => Err(error),
    };
    let inspected = match started {
        Ok(inspected) => inspected,
        Err(error) => {
            discard_best_effort(engine, &id).await;
            return Err(start_failed(name, error));
        }
    };

    tracing::info!(container = name, id = %id, image = %spec.image(), "container started");
    Ok(running_container_from_inspect(inspected, name, false))
}

async fn discard_best_effort(engine: &dyn ContainerEngine, id: &str) {
    if let Err(error) = EngineConnector::purge_async(engine, id).await {
        tracing::warn!(container = id, %error, "failed to remove container that did not start");
    }
}

fn start_failed(name: &str, error: impl std::fmt::Display) -> FixtureError {
    FixtureError::ContainerStartFailed {
        name: String::from(name),
        message: error.to_string(),
    }
}

fn is_running(inspected: &ContainerInspectResponse) -> bool {
    inspected
        .state
        .as_ref()
        .and_then(|state| state.running)
        .unwrap_or(false)
}

fn running_container_from_inspect(
    inspected: ContainerInspectResponse,
    name: &str,
    reused: bool,
) -> RunningContainer {
    let mut published: Vec<PublishedPort> = inspected
        .network_settings
        .and_then(|settings| settings.ports)
        .unwrap_or_default()
        .into_iter()
        .flat_map(|(container_port, bindings)| {
            bindings
                .unwrap_or_default()
                .into_iter()
                .filter_map(move |binding| published_port(&container_port, binding))
        })
        .collect();
    published.sort_by(|a, b| a.container_port.cmp(&b.container_port));

    RunningContainer {
        id: inspected.id.unwrap_or_else(|| String::from(name)),
        name: String::from(name),
        published,
        reused,
    }
}

fn published_port(container_port: &str, binding: PortBinding) -> Option<PublishedPort> {
    let host_port = binding.host_port?.parse().ok()?;
    Some(PublishedPort::new(
        container_port,
        binding.host_ip.unwrap_or_default(),
        host_port,
    ))
}

fn build_create_options(name: &str) -> CreateContainerOptions {
    CreateContainerOptionsBuilder::new().name(name).build()
}

fn build_create_body(spec: &ContainerSpec, expires_at: Option<u64>) -> ContainerCreateBody {
    ContainerCreateBody {
        image: Some(spec.image()),
        env: (!spec.env().is_empty()).then(|| spec.env().to_vec()),
        cmd: spec.cmd().map(<[String]>::to_vec),
        entrypoint: spec.entrypoint().map(<[String]>::to_vec),
        working_dir: spec.working_dir().map(String::from),
        labels: Some(build_labels(spec, expires_at)),
        host_config: Some(build_host_config(spec)),
        ..ContainerCreateBody::default()
    }
}

fn build_labels(spec: &ContainerSpec, expires_at: Option<u64>) -> HashMap<String, String> {
    let mut labels: HashMap<String, String> = spec
        .labels()
        .iter()
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();
    labels.insert(String::from(MANAGED_LABEL), String::from("true"));
    if let Some(deadline) = expires_at {
        labels.insert(String::from(EXPIRES_AT_LABEL), deadline.to_string());
    }
    labels
}

fn build_host_config(spec: &ContainerSpec) -> HostConfig {
    HostConfig {
        auto_remove: Some(spec.auto_remove()),
        restart_policy: Some(EngineRestartPolicy {
            name: Some(restart_policy_name(spec.restart_policy())),
            maximum_retry_count: None,
        }),
        port_bindings: spec.port().map(build_port_bindings),
        ..HostConfig::default()
    }
}

fn build_port_bindings(port: &PortMapping) -> PortMap {
    // An absent host port asks the engine for an ephemeral one.
    let binding = PortBinding {
        host_ip: None,
        host_port: port.host_port().map(|host_port| host_port.to_string()),
    };
    HashMap::from([(String::from(port.container_port()), Some(vec![binding]))])
}

const fn restart_policy_name(policy: RestartPolicy) -> RestartPolicyNameEnum {
    match policy {
        RestartPolicy::No => RestartPolicyNameEnum::NO,
        RestartPolicy::Always => RestartPolicyNameEnum::ALWAYS,
        RestartPolicy::UnlessStopped => RestartPolicyNameEnum::UNLESS_STOPPED,
        RestartPolicy::OnFailure => RestartPolicyNameEnum::ON_FAILURE,
    }
}
