//! Object-safe seam over the Bollard calls used by the fixture lifecycle.
//!
//! Every method returns a boxed future so the trait can be used as
//! `Arc<dyn ContainerEngine>` and mocked in unit tests without a daemon.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

use bollard::models::{ContainerCreateBody, ContainerInspectResponse, ContainerSummary};
use bollard::query_parameters::{
    CreateContainerOptions, InspectContainerOptions, ListContainersOptions,
    RemoveContainerOptionsBuilder, StartContainerOptions,
};
use bollard::{Docker, errors::Error as BollardError};

/// Boxed future type returned by [`ContainerEngine`] implementors.
pub type EngineFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, BollardError>> + Send + 'a>>;

/// Behaviour required to realize and tear down fixture containers.
pub trait ContainerEngine: Send + Sync {
    /// Check that the engine answers API requests.
    fn ping(&self) -> EngineFuture<'_, ()>;

    /// Inspect a container by name or ID.
    fn inspect_container(&self, container: &str) -> EngineFuture<'_, ContainerInspectResponse>;

    /// Create a container and return its ID.
    fn create_container(
        &self,
        options: Option<CreateContainerOptions>,
        config: ContainerCreateBody,
    ) -> EngineFuture<'_, String>;

    /// Start a created container.
    fn start_container(&self, container: &str) -> EngineFuture<'_, ()>;

    /// Force-remove a container together with its anonymous volumes.
    fn remove_container(&self, container: &str) -> EngineFuture<'_, ()>;

    /// List all containers, running or not, carrying `label`.
    fn list_containers(&self, label: &str) -> EngineFuture<'_, Vec<ContainerSummary>>;
}

impl ContainerEngine for Docker {
    fn ping(&self) -> EngineFuture<'_, ()> {
        Box::pin(async move { Self::ping(self).await.map(|_| ()) })
    }

    fn inspect_container(&self, container: &str) -> EngineFuture<'_, ContainerInspectResponse> {
        let container_owned = String::from(container);
        Box::pin(async move {
            Self::inspect_container(self, &container_owned, None::<InspectContainerOptions>).await
        })
    }

    fn create_container(
        &self,
        options: Option<CreateContainerOptions>,
        config: ContainerCreateBody,
    ) -> EngineFuture<'_, String> {
        Box::pin(async move {
            Self::create_container(self, options, config)
                .await
                .map(|response| response.id)
        })
    }

    fn start_container(&self, container: &str) -> EngineFuture<'_, ()> {
        let container_owned = String::from(container);
        Box::pin(async move {
            Self::start_container(self, &container_owned, None::<StartContainerOptions>).await
        })
    }

    fn remove_container(&self, container: &str) -> EngineFuture<'_, ()> {
        let container_owned = String::from(container);
        let options = RemoveContainerOptionsBuilder::new()
            .force(true)
            .v(true)
            .build();
        Box::pin(async move { Self::remove_container(self, &container_owned, Some(options)).await })
    }

    fn list_containers(&self, label: &str) -> EngineFuture<'_, Vec<ContainerSummary>> {
        let mut filters = HashMap::new();
        filters.insert(String::from("label"), vec![String::from(label)]);
        let options = ListContainersOptions {
            all: true,
            filters: Some(filters),
            ..ListContainersOptions::default()
        };
        Box::pin(async move { Self::list_containers(self, Some(options)).await })
    }
}
