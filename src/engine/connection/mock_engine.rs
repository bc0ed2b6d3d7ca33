//! `mockall` double of [`ContainerEngine`] and canned engine answers shared
//! by unit tests.

use std::collections::HashMap;

use bollard::errors::Error as BollardError;
use bollard::models::{
    ContainerCreateBody, ContainerInspectResponse, ContainerState, ContainerSummary,
    NetworkSettings, PortBinding, PortMap,
};
use bollard::query_parameters::CreateContainerOptions;
use mockall::mock;

use super::{ContainerEngine, EngineFuture};

mock! {
    pub Engine {}

    impl ContainerEngine for Engine {
        fn ping<'a>(&'a self) -> EngineFuture<'a, ()>;
        fn inspect_container<'a>(&'a self, container: &str) -> EngineFuture<'a, ContainerInspectResponse>;
        fn create_container<'a>(
            &'a self,
            options: Option<CreateContainerOptions>,
            config: ContainerCreateBody,
        ) -> EngineFuture<'a, String>;
        fn start_container<'a>(&'a self, container: &str) -> EngineFuture<'a, ()>;
        fn remove_container<'a>(&'a self, container: &str) -> EngineFuture<'a, ()>;
        fn list_containers<'a>(&'a self, label: &str) -> EngineFuture<'a, Vec<ContainerSummary>>;
    }
}

/// Engine error answer with the given HTTP status.
pub(crate) fn server_error(status_code: u16, message: &str) -> BollardError {
    BollardError::DockerResponseServerError {
        status_code,
        message: String::from(message),
    }
}

/// Inspect answer for a container with the given state and port bindings.
///
/// Each binding is `(container port, host ip, host port)`.
pub(crate) fn inspect_response(
    id: &str,
    running: bool,
    ports: &[(&str, &str, &str)],
) -> ContainerInspectResponse {
    let mut port_map: PortMap = HashMap::new();
    for (container_port, host_ip, host_port) in ports {
        port_map
            .entry(String::from(*container_port))
            .or_insert_with(|| Some(Vec::new()))
            .get_or_insert_with(Vec::new)
            .push(PortBinding {
                host_ip: Some(String::from(*host_ip)),
                host_port: Some(String::from(*host_port)),
            });
    }

    ContainerInspectResponse {
        id: Some(String::from(id)),
        state: Some(ContainerState {
            running: Some(running),
            ..ContainerState::default()
        }),
        network_settings: Some(NetworkSettings {
            ports: Some(port_map),
            ..NetworkSettings::default()
        }),
        ..ContainerInspectResponse::default()
    }
}
