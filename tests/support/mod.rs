//! Engine double and HTTP health stub shared by behavioural tests.
//!
//! Fixtures are started against a `mockall` engine that reports their
//! containers as running, with the service port bound to a local stub that
//! plays MinIO's liveness endpoint.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use bollard::errors::Error as BollardError;
use bollard::models::{
    ContainerCreateBody, ContainerInspectResponse, ContainerState, ContainerSummary,
    NetworkSettings, PortBinding, PortMap,
};
use bollard::query_parameters::CreateContainerOptions;
use mockall::mock;
use testdock::engine::{ContainerEngine, EngineFuture};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

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

/// Container name whose image the engine refuses to create.
pub const MISSING_IMAGE_CONTAINER: &str = "broken";

/// Engine answer with the given HTTP status.
pub fn server_error(status_code: u16, message: &str) -> BollardError {
    BollardError::DockerResponseServerError {
        status_code,
        message: String::from(message),
    }
}

/// Inspect answer for a running container publishing MinIO's port on
/// `127.0.0.1:host_port`.
pub fn running_minio(id: &str, host_port: u16) -> ContainerInspectResponse {
    let mut ports: PortMap = HashMap::new();
    ports.insert(
        String::from("9000/tcp"),
        Some(vec![PortBinding {
            host_ip: Some(String::from("127.0.0.1")),
            host_port: Some(host_port.to_string()),
        }]),
    );
    ContainerInspectResponse {
        id: Some(String::from(id)),
        state: Some(ContainerState {
            running: Some(true),
            ..ContainerState::default()
        }),
        network_settings: Some(NetworkSettings {
            ports: Some(ports),
            ..NetworkSettings::default()
        }),
        ..ContainerInspectResponse::default()
    }
}

/// Engine on which every container is already running on `host_port`,
/// except [`MISSING_IMAGE_CONTAINER`], which cannot be created.
///
/// The returned counter records container removals.
pub fn running_engine(host_port: u16) -> (MockEngine, Arc<AtomicU32>) {
    let removals = Arc::new(AtomicU32::new(0));
    let mut engine = MockEngine::new();
    engine
        .expect_ping()
        .returning(|| Box::pin(async { Ok(()) }));
    engine.expect_inspect_container().returning(move |name| {
        let answer = if name == MISSING_IMAGE_CONTAINER {
            Err(server_error(404, "No such container"))
        } else {
            Ok(running_minio(&format!("{name}-id"), host_port))
        };
        Box::pin(async move { answer })
    });
    engine.expect_create_container().returning(|_, _| {
        Box::pin(async { Err(server_error(404, "No such image: minio/minio:nope")) })
    });
    let counter = Arc::clone(&removals);
    engine.expect_remove_container().returning(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        Box::pin(async { Ok(()) })
    });
    (engine, removals)
}

/// Engine whose ping is refused.
pub fn unreachable_engine() -> MockEngine {
    let mut engine = MockEngine::new();
    engine
        .expect_ping()
        .returning(|| Box::pin(async { Err(server_error(503, "engine is shutting down")) }));
    engine
}

/// Local HTTP server answering `503` a set number of times, then `200`.
pub struct HealthStub {
    port: u16,
    requests: Arc<AtomicU32>,
}

impl HealthStub {
    /// Bind to an ephemeral port and serve on `runtime`.
    ///
    /// `failures` of `u32::MAX` never answers `200`.
    pub fn start(runtime: &tokio::runtime::Runtime, failures: u32) -> std::io::Result<Self> {
        let listener = runtime.block_on(TcpListener::bind("127.0.0.1:0"))?;
        let port = listener.local_addr()?.port();
        let requests = Arc::new(AtomicU32::new(0));
        let served = Arc::clone(&requests);

        runtime.spawn(async move {
            while let Ok((mut stream, _)) = listener.accept().await {
                let mut request = [0_u8; 1024];
                if stream.read(&mut request).await.is_err() {
                    continue;
                }
                let seen = served.fetch_add(1, Ordering::SeqCst);
                let status = if seen < failures {
                    "503 Service Unavailable"
                } else {
                    "200 OK"
                };
                let response = format!(
                    "HTTP/1.1 {status}\r\ncontent-length: 0\r\nconnection: close\r\n\r\n"
                );
                if stream.write_all(response.as_bytes()).await.is_err() {
                    continue;
                }
            }
        });

        Ok(Self { port, requests })
    }

    /// Return the bound port.
    pub const fn port(&self) -> u16 {
        self.port
    }

    /// Return the number of requests served so far.
    pub fn requests(&self) -> u32 {
        self.requests.load(Ordering::SeqCst)
    }
}
