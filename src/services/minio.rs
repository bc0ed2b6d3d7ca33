//! MinIO object store fixtures.
//!
//! Readiness is MinIO's unauthenticated liveness endpoint. The client is a
//! thin handle holding the endpoint URL, the credentials, and an HTTP client;
//! tests hand those to whichever S3 SDK they use.

use std::time::Duration;

use super::{ServiceAdapter, ServiceClient, ServiceFuture};
use crate::engine::Endpoint;
use crate::error::ServiceFailure;
use crate::lifecycle::{ProbeFuture, ReadinessProbe};
use crate::spec::{ConnectionSpec, ContainerSpec, PortMapping, SpecBuilder};

const DEFAULT_NAME: &str = "minio";
const DEFAULT_REPOSITORY: &str = "minio/minio";
const DEFAULT_TAG: &str = "latest";
const CONTAINER_PORT: u16 = 9000;
const DEFAULT_HOST_PORT: u16 = 9000;
const LIVENESS_PATH: &str = "/minio/health/live";
const HTTP_TIMEOUT: Duration = Duration::from_secs(5);

/// Credentials of a MinIO fixture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MinioSettings {
    /// Access key (root user).
    pub access_key: String,
    /// Secret key (root password).
    pub secret_key: String,
}

impl Default for MinioSettings {
    fn default() -> Self {
        Self {
            access_key: String::from("MYACCESSKEY"),
            secret_key: String::from("MYSECRETKEY"),
        }
    }
}

/// Adapter for the `minio/minio` image.
#[derive(Debug, Clone, Copy, Default)]
pub struct Minio;

impl Minio {
    /// Start a builder from the MinIO defaults.
    #[must_use]
    pub fn builder() -> SpecBuilder<Self> {
        SpecBuilder::new(Self)
    }
}

impl SpecBuilder<Minio> {
    /// Set the access key.
    #[must_use]
    pub fn access_key(self, access_key: impl Into<String>) -> Self {
        self.map_settings(move |settings| settings.access_key = access_key.into())
    }

    /// Set the secret key.
    #[must_use]
    pub fn secret_key(self, secret_key: impl Into<String>) -> Self {
        self.map_settings(move |settings| settings.secret_key = secret_key.into())
    }
}

/// Readiness probe issuing `GET` on a path; only `200 OK` counts as ready.
#[derive(Debug, Clone)]
pub struct HttpHealthProbe {
    path: String,
}

impl HttpHealthProbe {
    /// Probe `path` (starting with `/`) on the fixture endpoint.
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

impl ReadinessProbe for HttpHealthProbe {
    fn check<'a>(&'a self, endpoint: &'a Endpoint) -> ProbeFuture<'a> {
        Box::pin(async move {
            let url = format!("http://{}{}", endpoint.authority(), self.path);
            let status = http_client()?
                .get(&url)
                .send()
                .await
                .map_err(|error| ServiceFailure::new(error.to_string()))?
                .status();
            if status == reqwest::StatusCode::OK {
                Ok(())
            } else {
                Err(ServiceFailure::new(format!("GET {url} answered {status}")))
            }
        })
    }
}

fn http_client() -> Result<reqwest::Client, ServiceFailure> {
    reqwest::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .build()
        .map_err(|error| ServiceFailure::new(error.to_string()))
}

/// Connection details of a ready MinIO server.
#[derive(Debug, Clone)]
pub struct ObjectStoreClient {
    endpoint_url: String,
    access_key: String,
    secret_key: String,
    http: reqwest::Client,
}

impl ObjectStoreClient {
    /// Return the S3 endpoint URL, e.g. `http://localhost:9000`.
    #[must_use]
    pub fn endpoint_url(&self) -> &str {
        &self.endpoint_url
    }

    /// Return the access key.
    #[must_use]
    pub fn access_key(&self) -> &str {
        &self.access_key
    }

    /// Return the secret key.
    #[must_use]
    pub fn secret_key(&self) -> &str {
        &self.secret_key
    }

    /// Return the HTTP client bound to this server.
    #[must_use]
    pub const fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// Ask the liveness endpoint whether the server is up.
    ///
    /// # Errors
    ///
    /// Returns a [`ServiceFailure`] when the request cannot be sent.
    pub async fn is_live(&self) -> Result<bool, ServiceFailure> {
        let response = self
            .http
            .get(format!("{}{LIVENESS_PATH}", self.endpoint_url))
            .send()
            .await
            .map_err(|error| ServiceFailure::new(error.to_string()))?;
        Ok(response.status() == reqwest::StatusCode::OK)
    }
}

impl ServiceClient for ObjectStoreClient {
    fn shutdown(self) -> ServiceFuture<'static, ()> {
        drop(self);
        Box::pin(async { Ok(()) })
    }
}

impl ServiceAdapter for Minio {
    type Settings = MinioSettings;
    type Client = ObjectStoreClient;
    type Probe = HttpHealthProbe;

    fn defaults(&self) -> ConnectionSpec<MinioSettings> {
        let container = ContainerSpec::new(DEFAULT_NAME, DEFAULT_REPOSITORY, DEFAULT_TAG)
            .with_cmd(vec![String::from("server"), String::from("/data")])
            .with_port(Some(PortMapping::tcp(CONTAINER_PORT, DEFAULT_HOST_PORT)));
        ConnectionSpec::new(container, MinioSettings::default())
    }

    /// Older images read `MINIO_ACCESS_KEY`; current ones `MINIO_ROOT_USER`.
    fn derived_env(&self, settings: &MinioSettings) -> Vec<String> {
        vec![
            format!("MINIO_ACCESS_KEY={}", settings.access_key),
            format!("MINIO_SECRET_KEY={}", settings.secret_key),
            format!("MINIO_ROOT_USER={}", settings.access_key),
            format!("MINIO_ROOT_PASSWORD={}", settings.secret_key),
        ]
    }

    fn readiness_probe(&self, _spec: &ConnectionSpec<MinioSettings>) -> HttpHealthProbe {
        HttpHealthProbe::new(LIVENESS_PATH)
    }

    fn connect<'a>(
        &'a self,
        spec: &'a ConnectionSpec<MinioSettings>,
        endpoint: &'a Endpoint,
    ) -> ServiceFuture<'a, ObjectStoreClient> {
        Box::pin(async move {
            let settings = spec.payload();
            Ok(ObjectStoreClient {
                endpoint_url: self.connection_url(spec, endpoint),
                access_key: settings.access_key.clone(),
                secret_key: settings.secret_key.clone(),
                http: http_client()?,
            })
        })
    }

    fn connection_url(&self, _spec: &ConnectionSpec<MinioSettings>, endpoint: &Endpoint) -> String {
        format!("http://{}", endpoint.authority())
    }
}
