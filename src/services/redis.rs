//! Redis fixtures backed by a reconnecting connection manager.

use redis::aio::ConnectionManager;

use super::{ServiceAdapter, ServiceClient, ServiceFuture};
use crate::engine::Endpoint;
use crate::error::ServiceFailure;
use crate::lifecycle::{ProbeFuture, ReadinessProbe};
use crate::spec::{ConnectionSpec, ContainerSpec, PortMapping, SpecBuilder};

const DEFAULT_NAME: &str = "redis";
const DEFAULT_REPOSITORY: &str = "redis";
const DEFAULT_TAG: &str = "3.2";
const CONTAINER_PORT: u16 = 6379;
const DEFAULT_HOST_PORT: u16 = 6380;

/// Password and logical database of a Redis fixture.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RedisSettings {
    /// `AUTH` password; empty means no authentication.
    pub password: String,
    /// Logical database index.
    pub database: u32,
}

/// Build the `redis://` URL for `settings` at `endpoint`.
#[must_use]
pub fn redis_url(settings: &RedisSettings, endpoint: &Endpoint) -> String {
    if settings.password.is_empty() {
        format!("redis://{}/{}", endpoint.authority(), settings.database)
    } else {
        format!(
            "redis://:{}@{}/{}",
            urlencoding::encode(&settings.password),
            endpoint.authority(),
            settings.database
        )
    }
}

/// Adapter for the official `redis` image.
#[derive(Debug, Clone, Copy, Default)]
pub struct Redis;

impl Redis {
    /// Start a builder from the Redis defaults.
    #[must_use]
    pub fn builder() -> SpecBuilder<Self> {
        SpecBuilder::new(Self)
    }
}

impl SpecBuilder<Redis> {
    /// Set the `AUTH` password the client sends.
    #[must_use]
    pub fn password(self, password: impl Into<String>) -> Self {
        self.map_settings(move |settings| settings.password = password.into())
    }

    /// Select the logical database.
    #[must_use]
    pub fn database(self, database: u32) -> Self {
        self.map_settings(|settings| settings.database = database)
    }
}

/// Readiness probe that sends `PING` and expects `PONG`.
#[derive(Debug, Clone)]
pub struct RedisPingProbe {
    settings: RedisSettings,
}

impl ReadinessProbe for RedisPingProbe {
    fn check<'a>(&'a self, endpoint: &'a Endpoint) -> ProbeFuture<'a> {
        Box::pin(async move {
            let client = redis::Client::open(redis_url(&self.settings, endpoint))
                .map_err(|error| ServiceFailure::new(error.to_string()))?;
            let mut connection = client
                .get_multiplexed_async_connection()
                .await
                .map_err(|error| ServiceFailure::new(error.to_string()))?;
            let reply: String = redis::cmd("PING")
                .query_async(&mut connection)
                .await
                .map_err(|error| ServiceFailure::new(error.to_string()))?;
            if reply == "PONG" {
                Ok(())
            } else {
                Err(ServiceFailure::new(format!("unexpected PING reply: {reply}")))
            }
        })
    }
}

impl ServiceClient for ConnectionManager {
    fn shutdown(self) -> ServiceFuture<'static, ()> {
        // The manager closes its connection when the last clone is dropped.
        drop(self);
        Box::pin(async { Ok(()) })
    }
}

impl ServiceAdapter for Redis {
    type Settings = RedisSettings;
    type Client = ConnectionManager;
    type Probe = RedisPingProbe;

    fn defaults(&self) -> ConnectionSpec<RedisSettings> {
        let container = ContainerSpec::new(DEFAULT_NAME, DEFAULT_REPOSITORY, DEFAULT_TAG)
            .with_port(Some(PortMapping::tcp(CONTAINER_PORT, DEFAULT_HOST_PORT)));
        ConnectionSpec::new(container, RedisSettings::default())
    }

    fn derived_env(&self, _settings: &RedisSettings) -> Vec<String> {
        Vec::new()
    }

    fn readiness_probe(&self, spec: &ConnectionSpec<RedisSettings>) -> RedisPingProbe {
        RedisPingProbe {
            settings: spec.payload().clone(),
        }
    }

    fn connect<'a>(
        &'a self,
        spec: &'a ConnectionSpec<RedisSettings>,
        endpoint: &'a Endpoint,
    ) -> ServiceFuture<'a, ConnectionManager> {
        Box::pin(async move {
            let client = redis::Client::open(redis_url(spec.payload(), endpoint))
                .map_err(|error| ServiceFailure::new(error.to_string()))?;
            ConnectionManager::new(client)
                .await
                .map_err(|error| ServiceFailure::new(error.to_string()))
        })
    }

    fn connection_url(&self, spec: &ConnectionSpec<RedisSettings>, endpoint: &Endpoint) -> String {
        redis_url(spec.payload(), endpoint)
    }
}
