//! PostgreSQL fixtures backed by a sqlx connection pool.
//!
//! The container is configured through the official image's `POSTGRES_*`
//! variables, readiness is a single-connection ping, and the optional
//! post-ready step applies the migrations found in a directory.

use std::time::Duration;

use camino::Utf8PathBuf;
use sqlx::postgres::{PgConnection, PgPool, PgPoolOptions};
use sqlx::{Connection, migrate::Migrator};

use super::{ServiceAdapter, ServiceClient, ServiceFuture};
use crate::engine::Endpoint;
use crate::error::ServiceFailure;
use crate::lifecycle::{ProbeFuture, ReadinessProbe};
use crate::spec::{ConnectionSpec, ContainerSpec, PortMapping, SpecBuilder};

const DEFAULT_REPOSITORY: &str = "postgres";
const DEFAULT_TAG: &str = "14.7-alpine3.17";
const DEFAULT_NAME: &str = "postgres";
const CONTAINER_PORT: u16 = 5432;
const DEFAULT_HOST_PORT: u16 = 5434;
const DEFAULT_MIGRATIONS_DIR: &str = "db/migrations/";
const POOL_MAX_CONNECTIONS: u32 = 5;
const POOL_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(10);

/// Credentials, database, and migration options of a PostgreSQL fixture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostgresSettings {
    /// Login role.
    pub user: String,
    /// Password of the login role.
    pub password: String,
    /// Database created at startup.
    pub database: String,
    /// Value of the `sslmode` DSN parameter.
    pub ssl_mode: String,
    /// Whether to apply migrations once the server answers.
    pub migrations: bool,
    /// Directory holding the migration files.
    pub migrations_dir: Utf8PathBuf,
}

impl Default for PostgresSettings {
    fn default() -> Self {
        Self {
            user: String::from("postgres_user"),
            password: String::from("postgres_pass"),
            database: String::from("postgres_dbname"),
            ssl_mode: String::from("disable"),
            migrations: false,
            migrations_dir: Utf8PathBuf::from(DEFAULT_MIGRATIONS_DIR),
        }
    }
}

/// Build the DSN for `settings` at `endpoint`.
///
/// User, password, and database name are percent-encoded, so values
/// containing `@`, `:`, or `/` survive.
///
/// ```
/// use testdock::engine::Endpoint;
/// use testdock::services::postgres::{PostgresSettings, dsn};
///
/// let settings = PostgresSettings {
///     user: "u".into(),
///     password: "p".into(),
///     database: "d".into(),
///     ..PostgresSettings::default()
/// };
/// assert_eq!(
///     dsn(&settings, &Endpoint::new("h", 1)),
///     "postgres://u:p@h:1/d?sslmode=disable"
/// );
/// ```
#[must_use]
pub fn dsn(settings: &PostgresSettings, endpoint: &Endpoint) -> String {
    format!(
        "postgres://{}:{}@{}/{}?sslmode={}",
        urlencoding::encode(&settings.user),
        urlencoding::encode(&settings.password),
        endpoint.authority(),
        urlencoding::encode(&settings.database),
        settings.ssl_mode,
    )
}

/// Adapter for the official `postgres` image.
#[derive(Debug, Clone, Copy, Default)]
pub struct Postgres;

impl Postgres {
    /// Start a builder from the PostgreSQL defaults.
    #[must_use]
    pub fn builder() -> SpecBuilder<Self> {
        SpecBuilder::new(Self)
    }
}

impl SpecBuilder<Postgres> {
    /// Set the login role.
    #[must_use]
    pub fn user(self, user: impl Into<String>) -> Self {
        self.map_settings(move |settings| settings.user = user.into())
    }

    /// Set the password of the login role.
    #[must_use]
    pub fn password(self, password: impl Into<String>) -> Self {
        self.map_settings(move |settings| settings.password = password.into())
    }

    /// Set the database created at startup.
    #[must_use]
    pub fn database(self, database: impl Into<String>) -> Self {
        self.map_settings(move |settings| settings.database = database.into())
    }

    /// Set the `sslmode` DSN parameter.
    #[must_use]
    pub fn ssl_mode(self, ssl_mode: impl Into<String>) -> Self {
        self.map_settings(move |settings| settings.ssl_mode = ssl_mode.into())
    }

    /// Apply the migrations in `dir` once the server answers.
    #[must_use]
    pub fn migrations(self, dir: impl Into<Utf8PathBuf>) -> Self {
        self.map_settings(move |settings| {
            settings.migrations = true;
            settings.migrations_dir = dir.into();
        })
    }
}

/// Readiness probe that opens one connection and pings the server.
#[derive(Debug, Clone)]
pub struct PostgresPingProbe {
    settings: PostgresSettings,
}

impl ReadinessProbe for PostgresPingProbe {
    fn check<'a>(&'a self, endpoint: &'a Endpoint) -> ProbeFuture<'a> {
        Box::pin(async move {
            let mut connection = PgConnection::connect(&dsn(&self.settings, endpoint))
                .await
                .map_err(|error| ServiceFailure::new(error.to_string()))?;
            let pinged = connection.ping().await;
            let closed = connection.close().await;
            pinged
                .and(closed)
                .map_err(|error| ServiceFailure::new(error.to_string()))
        })
    }
}

impl ServiceClient for PgPool {
    fn shutdown(self) -> ServiceFuture<'static, ()> {
        Box::pin(async move {
            self.close().await;
            Ok(())
        })
    }
}

impl ServiceAdapter for Postgres {
    type Settings = PostgresSettings;
    type Client = PgPool;
    type Probe = PostgresPingProbe;

    fn defaults(&self) -> ConnectionSpec<PostgresSettings> {
        let container = ContainerSpec::new(DEFAULT_NAME, DEFAULT_REPOSITORY, DEFAULT_TAG)
            .with_port(Some(PortMapping::tcp(CONTAINER_PORT, DEFAULT_HOST_PORT)));
        ConnectionSpec::new(container, PostgresSettings::default())
    }

    fn derived_env(&self, settings: &PostgresSettings) -> Vec<String> {
        vec![
            format!("POSTGRES_USER={}", settings.user),
            format!("POSTGRES_PASSWORD={}", settings.password),
            format!("POSTGRES_DB={}", settings.database),
        ]
    }

    fn readiness_probe(&self, spec: &ConnectionSpec<PostgresSettings>) -> PostgresPingProbe {
        PostgresPingProbe {
            settings: spec.payload().clone(),
        }
    }

    fn connect<'a>(
        &'a self,
        spec: &'a ConnectionSpec<PostgresSettings>,
        endpoint: &'a Endpoint,
    ) -> ServiceFuture<'a, PgPool> {
        Box::pin(async move {
            PgPoolOptions::new()
                .max_connections(POOL_MAX_CONNECTIONS)
                .acquire_timeout(POOL_ACQUIRE_TIMEOUT)
                .connect(&dsn(spec.payload(), endpoint))
                .await
                .map_err(|error| ServiceFailure::new(error.to_string()))
        })
    }

    fn after_ready<'a>(
        &'a self,
        client: &'a PgPool,
        spec: &'a ConnectionSpec<PostgresSettings>,
    ) -> ServiceFuture<'a, ()> {
        Box::pin(async move {
            let settings = spec.payload();
            if !settings.migrations {
                return Ok(());
            }
            let dir = settings.migrations_dir.as_std_path().to_path_buf();
            let migrator = Migrator::new(dir).await.map_err(|error| {
                ServiceFailure::new(format!(
                    "cannot read migrations from {}: {error}",
                    settings.migrations_dir
                ))
            })?;
            migrator
                .run(client)
                .await
                .map_err(|error| ServiceFailure::new(error.to_string()))?;
            tracing::info!(
                fixture = spec.name(),
                dir = %settings.migrations_dir,
                "migrations applied"
            );
            Ok(())
        })
    }

    fn connection_url(&self, spec: &ConnectionSpec<PostgresSettings>, endpoint: &Endpoint) -> String {
        dsn(spec.payload(), endpoint)
    }
}
