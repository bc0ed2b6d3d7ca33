//! `testdock` application entry point.
//!
//! Starts, removes, and reaps fixture containers from the shell, which is
//! handy for running a service next to a test suite under development. It
//! uses `eyre` for opaque error handling at the application boundary,
//! converting domain-specific errors into human-readable reports.
//!
//! Configuration is loaded with layered precedence via `OrthoConfig`:
//! 1. Application defaults
//! 2. Configuration file (`~/.config/testdock/config.toml` or path from `TESTDOCK_CONFIG_PATH`)
//! 3. Environment variables (`TESTDOCK_*`)
//! 4. Command-line arguments

use std::time::SystemTime;

use clap::Parser;
use eyre::{Report, Result as EyreResult};
use testdock::config::{AppConfig, Cli, Commands, FixtureDefaults, ServiceKind, UpArgs, load_config};
use testdock::engine::EngineConnector;
use testdock::error::{ContainerError, Result as TestdockResult, TestdockError};
use testdock::lifecycle::Lifecycle;
use testdock::services::ServiceAdapter;
use testdock::services::minio::Minio;
use testdock::services::postgres::Postgres;
use testdock::services::redis::Redis;
use testdock::spec::SpecBuilder;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

fn main() -> EyreResult<()> {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries connection URLs.
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = load_config(&cli).map_err(Report::from)?;

    run(&cli, &config).map_err(Report::from)
}

/// Execute the CLI command, returning domain-specific errors.
fn run(cli: &Cli, config: &AppConfig) -> TestdockResult<()> {
    let runtime = tokio::runtime::Runtime::new().map_err(|error| {
        TestdockError::from(ContainerError::RuntimeCreationFailed {
            message: error.to_string(),
        })
    })?;
    let handle = runtime.handle();
    let lifecycle = Lifecycle::connect(handle, config.engine_socket.as_deref())?;

    match &cli.command {
        Commands::Ping => ping(),
        Commands::Up(args) => match args.service {
            ServiceKind::Postgres => up(handle, &lifecycle, Postgres::builder(), args, &config.fixtures),
            ServiceKind::Redis => up(handle, &lifecycle, Redis::builder(), args, &config.fixtures),
            ServiceKind::Minio => up(handle, &lifecycle, Minio::builder(), args, &config.fixtures),
        },
        Commands::Down(args) => {
            EngineConnector::purge(handle, lifecycle.engine().as_ref(), &args.name)?;
            tracing::info!(container = %args.name, "container removed");
            Ok(())
        }
        Commands::Reap => reap(handle, &lifecycle),
    }
}

/// Report a reachable engine; connecting already ran the health check.
#[expect(clippy::print_stdout, reason = "CLI output is the intended behaviour")]
#[expect(
    clippy::unnecessary_wraps,
    reason = "keeps every subcommand handler on the same signature"
)]
fn ping() -> TestdockResult<()> {
    println!("container engine is reachable");
    Ok(())
}

/// Start one service and print its connection URL.
///
/// The container outlives the process; `down` or `reap` removes it.
#[expect(clippy::print_stdout, reason = "CLI output is the intended behaviour")]
fn up<A: ServiceAdapter>(
    runtime: &tokio::runtime::Handle,
    lifecycle: &Lifecycle,
    builder: SpecBuilder<A>,
    args: &UpArgs,
    defaults: &FixtureDefaults,
) -> TestdockResult<()> {
    let mut configured = builder.apply_defaults(defaults);
    if let Some(name) = &args.name {
        configured = configured.name(name.clone());
    }
    if let Some(port) = args.host_port {
        configured = configured.host_port((port != 0).then_some(port));
    }
    let fixture = configured.build();

    let resource = fixture.up(runtime, lifecycle);
    if let Some(error) = resource.error() {
        return Err(error.clone().into());
    }
    for warning in resource.warnings() {
        tracing::warn!(fixture = resource.name(), warning = %warning, "fixture started with a warning");
    }
    if let Some(endpoint) = resource.endpoint() {
        println!("{}", fixture.adapter().connection_url(fixture.spec(), endpoint));
    }
    Ok(())
}

/// Remove expired fixture containers and list what was removed.
#[expect(clippy::print_stdout, reason = "CLI output is the intended behaviour")]
fn reap(runtime: &tokio::runtime::Handle, lifecycle: &Lifecycle) -> TestdockResult<()> {
    let reaped =
        EngineConnector::reap_expired(runtime, lifecycle.engine().as_ref(), SystemTime::now())?;
    for container in &reaped {
        println!("{container}");
    }
    tracing::info!(count = reaped.len(), "reap finished");
    Ok(())
}
