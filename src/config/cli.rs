//! Command-line argument definitions for testdock.

use camino::Utf8PathBuf;
use clap::{Parser, Subcommand, ValueEnum};

/// Command-line interface for testdock.
#[derive(Debug, Parser)]
#[command(name = "testdock")]
#[command(
    author,
    version,
    about = "Ephemeral service containers for integration tests"
)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file.
    #[arg(long, global = true)]
    pub config: Option<Utf8PathBuf>,

    /// Container engine socket path or URL.
    #[arg(long, global = true)]
    pub engine_socket: Option<String>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Check that the container engine answers.
    Ping,

    /// Start a service container and print its connection URL.
    Up(UpArgs),

    /// Remove a fixture container.
    Down(DownArgs),

    /// Remove fixture containers whose expiry has passed.
    Reap,
}

/// Services the `up` subcommand can start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ServiceKind {
    /// PostgreSQL.
    Postgres,
    /// Redis.
    Redis,
    /// MinIO object store.
    Minio,
}

/// Arguments for the `up` subcommand.
#[derive(Debug, Parser)]
pub struct UpArgs {
    /// Service to start.
    #[arg(value_enum)]
    pub service: ServiceKind,

    /// Container name; defaults to the service's own.
    #[arg(long)]
    pub name: Option<String>,

    /// Host port to publish; `0` lets the engine pick one.
    #[arg(long)]
    pub host_port: Option<u16>,
}

/// Arguments for the `down` subcommand.
#[derive(Debug, Parser)]
pub struct DownArgs {
    /// Container name or ID.
    #[arg(required = true)]
    pub name: String,
}
