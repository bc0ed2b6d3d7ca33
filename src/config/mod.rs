//! Configuration system for testdock.
//!
//! Holds the configuration structures, the CLI definitions, and the layered
//! loader. Precedence: CLI flags override environment variables, which
//! override configuration files, which override defaults.
//!
//! The configuration file is expected at `~/.config/testdock/config.toml` by
//! default.
//!
//! # Example Configuration
//!
//! ```toml
//! engine_socket = "unix:///run/user/1000/podman/podman.sock"
//!
//! [fixtures]
//! pool_max_wait_secs = 120
//! initial_backoff_ms = 100
//! resource_expire_secs = 600
//! auto_remove = false
//! ```

mod cli;
mod loader;
mod types;

#[cfg(test)]
mod tests;

pub use cli::{Cli, Commands, DownArgs, ServiceKind, UpArgs};
pub use loader::{env_var_names, load_config};
pub use types::{AppConfig, FixtureDefaults};
