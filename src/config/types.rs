//! Configuration data types for testdock.

use std::time::Duration;

use ortho_config::{OrthoConfig, OrthoResult, PostMergeContext, PostMergeHook};
use serde::{Deserialize, Serialize};

/// Lifecycle defaults applied to fixtures started from the CLI or through
/// [`SpecBuilder::apply_defaults`](crate::spec::SpecBuilder::apply_defaults).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct FixtureDefaults {
    /// Upper bound on the readiness wait, in seconds.
    pub pool_max_wait_secs: u64,

    /// First backoff between readiness probes, in milliseconds.
    pub initial_backoff_ms: u64,

    /// Seconds after which a started container is purged; `0` disables
    /// expiry.
    pub resource_expire_secs: u64,

    /// Whether the engine removes the container once it stops.
    pub auto_remove: bool,
}

impl Default for FixtureDefaults {
    fn default() -> Self {
        Self {
            pool_max_wait_secs: 50,
            initial_backoff_ms: 50,
            resource_expire_secs: 60,
            auto_remove: true,
        }
    }
}

impl FixtureDefaults {
    /// Return the readiness wait budget.
    #[must_use]
    pub const fn pool_max_wait(&self) -> Duration {
        Duration::from_secs(self.pool_max_wait_secs)
    }

    /// Return the first readiness backoff.
    #[must_use]
    pub const fn initial_backoff(&self) -> Duration {
        Duration::from_millis(self.initial_backoff_ms)
    }
}

/// Root application configuration.
///
/// This structure is loaded from configuration files, environment variables,
/// and command-line arguments with layered precedence. The precedence order
/// (lowest to highest) is: defaults, configuration file, environment variables,
/// command-line arguments.
///
/// Configuration files are discovered in this order:
/// 1. Path specified via `TESTDOCK_CONFIG_PATH` environment variable
/// 2. `.testdock.toml` in the current working directory
/// 3. `.testdock.toml` in the home directory
/// 4. `~/.config/testdock/config.toml` (XDG default)
#[derive(Debug, Clone, Default, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(
    prefix = "TESTDOCK",
    post_merge_hook,
    discovery(
        app_name = "testdock",
        env_var = "TESTDOCK_CONFIG_PATH",
        config_file_name = "config.toml",
        dotfile_name = ".testdock.toml",
        config_cli_long = "config",
        config_cli_visible = true,
    )
)]
pub struct AppConfig {
    /// The container engine socket path or URL.
    pub engine_socket: Option<String>,

    /// Lifecycle defaults for started fixtures.
    #[serde(default)]
    #[ortho_config(skip_cli)]
    pub fixtures: FixtureDefaults,
}

impl PostMergeHook for AppConfig {
    fn post_merge(&mut self, _ctx: &PostMergeContext) -> OrthoResult<()> {
        // An empty socket string in a file or env layer means "resolve it".
        if self
            .engine_socket
            .as_deref()
            .is_some_and(|socket| socket.trim().is_empty())
        {
            self.engine_socket = None;
        }
        Ok(())
    }
}
