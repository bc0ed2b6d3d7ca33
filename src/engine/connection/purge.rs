//! Container removal, expiry timers, and the reaper for leaked containers.
//!
//! Every fixture container carries [`MANAGED_LABEL`]; containers with a
//! resource expiry also carry [`EXPIRES_AT_LABEL`] holding the Unix time at
//! which they may be removed. The in-process timer removes the container on
//! schedule while the test run is alive. The reaper catches containers whose
//! timer died with a crashed run.

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use bollard::models::ContainerSummary;
use tokio::task::JoinHandle;

use super::error_classification::is_already_removed;
use super::{ContainerEngine, EngineConnector};
use crate::error::ContainerError;

/// Label marking containers started by testdock.
pub const MANAGED_LABEL: &str = "io.testdock.managed";

/// Label holding the Unix time after which a container may be removed.
pub const EXPIRES_AT_LABEL: &str = "io.testdock.expires-at";

impl EngineConnector {
    /// Force-remove a container and its anonymous volumes.
    ///
    /// A container that is already gone (404) or already being removed (409)
    /// counts as purged, so teardown racing the engine's auto-remove succeeds.
    ///
    /// # Errors
    ///
    /// Returns `ContainerError::PurgeFailed` for any other engine answer.
    pub async fn purge_async(
        engine: &dyn ContainerEngine,
        container: &str,
    ) -> Result<(), ContainerError> {
        match engine.remove_container(container).await {
            Ok(()) => {
                tracing::debug!(container, "container purged");
                Ok(())
            }
            Err(error) if is_already_removed(&error) => {
                tracing::debug!(container, %error, "container already removed");
                Ok(())
            }
            Err(error) => Err(ContainerError::PurgeFailed {
                container: String::from(container),
                message: error.to_string(),
            }),
        }
    }

    /// Force-remove a container, blocking on `runtime`.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`Self::purge_async`].
    pub fn purge(
        runtime: &tokio::runtime::Handle,
        engine: &dyn ContainerEngine,
        container: &str,
    ) -> Result<(), ContainerError> {
        runtime.block_on(Self::purge_async(engine, container))
    }

    /// Spawn a timer on the current Tokio runtime that purges `container`
    /// once `after` has elapsed.
    ///
    /// # Errors
    ///
    /// Returns `ContainerError::ExpiryNotScheduled` when called outside a
    /// Tokio runtime.
    pub fn schedule_expiry(
        engine: Arc<dyn ContainerEngine>,
        container: &str,
        after: Duration,
    ) -> Result<JoinHandle<()>, ContainerError> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|error| {
            ContainerError::ExpiryNotScheduled {
                container: String::from(container),
                message: error.to_string(),
            }
        })?;
        let container_owned = String::from(container);

        Ok(runtime.spawn(async move {
            tokio::time::sleep(after).await;
            match Self::purge_async(engine.as_ref(), &container_owned).await {
                Ok(()) => tracing::info!(container = %container_owned, "expired container removed"),
                Err(error) => {
                    tracing::warn!(container = %container_owned, %error, "failed to remove expired container");
                }
            }
        }))
    }

    /// Remove every managed container whose expiry deadline is not after `now`.
    ///
    /// Containers without a parseable deadline are left alone. Individual
    /// removal failures are logged and skipped.
    ///
    /// # Errors
    ///
    /// Returns `ContainerError::ListFailed` when the engine cannot list
    /// containers.
    pub async fn reap_expired_async(
        engine: &dyn ContainerEngine,
        now: SystemTime,
    ) -> Result<Vec<String>, ContainerError> {
        let now_secs = unix_seconds(now);
        let containers = engine
            .list_containers(&format!("{MANAGED_LABEL}=true"))
            .await
            .map_err(|error| ContainerError::ListFailed {
                message: error.to_string(),
            })?;

        let mut reaped = Vec::new();
        for summary in containers {
            let Some(id) = expired_container_id(&summary, now_secs) else {
                continue;
            };
            match Self::purge_async(engine, &id).await {
                Ok(()) => {
                    tracing::info!(container = %id, "reaped expired container");
                    reaped.push(id);
                }
                Err(error) => tracing::warn!(container = %id, %error, "failed to reap container"),
            }
        }
        Ok(reaped)
    }

    /// Remove expired managed containers, blocking on `runtime`.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`Self::reap_expired_async`].
    pub fn reap_expired(
        runtime: &tokio::runtime::Handle,
        engine: &dyn ContainerEngine,
        now: SystemTime,
    ) -> Result<Vec<String>, ContainerError> {
        runtime.block_on(Self::reap_expired_async(engine, now))
    }
}

/// Compute the expiry label value for a container started at `now`.
///
/// Returns `None` when `expire_secs` is zero, which disables expiry.
#[must_use]
pub(crate) fn expiry_deadline(now: SystemTime, expire_secs: u64) -> Option<u64> {
    (expire_secs > 0).then(|| unix_seconds(now).saturating_add(expire_secs))
}

fn unix_seconds(at: SystemTime) -> u64 {
    at.duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_secs())
}

fn expired_container_id(summary: &ContainerSummary, now_secs: u64) -> Option<String> {
    let deadline: u64 = summary
        .labels
        .as_ref()?
        .get(EXPIRES_AT_LABEL)?
        .parse()
        .ok()?;
    (deadline <= now_secs).then(|| summary.id.clone()).flatten()
}
