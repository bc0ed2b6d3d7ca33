//! Scenario state for fixture lifecycle behavioural tests.

use std::sync::atomic::AtomicU32;
use std::sync::{Arc, Mutex};

use rstest::fixture;
use rstest_bdd::Slot;
use rstest_bdd_macros::ScenarioState;
use testdock::lifecycle::Resource;
use testdock::services::minio::ObjectStoreClient;

use super::StepResult;
use crate::support::HealthStub;

/// Readiness budget used unless a scenario narrows it.
pub(crate) const DEFAULT_BUDGET_MS: u64 = 5_000;

pub(crate) type SharedResource = Arc<Mutex<Resource<ObjectStoreClient>>>;

#[derive(Default, ScenarioState)]
pub(crate) struct FixtureScenario {
    pub(crate) engine_reachable: Slot<bool>,
    pub(crate) probe_failures: Slot<u32>,
    pub(crate) budget_ms: Slot<u64>,
    pub(crate) container_name: Slot<String>,
    pub(crate) runtime: Slot<Arc<tokio::runtime::Runtime>>,
    pub(crate) stub: Slot<Arc<HealthStub>>,
    pub(crate) removals: Slot<Arc<AtomicU32>>,
    pub(crate) resource: Slot<SharedResource>,
    pub(crate) url: Slot<String>,
}

#[fixture]
pub(crate) fn fixture_scenario() -> FixtureScenario {
    let state = FixtureScenario::default();
    state.engine_reachable.set(true);
    state.probe_failures.set(0);
    state.budget_ms.set(DEFAULT_BUDGET_MS);
    state.container_name.set(String::from("store"));
    state
}

/// Run `check` against the started resource.
pub(crate) fn with_resource<T>(
    fixture_scenario: &FixtureScenario,
    check: impl FnOnce(&mut Resource<ObjectStoreClient>) -> StepResult<T>,
) -> StepResult<T> {
    let shared = fixture_scenario
        .resource
        .get()
        .ok_or_else(|| String::from("fixture should have been started"))?;
    let mut resource = shared
        .lock()
        .map_err(|_| String::from("resource lock poisoned"))?;
    check(&mut resource)
}
