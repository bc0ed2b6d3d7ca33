//! Scenario state for registry behavioural tests.

use std::sync::atomic::AtomicU32;
use std::sync::{Arc, Mutex};

use rstest::fixture;
use rstest_bdd::Slot;
use rstest_bdd_macros::ScenarioState;
use testdock::registry::Registry;

use super::StepResult;

#[derive(Default, ScenarioState)]
pub(crate) struct RegistryScenario {
    pub(crate) engine_reachable: Slot<bool>,
    pub(crate) runtime: Slot<Arc<tokio::runtime::Runtime>>,
    pub(crate) registry: Slot<Arc<Mutex<Registry>>>,
    pub(crate) removals: Slot<Arc<AtomicU32>>,
}

#[fixture]
pub(crate) fn registry_scenario() -> RegistryScenario {
    let state = RegistryScenario::default();
    state.engine_reachable.set(true);
    state
}

/// Run `check` against the populated registry.
pub(crate) fn with_registry<T>(
    registry_scenario: &RegistryScenario,
    check: impl FnOnce(&mut Registry) -> StepResult<T>,
) -> StepResult<T> {
    let shared = registry_scenario
        .registry
        .get()
        .ok_or_else(|| String::from("fixtures should have been set up"))?;
    let mut registry = shared
        .lock()
        .map_err(|_| String::from("registry lock poisoned"))?;
    check(&mut registry)
}
