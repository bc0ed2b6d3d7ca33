//! Given/when steps for registry scenarios.

use std::sync::atomic::AtomicU32;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rstest_bdd_macros::{given, when};
use testdock::engine::{ContainerEngine, HostPlatform};
use testdock::lifecycle::Lifecycle;
use testdock::registry::Registry;
use testdock::services::Container;
use testdock::services::minio::Minio;

use super::StepResult;
use super::state::{RegistryScenario, with_registry};
use crate::support::{HealthStub, running_engine, unreachable_engine};

#[given("a container engine where the fixture container is running")]
fn given_running_engine(registry_scenario: &RegistryScenario) {
    registry_scenario.engine_reachable.set(true);
}

#[given("an unreachable container engine")]
fn given_unreachable_engine(registry_scenario: &RegistryScenario) {
    registry_scenario.engine_reachable.set(false);
}

#[when("fixtures {first} and {second} are set up")]
fn when_fixtures_set_up(
    registry_scenario: &RegistryScenario,
    first: String,
    second: String,
) -> StepResult<()> {
    let runtime = Arc::new(
        tokio::runtime::Runtime::new().map_err(|e| format!("failed to create runtime: {e}"))?,
    );
    let stub =
        HealthStub::start(&runtime, 0).map_err(|e| format!("failed to start health stub: {e}"))?;

    let (engine, removals): (Arc<dyn ContainerEngine>, Arc<AtomicU32>) =
        if registry_scenario.engine_reachable.get().unwrap_or(true) {
            let (running, removed) = running_engine(stub.port());
            (Arc::new(running), removed)
        } else {
            (Arc::new(unreachable_engine()), Arc::new(AtomicU32::new(0)))
        };
    let lifecycle = Lifecycle::new(engine).with_platform(HostPlatform::Other);

    let fixture = |name: String| {
        Minio::builder()
            .name(name)
            .resource_expire(0)
            .pool_max_wait(Duration::from_secs(5))
            .initial_backoff(Duration::from_millis(10))
            .build()
    };
    let first_fixture = fixture(first);
    let second_fixture = fixture(second);
    let containers: [&dyn Container; 2] = [&first_fixture, &second_fixture];

    let mut registry = Registry::new();
    registry.setup(runtime.handle(), &lifecycle, &containers);

    registry_scenario.registry.set(Arc::new(Mutex::new(registry)));
    registry_scenario.removals.set(removals);
    registry_scenario.runtime.set(runtime);
    Ok(())
}

#[when("every fixture is cleaned up")]
fn when_cleaned_up(registry_scenario: &RegistryScenario) -> StepResult<()> {
    let runtime = registry_scenario
        .runtime
        .get()
        .ok_or_else(|| String::from("runtime should exist"))?;
    with_registry(registry_scenario, |registry| {
        registry
            .cleanup_all(runtime.handle())
            .map_err(|e| format!("cleanup failed: {e}"))
    })
}
