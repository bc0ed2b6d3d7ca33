//! Given/when steps for fixture lifecycle scenarios.

use std::sync::atomic::AtomicU32;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rstest_bdd_macros::{given, when};
use testdock::engine::{ContainerEngine, HostPlatform};
use testdock::lifecycle::Lifecycle;
use testdock::services::ServiceAdapter;
use testdock::services::minio::Minio;

use super::StepResult;
use super::state::{FixtureScenario, with_resource};
use crate::support::{HealthStub, running_engine, unreachable_engine};

#[given("a container engine where the fixture container is running")]
fn given_running_engine(fixture_scenario: &FixtureScenario) {
    fixture_scenario.engine_reachable.set(true);
}

#[given("an unreachable container engine")]
fn given_unreachable_engine(fixture_scenario: &FixtureScenario) {
    fixture_scenario.engine_reachable.set(false);
}

#[given("the health endpoint refuses {count} requests before answering")]
fn given_refusals(fixture_scenario: &FixtureScenario, count: u32) {
    fixture_scenario.probe_failures.set(count);
}

#[given("the health endpoint never answers")]
fn given_never_answers(fixture_scenario: &FixtureScenario) {
    fixture_scenario.probe_failures.set(u32::MAX);
}

#[given("the readiness budget is {millis} milliseconds")]
fn given_budget(fixture_scenario: &FixtureScenario, millis: u64) {
    fixture_scenario.budget_ms.set(millis);
}

#[given("the fixture container is named {name}")]
fn given_container_name(fixture_scenario: &FixtureScenario, name: String) {
    fixture_scenario.container_name.set(name);
}

#[when("the object store fixture is started")]
fn when_fixture_started(fixture_scenario: &FixtureScenario) -> StepResult<()> {
    let runtime = Arc::new(
        tokio::runtime::Runtime::new().map_err(|e| format!("failed to create runtime: {e}"))?,
    );
    let failures = fixture_scenario.probe_failures.get().unwrap_or(0);
    let stub = HealthStub::start(&runtime, failures)
        .map_err(|e| format!("failed to start health stub: {e}"))?;

    let (engine, removals): (Arc<dyn ContainerEngine>, Arc<AtomicU32>) =
        if fixture_scenario.engine_reachable.get().unwrap_or(true) {
            let (running, removed) = running_engine(stub.port());
            (Arc::new(running), removed)
        } else {
            (Arc::new(unreachable_engine()), Arc::new(AtomicU32::new(0)))
        };
    let lifecycle = Lifecycle::new(engine).with_platform(HostPlatform::Other);

    let name = fixture_scenario
        .container_name
        .get()
        .ok_or_else(|| String::from("container name should be configured"))?;
    let budget = fixture_scenario.budget_ms.get().unwrap_or(0);
    let fixture = Minio::builder()
        .name(name)
        .resource_expire(0)
        .pool_max_wait(Duration::from_millis(budget))
        .initial_backoff(Duration::from_millis(10))
        .build();

    let resource = fixture.up(runtime.handle(), &lifecycle);
    if let Some(endpoint) = resource.endpoint() {
        fixture_scenario
            .url
            .set(fixture.adapter().connection_url(fixture.spec(), endpoint));
    }

    fixture_scenario.resource.set(Arc::new(Mutex::new(resource)));
    fixture_scenario.removals.set(removals);
    fixture_scenario.stub.set(Arc::new(stub));
    fixture_scenario.runtime.set(runtime);
    Ok(())
}

#[when("the fixture is cleaned up twice")]
fn when_cleaned_up_twice(fixture_scenario: &FixtureScenario) -> StepResult<()> {
    let runtime = fixture_scenario
        .runtime
        .get()
        .ok_or_else(|| String::from("runtime should exist"))?;
    with_resource(fixture_scenario, |resource| {
        for _ in 0..2 {
            resource
                .cleanup(runtime.handle())
                .map_err(|e| format!("cleanup failed: {e}"))?;
        }
        Ok(())
    })
}
