//! Assertion steps for registry scenarios.

use std::sync::atomic::Ordering;

use rstest_bdd_macros::then;
use testdock::error::{FixtureError, RegistryError, TestdockError};
use testdock::services::minio::ObjectStoreClient;

use super::StepResult;
use super::state::{RegistryScenario, with_registry};

#[then("the registry holds {count} fixtures")]
fn registry_holds(registry_scenario: &RegistryScenario, count: usize) -> StepResult<()> {
    with_registry(registry_scenario, |registry| {
        if registry.len() == count {
            Ok(())
        } else {
            Err(format!("expected {count} fixtures, got {:?}", registry.names()))
        }
    })
}

#[then("the {name} client is available")]
fn client_available(registry_scenario: &RegistryScenario, name: String) -> StepResult<()> {
    with_registry(registry_scenario, |registry| {
        let client = registry
            .client::<ObjectStoreClient>(&name)
            .map_err(|e| format!("expected a client for {name}, got {e}"))?;
        if client.endpoint_url().starts_with("http://127.0.0.1:") {
            Ok(())
        } else {
            Err(format!("unexpected endpoint {}", client.endpoint_url()))
        }
    })
}

#[then("the {name} client has been released")]
fn client_released(registry_scenario: &RegistryScenario, name: String) -> StepResult<()> {
    with_registry(registry_scenario, |registry| {
        match registry.client::<ObjectStoreClient>(&name) {
            Err(TestdockError::Registry(RegistryError::Released { .. })) => Ok(()),
            Err(other) => Err(format!("expected Released, got {other}")),
            Ok(_) => Err(format!("expected {name} to be released")),
        }
    })
}

#[then("looking up {name} reports the start failure")]
fn lookup_reports_start_failure(
    registry_scenario: &RegistryScenario,
    name: String,
) -> StepResult<()> {
    with_registry(registry_scenario, |registry| match registry.get_by_name(&name) {
        Err(TestdockError::Fixture(FixtureError::ContainerStartFailed {
            name: failed, ..
        })) if failed == name => Ok(()),
        Err(other) => Err(format!("expected ContainerStartFailed, got {other}")),
        Ok(_) => Err(format!("expected {name} to have failed")),
    })
}

#[then("looking up {name} reports not found")]
fn lookup_reports_not_found(registry_scenario: &RegistryScenario, name: String) -> StepResult<()> {
    with_registry(registry_scenario, |registry| match registry.get_by_name(&name) {
        Err(TestdockError::Registry(RegistryError::NotFound { .. })) => Ok(()),
        Err(other) => Err(format!("expected NotFound, got {other}")),
        Ok(_) => Err(format!("expected {name} to be missing")),
    })
}

#[then("looking up {name} reports the engine is unavailable")]
fn lookup_reports_engine_unavailable(
    registry_scenario: &RegistryScenario,
    name: String,
) -> StepResult<()> {
    with_registry(registry_scenario, |registry| match registry.get_by_name(&name) {
        Err(TestdockError::Fixture(FixtureError::EngineUnavailable { .. })) => Ok(()),
        Err(other) => Err(format!("expected EngineUnavailable, got {other}")),
        Ok(_) => Err(format!("expected {name} to have failed")),
    })
}

#[then("the container was removed {count} times")]
fn container_removed(registry_scenario: &RegistryScenario, count: u32) -> StepResult<()> {
    let removals = registry_scenario
        .removals
        .get()
        .ok_or_else(|| String::from("removal counter should exist"))?;
    let seen = removals.load(Ordering::SeqCst);
    if seen == count {
        Ok(())
    } else {
        Err(format!("expected {count} removals, got {seen}"))
    }
}
