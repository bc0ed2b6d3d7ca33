//! Assertion steps for fixture lifecycle scenarios.

use std::sync::atomic::Ordering;

use rstest_bdd_macros::then;
use testdock::error::FixtureError;
use testdock::lifecycle::LifecycleState;

use super::StepResult;
use super::state::{FixtureScenario, with_resource};

#[then("the fixture is ready")]
fn fixture_is_ready(fixture_scenario: &FixtureScenario) -> StepResult<()> {
    with_resource(fixture_scenario, |resource| match resource.error() {
        None if resource.state() == LifecycleState::Ready && resource.client().is_some() => Ok(()),
        None => Err(format!("expected Ready, got {}", resource.state())),
        Some(error) => Err(format!("expected Ready, got error: {error}")),
    })
}

#[then("the fixture is released")]
fn fixture_is_released(fixture_scenario: &FixtureScenario) -> StepResult<()> {
    with_resource(fixture_scenario, |resource| {
        if resource.state() == LifecycleState::Released && resource.client().is_none() {
            Ok(())
        } else {
            Err(format!("expected Released, got {}", resource.state()))
        }
    })
}

#[then("the health endpoint was probed {count} times")]
fn endpoint_probed(fixture_scenario: &FixtureScenario, count: u32) -> StepResult<()> {
    let stub = fixture_scenario
        .stub
        .get()
        .ok_or_else(|| String::from("health stub should exist"))?;
    let seen = stub.requests();
    if seen == count {
        Ok(())
    } else {
        Err(format!("expected {count} probes, got {seen}"))
    }
}

#[then("the connection URL points at the health endpoint")]
fn url_points_at_stub(fixture_scenario: &FixtureScenario) -> StepResult<()> {
    let stub = fixture_scenario
        .stub
        .get()
        .ok_or_else(|| String::from("health stub should exist"))?;
    let url = fixture_scenario
        .url
        .get()
        .ok_or_else(|| String::from("connection URL should be recorded"))?;
    let expected = format!("http://127.0.0.1:{}", stub.port());
    if url == expected {
        Ok(())
    } else {
        Err(format!("expected {expected}, got {url}"))
    }
}

#[then("the fixture failed because the engine is unavailable")]
fn failed_engine_unavailable(fixture_scenario: &FixtureScenario) -> StepResult<()> {
    with_resource(fixture_scenario, |resource| match resource.error() {
        Some(FixtureError::EngineUnavailable { .. }) => Ok(()),
        other => Err(format!("expected EngineUnavailable, got {other:?}")),
    })
}

#[then("the fixture failed to start with message \"{message}\"")]
fn failed_to_start(fixture_scenario: &FixtureScenario, message: String) -> StepResult<()> {
    with_resource(fixture_scenario, |resource| match resource.error() {
        Some(FixtureError::ContainerStartFailed {
            message: actual, ..
        }) if actual.contains(&message) => Ok(()),
        other => Err(format!(
            "expected ContainerStartFailed containing '{message}', got {other:?}"
        )),
    })
}

#[then("the fixture failed with a readiness timeout")]
fn failed_readiness_timeout(fixture_scenario: &FixtureScenario) -> StepResult<()> {
    with_resource(fixture_scenario, |resource| match resource.error() {
        Some(FixtureError::ReadinessTimeout { attempts, .. }) if *attempts >= 1 => Ok(()),
        other => Err(format!("expected ReadinessTimeout, got {other:?}")),
    })
}

#[then("the container was removed {count} times")]
fn container_removed(fixture_scenario: &FixtureScenario, count: u32) -> StepResult<()> {
    let removals = fixture_scenario
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
