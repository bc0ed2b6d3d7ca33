//! In-memory adapter used by lifecycle, registry, and builder unit tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use super::{ServiceAdapter, ServiceClient, ServiceFuture};
use crate::engine::Endpoint;
use crate::error::ServiceFailure;
use crate::lifecycle::{ProbeFuture, ReadinessProbe};
use crate::spec::{ConnectionSpec, ContainerSpec, PortMapping};

/// Payload of the fake backend.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct FakeSettings {
    pub(crate) token: String,
}

/// Counters shared between a fake adapter and everything it hands out.
#[derive(Debug, Default)]
pub(crate) struct FakeCalls {
    probe_attempts: AtomicU32,
    connects: AtomicU32,
    closes: AtomicU32,
}

impl FakeCalls {
    pub(crate) fn probe_attempts(&self) -> u32 {
        self.probe_attempts.load(Ordering::SeqCst)
    }

    pub(crate) fn connects(&self) -> u32 {
        self.connects.load(Ordering::SeqCst)
    }

    pub(crate) fn closes(&self) -> u32 {
        self.closes.load(Ordering::SeqCst)
    }
}

/// Adapter whose probe, client, and post-ready step are scripted.
#[derive(Debug, Clone, Default)]
pub(crate) struct FakeAdapter {
    probe_failures: u32,
    connect_error: Option<String>,
    after_ready_error: Option<String>,
    close_error: Option<String>,
    calls: Arc<FakeCalls>,
}

impl FakeAdapter {
    /// Probe fails `failures` times before answering.
    pub(crate) fn with_probe_failures(mut self, failures: u32) -> Self {
        self.probe_failures = failures;
        self
    }

    pub(crate) fn never_ready(self) -> Self {
        self.with_probe_failures(u32::MAX)
    }

    pub(crate) fn with_connect_error(mut self, message: &str) -> Self {
        self.connect_error = Some(String::from(message));
        self
    }

    pub(crate) fn with_after_ready_error(mut self, message: &str) -> Self {
        self.after_ready_error = Some(String::from(message));
        self
    }

    pub(crate) fn with_close_error(mut self, message: &str) -> Self {
        self.close_error = Some(String::from(message));
        self
    }

    pub(crate) fn calls(&self) -> Arc<FakeCalls> {
        Arc::clone(&self.calls)
    }
}

/// Probe answering after a scripted number of failures.
pub(crate) struct FakeProbe {
    failures: u32,
    calls: Arc<FakeCalls>,
}

impl ReadinessProbe for FakeProbe {
    fn check<'a>(&'a self, endpoint: &'a Endpoint) -> ProbeFuture<'a> {
        let attempt = self.calls.probe_attempts.fetch_add(1, Ordering::SeqCst);
        let ready = attempt >= self.failures;
        Box::pin(async move {
            if ready {
                Ok(())
            } else {
                Err(ServiceFailure::new(format!("connection refused by {endpoint}")))
            }
        })
    }
}

/// Client that records when it is closed.
#[derive(Debug)]
pub(crate) struct FakeClient {
    url: String,
    close_error: Option<String>,
    calls: Arc<FakeCalls>,
}

impl FakeClient {
    pub(crate) fn url(&self) -> &str {
        &self.url
    }
}

impl ServiceClient for FakeClient {
    fn shutdown(self) -> ServiceFuture<'static, ()> {
        self.calls.closes.fetch_add(1, Ordering::SeqCst);
        Box::pin(async move { self.close_error.map_or(Ok(()), |message| Err(ServiceFailure::new(message))) })
    }
}

/// A second client type, for wrong-type lookups.
#[derive(Debug)]
pub(crate) struct OtherClient;

impl ServiceClient for OtherClient {
    fn shutdown(self) -> ServiceFuture<'static, ()> {
        Box::pin(async { Ok(()) })
    }
}

impl ServiceAdapter for FakeAdapter {
    type Settings = FakeSettings;
    type Client = FakeClient;
    type Probe = FakeProbe;

    fn defaults(&self) -> ConnectionSpec<FakeSettings> {
        let container = ContainerSpec::new("fake", "fake/service", "1.0")
            .with_port(Some(PortMapping::tcp(7000, 7001)));
        ConnectionSpec::new(container, FakeSettings::default())
    }

    fn derived_env(&self, settings: &FakeSettings) -> Vec<String> {
        vec![format!("FAKE_TOKEN={}", settings.token)]
    }

    fn readiness_probe(&self, _spec: &ConnectionSpec<FakeSettings>) -> FakeProbe {
        FakeProbe {
            failures: self.probe_failures,
            calls: Arc::clone(&self.calls),
        }
    }

    fn connect<'a>(
        &'a self,
        spec: &'a ConnectionSpec<FakeSettings>,
        endpoint: &'a Endpoint,
    ) -> ServiceFuture<'a, FakeClient> {
        Box::pin(async move {
            self.calls.connects.fetch_add(1, Ordering::SeqCst);
            if let Some(message) = &self.connect_error {
                return Err(ServiceFailure::new(message.clone()));
            }
            Ok(FakeClient {
                url: self.connection_url(spec, endpoint),
                close_error: self.close_error.clone(),
                calls: Arc::clone(&self.calls),
            })
        })
    }

    fn after_ready<'a>(
        &'a self,
        _client: &'a FakeClient,
        _spec: &'a ConnectionSpec<FakeSettings>,
    ) -> ServiceFuture<'a, ()> {
        let outcome = self
            .after_ready_error
            .clone()
            .map_or(Ok(()), |message| Err(ServiceFailure::new(message)));
        Box::pin(async move { outcome })
    }

    fn connection_url(&self, _spec: &ConnectionSpec<FakeSettings>, endpoint: &Endpoint) -> String {
        format!("fake://{}", endpoint.authority())
    }
}
