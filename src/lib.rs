//! Ephemeral service containers for integration tests.
//!
//! `testdock` starts a backing service (PostgreSQL, Redis, MinIO) in a Docker
//! or Podman container, waits until the service actually answers, and hands
//! the test a typed client. Containers are removed on cleanup or, if the test
//! run dies first, once their expiry passes.
//!
//! # Architecture
//!
//! The retry-connect lifecycle is written once, in [`lifecycle`], against two
//! seams: [`engine::ContainerEngine`] for the container engine and
//! [`services::ServiceAdapter`] for everything backend-specific. Started
//! fixtures are collected by name in a [`registry::Registry`].
//!
//! ```no_run
//! use testdock::lifecycle::Lifecycle;
//! use testdock::registry::Registry;
//! use testdock::services::Container;
//! use testdock::services::redis::Redis;
//!
//! # fn main() -> Result<(), testdock::error::TestdockError> {
//! let runtime = tokio::runtime::Runtime::new().map_err(|error| {
//!     testdock::error::ContainerError::RuntimeCreationFailed {
//!         message: error.to_string(),
//!     }
//! })?;
//! let lifecycle = Lifecycle::connect(runtime.handle(), None)?;
//! let cache = Redis::builder().name("cache").host_port(None).build();
//!
//! let mut registry = Registry::new();
//! let containers: [&dyn Container; 1] = [&cache];
//! registry.setup(runtime.handle(), &lifecycle, &containers);
//! let client = registry.client::<redis::aio::ConnectionManager>("cache")?;
//! # let _ = client;
//! registry.cleanup_all(runtime.handle())?;
//! # Ok(())
//! # }
//! ```
//!
//! # Modules
//!
//! - [`config`]: Configuration with layered precedence (CLI > env > file > defaults)
//! - [`engine`]: Container engine connection and container operations
//! - [`error`]: Semantic error types
//! - [`lifecycle`]: The retry-connect lifecycle and started resources
//! - [`registry`]: Named collection of started fixtures
//! - [`services`]: Backend adapters
//! - [`spec`]: Declarative container and connection specs

pub mod config;
pub mod engine;
pub mod error;
pub mod lifecycle;
pub mod registry;
pub mod services;
pub mod spec;
