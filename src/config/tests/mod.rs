//! Unit tests for testdock configuration types.
//!
//! - [`helpers`] - Shared fixtures and helper functions
//! - [`types_tests`] - Defaults and TOML parsing
//! - [`layer_precedence_tests`] - `MergeComposer` layer precedence

mod helpers;
