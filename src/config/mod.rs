//! Configuration for the orchestration kernel.
//!
//! Provides the `OrchestratorConfig` struct and its type-safe builder for
//! configuring one orchestrator run with validation and sensible defaults.

pub mod builder;
pub mod types;

pub use builder::{Complete, OrchestratorConfigBuilder, WithOutputDir, WithRootUrl};
pub use types::OrchestratorConfig;
