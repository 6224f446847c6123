//! # mg-protocol
//!
//! Core data models for mermaid-gif.
//!
//! This crate defines all shared data structures used for:
//! - Run state threaded through the pipeline orchestrator
//! - Validator findings and animation manifests
//! - Application settings (TOML file + environment)
//! - Progress events emitted by the engine to the CLI
//!
//! ## Modules
//!
//! - [`finding_models`]: Structured validator findings
//! - [`run_models`]: Run state, stages, artifacts and terminal outcomes
//! - [`config_models`]: Settings loaded once at process start
//! - [`ipc`]: Events sent from the engine to its observers
//!
//! ## Design Principles
//!
//! - Minimal dependencies: Only serde, uuid and chrono
//! - Plain data: behavior lives in `mg-core`
//! - Independent compilation: No dependencies on other mermaid-gif crates

pub mod config_models;
pub mod finding_models;
pub mod ipc;
pub mod run_models;

// Re-export all public types for convenience
pub use config_models::*;
pub use finding_models::*;
pub use ipc::*;
pub use run_models::*;
