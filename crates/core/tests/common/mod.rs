//! Common test utilities and helpers for pipeline tests.
//!
//! This module provides shared functionality across the integration tests:
//! - Test fixtures (settings, diagram sources, engine harness)
//! - Deterministic fake services with call counters
//! - Custom assertions over run states and event streams

pub mod assertions;
pub mod fakes;
pub mod fixtures;

#[allow(unused_imports)]
pub use assertions::*;
#[allow(unused_imports)]
pub use fakes::*;
pub use fixtures::*;
