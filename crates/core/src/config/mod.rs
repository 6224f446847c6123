//! Configuration loading and validation.
//!
//! This module builds the immutable [`Settings`](mg_protocol::Settings) value
//! from the `.mermaid-gif/` directory and the environment, and resolves the
//! generation provider from it.

pub mod error;
pub mod loader;
pub mod models;
