//! # mg-core
//!
//! Pipeline engine and stage implementations for mermaid-gif.
//!
//! This crate provides:
//! - Configuration loading from `.mermaid-gif/` and the environment
//! - A deterministic diagram source validator
//! - LLM agents for diagram generation and repair
//! - Rendering, motion injection, capture and transcoding stages
//! - The bounded-retry orchestrator that sequences them
//!
//! ## Modules
//!
//! - [`config`]: Settings loading, validation and provider resolution
//! - [`state`]: Copy-with-changes run state transitions
//! - [`validator`]: Diagram type detection and structural checks
//! - [`agents`]: Chat-completion agents behind the generator/repairer traits
//! - [`render`]: Rendering sandbox trait and the Chromium implementation
//! - [`motion`]: Connector measurement and CSS flow animation
//! - [`capture`]: Two-phase measure/record procedure
//! - [`transcode`]: Palette-optimized GIF encoding with ffmpeg
//! - [`engine`]: Pipeline orchestrator
//! - [`media`]: Shared helpers for the ffmpeg executable

pub mod agents;
pub mod capture;
pub mod config;
pub mod engine;
pub mod media;
pub mod motion;
pub mod render;
pub mod state;
pub mod transcode;
pub mod validator;
