//! Agent abstraction and the diagram generation/repair agents.
//!
//! This module provides the `CompletionAgent` trait (Adapter Pattern), the
//! chat-completions adapter and a mock, and the two services the
//! orchestrator consumes: [`DiagramGenerator`] and [`DiagramRepairer`].

pub mod adapters;
pub mod base;
pub mod factory;
pub mod fixer;
pub mod intent;
pub mod response;

pub use adapters::{ChatCompletionsAdapter, MockAgent};
pub use base::{AgentError, CompletionAgent, CompletionRequest};
pub use factory::AgentFactory;
pub use fixer::{DiagramRepairer, FixAgent};
pub use intent::{DiagramGenerator, GeneratedDiagram, IntentAgent};
