//! Agent factory for creating agent instances from settings.

use crate::agents::adapters::ChatCompletionsAdapter;
use crate::agents::base::CompletionAgent;
use crate::agents::fixer::FixAgent;
use crate::agents::intent::IntentAgent;
use crate::config::models::resolve_model;
use anyhow::{Context, Result};
use mg_protocol::config_models::Settings;
use std::sync::Arc;
use std::time::Duration;

/// Factory for creating agent instances based on configuration.
pub struct AgentFactory;

impl AgentFactory {
    /// Create a completion agent from the configured model and keys.
    ///
    /// # Arguments
    ///
    /// * `name` - Label used in logs (`intent`, `fix`)
    /// * `settings` - Validated settings
    ///
    /// # Behavior
    ///
    /// The provider is chosen by [`resolve_model`]: an explicit `groq/` or
    /// `openrouter/` prefix wins, otherwise whichever key is present.
    pub fn create(name: &str, settings: &Settings) -> Result<Arc<dyn CompletionAgent>> {
        let resolved = resolve_model(settings).context("failed to resolve generation model")?;
        let adapter = ChatCompletionsAdapter::new(
            name,
            &resolved,
            Duration::from_secs(settings.request_timeout_secs),
        )?;
        Ok(Arc::new(adapter))
    }

    /// Create the generation and repair agents sharing one provider.
    pub fn create_pair(settings: &Settings) -> Result<(IntentAgent, FixAgent)> {
        let intent = Self::create("intent", settings)?;
        let fix = Self::create("fix", settings)?;
        Ok((IntentAgent::new(intent), FixAgent::new(fix)))
    }
}
