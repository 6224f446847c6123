//! Base CompletionAgent trait and supporting types.

use async_trait::async_trait;
use thiserror::Error;

/// A single prompt sent to a completion agent.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    /// System prompt describing the agent's role and output format.
    pub system_prompt: String,

    /// The user message.
    pub user_prompt: String,

    /// Sampling temperature.
    pub temperature: f32,

    /// Upper bound on generated tokens.
    pub max_tokens: u32,

    /// Ask the provider for a JSON object response.
    pub json_response: bool,
}

impl CompletionRequest {
    /// Create a new CompletionRequest.
    ///
    /// Defaults:
    /// - temperature: 0.3
    /// - max_tokens: 2000
    /// - json_response: true
    pub fn new(system_prompt: impl Into<String>, user_prompt: impl Into<String>) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            user_prompt: user_prompt.into(),
            temperature: 0.3,
            max_tokens: 2000,
            json_response: true,
        }
    }

    /// Set the sampling temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set the token limit.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Set whether a JSON object response is requested.
    pub fn with_json_response(mut self, json: bool) -> Self {
        self.json_response = json;
        self
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AgentError {
    #[error("Agent not available: {0}")]
    NotAvailable(String),
    #[error("API call failed: {0}")]
    ApiError(String),
    #[error("Request timed out: {0}")]
    Timeout(String),
    #[error("Response parsing error: {0}")]
    ResponseParse(String),
    #[error("Execution failed: {0}")]
    ExecutionError(String),
}

/// A text-completion service: one prompt in, one message out.
#[async_trait]
pub trait CompletionAgent: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &str;
    async fn check_availability(&self) -> bool;
    async fn complete(&self, request: &CompletionRequest) -> Result<String, AgentError>;
}
