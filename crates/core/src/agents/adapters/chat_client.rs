//! OpenAI-compatible chat-completions adapter.
//!
//! Groq and OpenRouter both expose `POST {base}/chat/completions` with
//! bearer authentication, so a single adapter serves either provider.

use crate::agents::base::{AgentError, CompletionAgent, CompletionRequest};
use crate::config::models::ResolvedModel;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ChatMessage {
    role: Role,
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Clone, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatResponseChoice {
    message: ChatMessage,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatResponseChoice>,
}

/// Completion agent backed by an OpenAI-compatible HTTP endpoint.
#[derive(Debug, Clone)]
pub struct ChatCompletionsAdapter {
    name: String,
    base_url: String,
    model: String,
    api_key: String,
    client: reqwest::Client,
}

impl ChatCompletionsAdapter {
    /// Create an adapter for a resolved provider/model pair.
    pub fn new(
        name: impl Into<String>,
        resolved: &ResolvedModel,
        timeout: Duration,
    ) -> Result<Self, AgentError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AgentError::NotAvailable(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            name: name.into(),
            base_url: resolved.provider.base_url().to_string(),
            model: resolved.model.clone(),
            api_key: resolved.api_key.clone(),
            client,
        })
    }

    /// Point the adapter at a different endpoint (self-hosted gateways).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn build_request<'a>(&'a self, request: &CompletionRequest) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: Role::System,
                    content: Some(request.system_prompt.clone()),
                },
                ChatMessage {
                    role: Role::User,
                    content: Some(request.user_prompt.clone()),
                },
            ],
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            response_format: request
                .json_response
                .then_some(ResponseFormat { kind: "json_object" }),
        }
    }
}

#[async_trait]
impl CompletionAgent for ChatCompletionsAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    async fn check_availability(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String, AgentError> {
        if !self.check_availability().await {
            return Err(AgentError::NotAvailable(format!(
                "{}: no API key configured",
                self.name
            )));
        }

        let url = format!("{}/chat/completions", self.base_url);
        debug!(agent = %self.name, model = %self.model, %url, "sending completion request");

        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&self.build_request(request))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AgentError::Timeout(e.to_string())
                } else {
                    AgentError::ApiError(e.to_string())
                }
            })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(AgentError::ApiError(format!("{}: {}", status.as_u16(), body)));
        }

        let response: ChatResponse = resp
            .json()
            .await
            .map_err(|e| AgentError::ResponseParse(e.to_string()))?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| AgentError::ResponseParse("response contained no message".to_string()))
    }
}
