//! Natural-language to diagram generation.

use crate::agents::base::{AgentError, CompletionAgent, CompletionRequest};
use crate::agents::response::{parse_json_response, strip_code_fences};
use async_trait::async_trait;
use mg_protocol::run_models::{AnimationManifest, AnimationStyle};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info};

const INTENT_SYSTEM_PROMPT: &str = r#"You are a Mermaid diagram expert. Convert the user's description into a standard Mermaid diagram.

Prefer these diagram types:
- flowchart LR (left to right) or flowchart TD (top to bottom)
- sequenceDiagram
- stateDiagram-v2, classDiagram or erDiagram when the description calls for them

Respond with a JSON object of this shape:
{
  "mermaid": "the complete Mermaid diagram source",
  "animation": {
    "duration": 5.0,
    "style": "default | minimal | presentation"
  }
}

Rules:
- Put each statement on its own line
- Use short, descriptive node labels without parentheses or quotes
- Use '-->' for flowchart arrows
- Start with the diagram type declaration
- Keep the diagram simple and focused"#;

const INTENT_TEMPERATURE: f32 = 0.3;

/// Output of a generation call.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedDiagram {
    pub source: String,
    pub manifest: AnimationManifest,
}

/// Turns a natural-language request into diagram source plus an animation
/// manifest.
#[async_trait]
pub trait DiagramGenerator: Send + Sync {
    async fn generate(
        &self,
        intent: &str,
        defaults: AnimationManifest,
    ) -> Result<GeneratedDiagram, AgentError>;
}

#[derive(Debug, Deserialize)]
struct IntentResponse {
    mermaid: String,
    #[serde(default)]
    animation: Option<ManifestHint>,
}

#[derive(Debug, Deserialize)]
struct ManifestHint {
    #[serde(default)]
    duration: Option<f64>,
    #[serde(default, alias = "preset")]
    style: Option<AnimationStyle>,
}

/// Fills gaps in the model's manifest from `defaults` and clamps the
/// duration to 1-60 seconds.
fn normalize_manifest(hint: Option<ManifestHint>, defaults: AnimationManifest) -> AnimationManifest {
    let Some(hint) = hint else {
        return defaults;
    };
    let duration = hint
        .duration
        .filter(|d| d.is_finite() && *d > 0.0)
        .map_or(defaults.duration, |d| d.clamp(1.0, 60.0));

    AnimationManifest {
        duration,
        style: hint.style.unwrap_or(defaults.style),
    }
}

/// LLM-backed [`DiagramGenerator`].
pub struct IntentAgent {
    agent: Arc<dyn CompletionAgent>,
}

impl IntentAgent {
    pub fn new(agent: Arc<dyn CompletionAgent>) -> Self {
        Self { agent }
    }

    fn request(intent: &str) -> CompletionRequest {
        CompletionRequest::new(
            INTENT_SYSTEM_PROMPT,
            format!("Convert this to a Mermaid diagram:\n\n{intent}"),
        )
        .with_temperature(INTENT_TEMPERATURE)
    }
}

#[async_trait]
impl DiagramGenerator for IntentAgent {
    async fn generate(
        &self,
        intent: &str,
        defaults: AnimationManifest,
    ) -> Result<GeneratedDiagram, AgentError> {
        if intent.trim().is_empty() {
            return Err(AgentError::ExecutionError("empty generation request".to_string()));
        }

        debug!(agent = self.agent.name(), input_length = intent.len(), "generating diagram");
        let content = self.agent.complete(&Self::request(intent)).await?;
        let response: IntentResponse = parse_json_response(&content)?;

        let source = strip_code_fences(&response.mermaid).to_string();
        if source.is_empty() {
            return Err(AgentError::ResponseParse(
                "model returned an empty 'mermaid' field".to_string(),
            ));
        }

        let manifest = normalize_manifest(response.animation, defaults);
        info!(
            source_length = source.len(),
            duration = manifest.duration,
            style = %manifest.style,
            "diagram generated"
        );

        Ok(GeneratedDiagram { source, manifest })
    }
}
