//! Diagram repair agent.
//!
//! The repairer only ever sees the current source and the validator's
//! findings. It never receives the original natural-language request, so a
//! repair cannot drift into a regenerated diagram.

use crate::agents::base::{AgentError, CompletionAgent, CompletionRequest};
use crate::agents::response::{parse_json_response, strip_code_fences};
use async_trait::async_trait;
use mg_protocol::finding_models::Finding;
use serde::Deserialize;
use std::fmt::Write as _;
use std::sync::Arc;
use tracing::debug;

const FIX_SYSTEM_PROMPT: &str = r#"You are a Mermaid syntax repair specialist. Fix the listed syntax and structural errors while preserving the diagram's meaning.

Common fixes:
1. Parentheses or quotes inside node labels: reword the label without them
   A[Return fib(n-1)]  ->  A[Return fib of n minus 1]
2. Single-dash arrows: 'A -> B' becomes 'A --> B'
3. Unclosed brackets: 'A[Start --> B' becomes 'A[Start] --> B'
4. Several statements on the header line: put each statement on its own line
5. ER relationships use cardinality markers: 'A ||--o{ B : has', never '-->'
6. Every 'subgraph', 'loop', 'alt', 'opt' and 'par' needs a matching 'end'

Rules:
- Fix syntax errors only
- Do not add or remove nodes or edges
- Keep the same diagram type

Respond with a JSON object of this shape:
{
  "mermaid": "the fixed Mermaid diagram source"
}"#;

const FIX_TEMPERATURE: f32 = 0.1;

/// Produces a revised diagram source from the current text and findings.
#[async_trait]
pub trait DiagramRepairer: Send + Sync {
    async fn repair(&self, source: &str, findings: &[Finding]) -> Result<String, AgentError>;
}

#[derive(Debug, Deserialize)]
struct FixResponse {
    mermaid: String,
}

/// Renders findings as a numbered list for the prompt.
pub fn format_findings(findings: &[Finding]) -> String {
    let mut out = String::new();
    for (idx, finding) in findings.iter().enumerate() {
        let _ = writeln!(out, "{}. {}", idx + 1, finding);
    }
    out
}

/// LLM-backed [`DiagramRepairer`].
pub struct FixAgent {
    agent: Arc<dyn CompletionAgent>,
}

impl FixAgent {
    pub fn new(agent: Arc<dyn CompletionAgent>) -> Self {
        Self { agent }
    }

    fn request(source: &str, findings: &[Finding]) -> CompletionRequest {
        let user_prompt = format!(
            "Fix the following Mermaid diagram:\n\n```mermaid\n{source}\n```\n\nErrors found:\n{}\nReturn the fixed Mermaid code.",
            format_findings(findings)
        );
        CompletionRequest::new(FIX_SYSTEM_PROMPT, user_prompt).with_temperature(FIX_TEMPERATURE)
    }
}

#[async_trait]
impl DiagramRepairer for FixAgent {
    async fn repair(&self, source: &str, findings: &[Finding]) -> Result<String, AgentError> {
        if findings.is_empty() {
            return Err(AgentError::ExecutionError(
                "repair requested without findings".to_string(),
            ));
        }

        debug!(
            agent = self.agent.name(),
            finding_count = findings.len(),
            "requesting repair"
        );
        let content = self.agent.complete(&Self::request(source, findings)).await?;
        let response: FixResponse = parse_json_response(&content)?;

        let repaired = strip_code_fences(&response.mermaid).to_string();
        if repaired.is_empty() {
            return Err(AgentError::ResponseParse(
                "model returned an empty 'mermaid' field".to_string(),
            ));
        }
        Ok(repaired)
    }
}
