//! Diagram rendering.
//!
//! A [`RenderSandbox`] turns validated diagram source into SVG markup. The
//! [`RenderDriver`] wraps a sandbox and rejects output that is not a usable
//! vector document; render failures are terminal and never retried.

pub mod assets;
#[cfg(feature = "browser")]
pub mod chromium;

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

#[cfg(feature = "browser")]
pub use chromium::{ChromiumOptions, ChromiumSandbox, ChromiumSession};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    #[error("failed to launch rendering sandbox: {0}")]
    Launch(String),

    #[error("rendering sandbox failed: {0}")]
    Sandbox(String),

    #[error("diagram library rejected the source: {0}")]
    Rejected(String),

    #[error("rendering produced an empty document")]
    EmptyDocument,
}

/// Renders diagram source to SVG markup.
#[async_trait]
pub trait RenderSandbox: Send + Sync {
    async fn render(&self, source: &str) -> Result<String, RenderError>;
}

/// Stage-facing wrapper around a sandbox.
#[derive(Clone)]
pub struct RenderDriver {
    sandbox: Arc<dyn RenderSandbox>,
}

impl RenderDriver {
    pub fn new(sandbox: Arc<dyn RenderSandbox>) -> Self {
        Self { sandbox }
    }

    /// Renders `source` and checks the result contains an `<svg>` root.
    pub async fn render(&self, source: &str) -> Result<String, RenderError> {
        debug!(source_length = source.len(), "rendering diagram");
        let document = self.sandbox.render(source).await?;

        let document = document.trim();
        if document.is_empty() || !document.contains("<svg") {
            return Err(RenderError::EmptyDocument);
        }

        info!(document_length = document.len(), "diagram rendered");
        Ok(document.to_string())
    }
}
