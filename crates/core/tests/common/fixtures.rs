//! Test fixtures: settings, sample diagrams and an engine harness.

use super::fakes::*;
use mg_core::agents::{AgentError, DiagramGenerator, DiagramRepairer};
use mg_core::engine::{PipelineEngine, Services};
use mg_core::render::RenderSandbox;
use mg_protocol::config_models::Settings;
use mg_protocol::ipc::PipelineEvent;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;
use tokio::sync::mpsc;

pub const VALID_FLOWCHART: &str = "graph TD\n  A-->B";

/// Flowchart with an unclosed `[` on line 2.
#[allow(dead_code)]
pub const BROKEN_FLOWCHART: &str = "graph TD\n  A[Start --> B";

#[allow(dead_code)]
pub const REPAIRED_FLOWCHART: &str = "graph TD\n  A[Start] --> B";

/// Document with two animatable connectors.
pub const RENDERED_SVG: &str = concat!(
    r#"<svg id="mermaid-0" width="240" height="180" xmlns="http://www.w3.org/2000/svg">"#,
    r#"<g class="edgePaths">"#,
    r#"<path d="M120,40 L120,140" id="L-A-B-0" class="edge-thickness-normal flowchart-link LS-A LE-B"/>"#,
    r#"<path d="M40,40 C40,90 200,90 200,140" id="L-A-C-0" class="flowchart-link"/>"#,
    r#"</g><g class="nodes"><g class="node"><rect width="60" height="30"/></g></g></svg>"#
);

/// Settings rooted in `dir`, with a three-attempt repair budget.
pub fn test_settings(dir: &TempDir) -> Settings {
    Settings {
        groq_api_key: Some("gsk_test_key".to_string()),
        output_dir: dir.path().join("output"),
        max_repair_attempts: 3,
        default_animation_duration: 4.0,
        ..Settings::default()
    }
}

/// Engine wired to fakes, with handles to inspect them afterwards.
pub struct Harness {
    pub dir: TempDir,
    pub generator: Arc<dyn DiagramGenerator>,
    pub repairer: Arc<ScriptedRepairer>,
    pub sandbox: Arc<FakeSandbox>,
    pub surface: Arc<FakeSurface>,
    pub encoder: Arc<FakeEncoder>,
    pub spy_generator: Arc<SpyGenerator>,
    settings: Settings,
}

#[allow(dead_code)]
impl Harness {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let settings = test_settings(&dir);
        let spy_generator = Arc::new(SpyGenerator::failing(AgentError::NotAvailable(
            "generation not expected".to_string(),
        )));
        Self {
            generator: spy_generator.clone(),
            spy_generator,
            repairer: Arc::new(ScriptedRepairer::new(Vec::new())),
            sandbox: Arc::new(FakeSandbox::rendering(RENDERED_SVG)),
            surface: Arc::new(FakeSurface::new(240.3, 179.0)),
            encoder: Arc::new(FakeEncoder::default()),
            settings,
            dir,
        }
    }

    pub fn with_generator(mut self, generator: SpyGenerator) -> Self {
        let generator = Arc::new(generator);
        self.generator = generator.clone();
        self.spy_generator = generator;
        self
    }

    /// Use a real agent (for example an `IntentAgent` over a mock) as the
    /// generator. `spy_generator` is then left untouched.
    pub fn with_dyn_generator(mut self, generator: Arc<dyn DiagramGenerator>) -> Self {
        self.generator = generator;
        self
    }

    pub fn with_repairer(mut self, repairer: ScriptedRepairer) -> Self {
        self.repairer = Arc::new(repairer);
        self
    }

    pub fn with_sandbox(mut self, sandbox: FakeSandbox) -> Self {
        self.sandbox = Arc::new(sandbox);
        self
    }

    pub fn with_surface(mut self, surface: FakeSurface) -> Self {
        self.surface = Arc::new(surface);
        self
    }

    pub fn with_encoder(mut self, encoder: FakeEncoder) -> Self {
        self.encoder = Arc::new(encoder);
        self
    }

    pub fn with_settings(mut self, f: impl FnOnce(&mut Settings)) -> Self {
        f(&mut self.settings);
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn output_path(&self) -> PathBuf {
        self.dir.path().join("final/diagram.gif")
    }

    pub fn engine(&self) -> PipelineEngine {
        let repairer: Arc<dyn DiagramRepairer> = self.repairer.clone();
        let sandbox: Arc<dyn RenderSandbox> = self.sandbox.clone();
        PipelineEngine::new(
            Arc::new(self.settings.clone()),
            Services {
                generator: self.generator.clone(),
                repairer,
                sandbox,
                surface: self.surface.clone(),
                encoder: self.encoder.clone(),
            },
        )
    }

    /// Engine plus the receiving end of its event channel.
    pub fn engine_with_events(&self) -> (PipelineEngine, mpsc::Receiver<PipelineEvent>) {
        let (tx, rx) = mpsc::channel(256);
        (self.engine().with_events(tx), rx)
    }
}

/// Drains every event from a channel whose sender has been dropped.
#[allow(dead_code)]
pub async fn drain_events(mut rx: mpsc::Receiver<PipelineEvent>) -> Vec<PipelineEvent> {
    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }
    events
}
