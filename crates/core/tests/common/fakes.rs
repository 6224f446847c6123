//! Fake service implementations for deterministic testing.
//!
//! Every fake counts its calls so tests can assert which capabilities a run
//! touched.

use async_trait::async_trait;
use mg_core::agents::{AgentError, DiagramGenerator, DiagramRepairer, GeneratedDiagram};
use mg_core::capture::{BoundingBox, CaptureError, Dimensions, RecordingRequest, RecordingSurface};
use mg_core::render::{RenderError, RenderSandbox};
use mg_core::transcode::{EncodeError, EncodeJob, Encoder};
use mg_protocol::finding_models::Finding;
use mg_protocol::run_models::AnimationManifest;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Generator returning a fixed result.
pub struct SpyGenerator {
    result: Result<GeneratedDiagram, AgentError>,
    calls: AtomicUsize,
}

#[allow(dead_code)]
impl SpyGenerator {
    pub fn returning(source: &str, manifest: Option<AnimationManifest>) -> Self {
        Self {
            result: Ok(GeneratedDiagram {
                source: source.to_string(),
                manifest: manifest.unwrap_or(AnimationManifest {
                    duration: 3.0,
                    style: Default::default(),
                }),
            }),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(error: AgentError) -> Self {
        Self {
            result: Err(error),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DiagramGenerator for SpyGenerator {
    async fn generate(
        &self,
        _intent: &str,
        _defaults: AnimationManifest,
    ) -> Result<GeneratedDiagram, AgentError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.result.clone()
    }
}

/// Repairer replaying scripted sources; the last one repeats.
pub struct ScriptedRepairer {
    responses: Vec<Result<String, AgentError>>,
    seen: Mutex<Vec<(String, Vec<Finding>)>>,
}

#[allow(dead_code)]
impl ScriptedRepairer {
    pub fn new(responses: Vec<Result<String, AgentError>>) -> Self {
        Self {
            responses,
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn always(source: &str) -> Self {
        Self::new(vec![Ok(source.to_string())])
    }

    pub fn calls(&self) -> usize {
        self.seen.lock().unwrap().len()
    }

    /// Sources and findings passed to each call, in order.
    pub fn seen(&self) -> Vec<(String, Vec<Finding>)> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl DiagramRepairer for ScriptedRepairer {
    async fn repair(&self, source: &str, findings: &[Finding]) -> Result<String, AgentError> {
        let index = {
            let mut seen = self.seen.lock().unwrap();
            seen.push((source.to_string(), findings.to_vec()));
            seen.len() - 1
        };
        self.responses
            .get(index)
            .or_else(|| self.responses.last())
            .cloned()
            .unwrap_or_else(|| Err(AgentError::NotAvailable("no scripted response".to_string())))
    }
}

/// Sandbox returning a fixed document.
pub struct FakeSandbox {
    result: Result<String, RenderError>,
    calls: AtomicUsize,
}

#[allow(dead_code)]
impl FakeSandbox {
    pub fn rendering(document: &str) -> Self {
        Self {
            result: Ok(document.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(error: RenderError) -> Self {
        Self {
            result: Err(error),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RenderSandbox for FakeSandbox {
    async fn render(&self, _source: &str) -> Result<String, RenderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.result.clone()
    }
}

/// Surface reporting a fixed bounding box and writing a stub video.
pub struct FakeSurface {
    bbox: BoundingBox,
    measures: AtomicUsize,
    recordings: Mutex<Vec<RecordingRequest>>,
    /// Returned by the first recording instead of a video.
    failure: Mutex<Option<CaptureError>>,
}

#[allow(dead_code)]
impl FakeSurface {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            bbox: BoundingBox { width, height },
            measures: AtomicUsize::new(0),
            recordings: Mutex::new(Vec::new()),
            failure: Mutex::new(None),
        }
    }

    /// Measures normally, then fails the recording with `error`.
    pub fn failing(error: CaptureError) -> Self {
        Self {
            failure: Mutex::new(Some(error)),
            ..Self::new(240.0, 180.0)
        }
    }

    pub fn measures(&self) -> usize {
        self.measures.load(Ordering::SeqCst)
    }

    pub fn recordings(&self) -> Vec<RecordingRequest> {
        self.recordings.lock().unwrap().clone()
    }
}

#[async_trait]
impl RecordingSurface for FakeSurface {
    async fn measure(
        &self,
        _document: &str,
        _viewport: Dimensions,
    ) -> Result<BoundingBox, CaptureError> {
        self.measures.fetch_add(1, Ordering::SeqCst);
        Ok(self.bbox)
    }

    async fn record(&self, request: &RecordingRequest) -> Result<PathBuf, CaptureError> {
        self.recordings.lock().unwrap().push(request.clone());
        if let Some(error) = self.failure.lock().unwrap().take() {
            return Err(error);
        }
        std::fs::write(&request.output, b"\x00\x00\x00\x18ftypmp42")?;
        Ok(request.output.clone())
    }
}

/// Encoder writing a stub GIF to the requested output.
#[derive(Default)]
pub struct FakeEncoder {
    jobs: Mutex<Vec<EncodeJob>>,
    /// Returned by the first job instead of an output.
    failure: Mutex<Option<EncodeError>>,
}

#[allow(dead_code)]
impl FakeEncoder {
    pub fn failing(error: EncodeError) -> Self {
        Self {
            failure: Mutex::new(Some(error)),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.jobs.lock().unwrap().len()
    }

    pub fn jobs(&self) -> Vec<EncodeJob> {
        self.jobs.lock().unwrap().clone()
    }
}

#[async_trait]
impl Encoder for FakeEncoder {
    async fn encode(&self, job: &EncodeJob) -> Result<PathBuf, EncodeError> {
        self.jobs.lock().unwrap().push(job.clone());
        if let Some(error) = self.failure.lock().unwrap().take() {
            return Err(error);
        }
        if let Some(parent) = job.output.parent() {
            std::fs::create_dir_all(parent).map_err(EncodeError::Scratch)?;
        }
        std::fs::write(&job.output, b"GIF89a").map_err(EncodeError::Scratch)?;
        Ok(job.output.clone())
    }
}
