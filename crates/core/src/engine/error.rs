//! Failure taxonomy of the orchestrator.

use crate::agents::AgentError;
use crate::capture::CaptureError;
use crate::motion::MotionError;
use crate::render::RenderError;
use crate::state::run::StateError;
use crate::transcode::EncodeError;
use mg_protocol::finding_models::Finding;
use mg_protocol::run_models::FailureKind;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    /// Findings on a source that reached a stage requiring a clean one.
    #[error("diagram source has {} unresolved finding(s)", .0.len())]
    Validation(Vec<Finding>),

    #[error("diagram source still invalid after {attempts} repair attempt(s)")]
    RepairExhausted {
        attempts: u32,
        /// Every findings list seen during the run, oldest first.
        history: Vec<Vec<Finding>>,
    },

    #[error("diagram generation failed: {0}")]
    Generation(#[source] AgentError),

    #[error("diagram repair failed: {0}")]
    Repair(#[source] AgentError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error("animation missing: {0}")]
    AnimationMissing(#[from] MotionError),

    #[error("capture failed: {0}")]
    Capture(#[from] CaptureError),

    #[error("encoding failed: {0}")]
    Encode(#[from] EncodeError),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("run state error: {0}")]
    State(#[from] StateError),

    #[error("pipeline failure: {0}")]
    Internal(#[from] anyhow::Error),
}

impl PipelineError {
    pub fn kind(&self) -> FailureKind {
        match self {
            PipelineError::RepairExhausted { .. } => FailureKind::RepairExhausted,
            PipelineError::Generation(_) => FailureKind::GenerationError,
            PipelineError::Repair(_) => FailureKind::RepairError,
            PipelineError::Render(_) => FailureKind::RenderError,
            PipelineError::AnimationMissing(_) => FailureKind::AnimationMissing,
            PipelineError::Capture(_) => FailureKind::CaptureError,
            PipelineError::Encode(_) => FailureKind::EncodeError,
            PipelineError::Configuration(_) => FailureKind::ConfigurationError,
            PipelineError::Validation(_)
            | PipelineError::State(_)
            | PipelineError::Internal(_) => FailureKind::PipelineFailure,
        }
    }

    /// Whether the error class allows the orchestrator to try again.
    ///
    /// Validation findings are handled by the repair loop and a missing
    /// animation gets a single re-injection; everything else ends the run.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            PipelineError::Validation(_) | PipelineError::AnimationMissing(_)
        )
    }

    /// Findings still open when the run failed.
    pub fn unresolved_findings(&self) -> Vec<Finding> {
        match self {
            PipelineError::RepairExhausted { history, .. } => {
                history.last().cloned().unwrap_or_default()
            }
            PipelineError::Validation(findings) => findings.clone(),
            _ => Vec::new(),
        }
    }
}
