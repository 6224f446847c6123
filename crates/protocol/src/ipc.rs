//! Engine-to-observer event protocol.
//!
//! The orchestrator reports progress as a stream of [`PipelineEvent`]s over
//! an async channel. Observers (the CLI progress printer, tests) never feed
//! anything back, and a dropped receiver does not stop the run.
//!
//! Uses tagged enum serialization:
//! ```json
//! {
//!   "type": "stageExited",
//!   "payload": {
//!     "run_id": "uuid-here",
//!     "stage": "validating",
//!     "note": "clean"
//!   }
//! }
//! ```

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::run_models::{FailureKind, InputKind, Stage, TerminalOutcome};

/// Events sent from the engine to its observers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
pub enum PipelineEvent {
    /// A new run has been created.
    RunStarted {
        run_id: Uuid,
        kind_hint: Option<InputKind>,
    },

    /// A stage is about to execute.
    StageEntered {
        run_id: Uuid,
        stage: Stage,
        /// 1-based count of entries into this stage during the run.
        attempt: usize,
    },

    /// A stage completed and returned a new run state.
    StageExited {
        run_id: Uuid,
        stage: Stage,
        note: Option<String>,
    },

    /// A stage raised a typed failure.
    StageFailed {
        run_id: Uuid,
        stage: Stage,
        kind: FailureKind,
        message: String,
        /// Whether the orchestrator will retry rather than end the run.
        recoverable: bool,
    },

    /// The run reached a terminal state.
    RunFinished {
        run_id: Uuid,
        outcome: TerminalOutcome,
    },
}

impl PipelineEvent {
    pub fn run_id(&self) -> Uuid {
        match self {
            PipelineEvent::RunStarted { run_id, .. }
            | PipelineEvent::StageEntered { run_id, .. }
            | PipelineEvent::StageExited { run_id, .. }
            | PipelineEvent::StageFailed { run_id, .. }
            | PipelineEvent::RunFinished { run_id, .. } => *run_id,
        }
    }
}
