//! Pipeline execution engine.
//!
//! The PipelineEngine drives one run through the stage graph:
//!
//! ```text
//! routing -> (generating) -> validating -> [repairing -> validating]*
//!   -> rendering -> animating -> capturing -> transcoding -> succeeded
//! ```
//!
//! Stages are executed one at a time on the caller's task. After each
//! stage the pure functions in [`transition`] decide what comes next, so
//! retry bounds are enforced in one place. Every entry, exit and failure is
//! logged through `tracing`, appended to the run's audit trail and, when a
//! channel is attached, sent as a [`PipelineEvent`].

pub mod error;
pub mod repair;
mod stages;
pub mod transition;

use crate::agents::{DiagramGenerator, DiagramRepairer};
use crate::capture::{CaptureCoordinator, CaptureOptions, RecordingSurface};
use crate::render::{RenderDriver, RenderSandbox};
use crate::state::run::{create_run, finish, record_animation_attempt, record_stage};
use crate::transcode::Encoder;
use anyhow::anyhow;
use mg_protocol::config_models::Settings;
use mg_protocol::ipc::PipelineEvent;
use mg_protocol::run_models::{
    ArtifactKey, InputKind, RunState, Stage, StageStatus, TerminalOutcome,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc::Sender;
use tracing::{error, info, info_span, warn, Instrument};

pub use error::PipelineError;
pub use repair::{RepairCoordinator, RepairDecision};
pub use transition::{after_failure, next_stage, Decision, Policy};

/// The external capabilities a run depends on.
#[derive(Clone)]
pub struct Services {
    pub generator: Arc<dyn DiagramGenerator>,
    pub repairer: Arc<dyn DiagramRepairer>,
    pub sandbox: Arc<dyn RenderSandbox>,
    pub surface: Arc<dyn RecordingSurface>,
    pub encoder: Arc<dyn Encoder>,
}

impl Services {
    /// Real services: chat-completion agents, headless Chromium and ffmpeg.
    ///
    /// # Errors
    ///
    /// Returns a `Configuration` error if no provider can be resolved from
    /// the settings.
    #[cfg(feature = "browser")]
    pub fn from_settings(settings: &Settings) -> Result<Self, PipelineError> {
        use crate::agents::AgentFactory;
        use crate::capture::ChromiumSurface;
        use crate::render::{ChromiumOptions, ChromiumSandbox};
        use crate::transcode::FfmpegTranscoder;

        let (generator, repairer) = AgentFactory::create_pair(settings)
            .map_err(|e| PipelineError::Configuration(format!("{e:#}")))?;
        let options = ChromiumOptions::from_settings(settings);

        Ok(Self {
            generator: Arc::new(generator),
            repairer: Arc::new(repairer),
            sandbox: Arc::new(ChromiumSandbox::new(options.clone())),
            surface: Arc::new(ChromiumSurface::new(options, settings.ffmpeg_path.clone())),
            encoder: Arc::new(FfmpegTranscoder::from_settings(settings)),
        })
    }
}

/// The main pipeline execution engine.
///
/// An engine holds read-only configuration and services and can execute
/// any number of independent runs; runs share no mutable state.
pub struct PipelineEngine {
    settings: Arc<Settings>,
    policy: Policy,
    generator: Arc<dyn DiagramGenerator>,
    repairs: RepairCoordinator,
    renderer: RenderDriver,
    capture: CaptureCoordinator,
    encoder: Arc<dyn Encoder>,
    events: Option<Sender<PipelineEvent>>,
}

impl PipelineEngine {
    /// Create a new PipelineEngine.
    ///
    /// # Arguments
    ///
    /// * `settings` - Configuration loaded once at start
    /// * `services` - Generation, repair, rendering, recording and encoding
    pub fn new(settings: Arc<Settings>, services: Services) -> Self {
        let policy = Policy::from_settings(&settings);
        Self {
            policy,
            generator: services.generator,
            repairs: RepairCoordinator::new(services.repairer, policy.max_repair_attempts),
            renderer: RenderDriver::new(services.sandbox),
            capture: CaptureCoordinator::new(
                services.surface,
                CaptureOptions::from_settings(&settings),
            ),
            encoder: services.encoder,
            events: None,
            settings,
        }
    }

    /// Attach a channel that receives a [`PipelineEvent`] per state change.
    pub fn with_events(mut self, events: Sender<PipelineEvent>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    /// Where a run writes its GIF when the caller does not choose a path.
    pub fn default_output_path(&self, state_id: uuid::Uuid) -> PathBuf {
        self.settings
            .output_dir
            .join(format!("diagram-{}.gif", state_id.simple()))
    }

    /// Execute one run and return its final state.
    ///
    /// The returned state always carries a terminal outcome; failures are
    /// reported there rather than as an `Err`, together with every partial
    /// artifact produced before the failure.
    ///
    /// # Arguments
    ///
    /// * `raw_input` - Free text or diagram source
    /// * `kind_hint` - Classification known to the caller (file input is
    ///   always diagram source)
    /// * `output` - Path of the final GIF; defaults to a file in the
    ///   configured output directory
    pub async fn run(
        &self,
        raw_input: impl Into<String>,
        kind_hint: Option<InputKind>,
        output: Option<&Path>,
    ) -> RunState {
        let state = create_run(raw_input, kind_hint);
        let output = output
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.default_output_path(state.id));

        let span = info_span!("run", run_id = %state.id);
        self.drive(state, &output).instrument(span).await
    }

    async fn drive(&self, mut state: RunState, output: &Path) -> RunState {
        info!(kind_hint = ?state.kind_hint, output = %output.display(), "run started");
        self.emit(PipelineEvent::RunStarted {
            run_id: state.id,
            kind_hint: state.kind_hint,
        })
        .await;

        let mut stage = Stage::Routing;
        loop {
            state = record_stage(state, stage, StageStatus::Entered, None);
            if stage == Stage::Animating {
                state = record_animation_attempt(state);
            }
            let attempt = state.entries_of(stage);
            info!(stage = %stage, attempt, "stage entered");
            self.emit(PipelineEvent::StageEntered {
                run_id: state.id,
                stage,
                attempt,
            })
            .await;

            let result = self
                .execute(stage, state.clone(), output)
                .instrument(info_span!("stage", stage = %stage))
                .await;

            let decision = match result {
                Ok((next, note)) => {
                    info!(stage = %stage, note = note.as_deref().unwrap_or(""), "stage exited");
                    state = record_stage(next, stage, StageStatus::Exited, note.clone());
                    self.emit(PipelineEvent::StageExited {
                        run_id: state.id,
                        stage,
                        note,
                    })
                    .await;
                    next_stage(stage, &state, &self.policy)
                }
                Err(err) => {
                    let decision = after_failure(stage, &err, &state, &self.policy);
                    let recoverable = matches!(decision, Decision::Enter(_));
                    if recoverable {
                        warn!(stage = %stage, error = %err, "stage failed, retrying");
                    } else {
                        error!(stage = %stage, error = %err, "stage failed");
                    }
                    state = record_stage(state, stage, StageStatus::Failed, Some(err.to_string()));
                    self.emit(PipelineEvent::StageFailed {
                        run_id: state.id,
                        stage,
                        kind: err.kind(),
                        message: err.to_string(),
                        recoverable,
                    })
                    .await;

                    match decision {
                        Decision::Enter(next) => Decision::Enter(next),
                        _ => return self.fail(state, stage, err).await,
                    }
                }
            };

            match decision {
                Decision::Enter(next) => stage = next,
                Decision::Succeed => return self.succeed(state).await,
                Decision::RepairExhausted => {
                    let err = PipelineError::RepairExhausted {
                        attempts: state.repair_attempts,
                        history: state.finding_history.clone(),
                    };
                    return self.fail(state, stage, err).await;
                }
                Decision::StageBudgetExceeded => {
                    let err = PipelineError::Internal(anyhow!(
                        "stage budget of {} executions exhausted",
                        self.policy.max_stage_executions
                    ));
                    return self.fail(state, stage, err).await;
                }
                Decision::Stuck => {
                    let err = PipelineError::Internal(anyhow!("no transition out of {stage}"));
                    return self.fail(state, stage, err).await;
                }
            }
        }
    }

    async fn execute(
        &self,
        stage: Stage,
        state: RunState,
        output: &Path,
    ) -> stages::StageOutput {
        match stage {
            Stage::Routing => self.route(state),
            Stage::Generating => self.generate(state).await,
            Stage::Validating => self.validate(state),
            Stage::Repairing => self.repair(state).await,
            Stage::Rendering => self.render(state).await,
            Stage::Animating => self.animate(state),
            Stage::Capturing => self.capture(state).await,
            Stage::Transcoding => self.transcode(state, output).await,
            Stage::Succeeded | Stage::Failed => Err(PipelineError::Internal(anyhow!(
                "terminal stage {stage} cannot be executed"
            ))),
        }
    }

    async fn succeed(&self, state: RunState) -> RunState {
        let Some(output_path) = state.artifact(ArtifactKey::OutputPath).map(PathBuf::from) else {
            let err = PipelineError::Internal(anyhow!("run finished without an output path"));
            return self.fail(state, Stage::Transcoding, err).await;
        };

        info!(output = %output_path.display(), "run succeeded");
        self.seal(state, Stage::Succeeded, TerminalOutcome::Succeeded { output_path })
            .await
    }

    async fn fail(&self, state: RunState, stage: Stage, err: PipelineError) -> RunState {
        error!(stage = %stage, kind = %err.kind(), error = %err, "run failed");
        let outcome = TerminalOutcome::Failed {
            stage,
            kind: err.kind(),
            reason: err.to_string(),
            unresolved_findings: err.unresolved_findings(),
        };
        self.seal(state, Stage::Failed, outcome).await
    }

    async fn seal(&self, state: RunState, terminal: Stage, outcome: TerminalOutcome) -> RunState {
        let state = record_stage(state, terminal, StageStatus::Entered, None);
        let state = match finish(state.clone(), outcome.clone()) {
            Ok(sealed) => sealed,
            Err(e) => {
                error!(error = %e, "run outcome was already set");
                state
            }
        };

        self.emit(PipelineEvent::RunFinished {
            run_id: state.id,
            outcome: state.terminal_outcome.clone().unwrap_or(outcome),
        })
        .await;
        state
    }

    async fn emit(&self, event: PipelineEvent) {
        if let Some(tx) = &self.events {
            let _ = tx.send(event).await;
        }
    }
}
