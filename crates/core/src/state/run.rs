//! Run state transitions.
//!
//! Every function here consumes a [`RunState`] and returns the next one.
//! Nothing mutates a state that a caller still holds, so the orchestrator
//! can re-enter the repair loop without stale fields leaking between
//! attempts. Write-once fields are enforced here and violations surface as
//! [`StateError`].

use chrono::Utc;
use mg_protocol::finding_models::Finding;
use mg_protocol::run_models::{
    AnimationManifest, ArtifactKey, InputKind, RunState, Stage, StageRecord, StageStatus,
    TerminalOutcome, ValidationStatus,
};
use std::collections::BTreeMap;
use thiserror::Error;
use uuid::Uuid;

/// Violations of the run-state write rules.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StateError {
    #[error("input kind is already set")]
    InputKindAlreadySet,
    #[error("animation manifest is already set")]
    ManifestAlreadySet,
    #[error("artifact `{0}` was already written")]
    ArtifactAlreadyWritten(ArtifactKey),
    #[error("terminal outcome is already set")]
    OutcomeAlreadySet,
    #[error("run state has no {0}")]
    Missing(&'static str),
}

pub type StateResult<T> = Result<T, StateError>;

/// Create a new RunState with defaults.
///
/// # Arguments
///
/// * `raw_input` - The user's text or diagram source, stored verbatim
/// * `kind_hint` - Classification known to the caller, if any
pub fn create_run(raw_input: impl Into<String>, kind_hint: Option<InputKind>) -> RunState {
    RunState {
        id: Uuid::new_v4(),
        started_at: Utc::now(),
        raw_input: raw_input.into(),
        kind_hint,
        input_kind: None,
        diagram_source: None,
        validation: ValidationStatus::Pending,
        validation_errors: Vec::new(),
        finding_history: Vec::new(),
        repair_attempts: 0,
        animation_attempts: 0,
        animation_spec: None,
        artifacts: BTreeMap::new(),
        history: Vec::new(),
        terminal_outcome: None,
    }
}

/// Write the router's classification.
pub fn set_input_kind(state: RunState, kind: InputKind) -> StateResult<RunState> {
    if state.input_kind.is_some() {
        return Err(StateError::InputKindAlreadySet);
    }
    Ok(RunState {
        input_kind: Some(kind),
        ..state
    })
}

/// Replace the candidate diagram source.
///
/// The new text has not been validated yet, so validation status and
/// findings are reset.
pub fn set_diagram_source(state: RunState, source: impl Into<String>) -> RunState {
    RunState {
        diagram_source: Some(source.into()),
        validation: ValidationStatus::Pending,
        validation_errors: Vec::new(),
        ..state
    }
}

/// Write the animation manifest. Only one stage may do this per run.
pub fn set_animation_spec(state: RunState, manifest: AnimationManifest) -> StateResult<RunState> {
    if state.animation_spec.is_some() {
        return Err(StateError::ManifestAlreadySet);
    }
    Ok(RunState {
        animation_spec: Some(manifest),
        ..state
    })
}

/// Store the findings of one validation pass over the current source.
pub fn record_validation(state: RunState, findings: Vec<Finding>) -> RunState {
    let mut finding_history = state.finding_history.clone();
    let validation = if findings.is_empty() {
        ValidationStatus::Clean
    } else {
        finding_history.push(findings.clone());
        ValidationStatus::Invalid
    };

    RunState {
        validation,
        validation_errors: findings,
        finding_history,
        ..state
    }
}

/// Install a repaired source and count the attempt.
pub fn record_repair(state: RunState, repaired: impl Into<String>) -> RunState {
    let repair_attempts = state.repair_attempts + 1;
    set_diagram_source(
        RunState {
            repair_attempts,
            ..state
        },
        repaired,
    )
}

/// Count one motion-injection pass.
pub fn record_animation_attempt(state: RunState) -> RunState {
    RunState {
        animation_attempts: state.animation_attempts + 1,
        ..state
    }
}

/// Write a stage artifact. Each key may be written exactly once.
pub fn put_artifact(
    state: RunState,
    key: ArtifactKey,
    value: impl Into<String>,
) -> StateResult<RunState> {
    if state.artifacts.contains_key(&key) {
        return Err(StateError::ArtifactAlreadyWritten(key));
    }
    let mut artifacts = state.artifacts.clone();
    artifacts.insert(key, value.into());
    Ok(RunState { artifacts, ..state })
}

/// Read a required artifact written by an upstream stage.
pub fn require_artifact(state: &RunState, key: ArtifactKey) -> StateResult<&str> {
    state.artifact(key).ok_or(StateError::Missing(match key {
        ArtifactKey::VectorDocument => "vector document",
        ArtifactKey::AnnotatedDocument => "annotated document",
        ArtifactKey::VideoPath => "video path",
        ArtifactKey::OutputPath => "output path",
    }))
}

/// Append an audit-trail record.
pub fn record_stage(
    state: RunState,
    stage: Stage,
    status: StageStatus,
    note: Option<String>,
) -> RunState {
    let mut history = state.history.clone();
    history.push(StageRecord {
        stage,
        status,
        at: Utc::now(),
        note,
    });
    RunState { history, ..state }
}

/// Seal the run with its terminal outcome.
pub fn finish(state: RunState, outcome: TerminalOutcome) -> StateResult<RunState> {
    if state.terminal_outcome.is_some() {
        return Err(StateError::OutcomeAlreadySet);
    }
    Ok(RunState {
        terminal_outcome: Some(outcome),
        ..state
    })
}
