//! Custom assertion helpers for pipeline tests.

use mg_protocol::ipc::PipelineEvent;
use mg_protocol::run_models::{FailureKind, RunState, Stage, TerminalOutcome};
use std::path::PathBuf;

/// Assert that the run succeeded and return its output path.
pub fn assert_succeeded(state: &RunState) -> PathBuf {
    match &state.terminal_outcome {
        Some(TerminalOutcome::Succeeded { output_path }) => output_path.clone(),
        other => panic!("expected success, got {other:?}\nhistory: {:#?}", state.history),
    }
}

/// Assert that the run failed at `stage` with `kind`.
pub fn assert_failed(state: &RunState, stage: Stage, kind: FailureKind) {
    match &state.terminal_outcome {
        Some(TerminalOutcome::Failed {
            stage: s, kind: k, ..
        }) => {
            assert_eq!(*s, stage, "failing stage");
            assert_eq!(*k, kind, "failure kind");
        }
        other => panic!("expected failure at {stage} ({kind}), got {other:?}"),
    }
}

/// Stages in the order they were entered, from the event stream.
pub fn entered_stages(events: &[PipelineEvent]) -> Vec<Stage> {
    events
        .iter()
        .filter_map(|e| match e {
            PipelineEvent::StageEntered { stage, .. } => Some(*stage),
            _ => None,
        })
        .collect()
}

/// Assert that events start with RunStarted, end with RunFinished and
/// belong to a single run.
pub fn assert_event_sequence(events: &[PipelineEvent]) {
    if events.is_empty() {
        panic!("Event sequence is empty");
    }

    assert!(
        matches!(events[0], PipelineEvent::RunStarted { .. }),
        "First event should be RunStarted, got: {:?}",
        events[0]
    );

    let last = &events[events.len() - 1];
    assert!(
        matches!(last, PipelineEvent::RunFinished { .. }),
        "Last event should be RunFinished, got: {last:?}"
    );

    let run_id = events[0].run_id();
    assert!(
        events.iter().all(|e| e.run_id() == run_id),
        "events from more than one run"
    );
}
