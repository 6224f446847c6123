//! Pure transition decisions of the orchestrator.
//!
//! Nothing here performs I/O: given the stage that just ran, the run state
//! it produced and the policy, the functions name what happens next. The
//! engine loop only executes the decision.

use super::error::PipelineError;
use super::repair::{decide, RepairDecision};
use mg_protocol::config_models::Settings;
use mg_protocol::run_models::{InputKind, RunState, Stage, StageStatus, ValidationStatus};

/// Motion injection gets the first pass plus one retry.
pub const MAX_ANIMATION_ATTEMPTS: u32 = 2;

/// Retry bounds applied by the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Policy {
    pub max_repair_attempts: u32,
    pub max_animation_attempts: u32,
    /// Hard cap on stage executions per run.
    pub max_stage_executions: usize,
}

impl Policy {
    pub fn new(max_repair_attempts: u32) -> Self {
        Self {
            max_repair_attempts,
            max_animation_attempts: MAX_ANIMATION_ATTEMPTS,
            max_stage_executions: stage_budget(max_repair_attempts, MAX_ANIMATION_ATTEMPTS),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.max_repair_attempts)
    }
}

/// Executions in the longest legitimate run: routing, generating,
/// `repairs + 1` validations, `repairs` repairs, rendering, every
/// animation attempt, capturing and transcoding.
pub fn stage_budget(max_repair_attempts: u32, max_animation_attempts: u32) -> usize {
    let repairs = max_repair_attempts as usize;
    2 + (repairs + 1) + repairs + 1 + max_animation_attempts as usize + 2
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Enter(Stage),
    Succeed,
    /// Findings remain and the repair budget is spent.
    RepairExhausted,
    /// The run would exceed the stage execution cap.
    StageBudgetExceeded,
    /// The run state does not allow any transition.
    Stuck,
}

fn stage_executions(state: &RunState) -> usize {
    state
        .history
        .iter()
        .filter(|r| r.status == StageStatus::Entered)
        .count()
}

fn enter(stage: Stage, state: &RunState, policy: &Policy) -> Decision {
    if stage_executions(state) >= policy.max_stage_executions {
        Decision::StageBudgetExceeded
    } else {
        Decision::Enter(stage)
    }
}

/// What follows a successful execution of `completed`.
pub fn next_stage(completed: Stage, state: &RunState, policy: &Policy) -> Decision {
    match completed {
        Stage::Routing => match state.input_kind {
            Some(InputKind::NaturalLanguage) => enter(Stage::Generating, state, policy),
            Some(InputKind::DiagramSource) => enter(Stage::Validating, state, policy),
            None => Decision::Stuck,
        },
        Stage::Generating | Stage::Repairing => enter(Stage::Validating, state, policy),
        Stage::Validating => match state.validation {
            ValidationStatus::Clean => enter(Stage::Rendering, state, policy),
            ValidationStatus::Invalid => {
                match decide(state.repair_attempts, policy.max_repair_attempts) {
                    RepairDecision::Repair => enter(Stage::Repairing, state, policy),
                    RepairDecision::Exhausted => Decision::RepairExhausted,
                }
            }
            ValidationStatus::Pending => Decision::Stuck,
        },
        Stage::Rendering => enter(Stage::Animating, state, policy),
        Stage::Animating => enter(Stage::Capturing, state, policy),
        Stage::Capturing => enter(Stage::Transcoding, state, policy),
        Stage::Transcoding => Decision::Succeed,
        Stage::Succeeded | Stage::Failed => Decision::Stuck,
    }
}

/// What follows `failed` raising `error`. Anything but a retry ends the run
/// with that error.
pub fn after_failure(
    failed: Stage,
    error: &PipelineError,
    state: &RunState,
    policy: &Policy,
) -> Decision {
    if !error.is_recoverable() {
        return Decision::Stuck;
    }
    match (failed, error) {
        (Stage::Animating, PipelineError::AnimationMissing(_))
            if state.animation_attempts < policy.max_animation_attempts =>
        {
            enter(Stage::Animating, state, policy)
        }
        // Findings reaching a later stage mean the repair loop was bypassed.
        _ => Decision::Stuck,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::motion::MotionError;
    use crate::render::RenderError;
    use crate::state::run::{create_run, record_stage};

    fn policy() -> Policy {
        Policy::new(2)
    }

    fn state_with(f: impl FnOnce(RunState) -> RunState) -> RunState {
        f(create_run("input", None))
    }

    #[test]
    fn test_routing_branches_on_input_kind() {
        let diagram = state_with(|s| RunState {
            input_kind: Some(InputKind::DiagramSource),
            ..s
        });
        assert_eq!(
            next_stage(Stage::Routing, &diagram, &policy()),
            Decision::Enter(Stage::Validating)
        );

        let prose = state_with(|s| RunState {
            input_kind: Some(InputKind::NaturalLanguage),
            ..s
        });
        assert_eq!(
            next_stage(Stage::Routing, &prose, &policy()),
            Decision::Enter(Stage::Generating)
        );

        let unrouted = create_run("input", None);
        assert_eq!(
            next_stage(Stage::Routing, &unrouted, &policy()),
            Decision::Stuck
        );
    }

    #[test]
    fn test_validation_gates_repair_and_render() {
        let clean = state_with(|s| RunState {
            validation: ValidationStatus::Clean,
            ..s
        });
        assert_eq!(
            next_stage(Stage::Validating, &clean, &policy()),
            Decision::Enter(Stage::Rendering)
        );

        let invalid = state_with(|s| RunState {
            validation: ValidationStatus::Invalid,
            repair_attempts: 1,
            ..s
        });
        assert_eq!(
            next_stage(Stage::Validating, &invalid, &policy()),
            Decision::Enter(Stage::Repairing)
        );

        let exhausted = RunState {
            repair_attempts: 2,
            ..invalid
        };
        assert_eq!(
            next_stage(Stage::Validating, &exhausted, &policy()),
            Decision::RepairExhausted
        );
    }

    #[test]
    fn test_repair_always_returns_to_validation() {
        let state = create_run("input", None);
        assert_eq!(
            next_stage(Stage::Repairing, &state, &policy()),
            Decision::Enter(Stage::Validating)
        );
    }

    #[test]
    fn test_linear_tail() {
        let state = create_run("input", None);
        assert_eq!(
            next_stage(Stage::Rendering, &state, &policy()),
            Decision::Enter(Stage::Animating)
        );
        assert_eq!(
            next_stage(Stage::Animating, &state, &policy()),
            Decision::Enter(Stage::Capturing)
        );
        assert_eq!(
            next_stage(Stage::Capturing, &state, &policy()),
            Decision::Enter(Stage::Transcoding)
        );
        assert_eq!(
            next_stage(Stage::Transcoding, &state, &policy()),
            Decision::Succeed
        );
        assert_eq!(
            next_stage(Stage::Failed, &state, &policy()),
            Decision::Stuck
        );
    }

    #[test]
    fn test_animation_missing_retries_once() {
        let err = PipelineError::AnimationMissing(MotionError::NoConnectors);

        let first = state_with(|s| RunState {
            animation_attempts: 1,
            ..s
        });
        assert_eq!(
            after_failure(Stage::Animating, &err, &first, &policy()),
            Decision::Enter(Stage::Animating)
        );

        let second = RunState {
            animation_attempts: 2,
            ..first
        };
        assert_eq!(
            after_failure(Stage::Animating, &err, &second, &policy()),
            Decision::Stuck
        );
    }

    #[test]
    fn test_other_failures_are_terminal() {
        let state = create_run("input", None);
        let err = PipelineError::Render(RenderError::EmptyDocument);
        assert_eq!(
            after_failure(Stage::Rendering, &err, &state, &policy()),
            Decision::Stuck
        );
    }

    #[test]
    fn test_recoverable_error_outside_its_stage_is_terminal() {
        let state = create_run("input", None);
        let findings = PipelineError::Validation(Vec::new());
        assert!(findings.is_recoverable());
        assert_eq!(
            after_failure(Stage::Rendering, &findings, &state, &policy()),
            Decision::Stuck
        );

        let missing = PipelineError::AnimationMissing(MotionError::NoConnectors);
        assert_eq!(
            after_failure(Stage::Capturing, &missing, &state, &policy()),
            Decision::Stuck
        );
    }

    #[test]
    fn test_stage_budget_caps_executions() {
        let tight = Policy {
            max_stage_executions: 2,
            ..policy()
        };
        let mut state = create_run("input", None);
        state = record_stage(state, Stage::Routing, StageStatus::Entered, None);
        state = record_stage(state, Stage::Routing, StageStatus::Exited, None);
        state = record_stage(state, Stage::Validating, StageStatus::Entered, None);
        state = RunState {
            validation: ValidationStatus::Clean,
            ..state
        };

        assert_eq!(
            next_stage(Stage::Validating, &state, &tight),
            Decision::StageBudgetExceeded
        );
        assert_eq!(
            next_stage(Stage::Transcoding, &state, &tight),
            Decision::Succeed
        );
    }

    #[test]
    fn test_stage_budget_covers_longest_run() {
        // routing, generating, 4 validations, 3 repairs, rendering,
        // 2 animations, capturing, transcoding
        assert_eq!(stage_budget(3, 2), 14);
        assert_eq!(Policy::new(3).max_stage_executions, 14);
    }
}
