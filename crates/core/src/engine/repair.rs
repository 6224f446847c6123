//! Bounded repair loop.
//!
//! The coordinator only ever sends the current source and its numbered
//! findings to the repair service; it never regenerates from the original
//! intent. The attempt bound lives in [`decide`], which the orchestrator's
//! transition function consults after every validation pass.

use super::error::PipelineError;
use crate::agents::DiagramRepairer;
use crate::state::run::{record_repair, StateError};
use mg_protocol::run_models::{RunState, ValidationStatus};
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepairDecision {
    /// Budget remains; run another repair.
    Repair,
    /// Budget spent; the run fails with `RepairExhausted`.
    Exhausted,
}

/// Decides whether another repair may run after `attempts` repairs.
pub fn decide(attempts: u32, max_attempts: u32) -> RepairDecision {
    if attempts < max_attempts {
        RepairDecision::Repair
    } else {
        RepairDecision::Exhausted
    }
}

#[derive(Clone)]
pub struct RepairCoordinator {
    repairer: Arc<dyn DiagramRepairer>,
    max_attempts: u32,
}

impl RepairCoordinator {
    pub fn new(repairer: Arc<dyn DiagramRepairer>, max_attempts: u32) -> Self {
        Self {
            repairer,
            max_attempts,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn decision(&self, state: &RunState) -> RepairDecision {
        decide(state.repair_attempts, self.max_attempts)
    }

    /// Runs one repair attempt on an invalid source.
    ///
    /// # Errors
    ///
    /// `RepairExhausted` when called with no budget left, `Repair` when the
    /// service fails.
    pub async fn repair(&self, state: RunState) -> Result<RunState, PipelineError> {
        if self.decision(&state) == RepairDecision::Exhausted {
            return Err(PipelineError::RepairExhausted {
                attempts: state.repair_attempts,
                history: state.finding_history,
            });
        }
        if state.validation != ValidationStatus::Invalid {
            return Err(StateError::Missing("findings to repair").into());
        }
        let source = state
            .diagram_source
            .as_deref()
            .ok_or(StateError::Missing("diagram source"))?;

        debug!(
            attempt = state.repair_attempts + 1,
            max_attempts = self.max_attempts,
            findings = state.validation_errors.len(),
            "requesting repair"
        );
        let repaired = self
            .repairer
            .repair(source, &state.validation_errors)
            .await
            .map_err(PipelineError::Repair)?;

        let state = record_repair(state, repaired);
        info!(attempt = state.repair_attempts, "repair applied");
        Ok(state)
    }
}
