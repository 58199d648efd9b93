//! Orchestrator error types.

use thiserror::Error;

/// A compensating action could not undo its step.
///
/// The orchestrator keeps compensating the remaining steps and records the
/// failure as a dead letter for manual follow-up.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Compensation step '{step}' failed: {reason}")]
pub struct CompensationError {
    pub step: &'static str,
    pub reason: String,
}

impl CompensationError {
    pub fn new(step: &'static str, reason: impl Into<String>) -> Self {
        Self {
            step,
            reason: reason.into(),
        }
    }
}
