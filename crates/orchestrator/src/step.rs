//! The two-operation step abstraction.

use serde::{Deserialize, Serialize};

use crate::context::SagaContext;
use crate::error::CompensationError;

/// Result of a step's forward action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StepOutcome {
    /// The forward action took effect.
    Succeeded,
    /// The forward action was rejected; the saga must unwind.
    Failed,
}

impl StepOutcome {
    /// Returns true for [`StepOutcome::Succeeded`].
    pub fn is_success(&self) -> bool {
        matches!(self, StepOutcome::Succeeded)
    }
}

impl From<bool> for StepOutcome {
    fn from(success: bool) -> Self {
        if success {
            StepOutcome::Succeeded
        } else {
            StepOutcome::Failed
        }
    }
}

/// One participant's forward action paired with its undo.
///
/// Steps hold no per-run state; everything a run needs lives in the
/// context. A failed forward action is reported through [`StepOutcome`],
/// never through a panic or error.
pub trait SagaStep<P>: Send + Sync {
    /// Stable step name used in logs, observations and run reports.
    fn name(&self) -> &'static str;

    /// Runs the forward action.
    fn execute(&self, context: &mut SagaContext<P>) -> StepOutcome;

    /// Undoes a forward action that succeeded earlier in the same run.
    fn compensate(&self, context: &mut SagaContext<P>) -> Result<(), CompensationError>;
}

impl<P, T: SagaStep<P> + ?Sized> SagaStep<P> for Box<T> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn execute(&self, context: &mut SagaContext<P>) -> StepOutcome {
        (**self).execute(context)
    }

    fn compensate(&self, context: &mut SagaContext<P>) -> Result<(), CompensationError> {
        (**self).compensate(context)
    }
}
