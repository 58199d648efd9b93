//! Saga orchestrator: runs a fixed plan and unwinds it on failure.

use std::sync::Arc;

use common::{ObservationKind, SagaObservation, SagaObserver, TracingObserver};
use serde::Serialize;

use crate::context::SagaContext;
use crate::step::SagaStep;

/// Where a run is in the plan.
///
/// ```text
/// Running(0) ──► Running(1) ──► … ──► Running(n) ──► Succeeded
///     │              │                    │
///     └──────────────┴────────────────────┴──► Failed(index) ──► compensate
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RunState {
    /// The step at this index is next.
    Running(usize),
    /// Every step succeeded.
    Succeeded,
    /// The step at this index failed; completed steps were compensated.
    Failed(usize),
}

/// A compensation that did not go through and needs manual intervention.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeadLetter {
    pub step: &'static str,
    pub reason: String,
}

/// Report of one saga run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SagaRun {
    /// Final state: `Succeeded` or `Failed`.
    pub state: RunState,
    /// Steps whose forward action succeeded, in execution order.
    pub executed: Vec<&'static str>,
    /// The step that failed, if any.
    pub failed_step: Option<&'static str>,
    /// Steps whose compensation was invoked, in invocation order.
    pub compensated: Vec<&'static str>,
    /// Compensations that reported an error.
    pub dead_letters: Vec<DeadLetter>,
}

impl SagaRun {
    /// Returns true if every step in the plan succeeded.
    pub fn succeeded(&self) -> bool {
        self.state == RunState::Succeeded
    }
}

/// Runs an ordered plan of steps against a saga context.
///
/// The plan is fixed at construction. Each run keeps its own ledger of
/// executed steps, so one orchestrator can drive many contexts one after
/// another.
pub struct Orchestrator<S> {
    plan: Vec<S>,
    observer: Arc<dyn SagaObserver>,
}

impl<S> Orchestrator<S> {
    /// Creates an orchestrator that reports transitions through `tracing`.
    pub fn new(plan: Vec<S>) -> Self {
        Self {
            plan,
            observer: Arc::new(TracingObserver),
        }
    }

    /// Replaces the observer that receives every transition.
    pub fn with_observer(mut self, observer: Arc<dyn SagaObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Returns the plan.
    pub fn plan(&self) -> &[S] {
        &self.plan
    }

    /// Runs the saga. Returns true iff every step succeeded.
    ///
    /// On the first failing step, every step that succeeded earlier is
    /// compensated in reverse order before this returns false. Afterwards
    /// the context's status reflects only the last transition made.
    pub fn execute<P>(&self, context: &mut SagaContext<P>) -> bool
    where
        S: SagaStep<P>,
    {
        self.run(context).succeeded()
    }

    /// Runs the saga and returns the full report.
    #[tracing::instrument(skip_all, fields(saga_id = %context.id(), steps = self.plan.len()))]
    pub fn run<P>(&self, context: &mut SagaContext<P>) -> SagaRun
    where
        S: SagaStep<P>,
    {
        metrics::counter!("saga_executions_total", "topology" => "orchestration").increment(1);
        let saga_start = std::time::Instant::now();

        let mut ledger: Vec<usize> = Vec::with_capacity(self.plan.len());
        let mut state = RunState::Running(0);

        while let RunState::Running(index) = state {
            let Some(step) = self.plan.get(index) else {
                state = RunState::Succeeded;
                break;
            };

            tracing::info!(step = step.name(), index, "saga step started");
            self.observe(context, step.name(), ObservationKind::StepAttempted);

            if step.execute(context).is_success() {
                ledger.push(index);
                self.observe(context, step.name(), ObservationKind::StepSucceeded);
                state = RunState::Running(index + 1);
            } else {
                tracing::warn!(step = step.name(), index, "saga step failed");
                self.observe(context, step.name(), ObservationKind::StepFailed);
                state = RunState::Failed(index);
            }
        }

        let executed = ledger.iter().map(|&i| self.plan[i].name()).collect();
        let mut report = SagaRun {
            state,
            executed,
            failed_step: None,
            compensated: Vec::new(),
            dead_letters: Vec::new(),
        };

        if let RunState::Failed(index) = state {
            report.failed_step = Some(self.plan[index].name());
            self.compensate(&ledger, context, &mut report);
            self.observe_saga(context, ObservationKind::SagaFailed);
            metrics::counter!("saga_failed", "topology" => "orchestration").increment(1);
            tracing::warn!(
                saga_id = %context.id(),
                reason = ?report.failed_step,
                compensated = report.compensated.len(),
                "saga failed"
            );
        } else {
            self.observe_saga(context, ObservationKind::SagaSucceeded);
            metrics::counter!("saga_completed", "topology" => "orchestration").increment(1);
            tracing::info!(saga_id = %context.id(), "saga completed successfully");
        }

        metrics::histogram!("saga_duration_seconds").record(saga_start.elapsed().as_secs_f64());
        report
    }

    /// Walks the ledger backwards, compensating each executed step once.
    ///
    /// Compensation never stops early: a failing compensation is recorded
    /// as a dead letter and the remaining steps are still compensated.
    fn compensate<P>(&self, ledger: &[usize], context: &mut SagaContext<P>, report: &mut SagaRun)
    where
        S: SagaStep<P>,
    {
        for &index in ledger.iter().rev() {
            let step = &self.plan[index];
            let name = step.name();
            metrics::counter!("saga_compensations_total", "stage" => name).increment(1);

            let result = step.compensate(context);
            report.compensated.push(name);
            self.observe(context, name, ObservationKind::CompensationInvoked);

            if let Err(e) = result {
                tracing::error!(
                    step = name,
                    error = %e,
                    "compensation failed, recorded as dead letter"
                );
                self.observe(
                    context,
                    name,
                    ObservationKind::CompensationFailed {
                        reason: e.reason.clone(),
                    },
                );
                report.dead_letters.push(DeadLetter {
                    step: name,
                    reason: e.reason,
                });
            }
        }
    }

    fn observe<P>(&self, context: &SagaContext<P>, stage: &'static str, kind: ObservationKind) {
        self.observer
            .observe(&SagaObservation::new(context.id(), stage, kind));
    }

    fn observe_saga<P>(&self, context: &SagaContext<P>, kind: ObservationKind) {
        self.observe(context, "saga", kind);
    }
}
