//! Update orchestration for hostenv
//!
//! An update runs in four steps:
//! 1. Planning - classify the change set, fail fast on fields that cannot change
//! 2. Quiescing - if a destructive field changed, disable dependent VDBs and dSources
//! 3. Executing - run each update batch, collecting failures without stopping
//! 4. Compensating - re-enable whatever step 2 disabled, whatever step 3 did

pub mod compensation;
pub mod error;
pub mod executor;
pub mod planner;
pub mod quiescer;

use declarative::{ChangeSet, FieldCapabilityTable};
use dctkit::backend::Backend;
use dctkit::{Job, JobOutcome, JobPoller};

use crate::resource::capabilities::environment_capabilities;
use compensation::{CompensationController, CompensationState};
use error::{Failure, UpdateError};
use executor::{UpdateExecutor, UpdateRequest};
use planner::{BatchKind, UpdatePlan};
use quiescer::DependencyQuiescer;

/// Wait for `job` and turn a failure status into a [`Failure`].
///
/// A job whose status cannot be observed is logged and treated as done.
pub(crate) fn await_job(jobs: &JobPoller<'_>, job: &Job, step: &str) -> Result<(), Failure> {
    match jobs.poll(&job.id) {
        JobOutcome::Terminal(done) if done.status.is_failure() => {
            let mut message = format!("job {} ended {}", done.id, done.status);
            if let Some(details) = &done.error_details {
                message.push_str(": ");
                message.push_str(details);
            }
            Err(Failure::new(step, message))
        }
        JobOutcome::Terminal(_) => Ok(()),
        JobOutcome::Unobserved { job_id, error } => {
            log::warn!("{step}: could not observe job {job_id} ({error}), assuming it finished");
            Ok(())
        }
    }
}

/// Result of one update attempt
#[derive(Debug)]
pub struct UpdateOutcome {
    /// `None` when the change set failed validation
    pub plan: Option<UpdatePlan>,
    /// Batches that finished without error
    pub succeeded: Vec<BatchKind>,
    /// User reference resolved by the credentials batch
    pub user_ref: Option<String>,
    pub compensation: CompensationState,
    pub error: Option<UpdateError>,
}

impl UpdateOutcome {
    fn rejected(error: UpdateError) -> Self {
        Self {
            plan: None,
            succeeded: Vec::new(),
            user_ref: None,
            compensation: CompensationState::None,
            error: Some(error),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

pub struct Engine<'a> {
    backend: &'a dyn Backend,
    jobs: &'a JobPoller<'a>,
    table: FieldCapabilityTable,
}

impl<'a> Engine<'a> {
    pub fn new(backend: &'a dyn Backend, jobs: &'a JobPoller<'a>) -> Self {
        Self {
            backend,
            jobs,
            table: environment_capabilities(),
        }
    }

    /// Classify a change set without touching the remote side.
    pub fn plan(&self, changes: &ChangeSet) -> Result<UpdatePlan, UpdateError> {
        Ok(UpdatePlan::build(changes, &self.table)?)
    }

    /// Apply a change set to an existing environment.
    ///
    /// Never stops at the first failed batch. The returned error lists every
    /// failure; a compensation failure takes precedence over batch failures
    /// because it leaves dependents disabled.
    pub fn update(&self, request: &UpdateRequest<'_>) -> UpdateOutcome {
        let plan = match self.plan(request.changes) {
            Ok(plan) => plan,
            Err(e) => {
                log::error!("Rejected update of {}: {e}", request.environment_id);
                return UpdateOutcome::rejected(e);
            }
        };

        let mut outcome = UpdateOutcome {
            plan: None,
            succeeded: Vec::new(),
            user_ref: None,
            compensation: CompensationState::None,
            error: None,
        };

        if plan.is_empty() {
            log::info!("Environment {} is up to date", request.environment_id);
            outcome.plan = Some(plan);
            return outcome;
        }

        let quiescer = DependencyQuiescer::new(self.backend, self.jobs);
        let mut controller = CompensationController::new(&quiescer);

        if plan.destructive {
            log::info!(
                "Destructive change ({}), quiescing dependents of {}",
                plan.destructive_fields.join(", "),
                request.environment_id
            );
            if let Err(e) = controller.quiesce(request.environment_id) {
                log::error!("{e}");
                outcome.error = Some(e);
                outcome.plan = Some(plan);
                return outcome;
            }
        }

        let batches = UpdateExecutor::new(self.backend, self.jobs).execute(request, &plan);
        let compensation_failures = controller.compensate();

        outcome.plan = Some(plan);
        outcome.succeeded = batches.succeeded;
        outcome.user_ref = batches.user_ref;
        outcome.compensation = controller.state();
        outcome.error = if !compensation_failures.is_empty() {
            Some(UpdateError::Compensation {
                failures: compensation_failures,
                batch_failures: batches.failures,
            })
        } else if !batches.failures.is_empty() {
            Some(UpdateError::BatchExecution {
                failures: batches.failures,
            })
        } else {
            None
        };
        outcome
    }
}

// ============================================================================
// Test fixtures
// ============================================================================
