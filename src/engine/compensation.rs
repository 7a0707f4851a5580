//! Compensation - put dependents back the way the update found them

use super::error::{Failure, UpdateError};
use super::quiescer::{DependencyQuiescer, Quiesced};

/// Where the controller is in the quiesce/restore cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompensationState {
    /// Nothing was quiesced, nothing to restore
    None,
    /// Dependents are disabled and must be re-enabled
    Pending,
    /// Re-enabling is under way
    Triggered,
    /// Every dependent was re-enabled
    Completed,
    /// At least one re-enable failed
    Failed,
}

impl CompensationState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Pending => "pending",
            Self::Triggered => "triggered",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

/// Owns the set of dependents an update disabled.
///
/// [`quiesce`](Self::quiesce) records what was disabled;
/// [`compensate`](Self::compensate) re-enables all of it, attempting every
/// dependent even after a failure.
pub struct CompensationController<'a> {
    quiescer: &'a DependencyQuiescer<'a>,
    quiesced: Quiesced,
    state: CompensationState,
}

impl<'a> CompensationController<'a> {
    pub fn new(quiescer: &'a DependencyQuiescer<'a>) -> Self {
        Self {
            quiescer,
            quiesced: Quiesced::default(),
            state: CompensationState::None,
        }
    }

    pub fn state(&self) -> CompensationState {
        self.state
    }

    pub fn quiesced(&self) -> &Quiesced {
        &self.quiesced
    }

    /// Disable every dependent of the environment.
    ///
    /// On failure the quiescer has already restored what it disabled, so
    /// the controller stays in [`CompensationState::None`].
    pub fn quiesce(&mut self, environment_id: &str) -> Result<(), UpdateError> {
        self.quiesced = self.quiescer.disable_all(environment_id)?;
        if !self.quiesced.is_empty() {
            log::info!(
                "Disabled {} vdb(s) and {} dsource(s) on {environment_id}",
                self.quiesced.vdbs.len(),
                self.quiesced.dsources.len()
            );
            self.state = CompensationState::Pending;
        }
        Ok(())
    }

    /// Re-enable what [`quiesce`](Self::quiesce) disabled.
    ///
    /// Returns every re-enable failure. Calling it again after it ran is a
    /// no-op.
    pub fn compensate(&mut self) -> Vec<Failure> {
        if self.state != CompensationState::Pending {
            return Vec::new();
        }

        self.state = CompensationState::Triggered;
        let failures = self.quiescer.enable_all(&self.quiesced);
        self.state = if failures.is_empty() {
            CompensationState::Completed
        } else {
            log::error!(
                "{} dependent(s) could not be re-enabled and remain disabled",
                failures.len()
            );
            CompensationState::Failed
        };
        failures
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::fixtures::{add_dependents, dependent_calls, immediate, mock_environment};
    use dctkit::JobStatus;
    use dctkit::backend::{Call, Fault, Op};

    #[test]
    fn test_nothing_quiesced() {
        let mock = mock_environment();
        let jobs = immediate(&mock);
        let quiescer = DependencyQuiescer::new(&mock, &jobs);
        let mut controller = CompensationController::new(&quiescer);

        controller.quiesce("E1").unwrap();
        assert_eq!(controller.state(), CompensationState::None);
        assert!(controller.compensate().is_empty());
        assert_eq!(controller.state(), CompensationState::None);
    }

    #[test]
    fn test_compensate_restores_and_completes() {
        let mock = mock_environment();
        add_dependents(&mock, &["V1"], &["D1"]);
        let jobs = immediate(&mock);
        let quiescer = DependencyQuiescer::new(&mock, &jobs);
        let mut controller = CompensationController::new(&quiescer);

        controller.quiesce("E1").unwrap();
        assert_eq!(controller.state(), CompensationState::Pending);
        assert_eq!(controller.quiesced().vdbs, vec!["V1"]);

        assert!(controller.compensate().is_empty());
        assert_eq!(controller.state(), CompensationState::Completed);
        assert!(mock.vdb("V1").unwrap().enabled);
        assert!(mock.dsource("D1").unwrap().enabled);

        // second call does nothing
        mock.clear_calls();
        assert!(controller.compensate().is_empty());
        assert!(dependent_calls(&mock).is_empty());
    }

    #[test]
    fn test_compensate_attempts_all_after_failure() {
        let mock = mock_environment();
        add_dependents(&mock, &["V1", "V2"], &["D1"]);
        let jobs = immediate(&mock);
        let quiescer = DependencyQuiescer::new(&mock, &jobs);
        let mut controller = CompensationController::new(&quiescer);
        controller.quiesce("E1").unwrap();

        mock.fail(Op::EnableDSource, Some("D1"), Fault::Job(JobStatus::Abandoned));
        mock.clear_calls();
        let failures = controller.compensate();

        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].step, "enable dsource D1");
        assert_eq!(controller.state(), CompensationState::Failed);
        assert_eq!(
            dependent_calls(&mock),
            vec![
                Call::EnableDSource("D1".to_string()),
                Call::EnableVdb("V1".to_string()),
                Call::EnableVdb("V2".to_string()),
            ]
        );
    }

    #[test]
    fn test_state_names() {
        assert_eq!(CompensationState::Pending.as_str(), "pending");
        assert_eq!(CompensationState::Failed.as_str(), "failed");
    }
}
