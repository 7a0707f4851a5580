//! Update error taxonomy

use declarative::ValidationError;
use std::fmt;

/// One failed step, with enough context to act on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    /// What was being done, e.g. `disable vdb V1` or `identity batch`
    pub step: String,
    /// What went wrong
    pub message: String,
}

impl Failure {
    pub fn new(step: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            step: step.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.step, self.message)
    }
}

fn list(failures: &[Failure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Why an update did not fully apply.
///
/// Only `Validation` guarantees nothing was sent to the remote side. The
/// other variants may leave some batches applied.
#[derive(Debug, thiserror::Error)]
pub enum UpdateError {
    /// A changed field cannot be updated; no remote call was made
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Dependents could not be quiesced; no batch ran
    #[error("failed to quiesce dependents: {}{}", list(.failures), compensation_suffix(.compensation))]
    DependencyQuiesce {
        failures: Vec<Failure>,
        /// Re-enables that also failed while backing out
        compensation: Vec<Failure>,
    },

    /// One or more batches failed
    #[error("{} update batch(es) failed: {}", .failures.len(), list(.failures))]
    BatchExecution { failures: Vec<Failure> },

    /// Dependents could not be re-enabled after the update attempt
    #[error("failed to re-enable dependents: {}{}", list(.failures), batch_suffix(.batch_failures))]
    Compensation {
        failures: Vec<Failure>,
        /// Batch failures from the same update
        batch_failures: Vec<Failure>,
    },
}

fn compensation_suffix(failures: &[Failure]) -> String {
    if failures.is_empty() {
        String::new()
    } else {
        format!("; re-enable also failed: {}", list(failures))
    }
}

fn batch_suffix(failures: &[Failure]) -> String {
    if failures.is_empty() {
        String::new()
    } else {
        format!("; update batches also failed: {}", list(failures))
    }
}

impl UpdateError {
    /// Whether dependents may have been left disabled
    pub fn leaves_dependents_disabled(&self) -> bool {
        match self {
            UpdateError::Compensation { .. } => true,
            UpdateError::DependencyQuiesce { compensation, .. } => !compensation.is_empty(),
            _ => false,
        }
    }

    /// Every distinct failure, in the order encountered
    pub fn failures(&self) -> Vec<Failure> {
        match self {
            UpdateError::Validation(e) => e
                .fields
                .iter()
                .map(|f| Failure::new(format!("field {f}"), "cannot be updated"))
                .collect(),
            UpdateError::DependencyQuiesce {
                failures,
                compensation,
            } => failures.iter().chain(compensation).cloned().collect(),
            UpdateError::BatchExecution { failures } => failures.clone(),
            UpdateError::Compensation {
                failures,
                batch_failures,
            } => batch_failures.iter().chain(failures).cloned().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_error_lists_every_failure() {
        let err = UpdateError::BatchExecution {
            failures: vec![
                Failure::new("identity batch", "job job-1 ended FAILED"),
                Failure::new("tag batch", "delete all tags: boom"),
            ],
        };
        let display = err.to_string();
        assert!(display.starts_with("2 update batch(es) failed"));
        assert!(display.contains("identity batch"));
        assert!(display.contains("tag batch"));
        assert!(!err.leaves_dependents_disabled());
    }

    #[test]
    fn test_compensation_error_carries_batch_failures() {
        let err = UpdateError::Compensation {
            failures: vec![Failure::new("enable vdb V1", "boom")],
            batch_failures: vec![Failure::new("host batch", "no host h1")],
        };
        assert!(err.leaves_dependents_disabled());
        assert!(err.to_string().contains("update batches also failed"));
        assert_eq!(err.failures().len(), 2);
        assert_eq!(err.failures()[0].step, "host batch");
    }

    #[test]
    fn test_validation_error_is_transparent() {
        let err = UpdateError::from(ValidationError {
            fields: vec!["engine_id".to_string()],
        });
        assert!(err.to_string().contains("engine_id"));
        assert_eq!(err.failures().len(), 1);
    }

    #[test]
    fn test_quiesce_error_without_compensation_failures() {
        let err = UpdateError::DependencyQuiesce {
            failures: vec![Failure::new("disable vdb V1", "boom")],
            compensation: Vec::new(),
        };
        assert!(!err.to_string().contains("re-enable"));
        assert!(!err.leaves_dependents_disabled());
    }
}
