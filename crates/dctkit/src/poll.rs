//! Polling for job completion and object existence.
//!
//! [`JobPoller`] waits for an asynchronous job to reach a terminal status.
//! A failed status query is not fatal: the poller reports the job as
//! [`JobOutcome::Unobserved`] and the caller decides what that means.
//!
//! [`ExistencePoller`] waits until an object shows up after creation, or
//! goes away after deletion.

use crate::backend::Backend;
use crate::error::{Error, Result};
use crate::types::{Job, JobStatus};
use std::thread;
use std::time::Duration;

/// Default interval between job status queries.
pub const JOB_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Default interval between existence checks.
pub const EXISTENCE_POLL_INTERVAL: Duration = Duration::from_secs(20);

/// Default number of existence checks.
pub const EXISTENCE_MAX_POLLS: u32 = 10;

/// Poll timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    /// Wait between queries.
    pub interval: Duration,
    /// Stop after this many queries. `None` polls until a terminal status.
    pub max_polls: Option<u32>,
}

impl PollConfig {
    /// Job polling defaults: every 5 seconds, unbounded.
    #[must_use]
    pub fn jobs() -> Self {
        Self {
            interval: JOB_POLL_INTERVAL,
            max_polls: None,
        }
    }

    /// Existence polling defaults: every 20 seconds, 10 attempts.
    #[must_use]
    pub fn existence() -> Self {
        Self {
            interval: EXISTENCE_POLL_INTERVAL,
            max_polls: Some(EXISTENCE_MAX_POLLS),
        }
    }

    /// No waiting between queries.
    #[must_use]
    pub fn immediate(max_polls: Option<u32>) -> Self {
        Self {
            interval: Duration::ZERO,
            max_polls,
        }
    }

    fn allows(&self, polls: u32) -> bool {
        self.max_polls.is_none_or(|max| polls < max)
    }
}

/// Result of waiting on a job.
#[derive(Debug)]
pub enum JobOutcome {
    /// The job reached a terminal status.
    Terminal(Job),
    /// The status could not be observed.
    Unobserved {
        /// Job being polled.
        job_id: String,
        /// Why the status is unknown.
        error: Error,
    },
}

impl JobOutcome {
    /// Terminal status, if one was observed.
    #[must_use]
    pub fn status(&self) -> Option<JobStatus> {
        match self {
            JobOutcome::Terminal(job) => Some(job.status),
            JobOutcome::Unobserved { .. } => None,
        }
    }

    /// Whether the job was observed to end in a failure status.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        self.status().is_some_and(|s| s.is_failure())
    }
}

/// Receives poll progress, e.g. to drive a spinner.
pub trait PollObserver {
    /// Called after each status query.
    fn on_poll(&self, job_id: &str, status: JobStatus);
}

/// Observer that ignores progress.
pub struct NoopObserver;

impl PollObserver for NoopObserver {
    fn on_poll(&self, _job_id: &str, _status: JobStatus) {}
}

/// Waits for jobs to finish.
pub struct JobPoller<'a> {
    backend: &'a dyn Backend,
    config: PollConfig,
    observer: &'a dyn PollObserver,
}

impl<'a> JobPoller<'a> {
    /// Create a poller without progress reporting.
    pub fn new(backend: &'a dyn Backend, config: PollConfig) -> Self {
        Self {
            backend,
            config,
            observer: &NoopObserver,
        }
    }

    /// Report each status query to `observer`.
    #[must_use]
    pub fn with_observer(mut self, observer: &'a dyn PollObserver) -> Self {
        self.observer = observer;
        self
    }

    /// Poll `job_id` until it reaches a terminal status.
    ///
    /// Each iteration queries first and sleeps afterwards, so a job that is
    /// already finished costs one query and no wait.
    pub fn poll(&self, job_id: &str) -> JobOutcome {
        let mut polls = 0;
        loop {
            match self.backend.get_job(job_id) {
                Ok(job) => {
                    polls += 1;
                    self.observer.on_poll(job_id, job.status);
                    log::debug!("job {job_id}: {} (poll {polls})", job.status);
                    if job.status.is_terminal() {
                        return JobOutcome::Terminal(job);
                    }
                }
                Err(error) => {
                    log::warn!("could not query job {job_id}: {error}");
                    return JobOutcome::Unobserved {
                        job_id: job_id.to_string(),
                        error,
                    };
                }
            }

            if !self.config.allows(polls) {
                return JobOutcome::Unobserved {
                    job_id: job_id.to_string(),
                    error: Error::PollExhausted {
                        job_id: job_id.to_string(),
                        polls,
                    },
                };
            }
            thread::sleep(self.config.interval);
        }
    }
}

/// Waits for an object to appear or disappear.
pub struct ExistencePoller {
    config: PollConfig,
}

impl ExistencePoller {
    /// Create a poller.
    #[must_use]
    pub fn new(config: PollConfig) -> Self {
        Self { config }
    }

    /// Fetch until the object is found.
    ///
    /// `NotFound` is retried until the poll budget runs out, then returned.
    /// Any other error is returned at once.
    pub fn wait_for_existence<T, F>(&self, mut fetch: F) -> Result<T>
    where
        F: FnMut() -> Result<T>,
    {
        let mut polls = 0;
        loop {
            match fetch() {
                Ok(found) => return Ok(found),
                Err(e) if e.is_not_found() => {
                    polls += 1;
                    if !self.config.allows(polls) {
                        return Err(e);
                    }
                    log::debug!("not found yet (poll {polls}), waiting");
                    thread::sleep(self.config.interval);
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Fetch until the object is gone.
    ///
    /// # Errors
    ///
    /// Returns `Error::StillPresent` when the budget runs out, or the first
    /// error other than `NotFound`.
    pub fn wait_for_deletion<T, F>(&self, what: &str, mut fetch: F) -> Result<()>
    where
        F: FnMut() -> Result<T>,
    {
        let mut polls = 0;
        loop {
            match fetch() {
                Ok(_) => {
                    polls += 1;
                    if !self.config.allows(polls) {
                        return Err(Error::StillPresent(what.to_string()));
                    }
                    log::debug!("{what} still present (poll {polls}), waiting");
                    thread::sleep(self.config.interval);
                }
                Err(e) if e.is_not_found() => return Ok(()),
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{Call, Fault, MockBackend, Op};
    use crate::types::{Environment, EnvironmentUpdateParams};
    use std::cell::{Cell, RefCell};

    fn mock_with_env() -> MockBackend {
        let mock = MockBackend::new();
        mock.add_environment(Environment {
            id: "E1".to_string(),
            ..Default::default()
        });
        mock
    }

    #[test]
    fn test_poll_completed_job() {
        let mock = mock_with_env();
        let job = mock
            .update_environment("E1", &EnvironmentUpdateParams::default())
            .unwrap();

        let outcome = JobPoller::new(&mock, PollConfig::immediate(None)).poll(&job.id);
        assert_eq!(outcome.status(), Some(JobStatus::Completed));
        assert!(!outcome.is_failure());
    }

    #[test]
    fn test_poll_waits_through_started() {
        let mock = mock_with_env();
        mock.set_pending_polls(3);
        let job = mock
            .update_environment("E1", &EnvironmentUpdateParams::default())
            .unwrap();

        let seen = RefCell::new(Vec::new());
        struct Recorder<'a>(&'a RefCell<Vec<JobStatus>>);
        impl PollObserver for Recorder<'_> {
            fn on_poll(&self, _job_id: &str, status: JobStatus) {
                self.0.borrow_mut().push(status);
            }
        }
        let recorder = Recorder(&seen);

        let outcome = JobPoller::new(&mock, PollConfig::immediate(None))
            .with_observer(&recorder)
            .poll(&job.id);

        assert_eq!(outcome.status(), Some(JobStatus::Completed));
        assert_eq!(seen.borrow().len(), 4);
        assert_eq!(
            mock.calls()
                .iter()
                .filter(|c| matches!(c, Call::GetJob(_)))
                .count(),
            4
        );
    }

    #[test]
    fn test_poll_reports_failure_statuses() {
        for status in [
            JobStatus::Failed,
            JobStatus::Canceled,
            JobStatus::Abandoned,
            JobStatus::Timedout,
        ] {
            let mock = mock_with_env();
            mock.fail(Op::UpdateEnvironment, None, Fault::Job(status));
            let job = mock
                .update_environment("E1", &EnvironmentUpdateParams::default())
                .unwrap();

            let outcome = JobPoller::new(&mock, PollConfig::immediate(None)).poll(&job.id);
            assert_eq!(outcome.status(), Some(status));
            assert!(outcome.is_failure());
        }
    }

    #[test]
    fn test_poll_query_error_is_unobserved() {
        let mock = mock_with_env();
        let job = mock
            .update_environment("E1", &EnvironmentUpdateParams::default())
            .unwrap();
        mock.fail(Op::GetJob, None, Fault::Api("gateway timeout".to_string()));

        let outcome = JobPoller::new(&mock, PollConfig::immediate(None)).poll(&job.id);
        match outcome {
            JobOutcome::Unobserved { job_id, .. } => assert_eq!(job_id, job.id),
            other => panic!("expected Unobserved, got {other:?}"),
        }
    }

    #[test]
    fn test_poll_budget_exhausted() {
        let mock = mock_with_env();
        mock.set_pending_polls(10);
        let job = mock
            .update_environment("E1", &EnvironmentUpdateParams::default())
            .unwrap();

        let outcome = JobPoller::new(&mock, PollConfig::immediate(Some(2))).poll(&job.id);
        assert!(matches!(
            outcome,
            JobOutcome::Unobserved {
                error: Error::PollExhausted { polls: 2, .. },
                ..
            }
        ));
    }

    #[test]
    fn test_wait_for_existence_retries_not_found() {
        let attempts = Cell::new(0);
        let result = ExistencePoller::new(PollConfig::immediate(Some(5))).wait_for_existence(|| {
            attempts.set(attempts.get() + 1);
            if attempts.get() < 3 {
                Err(Error::NotFound("env".to_string()))
            } else {
                Ok("found")
            }
        });
        assert_eq!(result.unwrap(), "found");
        assert_eq!(attempts.get(), 3);
    }

    #[test]
    fn test_wait_for_existence_bounded() {
        let attempts = Cell::new(0);
        let result: Result<()> = ExistencePoller::new(PollConfig::immediate(Some(4)))
            .wait_for_existence(|| {
                attempts.set(attempts.get() + 1);
                Err(Error::NotFound("env".to_string()))
            });
        assert!(result.unwrap_err().is_not_found());
        assert_eq!(attempts.get(), 4);
    }

    #[test]
    fn test_wait_for_existence_other_error_is_immediate() {
        let attempts = Cell::new(0);
        let result: Result<()> = ExistencePoller::new(PollConfig::immediate(Some(4)))
            .wait_for_existence(|| {
                attempts.set(attempts.get() + 1);
                Err(Error::Unauthorized { status: 401 })
            });
        assert!(result.is_err());
        assert_eq!(attempts.get(), 1);
    }

    #[test]
    fn test_wait_for_deletion() {
        let mock = mock_with_env();
        let poller = ExistencePoller::new(PollConfig::immediate(Some(3)));

        let err = poller
            .wait_for_deletion("environment E1", || mock.get_environment("E1"))
            .unwrap_err();
        assert!(matches!(err, Error::StillPresent(_)));

        mock.delete_environment("E1").unwrap();
        poller
            .wait_for_deletion("environment E1", || mock.get_environment("E1"))
            .unwrap();
    }
}
