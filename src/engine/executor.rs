//! Update batch execution
//!
//! Batches run one after another in [`BatchKind::ORDER`]. A failed batch is
//! recorded and the next one still runs; nothing already applied is rolled
//! back.

use declarative::ChangeSet;
use dctkit::backend::Backend;
use dctkit::{EnvironmentUpdateParams, EnvironmentUserParams, HostUpdateParams, JobPoller};

use super::await_job;
use super::error::Failure;
use super::planner::{BatchKind, UpdatePlan};
use crate::schema::EnvironmentSpec;

/// Inputs shared by every batch
pub struct UpdateRequest<'a> {
    pub environment_id: &'a str,
    pub changes: &'a ChangeSet,
    /// Stored state before the update
    pub previous: &'a EnvironmentSpec,
    /// Declared state, with the plain-text password
    pub desired: &'a EnvironmentSpec,
}

/// What the batches did
#[derive(Debug, Default)]
pub struct BatchOutcome {
    /// Batches that finished without error
    pub succeeded: Vec<BatchKind>,
    /// One entry per failed batch or sub-call
    pub failures: Vec<Failure>,
    /// User reference resolved by the credentials batch
    pub user_ref: Option<String>,
}

pub struct UpdateExecutor<'a> {
    backend: &'a dyn Backend,
    jobs: &'a JobPoller<'a>,
}

impl<'a> UpdateExecutor<'a> {
    pub fn new(backend: &'a dyn Backend, jobs: &'a JobPoller<'a>) -> Self {
        Self { backend, jobs }
    }

    /// Run every batch in the plan.
    pub fn execute(&self, request: &UpdateRequest<'_>, plan: &UpdatePlan) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();

        for &batch in &plan.batches {
            log::info!("Running {batch} on {}", request.environment_id);
            let result = match batch {
                BatchKind::Identity => self.identity(request),
                BatchKind::Credentials => self.credentials(request, &mut outcome.user_ref),
                BatchKind::Host => self.host(request),
                BatchKind::Tags => self.tags(request),
            };
            match result {
                Ok(()) => outcome.succeeded.push(batch),
                Err(failures) => {
                    for failure in &failures {
                        log::error!("{failure}");
                    }
                    outcome.failures.extend(failures);
                }
            }
        }

        outcome
    }

    fn identity(&self, request: &UpdateRequest<'_>) -> Result<(), Vec<Failure>> {
        let step = BatchKind::Identity.to_string();
        let changes = request.changes;
        let desired = request.desired;

        let params = EnvironmentUpdateParams {
            name: (changes.contains("name") && !desired.name.is_empty())
                .then(|| desired.name.clone()),
            cluster_home: desired
                .cluster_home
                .clone()
                .filter(|_| changes.contains("cluster_home")),
            description: desired
                .description
                .clone()
                .filter(|_| changes.contains("description")),
        };

        // The API has no way to clear these once set.
        let mut failures: Vec<Failure> = [
            ("cluster_home", &desired.cluster_home),
            ("description", &desired.description),
        ]
        .into_iter()
        .filter(|(field, value)| changes.contains(field) && value.is_none())
        .map(|(field, _)| Failure::new(&step, format!("{field} cannot be unset once set")))
        .collect();

        if params.is_empty() {
            log::debug!("{step}: nothing to send");
        } else {
            let sent = self
                .backend
                .update_environment(request.environment_id, &params)
                .map_err(|e| Failure::new(&step, e.to_string()))
                .and_then(|job| await_job(self.jobs, &job, &step));
            if let Err(failure) = sent {
                failures.push(failure);
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(failures)
        }
    }

    fn credentials(
        &self,
        request: &UpdateRequest<'_>,
        user_ref: &mut Option<String>,
    ) -> Result<(), Vec<Failure>> {
        let step = BatchKind::Credentials.to_string();
        let fail = |message: String| vec![Failure::new(&step, message)];

        let previous_username = request
            .previous
            .username
            .as_deref()
            .ok_or_else(|| fail("no previous username to match".to_string()))?;

        let users = self
            .backend
            .list_environment_users(request.environment_id)
            .map_err(|e| fail(format!("list users: {e}")))?;
        let resolved = users
            .iter()
            .find(|u| u.username.eq_ignore_ascii_case(previous_username))
            .map(|u| u.user_ref.clone())
            .ok_or_else(|| fail(format!("no user matching '{previous_username}'")))?;

        log::debug!("{step}: resolved user reference {resolved}");
        *user_ref = Some(resolved.clone());

        let params = EnvironmentUserParams {
            username: request.desired.username.clone(),
            password: request.desired.password.clone(),
        };
        let job = self
            .backend
            .update_environment_user(request.environment_id, &resolved, &params)
            .map_err(|e| fail(e.to_string()))?;
        await_job(self.jobs, &job, &step).map_err(|f| vec![f])
    }

    fn host(&self, request: &UpdateRequest<'_>) -> Result<(), Vec<Failure>> {
        let step = BatchKind::Host.to_string();
        let fail = |message: String| vec![Failure::new(&step, message)];

        let old_hostname = request
            .previous
            .primary_host()
            .map(|h| h.hostname.as_str())
            .ok_or_else(|| fail("no previous host to match".to_string()))?;
        let new_host = request
            .desired
            .primary_host()
            .ok_or_else(|| fail("no host declared".to_string()))?;

        let current = self
            .backend
            .get_environment(request.environment_id)
            .map_err(|e| fail(format!("read hosts: {e}")))?;
        let remote_host = current
            .host_named(old_hostname)
            .ok_or_else(|| fail(format!("no host named '{old_hostname}' to update")))?;
        let host_id = remote_host.id.clone();

        let params = HostUpdateParams {
            hostname: Some(new_host.hostname.clone()).filter(|h| !h.is_empty()),
            ssh_port: new_host.ssh_port.filter(|p| *p != 0),
            toolkit_path: new_host.toolkit_path.clone().filter(|p| !p.is_empty()),
            java_home: new_host.java_home.clone().filter(|p| !p.is_empty()),
            nfs_addresses: Some(new_host.nfs_addresses.clone())
                .filter(|nfs| !nfs.is_empty() && *nfs != remote_host.nfs_addresses),
            connector_port: request
                .desired
                .connector_port
                .filter(|_| request.changes.contains("connector_port")),
        };

        let job = self
            .backend
            .update_host(request.environment_id, &host_id, &params)
            .map_err(|e| fail(e.to_string()))?;
        await_job(self.jobs, &job, &step).map_err(|f| vec![f])
    }

    /// Delete-all then create; both sub-calls are attempted.
    fn tags(&self, request: &UpdateRequest<'_>) -> Result<(), Vec<Failure>> {
        let step = BatchKind::Tags.to_string();
        let mut failures = Vec::new();

        if !request.previous.tags.is_empty()
            && let Err(e) = self.backend.delete_all_tags(request.environment_id)
        {
            failures.push(Failure::new(&step, format!("delete all tags: {e}")));
        }
        if !request.desired.tags.is_empty()
            && let Err(e) = self
                .backend
                .create_tags(request.environment_id, &request.desired.tags)
        {
            failures.push(Failure::new(&step, format!("create tags: {e}")));
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(failures)
        }
    }
}
