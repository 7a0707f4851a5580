//! Backend trait and implementations for talking to the control plane.
//!
//! [`Backend`] lists every remote operation the environment lifecycle
//! needs. [`http::HttpBackend`] talks to a real control plane over HTTPS;
//! [`MockBackend`] keeps everything in memory and records each call so tests
//! can assert on ordering.
//!
//! # Testing
//!
//! ```
//! use dctkit::backend::{Backend, Call, Fault, MockBackend, Op};
//! use dctkit::{JobStatus, Vdb};
//!
//! let mock = MockBackend::new();
//! mock.add_vdb(Vdb {
//!     id: "V1".to_string(),
//!     name: "orders".to_string(),
//!     environment_id: "env-1".to_string(),
//!     enabled: true,
//! });
//! mock.fail(Op::EnableVdb, Some("V1"), Fault::Job(JobStatus::Failed));
//!
//! let job = mock.disable_vdb("V1").unwrap();
//! assert_eq!(job.status, JobStatus::Completed);
//! assert_eq!(mock.calls(), vec![Call::DisableVdb("V1".to_string())]);
//! ```

pub mod http;

use crate::error::{Error, Result};
use crate::types::{
    CreatedEnvironment, DSource, Environment, EnvironmentCreateParams, EnvironmentUpdateParams,
    EnvironmentUser, EnvironmentUserParams, Host, HostUpdateParams, Job, JobStatus, Source, Tag,
    Vdb,
};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Remote operations consumed by the environment lifecycle.
///
/// Every mutating call that the control plane runs asynchronously returns
/// the [`Job`] it created; callers poll it with [`crate::poll::JobPoller`].
pub trait Backend: Send + Sync {
    /// Register a new environment.
    fn create_environment(&self, params: &EnvironmentCreateParams) -> Result<CreatedEnvironment>;

    /// Fetch an environment.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` if the environment does not exist.
    fn get_environment(&self, environment_id: &str) -> Result<Environment>;

    /// Update identity/core attributes.
    fn update_environment(
        &self,
        environment_id: &str,
        params: &EnvironmentUpdateParams,
    ) -> Result<Job>;

    /// Delete an environment.
    fn delete_environment(&self, environment_id: &str) -> Result<Job>;

    /// List the OS users registered on an environment.
    fn list_environment_users(&self, environment_id: &str) -> Result<Vec<EnvironmentUser>>;

    /// Update an environment user's credentials.
    fn update_environment_user(
        &self,
        environment_id: &str,
        user_ref: &str,
        params: &EnvironmentUserParams,
    ) -> Result<Job>;

    /// Update a host's network configuration.
    fn update_host(
        &self,
        environment_id: &str,
        host_id: &str,
        params: &HostUpdateParams,
    ) -> Result<Job>;

    /// Attach tags to an environment.
    fn create_tags(&self, environment_id: &str, tags: &[Tag]) -> Result<()>;

    /// Remove every tag from an environment.
    fn delete_all_tags(&self, environment_id: &str) -> Result<()>;

    /// List virtual databases running on an environment.
    fn list_vdbs_by_environment(&self, environment_id: &str) -> Result<Vec<Vdb>>;

    /// List sources living on an environment.
    fn list_sources_by_environment(&self, environment_id: &str) -> Result<Vec<Source>>;

    /// Resolve the dSources ingesting from the given sources.
    fn search_dsources(&self, source_ids: &[String]) -> Result<Vec<DSource>>;

    /// Enable a virtual database.
    fn enable_vdb(&self, vdb_id: &str) -> Result<Job>;

    /// Disable a virtual database.
    fn disable_vdb(&self, vdb_id: &str) -> Result<Job>;

    /// Enable a dSource.
    fn enable_dsource(&self, dsource_id: &str) -> Result<Job>;

    /// Disable a dSource.
    fn disable_dsource(&self, dsource_id: &str) -> Result<Job>;

    /// Fetch the current status of a job.
    fn get_job(&self, job_id: &str) -> Result<Job>;
}

// =============================================================================
// Mock backend
// =============================================================================

/// Operation kinds, used to target injected faults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    CreateEnvironment,
    GetEnvironment,
    UpdateEnvironment,
    DeleteEnvironment,
    ListEnvironmentUsers,
    UpdateEnvironmentUser,
    UpdateHost,
    CreateTags,
    DeleteAllTags,
    ListVdbs,
    ListSources,
    SearchDSources,
    EnableVdb,
    DisableVdb,
    EnableDSource,
    DisableDSource,
    GetJob,
}

/// A recorded call against the mock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    CreateEnvironment { hostname: String },
    GetEnvironment(String),
    UpdateEnvironment {
        environment_id: String,
        params: EnvironmentUpdateParams,
    },
    DeleteEnvironment(String),
    ListEnvironmentUsers(String),
    UpdateEnvironmentUser {
        environment_id: String,
        user_ref: String,
    },
    UpdateHost {
        environment_id: String,
        host_id: String,
        params: HostUpdateParams,
    },
    CreateTags {
        environment_id: String,
        tags: Vec<Tag>,
    },
    DeleteAllTags(String),
    ListVdbs(String),
    ListSources(String),
    SearchDSources(Vec<String>),
    EnableVdb(String),
    DisableVdb(String),
    EnableDSource(String),
    DisableDSource(String),
    GetJob(String),
}

impl Call {
    /// Whether the call changes remote state.
    #[must_use]
    pub fn is_mutation(&self) -> bool {
        !matches!(
            self,
            Call::GetEnvironment(_)
                | Call::ListEnvironmentUsers(_)
                | Call::ListVdbs(_)
                | Call::ListSources(_)
                | Call::SearchDSources(_)
                | Call::GetJob(_)
        )
    }
}

/// A fault injected into the mock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fault {
    /// The call itself fails with this message.
    Api(String),
    /// The call succeeds but its job ends in this status.
    Job(JobStatus),
}

#[derive(Debug, Default)]
struct MockState {
    environments: BTreeMap<String, Environment>,
    users: HashMap<String, Vec<EnvironmentUser>>,
    vdbs: Vec<Vdb>,
    sources: Vec<Source>,
    dsources: Vec<DSource>,
    jobs: HashMap<String, (Job, u32)>,
    faults: HashMap<(Op, Option<String>), Fault>,
    pending_polls: u32,
    calls: Vec<Call>,
    next_id: u32,
}

impl MockState {
    fn fault(&self, op: Op, target: &str) -> Option<Fault> {
        self.faults
            .get(&(op, Some(target.to_string())))
            .or_else(|| self.faults.get(&(op, None)))
            .cloned()
    }

    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}-{}", self.next_id)
    }

    /// Check for an injected API fault on a call without a job.
    fn check(&self, op: Op, target: &str) -> Result<()> {
        match self.fault(op, target) {
            Some(Fault::Api(message)) => Err(Error::Injected(message)),
            Some(Fault::Job(status)) => Err(Error::Injected(format!("{op:?} {status}"))),
            None => Ok(()),
        }
    }

    /// Start a job for a mutating call.
    ///
    /// Returns the job and whether the mutation should take effect.
    fn start_job(&mut self, op: Op, target: &str) -> Result<(Job, bool)> {
        let status = match self.fault(op, target) {
            Some(Fault::Api(message)) => return Err(Error::Injected(message)),
            Some(Fault::Job(status)) => status,
            None => JobStatus::Completed,
        };
        let job = Job {
            id: self.next_id("job"),
            status,
            error_details: status
                .is_failure()
                .then(|| format!("{op:?} on {target} ended {status}")),
        };
        self.jobs
            .insert(job.id.clone(), (job.clone(), self.pending_polls));
        Ok((job, !status.is_failure()))
    }

    fn environment_mut(&mut self, environment_id: &str) -> Result<&mut Environment> {
        self.environments
            .get_mut(environment_id)
            .ok_or_else(|| Error::NotFound(format!("environment {environment_id}")))
    }
}

/// In-memory backend for tests.
///
/// Mutations take effect immediately unless a [`Fault`] is injected for the
/// operation. Jobs report `STARTED` for the configured number of polls
/// before reporting their terminal status.
#[derive(Debug, Clone, Default)]
pub struct MockBackend {
    state: Arc<Mutex<MockState>>,
}

impl MockBackend {
    /// Create a new empty mock backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add an existing environment.
    pub fn add_environment(&self, environment: Environment) {
        self.state()
            .environments
            .insert(environment.id.clone(), environment);
    }

    /// Register a user on an environment.
    pub fn add_user(&self, environment_id: &str, user_ref: &str, username: &str) {
        self.state()
            .users
            .entry(environment_id.to_string())
            .or_default()
            .push(EnvironmentUser {
                user_ref: user_ref.to_string(),
                username: username.to_string(),
            });
    }

    /// Add a virtual database.
    pub fn add_vdb(&self, vdb: Vdb) {
        self.state().vdbs.push(vdb);
    }

    /// Add a source.
    pub fn add_source(&self, source: Source) {
        self.state().sources.push(source);
    }

    /// Add a dSource.
    pub fn add_dsource(&self, dsource: DSource) {
        self.state().dsources.push(dsource);
    }

    /// Inject a fault for an operation, optionally only for one target id.
    pub fn fail(&self, op: Op, target: Option<&str>, fault: Fault) {
        self.state()
            .faults
            .insert((op, target.map(str::to_string)), fault);
    }

    /// Remove every injected fault.
    pub fn clear_faults(&self) {
        self.state().faults.clear();
    }

    /// Make new jobs report `STARTED` for this many polls.
    pub fn set_pending_polls(&self, polls: u32) {
        self.state().pending_polls = polls;
    }

    /// Every call made so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<Call> {
        self.state().calls.clone()
    }

    /// Only the calls that change remote state.
    #[must_use]
    pub fn mutations(&self) -> Vec<Call> {
        self.state()
            .calls
            .iter()
            .filter(|c| c.is_mutation())
            .cloned()
            .collect()
    }

    /// Forget recorded calls.
    pub fn clear_calls(&self) {
        self.state().calls.clear();
    }

    /// Current copy of an environment.
    #[must_use]
    pub fn environment(&self, environment_id: &str) -> Option<Environment> {
        self.state().environments.get(environment_id).cloned()
    }

    /// Current copy of a virtual database.
    #[must_use]
    pub fn vdb(&self, vdb_id: &str) -> Option<Vdb> {
        self.state().vdbs.iter().find(|v| v.id == vdb_id).cloned()
    }

    /// Current copy of a dSource.
    #[must_use]
    pub fn dsource(&self, dsource_id: &str) -> Option<DSource> {
        self.state()
            .dsources
            .iter()
            .find(|d| d.id == dsource_id)
            .cloned()
    }

    fn set_vdb_enabled(&self, op: Op, vdb_id: &str, enabled: bool) -> Result<Job> {
        let mut state = self.state();
        state.calls.push(if enabled {
            Call::EnableVdb(vdb_id.to_string())
        } else {
            Call::DisableVdb(vdb_id.to_string())
        });
        if !state.vdbs.iter().any(|v| v.id == vdb_id) {
            return Err(Error::NotFound(format!("vdb {vdb_id}")));
        }
        let (job, apply) = state.start_job(op, vdb_id)?;
        if apply && let Some(vdb) = state.vdbs.iter_mut().find(|v| v.id == vdb_id) {
            vdb.enabled = enabled;
        }
        Ok(job)
    }

    fn set_dsource_enabled(&self, op: Op, dsource_id: &str, enabled: bool) -> Result<Job> {
        let mut state = self.state();
        state.calls.push(if enabled {
            Call::EnableDSource(dsource_id.to_string())
        } else {
            Call::DisableDSource(dsource_id.to_string())
        });
        if !state.dsources.iter().any(|d| d.id == dsource_id) {
            return Err(Error::NotFound(format!("dsource {dsource_id}")));
        }
        let (job, apply) = state.start_job(op, dsource_id)?;
        if apply && let Some(dsource) = state.dsources.iter_mut().find(|d| d.id == dsource_id) {
            dsource.enabled = enabled;
        }
        Ok(job)
    }
}

impl Backend for MockBackend {
    fn create_environment(&self, params: &EnvironmentCreateParams) -> Result<CreatedEnvironment> {
        let mut state = self.state();
        state.calls.push(Call::CreateEnvironment {
            hostname: params.hostname.clone(),
        });
        let environment_id = state.next_id("env");
        let (job, apply) = state.start_job(Op::CreateEnvironment, &environment_id)?;

        if apply {
            let host = Host {
                id: state.next_id("host"),
                hostname: params.hostname.clone(),
                // Computed by the engine when not given
                ssh_port: params.ssh_port.or(Some(22)),
                toolkit_path: params.toolkit_path.clone(),
                java_home: params.java_home.clone(),
                nfs_addresses: params
                    .nfs_addresses
                    .clone()
                    .unwrap_or_else(|| vec![params.hostname.clone()]),
                os_name: Some("Linux".to_string()),
                ..Default::default()
            };
            let environment = Environment {
                id: environment_id.clone(),
                name: params.name.clone().unwrap_or_else(|| params.hostname.clone()),
                engine_id: params.engine_id.clone(),
                is_cluster: params.is_cluster.unwrap_or(false),
                enabled: true,
                staging_environment: params.staging_environment.clone(),
                cluster_home: params.cluster_home.clone(),
                hosts: vec![host],
                tags: params.tags.clone(),
                ..Default::default()
            };
            state
                .environments
                .insert(environment_id.clone(), environment);
            if let Some(username) = &params.username {
                let user_ref = state.next_id("user");
                state
                    .users
                    .entry(environment_id.clone())
                    .or_default()
                    .push(EnvironmentUser {
                        user_ref,
                        username: username.clone(),
                    });
            }
        }

        Ok(CreatedEnvironment {
            environment_id,
            job,
        })
    }

    fn get_environment(&self, environment_id: &str) -> Result<Environment> {
        let mut state = self.state();
        state
            .calls
            .push(Call::GetEnvironment(environment_id.to_string()));
        state.check(Op::GetEnvironment, environment_id)?;
        state
            .environments
            .get(environment_id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("environment {environment_id}")))
    }

    fn update_environment(
        &self,
        environment_id: &str,
        params: &EnvironmentUpdateParams,
    ) -> Result<Job> {
        let mut state = self.state();
        state.calls.push(Call::UpdateEnvironment {
            environment_id: environment_id.to_string(),
            params: params.clone(),
        });
        state.environment_mut(environment_id)?;
        let (job, apply) = state.start_job(Op::UpdateEnvironment, environment_id)?;
        if apply {
            let env = state.environment_mut(environment_id)?;
            if let Some(name) = &params.name {
                env.name.clone_from(name);
            }
            if let Some(cluster_home) = &params.cluster_home {
                env.cluster_home = Some(cluster_home.clone());
            }
        }
        Ok(job)
    }

    fn delete_environment(&self, environment_id: &str) -> Result<Job> {
        let mut state = self.state();
        state
            .calls
            .push(Call::DeleteEnvironment(environment_id.to_string()));
        state.environment_mut(environment_id)?;
        let (job, apply) = state.start_job(Op::DeleteEnvironment, environment_id)?;
        if apply {
            state.environments.remove(environment_id);
            state.users.remove(environment_id);
        }
        Ok(job)
    }

    fn list_environment_users(&self, environment_id: &str) -> Result<Vec<EnvironmentUser>> {
        let mut state = self.state();
        state
            .calls
            .push(Call::ListEnvironmentUsers(environment_id.to_string()));
        state.check(Op::ListEnvironmentUsers, environment_id)?;
        Ok(state.users.get(environment_id).cloned().unwrap_or_default())
    }

    fn update_environment_user(
        &self,
        environment_id: &str,
        user_ref: &str,
        params: &EnvironmentUserParams,
    ) -> Result<Job> {
        let mut state = self.state();
        state.calls.push(Call::UpdateEnvironmentUser {
            environment_id: environment_id.to_string(),
            user_ref: user_ref.to_string(),
        });
        let (job, apply) = state.start_job(Op::UpdateEnvironmentUser, environment_id)?;
        if apply
            && let Some(username) = &params.username
            && let Some(user) = state
                .users
                .get_mut(environment_id)
                .and_then(|users| users.iter_mut().find(|u| u.user_ref == user_ref))
        {
            user.username.clone_from(username);
        }
        Ok(job)
    }

    fn update_host(
        &self,
        environment_id: &str,
        host_id: &str,
        params: &HostUpdateParams,
    ) -> Result<Job> {
        let mut state = self.state();
        state.calls.push(Call::UpdateHost {
            environment_id: environment_id.to_string(),
            host_id: host_id.to_string(),
            params: params.clone(),
        });
        if !state
            .environment_mut(environment_id)?
            .hosts
            .iter()
            .any(|h| h.id == host_id)
        {
            return Err(Error::NotFound(format!("host {host_id}")));
        }
        let (job, apply) = state.start_job(Op::UpdateHost, host_id)?;
        if apply
            && let Some(host) = state
                .environment_mut(environment_id)?
                .hosts
                .iter_mut()
                .find(|h| h.id == host_id)
        {
            if let Some(hostname) = &params.hostname {
                host.hostname.clone_from(hostname);
            }
            if params.ssh_port.is_some() {
                host.ssh_port = params.ssh_port;
            }
            if params.toolkit_path.is_some() {
                host.toolkit_path.clone_from(&params.toolkit_path);
            }
            if params.java_home.is_some() {
                host.java_home.clone_from(&params.java_home);
            }
            if let Some(nfs) = &params.nfs_addresses {
                host.nfs_addresses.clone_from(nfs);
            }
        }
        Ok(job)
    }

    fn create_tags(&self, environment_id: &str, tags: &[Tag]) -> Result<()> {
        let mut state = self.state();
        state.calls.push(Call::CreateTags {
            environment_id: environment_id.to_string(),
            tags: tags.to_vec(),
        });
        state.check(Op::CreateTags, environment_id)?;
        state
            .environment_mut(environment_id)?
            .tags
            .extend_from_slice(tags);
        Ok(())
    }

    fn delete_all_tags(&self, environment_id: &str) -> Result<()> {
        let mut state = self.state();
        state
            .calls
            .push(Call::DeleteAllTags(environment_id.to_string()));
        state.check(Op::DeleteAllTags, environment_id)?;
        state.environment_mut(environment_id)?.tags.clear();
        Ok(())
    }

    fn list_vdbs_by_environment(&self, environment_id: &str) -> Result<Vec<Vdb>> {
        let mut state = self.state();
        state.calls.push(Call::ListVdbs(environment_id.to_string()));
        state.check(Op::ListVdbs, environment_id)?;
        Ok(state
            .vdbs
            .iter()
            .filter(|v| v.environment_id == environment_id)
            .cloned()
            .collect())
    }

    fn list_sources_by_environment(&self, environment_id: &str) -> Result<Vec<Source>> {
        let mut state = self.state();
        state
            .calls
            .push(Call::ListSources(environment_id.to_string()));
        state.check(Op::ListSources, environment_id)?;
        Ok(state
            .sources
            .iter()
            .filter(|s| s.environment_id == environment_id)
            .cloned()
            .collect())
    }

    fn search_dsources(&self, source_ids: &[String]) -> Result<Vec<DSource>> {
        let mut state = self.state();
        state.calls.push(Call::SearchDSources(source_ids.to_vec()));
        state.check(Op::SearchDSources, "")?;
        Ok(state
            .dsources
            .iter()
            .filter(|d| source_ids.contains(&d.source_id))
            .cloned()
            .collect())
    }

    fn enable_vdb(&self, vdb_id: &str) -> Result<Job> {
        self.set_vdb_enabled(Op::EnableVdb, vdb_id, true)
    }

    fn disable_vdb(&self, vdb_id: &str) -> Result<Job> {
        self.set_vdb_enabled(Op::DisableVdb, vdb_id, false)
    }

    fn enable_dsource(&self, dsource_id: &str) -> Result<Job> {
        self.set_dsource_enabled(Op::EnableDSource, dsource_id, true)
    }

    fn disable_dsource(&self, dsource_id: &str) -> Result<Job> {
        self.set_dsource_enabled(Op::DisableDSource, dsource_id, false)
    }

    fn get_job(&self, job_id: &str) -> Result<Job> {
        let mut state = self.state();
        state.calls.push(Call::GetJob(job_id.to_string()));
        state.check(Op::GetJob, job_id)?;
        let (job, remaining) = state
            .jobs
            .get_mut(job_id)
            .ok_or_else(|| Error::NotFound(format!("job {job_id}")))?;
        if *remaining > 0 {
            *remaining -= 1;
            return Ok(Job {
                status: JobStatus::Started,
                error_details: None,
                ..job.clone()
            });
        }
        Ok(job.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(id: &str) -> Environment {
        Environment {
            id: id.to_string(),
            name: "dev".to_string(),
            enabled: true,
            hosts: vec![Host {
                id: "H1".to_string(),
                hostname: "h1".to_string(),
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    #[test]
    fn test_mock_get_missing_environment() {
        let mock = MockBackend::new();
        assert!(mock.get_environment("nope").unwrap_err().is_not_found());
    }

    #[test]
    fn test_mock_records_calls_in_order() {
        let mock = MockBackend::new();
        mock.add_environment(env("E1"));
        mock.delete_all_tags("E1").unwrap();
        mock.create_tags("E1", &[Tag::new("a", "1")]).unwrap();
        let _ = mock.get_environment("E1").unwrap();

        assert_eq!(
            mock.calls(),
            vec![
                Call::DeleteAllTags("E1".to_string()),
                Call::CreateTags {
                    environment_id: "E1".to_string(),
                    tags: vec![Tag::new("a", "1")],
                },
                Call::GetEnvironment("E1".to_string()),
            ]
        );
        assert_eq!(mock.mutations().len(), 2);
    }

    #[test]
    fn test_mock_job_fault_does_not_apply_mutation() {
        let mock = MockBackend::new();
        mock.add_environment(env("E1"));
        mock.fail(Op::UpdateEnvironment, None, Fault::Job(JobStatus::Failed));

        let job = mock
            .update_environment(
                "E1",
                &EnvironmentUpdateParams {
                    name: Some("prod".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();

        assert_eq!(job.status, JobStatus::Failed);
        assert!(job.error_details.is_some());
        assert_eq!(mock.environment("E1").unwrap().name, "dev");
    }

    #[test]
    fn test_mock_targeted_fault() {
        let mock = MockBackend::new();
        for id in ["D1", "D2"] {
            mock.add_dsource(DSource {
                id: id.to_string(),
                name: id.to_string(),
                source_id: format!("S-{id}"),
                enabled: true,
            });
        }
        mock.fail(Op::DisableDSource, Some("D1"), Fault::Api("boom".to_string()));

        assert!(mock.disable_dsource("D1").is_err());
        assert!(mock.disable_dsource("D2").is_ok());
        assert!(mock.dsource("D1").unwrap().enabled);
        assert!(!mock.dsource("D2").unwrap().enabled);
    }

    #[test]
    fn test_mock_pending_polls() {
        let mock = MockBackend::new();
        mock.add_environment(env("E1"));
        mock.set_pending_polls(2);
        let job = mock
            .update_environment("E1", &EnvironmentUpdateParams::default())
            .unwrap();

        assert_eq!(mock.get_job(&job.id).unwrap().status, JobStatus::Started);
        assert_eq!(mock.get_job(&job.id).unwrap().status, JobStatus::Started);
        assert_eq!(mock.get_job(&job.id).unwrap().status, JobStatus::Completed);
    }

    #[test]
    fn test_mock_create_registers_user_and_host() {
        let mock = MockBackend::new();
        let created = mock
            .create_environment(&EnvironmentCreateParams {
                engine_id: "1".to_string(),
                os_type: "UNIX".to_string(),
                hostname: "h1".to_string(),
                username: Some("delphix".to_string()),
                ..Default::default()
            })
            .unwrap();

        let env = mock.environment(&created.environment_id).unwrap();
        assert_eq!(env.name, "h1");
        assert_eq!(env.hosts.len(), 1);
        assert_eq!(env.hosts[0].ssh_port, Some(22));
        assert_eq!(env.hosts[0].nfs_addresses, vec!["h1".to_string()]);
        let users = mock.list_environment_users(&created.environment_id).unwrap();
        assert_eq!(users[0].username, "delphix");
    }
}
