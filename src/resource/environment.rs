//! Environment lifecycle: Create, Read, Update, Delete
//!
//! Update is not atomic across batches. When it fails, the stored
//! attributes that were part of the change set are put back to their
//! previous values, then everything is resynced with a fresh read, so the
//! returned record is what the remote side actually holds.

use chrono::Utc;
use declarative::ChangeSet;
use dctkit::backend::Backend;
use dctkit::{EnvironmentCreateParams, Environment, ExistencePoller, JobPoller};
use serde_json::Value;

use super::ResourceError;
use crate::engine::compensation::CompensationState;
use crate::engine::error::UpdateError;
use crate::engine::executor::UpdateRequest;
use crate::engine::{Engine, UpdateOutcome, await_job};
use crate::schema::EnvironmentSpec;
use crate::state::{EnvironmentRecord, ObservedEnvironment};

/// Result of reading an environment
#[derive(Debug)]
pub enum ReadResult {
    Found(EnvironmentRecord),
    /// Deleted outside hostenv; drop it from local state
    Gone,
}

/// Result of an update: the record to store, plus what went wrong
#[derive(Debug)]
pub struct UpdateReport {
    /// `None` when the environment disappeared
    pub record: Option<EnvironmentRecord>,
    pub outcome: UpdateOutcome,
    pub error: Option<ResourceError>,
}

pub struct EnvironmentResource<'a> {
    backend: &'a dyn Backend,
    jobs: &'a JobPoller<'a>,
    existence: ExistencePoller,
}

impl<'a> EnvironmentResource<'a> {
    pub fn new(backend: &'a dyn Backend, jobs: &'a JobPoller<'a>, existence: ExistencePoller) -> Self {
        Self {
            backend,
            jobs,
            existence,
        }
    }

    // ========================================================================
    // Create
    // ========================================================================

    /// Register the environment and return its first observed record.
    pub fn create(&self, desired: &EnvironmentSpec) -> Result<EnvironmentRecord, ResourceError> {
        let params = create_params(desired);
        log::info!("Registering environment '{}' on {}", desired.name, params.hostname);

        let created = self
            .backend
            .create_environment(&params)
            .map_err(|e| ResourceError::api("create environment", e))?;
        await_job(self.jobs, &created.job, "create environment").map_err(ResourceError::Job)?;

        log::info!("Environment '{}' registered as {}", desired.name, created.environment_id);
        match self.read(&created.environment_id, &desired.sealed(), None)? {
            ReadResult::Found(record) => Ok(record),
            ReadResult::Gone => Err(ResourceError::Gone(created.environment_id)),
        }
    }

    // ========================================================================
    // Read
    // ========================================================================

    /// Fetch the environment and map it onto `stored`.
    ///
    /// Write-only attributes (password, vault settings) come from `stored`.
    /// When `user_ref` is known, the username is resolved from it.
    pub fn read(
        &self,
        environment_id: &str,
        stored: &EnvironmentSpec,
        user_ref: Option<String>,
    ) -> Result<ReadResult, ResourceError> {
        let remote = match self
            .existence
            .wait_for_existence(|| self.backend.get_environment(environment_id))
        {
            Ok(remote) => remote,
            Err(e) if e.is_not_found() => {
                let what = format!("environment {environment_id}");
                self.existence
                    .wait_for_deletion(&what, || self.backend.get_environment(environment_id))
                    .map_err(|e| ResourceError::api("confirm deletion", e))?;
                log::warn!("Environment {environment_id} was deleted outside hostenv");
                return Ok(ReadResult::Gone);
            }
            Err(e) => return Err(ResourceError::api("read environment", e)),
        };

        let mut spec = stored.clone();
        spec.overlay_remote(&remote);
        if let Some(user_ref) = &user_ref
            && let Some(username) = self.resolve_username(environment_id, user_ref)?
        {
            spec.username = Some(username);
        }

        Ok(ReadResult::Found(record(&remote, spec, user_ref)))
    }

    fn resolve_username(
        &self,
        environment_id: &str,
        user_ref: &str,
    ) -> Result<Option<String>, ResourceError> {
        let users = self
            .backend
            .list_environment_users(environment_id)
            .map_err(|e| ResourceError::api("list environment users", e))?;
        let username = users
            .into_iter()
            .find(|u| u.user_ref.eq_ignore_ascii_case(user_ref))
            .map(|u| u.username);
        if username.is_none() {
            log::warn!("User reference {user_ref} not found on {environment_id}");
        }
        Ok(username)
    }

    // ========================================================================
    // Update
    // ========================================================================

    /// Change set between the stored record and the declared state.
    ///
    /// Both sides are compared with sealed passwords. Host attributes the
    /// remote side computes count as unchanged when the declaration omits
    /// them.
    pub fn changes(
        previous: &EnvironmentRecord,
        desired: &EnvironmentSpec,
    ) -> Result<ChangeSet, ResourceError> {
        let desired = desired.with_computed_from(&previous.spec);
        Ok(ChangeSet::between(
            &serde_json::to_value(previous.spec.sealed())?,
            &serde_json::to_value(desired.sealed())?,
        ))
    }

    /// Apply `desired` over `previous`, then resync.
    pub fn update(&self, previous: &EnvironmentRecord, desired: &EnvironmentSpec) -> UpdateReport {
        let desired = &desired.with_computed_from(&previous.spec);
        let changes = match Self::changes(previous, desired) {
            Ok(changes) => changes,
            Err(e) => {
                return UpdateReport {
                    record: Some(previous.clone()),
                    outcome: rejected_outcome(),
                    error: Some(e),
                };
            }
        };

        let request = UpdateRequest {
            environment_id: &previous.id,
            changes: &changes,
            previous: &previous.spec,
            desired,
        };
        let mut outcome = Engine::new(self.backend, self.jobs).update(&request);
        let error = outcome.error.take();

        // Nothing was sent, so there is nothing to resync.
        if matches!(error, Some(UpdateError::Validation(_))) {
            return UpdateReport {
                record: Some(previous.clone()),
                outcome,
                error: error.map(ResourceError::Update),
            };
        }

        let applied = match applied_spec(&changes, desired, error.is_some()) {
            Ok(spec) => spec,
            Err(e) => {
                return UpdateReport {
                    record: Some(previous.clone()),
                    outcome,
                    error: Some(error.map_or(e, ResourceError::Update)),
                };
            }
        };

        let user_ref = outcome
            .user_ref
            .clone()
            .or_else(|| previous.observed.user_ref.clone());
        let resync = self.read(&previous.id, &applied, user_ref);

        let error = error.map(ResourceError::Update);
        match resync {
            Ok(ReadResult::Found(record)) => UpdateReport {
                record: Some(record),
                outcome,
                error,
            },
            Ok(ReadResult::Gone) => UpdateReport {
                record: None,
                outcome,
                error: Some(error.unwrap_or_else(|| ResourceError::Gone(previous.id.clone()))),
            },
            Err(e) => {
                log::error!("Could not resync {}: {e}", previous.id);
                let mut record = previous.clone();
                record.spec = applied;
                UpdateReport {
                    record: Some(record),
                    outcome,
                    error: Some(error.unwrap_or(e)),
                }
            }
        }
    }

    // ========================================================================
    // Delete
    // ========================================================================

    /// Delete the environment and wait until it is gone.
    pub fn delete(&self, environment_id: &str) -> Result<(), ResourceError> {
        let job = match self.backend.delete_environment(environment_id) {
            Ok(job) => job,
            Err(e) if e.is_not_found() => {
                log::info!("Environment {environment_id} already deleted");
                return Ok(());
            }
            Err(e) => return Err(ResourceError::api("delete environment", e)),
        };
        await_job(self.jobs, &job, "delete environment").map_err(ResourceError::Job)?;

        let what = format!("environment {environment_id}");
        self.existence
            .wait_for_deletion(&what, || self.backend.get_environment(environment_id))
            .map_err(|e| ResourceError::api("confirm deletion", e))?;
        log::info!("Environment {environment_id} deleted");
        Ok(())
    }
}

/// Declared state as it should be stored: sealed, and with every changed
/// field put back when the update failed.
fn applied_spec(
    changes: &ChangeSet,
    desired: &EnvironmentSpec,
    failed: bool,
) -> Result<EnvironmentSpec, ResourceError> {
    let sealed = desired.sealed();
    if !failed {
        return Ok(sealed);
    }
    let mut value: Value = serde_json::to_value(&sealed)?;
    changes.revert(&mut value);
    log::info!("Restored previous values of {} field(s)", changes.len());
    Ok(serde_json::from_value(value)?)
}

fn rejected_outcome() -> UpdateOutcome {
    UpdateOutcome {
        plan: None,
        succeeded: Vec::new(),
        user_ref: None,
        compensation: CompensationState::None,
        error: None,
    }
}

fn record(remote: &Environment, spec: EnvironmentSpec, user_ref: Option<String>) -> EnvironmentRecord {
    EnvironmentRecord {
        id: remote.id.clone(),
        spec,
        observed: ObservedEnvironment::from_remote(remote, user_ref),
        last_updated: Utc::now(),
    }
}

/// Registration parameters; the first host supplies the host attributes.
fn create_params(spec: &EnvironmentSpec) -> EnvironmentCreateParams {
    let host = spec.primary_host();
    EnvironmentCreateParams {
        engine_id: spec.engine_id.clone(),
        os_type: spec.os_type.clone(),
        hostname: host.map(|h| h.hostname.clone()).unwrap_or_default(),
        name: Some(spec.name.clone()),
        username: spec.username.clone(),
        password: spec.password.clone(),
        toolkit_path: host.and_then(|h| h.toolkit_path.clone()),
        ssh_port: host.and_then(|h| h.ssh_port),
        java_home: host.and_then(|h| h.java_home.clone()),
        nfs_addresses: host
            .map(|h| h.nfs_addresses.clone())
            .filter(|addresses| !addresses.is_empty()),
        is_cluster: spec.is_cluster.then_some(true),
        is_target: spec.is_target,
        cluster_home: spec.cluster_home.clone(),
        connector_port: spec.connector_port,
        staging_environment: spec.staging_environment.clone(),
        description: spec.description.clone(),
        vault: spec.vault.clone(),
        hashicorp_vault_engine: spec.hashicorp_vault_engine.clone(),
        hashicorp_vault_secret_path: spec.hashicorp_vault_secret_path.clone(),
        hashicorp_vault_username_key: spec.hashicorp_vault_username_key.clone(),
        hashicorp_vault_secret_key: spec.hashicorp_vault_secret_key.clone(),
        cyberark_vault_query_string: spec.cyberark_vault_query_string.clone(),
        use_kerberos_authentication: spec.use_kerberos_authentication,
        use_engine_public_key: spec.use_engine_public_key,
        tags: spec.tags.clone(),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::fixtures::{immediate, mock_environment, previous_spec};
    use crate::schema::{HostSpec, SEALED_PREFIX};
    use dctkit::backend::{Call, Fault, MockBackend, Op};
    use dctkit::{JobStatus, PollConfig, Tag};

    fn existence() -> ExistencePoller {
        ExistencePoller::new(PollConfig::immediate(Some(3)))
    }

    fn stored(mock: &MockBackend) -> EnvironmentRecord {
        let jobs = immediate(mock);
        let resource = EnvironmentResource::new(mock, &jobs, existence());
        let ReadResult::Found(record) = resource.read("E1", &previous_spec().sealed(), None).unwrap()
        else {
            panic!("E1 should exist");
        };
        mock.clear_calls();
        record
    }

    fn declared() -> EnvironmentSpec {
        EnvironmentSpec {
            name: "oracle-dev".to_string(),
            engine_id: "2".to_string(),
            os_type: "UNIX".to_string(),
            username: Some("delphix".to_string()),
            password: Some("s3cret".to_string()),
            hosts: vec![HostSpec {
                hostname: "db01".to_string(),
                toolkit_path: Some("/opt/toolkit".to_string()),
                ..Default::default()
            }],
            tags: vec![Tag::new("team", "dba")],
            ..Default::default()
        }
    }

    #[test]
    fn test_create_reads_back_record() {
        let mock = MockBackend::new();
        let jobs = immediate(&mock);
        let resource = EnvironmentResource::new(&mock, &jobs, existence());

        let record = resource.create(&declared()).unwrap();
        assert_eq!(record.id, "env-1");
        assert_eq!(record.spec.name, "oracle-dev");
        assert_eq!(record.spec.hosts[0].toolkit_path.as_deref(), Some("/opt/toolkit"));
        assert_eq!(record.observed.hosts[0].os_name.as_deref(), Some("Linux"));
        assert!(record.observed.enabled);

        let password = record.spec.password.unwrap();
        assert!(password.starts_with(SEALED_PREFIX));
        assert!(!password.contains("s3cret"));
    }

    #[test]
    fn test_create_failed_job_is_an_error() {
        let mock = MockBackend::new();
        mock.fail(Op::CreateEnvironment, None, Fault::Job(JobStatus::Failed));
        let jobs = immediate(&mock);
        let resource = EnvironmentResource::new(&mock, &jobs, existence());

        let err = resource.create(&declared()).unwrap_err();
        assert!(matches!(err, ResourceError::Job(_)));
        assert!(err.to_string().contains("FAILED"));
        assert!(mock.environment("env-1").is_none());
    }

    #[test]
    fn test_create_continues_when_job_unobserved() {
        let mock = MockBackend::new();
        mock.fail(Op::GetJob, None, Fault::Api("timeout".to_string()));
        let jobs = immediate(&mock);
        let resource = EnvironmentResource::new(&mock, &jobs, existence());

        let record = resource.create(&declared()).unwrap();
        assert_eq!(record.spec.name, "oracle-dev");
    }

    #[test]
    fn test_create_params_use_first_host() {
        let mut spec = declared();
        spec.hosts.push(HostSpec {
            hostname: "db02".to_string(),
            ..Default::default()
        });
        let params = create_params(&spec);
        assert_eq!(params.hostname, "db01");
        assert_eq!(params.nfs_addresses, None);
        assert_eq!(params.is_cluster, None);
        assert_eq!(params.tags, vec![Tag::new("team", "dba")]);
    }

    #[test]
    fn test_reapply_after_create_has_no_changes() {
        let mock = MockBackend::new();
        let jobs = immediate(&mock);
        let resource = EnvironmentResource::new(&mock, &jobs, existence());
        let declared = declared();

        let record = resource.create(&declared).unwrap();
        assert_eq!(record.spec.hosts[0].ssh_port, Some(22));
        assert_eq!(record.spec.hosts[0].nfs_addresses, vec!["db01".to_string()]);

        let changes = EnvironmentResource::changes(&record, &declared).unwrap();
        assert!(changes.is_empty(), "{:?}", changes.fields().collect::<Vec<_>>());

        let ReadResult::Found(refreshed) = resource
            .read(&record.id, &record.spec, record.observed.user_ref.clone())
            .unwrap()
        else {
            panic!("{} should exist", record.id);
        };
        assert!(EnvironmentResource::changes(&refreshed, &declared).unwrap().is_empty());
    }

    #[test]
    fn test_reapply_after_create_sends_nothing() {
        let mock = MockBackend::new();
        let jobs = immediate(&mock);
        let resource = EnvironmentResource::new(&mock, &jobs, existence());
        let declared = declared();
        let record = resource.create(&declared).unwrap();
        mock.clear_calls();

        let report = resource.update(&record, &declared);
        assert!(report.error.is_none(), "{:?}", report.error);
        assert!(report.outcome.succeeded.is_empty());
        assert!(mock.mutations().is_empty(), "{:?}", mock.mutations());
        assert_eq!(report.record.unwrap().spec, record.spec);
    }

    #[test]
    fn test_connector_port_update_after_create_keeps_computed_host_fields() {
        let mock = MockBackend::new();
        let jobs = immediate(&mock);
        let resource = EnvironmentResource::new(&mock, &jobs, existence());
        let record = resource.create(&declared()).unwrap();

        let mut desired = declared();
        desired.connector_port = Some(9200);
        let changes = EnvironmentResource::changes(&record, &desired).unwrap();
        assert_eq!(changes.fields().collect::<Vec<_>>(), vec!["connector_port"]);

        let report = resource.update(&record, &desired);
        assert!(report.error.is_none(), "{:?}", report.error);
        let stored = report.record.unwrap();
        assert_eq!(stored.spec.connector_port, Some(9200));
        assert_eq!(stored.spec.hosts[0].ssh_port, Some(22));
        assert_eq!(stored.spec.hosts[0].nfs_addresses, vec!["db01".to_string()]);
        assert_eq!(
            mock.environment(&record.id).unwrap().hosts[0].nfs_addresses,
            vec!["db01".to_string()]
        );
    }

    #[test]
    fn test_failed_unset_keeps_previous_description() {
        let mock = mock_environment();
        let mut previous = stored(&mock);
        previous.spec.description = Some("primary".to_string());
        let mut desired = previous_spec();
        desired.description = None;

        let jobs = immediate(&mock);
        let report = EnvironmentResource::new(&mock, &jobs, existence()).update(&previous, &desired);
        assert!(report.error.unwrap().to_string().contains("description"));
        assert_eq!(
            report.record.unwrap().spec.description.as_deref(),
            Some("primary")
        );
    }

    #[test]
    fn test_read_missing_environment_is_gone() {
        let mock = MockBackend::new();
        let jobs = immediate(&mock);
        let resource = EnvironmentResource::new(&mock, &jobs, existence());

        let result = resource.read("E9", &declared(), None).unwrap();
        assert!(matches!(result, ReadResult::Gone));
    }

    #[test]
    fn test_read_resolves_username_from_user_ref() {
        let mock = mock_environment();
        let jobs = immediate(&mock);
        let resource = EnvironmentResource::new(&mock, &jobs, existence());

        let ReadResult::Found(record) = resource
            .read("E1", &previous_spec(), Some("u1".to_string()))
            .unwrap()
        else {
            panic!("E1 should exist");
        };
        assert_eq!(record.spec.username.as_deref(), Some("delphix"));
        assert_eq!(record.observed.user_ref.as_deref(), Some("u1"));
        assert_eq!(record.spec.password.as_deref(), Some("pw"));
    }

    #[test]
    fn test_update_name_only() {
        let mock = mock_environment();
        let previous = stored(&mock);
        let mut desired = previous_spec();
        desired.name = "y".to_string();

        let jobs = immediate(&mock);
        let report = EnvironmentResource::new(&mock, &jobs, existence()).update(&previous, &desired);
        assert!(report.error.is_none(), "{:?}", report.error);
        assert_eq!(report.record.unwrap().spec.name, "y");
    }

    #[test]
    fn test_update_rejected_field_keeps_previous_record() {
        let mock = mock_environment();
        let previous = stored(&mock);
        let mut desired = previous_spec();
        desired.os_type = "WINDOWS".to_string();

        let jobs = immediate(&mock);
        let report = EnvironmentResource::new(&mock, &jobs, existence()).update(&previous, &desired);
        assert!(matches!(
            report.error,
            Some(ResourceError::Update(UpdateError::Validation(_)))
        ));
        assert_eq!(report.record.as_ref(), Some(&previous));
        assert!(mock.calls().is_empty());
    }

    #[test]
    fn test_failed_update_reverts_then_resyncs() {
        let mock = mock_environment();
        let previous = stored(&mock);
        mock.fail(Op::UpdateEnvironment, None, Fault::Job(JobStatus::Canceled));
        let mut desired = previous_spec();
        desired.name = "y".to_string();
        desired.description = Some("primary".to_string());
        desired.tags = vec![Tag::new("B", "2"), Tag::new("C", "3")];

        let jobs = immediate(&mock);
        let report = EnvironmentResource::new(&mock, &jobs, existence()).update(&previous, &desired);

        assert!(report.error.is_some());
        let record = report.record.unwrap();
        assert_eq!(record.spec.name, "x");
        assert_eq!(record.spec.description, None);
        // tags were applied remotely, and the resync picks that up
        assert_eq!(record.spec.tags, vec![Tag::new("B", "2"), Tag::new("C", "3")]);
        assert_eq!(mock.calls().last(), Some(&Call::GetEnvironment("E1".to_string())));
    }

    #[test]
    fn test_missing_host_restores_previous_hosts() {
        let mock = mock_environment();
        let mut previous = stored(&mock);
        previous.spec.hosts[0].hostname = "h0".to_string();
        let mut desired = previous.spec.clone();
        desired.hosts[0].hostname = "h2".to_string();
        desired.password = Some("pw".to_string());

        let jobs = immediate(&mock);
        let report = EnvironmentResource::new(&mock, &jobs, existence()).update(&previous, &desired);

        assert!(report.error.unwrap().to_string().contains("h0"));
        assert_eq!(report.record.unwrap().spec.hosts[0].hostname, "h1");
        assert!(
            !mock
                .mutations()
                .iter()
                .any(|c| matches!(c, Call::UpdateHost { .. }))
        );
    }

    #[test]
    fn test_credential_update_records_user_ref() {
        let mock = mock_environment();
        let previous = stored(&mock);
        let mut desired = previous_spec();
        desired.username = Some("oracle".to_string());

        let jobs = immediate(&mock);
        let report = EnvironmentResource::new(&mock, &jobs, existence()).update(&previous, &desired);
        assert!(report.error.is_none(), "{:?}", report.error);
        let record = report.record.unwrap();
        assert_eq!(record.observed.user_ref.as_deref(), Some("U1"));
        assert_eq!(record.spec.username.as_deref(), Some("oracle"));
    }

    #[test]
    fn test_delete_waits_for_absence() {
        let mock = mock_environment();
        let jobs = immediate(&mock);
        let resource = EnvironmentResource::new(&mock, &jobs, existence());

        resource.delete("E1").unwrap();
        assert!(mock.environment("E1").is_none());
        assert_eq!(mock.mutations(), vec![Call::DeleteEnvironment("E1".to_string())]);
    }

    #[test]
    fn test_delete_failed_job() {
        let mock = mock_environment();
        mock.fail(Op::DeleteEnvironment, None, Fault::Job(JobStatus::Abandoned));
        let jobs = immediate(&mock);
        let resource = EnvironmentResource::new(&mock, &jobs, existence());

        let err = resource.delete("E1").unwrap_err();
        assert!(err.to_string().contains("ABANDONED"));
        assert!(mock.environment("E1").is_some());
    }

    #[test]
    fn test_delete_already_gone() {
        let mock = MockBackend::new();
        let jobs = immediate(&mock);
        EnvironmentResource::new(&mock, &jobs, existence())
            .delete("E9")
            .unwrap();
    }
}
