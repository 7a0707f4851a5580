//! Core types for control-plane objects and request parameters.

use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// Jobs
// =============================================================================

/// Status of an asynchronous job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    /// Queued, not yet running.
    Pending,
    /// Running.
    Started,
    /// The remote side gave up waiting on the job.
    Timedout,
    /// Finished with an error.
    Failed,
    /// Finished successfully.
    Completed,
    /// Cancelled by a user.
    Canceled,
    /// Abandoned by the engine.
    Abandoned,
}

impl JobStatus {
    /// Whether the poll loop stops on this status.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending | Self::Started)
    }

    /// Whether this is one of the terminal failure statuses.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            Self::Failed | Self::Canceled | Self::Abandoned | Self::Timedout
        )
    }

    /// Wire name of the status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Started => "STARTED",
            Self::Timedout => "TIMEDOUT",
            Self::Failed => "FAILED",
            Self::Completed => "COMPLETED",
            Self::Canceled => "CANCELED",
            Self::Abandoned => "ABANDONED",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An asynchronous job created by a mutating call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    /// Job identifier.
    pub id: String,
    /// Last observed status.
    pub status: JobStatus,
    /// Error reported by the remote side, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_details: Option<String>,
}

// =============================================================================
// Environments
// =============================================================================

/// A key/value tag.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Tag {
    /// Tag key.
    pub key: String,
    /// Tag value.
    #[serde(default)]
    pub value: String,
}

impl Tag {
    /// Create a tag.
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// A host belonging to an environment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Host {
    /// Host identifier.
    pub id: String,
    /// Hostname or IP address.
    pub hostname: String,
    /// SSH port.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssh_port: Option<i64>,
    /// Toolkit directory on the host.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub toolkit_path: Option<String>,
    /// Java home used by the connector.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub java_home: Option<String>,
    /// NFS addresses the engine uses to reach the host.
    #[serde(default)]
    pub nfs_addresses: Vec<String>,
    /// Operating system name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os_name: Option<String>,
    /// Operating system version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os_version: Option<String>,
    /// Memory size in bytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_size: Option<i64>,
    /// Whether the engine can reach the host.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub available: Option<bool>,
}

/// A database installation discovered on an environment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    /// Repository identifier.
    pub id: String,
    /// Repository name.
    #[serde(default)]
    pub name: String,
    /// Database type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_type: Option<String>,
    /// Database version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Whether provisioning is allowed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_provisioning: Option<bool>,
    /// Whether the repository is used for staging.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_staging: Option<bool>,
}

/// An environment as reported by the control plane.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Environment {
    /// Environment identifier.
    pub id: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Engine the environment is registered on.
    #[serde(default)]
    pub engine_id: String,
    /// Namespace reference (replicated environments).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    /// Namespace identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace_id: Option<String>,
    /// Namespace name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace_name: Option<String>,
    /// Whether this is a replica.
    #[serde(default)]
    pub is_replica: bool,
    /// Whether this is a cluster environment.
    #[serde(default)]
    pub is_cluster: bool,
    /// Whether the environment is enabled.
    #[serde(default)]
    pub enabled: bool,
    /// Whether this is a Windows target environment.
    #[serde(default)]
    pub is_windows_target: bool,
    /// Staging environment used by a Windows target.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub staging_environment: Option<String>,
    /// Cluster home directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_home: Option<String>,
    /// Hosts of the environment.
    #[serde(default)]
    pub hosts: Vec<Host>,
    /// Discovered repositories.
    #[serde(default)]
    pub repositories: Vec<Repository>,
    /// Tags.
    #[serde(default)]
    pub tags: Vec<Tag>,
}

impl Environment {
    /// Find a host by hostname.
    #[must_use]
    pub fn host_named(&self, hostname: &str) -> Option<&Host> {
        self.hosts.iter().find(|h| h.hostname == hostname)
    }
}

/// A user registered on an environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentUser {
    /// User reference.
    pub user_ref: String,
    /// OS username.
    pub username: String,
}

// =============================================================================
// Dependent objects
// =============================================================================

/// A virtual database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vdb {
    /// VDB identifier.
    pub id: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Environment the VDB runs on.
    #[serde(default)]
    pub environment_id: String,
    /// Whether the VDB is enabled.
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
}

/// A source (linked database) on an environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    /// Source identifier.
    pub id: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Environment the source lives on.
    #[serde(default)]
    pub environment_id: String,
}

/// A data source (dSource) backed by a source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DSource {
    /// dSource identifier.
    pub id: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Source this dSource ingests from.
    #[serde(default)]
    pub source_id: String,
    /// Whether the dSource is enabled.
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
}

fn enabled_by_default() -> bool {
    true
}

// =============================================================================
// Request parameters
// =============================================================================

/// Parameters for registering a new environment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentCreateParams {
    /// Engine to register on.
    pub engine_id: String,
    /// `UNIX` or `WINDOWS`.
    pub os_type: String,
    /// Hostname of the first host.
    pub hostname: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub toolkit_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssh_port: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub java_home: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nfs_addresses: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_cluster: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_target: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_home: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connector_port: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub staging_environment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vault: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hashicorp_vault_engine: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hashicorp_vault_secret_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hashicorp_vault_username_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hashicorp_vault_secret_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cyberark_vault_query_string: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_kerberos_authentication: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_engine_public_key: Option<bool>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Tag>,
}

/// Response to an environment registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedEnvironment {
    /// Identifier of the new environment.
    pub environment_id: String,
    /// Registration job.
    pub job: Job,
}

/// Identity/core attribute update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentUpdateParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_home: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl EnvironmentUpdateParams {
    /// Whether no attribute is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.cluster_home.is_none() && self.description.is_none()
    }
}

/// Environment user credential update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentUserParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

/// Host network configuration update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostUpdateParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssh_port: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub toolkit_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub java_home: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nfs_addresses: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connector_port: Option<i32>,
}
