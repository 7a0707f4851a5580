use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use dctkit::{Environment, Repository};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::schema::EnvironmentSpec;

// ============================================================================
// State Structures
// ============================================================================

/// Everything hostenv knows about the environments it manages
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct HostenvState {
    /// Managed environments keyed by declared name
    #[serde(default)]
    pub environments: BTreeMap<String, EnvironmentRecord>,

    /// Last time the state was updated
    pub last_updated: DateTime<Utc>,
}

/// Last known state of one environment
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct EnvironmentRecord {
    /// Remote identifier
    pub id: String,

    /// Declared attributes as last applied and resynced (password sealed)
    pub spec: EnvironmentSpec,

    /// Read-only attributes reported by the remote side
    #[serde(default)]
    pub observed: ObservedEnvironment,

    /// Last time this record was written
    pub last_updated: DateTime<Utc>,
}

/// Attributes only the remote side populates
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct ObservedEnvironment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace_name: Option<String>,
    #[serde(default)]
    pub is_replica: bool,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub is_windows_target: bool,
    /// User reference recorded by a credential update
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_ref: Option<String>,
    #[serde(default)]
    pub hosts: Vec<ObservedHost>,
    #[serde(default)]
    pub repositories: Vec<Repository>,
}

/// Computed host attributes
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct ObservedHost {
    pub id: String,
    pub hostname: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_size: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub available: Option<bool>,
}

impl ObservedEnvironment {
    /// Map the read-only part of a remote environment, keeping `user_ref`.
    pub fn from_remote(remote: &Environment, user_ref: Option<String>) -> Self {
        Self {
            namespace: remote.namespace.clone(),
            namespace_id: remote.namespace_id.clone(),
            namespace_name: remote.namespace_name.clone(),
            is_replica: remote.is_replica,
            enabled: remote.enabled,
            is_windows_target: remote.is_windows_target,
            user_ref,
            hosts: remote
                .hosts
                .iter()
                .map(|h| ObservedHost {
                    id: h.id.clone(),
                    hostname: h.hostname.clone(),
                    os_name: h.os_name.clone(),
                    os_version: h.os_version.clone(),
                    memory_size: h.memory_size,
                    available: h.available,
                })
                .collect(),
            repositories: remote.repositories.clone(),
        }
    }
}

// ============================================================================
// HostenvState Implementation
// ============================================================================

impl Default for HostenvState {
    fn default() -> Self {
        Self {
            environments: BTreeMap::new(),
            last_updated: Utc::now(),
        }
    }
}

impl HostenvState {
    /// Get the state file path inside a state directory
    pub fn state_file(state_dir: &Path) -> PathBuf {
        state_dir.join("state.toml")
    }

    /// Load state from disk, or return default if file doesn't exist
    pub fn load(state_dir: &Path) -> Result<Self> {
        let path = Self::state_file(state_dir);

        if !path.exists() {
            log::debug!("State file does not exist, using default state");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read state file: {}", path.display()))?;

        let state: HostenvState = toml::from_str(&content)
            .with_context(|| format!("Failed to parse state file: {}", path.display()))?;

        log::debug!("Loaded state from {}", path.display());
        Ok(state)
    }

    /// Save state to disk
    pub fn save(&self, state_dir: &Path) -> Result<()> {
        fs::create_dir_all(state_dir).with_context(|| {
            format!(
                "Failed to create state directory: {}",
                state_dir.display()
            )
        })?;

        let path = Self::state_file(state_dir);
        let content = toml::to_string_pretty(&self).context("Failed to serialize state to TOML")?;

        fs::write(&path, &content)
            .with_context(|| format!("Failed to write state file: {}", path.display()))?;

        log::debug!("Saved state to {}", path.display());
        Ok(())
    }

    /// Look up an environment by declared name
    pub fn get(&self, name: &str) -> Option<&EnvironmentRecord> {
        self.environments.get(name)
    }

    /// Find the record a declaration refers to.
    ///
    /// Matches by name first. A renamed declaration still matches the record
    /// registered on the same engine with the same first host.
    pub fn find_for(&self, spec: &EnvironmentSpec) -> Option<&EnvironmentRecord> {
        self.environments.get(&spec.name).or_else(|| {
            let hostname = spec.primary_host().map(|h| h.hostname.as_str());
            self.environments.values().find(|record| {
                record.spec.engine_id == spec.engine_id
                    && hostname.is_some()
                    && record.spec.primary_host().map(|h| h.hostname.as_str()) == hostname
            })
        })
    }

    /// Insert or replace a record under its declared name.
    ///
    /// A rename moves the record to the new key.
    pub fn upsert(&mut self, previous_name: &str, mut record: EnvironmentRecord) {
        self.environments.remove(previous_name);
        record.last_updated = Utc::now();
        self.last_updated = record.last_updated;
        self.environments.insert(record.spec.name.clone(), record);
    }

    /// Forget an environment
    pub fn remove(&mut self, name: &str) -> Option<EnvironmentRecord> {
        let removed = self.environments.remove(name);
        if removed.is_some() {
            self.last_updated = Utc::now();
        }
        removed
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::HostSpec;

    fn record(name: &str) -> EnvironmentRecord {
        EnvironmentRecord {
            id: "1-ENV".to_string(),
            spec: EnvironmentSpec {
                name: name.to_string(),
                engine_id: "2".to_string(),
                os_type: "UNIX".to_string(),
                hosts: vec![HostSpec {
                    hostname: "h1".to_string(),
                    ..Default::default()
                }],
                ..Default::default()
            },
            observed: ObservedEnvironment {
                enabled: true,
                hosts: vec![ObservedHost {
                    id: "1-HOST".to_string(),
                    hostname: "h1".to_string(),
                    ..Default::default()
                }],
                ..Default::default()
            },
            last_updated: Utc::now(),
        }
    }

    #[test]
    fn test_default_state() {
        let state = HostenvState::default();
        assert!(state.environments.is_empty());
    }

    #[test]
    fn test_load_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let state = HostenvState::load(dir.path()).unwrap();
        assert!(state.environments.is_empty());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let mut state = HostenvState::default();
        state.upsert("dev", record("dev"));
        state.save(dir.path()).unwrap();

        let loaded = HostenvState::load(dir.path()).unwrap();
        let loaded_record = loaded.get("dev").unwrap();
        assert_eq!(loaded_record.id, "1-ENV");
        assert_eq!(loaded_record.observed.hosts[0].id, "1-HOST");
        assert_eq!(loaded_record.spec.hosts[0].hostname, "h1");
    }

    #[test]
    fn test_upsert_rename_moves_key() {
        let mut state = HostenvState::default();
        state.upsert("dev", record("dev"));
        state.upsert("dev", record("dev2"));

        assert!(state.get("dev").is_none());
        assert!(state.get("dev2").is_some());
        assert_eq!(state.environments.len(), 1);
    }

    #[test]
    fn test_find_for_renamed_declaration() {
        let mut state = HostenvState::default();
        state.upsert("dev", record("dev"));

        let renamed = record("dev-renamed").spec;
        assert_eq!(state.find_for(&renamed).map(|r| r.id.as_str()), Some("1-ENV"));

        let mut elsewhere = record("other").spec;
        elsewhere.hosts[0].hostname = "h9".to_string();
        assert!(state.find_for(&elsewhere).is_none());
    }

    #[test]
    fn test_remove() {
        let mut state = HostenvState::default();
        state.upsert("dev", record("dev"));
        assert!(state.remove("dev").is_some());
        assert!(state.remove("dev").is_none());
    }
}
