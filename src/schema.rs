use anyhow::{Context, Result, bail};
use dctkit::{Environment, Tag};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Prefix marking a password that has been replaced by its hash.
pub const SEALED_PREFIX: &str = "blake3:";

// ============================================================================
// Declared Environment
// ============================================================================

/// A declared environment file: one `[environment]` table.
#[derive(Debug, Serialize, Deserialize)]
pub struct EnvironmentFile {
    pub environment: EnvironmentSpec,
}

impl EnvironmentFile {
    /// Load and validate a declared environment.
    pub fn load(path: &Path) -> Result<EnvironmentSpec> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Could not read {}", path.display()))?;
        let file: Self = toml::from_str(&content)
            .with_context(|| format!("Invalid environment file: {}", path.display()))?;
        let spec = file.environment.normalized();
        spec.validate()?;
        Ok(spec)
    }
}

/// Desired state of an environment.
///
/// Serialized field names are the names the capability table and the change
/// set use.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentSpec {
    pub name: String,
    pub engine_id: String,
    #[serde(default = "default_os_type")]
    pub os_type: String,
    #[serde(default)]
    pub is_cluster: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_target: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_home: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub staging_environment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connector_port: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Write-only; the remote side never returns it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    // Vault credentials (create only)
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

    #[serde(default)]
    pub hosts: Vec<HostSpec>,
    #[serde(default)]
    pub tags: Vec<Tag>,
}

/// Declared host attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostSpec {
    pub hostname: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssh_port: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub toolkit_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub java_home: Option<String>,
    #[serde(default)]
    pub nfs_addresses: Vec<String>,
}

fn default_os_type() -> String {
    "UNIX".to_string()
}

impl EnvironmentSpec {
    /// Tags sorted and deduplicated, so tag order never shows up as a change.
    pub fn normalized(mut self) -> Self {
        self.tags.sort();
        self.tags.dedup();
        self
    }

    /// Check the declaration is complete enough to register.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            bail!("environment name must not be empty");
        }
        if self.engine_id.trim().is_empty() {
            bail!("environment '{}': engine_id is required", self.name);
        }
        if !matches!(self.os_type.as_str(), "UNIX" | "WINDOWS") {
            bail!(
                "environment '{}': os_type must be UNIX or WINDOWS, got '{}'",
                self.name,
                self.os_type
            );
        }
        if self.hosts.is_empty() {
            bail!("environment '{}': at least one host is required", self.name);
        }
        if let Some(host) = self.hosts.iter().find(|h| h.hostname.trim().is_empty()) {
            bail!(
                "environment '{}': host hostname must not be empty ({host:?})",
                self.name
            );
        }
        Ok(())
    }

    /// The host the lifecycle operates on.
    pub fn primary_host(&self) -> Option<&HostSpec> {
        self.hosts.first()
    }

    /// Copy with the password replaced by its hash.
    ///
    /// Sealing an already sealed spec is a no-op, so stored and declared
    /// specs compare equal when the password is unchanged.
    pub fn sealed(&self) -> Self {
        let mut sealed = self.clone();
        sealed.password = self.password.as_deref().map(seal);
        sealed
    }

    /// Copy with the host attributes the remote side computes (SSH port, NFS
    /// addresses) taken from `stored` wherever this declaration leaves them
    /// out. Hosts are paired by position.
    pub fn with_computed_from(&self, stored: &Self) -> Self {
        let mut filled = self.clone();
        for (host, known) in filled.hosts.iter_mut().zip(&stored.hosts) {
            if host.ssh_port.is_none() {
                host.ssh_port = known.ssh_port;
            }
            if host.nfs_addresses.is_empty() {
                host.nfs_addresses.clone_from(&known.nfs_addresses);
            }
        }
        filled
    }

    /// Overlay the attributes the remote side reports.
    ///
    /// Fields the remote never returns (description, credentials, create-only
    /// vault settings) keep their current value.
    pub fn overlay_remote(&mut self, remote: &Environment) {
        self.name.clone_from(&remote.name);
        if !remote.engine_id.is_empty() {
            self.engine_id.clone_from(&remote.engine_id);
        }
        self.is_cluster = remote.is_cluster;
        self.cluster_home.clone_from(&remote.cluster_home);
        self.staging_environment
            .clone_from(&remote.staging_environment);
        self.hosts = remote.hosts.iter().map(HostSpec::from).collect();
        self.tags.clone_from(&remote.tags);
        self.tags.sort();
        self.tags.dedup();
    }
}

impl From<&dctkit::Host> for HostSpec {
    fn from(host: &dctkit::Host) -> Self {
        Self {
            hostname: host.hostname.clone(),
            ssh_port: host.ssh_port,
            toolkit_path: host.toolkit_path.clone(),
            java_home: host.java_home.clone(),
            nfs_addresses: host.nfs_addresses.clone(),
        }
    }
}

/// Hash a password for storage.
pub fn seal(password: &str) -> String {
    if password.starts_with(SEALED_PREFIX) {
        return password.to_string();
    }
    format!("{SEALED_PREFIX}{}", blake3::hash(password.as_bytes()).to_hex())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const EXAMPLE: &str = r#"
[environment]
name = "oracle-dev"
engine_id = "2"
cluster_home = "/u01/grid"
username = "delphix"
password = "s3cret"

[[environment.hosts]]
hostname = "db01.example.com"
ssh_port = 22
toolkit_path = "/opt/delphix/toolkit"
nfs_addresses = ["10.0.0.5"]

[[environment.tags]]
key = "team"
value = "dba"

[[environment.tags]]
key = "env"
value = "dev"
"#;

    fn example() -> EnvironmentSpec {
        let file: EnvironmentFile = toml::from_str(EXAMPLE).unwrap();
        file.environment.normalized()
    }

    #[test]
    fn test_parse_example_environment() {
        let spec = example();
        assert_eq!(spec.name, "oracle-dev");
        assert_eq!(spec.os_type, "UNIX");
        assert_eq!(spec.hosts.len(), 1);
        assert_eq!(spec.primary_host().unwrap().ssh_port, Some(22));
        assert!(spec.validate().is_ok());
    }

    #[test]
    fn test_tags_are_sorted() {
        let spec = example();
        assert_eq!(spec.tags[0].key, "env");
        assert_eq!(spec.tags[1].key, "team");
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("env.toml");
        std::fs::write(&path, EXAMPLE).unwrap();

        let spec = EnvironmentFile::load(&path).unwrap();
        assert_eq!(spec.engine_id, "2");
    }

    #[test]
    fn test_validate_rejects_missing_host() {
        let mut spec = example();
        spec.hosts.clear();
        assert!(spec.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_os_type() {
        let mut spec = example();
        spec.os_type = "VMS".to_string();
        let err = spec.validate().unwrap_err().to_string();
        assert!(err.contains("os_type"));
    }

    #[test]
    fn test_seal_is_idempotent_and_hides_password() {
        let spec = example();
        let sealed = spec.sealed();
        let password = sealed.password.clone().unwrap();
        assert!(password.starts_with(SEALED_PREFIX));
        assert!(!password.contains("s3cret"));
        assert_eq!(sealed.sealed(), sealed);
    }

    #[test]
    fn test_computed_host_fields_filled_from_stored() {
        let mut stored = example();
        stored.hosts[0].ssh_port = Some(2222);
        stored.hosts[0].nfs_addresses = vec!["10.0.0.9".to_string()];

        let mut declared = example();
        declared.hosts[0].ssh_port = None;
        declared.hosts[0].nfs_addresses.clear();
        declared.hosts[0].java_home = Some("/usr/java".to_string());

        let filled = declared.with_computed_from(&stored);
        assert_eq!(filled.hosts[0].ssh_port, Some(2222));
        assert_eq!(filled.hosts[0].nfs_addresses, vec!["10.0.0.9".to_string()]);
        assert_eq!(filled.hosts[0].java_home.as_deref(), Some("/usr/java"));

        // declared values win
        let filled = example().with_computed_from(&stored);
        assert_eq!(filled.hosts[0].ssh_port, Some(22));
        assert_eq!(filled.hosts[0].nfs_addresses, vec!["10.0.0.5".to_string()]);
    }

    #[test]
    fn test_overlay_remote_keeps_write_only_fields() {
        let mut spec = example();
        let remote = Environment {
            id: "1-ENV".to_string(),
            name: "renamed".to_string(),
            engine_id: "2".to_string(),
            cluster_home: Some("/u02/grid".to_string()),
            hosts: vec![dctkit::Host {
                id: "1-HOST".to_string(),
                hostname: "db02.example.com".to_string(),
                ..Default::default()
            }],
            tags: vec![Tag::new("b", "2"), Tag::new("a", "1")],
            ..Default::default()
        };

        spec.overlay_remote(&remote);
        assert_eq!(spec.name, "renamed");
        assert_eq!(spec.cluster_home.as_deref(), Some("/u02/grid"));
        assert_eq!(spec.hosts[0].hostname, "db02.example.com");
        assert_eq!(spec.tags[0].key, "a");
        assert_eq!(spec.password.as_deref(), Some("s3cret"));
        assert_eq!(spec.username.as_deref(), Some("delphix"));
    }
}
