//! Update capabilities of managed entity types

use clap::ValueEnum;
use declarative::FieldCapabilityTable;

/// Entity types with a capability table
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum EntityKind {
    Environment,
    Vdb,
}

impl EntityKind {
    /// Capability table for this kind
    pub fn capabilities(self) -> FieldCapabilityTable {
        match self {
            Self::Environment => environment_capabilities(),
            Self::Vdb => vdb_capabilities(),
        }
    }
}

/// Environment fields.
///
/// Repository-level settings (allow_provisioning, is_staging, version,
/// oracle_base, bits) are accepted as in-place updates.
pub fn environment_capabilities() -> FieldCapabilityTable {
    FieldCapabilityTable::builder()
        .updatable(&[
            "name",
            "description",
            "tags",
            "allow_provisioning",
            "is_staging",
            "version",
            "oracle_base",
            "bits",
        ])
        .destructive(&[
            "cluster_home",
            "connector_port",
            "username",
            "password",
            "hosts",
        ])
        .create_only(&[
            "engine_id",
            "os_type",
            "is_cluster",
            "is_target",
            "staging_environment",
            "vault",
            "hashicorp_vault_engine",
            "hashicorp_vault_secret_path",
            "hashicorp_vault_username_key",
            "hashicorp_vault_secret_key",
            "cyberark_vault_query_string",
            "use_kerberos_authentication",
            "use_engine_public_key",
            "ase_db_vault",
            "ase_db_username",
            "ase_db_password",
            "dsp_keystore_path",
            "dsp_keystore_password",
            "dsp_keystore_alias",
            "dsp_truststore_path",
            "dsp_truststore_password",
        ])
        .build()
}

/// Virtual database fields.
pub fn vdb_capabilities() -> FieldCapabilityTable {
    FieldCapabilityTable::builder()
        .updatable(&[
            "name",
            "db_username",
            "db_password",
            "pre_refresh",
            "post_refresh",
            "configure_clone",
            "pre_snapshot",
            "post_snapshot",
            "pre_rollback",
            "post_rollback",
            "pre_start",
            "post_start",
            "pre_stop",
            "post_stop",
            "pre_script",
            "post_script",
            "custom_env_vars",
            "custom_env_files",
            "additional_mount_points",
            "listener_ids",
            "vdb_restart",
            "new_dbid",
            "tags",
        ])
        .destructive(&[
            "template_id",
            "appdata_source_params",
            "config_params",
            "cdb_tde_keystore_password",
            "target_vcdb_tde_keystore_path",
            "tde_key_identifier",
            "parent_tde_keystore_password",
            "parent_tde_keystore_path",
            "cdc_on_provision",
            "environment_user_id",
            "mount_point",
        ])
        .build()
}
