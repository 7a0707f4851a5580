//! Change classification against a capability table

use crate::capability::FieldCapabilityTable;
use crate::changeset::normalize_field;
use std::collections::BTreeSet;
use thiserror::Error;

/// One or more changed fields cannot be updated
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot update field(s): {}", fields.join(", "))]
pub struct ValidationError {
    /// Every offending field, sorted
    pub fields: Vec<String>,
}

/// Outcome of a successful classification
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classification {
    /// Whether dependents must be quiesced
    pub destructive: bool,
    /// Changed fields that are destructive, sorted
    pub destructive_fields: Vec<String>,
}

/// Classify a set of changed fields.
///
/// Field names are normalized to their top-level field first. Every field
/// that is not updatable is reported, not just the first.
pub fn classify<I, S>(
    changed_fields: I,
    table: &FieldCapabilityTable,
) -> Result<Classification, ValidationError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let fields: BTreeSet<String> = changed_fields
        .into_iter()
        .map(|f| normalize_field(f.as_ref()).to_string())
        .collect();

    let violations: Vec<String> = fields
        .iter()
        .filter(|f| !table.is_updatable(f))
        .cloned()
        .collect();
    if !violations.is_empty() {
        return Err(ValidationError { fields: violations });
    }

    let destructive_fields: Vec<String> = fields
        .into_iter()
        .filter(|f| table.is_destructive(f))
        .collect();

    Ok(Classification {
        destructive: !destructive_fields.is_empty(),
        destructive_fields,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> FieldCapabilityTable {
        FieldCapabilityTable::builder()
            .updatable(&["name", "description", "tags"])
            .destructive(&["cluster_home", "hosts", "username"])
            .create_only(&["engine_id"])
            .build()
    }

    #[test]
    fn test_non_destructive() {
        let result = classify(["name", "tags"], &table()).unwrap();
        assert!(!result.destructive);
        assert!(result.destructive_fields.is_empty());
    }

    #[test]
    fn test_destructive_when_any_field_is() {
        let result = classify(["name", "cluster_home"], &table()).unwrap();
        assert!(result.destructive);
        assert_eq!(result.destructive_fields, vec!["cluster_home"]);
    }

    #[test]
    fn test_reports_every_violation() {
        let err = classify(["os_type", "name", "engine_id"], &table()).unwrap_err();
        assert_eq!(err.fields, vec!["engine_id", "os_type"]);
        let display = err.to_string();
        assert!(display.contains("engine_id"));
        assert!(display.contains("os_type"));
    }

    #[test]
    fn test_nested_paths_collapse() {
        let result = classify(
            ["hosts.0.hostname", "hosts.0.ssh_port", "tags.1.key"],
            &table(),
        )
        .unwrap();
        assert_eq!(result.destructive_fields, vec!["hosts"]);
    }

    #[test]
    fn test_empty_set() {
        let result = classify(Vec::<String>::new(), &table()).unwrap();
        assert_eq!(result, Classification::default());
    }
}
