//! Field-level change sets between two observed/declared states

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Collapse a field path to its top-level field name.
///
/// `hosts.0.hostname`, `hosts[0]` and `tags.%` all belong to their top-level
/// collection and classify under it.
pub fn normalize_field(field: &str) -> &str {
    let end = field.find(['.', '[']).unwrap_or(field.len());
    &field[..end]
}

/// Kind of change for a single field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeKind {
    /// Field was unset and is now set
    Added,
    /// Field was set and is now unset
    Removed,
    /// Field value changed
    Modified,
}

/// Old and new value of one top-level field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldChange {
    /// Value before the change (`Null` when unset)
    pub old: Value,
    /// Value after the change (`Null` when unset)
    pub new: Value,
}

impl FieldChange {
    /// Classify this change
    pub fn kind(&self) -> ChangeKind {
        match (self.old.is_null(), self.new.is_null()) {
            (true, false) => ChangeKind::Added,
            (false, true) => ChangeKind::Removed,
            _ => ChangeKind::Modified,
        }
    }
}

/// Structured change set keyed by top-level field name.
///
/// Every entry differs between old and new; unchanged fields never appear.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChangeSet {
    changes: BTreeMap<String, FieldChange>,
}

impl ChangeSet {
    /// Create an empty change set
    pub fn new() -> Self {
        Self::default()
    }

    /// Diff two JSON objects by top-level key.
    ///
    /// Missing keys and explicit `null` are treated alike. Non-object inputs
    /// are treated as empty objects.
    pub fn between(old: &Value, new: &Value) -> Self {
        let empty = Map::new();
        let old = old.as_object().unwrap_or(&empty);
        let new = new.as_object().unwrap_or(&empty);

        let mut set = Self::new();
        for key in old.keys().chain(new.keys()) {
            let before = old.get(key).unwrap_or(&Value::Null);
            let after = new.get(key).unwrap_or(&Value::Null);
            if before != after {
                set.insert(key, before.clone(), after.clone());
            }
        }
        set
    }

    /// Record a change for `field`, normalized to its top-level name.
    ///
    /// Equal values are ignored. When the top-level field already has an
    /// entry, the first recorded change is kept.
    pub fn insert(&mut self, field: &str, old: Value, new: Value) {
        if old == new {
            return;
        }
        self.changes
            .entry(normalize_field(field).to_string())
            .or_insert(FieldChange { old, new });
    }

    /// Whether no field changed
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Number of changed fields
    pub fn len(&self) -> usize {
        self.changes.len()
    }

    /// Whether `field` (normalized) changed
    pub fn contains(&self, field: &str) -> bool {
        self.changes.contains_key(normalize_field(field))
    }

    /// Whether any of `fields` changed
    pub fn touches_any(&self, fields: &[&str]) -> bool {
        fields.iter().any(|f| self.contains(f))
    }

    /// Change recorded for `field`
    pub fn get(&self, field: &str) -> Option<&FieldChange> {
        self.changes.get(normalize_field(field))
    }

    /// Changed field names in sorted order
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.changes.keys().map(String::as_str)
    }

    /// Iterate over changes in field order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldChange)> {
        self.changes.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Restore the old value of every changed field in `target`.
    ///
    /// Fields whose old value was unset are removed. Non-object targets are
    /// left alone.
    pub fn revert(&self, target: &mut Value) {
        let Some(object) = target.as_object_mut() else {
            return;
        };
        for (field, change) in &self.changes {
            if change.old.is_null() {
                object.remove(field);
            } else {
                object.insert(field.clone(), change.old.clone());
            }
        }
    }

    /// Summary counts for display
    pub fn summary(&self) -> ChangeSummary {
        let mut summary = ChangeSummary::default();
        for change in self.changes.values() {
            match change.kind() {
                ChangeKind::Added => summary.additions += 1,
                ChangeKind::Removed => summary.removals += 1,
                ChangeKind::Modified => summary.modifications += 1,
            }
        }
        summary
    }
}

/// Change summary statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSummary {
    /// Fields being set
    pub additions: usize,
    /// Fields being unset
    pub removals: usize,
    /// Fields being modified
    pub modifications: usize,
}

impl ChangeSummary {
    /// Total number of changes
    pub fn total(&self) -> usize {
        self.additions + self.removals + self.modifications
    }

    /// Check if there are any changes
    pub fn has_changes(&self) -> bool {
        self.total() > 0
    }
}
