//! Per-field update capabilities

use crate::changeset::normalize_field;
use std::collections::BTreeMap;

/// What may happen when a field changes after creation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldCapability {
    /// Can be changed in place
    Updatable,
    /// Can be changed, but dependents must be quiesced first
    Destructive,
    /// Set at creation only
    CreateOnly,
}

/// Immutable lookup of which fields may change and which are destructive.
///
/// A field with no entry is not updatable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldCapabilityTable {
    updatable: BTreeMap<String, bool>,
    destructive: BTreeMap<String, bool>,
}

impl FieldCapabilityTable {
    /// Start building a table
    pub fn builder() -> FieldCapabilityTableBuilder {
        FieldCapabilityTableBuilder::default()
    }

    /// Whether a change to `field` is permitted
    pub fn is_updatable(&self, field: &str) -> bool {
        self.updatable
            .get(normalize_field(field))
            .copied()
            .unwrap_or(false)
    }

    /// Whether a change to `field` requires quiescing dependents
    pub fn is_destructive(&self, field: &str) -> bool {
        self.destructive
            .get(normalize_field(field))
            .copied()
            .unwrap_or(false)
    }

    /// Whether `field` has an entry at all
    pub fn knows(&self, field: &str) -> bool {
        self.updatable.contains_key(normalize_field(field))
    }

    /// Capability of `field`, `None` if unknown
    pub fn capability(&self, field: &str) -> Option<FieldCapability> {
        let updatable = *self.updatable.get(normalize_field(field))?;
        Some(match (updatable, self.is_destructive(field)) {
            (false, _) => FieldCapability::CreateOnly,
            (true, true) => FieldCapability::Destructive,
            (true, false) => FieldCapability::Updatable,
        })
    }

    /// All fields with an entry, sorted
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.updatable.keys().map(String::as_str)
    }
}

/// Builder for [`FieldCapabilityTable`]
#[derive(Debug, Default)]
pub struct FieldCapabilityTableBuilder {
    table: FieldCapabilityTable,
}

impl FieldCapabilityTableBuilder {
    /// Add a field with the given capability
    pub fn field(mut self, name: &str, capability: FieldCapability) -> Self {
        let (updatable, destructive) = match capability {
            FieldCapability::Updatable => (true, false),
            FieldCapability::Destructive => (true, true),
            FieldCapability::CreateOnly => (false, false),
        };
        self.table.updatable.insert(name.to_string(), updatable);
        self.table.destructive.insert(name.to_string(), destructive);
        self
    }

    /// Add fields that update in place
    pub fn updatable(self, names: &[&str]) -> Self {
        names
            .iter()
            .fold(self, |b, n| b.field(n, FieldCapability::Updatable))
    }

    /// Add fields that update only with dependents quiesced
    pub fn destructive(self, names: &[&str]) -> Self {
        names
            .iter()
            .fold(self, |b, n| b.field(n, FieldCapability::Destructive))
    }

    /// Add fields that are set at creation only
    pub fn create_only(self, names: &[&str]) -> Self {
        names
            .iter()
            .fold(self, |b, n| b.field(n, FieldCapability::CreateOnly))
    }

    /// Finish the table
    pub fn build(self) -> FieldCapabilityTable {
        self.table
    }
}
