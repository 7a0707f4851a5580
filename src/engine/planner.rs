//! Update planning - partition a change set into batches

use declarative::{ChangeSet, FieldCapabilityTable, ValidationError, classify};
use std::fmt;

/// Independent groups of remote calls, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BatchKind {
    /// name, cluster_home, description
    Identity,
    /// username, password
    Credentials,
    /// first host attributes, connector_port
    Host,
    /// tag set
    Tags,
}

impl BatchKind {
    /// Fixed execution order
    pub const ORDER: [BatchKind; 4] = [
        BatchKind::Identity,
        BatchKind::Credentials,
        BatchKind::Host,
        BatchKind::Tags,
    ];

    /// Fields that trigger this batch
    pub fn fields(self) -> &'static [&'static str] {
        match self {
            BatchKind::Identity => &["name", "cluster_home", "description"],
            BatchKind::Credentials => &["username", "password"],
            BatchKind::Host => &["hosts", "connector_port"],
            BatchKind::Tags => &["tags"],
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            BatchKind::Identity => "identity",
            BatchKind::Credentials => "credentials",
            BatchKind::Host => "host",
            BatchKind::Tags => "tags",
        }
    }
}

impl fmt::Display for BatchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} batch", self.label())
    }
}

/// A classified change set, ready to execute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdatePlan {
    /// Batches to run, in execution order
    pub batches: Vec<BatchKind>,
    /// Whether dependents must be quiesced first
    pub destructive: bool,
    /// Changed fields that made the plan destructive
    pub destructive_fields: Vec<String>,
}

impl UpdatePlan {
    /// Classify `changes` and keep only the batches it touches.
    ///
    /// Fails before anything else if a changed field cannot be updated.
    pub fn build(
        changes: &ChangeSet,
        table: &FieldCapabilityTable,
    ) -> Result<Self, ValidationError> {
        let classification = classify(changes.fields(), table)?;

        let batches = BatchKind::ORDER
            .into_iter()
            .filter(|batch| changes.touches_any(batch.fields()))
            .collect();

        Ok(Self {
            batches,
            destructive: classification.destructive,
            destructive_fields: classification.destructive_fields,
        })
    }

    /// Whether the plan would make no remote calls
    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }

    pub fn includes(&self, batch: BatchKind) -> bool {
        self.batches.contains(&batch)
    }
}
