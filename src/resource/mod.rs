//! Remote resources managed by hostenv
//!
//! Each resource exposes Create/Read/Update/Delete against a
//! [`dctkit::backend::Backend`] and returns the record to store locally.

pub mod capabilities;
pub mod environment;

use crate::engine::error::{Failure, UpdateError};

pub use environment::{EnvironmentResource, ReadResult, UpdateReport};

/// Why a lifecycle operation failed
#[derive(Debug, thiserror::Error)]
pub enum ResourceError {
    /// A remote call was rejected
    #[error("{step}: {source}")]
    Api {
        step: String,
        #[source]
        source: dctkit::Error,
    },

    /// A job ended in a failure status
    #[error("{0}")]
    Job(Failure),

    /// The update engine reported failures
    #[error(transparent)]
    Update(#[from] UpdateError),

    /// The environment no longer exists on the remote side
    #[error("environment {0} no longer exists")]
    Gone(String),

    #[error("could not encode environment: {0}")]
    Encode(#[from] serde_json::Error),
}

impl ResourceError {
    pub(crate) fn api(step: impl Into<String>, source: dctkit::Error) -> Self {
        Self::Api {
            step: step.into(),
            source,
        }
    }

    /// Advice for the user, when the failure has a known cause
    pub fn advice(&self) -> Option<&'static str> {
        match self {
            Self::Api { source, .. } => Some(source.category().advice()),
            Self::Update(e) if e.leaves_dependents_disabled() => {
                Some("Re-enable the listed VDBs and dSources before retrying")
            }
            _ => None,
        }
    }
}
