//! Error types for control-plane operations.
//!
//! Errors are categorized so callers can decide whether a failed call is
//! worth retrying and what to tell the user. HTTP status codes from the
//! remote API are folded into the categories here.

use std::fmt;

/// Result type alias for control-plane operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Categories of control-plane errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Transport failures and 5xx responses (transient, retryable).
    Network,
    /// The requested object does not exist.
    NotFound,
    /// Credentials were rejected.
    Auth,
    /// The remote side refused the change because of its current state.
    Conflict,
    /// The response could not be decoded.
    Format,
    /// Other/unknown errors.
    Other,
}

impl ErrorCategory {
    /// Whether this error category is typically transient and worth retrying.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network)
    }

    /// Get a user-friendly description of this error category.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::Network => "Network connectivity issue",
            Self::NotFound => "Object not found",
            Self::Auth => "Authentication failed",
            Self::Conflict => "Conflicting remote state",
            Self::Format => "Unexpected response format",
            Self::Other => "Unexpected error",
        }
    }

    /// Get actionable advice for resolving this error category.
    #[must_use]
    pub fn advice(&self) -> &'static str {
        match self {
            Self::Network => "Check connectivity to the control plane and try again",
            Self::NotFound => "The object may have been deleted outside of hostenv",
            Self::Auth => "Verify the API key (DCT_API_KEY) is valid",
            Self::Conflict => "Wait for running jobs on the object to finish, then retry",
            Self::Format => "The control plane version may be unsupported",
            Self::Other => "Check the error details for more information",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Errors that can occur while talking to the control plane.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Request failed with an HTTP status or a transport error.
    #[error("HTTP request failed: {message}")]
    Http {
        /// Error message.
        message: String,
        /// HTTP status code if available.
        status: Option<u16>,
    },

    /// Object does not exist on the remote side.
    #[error("not found: {0}")]
    NotFound(String),

    /// API key rejected.
    #[error("authentication failed (HTTP {status})")]
    Unauthorized {
        /// HTTP status code (401 or 403).
        status: u16,
    },

    /// Remote side rejected the request because of its current state.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Response body could not be decoded.
    #[error("invalid API response: {0}")]
    InvalidResponse(String),

    /// A job never reached a terminal status within the configured poll budget.
    #[error("job {job_id} still running after {polls} polls")]
    PollExhausted {
        /// Job being polled.
        job_id: String,
        /// Number of polls made.
        polls: u32,
    },

    /// An object was still present after waiting for its deletion.
    #[error("{0} still exists after waiting for deletion")]
    StillPresent(String),

    /// Mock backend injected failure.
    #[error("{0}")]
    Injected(String),

    /// Generic error.
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an HTTP error.
    pub fn http(message: impl Into<String>, status: Option<u16>) -> Self {
        Self::Http {
            message: message.into(),
            status,
        }
    }

    /// Get the error category for retry logic.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Http { status, .. } => match status {
                Some(code) if *code < 500 => ErrorCategory::Other,
                _ => ErrorCategory::Network,
            },
            Error::NotFound(_) => ErrorCategory::NotFound,
            Error::Unauthorized { .. } => ErrorCategory::Auth,
            Error::Conflict(_) => ErrorCategory::Conflict,
            Error::InvalidResponse(_) => ErrorCategory::Format,
            Error::PollExhausted { .. } | Error::StillPresent(_) => ErrorCategory::Other,
            Error::Injected(_) | Error::Other(_) => ErrorCategory::Other,
        }
    }

    /// Whether this error is typically transient and worth retrying.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.category().is_retryable()
    }

    /// Whether the remote side reported the object as absent.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }
}

impl From<ureq::Error> for Error {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::StatusCode(404) => Self::NotFound("HTTP 404".to_string()),
            ureq::Error::StatusCode(code @ (401 | 403)) => Self::Unauthorized { status: code },
            ureq::Error::StatusCode(409) => Self::Conflict("HTTP 409".to_string()),
            ureq::Error::StatusCode(code) => Self::Http {
                message: format!("HTTP {code}"),
                status: Some(code),
            },
            ureq::Error::Json(e) => Self::InvalidResponse(e.to_string()),
            other => Self::Http {
                message: other.to_string(),
                status: None,
            },
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidResponse(err.to_string())
    }
}
