//! # dctkit
//!
//! Blocking client for a data-virtualization control plane.
//!
//! This crate provides:
//! - The [`Backend`](backend::Backend) trait covering environments, hosts,
//!   users, tags, dependent databases and jobs
//! - An HTTPS implementation and an in-memory mock for tests
//! - [`JobPoller`] and [`ExistencePoller`] for waiting on asynchronous work
//! - Bounded retry for idempotent reads
//!
//! ## Example
//!
//! ```no_run
//! use dctkit::backend::Backend;
//! use dctkit::backend::http::{HttpBackend, HttpConfig};
//! use dctkit::{JobPoller, PollConfig, RetryConfig};
//! use std::time::Duration;
//!
//! let backend = HttpBackend::new(HttpConfig {
//!     base_url: "https://dct.example.com/v3".to_string(),
//!     api_key: "1.secret".to_string(),
//!     timeout: Duration::from_secs(30),
//!     retry: RetryConfig::default(),
//! });
//!
//! let job = backend.disable_vdb("1-VDB-4").unwrap();
//! let outcome = JobPoller::new(&backend, PollConfig::jobs()).poll(&job.id);
//! println!("{:?}", outcome.status());
//! ```

#![warn(clippy::all)]

pub mod backend;
pub mod error;
pub mod poll;
pub mod retry;
pub mod types;

pub use error::{Error, ErrorCategory, Result};
pub use poll::{ExistencePoller, JobOutcome, JobPoller, PollConfig, PollObserver};
pub use retry::RetryConfig;
pub use types::{
    CreatedEnvironment, DSource, Environment, EnvironmentCreateParams, EnvironmentUpdateParams,
    EnvironmentUser, EnvironmentUserParams, Host, HostUpdateParams, Job, JobStatus, Repository,
    Source, Tag, Vdb,
};
