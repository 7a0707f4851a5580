//! Dependency quiescing - disable and re-enable dependents of an environment
//!
//! Virtual databases are disabled before dSources, and re-enabled after
//! them. Only dependents that were enabled beforehand are re-enabled, so a
//! VDB someone had switched off stays off.

use dctkit::backend::Backend;
use dctkit::{DSource, JobPoller, Vdb};

use super::await_job;
use super::error::{Failure, UpdateError};

/// Dependents bound to an environment
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dependents {
    pub vdbs: Vec<Vdb>,
    pub dsources: Vec<DSource>,
}

/// Dependents this run disabled and must re-enable
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Quiesced {
    pub vdbs: Vec<String>,
    pub dsources: Vec<String>,
}

impl Quiesced {
    pub fn is_empty(&self) -> bool {
        self.vdbs.is_empty() && self.dsources.is_empty()
    }
}

pub struct DependencyQuiescer<'a> {
    backend: &'a dyn Backend,
    jobs: &'a JobPoller<'a>,
}

impl<'a> DependencyQuiescer<'a> {
    pub fn new(backend: &'a dyn Backend, jobs: &'a JobPoller<'a>) -> Self {
        Self { backend, jobs }
    }

    /// List VDBs on the environment, then the dSources behind its sources.
    pub fn discover(&self, environment_id: &str) -> Result<Dependents, Failure> {
        let vdbs = self
            .backend
            .list_vdbs_by_environment(environment_id)
            .map_err(|e| Failure::new("list vdbs", e.to_string()))?;

        let sources = self
            .backend
            .list_sources_by_environment(environment_id)
            .map_err(|e| Failure::new("list sources", e.to_string()))?;
        let source_ids: Vec<String> = sources.into_iter().map(|s| s.id).collect();

        let dsources = if source_ids.is_empty() {
            Vec::new()
        } else {
            self.backend
                .search_dsources(&source_ids)
                .map_err(|e| Failure::new("search dsources", e.to_string()))?
        };

        log::info!(
            "Environment {environment_id} has {} vdb(s) and {} dsource(s)",
            vdbs.len(),
            dsources.len()
        );
        Ok(Dependents { vdbs, dsources })
    }

    /// Disable every dependent of the environment.
    ///
    /// A VDB failure stops immediately and re-enables the VDBs already
    /// disabled. A dSource failure lets the remaining dSources be attempted,
    /// then re-enables everything this call disabled. Either way the error
    /// is returned and no update batch should run.
    pub fn disable_all(&self, environment_id: &str) -> Result<Quiesced, UpdateError> {
        let dependents = self
            .discover(environment_id)
            .map_err(|f| UpdateError::DependencyQuiesce {
                failures: vec![f],
                compensation: Vec::new(),
            })?;

        let mut quiesced = Quiesced::default();

        for vdb in &dependents.vdbs {
            if let Err(failure) = self.disable_vdb(&vdb.id) {
                log::error!("{failure}");
                let compensation = self.enable_all(&quiesced);
                return Err(UpdateError::DependencyQuiesce {
                    failures: vec![failure],
                    compensation,
                });
            }
            if vdb.enabled {
                quiesced.vdbs.push(vdb.id.clone());
            }
        }

        let mut failures = Vec::new();
        for dsource in &dependents.dsources {
            match self.disable_dsource(&dsource.id) {
                Ok(()) if dsource.enabled => quiesced.dsources.push(dsource.id.clone()),
                Ok(()) => {}
                Err(failure) => {
                    log::error!("{failure}");
                    failures.push(failure);
                }
            }
        }

        if !failures.is_empty() {
            let compensation = self.enable_all(&quiesced);
            return Err(UpdateError::DependencyQuiesce {
                failures,
                compensation,
            });
        }

        Ok(quiesced)
    }

    /// Re-enable dSources, then VDBs. Every enable is attempted.
    pub fn enable_all(&self, quiesced: &Quiesced) -> Vec<Failure> {
        let mut failures = Vec::new();
        for id in &quiesced.dsources {
            if let Err(failure) = self.enable_dsource(id) {
                log::error!("{failure}");
                failures.push(failure);
            }
        }
        for id in &quiesced.vdbs {
            if let Err(failure) = self.enable_vdb(id) {
                log::error!("{failure}");
                failures.push(failure);
            }
        }
        failures
    }

    fn disable_vdb(&self, id: &str) -> Result<(), Failure> {
        let step = format!("disable vdb {id}");
        log::debug!("{step}");
        let job = self
            .backend
            .disable_vdb(id)
            .map_err(|e| Failure::new(&step, e.to_string()))?;
        await_job(self.jobs, &job, &step)
    }

    fn enable_vdb(&self, id: &str) -> Result<(), Failure> {
        let step = format!("enable vdb {id}");
        log::debug!("{step}");
        let job = self
            .backend
            .enable_vdb(id)
            .map_err(|e| Failure::new(&step, e.to_string()))?;
        await_job(self.jobs, &job, &step)
    }

    fn disable_dsource(&self, id: &str) -> Result<(), Failure> {
        let step = format!("disable dsource {id}");
        log::debug!("{step}");
        let job = self
            .backend
            .disable_dsource(id)
            .map_err(|e| Failure::new(&step, e.to_string()))?;
        await_job(self.jobs, &job, &step)
    }

    fn enable_dsource(&self, id: &str) -> Result<(), Failure> {
        let step = format!("enable dsource {id}");
        log::debug!("{step}");
        let job = self
            .backend
            .enable_dsource(id)
            .map_err(|e| Failure::new(&step, e.to_string()))?;
        await_job(self.jobs, &job, &step)
    }
}
