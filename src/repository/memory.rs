use std::collections::BTreeMap;
use std::io;
use std::path::PathBuf;

use super::{select_jobs, JobRepository};
use crate::error::{LineageError, Result};
use crate::job::{Job, JobDocument};

/// Repository holding job documents in memory.
///
/// A job added without a document fails to load with `DocumentRead`.
#[derive(Debug, Clone, Default)]
pub struct InMemoryJobRepository {
    jobs: BTreeMap<Job, Option<JobDocument>>,
}

impl InMemoryJobRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a job and return it
    pub fn add_job(&mut self, name: &str, version: &str, document: JobDocument) -> Job {
        let job = Self::job(name, version);
        self.jobs.insert(job.clone(), Some(document));
        job
    }

    /// Add a job whose document cannot be read
    pub fn add_unreadable_job(&mut self, name: &str, version: &str) -> Job {
        let job = Self::job(name, version);
        self.jobs.insert(job.clone(), None);
        job
    }

    fn job(name: &str, version: &str) -> Job {
        Job::new(name, version, PathBuf::from(format!("memory://{name}_{version}")))
    }
}

impl JobRepository for InMemoryJobRepository {
    fn list_jobs(&self, name_pattern: &str, only_latest_version: bool) -> Result<Vec<Job>> {
        select_jobs(self.jobs.keys().cloned(), name_pattern, only_latest_version)
    }

    fn load_document(&self, job: &Job) -> Result<JobDocument> {
        match self.jobs.get(job) {
            Some(Some(document)) => Ok(document.clone()),
            _ => Err(LineageError::DocumentRead {
                job: job.to_string(),
                path: job.location.clone(),
                source: io::Error::new(io::ErrorKind::NotFound, "no document"),
            }),
        }
    }
}
