use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use super::{select_jobs, JobRepository};
use crate::error::{LineageError, Result};
use crate::job::{Job, JobDocument};

const ITEM_SUFFIXES: &[&str] = &[".item.yaml", ".item.yml"];

/// Jobs stored as `<name>_<version>.item.yaml` files below a directory
#[derive(Debug, Clone)]
pub struct YamlJobRepository {
    root: PathBuf,
}

impl YamlJobRepository {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Every job file below the root, in path order
    pub fn all_jobs(&self) -> Result<Vec<Job>> {
        let mut jobs = Vec::new();
        for entry in WalkDir::new(&self.root).sort_by_file_name() {
            let entry = entry.map_err(|source| LineageError::RepositoryRead {
                path: self.root.clone(),
                source,
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            match job_from_path(entry.path()) {
                Some(job) => jobs.push(job),
                None => tracing::trace!(path = %entry.path().display(), "Not a job file"),
            }
        }
        Ok(jobs)
    }
}

/// Split `<name>_<version>.item.yaml` into a job
fn job_from_path(path: &Path) -> Option<Job> {
    let file_name = path.file_name()?.to_str()?;
    let stem = ITEM_SUFFIXES
        .iter()
        .find_map(|suffix| file_name.strip_suffix(suffix))?;
    let (name, version) = stem.rsplit_once('_')?;
    if name.is_empty() || !version.starts_with(|c: char| c.is_ascii_digit()) {
        return None;
    }
    Some(Job::new(name, version, path.to_path_buf()))
}

impl JobRepository for YamlJobRepository {
    fn list_jobs(&self, name_pattern: &str, only_latest_version: bool) -> Result<Vec<Job>> {
        let jobs = self.all_jobs()?;
        tracing::debug!(root = %self.root.display(), count = jobs.len(), "Scanned job repository");
        select_jobs(jobs, name_pattern, only_latest_version)
    }

    fn load_document(&self, job: &Job) -> Result<JobDocument> {
        let text = fs::read_to_string(&job.location).map_err(|source| LineageError::DocumentRead {
            job: job.to_string(),
            path: job.location.clone(),
            source,
        })?;
        serde_yaml::from_str(&text).map_err(|source| LineageError::DocumentFormat {
            job: job.to_string(),
            path: job.location.clone(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_job_from_path() {
        let job = job_from_path(Path::new("jobs/load_orders_0.3.item.yaml")).unwrap();
        assert_eq!(job.name, "load_orders");
        assert_eq!(job.version, "0.3");

        assert!(job_from_path(Path::new("jobs/load_orders_0.3.properties")).is_none());
        assert!(job_from_path(Path::new("jobs/load_orders.item.yaml")).is_none());
        assert!(job_from_path(Path::new("jobs/_1.0.item.yml")).is_none());
    }

    #[test]
    fn test_list_jobs_walks_subdirectories() {
        let temp_dir = tempdir().unwrap();
        let nested = temp_dir.path().join("process").join("sales");
        fs::create_dir_all(&nested).unwrap();

        for name in ["load_orders_0.1.item.yaml", "load_orders_0.2.item.yaml", "notes.txt"] {
            File::create(nested.join(name))
                .unwrap()
                .write_all(b"components: []")
                .unwrap();
        }

        let repository = YamlJobRepository::new(temp_dir.path());
        assert_eq!(repository.all_jobs().unwrap().len(), 2);

        let latest = repository.list_jobs(".*", true).unwrap();
        assert_eq!(latest.len(), 1);
        assert_eq!(latest[0].version, "0.2");
    }

    #[test]
    fn test_load_document_errors() {
        let temp_dir = tempdir().unwrap();
        let broken = temp_dir.path().join("broken_1.0.item.yaml");
        File::create(&broken)
            .unwrap()
            .write_all(b"components: {not: [a list")
            .unwrap();

        let repository = YamlJobRepository::new(temp_dir.path());
        let job = Job::new("broken", "1.0", broken);
        assert!(matches!(
            repository.load_document(&job),
            Err(LineageError::DocumentFormat { .. })
        ));

        let missing = Job::new("missing", "1.0", temp_dir.path().join("missing_1.0.item.yaml"));
        assert!(matches!(
            repository.load_document(&missing),
            Err(LineageError::DocumentRead { .. })
        ));
    }

    #[test]
    fn test_missing_root_is_an_error() {
        let repository = YamlJobRepository::new("/nonexistent/job/repository");
        assert!(matches!(
            repository.list_jobs(".*", true),
            Err(LineageError::RepositoryRead { .. })
        ));
    }
}
