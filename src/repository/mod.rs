//! Job repositories: where jobs are listed and their documents loaded from

mod memory;
mod yaml;

pub use memory::InMemoryJobRepository;
pub use yaml::YamlJobRepository;

use regex::Regex;
use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::error::Result;
use crate::job::{ComponentKind, ComponentNode, Job, JobDocument};

/// Source of jobs and job documents
pub trait JobRepository {
    /// Jobs whose name matches `name_pattern` (a regex matched against the
    /// whole name), sorted by name then version. With `only_latest_version`
    /// just the highest version of each job is returned.
    fn list_jobs(&self, name_pattern: &str, only_latest_version: bool) -> Result<Vec<Job>>;

    /// Load the document of `job`
    fn load_document(&self, job: &Job) -> Result<JobDocument>;

    /// Components of `document` whose kind is one of `kinds`, in document order
    fn list_sql_bearing_components<'d>(
        &self,
        document: &'d JobDocument,
        kinds: &[ComponentKind],
    ) -> Vec<&'d ComponentNode> {
        document
            .components
            .iter()
            .filter(|node| node.kind().is_some_and(|kind| kinds.contains(&kind)))
            .collect()
    }
}

/// Filter `jobs` by name pattern and optionally keep only the latest version
pub(crate) fn select_jobs(
    jobs: impl IntoIterator<Item = Job>,
    name_pattern: &str,
    only_latest_version: bool,
) -> Result<Vec<Job>> {
    let pattern = Regex::new(&format!("^(?:{})$", name_pattern))?;
    let mut matching: Vec<Job> = jobs
        .into_iter()
        .filter(|job| pattern.is_match(&job.name))
        .collect();

    if only_latest_version {
        let mut latest: BTreeMap<String, Job> = BTreeMap::new();
        for job in matching {
            let is_newer = latest.get(&job.name).map_or(true, |current| {
                compare_versions(&current.version, &job.version) == Ordering::Less
            });
            if is_newer {
                latest.insert(job.name.clone(), job);
            }
        }
        matching = latest.into_values().collect();
    }

    matching.sort();
    Ok(matching)
}

/// Compare dotted versions part by part, numerically where both parts are
/// numbers. Missing parts count as 0.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let a_parts: Vec<&str> = a.split('.').collect();
    let b_parts: Vec<&str> = b.split('.').collect();

    for i in 0..a_parts.len().max(b_parts.len()) {
        let x = a_parts.get(i).copied().unwrap_or("0");
        let y = b_parts.get(i).copied().unwrap_or("0");
        let ordering = match (x.parse::<u64>(), y.parse::<u64>()) {
            (Ok(x), Ok(y)) => x.cmp(&y),
            _ => x.cmp(y),
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}
