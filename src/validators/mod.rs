//! Validation of job documents against the component parameter contracts

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::job::{Component, JobDocument};
use crate::repository::{JobRepository, YamlJobRepository};

/// Result of validating one job document
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationResult {
    /// Whether the validation passed or failed
    pub is_valid: bool,
    /// Path that was validated
    pub path: PathBuf,
    /// List of validation errors
    pub errors: Vec<String>,
}

impl ValidationResult {
    /// Create a new valid result
    pub fn valid(path: PathBuf) -> Self {
        Self {
            is_valid: true,
            path,
            errors: Vec::new(),
        }
    }

    /// Create a new invalid result with errors
    pub fn invalid(path: PathBuf, errors: Vec<String>) -> Self {
        Self {
            is_valid: false,
            path,
            errors,
        }
    }

    /// Add an error to the result
    pub fn add_error(&mut self, error: String) {
        self.is_valid = false;
        self.errors.push(error);
    }
}

/// Validates a job document:
/// - every SQL-bearing component carries its required parameters
/// - component ids are unique within the job
/// - context parameters have non-empty, unique names
pub fn validate_job_document(path: &Path, document: &JobDocument) -> ValidationResult {
    let mut result = ValidationResult::valid(path.to_path_buf());

    let mut context_names = HashSet::new();
    for (index, parameter) in document.context.iter().enumerate() {
        if parameter.name.trim().is_empty() {
            result.add_error(format!("Context parameter #{} has an empty name", index + 1));
        } else if !context_names.insert(parameter.name.as_str()) {
            result.add_error(format!(
                "Context parameter {} is defined more than once",
                parameter.name
            ));
        }
    }

    let mut component_ids = HashSet::new();
    for (index, node) in document.components.iter().enumerate() {
        if node.kind().is_none() {
            continue;
        }
        match Component::from_node(node) {
            Ok(component) => {
                if !component_ids.insert(component.id().to_string()) {
                    result.add_error(format!("Duplicate component id: {}", component.id()));
                }
            }
            Err(err) => result.add_error(format!("Component #{}: {}", index + 1, err)),
        }
    }

    result
}

/// Validates every job document below `jobs_dir`, all versions included
pub fn validate_jobs_directory(jobs_dir: &Path) -> Vec<ValidationResult> {
    if !jobs_dir.is_dir() {
        return vec![ValidationResult::invalid(
            jobs_dir.to_path_buf(),
            vec![format!("Path is not a directory: {}", jobs_dir.display())],
        )];
    }

    let repository = YamlJobRepository::new(jobs_dir);
    let jobs = match repository.all_jobs() {
        Ok(jobs) => jobs,
        Err(err) => return vec![ValidationResult::invalid(jobs_dir.to_path_buf(), vec![err.to_string()])],
    };

    jobs.iter()
        .map(|job| match repository.load_document(job) {
            Ok(document) => validate_job_document(&job.location, &document),
            Err(err) => ValidationResult::invalid(job.location.clone(), vec![err.to_string()]),
        })
        .collect()
}
