//! Crate-level error types

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while collecting lineage for a job
#[derive(Error, Debug)]
pub enum LineageError {
    /// A context variable referenced in component code has no binding (L001)
    #[error("[L001] Replace context vars failed for component {component}: unresolved variable context.{variable}")]
    VariableResolution { component: String, variable: String },

    /// The job document could not be read (L002)
    #[error("[L002] Failed to read document of job {job} at {path}: {source}")]
    DocumentRead {
        job: String,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The job document is not a valid job definition (L003)
    #[error("[L003] Invalid document of job {job} at {path}: {source}")]
    DocumentFormat {
        job: String,
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// The job repository directory could not be walked (L004)
    #[error("[L004] Failed to read job repository at {path}: {source}")]
    RepositoryRead {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    /// The job name pattern is not a valid regular expression (L005)
    #[error("[L005] Invalid job name pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    /// A component lacks a parameter its kind requires (L006)
    #[error("[L006] Component {component} is missing required parameter {parameter}")]
    MissingParameter { component: String, parameter: String },
}

pub type Result<T> = std::result::Result<T, LineageError>;
