//! Table and function lineage for SQL embedded in ETL job documents.
//!
//! Jobs come from a [`repository::JobRepository`]; the
//! [`collector::LineageCollector`] resolves context variables in each
//! SQL-bearing component, normalizes the SQL and extracts the tables it reads
//! and writes and the functions it calls.

pub mod collector;
pub mod commands;
pub mod context;
pub mod display;
pub mod error;
pub mod graph;
pub mod job;
pub mod repository;
pub mod sql_engine;
pub mod validators;

pub use collector::{ExtractionPolicy, LineageCollector, LineageResult, SearchStats};
pub use error::LineageError;
pub use job::{Job, JobDocument};
