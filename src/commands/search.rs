use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use colored::Colorize;
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Instant;

use super::config::LineageConfig;
use crate::collector::{LineageCollector, LineageResult, SearchStats, UniqueList};
use crate::display;
use crate::graph::LineageGraph;
use crate::repository::YamlJobRepository;
use crate::sql_engine::SqlParser;

/// Report formats of the search command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
    Dot,
}

impl OutputFormat {
    /// Parse a format name; unknown names fall back to text
    pub fn from_name(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "json" => OutputFormat::Json,
            "dot" => OutputFormat::Dot,
            "text" => OutputFormat::Text,
            other => {
                println!("Unsupported output format: {}. Using text format instead.", other);
                OutputFormat::Text
            }
        }
    }
}

/// Run the search command and print the report
pub fn search_command(config: &LineageConfig, format: OutputFormat) -> Result<SearchStats> {
    let start_time = Instant::now();

    let parser = SqlParser::from_dialect_name(&config.dialect)?
        .with_recursion_limit(config.recursion_limit);
    let repository = YamlJobRepository::new(&config.jobs_path);
    let mut collector = LineageCollector::new(repository)
        .with_parser(parser)
        .with_policy(config.policy());

    if format == OutputFormat::Text {
        println!(
            "{}",
            format!("Searching jobs in: {}", config.jobs_path.display()).green()
        );
    }

    let stats = collector
        .search(&config.job_name_pattern, config.only_latest_version)
        .with_context(|| format!("Search in {} failed", config.jobs_path.display()))?;
    let result = collector.into_result();

    match format {
        OutputFormat::Text => {
            print!("{}", display::format_lineage(&result));
            println!(
                "\n{} in {:.2?}",
                display::format_search_stats(&stats),
                start_time.elapsed()
            );
        }
        OutputFormat::Json => println!("{}", render_json(&result, &stats, Utc::now())?),
        OutputFormat::Dot => print!("{}", LineageGraph::from_result(&result).to_dot()),
    }

    Ok(stats)
}

#[derive(Serialize)]
struct JsonReport<'a> {
    generated_at: DateTime<Utc>,
    jobs_found: usize,
    jobs_failed: usize,
    jobs: Vec<JsonJob<'a>>,
}

#[derive(Serialize)]
struct JsonJob<'a> {
    name: &'a str,
    version: &'a str,
    path: String,
    input_tables: &'a [String],
    output_tables: &'a [String],
    functions: &'a [String],
    input_tables_per_component: BTreeMap<&'a str, &'a [String]>,
}

/// Render the lineage result as a JSON report
pub fn render_json(
    result: &LineageResult,
    stats: &SearchStats,
    generated_at: DateTime<Utc>,
) -> Result<String> {
    let jobs = result
        .jobs()
        .into_iter()
        .map(|job| JsonJob {
            name: &job.name,
            version: &job.version,
            path: job.location.to_string_lossy().to_string(),
            input_tables: result.input_tables().get(job).map(UniqueList::as_slice).unwrap_or_default(),
            output_tables: result.output_tables().get(job).map(UniqueList::as_slice).unwrap_or_default(),
            functions: result.functions().get(job).map(UniqueList::as_slice).unwrap_or_default(),
            input_tables_per_component: result
                .input_tables_per_component()
                .get(&job.name)
                .map(|components| {
                    components
                        .iter()
                        .map(|(id, tables)| (id.as_str(), tables.as_slice()))
                        .collect()
                })
                .unwrap_or_default(),
        })
        .collect();

    let report = JsonReport {
        generated_at,
        jobs_found: stats.jobs_found,
        jobs_failed: stats.jobs_failed,
        jobs,
    };
    Ok(serde_json::to_string_pretty(&report)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::JobLineage;
    use crate::job::Job;
    use chrono::TimeZone;
    use std::path::PathBuf;

    #[test]
    fn test_output_format_from_name() {
        assert_eq!(OutputFormat::from_name("JSON"), OutputFormat::Json);
        assert_eq!(OutputFormat::from_name("dot"), OutputFormat::Dot);
        assert_eq!(OutputFormat::from_name("yaml"), OutputFormat::Text);
    }

    #[test]
    fn test_render_json() {
        let job = Job::new("load", "1.0", PathBuf::from("jobs/load_1.0.item.yaml"));
        let mut lineage = JobLineage::default();
        lineage.add_input("tDBInput_1", "Orders");
        lineage.add_output("SALES.CUSTOMERS");

        let mut result = LineageResult::new();
        result.merge(&job, lineage);
        let stats = SearchStats {
            jobs_found: 1,
            jobs_failed: 0,
        };
        let generated_at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();

        let json = render_json(&result, &stats, generated_at).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["generated_at"], "2024-05-01T12:00:00Z");
        assert_eq!(value["jobs_found"], 1);
        assert_eq!(value["jobs"][0]["name"], "load");
        assert_eq!(value["jobs"][0]["input_tables"][0], "Orders");
        assert_eq!(value["jobs"][0]["output_tables"][0], "SALES.CUSTOMERS");
        assert_eq!(value["jobs"][0]["functions"].as_array().unwrap().len(), 0);
        assert_eq!(
            value["jobs"][0]["input_tables_per_component"]["tDBInput_1"][0],
            "Orders"
        );
    }
}
