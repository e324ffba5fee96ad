use colored::*;

use crate::collector::{LineageResult, SearchStats, UniqueList};
use crate::job::Job;

/// Returns the compact banner
pub fn get_banner() -> String {
    let banner = r#"
   _       _       _ _
  (_) ___ | |__   | (_)_ __   ___  __ _  __ _  ___
  | |/ _ \| '_ \  | | | '_ \ / _ \/ _` |/ _` |/ _ \
  | | (_) | |_) | | | | | | |  __/ (_| | (_| |  __/
 _/ |\___/|_.__/  |_|_|_| |_|\___|\__,_|\__, |\___|
|__/                                    |___/
    "#;

    banner.to_string()
}

/// Returns a colored version of the banner
pub fn get_colored_banner() -> ColoredString {
    get_banner().bright_cyan()
}

/// Display version information with the banner
pub fn display_version() {
    println!("{}", get_colored_banner());
    println!("job_lineage CLI version {}", env!("CARGO_PKG_VERSION"));
    println!("{}", env!("CARGO_PKG_DESCRIPTION"));
}

fn format_list(title: &str, list: Option<&UniqueList<String>>) -> String {
    let mut out = String::new();
    if let Some(list) = list.filter(|l| !l.is_empty()) {
        out.push_str(&format!("  {}:\n", title));
        for item in list {
            out.push_str(&format!("    • {}\n", item));
        }
    }
    out
}

/// Render a lineage result per job, with headings in color
pub fn format_lineage(result: &LineageResult) -> String {
    let mut out = format!("\n--- {} ---\n", "Job Lineage".green());

    for job in result.jobs() {
        out.push_str(&format_job(result, job));
    }
    out
}

fn format_job(result: &LineageResult, job: &Job) -> String {
    let mut out = format!("\nJob: {}\n", job.to_string().bold());
    out.push_str(&format_list("Reads", result.input_tables().get(job)));
    out.push_str(&format_list("Writes", result.output_tables().get(job)));
    out.push_str(&format_list("Calls", result.functions().get(job)));

    if let Some(components) = result.input_tables_per_component().get(&job.name) {
        out.push_str("  Components:\n");
        for (component, tables) in components {
            let tables: Vec<&str> = tables.iter().map(String::as_str).collect();
            out.push_str(&format!("    {}: {}\n", component.cyan(), tables.join(", ")));
        }
    }
    out
}

/// One-line search summary
pub fn format_search_stats(stats: &SearchStats) -> String {
    let line = format!(
        "Searched {} jobs, {} failed",
        stats.jobs_found, stats.jobs_failed
    );
    if stats.jobs_failed > 0 {
        line.yellow().to_string()
    } else {
        line.green().to_string()
    }
}
