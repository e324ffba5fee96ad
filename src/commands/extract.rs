use anyhow::{bail, Context, Result};
use colored::Colorize;
use std::fs;
use std::path::Path;

use crate::collector::{extract_sql, ExtractionPolicy, JobLineage};
use crate::sql_engine::{normalizer, SqlParser};

/// Component id under which ad-hoc SQL is collected
const SNIPPET_ID: &str = "snippet";

/// Run the extraction pipeline over one SQL snippet
pub fn extract_snippet(parser: &SqlParser, policy: ExtractionPolicy, sql: &str) -> JobLineage {
    let mut lineage = JobLineage::default();
    extract_sql(parser, policy, SNIPPET_ID, sql, &mut lineage);
    lineage
}

/// Run the extract command over `--sql` text or a `--file`
pub fn extract_command(
    sql: Option<&str>,
    file: Option<&Path>,
    dialect: &str,
    recursion_limit: usize,
    policy: ExtractionPolicy,
    show_normalized: bool,
) -> Result<()> {
    let text = match (sql, file) {
        (Some(sql), None) => sql.to_string(),
        (None, Some(file)) => fs::read_to_string(file)
            .with_context(|| format!("Failed to read {}", file.display()))?,
        _ => bail!("Pass exactly one of --sql or --file"),
    };

    let parser = SqlParser::from_dialect_name(dialect)?.with_recursion_limit(recursion_limit);
    if show_normalized {
        println!("--- {} ---", "Normalized SQL".green());
        println!("{}\n", normalizer::normalize(&text));
    }

    let lineage = extract_snippet(&parser, policy, &text);
    for (title, list) in [
        ("Input tables", &lineage.inputs),
        ("Output tables", &lineage.outputs),
        ("Functions", &lineage.functions),
    ] {
        println!("{}:", title.bold());
        for item in list {
            println!("  • {}", item);
        }
    }
    Ok(())
}
