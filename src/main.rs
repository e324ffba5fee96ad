use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use job_lineage::commands::config::{read_config, LineageConfig};
use job_lineage::commands::extract::extract_command;
use job_lineage::commands::search::{search_command, OutputFormat};
use job_lineage::{display, validators, ExtractionPolicy};

/// job_lineage (jl) CLI - table and function lineage for ETL jobs
#[derive(Parser)]
#[clap(name = "jl", about = "Table and function lineage for ETL job repositories", version)]
struct Cli {
    /// Path to the project configuration (defaults to ./lineage_project.yaml)
    #[clap(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log debug output to stderr
    #[clap(short, long, global = true)]
    verbose: bool,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Collect lineage for the jobs of a repository
    Search {
        /// Directory holding the job documents
        #[clap(short, long)]
        jobs_path: Option<PathBuf>,

        /// Regex a job name has to match
        #[clap(short, long)]
        pattern: Option<String>,

        /// Search every version, not only the latest
        #[clap(long)]
        all_versions: bool,

        /// SQL dialect of the grammar parser
        #[clap(short, long)]
        dialect: Option<String>,

        /// Skip the grammar parser and match patterns only
        #[clap(long)]
        pattern_only: bool,

        /// Output format for the report (text, json, dot)
        #[clap(short, long, default_value = "text")]
        format: String,
    },

    /// Extract lineage from a single SQL snippet
    Extract {
        /// SQL text
        #[clap(short, long)]
        sql: Option<String>,

        /// File holding the SQL text
        #[clap(short, long)]
        file: Option<PathBuf>,

        /// SQL dialect of the grammar parser
        #[clap(short, long)]
        dialect: Option<String>,

        /// Skip the grammar parser and match patterns only
        #[clap(long)]
        pattern_only: bool,

        /// Print the normalized SQL
        #[clap(short, long)]
        normalized: bool,
    },

    /// Validate job documents against the component parameter contracts
    Validate {
        /// Directory holding the job documents
        #[clap(short, long)]
        jobs_path: Option<PathBuf>,

        /// Quiet mode - only output errors
        #[clap(short, long)]
        quiet: bool,
    },

    /// Show version information
    Version,
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "job_lineage=debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn load_config(path: Option<&PathBuf>) -> LineageConfig {
    match read_config(path.map(PathBuf::as_path)) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Error: {:#}", err);
            process::exit(1);
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Search {
            jobs_path,
            pattern,
            all_versions,
            dialect,
            pattern_only,
            format,
        } => {
            let mut config = load_config(cli.config.as_ref());
            if let Some(jobs_path) = jobs_path {
                config.jobs_path = jobs_path;
            }
            if let Some(pattern) = pattern {
                config.job_name_pattern = pattern;
            }
            if let Some(dialect) = dialect {
                config.dialect = dialect;
            }
            if all_versions {
                config.only_latest_version = false;
            }
            if pattern_only {
                config.prefer_grammar_parser = false;
            }

            match search_command(&config, OutputFormat::from_name(&format)) {
                Ok(stats) if stats.jobs_found == 0 => {
                    eprintln!("No jobs found in {}", config.jobs_path.display());
                }
                Ok(_) => {}
                Err(err) => {
                    eprintln!("Error: {:#}", err);
                    process::exit(1);
                }
            }
        }
        Command::Extract {
            sql,
            file,
            dialect,
            pattern_only,
            normalized,
        } => {
            let config = load_config(cli.config.as_ref());
            let dialect = dialect.unwrap_or(config.dialect.clone());
            let policy = if pattern_only {
                ExtractionPolicy::PatternOnly
            } else {
                config.policy()
            };

            if let Err(err) = extract_command(
                sql.as_deref(),
                file.as_deref(),
                &dialect,
                config.recursion_limit,
                policy,
                normalized,
            ) {
                eprintln!("Error: {:#}", err);
                process::exit(1);
            }
        }
        Command::Validate { jobs_path, quiet } => {
            let jobs_path = jobs_path.unwrap_or_else(|| load_config(cli.config.as_ref()).jobs_path);
            let results = validators::validate_jobs_directory(&jobs_path);

            let mut error_count = 0;
            let mut success_count = 0;

            for result in &results {
                if result.is_valid {
                    success_count += 1;
                    if !quiet {
                        println!("✅ Valid job document: {}", result.path.display());
                    }
                } else {
                    error_count += 1;
                    eprintln!("❌ Invalid job document: {}", result.path.display());
                    for error in &result.errors {
                        eprintln!("   - {}", error);
                    }
                }
            }

            if !quiet || error_count > 0 {
                println!("\nValidation summary:");
                println!("  Valid jobs: {}", success_count);
                println!("  Invalid jobs: {}", error_count);
                println!("  Total jobs checked: {}", results.len());
            }

            if error_count > 0 {
                process::exit(1);
            }
        }
        Command::Version => display::display_version(),
    }
}
