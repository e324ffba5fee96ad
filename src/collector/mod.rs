//! Lineage collection over the jobs of a repository.
//!
//! Each SQL-bearing component goes through kind identification, then either
//! the output path (target table from the component's parameters) or the input
//! path (context resolution, normalization, extraction). A job is collected
//! into its own [`JobLineage`] and merged afterwards, so a job that fails half
//! way keeps what it found before the failure.

mod result;

#[cfg(test)]
mod tests;

pub use result::{JobLineage, LineageResult, SearchStats, UniqueList};

use std::collections::BTreeMap;

use crate::context::{ContextResolver, ResolveError};
use crate::error::{LineageError, Result};
use crate::job::{Component, ComponentKind, Job};
use crate::repository::JobRepository;
use crate::sql_engine::pattern::{find_from_tables, find_insert_update_table, split_statements};
use crate::sql_engine::{normalizer, pattern_parse, try_grammar_parse, SqlParser};

/// How SQL text is turned into lineage facts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExtractionPolicy {
    /// Grammar parser first, pattern scan when it fails
    #[default]
    GrammarWithPatternFallback,
    /// Grammar parser only; unparsable SQL contributes nothing
    GrammarOnly,
    /// Pattern scan per statement, write targets become outputs
    PatternOnly,
}

impl ExtractionPolicy {
    /// Fold the two preference switches into a policy. The grammar parser is
    /// always tried first when preferred.
    pub fn from_flags(prefer_grammar_parser: bool, prefer_pattern_parser: bool) -> Self {
        match (prefer_grammar_parser, prefer_pattern_parser) {
            (true, true) => ExtractionPolicy::GrammarWithPatternFallback,
            (true, false) => ExtractionPolicy::GrammarOnly,
            (false, _) => ExtractionPolicy::PatternOnly,
        }
    }

    pub fn prefers_grammar_parser(self) -> bool {
        self != ExtractionPolicy::PatternOnly
    }

    pub fn prefers_pattern_parser(self) -> bool {
        self != ExtractionPolicy::GrammarOnly
    }
}

/// Collects table and function lineage from the jobs of a repository
pub struct LineageCollector<R> {
    repository: R,
    parser: SqlParser,
    policy: ExtractionPolicy,
    result: LineageResult,
}

impl<R: JobRepository> LineageCollector<R> {
    pub fn new(repository: R) -> Self {
        Self {
            repository,
            parser: SqlParser::generic(),
            policy: ExtractionPolicy::default(),
            result: LineageResult::new(),
        }
    }

    pub fn with_parser(mut self, parser: SqlParser) -> Self {
        self.parser = parser;
        self
    }

    pub fn with_policy(mut self, policy: ExtractionPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> ExtractionPolicy {
        self.policy
    }

    pub fn set_prefer_grammar_parser(&mut self, prefer: bool) {
        self.policy = ExtractionPolicy::from_flags(prefer, self.policy.prefers_pattern_parser());
    }

    pub fn set_prefer_pattern_parser(&mut self, prefer: bool) {
        self.policy = ExtractionPolicy::from_flags(self.policy.prefers_grammar_parser(), prefer);
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    /// Collect lineage for every job matching `job_name_pattern`.
    ///
    /// A job that fails is logged and counted; the remaining jobs are still
    /// processed. Only listing the jobs can fail the search itself.
    pub fn search(&mut self, job_name_pattern: &str, only_latest_version: bool) -> Result<SearchStats> {
        let jobs = self.repository.list_jobs(job_name_pattern, only_latest_version)?;
        let mut stats = SearchStats {
            jobs_found: jobs.len(),
            jobs_failed: 0,
        };

        for job in &jobs {
            tracing::debug!(job = %job, "Find tables in job");
            if let Err(err) = self.find_tables(job) {
                tracing::error!(job = %job, error = %err, "Find tables in job failed");
                stats.jobs_failed += 1;
            }
        }

        tracing::info!(
            jobs_found = stats.jobs_found,
            jobs_failed = stats.jobs_failed,
            "Search finished"
        );
        Ok(stats)
    }

    /// Collect lineage for one job. What was found before a failure is kept.
    pub fn find_tables(&mut self, job: &Job) -> Result<()> {
        let mut lineage = JobLineage::default();
        let outcome = self.collect_job(job, &mut lineage);
        self.result.merge(job, lineage);
        outcome
    }

    fn collect_job(&self, job: &Job, lineage: &mut JobLineage) -> Result<()> {
        let document = self.repository.load_document(job)?;
        let resolver = ContextResolver::from_parameters(&document.context);

        for node in self
            .repository
            .list_sql_bearing_components(&document, &ComponentKind::ALL)
        {
            match Component::from_node(node) {
                Ok(component) => self.collect_component(&resolver, &component, lineage)?,
                Err(err) => {
                    tracing::warn!(job = %job, component = %node.component_name, error = %err, "Skipping component");
                }
            }
        }
        Ok(())
    }

    fn collect_component(
        &self,
        resolver: &ContextResolver,
        component: &Component,
        lineage: &mut JobLineage,
    ) -> Result<()> {
        let resolution_error = |err: ResolveError| match err {
            ResolveError::UnresolvedVariable(variable) => LineageError::VariableResolution {
                component: component.id().to_string(),
                variable,
            },
        };

        match component {
            Component::Output { table, schema, .. } => {
                let Some(table) = table else {
                    return Ok(());
                };
                let table = resolver.variable_value(table).map_err(resolution_error)?;
                let schema = match schema {
                    Some(schema) => resolver.variable_value(schema).map_err(resolution_error)?,
                    None => String::new(),
                };
                if schema.is_empty() {
                    lineage.add_output(&table);
                } else {
                    lineage.add_output(&format!("{}.{}", schema, table));
                }
            }
            Component::Query { id, sql } => {
                let Some(query) = sql.as_deref().filter(|q| !q.trim().is_empty()) else {
                    return Ok(());
                };
                tracing::debug!(component = %id, query, "Process query");
                let code = resolver.replace_context_vars(query).map_err(resolution_error)?;
                extract_sql(&self.parser, self.policy, id, &code, lineage);
            }
        }
        Ok(())
    }

    pub fn result(&self) -> &LineageResult {
        &self.result
    }

    pub fn into_result(self) -> LineageResult {
        self.result
    }

    pub fn input_tables(&self) -> &BTreeMap<Job, UniqueList<String>> {
        self.result.input_tables()
    }

    pub fn output_tables(&self) -> &BTreeMap<Job, UniqueList<String>> {
        self.result.output_tables()
    }

    pub fn functions(&self) -> &BTreeMap<Job, UniqueList<String>> {
        self.result.functions()
    }

    pub fn input_tables_per_component(
        &self,
    ) -> &BTreeMap<String, BTreeMap<String, UniqueList<String>>> {
        self.result.input_tables_per_component()
    }

    pub fn summary(&self) -> String {
        self.result.summary()
    }
}

/// Normalize `sql` and register its lineage facts under `component_id`
pub fn extract_sql(
    parser: &SqlParser,
    policy: ExtractionPolicy,
    component_id: &str,
    sql: &str,
    lineage: &mut JobLineage,
) {
    let sql = normalizer::normalize(sql);

    if policy == ExtractionPolicy::PatternOnly {
        tracing::debug!(component = %component_id, "Pattern matching SQL");
        for statement in split_statements(&sql) {
            for table in find_from_tables(statement.sql()) {
                lineage.add_input(component_id, &table);
            }
            if let Some(table) = find_insert_update_table(statement.sql()) {
                lineage.add_output(&table);
            }
        }
        return;
    }

    tracing::debug!(component = %component_id, dialect = parser.dialect_name(), "Parse SQL");
    let facts = match try_grammar_parse(parser, &sql) {
        Ok(facts) => facts,
        Err(err) if policy == ExtractionPolicy::GrammarWithPatternFallback => {
            tracing::debug!(component = %component_id, error = %err, "Falling back to pattern matching");
            pattern_parse(&sql)
        }
        Err(err) => {
            tracing::warn!(component = %component_id, error = %err, "SQL not parsed");
            return;
        }
    };

    for table in &facts.tables {
        lineage.add_input(component_id, table);
    }
    for function in &facts.functions {
        lineage.add_function(function);
    }
}
