use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Write;

use crate::job::Job;

/// Insertion-ordered list without duplicates
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct UniqueList<T> {
    items: Vec<T>,
}

impl<T> Default for UniqueList<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<T: PartialEq> UniqueList<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `value` unless present; true if it was added
    pub fn insert(&mut self, value: T) -> bool {
        if self.items.contains(&value) {
            return false;
        }
        self.items.push(value);
        true
    }

    pub fn contains(&self, value: &T) -> bool {
        self.items.contains(value)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.items
    }
}

impl<T: PartialEq> Extend<T> for UniqueList<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for value in iter {
            self.insert(value);
        }
    }
}

impl<T: PartialEq> FromIterator<T> for UniqueList<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut list = Self::new();
        list.extend(iter);
        list
    }
}

impl<'a, T> IntoIterator for &'a UniqueList<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl<T> IntoIterator for UniqueList<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

/// Lineage of a single job, collected before it is merged into a
/// [`LineageResult`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobLineage {
    pub inputs: UniqueList<String>,
    pub outputs: UniqueList<String>,
    pub functions: UniqueList<String>,
    pub per_component: BTreeMap<String, UniqueList<String>>,
}

impl JobLineage {
    /// Register a table read by `component`, for the job and the component
    pub fn add_input(&mut self, component: &str, table: &str) {
        self.inputs.insert(table.to_string());
        self.per_component
            .entry(component.to_string())
            .or_default()
            .insert(table.to_string());
    }

    pub fn add_output(&mut self, table: &str) {
        self.outputs.insert(table.to_string());
    }

    pub fn add_function(&mut self, signature: &str) {
        self.functions.insert(signature.to_string());
    }

    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty() && self.outputs.is_empty() && self.functions.is_empty()
    }
}

/// Outcome counts of a search
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SearchStats {
    pub jobs_found: usize,
    pub jobs_failed: usize,
}

/// Lineage of every job processed by a collector
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineageResult {
    input_tables: BTreeMap<Job, UniqueList<String>>,
    output_tables: BTreeMap<Job, UniqueList<String>>,
    functions: BTreeMap<Job, UniqueList<String>>,
    input_tables_per_component: BTreeMap<String, BTreeMap<String, UniqueList<String>>>,
}

impl LineageResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge the lineage of `job`. Only non-empty lists create entries.
    pub fn merge(&mut self, job: &Job, lineage: JobLineage) {
        merge_list(&mut self.input_tables, job, lineage.inputs);
        merge_list(&mut self.output_tables, job, lineage.outputs);
        merge_list(&mut self.functions, job, lineage.functions);

        for (component, tables) in lineage.per_component {
            if tables.is_empty() {
                continue;
            }
            self.input_tables_per_component
                .entry(job.name.clone())
                .or_default()
                .entry(component)
                .or_default()
                .extend(tables);
        }
    }

    pub fn input_tables(&self) -> &BTreeMap<Job, UniqueList<String>> {
        &self.input_tables
    }

    pub fn output_tables(&self) -> &BTreeMap<Job, UniqueList<String>> {
        &self.output_tables
    }

    pub fn functions(&self) -> &BTreeMap<Job, UniqueList<String>> {
        &self.functions
    }

    /// Tables per component, keyed by job name then component id
    pub fn input_tables_per_component(
        &self,
    ) -> &BTreeMap<String, BTreeMap<String, UniqueList<String>>> {
        &self.input_tables_per_component
    }

    /// Every job with at least one entry, in order
    pub fn jobs(&self) -> Vec<&Job> {
        let mut jobs: Vec<&Job> = self
            .input_tables
            .keys()
            .chain(self.output_tables.keys())
            .chain(self.functions.keys())
            .collect();
        jobs.sort();
        jobs.dedup();
        jobs
    }

    pub fn is_empty(&self) -> bool {
        self.input_tables.is_empty() && self.output_tables.is_empty() && self.functions.is_empty()
    }

    /// Text report of input and output tables per job
    pub fn summary(&self) -> String {
        let mut summary = String::new();
        for (title, tables) in [
            ("Input tables", &self.input_tables),
            ("Output tables", &self.output_tables),
        ] {
            let _ = writeln!(summary, "{} #############", title);
            for (job, list) in tables {
                let _ = writeln!(summary, "Job: {}", job);
                for table in list {
                    let _ = writeln!(summary, "\t{}", table);
                }
            }
        }
        summary
    }
}

fn merge_list(target: &mut BTreeMap<Job, UniqueList<String>>, job: &Job, list: UniqueList<String>) {
    if list.is_empty() {
        return;
    }
    target.entry(job.clone()).or_default().extend(list);
}
