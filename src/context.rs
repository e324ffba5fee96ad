//! Context variable substitution for job code

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::collections::HashMap;
use thiserror::Error;

use crate::job::ContextParameter;
use crate::sql_engine::java::{self, Segment};
use crate::sql_engine::normalizer;

static CONTEXT_REFERENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\bcontext\.([\p{L}_][\p{L}\p{N}_]*)").expect("valid context reference regex")
});

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("[C001] Context variable context.{0} has no value")]
    UnresolvedVariable(String),
}

/// Resolves `context.<name>` references against a job's context parameters
#[derive(Debug, Clone, Default)]
pub struct ContextResolver {
    bindings: HashMap<String, String>,
}

impl ContextResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_parameters(parameters: &[ContextParameter]) -> Self {
        let mut resolver = Self::new();
        for parameter in parameters {
            resolver.add_context_var(&parameter.name, &parameter.value);
        }
        resolver
    }

    /// Bind `name`; a later binding of the same name wins
    pub fn add_context_var(&mut self, name: &str, value: &str) {
        self.bindings.insert(name.to_string(), value.to_string());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.bindings.get(name).map(String::as_str)
    }

    /// Replace `context.<name>` references in Java code with the bound value as a
    /// Java string literal. References inside string literals are left alone.
    pub fn replace_context_vars(&self, code: &str) -> Result<String, ResolveError> {
        let mut result = String::with_capacity(code.len());
        for segment in java::segments(code) {
            match segment {
                Segment::Literal(text) => result.push_str(text),
                Segment::Code(text) => result.push_str(&self.replace_in_code(text)?),
            }
        }
        Ok(result)
    }

    fn replace_in_code(&self, code: &str) -> Result<String, ResolveError> {
        let mut unresolved = None;
        let replaced = CONTEXT_REFERENCE.replace_all(code, |caps: &Captures<'_>| {
            match self.get(&caps[1]) {
                Some(value) => java::to_literal(value),
                None => {
                    unresolved.get_or_insert_with(|| caps[1].to_string());
                    caps[0].to_string()
                }
            }
        });
        match unresolved {
            Some(name) => Err(ResolveError::UnresolvedVariable(name)),
            None => Ok(replaced.into_owned()),
        }
    }

    /// Resolve a parameter value to plain text: a context reference, a Java
    /// expression of literals and references, or text taken as is.
    pub fn variable_value(&self, value: &str) -> Result<String, ResolveError> {
        let code = self.replace_context_vars(value)?;
        Ok(normalizer::convert_java_to_sql_code(&code).trim().to_string())
    }
}
