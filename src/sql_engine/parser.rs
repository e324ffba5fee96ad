//! SQL parser wrapper

use sqlparser::ast::Statement;
use sqlparser::dialect::{dialect_from_str, Dialect, GenericDialect};
use sqlparser::parser::Parser;

use super::error::{SqlError, SqlResult};

/// Default bound on expression/query nesting for a single parse
pub const DEFAULT_RECURSION_LIMIT: usize = 50;

/// SQL parser that wraps sqlparser-rs with a configurable dialect.
///
/// The recursion limit is the per-parse budget: deeply nested input fails
/// with a [`SqlError::ParseError`] instead of exhausting the stack.
pub struct SqlParser {
    dialect: Box<dyn Dialect>,
    dialect_name: String,
    recursion_limit: usize,
}

impl SqlParser {
    /// Create a parser using the generic dialect
    pub fn generic() -> Self {
        Self {
            dialect: Box::new(GenericDialect {}),
            dialect_name: "generic".to_string(),
            recursion_limit: DEFAULT_RECURSION_LIMIT,
        }
    }

    /// Create a parser from a dialect name (`generic`, `mysql`, `postgresql`,
    /// `mssql`, `snowflake`, `hive`, ...)
    pub fn from_dialect_name(name: &str) -> SqlResult<Self> {
        let dialect =
            dialect_from_str(name).ok_or_else(|| SqlError::UnknownDialect(name.to_string()))?;
        Ok(Self {
            dialect,
            dialect_name: name.to_lowercase(),
            recursion_limit: DEFAULT_RECURSION_LIMIT,
        })
    }

    /// Set the maximum nesting depth accepted by a single parse
    pub fn with_recursion_limit(mut self, recursion_limit: usize) -> Self {
        self.recursion_limit = recursion_limit;
        self
    }

    /// Parse SQL into AST statements
    pub fn parse(&self, sql: &str) -> SqlResult<Vec<Statement>> {
        let sql = sql.trim();
        if sql.is_empty() {
            return Err(SqlError::EmptySql);
        }

        Parser::new(self.dialect.as_ref())
            .with_recursion_limit(self.recursion_limit)
            .try_with_sql(sql)
            .and_then(|mut parser| parser.parse_statements())
            .map_err(|e| SqlError::from_parser_message(e.to_string()))
    }

    pub fn dialect_name(&self) -> &str {
        &self.dialect_name
    }
}

impl Default for SqlParser {
    fn default() -> Self {
        Self::generic()
    }
}
