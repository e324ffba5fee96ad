//! Error types for the SQL engine

use thiserror::Error;

/// SQL parsing errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SqlError {
    /// SQL parse error (S001)
    #[error("[S001] SQL parse error at line {line}, column {column}: {message}")]
    ParseError {
        message: String,
        line: usize,
        column: usize,
    },

    /// Empty SQL (S002)
    #[error("[S002] SQL is empty")]
    EmptySql,

    /// Unknown dialect name (S003)
    #[error("[S003] Unknown SQL dialect: {0}")]
    UnknownDialect(String),
}

impl SqlError {
    /// Build a parse error from a `sqlparser` error message.
    ///
    /// `ParserError` carries no structured location, so "Line: N, Column: M"
    /// is recovered from the message text (0 when absent).
    pub fn from_parser_message(message: String) -> Self {
        let (line, column) = parse_location_from_error(&message);
        SqlError::ParseError {
            message,
            line,
            column,
        }
    }
}

fn parse_location_from_error(msg: &str) -> (usize, usize) {
    let number_after = |marker: &str| -> Option<usize> {
        let start = msg.find(marker)? + marker.len();
        let digits: String = msg[start..]
            .chars()
            .skip_while(|c| c.is_whitespace())
            .take_while(|c| c.is_ascii_digit())
            .collect();
        digits.parse().ok()
    };

    match (number_after("Line: "), number_after("Column: ")) {
        (Some(line), Some(column)) => (line, column),
        _ => (0, 0),
    }
}

/// Result type alias for SqlError
pub type SqlResult<T> = Result<T, SqlError>;
