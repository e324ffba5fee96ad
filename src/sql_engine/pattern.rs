//! Pattern-based table discovery for SQL the grammar parser rejects.
//!
//! Nothing here builds a parse tree. The scanners walk the token stream of
//! [`Lexer`] looking for `FROM`/`JOIN` and DML keywords, so they accept any
//! input and simply find less in text they do not understand.

use super::lexer::{Lexer, Token, TokenKind};

/// Words that can never be a table name following `FROM`/`JOIN`
const RESERVED: &[&str] = &[
    "SELECT", "FROM", "WHERE", "JOIN", "INNER", "LEFT", "RIGHT", "FULL", "OUTER", "CROSS",
    "NATURAL", "ON", "USING", "GROUP", "ORDER", "BY", "HAVING", "LIMIT", "UNION", "EXCEPT",
    "INTERSECT", "MINUS", "WITH", "AS", "SET", "VALUES", "INTO", "AND", "OR", "NOT", "LATERAL",
    "UNNEST", "TABLE", "DUAL", "WINDOW", "QUALIFY", "OFFSET", "FETCH", "FOR", "CASE", "WHEN",
    "THEN", "ELSE", "END",
];

/// Functions whose argument list uses `FROM` as a keyword
const FROM_ARGUMENT_FUNCTIONS: &[&str] = &["EXTRACT", "SUBSTRING", "TRIM", "OVERLAY", "POSITION"];

fn is_reserved(word: &str) -> bool {
    RESERVED.iter().any(|r| r.eq_ignore_ascii_case(word))
}

/// Tokens without comments
fn code_tokens(sql: &str) -> Vec<Token<'_>> {
    Lexer::new(sql).filter(|t| !t.is_comment()).collect()
}

/// Read a dotted name (`a`, `a.b`, `a.b.c`) starting at `tokens[start]`.
///
/// Returns the name and the index after it.
fn read_qualified_name(tokens: &[Token<'_>], start: usize) -> Option<(String, usize)> {
    let first = tokens.get(start)?;
    let first_part = first.identifier()?;
    if first.kind == TokenKind::Word && is_reserved(first_part) {
        return None;
    }

    let mut parts = vec![first_part];
    let mut i = start + 1;
    while tokens.get(i).map(|t| t.kind) == Some(TokenKind::Dot) {
        match tokens.get(i + 1).and_then(|t| t.identifier()) {
            Some(part) => {
                parts.push(part);
                i += 2;
            }
            None => break,
        }
    }
    Some((parts.join("."), i))
}

/// Skip an optional `[AS] alias` after a table name
fn skip_alias(tokens: &[Token<'_>], mut i: usize) -> usize {
    if tokens.get(i).is_some_and(|t| t.is_keyword("AS")) {
        i += 1;
    }
    match tokens.get(i) {
        Some(t) if t.kind == TokenKind::QuotedIdent => i + 1,
        Some(t) if t.kind == TokenKind::Word && !is_reserved(t.literal) => i + 1,
        _ => i,
    }
}

fn push_unique(list: &mut Vec<String>, value: String) {
    if !list.contains(&value) {
        list.push(value);
    }
}

/// Find the table names that follow `FROM` and `JOIN`, in order, without
/// duplicates.
///
/// Comma-separated FROM lists are followed; derived tables are skipped (their
/// inner `FROM` is found on its own). `FROM` inside `EXTRACT(...)` and similar
/// argument lists is ignored.
pub fn find_from_tables(sql: &str) -> Vec<String> {
    let tokens = code_tokens(sql);
    let mut tables = Vec::new();
    // one entry per open parenthesis: true when it belongs to EXTRACT and co
    let mut paren_stack: Vec<bool> = Vec::new();

    let mut i = 0;
    while i < tokens.len() {
        let token = tokens[i];
        match token.kind {
            TokenKind::LParen => {
                let is_from_argument = i > 0
                    && FROM_ARGUMENT_FUNCTIONS
                        .iter()
                        .any(|f| tokens[i - 1].is_keyword(f));
                paren_stack.push(is_from_argument);
            }
            TokenKind::RParen => {
                paren_stack.pop();
            }
            TokenKind::Word if paren_stack.last() == Some(&true) => {}
            TokenKind::Word if token.is_keyword("FROM") || token.is_keyword("JOIN") => {
                let is_from = token.is_keyword("FROM");
                let mut next = i + 1;
                while let Some((name, after)) = read_qualified_name(&tokens, next) {
                    // `FROM fn(...)`: a table function, not a table
                    if tokens.get(after).map(|t| t.kind) == Some(TokenKind::LParen) {
                        break;
                    }
                    push_unique(&mut tables, name);
                    next = skip_alias(&tokens, after);
                    if is_from && tokens.get(next).map(|t| t.kind) == Some(TokenKind::Comma) {
                        next += 1;
                    } else {
                        break;
                    }
                }
                i = next.max(i + 1);
                continue;
            }
            _ => {}
        }
        i += 1;
    }
    tables
}

/// Find the target table of an `INSERT`, `UPDATE`, `REPLACE`, `UPSERT` or
/// `MERGE` statement. The statement's first keyword decides; anything else
/// yields `None`.
pub fn find_insert_update_table(sql: &str) -> Option<String> {
    let tokens = code_tokens(sql);
    let first = tokens.first()?;

    let mut i = 1;
    let skippable: &[&str] = if first.is_keyword("INSERT") {
        &["INTO", "IGNORE", "OVERWRITE", "TABLE", "LOW_PRIORITY", "DELAYED", "HIGH_PRIORITY"]
    } else if first.is_keyword("UPDATE") {
        &["LOW_PRIORITY", "IGNORE", "ONLY"]
    } else if first.is_keyword("REPLACE")
        || first.is_keyword("UPSERT")
        || first.is_keyword("MERGE")
    {
        &["INTO", "LOW_PRIORITY", "DELAYED"]
    } else {
        return None;
    };

    while tokens
        .get(i)
        .is_some_and(|t| skippable.iter().any(|k| t.is_keyword(k)))
    {
        i += 1;
    }
    read_qualified_name(&tokens, i).map(|(name, _)| name)
}

/// One statement of a script
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlStatement {
    /// Position of the statement in the script, starting at 0
    pub index: usize,
    /// Statement text without the terminating `;`
    pub sql: String,
    /// 1-based line where the statement starts
    pub start_line: usize,
    /// True when the segment holds only comments
    pub comment_only: bool,
}

impl SqlStatement {
    pub fn sql(&self) -> &str {
        &self.sql
    }
}

/// Splits a multi-statement script on `;` outside literals and comments.
#[derive(Debug, Clone)]
pub struct ScriptParser {
    include_comments: bool,
    statements: Vec<SqlStatement>,
}

impl Default for ScriptParser {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptParser {
    pub fn new() -> Self {
        Self {
            include_comments: true,
            statements: Vec::new(),
        }
    }

    /// Whether comment-only segments are kept as statements
    pub fn set_include_comments(&mut self, include_comments: bool) {
        self.include_comments = include_comments;
    }

    /// Split `script`, replacing any previously parsed statements
    pub fn parse_script(&mut self, script: &str) {
        self.statements.clear();

        let mut segment_start = 0;
        let mut has_code = false;
        let mut has_comment = false;

        for token in Lexer::new(script) {
            match token.kind {
                TokenKind::Semicolon => {
                    self.push_segment(script, segment_start, token.offset, has_code, has_comment);
                    segment_start = token.offset + token.literal.len();
                    has_code = false;
                    has_comment = false;
                }
                TokenKind::LineComment | TokenKind::BlockComment => has_comment = true,
                _ => has_code = true,
            }
        }
        self.push_segment(script, segment_start, script.len(), has_code, has_comment);
    }

    fn push_segment(
        &mut self,
        script: &str,
        start: usize,
        end: usize,
        has_code: bool,
        has_comment: bool,
    ) {
        if !has_code && (!has_comment || !self.include_comments) {
            return;
        }

        let raw = &script[start..end];
        let leading = raw.len() - raw.trim_start().len();
        let start_line = script[..start + leading].matches('\n').count() + 1;

        self.statements.push(SqlStatement {
            index: self.statements.len(),
            sql: raw.trim().to_string(),
            start_line,
            comment_only: !has_code,
        });
    }

    pub fn statements(&self) -> &[SqlStatement] {
        &self.statements
    }

    pub fn into_statements(self) -> Vec<SqlStatement> {
        self.statements
    }
}

/// Split `script` into statements, dropping comment-only segments
pub fn split_statements(script: &str) -> Vec<SqlStatement> {
    let mut parser = ScriptParser::new();
    parser.set_include_comments(false);
    parser.parse_script(script);
    parser.into_statements()
}
