//! Text rewrites that turn job-embedded SQL into something a generic SQL
//! grammar accepts.
//!
//! Every function here is total: unrecognised or malformed input is returned
//! unchanged rather than rejected.

use once_cell::sync::Lazy;
use regex::Regex;

use super::java;

static HASH_COMMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^([ \t]*)#").expect("valid hash comment regex"));

static EMPTY_LINES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\r?\n(?:[ \t]*\r?\n){3,}").expect("valid empty lines regex"));

static SELECT_INTO_VARS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?is)(\bSELECT\b[^;]*?)\s*\bINTO\s+@?[\p{L}_][\p{L}\p{N}_]*(?:\s*,\s*@?[\p{L}_][\p{L}\p{N}_]*)*\s*(;|\z)",
    )
    .expect("valid select into regex")
});

static GLOBAL_MAP_CAST: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\(\s*\(\s*[\w.]+\s*\)\s*globalMap\.get\(\s*"([^"]*)"\s*\)\s*\)"#)
        .expect("valid globalMap cast regex")
});

static GLOBAL_MAP_GET: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?:\(\s*[\w.]+\s*\)\s*)?globalMap\.get\(\s*"([^"]*)"\s*\)"#)
        .expect("valid globalMap regex")
});

/// Run the full rewrite pipeline over raw component SQL
pub fn normalize(text: &str) -> String {
    let code = replace_global_map_vars(text);
    let sql = convert_java_to_sql_code(&code);
    let sql = replace_hash_comments_and_assignments(&sql);
    let sql = remove_into_from_select(&sql);
    let sql = cleanup_enclosures(&sql);
    cleanup_empty_lines(&sql)
}

/// Remove identifier quoting (`` ` ``, `[ ]`, `"`) around tokens.
///
/// Single-quoted string literals are copied untouched. An opening delimiter
/// without a closer on the same line is kept as is.
pub fn cleanup_enclosures(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut in_literal = false;
    let mut rest = text;

    while let Some(ch) = rest.chars().next() {
        let width = ch.len_utf8();
        if ch == '\'' {
            in_literal = !in_literal;
        } else if !in_literal && rest.starts_with("--") {
            // comments are copied verbatim, an apostrophe there opens no literal
            let comment_len = rest.find('\n').unwrap_or(rest.len());
            result.push_str(&rest[..comment_len]);
            rest = &rest[comment_len..];
            continue;
        } else if !in_literal {
            let closer = match ch {
                '`' => Some('`'),
                '[' => Some(']'),
                '"' => Some('"'),
                _ => None,
            };
            if let Some(closer) = closer {
                let line = rest[width..].split('\n').next().unwrap_or("");
                if let Some(end) = line.find(closer) {
                    result.push_str(&line[..end]);
                    rest = &rest[width + end + closer.len_utf8()..];
                    continue;
                }
            }
        }
        result.push(ch);
        rest = &rest[width..];
    }
    result
}

/// Collapse runs of three or more blank lines into a single blank line
pub fn cleanup_empty_lines(text: &str) -> String {
    EMPTY_LINES.replace_all(text, "\n\n").into_owned()
}

/// Rewrite script-style `#` comments to `--` and `:=` assignments to `=`
pub fn replace_hash_comments_and_assignments(text: &str) -> String {
    let text = HASH_COMMENT.replace_all(text, "${1}-- ");
    text.replace(":=", "=")
}

/// Drop a trailing `INTO @var[, @var ...]` target list from `SELECT` statements,
/// keeping the terminator.
pub fn remove_into_from_select(text: &str) -> String {
    SELECT_INTO_VARS.replace_all(text, "${1} ${2}").into_owned()
}

/// Replace `globalMap.get("key")` lookups (with or without a cast) by the
/// string literal `"key"`, so the key stands in for the runtime value.
pub fn replace_global_map_vars(text: &str) -> String {
    if !text.contains("globalMap") {
        return text.to_string();
    }
    let text = GLOBAL_MAP_CAST.replace_all(text, "\"$1\"");
    GLOBAL_MAP_GET.replace_all(&text, "\"$1\"").into_owned()
}

/// Turn a Java string concatenation into the SQL text it evaluates to.
///
/// String literal operands contribute their unescaped content; any other
/// operand (an unresolved variable, a method call) is kept verbatim. Text that
/// does not start with a string literal is already SQL and is returned as is.
pub fn convert_java_to_sql_code(code: &str) -> String {
    let trimmed = code.trim();
    if !trimmed.starts_with('"') {
        return code.to_string();
    }

    let mut sql = String::with_capacity(trimmed.len());
    for operand in java::split_concatenation(trimmed) {
        match java::literal_value(operand) {
            Some(text) => sql.push_str(&text),
            None => sql.push_str(operand.trim()),
        }
    }
    sql
}
