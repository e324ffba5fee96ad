//! Helpers for SQL held inside Java string expressions.
//!
//! Job designers store queries as Java expressions such as
//! `"SELECT * FROM " + context.schema + ".orders"`. These helpers split such
//! expressions into string literals and code without evaluating anything.

/// A piece of a Java expression
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment<'a> {
    /// A double-quoted string literal, quotes included
    Literal(&'a str),
    /// Anything outside a string literal
    Code(&'a str),
}

/// Split a Java expression into string literals and code.
///
/// Char literals (`'x'`) stay inside code segments. An unterminated string
/// literal extends to the end of the input.
pub fn segments(code: &str) -> Vec<Segment<'_>> {
    let mut result = Vec::new();
    let bytes = code.as_bytes();
    let mut start = 0;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'\'' => {
                // char literal: skip so that '"' does not open a string
                i += 1;
                while i < bytes.len() && bytes[i] != b'\'' {
                    i += if bytes[i] == b'\\' { 2 } else { 1 };
                }
                i += 1;
            }
            b'"' => {
                if start < i {
                    result.push(Segment::Code(&code[start..i]));
                }
                let literal_start = i;
                i += 1;
                while i < bytes.len() && bytes[i] != b'"' {
                    i += if bytes[i] == b'\\' { 2 } else { 1 };
                }
                i = (i + 1).min(bytes.len());
                result.push(Segment::Literal(&code[literal_start..i]));
                start = i;
            }
            _ => i += 1,
        }
    }
    let end = bytes.len();
    if start < end {
        result.push(Segment::Code(&code[start.min(end)..end]));
    }
    result
}

/// Split a Java expression on `+` operators outside literals and parentheses.
pub fn split_concatenation(code: &str) -> Vec<&str> {
    let mut operands = Vec::new();
    let mut operand_start = 0;
    let mut depth = 0i32;
    let mut offset = 0;

    for segment in segments(code) {
        match segment {
            Segment::Literal(text) => offset += text.len(),
            Segment::Code(text) => {
                for (i, ch) in text.char_indices() {
                    match ch {
                        '(' => depth += 1,
                        ')' => depth -= 1,
                        '+' if depth <= 0 => {
                            operands.push(&code[operand_start..offset + i]);
                            operand_start = offset + i + 1;
                        }
                        _ => {}
                    }
                }
                offset += text.len();
            }
        }
    }
    operands.push(&code[operand_start..]);
    operands
}

/// The text of `operand` if it is a single string literal, possibly wrapped in
/// parentheses.
pub fn literal_value(operand: &str) -> Option<String> {
    let mut operand = operand.trim();
    while operand.starts_with('(') && operand.ends_with(')') && operand.len() >= 2 {
        operand = operand[1..operand.len() - 1].trim();
    }
    match segments(operand).as_slice() {
        [Segment::Literal(literal)] => {
            let inner = &literal[1..];
            let inner = if inner.ends_with('"') && !ends_with_escape(&inner[..inner.len() - 1]) {
                &inner[..inner.len() - 1]
            } else {
                inner
            };
            Some(unescape(inner))
        }
        _ => None,
    }
}

fn ends_with_escape(text: &str) -> bool {
    text.bytes().rev().take_while(|b| *b == b'\\').count() % 2 == 1
}

/// Resolve Java escape sequences
pub fn unescape(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            result.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') => result.push('\n'),
            Some('t') => result.push('\t'),
            Some('r') => result.push('\r'),
            Some(other) => result.push(other), // \" \\ \'
            None => result.push('\\'),
        }
    }
    result
}

/// Render `value` as a Java string literal
pub fn to_literal(value: &str) -> String {
    let mut literal = String::with_capacity(value.len() + 2);
    literal.push('"');
    for ch in value.chars() {
        match ch {
            '"' => literal.push_str("\\\""),
            '\\' => literal.push_str("\\\\"),
            '\n' => literal.push_str("\\n"),
            '\r' => literal.push_str("\\r"),
            '\t' => literal.push_str("\\t"),
            _ => literal.push(ch),
        }
    }
    literal.push('"');
    literal
}
