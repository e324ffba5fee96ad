//! A forgiving SQL tokenizer.
//!
//! The lexer never fails: unterminated literals and comments run to the end of
//! input and unknown characters come back as [`TokenKind::Symbol`]. It backs the
//! pattern extractor and the script splitter, which must accept any text.

/// TokenKind represents the different kinds of SQL tokens.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum TokenKind {
    Eof,

    // Identifiers + literals
    Word,          // keyword or bare identifier, also `@var` and `#temp`
    QuotedIdent,   // "name", `name`, [name]
    StringLiteral, // 'text'
    Number,

    // Comments
    LineComment,  // -- text
    BlockComment, // /* text */

    // Delimiters
    Comma,
    Dot,
    Semicolon,
    LParen,
    RParen,

    // Anything else: operators, stray punctuation
    Symbol,
}

/// A token and the slice of input it covers.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub literal: &'a str,
    /// Byte offset of the token in the input
    pub offset: usize,
}

impl<'a> Token<'a> {
    /// True for comments
    pub fn is_comment(&self) -> bool {
        matches!(self.kind, TokenKind::LineComment | TokenKind::BlockComment)
    }

    /// Case-insensitive keyword comparison, only for bare words
    pub fn is_keyword(&self, keyword: &str) -> bool {
        self.kind == TokenKind::Word && self.literal.eq_ignore_ascii_case(keyword)
    }

    /// Identifier text with any quoting removed
    pub fn identifier(&self) -> Option<&'a str> {
        match self.kind {
            TokenKind::Word => Some(self.literal),
            TokenKind::QuotedIdent => {
                let inner = &self.literal[1..];
                let closer = match self.literal.as_bytes()[0] {
                    b'[' => ']',
                    b'`' => '`',
                    _ => '"',
                };
                Some(inner.strip_suffix(closer).unwrap_or(inner))
            }
            _ => None,
        }
    }
}

/// Lexer over SQL text producing [`Token`]s, whitespace skipped.
pub struct Lexer<'a> {
    input: &'a str,
    position: usize,      // byte index of current_char
    read_position: usize, // byte index of the char after current_char
    current_char: Option<char>,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        let mut lexer = Lexer {
            input,
            position: 0,
            read_position: 0,
            current_char: None,
        };
        lexer.read_char();
        lexer
    }

    fn read_char(&mut self) {
        self.position = self.read_position;
        self.current_char = self.input[self.read_position..].chars().next();
        if let Some(ch) = self.current_char {
            self.read_position += ch.len_utf8();
        }
    }

    fn peek_char(&self) -> Option<char> {
        self.input[self.read_position..].chars().next()
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.current_char, Some(ch) if ch.is_whitespace()) {
            self.read_char();
        }
    }

    /// Consume characters while `pred` holds
    fn read_while(&mut self, pred: impl Fn(char) -> bool) {
        while matches!(self.current_char, Some(ch) if pred(ch)) {
            self.read_char();
        }
    }

    /// Consume up to and including `closer`, or to end of input.
    /// A doubled closer is an escaped closer and does not terminate.
    fn read_delimited(&mut self, closer: char) {
        self.read_char(); // opening delimiter
        while let Some(ch) = self.current_char {
            self.read_char();
            if ch == closer {
                if self.current_char == Some(closer) {
                    self.read_char();
                } else {
                    return;
                }
            }
        }
    }

    fn read_block_comment(&mut self) {
        self.read_char(); // '/'
        self.read_char(); // '*'
        while let Some(ch) = self.current_char {
            self.read_char();
            if ch == '*' && self.current_char == Some('/') {
                self.read_char();
                return;
            }
        }
    }

    /// Fetch the next token from the input.
    pub fn next_token(&mut self) -> Token<'a> {
        self.skip_whitespace();
        let start = self.position;

        let kind = match self.current_char {
            None => {
                return Token {
                    kind: TokenKind::Eof,
                    literal: "",
                    offset: start,
                }
            }
            Some('\'') => {
                self.read_delimited('\'');
                TokenKind::StringLiteral
            }
            Some('"') => {
                self.read_delimited('"');
                TokenKind::QuotedIdent
            }
            Some('`') => {
                self.read_delimited('`');
                TokenKind::QuotedIdent
            }
            Some('[') => {
                self.read_delimited(']');
                TokenKind::QuotedIdent
            }
            Some('-') if self.peek_char() == Some('-') => {
                self.read_while(|c| c != '\n');
                TokenKind::LineComment
            }
            Some('/') if self.peek_char() == Some('*') => {
                self.read_block_comment();
                TokenKind::BlockComment
            }
            Some('#') | Some('@') if self.peek_char().is_some_and(is_word_char) => {
                self.read_char();
                self.read_while(is_word_char);
                TokenKind::Word
            }
            Some('#') => {
                self.read_while(|c| c != '\n');
                TokenKind::LineComment
            }
            Some(ch) if is_word_start(ch) => {
                self.read_while(is_word_char);
                TokenKind::Word
            }
            Some(ch) if ch.is_ascii_digit() => {
                self.read_while(|c| c.is_ascii_digit() || c == '.');
                TokenKind::Number
            }
            Some(ch) => {
                self.read_char();
                match ch {
                    ',' => TokenKind::Comma,
                    '.' => TokenKind::Dot,
                    ';' => TokenKind::Semicolon,
                    '(' => TokenKind::LParen,
                    ')' => TokenKind::RParen,
                    _ => TokenKind::Symbol,
                }
            }
        };

        Token {
            kind,
            literal: &self.input[start..self.position],
            offset: start,
        }
    }
}

fn is_word_start(ch: char) -> bool {
    ch.is_alphabetic() || ch == '_'
}

fn is_word_char(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_' || ch == '$'
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let tok = self.next_token();
        if tok.kind == TokenKind::Eof {
            None
        } else {
            Some(tok)
        }
    }
}
