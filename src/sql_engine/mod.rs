//! SQL engine: normalization, grammar-based and pattern-based extraction

pub mod error;
pub mod extractors;
pub mod java;
pub mod lexer;
pub mod normalizer;
pub mod parser;
pub mod pattern;

pub use error::{SqlError, SqlResult};
pub use extractors::{extract_lineage, pattern_parse, try_grammar_parse, LineageFacts};
pub use parser::SqlParser;
