use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error("unexpected character '{found}' at line {line}, column {column}")]
    UnexpectedChar { found: char, line: usize, column: usize },

    #[error("unterminated string starting at line {line}, column {column}")]
    UnterminatedString { line: usize, column: usize },

    #[error("invalid escape '\\{found}' at line {line}, column {column}")]
    InvalidEscape { found: char, line: usize, column: usize },

    #[error("invalid number '{text}' at line {line}, column {column}")]
    InvalidNumber { text: String, line: usize, column: usize },

    #[error("expected {expected}, found {found} at line {line}, column {column}")]
    Unexpected {
        expected: &'static str,
        found: String,
        line: usize,
        column: usize,
    },

    #[error("'{name}' is not a literal at line {line}, column {column}")]
    NotALiteral { name: String, line: usize, column: usize },

    #[error("invalid date '{text}' at line {line}, column {column}")]
    InvalidDate { text: String, line: usize, column: usize },

    #[error("nesting deeper than {0} levels")]
    TooDeep(usize),
}

pub type Result<T> = std::result::Result<T, Error>;
