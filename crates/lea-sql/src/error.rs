//! Error types for lea-sql

use thiserror::Error;

/// SQL layer errors
#[derive(Error, Debug)]
pub enum SqlError {
    /// SQL string was empty
    #[error("SQL is empty")]
    EmptySql,

    /// Unknown dialect name
    #[error("Unknown SQL dialect: {0}")]
    UnknownDialect(String),

    /// sqlparser failed to parse the SQL
    #[error("SQL parse error: {0}")]
    Parse(#[from] sqlparser::parser::ParserError),

    /// A `#…` annotation could not be parsed
    #[error("Malformed annotation at line {line}: {message}")]
    MalformedAnnotation { line: usize, message: String },
}

/// Result type alias for SqlError
pub type SqlResult<T> = Result<T, SqlError>;
