//! Error types for lea-core

use thiserror::Error;

/// Core error type for lea
#[derive(Error, Debug)]
pub enum LeaError {
    /// E001: Invalid configuration (missing env var, bad warehouse selection)
    #[error("[E001] Invalid configuration: {message}")]
    Config { message: String },

    /// E002: Failed to parse a script
    #[error("[E002] Parse error in {location}: {message}")]
    Parse { location: String, message: String },

    /// E003: Two scripts map to the same table reference
    #[error("[E003] Duplicate script for table {table_ref}")]
    DuplicateScript { table_ref: String },

    /// E004: The dependency graph has a cycle
    #[error("[E004] Circular dependency detected: {cycle}")]
    Cycle { cycle: String },

    /// E005: A selector references an unknown node or is malformed
    #[error("[E005] Invalid selector '{selector}': {reason}")]
    Selector { selector: String, reason: String },

    /// E006: A script lives directly under the scripts root
    #[error("[E006] Script {path} is not placed in a schema directory")]
    ScriptOutsideSchema { path: String },

    /// E007: IO error with file path context
    #[error("[E007] Failed to read '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl LeaError {
    /// Build a parse error pointing at a file, optionally with a line number.
    pub fn parse(path: &std::path::Path, line: Option<usize>, message: impl Into<String>) -> Self {
        let location = match line {
            Some(line) => format!("{}:{}", path.display(), line),
            None => path.display().to_string(),
        };
        LeaError::Parse {
            location,
            message: message.into(),
        }
    }

    /// Exit code mandated for this error class (2 for configuration and
    /// selector problems, 3 for cycles, 1 otherwise).
    pub fn exit_code(&self) -> i32 {
        match self {
            LeaError::Config { .. } | LeaError::Selector { .. } => 2,
            LeaError::Cycle { .. } => 3,
            _ => 1,
        }
    }
}

/// Result type alias for LeaError
pub type LeaResult<T> = Result<T, LeaError>;
