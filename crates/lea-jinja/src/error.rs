//! Error types for lea-jinja

use thiserror::Error;

/// Templating errors
#[derive(Error, Debug)]
pub enum JinjaError {
    /// Template rendering failed
    #[error("Template error: {0}")]
    Render(#[from] minijinja::Error),

    /// A file loaded by the template could not be read
    #[error("Failed to load '{path}': {message}")]
    Load { path: String, message: String },
}

/// Result type alias for JinjaError
pub type JinjaResult<T> = Result<T, JinjaError>;
