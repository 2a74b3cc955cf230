//! Error types for lea-db

use thiserror::Error;

/// Warehouse operation errors
#[derive(Error, Debug)]
pub enum DbError {
    /// D001: Connection failure
    #[error("[D001] Warehouse connection failed: {message}")]
    ConnectionFailed { message: String },

    /// D002: Query execution failure
    #[error("[D002] SQL execution failed: {0}")]
    Execution(String),

    /// D003: Table not found
    #[error("[D003] Table not found: {0}")]
    TableNotFound(String),

    /// D004: Operation not supported by this warehouse
    #[error("[D004] Not implemented for {warehouse}: {feature}")]
    NotImplemented {
        warehouse: &'static str,
        feature: &'static str,
    },

    /// D005: The run was cancelled while the query was in flight
    #[error("[D005] Query cancelled")]
    Cancelled,
}

/// Result type alias for DbError
pub type DbResult<T> = Result<T, DbError>;

impl From<duckdb::Error> for DbError {
    fn from(err: duckdb::Error) -> Self {
        let message = err.to_string();
        if is_table_not_found(&message) {
            DbError::TableNotFound(message)
        } else {
            DbError::Execution(message)
        }
    }
}

fn is_table_not_found(message: &str) -> bool {
    message.contains("Table with name")
        || message.contains("Table or view with name")
        || (message.contains("Catalog Error")
            && message.contains("Table")
            && message.contains("not exist"))
}
