//! SQL dialect selection
//!
//! Dependency extraction only needs `FROM`/`JOIN` and CTE handling, so the
//! dialect surface is small: it picks the sqlparser dialect used for parsing.

use crate::error::{SqlError, SqlResult};
use sqlparser::dialect::{BigQueryDialect, Dialect, DuckDbDialect};
use std::fmt;

/// Supported parsing dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SqlDialect {
    /// BigQuery Standard SQL.
    BigQuery,
    /// DuckDB (covers MotherDuck and DuckLake targets).
    #[default]
    DuckDb,
}

impl SqlDialect {
    /// Resolve a dialect from its CLI name.
    pub fn from_name(name: &str) -> SqlResult<Self> {
        match name.to_lowercase().as_str() {
            "bigquery" => Ok(SqlDialect::BigQuery),
            "duckdb" | "motherduck" | "ducklake" => Ok(SqlDialect::DuckDb),
            _ => Err(SqlError::UnknownDialect(name.to_string())),
        }
    }

    /// The sqlparser dialect implementation.
    pub(crate) fn parser_dialect(&self) -> Box<dyn Dialect> {
        match self {
            SqlDialect::BigQuery => Box::new(BigQueryDialect {}),
            SqlDialect::DuckDb => Box::new(DuckDbDialect {}),
        }
    }

    /// The canonical dialect name.
    pub fn name(&self) -> &'static str {
        match self {
            SqlDialect::BigQuery => "bigquery",
            SqlDialect::DuckDb => "duckdb",
        }
    }
}

impl fmt::Display for SqlDialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
