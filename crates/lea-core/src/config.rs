//! Run configuration
//!
//! One typed record for everything the original surface spread across flags
//! and environment variables.

use crate::error::{LeaError, LeaResult};
use lea_sql::SqlDialect;
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::Duration;

/// Environment variable naming the developer for dev-suffix routing.
pub const USERNAME_VAR: &str = "LEA_USERNAME";

/// Where tables are written: a per-user development namespace or production.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvTarget {
    /// Development: the username suffixes the warehouse namespace.
    Dev { username: String },
    /// Production: the base namespace, no suffix.
    Prod,
}

impl EnvTarget {
    /// Resolve the target from the `--production` flag and `LEA_USERNAME`.
    pub fn from_env(production: bool) -> LeaResult<Self> {
        if production {
            return Ok(EnvTarget::Prod);
        }
        match std::env::var(USERNAME_VAR) {
            Ok(username) if !username.is_empty() => Ok(EnvTarget::Dev { username }),
            _ => Err(LeaError::Config {
                message: format!("{USERNAME_VAR} must be set when not running with --production"),
            }),
        }
    }

    /// The dev username, if any.
    pub fn username(&self) -> Option<&str> {
        match self {
            EnvTarget::Dev { username } => Some(username),
            EnvTarget::Prod => None,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, EnvTarget::Prod)
    }
}

/// Incremental refresh clause: the key column and the values being refreshed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncrementalClause {
    pub field: String,
    pub values: BTreeSet<String>,
}

/// Configuration for one run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Where to write (dev namespace or production).
    pub env: EnvTarget,
    /// Maximum number of concurrently running warehouse queries.
    pub concurrency: usize,
    /// Drop existing audit checkpoints and rerun everything selected.
    pub restart: bool,
    /// Stop scheduling on the first error instead of poisoning descendants.
    pub fail_fast: bool,
    /// Render unselected ancestors against production.
    pub freeze_unselected: bool,
    /// Selector atoms (union). Empty selects every node.
    pub select: Vec<String>,
    /// Selector atoms subtracted from the selection.
    pub unselect: Vec<String>,
    /// Directory holding the SQL scripts.
    pub scripts_root: PathBuf,
    /// SQL dialect used for parsing.
    pub dialect: SqlDialect,
    /// Incremental key and refreshed values, when requested.
    pub incremental: Option<IncrementalClause>,
    /// Optional per-node timeout.
    pub timeout: Option<Duration>,
    /// Plan and print, touch nothing.
    pub dry_run: bool,
}

impl RunConfig {
    /// Default concurrency bound.
    pub const DEFAULT_CONCURRENCY: usize = 8;
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            env: EnvTarget::Prod,
            concurrency: Self::DEFAULT_CONCURRENCY,
            restart: false,
            fail_fast: false,
            freeze_unselected: false,
            select: Vec::new(),
            unselect: Vec::new(),
            scripts_root: PathBuf::from("scripts"),
            dialect: SqlDialect::DuckDb,
            incremental: None,
            timeout: None,
            dry_run: false,
        }
    }
}
