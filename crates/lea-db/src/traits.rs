//! Warehouse capability trait
//!
//! The one vendor-specific contract in lea. The executor is polymorphic
//! over this trait; each warehouse binds its environment (production
//! namespace or per-user dev namespace) at construction time.

use crate::error::DbResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lea_core::TableRef;
use std::collections::HashMap;

/// Stats of an existing warehouse table.
#[derive(Debug, Clone, PartialEq)]
pub struct TableStats {
    /// Row count, when the warehouse reports one cheaply.
    pub n_rows: Option<u64>,
    /// When the table was last materialised.
    pub updated_at: DateTime<Utc>,
}

/// Warehouse abstraction for lea.
///
/// Implementations must be `Send + Sync`; the executor issues up to the
/// concurrency bound of calls at once and assumes the client serialises or
/// pools connections internally.
#[async_trait]
pub trait Warehouse: Send + Sync {
    /// Ensure the target namespace (database file, dataset) exists.
    async fn prepare(&self) -> DbResult<()>;

    /// Drop the target namespace. Dev environments only.
    async fn teardown(&self) -> DbResult<()>;

    /// Render a reference in this warehouse's SQL syntax.
    ///
    /// The rendered form must survive a round trip through the dependency
    /// extractor and `TableRef::parse_sql_reference`.
    fn render_table_ref(&self, table_ref: &TableRef, audit: bool) -> String;

    /// Render a reference against the production namespace, for frozen
    /// dependencies. In a production environment this is the plain form.
    fn render_production_ref(&self, table_ref: &TableRef) -> String;

    /// Execute a script's SQL into the given table (audit form when `audit`
    /// is set), replacing any previous contents. Returns the row count.
    async fn materialize(&self, table_ref: &TableRef, sql: &str, audit: bool) -> DbResult<u64>;

    /// Count the rows a SELECT returns. Tests pass iff zero.
    async fn query_count(&self, sql: &str) -> DbResult<u64>;

    /// Return up to `limit` rows of a SELECT as formatted strings, for
    /// failure reporting.
    async fn query_rows(&self, sql: &str, limit: usize) -> DbResult<Vec<String>>;

    /// Replace the production table with its audit table.
    async fn promote(&self, audit_ref: &TableRef) -> DbResult<()>;

    /// Merge the audit table into the production table on a key: delete the
    /// keys present in the audit table, then insert its rows. Pre-existing
    /// rows with other keys are preserved.
    async fn promote_incremental(&self, audit_ref: &TableRef, key: &str) -> DbResult<()>;

    /// Drop a table if it exists.
    async fn drop_table(&self, table_ref: &TableRef, audit: bool) -> DbResult<()>;

    /// List existing tables (production and audit forms both) with stats.
    async fn list_tables(&self) -> DbResult<HashMap<TableRef, TableStats>>;

    /// Warehouse type identifier for logging.
    fn warehouse_type(&self) -> &'static str;
}
