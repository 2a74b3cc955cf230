//! BigQuery warehouse stub
//!
//! Placeholder for BigQuery support; the capability surface is defined by
//! the [`Warehouse`] trait and the DuckDB implementation.

use crate::error::{DbError, DbResult};
use crate::traits::{TableStats, Warehouse};
use async_trait::async_trait;
use lea_core::TableRef;
use std::collections::HashMap;

const WAREHOUSE: &str = "bigquery";

fn not_implemented<T>(feature: &'static str) -> DbResult<T> {
    Err(DbError::NotImplemented {
        warehouse: WAREHOUSE,
        feature,
    })
}

/// BigQuery warehouse backend (stub implementation).
pub struct BigQueryWarehouse {
    dataset: String,
}

impl BigQueryWarehouse {
    /// Create a BigQuery backend for a dataset (not yet implemented).
    pub fn new(_dataset: &str) -> DbResult<Self> {
        not_implemented("connection")
    }
}

#[async_trait]
impl Warehouse for BigQueryWarehouse {
    async fn prepare(&self) -> DbResult<()> {
        not_implemented("prepare")
    }

    async fn teardown(&self) -> DbResult<()> {
        not_implemented("teardown")
    }

    fn render_table_ref(&self, table_ref: &TableRef, audit: bool) -> String {
        // BigQuery packs the whole chain into the table name under a dataset.
        let mut packed: Vec<&str> = table_ref.schema().iter().map(String::as_str).collect();
        packed.push(table_ref.name());
        let suffix = if audit { lea_core::AUDIT_SUFFIX } else { "" };
        format!("{}.{}{}", self.dataset, packed.join("__"), suffix)
    }

    fn render_production_ref(&self, table_ref: &TableRef) -> String {
        self.render_table_ref(table_ref, false)
    }

    async fn materialize(&self, _table_ref: &TableRef, _sql: &str, _audit: bool) -> DbResult<u64> {
        not_implemented("materialize")
    }

    async fn query_count(&self, _sql: &str) -> DbResult<u64> {
        not_implemented("query_count")
    }

    async fn query_rows(&self, _sql: &str, _limit: usize) -> DbResult<Vec<String>> {
        not_implemented("query_rows")
    }

    async fn promote(&self, _audit_ref: &TableRef) -> DbResult<()> {
        not_implemented("promote")
    }

    async fn promote_incremental(&self, _audit_ref: &TableRef, _key: &str) -> DbResult<()> {
        not_implemented("promote_incremental")
    }

    async fn drop_table(&self, _table_ref: &TableRef, _audit: bool) -> DbResult<()> {
        not_implemented("drop_table")
    }

    async fn list_tables(&self) -> DbResult<HashMap<TableRef, TableStats>> {
        not_implemented("list_tables")
    }

    fn warehouse_type(&self) -> &'static str {
        WAREHOUSE
    }
}
