//! Shared helpers for run-command tests

use async_trait::async_trait;
use lea_core::TableRef;
use lea_db::{DbError, DbResult, TableStats, Warehouse};
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Build a table reference from a dotted spec (`core.users`).
pub fn table(spec: &str) -> TableRef {
    let mut segments: Vec<String> = spec.split('.').map(str::to_string).collect();
    let name = segments.pop().unwrap();
    TableRef::new(segments, name)
}

/// Scripted warehouse for scheduler and planning tests.
#[derive(Default)]
pub struct MockWarehouse {
    /// Table names whose materialisation fails.
    pub failing: BTreeSet<String>,
    /// SQL substrings that make a test query report one violating row.
    pub violating: BTreeSet<String>,
    /// Per-call artificial latency in milliseconds.
    pub delay_ms: u64,
    pub calls: Mutex<Vec<String>>,
    pub in_flight: AtomicUsize,
    pub peak_in_flight: AtomicUsize,
}

impl MockWarehouse {
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    async fn enter(&self) {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        if self.delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.delay_ms)).await;
        }
    }

    fn exit(&self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl Warehouse for MockWarehouse {
    async fn prepare(&self) -> DbResult<()> {
        Ok(())
    }

    async fn teardown(&self) -> DbResult<()> {
        Ok(())
    }

    fn render_table_ref(&self, table_ref: &TableRef, audit: bool) -> String {
        if audit {
            table_ref.audit().to_sql_reference()
        } else {
            table_ref.to_sql_reference()
        }
    }

    fn render_production_ref(&self, table_ref: &TableRef) -> String {
        format!("prod.{}", table_ref.to_sql_reference())
    }

    async fn materialize(&self, table_ref: &TableRef, _sql: &str, _audit: bool) -> DbResult<u64> {
        self.enter().await;
        self.calls
            .lock()
            .unwrap()
            .push(format!("materialize {table_ref}"));
        self.exit();
        if self.failing.contains(&table_ref.to_string()) {
            return Err(DbError::Execution("mock failure".to_string()));
        }
        Ok(1)
    }

    async fn query_count(&self, sql: &str) -> DbResult<u64> {
        self.enter().await;
        self.calls.lock().unwrap().push(format!("query {sql}"));
        self.exit();
        let violations = self
            .violating
            .iter()
            .filter(|marker| sql.contains(marker.as_str()))
            .count();
        Ok(violations as u64)
    }

    async fn query_rows(&self, _sql: &str, _limit: usize) -> DbResult<Vec<String>> {
        Ok(vec!["X".to_string()])
    }

    async fn promote(&self, audit_ref: &TableRef) -> DbResult<()> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("promote {audit_ref}"));
        Ok(())
    }

    async fn promote_incremental(&self, audit_ref: &TableRef, key: &str) -> DbResult<()> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("promote_incremental {audit_ref} {key}"));
        Ok(())
    }

    async fn drop_table(&self, _table_ref: &TableRef, _audit: bool) -> DbResult<()> {
        Ok(())
    }

    async fn list_tables(&self) -> DbResult<HashMap<TableRef, TableStats>> {
        Ok(Default::default())
    }

    fn warehouse_type(&self) -> &'static str {
        "mock"
    }
}
