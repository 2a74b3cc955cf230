//! DuckDB warehouse backend
//!
//! One database file per environment: `warehouse.duckdb` in production,
//! `warehouse_<user>.duckdb` in development. Frozen dependencies read the
//! production file through a read-only ATTACH. MotherDuck works through
//! `md:` paths unchanged.
//!
//! DuckDB has no table metadata store, so materialisation times live in a
//! `_lea.materializations` side table; the skip logic reads them back
//! through `list_tables`.

use crate::error::{DbError, DbResult};
use crate::traits::{TableStats, Warehouse};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use duckdb::Connection;
use lea_core::TableRef;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

/// Schema holding lea's own bookkeeping.
const META_SCHEMA: &str = "_lea";
/// Table recording when each table was last materialised.
const META_TABLE: &str = "_lea.materializations";

/// Extension trait converting `duckdb::Error` into `DbResult`.
trait DuckDbResultExt<T> {
    fn to_db_err(self) -> DbResult<T>;
}

impl<T> DuckDbResultExt<T> for Result<T, duckdb::Error> {
    fn to_db_err(self) -> DbResult<T> {
        self.map_err(DbError::from)
    }
}

/// DuckDB warehouse backend.
pub struct DuckDbWarehouse {
    conn: Mutex<Connection>,
    /// Path of the database being written to (dev or prod).
    path: String,
    /// Production database path, for frozen reads from a dev environment.
    production_path: String,
    /// Catalog alias of the attached production database, set in dev.
    production_catalog: Option<String>,
}

impl DuckDbWarehouse {
    /// Open the warehouse for an environment.
    ///
    /// `username` switches to the per-user development database next to the
    /// production one (`warehouse.duckdb` -> `warehouse_max.duckdb`,
    /// `md:warehouse` -> `md:warehouse_max`).
    pub fn open(production_path: &str, username: Option<&str>) -> DbResult<Self> {
        let path = match username {
            Some(username) => dev_path(production_path, username),
            None => production_path.to_string(),
        };
        let conn = Connection::open(&path).map_err(|e| DbError::ConnectionFailed {
            message: format!("{path}: {e}"),
        })?;

        let production_catalog = if username.is_some() && path != production_path {
            Some(catalog_name(production_path))
        } else {
            None
        };

        Ok(Self {
            conn: Mutex::new(conn),
            path,
            production_path: production_path.to_string(),
            production_catalog,
        })
    }

    /// The database path being written to.
    pub fn path(&self) -> &str {
        &self.path
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|poisoned| {
            log::warn!("warehouse connection mutex poisoned, recovering");
            poisoned.into_inner()
        })
    }

    fn execute_sync(&self, sql: &str) -> DbResult<usize> {
        let conn = self.lock();
        conn.execute(sql, []).to_db_err()
    }

    fn execute_batch_sync(&self, sql: &str) -> DbResult<()> {
        let conn = self.lock();
        conn.execute_batch(sql).to_db_err()
    }

    fn query_count_sync(&self, sql: &str) -> DbResult<u64> {
        let conn = self.lock();
        let count: i64 = conn
            .query_row(&format!("SELECT COUNT(*) FROM ({sql})"), [], |row| {
                row.get(0)
            })
            .to_db_err()?;
        Ok(count as u64)
    }

    fn ensure_schema(&self, table_ref: &TableRef) -> DbResult<()> {
        if let Some(schema) = table_ref.top_schema() {
            self.execute_sync(&format!("CREATE SCHEMA IF NOT EXISTS {schema}"))?;
        }
        Ok(())
    }

    fn ensure_meta(&self) -> DbResult<()> {
        self.execute_batch_sync(&format!(
            "CREATE SCHEMA IF NOT EXISTS {META_SCHEMA};\n\
             CREATE TABLE IF NOT EXISTS {META_TABLE} (\n\
                 table_schema VARCHAR NOT NULL,\n\
                 table_name VARCHAR NOT NULL,\n\
                 materialized_at TIMESTAMP NOT NULL\n\
             );"
        ))
    }

    /// Record that a table was materialised just now.
    fn record_materialization(&self, reference: &str) -> DbResult<()> {
        self.ensure_meta()?;
        let (schema, table) = match reference.rsplit_once('.') {
            Some(parts) => parts,
            None => ("main", reference),
        };
        self.execute_batch_sync(&format!(
            "DELETE FROM {META_TABLE} WHERE table_schema = '{schema}' AND table_name = '{table}';\n\
             INSERT INTO {META_TABLE} VALUES ('{schema}', '{table}', CURRENT_TIMESTAMP);"
        ))
    }

    fn forget_materialization(&self, reference: &str) -> DbResult<()> {
        self.ensure_meta()?;
        let (schema, table) = match reference.rsplit_once('.') {
            Some(parts) => parts,
            None => ("main", reference),
        };
        self.execute_batch_sync(&format!(
            "DELETE FROM {META_TABLE} WHERE table_schema = '{schema}' AND table_name = '{table}'"
        ))
    }

    fn table_exists(&self, reference: &str) -> DbResult<bool> {
        let (schema, table) = match reference.rsplit_once('.') {
            Some(parts) => parts,
            None => ("main", reference),
        };
        let conn = self.lock();
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM information_schema.tables \
                 WHERE table_schema = ? AND table_name = ?",
                duckdb::params![schema, table],
                |row| row.get(0),
            )
            .to_db_err()?;
        Ok(count > 0)
    }
}

#[async_trait]
impl Warehouse for DuckDbWarehouse {
    async fn prepare(&self) -> DbResult<()> {
        self.ensure_meta()?;
        let Some(catalog) = &self.production_catalog else {
            return Ok(());
        };
        if self.production_path.starts_with("md:") || Path::new(&self.production_path).exists() {
            self.execute_batch_sync(&format!(
                "ATTACH IF NOT EXISTS '{}' AS {} (READ_ONLY)",
                self.production_path, catalog
            ))?;
        } else {
            log::warn!(
                "production database {} does not exist; frozen references will fail",
                self.production_path
            );
        }
        Ok(())
    }

    async fn teardown(&self) -> DbResult<()> {
        let schemas: Vec<String> = {
            let conn = self.lock();
            let mut stmt = conn
                .prepare(
                    "SELECT schema_name FROM duckdb_schemas() \
                     WHERE database_name = current_database() \
                     AND schema_name NOT IN ('main', 'information_schema', 'pg_catalog')",
                )
                .to_db_err()?;
            let rows = stmt
                .query_map([], |row| row.get::<_, String>(0))
                .to_db_err()?;
            rows.collect::<Result<_, _>>().to_db_err()?
        };
        for schema in schemas {
            self.execute_sync(&format!("DROP SCHEMA IF EXISTS {schema} CASCADE"))?;
        }
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
        match &self.production_catalog {
            Some(catalog) => format!("{}.{}", catalog, table_ref.to_sql_reference()),
            None => table_ref.to_sql_reference(),
        }
    }

    async fn materialize(&self, table_ref: &TableRef, sql: &str, audit: bool) -> DbResult<u64> {
        self.ensure_schema(table_ref)?;
        let reference = self.render_table_ref(table_ref, audit);
        self.execute_batch_sync(&format!(
            "CREATE OR REPLACE TABLE {reference} AS (\n{sql}\n)"
        ))?;
        self.record_materialization(&reference)?;
        self.query_count_sync(&format!("SELECT * FROM {reference}"))
    }

    async fn query_count(&self, sql: &str) -> DbResult<u64> {
        self.query_count_sync(sql)
    }

    async fn query_rows(&self, sql: &str, limit: usize) -> DbResult<Vec<String>> {
        let conn = self.lock();
        let limited = format!("SELECT * FROM ({sql}) AS subq LIMIT {limit}");

        let mut stmt = conn.prepare(&limited).to_db_err()?;
        let mut formatted: Vec<String> = Vec::new();
        let mut rows = stmt.query([]).to_db_err()?;
        let column_count = rows.as_ref().map_or(0, |r| r.column_count());

        while let Some(row) = rows.next().to_db_err()? {
            let mut values: Vec<String> = Vec::with_capacity(column_count);
            for i in 0..column_count {
                let value = row.get::<_, String>(i).unwrap_or_else(|_| {
                    row.get::<_, i64>(i).map(|n| n.to_string()).unwrap_or_else(|_| {
                        row.get::<_, f64>(i)
                            .map(|n| n.to_string())
                            .unwrap_or_else(|_| "NULL".to_string())
                    })
                });
                values.push(value);
            }
            formatted.push(values.join(", "));
        }

        Ok(formatted)
    }

    async fn promote(&self, audit_ref: &TableRef) -> DbResult<()> {
        let source = self.render_table_ref(audit_ref, false);
        let destination = audit_ref.remove_audit_suffix().to_sql_reference();
        self.execute_batch_sync(&format!(
            "CREATE OR REPLACE TABLE {destination} AS SELECT * FROM {source}"
        ))?;
        self.record_materialization(&destination)
    }

    async fn promote_incremental(&self, audit_ref: &TableRef, key: &str) -> DbResult<()> {
        let source = self.render_table_ref(audit_ref, false);
        let destination = audit_ref.remove_audit_suffix().to_sql_reference();
        if !self.table_exists(&destination)? {
            return self.promote(audit_ref).await;
        }
        self.execute_batch_sync(&format!(
            "DELETE FROM {destination} WHERE {key} IN (SELECT DISTINCT {key} FROM {source});\n\
             INSERT INTO {destination} SELECT * FROM {source};"
        ))?;
        self.record_materialization(&destination)
    }

    async fn drop_table(&self, table_ref: &TableRef, audit: bool) -> DbResult<()> {
        let reference = self.render_table_ref(table_ref, audit);
        self.execute_batch_sync(&format!("DROP TABLE IF EXISTS {reference}"))?;
        self.forget_materialization(&reference)
    }

    async fn list_tables(&self) -> DbResult<HashMap<TableRef, TableStats>> {
        self.ensure_meta()?;
        let tables: Vec<(String, String, Option<i64>, Option<i64>)> = {
            let conn = self.lock();
            let mut stmt = conn
                .prepare(&format!(
                    "SELECT t.schema_name, t.table_name, t.estimated_size, \
                            epoch_ms(m.materialized_at) \
                     FROM duckdb_tables() t \
                     LEFT JOIN {META_TABLE} m \
                       ON m.table_schema = t.schema_name AND m.table_name = t.table_name \
                     WHERE t.database_name = current_database() \
                       AND t.schema_name <> '{META_SCHEMA}'"
                ))
                .to_db_err()?;
            let rows = stmt
                .query_map([], |row| {
                    Ok((
                        row.get(0)?,
                        row.get(1)?,
                        row.get::<_, Option<i64>>(2)?,
                        row.get::<_, Option<i64>>(3)?,
                    ))
                })
                .to_db_err()?;
            rows.collect::<Result<_, _>>().to_db_err()?
        };

        let mut stats = HashMap::new();
        for (schema, table, estimated_size, epoch_ms) in tables {
            // Tables created outside lea have no materialisation record and
            // report the epoch, so they never count as fresh checkpoints.
            let updated_at = epoch_ms
                .and_then(DateTime::<Utc>::from_timestamp_millis)
                .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);
            let table_ref = TableRef::parse_sql_reference(&format!("{schema}.{table}"));
            stats.insert(
                table_ref,
                TableStats {
                    n_rows: estimated_size.map(|n| n.max(0) as u64),
                    updated_at,
                },
            );
        }
        Ok(stats)
    }

    fn warehouse_type(&self) -> &'static str {
        "duckdb"
    }
}

/// The per-user development path for a production path.
fn dev_path(production_path: &str, username: &str) -> String {
    if production_path == ":memory:" {
        return production_path.to_string();
    }
    if let Some(database) = production_path.strip_prefix("md:") {
        return format!("md:{database}_{username}");
    }
    let path = PathBuf::from(production_path);
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(production_path);
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{e}"))
        .unwrap_or_default();
    path.with_file_name(format!("{stem}_{username}{extension}"))
        .display()
        .to_string()
}

/// The catalog name DuckDB derives from a database path.
fn catalog_name(path: &str) -> String {
    if let Some(database) = path.strip_prefix("md:") {
        return database.to_string();
    }
    Path::new(path)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(path)
        .to_string()
}

#[cfg(test)]
#[path = "duckdb_test.rs"]
mod tests;
