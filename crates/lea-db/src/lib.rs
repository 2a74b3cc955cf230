//! lea-db - Warehouse abstraction layer for lea
//!
//! This crate provides the `Warehouse` capability trait, the DuckDB
//! reference implementation (which also covers MotherDuck through `md:`
//! paths), and a BigQuery stub.

pub mod bigquery;
pub mod duckdb;
pub mod error;
pub mod traits;

pub use duckdb::DuckDbWarehouse;
pub use error::{DbError, DbResult};
pub use traits::{TableStats, Warehouse};
