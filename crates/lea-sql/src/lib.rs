//! lea-sql - SQL parsing layer for lea
//!
//! This crate provides SQL parsing using sqlparser-rs with dialect support,
//! table dependency extraction (CTE-aware), inline annotation extraction
//! from comments, and table-reference rewriting.

pub mod comment;
pub mod dialect;
pub mod error;
pub mod extractor;
pub mod parser;
pub mod rewrite;

pub use comment::{extract_annotations, AnnotationTag, ColumnAnnotation, ScriptAnnotations};
pub use dialect::SqlDialect;
pub use error::{SqlError, SqlResult};
pub use extractor::{extract_table_references, named_selects};
pub use parser::SqlParser;
pub use rewrite::rewrite_table_references;
pub use sqlparser::ast::Statement;

/// Convert a sqlparser `ObjectName` to a dot-separated string.
pub(crate) fn object_name_to_string(name: &sqlparser::ast::ObjectName) -> String {
    name.0
        .iter()
        .map(|part| part.to_string())
        .collect::<Vec<_>>()
        .join(".")
}
