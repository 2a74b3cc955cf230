//! Scripts and their inline assertions
//!
//! A script is one SQL file (post-Jinja) producing exactly one table. It is
//! constructed at parse time and immutable afterwards; the executor works on
//! rewritten copies of its SQL, never on the script itself.

use crate::table_ref::TableRef;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::PathBuf;

/// What role a script plays in the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScriptKind {
    /// An ordinary script materialised into a table.
    Regular,
    /// A hand-written test under the `tests/` schema; passes iff it returns
    /// zero rows.
    TestSingular,
    /// A test synthesised from an inline assertion annotation.
    TestAssertion,
}

impl ScriptKind {
    /// Tests are queried, never materialised.
    pub fn is_test(self) -> bool {
        matches!(self, ScriptKind::TestSingular | ScriptKind::TestAssertion)
    }
}

/// An inline assertion attached to a SELECT-list column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Assertion {
    /// `#NO_NULLS` — the column contains no NULL values.
    NoNulls { column: String },
    /// `#UNIQUE` — the column values are unique.
    Unique { column: String },
    /// `#UNIQUE_BY(a, b)` — the column values are unique within each group.
    UniqueBy { column: String, by: Vec<String> },
    /// `#SET{'a', 'b'}` — the column only takes the listed values.
    Set { column: String, values: Vec<String> },
}

impl Assertion {
    /// The column the assertion is attached to.
    pub fn column(&self) -> &str {
        match self {
            Assertion::NoNulls { column }
            | Assertion::Unique { column }
            | Assertion::UniqueBy { column, .. }
            | Assertion::Set { column, .. } => column,
        }
    }

    /// Short kind label used in synthesised test names.
    pub fn kind_label(&self) -> &'static str {
        match self {
            Assertion::NoNulls { .. } => "no_nulls",
            Assertion::Unique { .. } => "unique",
            Assertion::UniqueBy { .. } => "unique_by",
            Assertion::Set { .. } => "set",
        }
    }
}

/// A parsed SQL script.
#[derive(Debug, Clone)]
pub struct Script {
    /// The table this script produces.
    pub table_ref: TableRef,
    /// Regular table, singular test, or synthesised assertion test.
    pub kind: ScriptKind,
    /// The SQL text, post-Jinja, trailing semicolon trimmed.
    pub sql: String,
    /// References to other scripts in the project.
    pub dependencies: BTreeSet<TableRef>,
    /// References to tables the project does not produce. Informational;
    /// they create no graph edges.
    pub external_dependencies: BTreeSet<String>,
    /// Inline assertion annotations, in source order.
    pub assertions: Vec<Assertion>,
    /// Columns flagged with `#CLUSTERING_FIELD`. Opaque warehouse hint.
    pub clustering_fields: Vec<String>,
    /// Whether the script carries `#INCREMENTAL`.
    pub is_incremental: bool,
    /// Effective modification time: the file's mtime, or for Jinja scripts
    /// the max over the template and every YAML file loaded while rendering.
    pub modified_at: DateTime<Utc>,
    /// Source path, for diagnostics and git selection.
    pub path: PathBuf,
}

impl Script {
    /// Whether the script is a test of either kind.
    pub fn is_test(&self) -> bool {
        self.kind.is_test()
    }
}

#[cfg(test)]
#[path = "script_test.rs"]
mod tests;
