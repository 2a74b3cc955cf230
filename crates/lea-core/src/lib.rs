//! lea-core - Core library for lea
//!
//! This crate provides the shared types of the orchestrator: fully-qualified
//! table references, parsed scripts with their assertions, the dependency
//! DAG, selector expressions, and the run configuration.

pub mod config;
pub mod dag;
pub mod error;
pub mod project;
pub mod script;
pub mod selector;
pub mod table_ref;

pub use config::{EnvTarget, IncrementalClause, RunConfig};
pub use dag::ScriptDag;
pub use error::{LeaError, LeaResult};
pub use project::Project;
pub use script::{Assertion, Script, ScriptKind};
pub use selector::SelectorAtom;
pub use table_ref::TableRef;

/// Literal suffix appended to a table name to obtain its audit form.
///
/// Three underscores, so that the `__` sub-schema separator never splits it.
pub const AUDIT_SUFFIX: &str = "___audit";
