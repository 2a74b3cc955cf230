//! Script discovery and parsing
//!
//! Walks the scripts directory, renders Jinja templates, extracts
//! dependencies and inline annotations, and produces immutable [`Script`]
//! records. Files starting with `_` and empty files are skipped, as are
//! files with other extensions (YAML data files live next to the templates
//! that load them).

use crate::error::{LeaError, LeaResult};
use crate::script::{Assertion, Script, ScriptKind};
use crate::table_ref::TableRef;
use chrono::{DateTime, Utc};
use lea_jinja::JinjaEnvironment;
use lea_sql::{AnnotationTag, SqlDialect, SqlParser};
use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};

/// Top-level schema that holds singular tests.
pub const TESTS_SCHEMA: &str = "tests";

/// A parsed scripts directory.
#[derive(Debug)]
pub struct Project {
    pub root: PathBuf,
    pub dialect: SqlDialect,
    pub scripts: Vec<Script>,
}

struct RawScript {
    table_ref: TableRef,
    kind: ScriptKind,
    sql: String,
    raw_references: BTreeSet<String>,
    assertions: Vec<Assertion>,
    clustering_fields: Vec<String>,
    is_incremental: bool,
    modified_at: DateTime<Utc>,
    path: PathBuf,
}

impl Project {
    /// Load every script under `root`.
    pub fn load(root: &Path, dialect: SqlDialect) -> LeaResult<Self> {
        if !root.is_dir() {
            return Err(LeaError::Config {
                message: format!("scripts directory {} does not exist", root.display()),
            });
        }

        let mut files = Vec::new();
        collect_script_files(root, &mut files)?;
        files.sort();

        let jinja = JinjaEnvironment::new(root);
        let parser = SqlParser::new(dialect);

        let mut raw_scripts = Vec::with_capacity(files.len());
        for path in files {
            if let Some(raw) = parse_script(root, &path, &parser, &jinja)? {
                raw_scripts.push(raw);
            }
        }

        // Dependencies can only be resolved once every script id is known:
        // references to tables the project does not produce become external.
        let known: HashSet<TableRef> = raw_scripts.iter().map(|s| s.table_ref.clone()).collect();
        let scripts = raw_scripts
            .into_iter()
            .map(|raw| resolve_dependencies(raw, &known))
            .collect();

        Ok(Self {
            root: root.to_path_buf(),
            dialect,
            scripts,
        })
    }

    /// Look up a script by the path of its source file.
    pub fn script_for_path(&self, path: &Path) -> Option<&Script> {
        self.scripts.iter().find(|s| s.path == path)
    }
}

/// Recursively collect candidate script files.
fn collect_script_files(dir: &Path, files: &mut Vec<PathBuf>) -> LeaResult<()> {
    let entries = std::fs::read_dir(dir).map_err(|e| LeaError::Io {
        path: dir.display().to_string(),
        source: e,
    })?;
    for entry in entries {
        let entry = entry.map_err(|e| LeaError::Io {
            path: dir.display().to_string(),
            source: e,
        })?;
        let path = entry.path();
        if path.is_dir() {
            collect_script_files(&path, files)?;
            continue;
        }
        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if file_name.starts_with('_') {
            continue;
        }
        if file_name.ends_with(".sql") || file_name.ends_with(".sql.jinja") {
            files.push(path);
        }
    }
    Ok(())
}

fn parse_script(
    root: &Path,
    path: &Path,
    parser: &SqlParser,
    jinja: &JinjaEnvironment,
) -> LeaResult<Option<RawScript>> {
    let relative = path.strip_prefix(root).unwrap_or(path);
    let table_ref = TableRef::from_path(relative)?;

    let text = std::fs::read_to_string(path).map_err(|e| LeaError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    if text.trim().is_empty() {
        return Ok(None);
    }

    let mut modified_at = file_mtime(path)?;

    let is_jinja = path
        .file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.ends_with(".sql.jinja"));
    let sql = if is_jinja {
        let output = jinja
            .render(&text)
            .map_err(|e| LeaError::parse(path, None, e.to_string()))?;
        for loaded in &output.loaded_paths {
            modified_at = modified_at.max(file_mtime(loaded)?);
        }
        output.text
    } else {
        text
    };
    let sql = sql.trim().trim_end_matches(';').trim_end().to_string();

    let statements = parser
        .parse(&sql)
        .map_err(|e| LeaError::parse(path, None, e.to_string()))?;

    let raw_references = lea_sql::extract_table_references(&statements);

    let kind = if table_ref.top_schema() == Some(TESTS_SCHEMA) {
        ScriptKind::TestSingular
    } else {
        ScriptKind::Regular
    };

    // Assertions on test scripts are ignored; a test's own quality is its
    // zero-rows criterion.
    let (assertions, clustering_fields, is_incremental) = if kind == ScriptKind::Regular {
        let fields = lea_sql::named_selects(&statements);
        let annotations = lea_sql::extract_annotations(&sql, &fields)
            .map_err(|e| annotation_error(path, e))?;
        let mut assertions = Vec::new();
        let mut clustering_fields = Vec::new();
        for annotation in annotations.columns {
            match annotation.tag {
                AnnotationTag::NoNulls => assertions.push(Assertion::NoNulls {
                    column: annotation.column,
                }),
                AnnotationTag::Unique => assertions.push(Assertion::Unique {
                    column: annotation.column,
                }),
                AnnotationTag::UniqueBy(by) => assertions.push(Assertion::UniqueBy {
                    column: annotation.column,
                    by,
                }),
                AnnotationTag::Set(values) => assertions.push(Assertion::Set {
                    column: annotation.column,
                    values,
                }),
                AnnotationTag::ClusteringField => clustering_fields.push(annotation.column),
                AnnotationTag::Incremental => {}
            }
        }
        (assertions, clustering_fields, annotations.is_incremental)
    } else {
        (Vec::new(), Vec::new(), false)
    };

    Ok(Some(RawScript {
        table_ref,
        kind,
        sql,
        raw_references,
        assertions,
        clustering_fields,
        is_incremental,
        modified_at,
        path: path.to_path_buf(),
    }))
}

fn annotation_error(path: &Path, error: lea_sql::SqlError) -> LeaError {
    match error {
        lea_sql::SqlError::MalformedAnnotation { line, message } => {
            LeaError::parse(path, Some(line), message)
        }
        other => LeaError::parse(path, None, other.to_string()),
    }
}

fn file_mtime(path: &Path) -> LeaResult<DateTime<Utc>> {
    let metadata = std::fs::metadata(path).map_err(|e| LeaError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    let modified = metadata.modified().map_err(|e| LeaError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    Ok(modified.into())
}

/// Split raw references into project dependencies and external tables.
///
/// A reference matches a script either directly, with its audit suffix
/// stripped (audit references always resolve to their base script), or with
/// a leading warehouse qualifier dropped. Self-references (incremental
/// scripts reading their own table) create no edge.
fn resolve_dependencies(raw: RawScript, known: &HashSet<TableRef>) -> Script {
    let mut dependencies = BTreeSet::new();
    let mut external_dependencies = BTreeSet::new();

    for reference in &raw.raw_references {
        match resolve_reference(reference, known) {
            Some(dependency) if dependency != raw.table_ref => {
                dependencies.insert(dependency);
            }
            Some(_) => {}
            None => {
                external_dependencies.insert(reference.clone());
            }
        }
    }

    Script {
        table_ref: raw.table_ref,
        kind: raw.kind,
        sql: raw.sql,
        dependencies,
        external_dependencies,
        assertions: raw.assertions,
        clustering_fields: raw.clustering_fields,
        is_incremental: raw.is_incremental,
        modified_at: raw.modified_at,
        path: raw.path,
    }
}

fn resolve_reference(reference: &str, known: &HashSet<TableRef>) -> Option<TableRef> {
    let direct = TableRef::parse_sql_reference(reference).remove_audit_suffix();
    if known.contains(&direct) {
        return Some(direct);
    }
    // BigQuery scripts may qualify references with the dataset; retry with
    // the first dot part dropped.
    if let Some((_, rest)) = reference.split_once('.') {
        let dequalified = TableRef::parse_sql_reference(rest).remove_audit_suffix();
        if known.contains(&dequalified) {
            return Some(dequalified);
        }
    }
    None
}

#[cfg(test)]
#[path = "project_test.rs"]
mod tests;
