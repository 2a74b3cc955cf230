//! Inline annotation extraction from SQL comments
//!
//! Assertions are written as `--` comment lines placed above a SELECT-list
//! column:
//!
//! ```sql
//! SELECT
//!     -- #UNIQUE
//!     -- #NO_NULLS
//!     user_id,
//!     -- #SET{'A', 'B', 'AB', 'O'}
//!     blood_type
//! FROM core.users
//! ```
//!
//! A comment block attaches to the nearest following non-comment, non-blank
//! line whose last token is a column of the top-level SELECT list. Legacy
//! `@INCREMENTAL` and `@UNIQUE` spellings are accepted.

use crate::error::{SqlError, SqlResult};

/// One parsed annotation keyword.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnnotationTag {
    /// `#NO_NULLS`
    NoNulls,
    /// `#UNIQUE`
    Unique,
    /// `#UNIQUE_BY(a, b)`
    UniqueBy(Vec<String>),
    /// `#SET{'a', 'b'}`
    Set(Vec<String>),
    /// `#INCREMENTAL` — marks the whole script, not a column.
    Incremental,
    /// `#CLUSTERING_FIELD` — opaque warehouse hint.
    ClusteringField,
}

/// An annotation attached to a SELECT-list column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnAnnotation {
    pub column: String,
    pub tag: AnnotationTag,
    pub line: usize,
}

/// Everything the annotation scan yields for one script.
#[derive(Debug, Clone, Default)]
pub struct ScriptAnnotations {
    /// Column-attached annotations, in source order.
    pub columns: Vec<ColumnAnnotation>,
    /// Whether `#INCREMENTAL` appeared anywhere.
    pub is_incremental: bool,
}

struct CommentLine {
    line: usize,
    text: String,
}

/// Scan the SQL text for annotations.
///
/// `field_names` is the top-level SELECT list (see
/// [`crate::extractor::named_selects`]); comment blocks attach to lines
/// ending in one of those names.
pub fn extract_annotations(sql: &str, field_names: &[String]) -> SqlResult<ScriptAnnotations> {
    let lines: Vec<&str> = sql.lines().collect();

    let comments: Vec<CommentLine> = lines
        .iter()
        .enumerate()
        .filter_map(|(i, raw)| {
            let trimmed = raw.trim();
            trimmed.strip_prefix("--").map(|rest| CommentLine {
                line: i + 1,
                text: rest.trim().to_string(),
            })
        })
        .collect();

    let mut annotations = ScriptAnnotations::default();

    for block in merge_adjacent(&comments) {
        let attached_column = column_after_block(&lines, block.last().map_or(0, |c| c.line), field_names);

        for comment in block {
            let Some(tag) = parse_tag(&comment.text, comment.line)? else {
                continue;
            };

            if tag == AnnotationTag::Incremental {
                annotations.is_incremental = true;
                continue;
            }

            match &attached_column {
                Some(column) => annotations.columns.push(ColumnAnnotation {
                    column: column.clone(),
                    tag,
                    line: comment.line,
                }),
                None => log::warn!(
                    "Annotation '{}' at line {} is not attached to a SELECT column, ignoring",
                    comment.text,
                    comment.line
                ),
            }
        }
    }

    Ok(annotations)
}

/// Group consecutive comment lines into blocks.
fn merge_adjacent(comments: &[CommentLine]) -> Vec<Vec<&CommentLine>> {
    let mut blocks: Vec<Vec<&CommentLine>> = Vec::new();
    for comment in comments {
        match blocks.last_mut() {
            Some(block) if block.last().is_some_and(|c| c.line + 1 == comment.line) => {
                block.push(comment);
            }
            _ => blocks.push(vec![comment]),
        }
    }
    blocks
}

/// The column a comment block ending at `last_line` attaches to, if any.
///
/// Looks at the nearest following non-blank, non-comment line; the block
/// attaches when that line's last token (ignoring a trailing comma) is one
/// of the SELECT-list columns.
fn column_after_block(lines: &[&str], last_line: usize, field_names: &[String]) -> Option<String> {
    for raw in lines.iter().skip(last_line) {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.starts_with("--") {
            continue;
        }
        let code = trimmed.split("--").next().unwrap_or(trimmed).trim();
        let last_token = code
            .trim_end_matches(',')
            .rsplit(|c: char| !c.is_alphanumeric() && c != '_')
            .next()
            .unwrap_or("");
        return field_names
            .iter()
            .find(|name| name.as_str() == last_token)
            .cloned();
    }
    None
}

/// Parse one comment text into a tag, if it is an annotation at all.
fn parse_tag(text: &str, line: usize) -> SqlResult<Option<AnnotationTag>> {
    let body = match text.strip_prefix('#').or_else(|| text.strip_prefix('@')) {
        Some(body) => body,
        // Plain prose comment (a column description); not an annotation.
        None => return Ok(None),
    };

    let keyword: String = body
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect();
    let rest = &body[keyword.len()..];

    let tag = match keyword.as_str() {
        "NO_NULLS" => AnnotationTag::NoNulls,
        "UNIQUE" => AnnotationTag::Unique,
        "INCREMENTAL" => AnnotationTag::Incremental,
        "CLUSTERING_FIELD" => AnnotationTag::ClusteringField,
        "UNIQUE_BY" => {
            let args = delimited_args(rest, '(', ')', line, "UNIQUE_BY")?;
            AnnotationTag::UniqueBy(args)
        }
        "SET" => {
            let values = delimited_args(rest, '{', '}', line, "SET")?;
            AnnotationTag::Set(values)
        }
        _ => {
            log::warn!("Unknown annotation '#{keyword}' at line {line}, ignoring");
            return Ok(None);
        }
    };

    Ok(Some(tag))
}

/// Parse `OPEN item, item CLOSE` argument lists, erroring on missing braces.
fn delimited_args(
    rest: &str,
    open: char,
    close: char,
    line: usize,
    keyword: &str,
) -> SqlResult<Vec<String>> {
    let rest = rest.trim_start();
    let inner = rest
        .strip_prefix(open)
        .ok_or_else(|| SqlError::MalformedAnnotation {
            line,
            message: format!("expected '{open}' after #{keyword}"),
        })?;
    let inner = match inner.find(close) {
        Some(end) => &inner[..end],
        None => {
            return Err(SqlError::MalformedAnnotation {
                line,
                message: format!("unterminated #{keyword}{open}...{close}"),
            });
        }
    };

    let mut seen = std::collections::HashSet::new();
    let items: Vec<String> = inner
        .split(',')
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty() && seen.insert(item.clone()))
        .collect();
    if items.is_empty() {
        return Err(SqlError::MalformedAnnotation {
            line,
            message: format!("#{keyword} requires at least one value"),
        });
    }
    Ok(items)
}

#[cfg(test)]
#[path = "comment_test.rs"]
mod tests;
