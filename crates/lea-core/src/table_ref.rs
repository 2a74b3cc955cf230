//! Fully-qualified table references
//!
//! A table is addressed by its schema chain and its name. On disk the chain
//! is a directory path (`staging/customers.sql`); in SQL it is rendered with
//! the first segment as the schema and the remaining segments packed into the
//! table name with `__` (`analytics.finance__kpis`). The audit form appends
//! the literal `___audit` suffix, which the `__` splitter never breaks apart.

use crate::error::{LeaError, LeaResult};
use crate::AUDIT_SUFFIX;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// A fully-qualified table identifier: schema chain plus table name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TableRef {
    schema: Vec<String>,
    name: String,
}

impl TableRef {
    /// Create a table reference from owned parts.
    pub fn new(schema: Vec<String>, name: impl Into<String>) -> Self {
        Self {
            schema,
            name: name.into(),
        }
    }

    /// Convenience constructor from string slices, mostly for tests.
    pub fn from_parts(schema: &[&str], name: &str) -> Self {
        Self {
            schema: schema.iter().map(|s| s.to_string()).collect(),
            name: name.to_string(),
        }
    }

    /// The schema chain (at least one segment for scripts).
    pub fn schema(&self) -> &[String] {
        &self.schema
    }

    /// The top-level schema segment, if any.
    pub fn top_schema(&self) -> Option<&str> {
        self.schema.first().map(String::as_str)
    }

    /// The table name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The audit-form reference (`name` + `___audit`).
    pub fn audit(&self) -> TableRef {
        Self {
            schema: self.schema.clone(),
            name: format!("{}{}", self.name, AUDIT_SUFFIX),
        }
    }

    /// Whether this reference is in audit form.
    pub fn is_audit(&self) -> bool {
        self.name.ends_with(AUDIT_SUFFIX)
    }

    /// Strip the audit suffix, if present.
    pub fn remove_audit_suffix(&self) -> TableRef {
        match self.name.strip_suffix(AUDIT_SUFFIX) {
            Some(base) => Self {
                schema: self.schema.clone(),
                name: base.to_string(),
            },
            None => self.clone(),
        }
    }

    /// Map a script path (relative to the scripts root) to its reference.
    ///
    /// Directories become schema segments and the filename stem (up to the
    /// first `.`) becomes the table name. Files directly under the root are
    /// rejected: every script must live inside a schema.
    pub fn from_path(relative_path: &Path) -> LeaResult<Self> {
        let mut segments: Vec<String> = Vec::new();
        for component in relative_path.components() {
            let part = component
                .as_os_str()
                .to_str()
                .ok_or_else(|| LeaError::parse(relative_path, None, "path is not valid UTF-8"))?;
            segments.push(part.to_string());
        }
        let file_name = segments
            .pop()
            .ok_or_else(|| LeaError::parse(relative_path, None, "empty path"))?;
        if segments.is_empty() {
            return Err(LeaError::ScriptOutsideSchema {
                path: relative_path.display().to_string(),
            });
        }
        let stem = file_name.split('.').next().unwrap_or(&file_name);
        Ok(Self::new(segments, stem))
    }

    /// Render the reference in warehouse convention: the first schema segment
    /// dotted, the remaining segments and the name joined with `__`.
    ///
    /// ```
    /// use lea_core::TableRef;
    /// let kpis = TableRef::from_parts(&["analytics", "finance"], "kpis");
    /// assert_eq!(kpis.to_sql_reference(), "analytics.finance__kpis");
    /// ```
    pub fn to_sql_reference(&self) -> String {
        match self.schema.split_first() {
            Some((top, rest)) => {
                let mut packed = rest.to_vec();
                packed.push(self.name.clone());
                format!("{}.{}", top, packed.join("__"))
            }
            None => self.name.clone(),
        }
    }

    /// Parse a dotted warehouse reference back into a table reference.
    ///
    /// The last two dot-separated parts carry the schema chain and the name;
    /// any leading parts (catalog or attached-database qualifiers) are
    /// dropped. `__` splits sub-schemas, except when adjacent to another
    /// underscore, so the `___audit` suffix survives the round trip.
    ///
    /// ```
    /// use lea_core::TableRef;
    /// let parsed = TableRef::parse_sql_reference("analytics.finance__kpis");
    /// assert_eq!(parsed, TableRef::from_parts(&["analytics", "finance"], "kpis"));
    /// ```
    pub fn parse_sql_reference(reference: &str) -> TableRef {
        let parts: Vec<&str> = reference.split('.').collect();
        let tail = if parts.len() >= 2 {
            &parts[parts.len() - 2..]
        } else {
            &parts[..]
        };
        let mut segments: Vec<String> = Vec::new();
        for part in tail {
            segments.extend(split_dunder(part));
        }
        let name = segments.pop().unwrap_or_default();
        TableRef::new(segments, name)
    }
}

/// Split on `__` separators that are not adjacent to a third underscore.
///
/// `core__users` splits, `users___audit` does not.
fn split_dunder(part: &str) -> Vec<String> {
    let bytes = part.as_bytes();
    let mut segments = Vec::new();
    let mut start = 0;
    let mut i = 0;
    while i + 1 < bytes.len() {
        let splits = bytes[i] == b'_'
            && bytes[i + 1] == b'_'
            && (i == 0 || bytes[i - 1] != b'_')
            && (i + 2 >= bytes.len() || bytes[i + 2] != b'_');
        if splits && i > start {
            segments.push(part[start..i].to_string());
            start = i + 2;
            i += 2;
        } else {
            i += 1;
        }
    }
    segments.push(part[start..].to_string());
    segments
}

impl fmt::Display for TableRef {
    /// Human-readable form: every segment dot-joined (`analytics.finance.kpis`).
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in &self.schema {
            write!(f, "{segment}.")?;
        }
        f.write_str(&self.name)
    }
}

#[cfg(test)]
#[path = "table_ref_test.rs"]
mod tests;
