//! Selector parsing and active-set resolution
//!
//! A selection expression is a union of atoms. Each atom is optionally
//! wrapped in `+` affixes:
//! - `schema.table` — exact node; `+` prefix pulls ancestors, suffix pulls
//!   descendants (`+core.users+` is node ∪ ancestors ∪ descendants)
//! - `schema/` — every node whose schema chain starts with those segments
//! - `git` — nodes whose source files changed, resolved by the caller
//!
//! A parallel unselect expression subtracts from the result.

use crate::dag::ScriptDag;
use crate::error::{LeaError, LeaResult};
use crate::table_ref::TableRef;
use std::collections::BTreeSet;

/// What an atom matches before `+` expansion.
#[derive(Debug, Clone, PartialEq, Eq)]
enum AtomBody {
    /// An exact node.
    Node(TableRef),
    /// Every node under a schema chain prefix.
    Schema(Vec<String>),
    /// Nodes whose source files changed relative to the base branch.
    Git,
}

/// One parsed selector atom.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorAtom {
    body: AtomBody,
    include_ancestors: bool,
    include_descendants: bool,
}

impl SelectorAtom {
    /// Parse a selector atom.
    pub fn parse(selector: &str) -> LeaResult<Self> {
        let selector = selector.trim();
        let include_ancestors = selector.starts_with('+');
        let include_descendants = selector.ends_with('+');
        let body = selector
            .trim_start_matches('+')
            .trim_end_matches('+')
            .to_string();

        if body.is_empty() {
            return Err(LeaError::Selector {
                selector: selector.to_string(),
                reason: "selector cannot be empty".to_string(),
            });
        }

        let body = if body == "git" {
            AtomBody::Git
        } else if let Some(chain) = body.strip_suffix('/') {
            let segments: Vec<String> = chain.split('.').map(str::to_string).collect();
            if segments.iter().any(String::is_empty) {
                return Err(LeaError::Selector {
                    selector: selector.to_string(),
                    reason: "empty schema segment".to_string(),
                });
            }
            AtomBody::Schema(segments)
        } else {
            let mut segments: Vec<String> = body.split('.').map(str::to_string).collect();
            if segments.len() < 2 || segments.iter().any(String::is_empty) {
                return Err(LeaError::Selector {
                    selector: selector.to_string(),
                    reason: "expected schema.table, schema/, or git".to_string(),
                });
            }
            let name = segments.pop().unwrap_or_default();
            AtomBody::Node(TableRef::new(segments, name))
        };

        Ok(Self {
            body,
            include_ancestors,
            include_descendants,
        })
    }

    /// Whether this atom needs the git-modified set resolved.
    pub fn is_git(&self) -> bool {
        self.body == AtomBody::Git
    }

    /// Resolve the atom against the graph.
    ///
    /// `git_modified` holds the nodes whose scripts changed in the working
    /// tree; it is only consulted by `git` atoms.
    fn resolve(
        &self,
        dag: &ScriptDag,
        git_modified: &BTreeSet<TableRef>,
    ) -> LeaResult<BTreeSet<TableRef>> {
        let matched: BTreeSet<TableRef> = match &self.body {
            AtomBody::Node(table_ref) => {
                if !dag.contains(table_ref) {
                    return Err(LeaError::Selector {
                        selector: table_ref.to_string(),
                        reason: "no script produces this table".to_string(),
                    });
                }
                BTreeSet::from([table_ref.clone()])
            }
            AtomBody::Schema(segments) => dag
                .table_refs()
                .filter(|table_ref| table_ref.schema().starts_with(segments))
                .cloned()
                .collect(),
            AtomBody::Git => git_modified
                .iter()
                .filter(|table_ref| dag.contains(table_ref))
                .cloned()
                .collect(),
        };

        let mut resolved = matched.clone();
        if self.include_ancestors {
            for table_ref in &matched {
                resolved.extend(dag.ancestors(table_ref));
            }
        }
        if self.include_descendants {
            for table_ref in &matched {
                resolved.extend(dag.descendants(table_ref));
            }
        }
        Ok(resolved)
    }
}

/// Resolve select and unselect expressions into the active set.
///
/// An empty select list selects every node. Atoms combine by union; the
/// unselect expression subtracts from the result.
pub fn select(
    dag: &ScriptDag,
    select: &[SelectorAtom],
    unselect: &[SelectorAtom],
    git_modified: &BTreeSet<TableRef>,
) -> LeaResult<BTreeSet<TableRef>> {
    let mut selected: BTreeSet<TableRef> = if select.is_empty() {
        dag.table_refs().cloned().collect()
    } else {
        let mut set = BTreeSet::new();
        for atom in select {
            set.extend(atom.resolve(dag, git_modified)?);
        }
        set
    };

    for atom in unselect {
        for table_ref in atom.resolve(dag, git_modified)? {
            selected.remove(&table_ref);
        }
    }

    Ok(selected)
}

/// Parse a list of raw selector strings.
pub fn parse_atoms(raw: &[String]) -> LeaResult<Vec<SelectorAtom>> {
    raw.iter().map(|s| SelectorAtom::parse(s)).collect()
}

#[cfg(test)]
#[path = "selector_test.rs"]
mod tests;
