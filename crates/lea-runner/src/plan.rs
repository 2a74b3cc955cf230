//! Run planning
//!
//! Turns the active set into per-node decisions: materialise, query (tests),
//! or skip; and rewrites each node's SQL so dependencies read the right
//! form (audit, plain, or frozen production).

use lea_core::{LeaResult, RunConfig, Script, ScriptDag, ScriptKind, TableRef};
use lea_db::{TableStats, Warehouse};
use lea_sql::rewrite_table_references;
use std::collections::{BTreeSet, HashMap};

/// What the executor does with a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeAction {
    /// Create or replace the audit table from the node's SQL.
    Materialize { incremental: bool },
    /// Run the node's SQL as a test; pass iff zero rows.
    Query,
    /// Nothing to do: the audit checkpoint or production table is fresh.
    Skip { checkpoint: bool },
}

/// One active node, ready to execute.
#[derive(Debug, Clone)]
pub struct NodePlan {
    pub table_ref: TableRef,
    pub kind: ScriptKind,
    /// SQL with dependency references rewritten for this run.
    pub sql: String,
    pub action: NodeAction,
    /// Dependencies inside the active set, for scheduling.
    pub active_parents: BTreeSet<TableRef>,
}

impl NodePlan {
    /// Whether this node contributes an audit table to the publish phase.
    pub fn has_audit(&self) -> bool {
        matches!(
            self.action,
            NodeAction::Materialize { .. } | NodeAction::Skip { checkpoint: true }
        ) && !self.kind.is_test()
    }
}

/// The full plan for one run.
#[derive(Debug)]
pub struct RunPlan {
    /// Active nodes in topological order.
    pub order: Vec<TableRef>,
    pub nodes: HashMap<TableRef, NodePlan>,
}

impl RunPlan {
    /// Audit tables to promote at publish, with the incremental key when
    /// the node merges instead of replacing.
    pub fn promotable(&self, config: &RunConfig) -> Vec<(TableRef, Option<String>)> {
        self.order
            .iter()
            .filter_map(|table_ref| {
                let node = &self.nodes[table_ref];
                if !node.has_audit() {
                    return None;
                }
                let key = match &node.action {
                    NodeAction::Materialize { incremental: true } => config
                        .incremental
                        .as_ref()
                        .map(|clause| clause.field.clone()),
                    _ => None,
                };
                Some((table_ref.clone(), key))
            })
            .collect()
    }

    /// Number of nodes that actually run (not planned as skipped).
    pub fn runnable_count(&self) -> usize {
        self.nodes
            .values()
            .filter(|node| !matches!(node.action, NodeAction::Skip { .. }))
            .count()
    }
}

/// Build the plan for the active set.
///
/// `existing` is the warehouse's current table listing; audit entries are
/// recognised by suffix and keyed back to their base reference.
pub fn build_plan(
    dag: &ScriptDag,
    active: &BTreeSet<TableRef>,
    config: &RunConfig,
    existing: &HashMap<TableRef, TableStats>,
    warehouse: &dyn Warehouse,
) -> LeaResult<RunPlan> {
    let mut production_stats: HashMap<&TableRef, &TableStats> = HashMap::new();
    let mut audit_stats: HashMap<TableRef, &TableStats> = HashMap::new();
    for (table_ref, stats) in existing {
        if table_ref.is_audit() {
            audit_stats.insert(table_ref.remove_audit_suffix(), stats);
        } else {
            production_stats.insert(table_ref, stats);
        }
    }

    let order: Vec<TableRef> = dag
        .topological_order()?
        .into_iter()
        .filter(|table_ref| active.contains(table_ref))
        .collect();

    // First pass: decide regular nodes, so tests can look at their parents.
    let mut actions: HashMap<TableRef, NodeAction> = HashMap::new();
    for table_ref in &order {
        let script = dag
            .script(table_ref)
            .expect("active nodes come from the graph");
        if script.is_test() {
            continue;
        }
        let action = if config.restart {
            materialize_action(script, config)
        } else if let Some(audit) = audit_stats.get(table_ref) {
            if script.modified_at <= audit.updated_at {
                NodeAction::Skip { checkpoint: true }
            } else {
                materialize_action(script, config)
            }
        } else if let Some(production) = production_stats.get(table_ref) {
            if script.modified_at <= production.updated_at {
                NodeAction::Skip { checkpoint: false }
            } else {
                materialize_action(script, config)
            }
        } else {
            materialize_action(script, config)
        };
        actions.insert(table_ref.clone(), action);
    }

    // Second pass: a test is skippable only when everything it reads is a
    // validated production table fresher than the test itself.
    for table_ref in &order {
        let script = dag
            .script(table_ref)
            .expect("active nodes come from the graph");
        if !script.is_test() {
            continue;
        }
        let parents_settled = !config.restart
            && !script.dependencies.is_empty()
            && script.dependencies.iter().all(|parent| {
                matches!(
                    actions.get(parent),
                    Some(NodeAction::Skip { checkpoint: false })
                ) && production_stats
                    .get(parent)
                    .is_some_and(|stats| script.modified_at <= stats.updated_at)
            });
        let action = if parents_settled {
            NodeAction::Skip { checkpoint: false }
        } else {
            NodeAction::Query
        };
        actions.insert(table_ref.clone(), action);
    }

    let will_have_audit = |table_ref: &TableRef| {
        matches!(actions.get(table_ref), Some(NodeAction::Materialize { .. }))
            || matches!(actions.get(table_ref), Some(NodeAction::Skip { checkpoint: true }))
    };

    let mut nodes = HashMap::new();
    for table_ref in &order {
        let script = dag
            .script(table_ref)
            .expect("active nodes come from the graph");
        let action = actions[table_ref].clone();

        let sql = match action {
            NodeAction::Skip { .. } => script.sql.clone(),
            _ => rewrite_node_sql(
                script,
                dag,
                active,
                config,
                &audit_stats,
                &will_have_audit,
                warehouse,
            ),
        };

        let active_parents: BTreeSet<TableRef> = script
            .dependencies
            .iter()
            .filter(|parent| active.contains(*parent))
            .cloned()
            .collect();

        nodes.insert(
            table_ref.clone(),
            NodePlan {
                table_ref: table_ref.clone(),
                kind: script.kind,
                sql,
                action,
                active_parents,
            },
        );
    }

    Ok(RunPlan { order, nodes })
}

fn materialize_action(script: &Script, config: &RunConfig) -> NodeAction {
    NodeAction::Materialize {
        incremental: script.is_incremental && config.incremental.is_some(),
    }
}

/// Rewrite a node's dependency references for this run.
///
/// Each dependency resolves to one target form; both its plain and audit
/// spellings are mapped there, so assertion tests (written against the
/// audit form) and singular tests (written against the plain form) land on
/// the same table.
fn rewrite_node_sql(
    script: &Script,
    dag: &ScriptDag,
    active: &BTreeSet<TableRef>,
    config: &RunConfig,
    audit_stats: &HashMap<TableRef, &TableStats>,
    will_have_audit: &dyn Fn(&TableRef) -> bool,
    warehouse: &dyn Warehouse,
) -> String {
    let mut mapping: Vec<(String, String)> = Vec::new();
    for dependency in &script.dependencies {
        if !dag.contains(dependency) {
            continue;
        }
        let plain = dependency.to_sql_reference();
        let audit = dependency.audit().to_sql_reference();

        let target = if active.contains(dependency) && will_have_audit(dependency) {
            audit.clone()
        } else if audit_stats.contains_key(dependency) && !config.restart {
            // An unpublished checkpoint from an earlier run.
            audit.clone()
        } else if config.freeze_unselected && !active.contains(dependency) {
            warehouse.render_production_ref(dependency)
        } else {
            plain.clone()
        };

        if plain != target {
            mapping.push((plain, target.clone()));
        }
        if audit != target {
            mapping.push((audit, target));
        }
    }

    let rewritten = rewrite_table_references(&script.sql, &mapping);

    if script.is_incremental {
        if let (Some(clause), ScriptKind::Regular) = (&config.incremental, script.kind) {
            let values = clause
                .values
                .iter()
                .map(|value| format!("'{}'", value.replace('\'', "''")))
                .collect::<Vec<_>>()
                .join(", ");
            return format!(
                "SELECT *\nFROM (\n{rewritten}\n)\nWHERE {} IN ({values})",
                clause.field
            );
        }
    }

    rewritten
}

#[cfg(test)]
#[path = "plan_test.rs"]
mod tests;
