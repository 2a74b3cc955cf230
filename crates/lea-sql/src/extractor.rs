//! Table dependency extraction from the SQL AST

use crate::object_name_to_string;
use sqlparser::ast::{visit_relations, Expr, Query, SelectItem, SetExpr, Statement, Visit, Visitor};
use std::collections::{BTreeSet, HashSet};
use std::ops::ControlFlow;

/// Collects CTE names at every query depth.
#[derive(Default)]
struct CteCollector {
    names: HashSet<String>,
}

impl Visitor for CteCollector {
    type Break = ();

    fn pre_visit_query(&mut self, query: &Query) -> ControlFlow<Self::Break> {
        if let Some(with) = &query.with {
            for cte in &with.cte_tables {
                self.names.insert(cte.alias.name.value.clone());
            }
        }
        ControlFlow::Continue(())
    }
}

/// Extract all table references from SQL statements.
///
/// Walks the AST with `visit_relations`, collecting every relation in FROM
/// clauses, JOINs, subqueries, and set operations. Names defined by a WITH
/// clause anywhere in the statement are filtered out; they are query-local
/// and never dependencies.
pub fn extract_table_references(statements: &[Statement]) -> BTreeSet<String> {
    let mut ctes = CteCollector::default();
    for stmt in statements {
        let _ = stmt.visit(&mut ctes);
    }

    let mut references = BTreeSet::new();
    for stmt in statements {
        let _ = visit_relations(stmt, |relation| {
            references.insert(object_name_to_string(relation));
            ControlFlow::<()>::Continue(())
        });
    }

    references.retain(|reference| {
        let last = reference.split('.').next_back().unwrap_or(reference);
        !ctes.names.contains(last)
    });

    references
}

/// The named columns of the top-level SELECT list.
///
/// Aliases win over expression names; unnamed expressions and wildcards are
/// skipped. For set operations the left arm provides the names, as it does
/// in the warehouses themselves.
pub fn named_selects(statements: &[Statement]) -> Vec<String> {
    let mut names = Vec::new();
    for stmt in statements {
        if let Statement::Query(query) = stmt {
            collect_select_names(&query.body, &mut names);
        }
    }
    names
}

fn collect_select_names(body: &SetExpr, names: &mut Vec<String>) {
    match body {
        SetExpr::Select(select) => {
            for item in &select.projection {
                match item {
                    SelectItem::ExprWithAlias { alias, .. } => names.push(alias.value.clone()),
                    SelectItem::UnnamedExpr(Expr::Identifier(ident)) => {
                        names.push(ident.value.clone());
                    }
                    SelectItem::UnnamedExpr(Expr::CompoundIdentifier(parts)) => {
                        if let Some(last) = parts.last() {
                            names.push(last.value.clone());
                        }
                    }
                    _ => {}
                }
            }
        }
        SetExpr::SetOperation { left, .. } => collect_select_names(left, names),
        SetExpr::Query(query) => collect_select_names(&query.body, names),
        _ => {}
    }
}

#[cfg(test)]
#[path = "extractor_test.rs"]
mod tests;
