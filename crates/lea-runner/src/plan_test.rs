use super::*;
use crate::test_utils::{table, MockWarehouse};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use lea_core::{IncrementalClause, Script, ScriptDag};
use std::path::PathBuf;

fn script_at(spec: &str, deps: &[&str], sql: &str, modified_at: DateTime<Utc>) -> Script {
    let table_ref = table(spec);
    let kind = if table_ref.top_schema() == Some("tests") {
        ScriptKind::TestAssertion
    } else {
        ScriptKind::Regular
    };
    Script {
        table_ref,
        kind,
        sql: sql.to_string(),
        dependencies: deps.iter().map(|d| table(d)).collect(),
        external_dependencies: Default::default(),
        assertions: Vec::new(),
        clustering_fields: Vec::new(),
        is_incremental: false,
        modified_at,
        path: PathBuf::from(format!("scripts/{}.sql", spec.replace('.', "/"))),
    }
}

fn hour_ago() -> DateTime<Utc> {
    Utc::now() - ChronoDuration::hours(1)
}

fn stats_at(updated_at: DateTime<Utc>) -> TableStats {
    TableStats {
        n_rows: Some(1),
        updated_at,
    }
}

fn active_set(dag: &ScriptDag) -> BTreeSet<TableRef> {
    dag.table_refs().cloned().collect()
}

#[test]
fn test_clean_state_materializes_everything() {
    let dag = ScriptDag::build(vec![
        script_at("staging.orders", &[], "SELECT 1 AS id", hour_ago()),
        script_at(
            "core.orders",
            &["staging.orders"],
            "SELECT * FROM staging.orders",
            hour_ago(),
        ),
    ])
    .unwrap();
    let config = RunConfig::default();
    let warehouse = MockWarehouse::default();

    let plan = build_plan(
        &dag,
        &active_set(&dag),
        &config,
        &HashMap::new(),
        &warehouse,
    )
    .unwrap();

    assert_eq!(plan.order.len(), 2);
    assert!(plan
        .nodes
        .values()
        .all(|n| matches!(n.action, NodeAction::Materialize { .. })));
    // The child reads the parent's audit table.
    assert!(plan.nodes[&table("core.orders")]
        .sql
        .contains("staging.orders___audit"));
}

#[test]
fn test_fresh_production_tables_skip_the_whole_run() {
    let dag = ScriptDag::build(vec![
        script_at("staging.orders", &[], "SELECT 1 AS id", hour_ago()),
        script_at(
            "core.orders",
            &["staging.orders"],
            "SELECT * FROM staging.orders",
            hour_ago(),
        ),
        script_at(
            "tests.staging__orders__id___unique",
            &["staging.orders"],
            "SELECT id FROM staging.orders___audit GROUP BY id HAVING COUNT(*) > 1",
            hour_ago(),
        ),
    ])
    .unwrap();
    let config = RunConfig::default();
    let warehouse = MockWarehouse::default();

    let existing: HashMap<TableRef, TableStats> = [
        (table("staging.orders"), stats_at(Utc::now())),
        (table("core.orders"), stats_at(Utc::now())),
    ]
    .into_iter()
    .collect();

    let plan = build_plan(&dag, &active_set(&dag), &config, &existing, &warehouse).unwrap();

    assert!(plan
        .nodes
        .values()
        .all(|n| matches!(n.action, NodeAction::Skip { checkpoint: false })));
    assert!(plan.promotable(&config).is_empty());
    assert_eq!(plan.runnable_count(), 0);
}

#[test]
fn test_audit_checkpoint_skips_but_still_promotes() {
    let dag = ScriptDag::build(vec![
        script_at("staging.orders", &[], "SELECT 1 AS id", hour_ago()),
        script_at(
            "core.orders",
            &["staging.orders"],
            "SELECT * FROM staging.orders",
            hour_ago(),
        ),
    ])
    .unwrap();
    let config = RunConfig::default();
    let warehouse = MockWarehouse::default();

    // staging.orders succeeded in a previous failed run; its audit table is
    // fresher than the script.
    let existing: HashMap<TableRef, TableStats> =
        [(table("staging.orders").audit(), stats_at(Utc::now()))]
            .into_iter()
            .collect();

    let plan = build_plan(&dag, &active_set(&dag), &config, &existing, &warehouse).unwrap();

    assert_eq!(
        plan.nodes[&table("staging.orders")].action,
        NodeAction::Skip { checkpoint: true }
    );
    assert!(matches!(
        plan.nodes[&table("core.orders")].action,
        NodeAction::Materialize { .. }
    ));
    // The checkpointed parent is read in audit form and still promoted.
    assert!(plan.nodes[&table("core.orders")]
        .sql
        .contains("staging.orders___audit"));
    let promotable = plan.promotable(&config);
    assert!(promotable.iter().any(|(t, _)| *t == table("staging.orders")));
}

#[test]
fn test_stale_script_reruns() {
    let dag = ScriptDag::build(vec![script_at(
        "staging.orders",
        &[],
        "SELECT 1 AS id",
        Utc::now(),
    )])
    .unwrap();
    let config = RunConfig::default();
    let warehouse = MockWarehouse::default();

    // Both forms exist but are older than the script.
    let existing: HashMap<TableRef, TableStats> = [
        (table("staging.orders"), stats_at(hour_ago())),
        (table("staging.orders").audit(), stats_at(hour_ago())),
    ]
    .into_iter()
    .collect();

    let plan = build_plan(&dag, &active_set(&dag), &config, &existing, &warehouse).unwrap();
    assert!(matches!(
        plan.nodes[&table("staging.orders")].action,
        NodeAction::Materialize { .. }
    ));
}

#[test]
fn test_restart_ignores_checkpoints() {
    let dag = ScriptDag::build(vec![script_at(
        "staging.orders",
        &[],
        "SELECT 1 AS id",
        hour_ago(),
    )])
    .unwrap();
    let config = RunConfig {
        restart: true,
        ..RunConfig::default()
    };
    let warehouse = MockWarehouse::default();

    let existing: HashMap<TableRef, TableStats> = [
        (table("staging.orders"), stats_at(Utc::now())),
        (table("staging.orders").audit(), stats_at(Utc::now())),
    ]
    .into_iter()
    .collect();

    let plan = build_plan(&dag, &active_set(&dag), &config, &existing, &warehouse).unwrap();
    assert!(matches!(
        plan.nodes[&table("staging.orders")].action,
        NodeAction::Materialize { .. }
    ));
}

#[test]
fn test_freeze_unselected_renders_production_references() {
    let dag = ScriptDag::build(vec![
        script_at("staging.orders", &[], "SELECT 1 AS id", hour_ago()),
        script_at(
            "core.orders",
            &["staging.orders"],
            "SELECT * FROM staging.orders",
            hour_ago(),
        ),
    ])
    .unwrap();
    let config = RunConfig {
        freeze_unselected: true,
        ..RunConfig::default()
    };
    let warehouse = MockWarehouse::default();

    // Only core.orders is selected; staging.orders is a frozen ancestor.
    let active: BTreeSet<TableRef> = [table("core.orders")].into_iter().collect();
    let plan = build_plan(&dag, &active, &config, &HashMap::new(), &warehouse).unwrap();

    assert_eq!(plan.order.len(), 1);
    assert!(plan.nodes[&table("core.orders")]
        .sql
        .contains("prod.staging.orders"));
}

#[test]
fn test_unselected_dependency_without_freeze_stays_plain() {
    let dag = ScriptDag::build(vec![
        script_at("staging.orders", &[], "SELECT 1 AS id", hour_ago()),
        script_at(
            "core.orders",
            &["staging.orders"],
            "SELECT * FROM staging.orders",
            hour_ago(),
        ),
    ])
    .unwrap();
    let config = RunConfig::default();
    let warehouse = MockWarehouse::default();

    let active: BTreeSet<TableRef> = [table("core.orders")].into_iter().collect();
    let plan = build_plan(&dag, &active, &config, &HashMap::new(), &warehouse).unwrap();

    let sql = &plan.nodes[&table("core.orders")].sql;
    assert!(sql.contains("FROM staging.orders"));
    assert!(!sql.contains("___audit"));
    assert!(!sql.contains("prod."));
}

#[test]
fn test_assertion_test_follows_parent_to_production_form() {
    let dag = ScriptDag::build(vec![
        script_at("core.users", &[], "SELECT 1 AS id", hour_ago()),
        script_at(
            "tests.core__users__id___unique",
            &["core.users"],
            "SELECT id FROM core.users___audit GROUP BY id HAVING COUNT(*) > 1",
            Utc::now(),
        ),
    ])
    .unwrap();
    let config = RunConfig::default();
    let warehouse = MockWarehouse::default();

    // The parent is fresh in production, but the test itself is newer, so
    // it runs, and it must read the promoted table instead of the audit.
    let existing: HashMap<TableRef, TableStats> =
        [(table("core.users"), stats_at(hour_ago() + ChronoDuration::minutes(30)))]
            .into_iter()
            .collect();

    let plan = build_plan(&dag, &active_set(&dag), &config, &existing, &warehouse).unwrap();

    let probe = &plan.nodes[&table("tests.core__users__id___unique")];
    assert_eq!(probe.action, NodeAction::Query);
    assert!(probe.sql.contains("FROM core.users "));
    assert!(!probe.sql.contains("___audit"));
}

#[test]
fn test_incremental_script_is_wrapped_and_merged() {
    let mut script = script_at("core.events", &[], "SELECT 1 AS account, 2 AS n", hour_ago());
    script.is_incremental = true;
    let dag = ScriptDag::build(vec![script]).unwrap();
    let config = RunConfig {
        incremental: Some(IncrementalClause {
            field: "account".to_string(),
            values: ["demo".to_string()].into_iter().collect(),
        }),
        ..RunConfig::default()
    };
    let warehouse = MockWarehouse::default();

    let plan = build_plan(&dag, &active_set(&dag), &config, &HashMap::new(), &warehouse).unwrap();

    let node = &plan.nodes[&table("core.events")];
    assert_eq!(node.action, NodeAction::Materialize { incremental: true });
    assert!(node.sql.contains("WHERE account IN ('demo')"));

    let promotable = plan.promotable(&config);
    assert_eq!(promotable.len(), 1);
    assert_eq!(promotable[0].1.as_deref(), Some("account"));
}
