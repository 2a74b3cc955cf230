use super::*;

fn table(spec: &str) -> TableRef {
    let mut segments: Vec<String> = spec.split('.').map(str::to_string).collect();
    let name = segments.pop().unwrap();
    TableRef::new(segments, name)
}

fn memory_warehouse() -> DuckDbWarehouse {
    DuckDbWarehouse::open(":memory:", None).unwrap()
}

#[tokio::test]
async fn test_materialize_creates_audit_table() {
    let wh = memory_warehouse();
    let users = table("core.users");

    let n_rows = wh
        .materialize(&users, "SELECT 1 AS id UNION ALL SELECT 2", true)
        .await
        .unwrap();
    assert_eq!(n_rows, 2);

    let count = wh
        .query_count("SELECT * FROM core.users___audit")
        .await
        .unwrap();
    assert_eq!(count, 2);
}

#[tokio::test]
async fn test_materialize_is_idempotent() {
    let wh = memory_warehouse();
    let users = table("core.users");
    wh.materialize(&users, "SELECT 1 AS id", true).await.unwrap();
    let n_rows = wh.materialize(&users, "SELECT 1 AS id", true).await.unwrap();
    assert_eq!(n_rows, 1);
}

#[tokio::test]
async fn test_promote_replaces_production() {
    let wh = memory_warehouse();
    let users = table("core.users");

    wh.materialize(&users, "SELECT 1 AS id", false).await.unwrap();
    wh.materialize(&users, "SELECT 2 AS id UNION ALL SELECT 3", true)
        .await
        .unwrap();
    wh.promote(&users.audit()).await.unwrap();

    let count = wh.query_count("SELECT * FROM core.users").await.unwrap();
    assert_eq!(count, 2);
    let old = wh
        .query_count("SELECT * FROM core.users WHERE id = 1")
        .await
        .unwrap();
    assert_eq!(old, 0);
}

#[tokio::test]
async fn test_promote_incremental_preserves_other_keys() {
    let wh = memory_warehouse();
    let events = table("core.events");

    // Production holds two accounts.
    wh.materialize(
        &events,
        "SELECT 'alpha' AS account, 1 AS amount UNION ALL SELECT 'beta', 2",
        false,
    )
    .await
    .unwrap();
    // The audit table refreshes only alpha.
    wh.materialize(&events, "SELECT 'alpha' AS account, 99 AS amount", true)
        .await
        .unwrap();

    wh.promote_incremental(&events.audit(), "account").await.unwrap();

    let beta = wh
        .query_count("SELECT * FROM core.events WHERE account = 'beta' AND amount = 2")
        .await
        .unwrap();
    assert_eq!(beta, 1, "rows outside the refreshed keys must survive");
    let alpha = wh
        .query_count("SELECT * FROM core.events WHERE account = 'alpha' AND amount = 99")
        .await
        .unwrap();
    assert_eq!(alpha, 1);
    let stale = wh
        .query_count("SELECT * FROM core.events WHERE account = 'alpha' AND amount = 1")
        .await
        .unwrap();
    assert_eq!(stale, 0);
}

#[tokio::test]
async fn test_promote_incremental_without_production_falls_back_to_clone() {
    let wh = memory_warehouse();
    let events = table("core.events");
    wh.materialize(&events, "SELECT 'alpha' AS account", true)
        .await
        .unwrap();
    wh.promote_incremental(&events.audit(), "account").await.unwrap();
    assert_eq!(wh.query_count("SELECT * FROM core.events").await.unwrap(), 1);
}

#[tokio::test]
async fn test_materialization_time_advances() {
    let wh = memory_warehouse();
    let users = table("core.users");
    wh.materialize(&users, "SELECT 1 AS id", true).await.unwrap();
    let first = wh.list_tables().await.unwrap()[&users.audit()].updated_at;
    wh.materialize(&users, "SELECT 1 AS id", true).await.unwrap();
    let second = wh.list_tables().await.unwrap()[&users.audit()].updated_at;
    assert!(second >= first);
}

#[tokio::test]
async fn test_drop_table() {
    let wh = memory_warehouse();
    let users = table("core.users");
    wh.materialize(&users, "SELECT 1 AS id", true).await.unwrap();
    wh.drop_table(&users, true).await.unwrap();
    assert!(wh.query_count("SELECT * FROM core.users___audit").await.is_err());
    // Dropping again is fine.
    wh.drop_table(&users, true).await.unwrap();
}

#[tokio::test]
async fn test_list_tables_reports_audit_and_production_forms() {
    let wh = memory_warehouse();
    let users = table("core.users");
    wh.materialize(&users, "SELECT 1 AS id", false).await.unwrap();
    wh.materialize(&users, "SELECT 1 AS id", true).await.unwrap();

    let tables = wh.list_tables().await.unwrap();
    assert!(tables.contains_key(&users));
    assert!(tables.contains_key(&users.audit()));
    assert!(tables[&users].updated_at > chrono::DateTime::<chrono::Utc>::UNIX_EPOCH);
}

#[tokio::test]
async fn test_list_tables_foreign_table_is_never_a_fresh_checkpoint() {
    let wh = memory_warehouse();
    wh.execute_batch_sync("CREATE SCHEMA raw; CREATE TABLE raw.events AS SELECT 1 AS id")
        .unwrap();
    let tables = wh.list_tables().await.unwrap();
    let stats = &tables[&table("raw.events")];
    assert_eq!(stats.updated_at, chrono::DateTime::<chrono::Utc>::UNIX_EPOCH);
}

#[tokio::test]
async fn test_query_rows_formats_values() {
    let wh = memory_warehouse();
    let rows = wh
        .query_rows("SELECT 'X' AS blood_type, 3 AS n UNION ALL SELECT 'Y', 4", 1)
        .await
        .unwrap();
    assert_eq!(rows, vec!["X, 3".to_string()]);
}

#[tokio::test]
async fn test_teardown_drops_all_lea_schemas() {
    let wh = memory_warehouse();
    let users = table("core.users");
    wh.materialize(&users, "SELECT 1 AS id", false).await.unwrap();
    wh.teardown().await.unwrap();
    assert!(wh.query_count("SELECT * FROM core.users").await.is_err());
}

#[test]
fn test_dev_path_for_files_and_motherduck() {
    assert_eq!(dev_path(":memory:", "max"), ":memory:");
    assert_eq!(dev_path("md:warehouse", "max"), "md:warehouse_max");
    assert_eq!(
        dev_path("data/warehouse.duckdb", "max"),
        "data/warehouse_max.duckdb"
    );

    let dir = tempfile::tempdir().unwrap();
    let prod = dir.path().join("warehouse.duckdb");
    let dev = DuckDbWarehouse::open(prod.to_str().unwrap(), Some("max")).unwrap();
    assert!(dev.path().ends_with("warehouse_max.duckdb"));
}

#[test]
fn test_catalog_name_from_path() {
    assert_eq!(catalog_name("data/warehouse.duckdb"), "warehouse");
    assert_eq!(catalog_name("md:warehouse"), "warehouse");
}

#[tokio::test]
async fn test_frozen_references_read_the_production_file() {
    let dir = tempfile::tempdir().unwrap();
    let prod_path = dir.path().join("warehouse.duckdb");
    let prod_str = prod_path.to_str().unwrap().to_string();

    // Seed production.
    {
        let prod = DuckDbWarehouse::open(&prod_str, None).unwrap();
        prod.materialize(&table("staging.orders"), "SELECT 1 AS order_id", false)
            .await
            .unwrap();
    }

    let dev = DuckDbWarehouse::open(&prod_str, Some("max")).unwrap();
    dev.prepare().await.unwrap();

    let frozen = dev.render_production_ref(&table("staging.orders"));
    assert_eq!(frozen, "warehouse.staging.orders");
    let count = dev
        .query_count(&format!("SELECT * FROM {frozen}"))
        .await
        .unwrap();
    assert_eq!(count, 1);
}
