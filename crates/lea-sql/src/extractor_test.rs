use super::*;
use crate::parser::SqlParser;

fn extract(sql: &str) -> Vec<String> {
    let statements = SqlParser::default().parse(sql).unwrap();
    extract_table_references(&statements).into_iter().collect()
}

fn selects(sql: &str) -> Vec<String> {
    let statements = SqlParser::default().parse(sql).unwrap();
    named_selects(&statements)
}

#[test]
fn test_extract_from_and_join() {
    let deps = extract(
        "SELECT o.id FROM staging.orders o JOIN staging.customers c ON o.customer_id = c.id",
    );
    assert_eq!(deps, vec!["staging.customers", "staging.orders"]);
}

#[test]
fn test_extract_filters_ctes() {
    let deps = extract(
        "WITH recent AS (SELECT * FROM staging.orders WHERE ordered_at > '2024-01-01')
         SELECT * FROM recent JOIN staging.customers USING (customer_id)",
    );
    assert_eq!(deps, vec!["staging.customers", "staging.orders"]);
}

#[test]
fn test_extract_filters_nested_ctes() {
    let deps = extract(
        "SELECT * FROM (
            WITH inner_cte AS (SELECT * FROM staging.payments)
            SELECT * FROM inner_cte
        ) sub",
    );
    assert_eq!(deps, vec!["staging.payments"]);
}

#[test]
fn test_extract_subquery() {
    let deps = extract(
        "SELECT * FROM core.orders WHERE customer_id IN (SELECT id FROM core.customers)",
    );
    assert_eq!(deps, vec!["core.customers", "core.orders"]);
}

#[test]
fn test_extract_set_operation() {
    let deps = extract("SELECT id FROM a.left_side UNION ALL SELECT id FROM a.right_side");
    assert_eq!(deps, vec!["a.left_side", "a.right_side"]);
}

#[test]
fn test_extract_cte_shadowing_keeps_real_tables() {
    // A CTE named like a real table still shadows it within the query.
    let deps = extract(
        "WITH orders AS (SELECT * FROM staging.raw_orders) SELECT * FROM orders",
    );
    assert_eq!(deps, vec!["staging.raw_orders"]);
}

#[test]
fn test_named_selects_plain_and_aliased() {
    let names = selects("SELECT id, o.customer_id, SUM(amount) AS total FROM staging.orders o");
    assert_eq!(names, vec!["id", "customer_id", "total"]);
}

#[test]
fn test_named_selects_skips_wildcard() {
    let names = selects("SELECT *, id FROM staging.orders");
    assert_eq!(names, vec!["id"]);
}

#[test]
fn test_named_selects_union_uses_left_arm() {
    let names = selects("SELECT id FROM a.x UNION SELECT other FROM a.y");
    assert_eq!(names, vec!["id"]);
}

#[test]
fn test_named_selects_through_with() {
    let names = selects("WITH t AS (SELECT 1 AS one) SELECT one, two FROM t");
    assert_eq!(names, vec!["one", "two"]);
}
