//! Table-reference rewriting
//!
//! The executor rewrites dependency references inside a script's SQL before
//! handing it to the warehouse: audit form for dependencies being built in
//! the same run, production form for frozen ancestors. Replacement is
//! word-bounded text substitution, the same approach the warehouses survive
//! for their own `information_schema` text.

use regex::{NoExpand, Regex};

/// Replace whole-word occurrences of each `from` reference with its `to`
/// form.
///
/// Word boundaries keep `staging.orders` from matching inside
/// `staging.orders_archive` or `core.users` inside `core.users___audit`.
pub fn rewrite_table_references(sql: &str, mapping: &[(String, String)]) -> String {
    let mut rewritten = sql.to_string();
    for (from, to) in mapping {
        let pattern = format!(r"\b{}\b", regex::escape(from));
        // The pattern is built from an escaped literal; compilation cannot fail.
        if let Ok(re) = Regex::new(&pattern) {
            rewritten = re.replace_all(&rewritten, NoExpand(to)).into_owned();
        }
    }
    rewritten
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapping(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(a, b)| (a.to_string(), b.to_string()))
            .collect()
    }

    #[test]
    fn test_rewrite_to_audit_form() {
        let sql = "SELECT * FROM staging.orders JOIN staging.customers USING (customer_id)";
        let rewritten = rewrite_table_references(
            sql,
            &mapping(&[
                ("staging.orders", "staging.orders___audit"),
                ("staging.customers", "staging.customers___audit"),
            ]),
        );
        assert_eq!(
            rewritten,
            "SELECT * FROM staging.orders___audit JOIN staging.customers___audit USING (customer_id)"
        );
    }

    #[test]
    fn test_rewrite_does_not_match_longer_names() {
        let sql = "SELECT * FROM staging.orders_archive";
        let rewritten = rewrite_table_references(
            sql,
            &mapping(&[("staging.orders", "staging.orders___audit")]),
        );
        assert_eq!(rewritten, sql);
    }

    #[test]
    fn test_rewrite_leaves_existing_audit_refs_alone() {
        let sql = "SELECT * FROM core.users___audit";
        let rewritten =
            rewrite_table_references(sql, &mapping(&[("core.users", "dev.core.users")]));
        assert_eq!(rewritten, sql);
    }

    #[test]
    fn test_rewrite_to_frozen_production_form() {
        let sql = "SELECT id FROM staging.payments WHERE amount > 0";
        let rewritten = rewrite_table_references(
            sql,
            &mapping(&[("staging.payments", "warehouse.staging.payments")]),
        );
        assert_eq!(
            rewritten,
            "SELECT id FROM warehouse.staging.payments WHERE amount > 0"
        );
    }
}
