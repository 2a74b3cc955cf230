//! Test SQL generation from assertions

use lea_core::{Assertion, Script, ScriptKind, TableRef};

/// Generate SQL for a no-nulls assertion.
///
/// Returns the rows where the column is NULL.
pub fn generate_no_nulls_test(table: &str, column: &str) -> String {
    format!("SELECT {column}\nFROM {table}\nWHERE {column} IS NULL")
}

/// Generate SQL for a unique assertion.
///
/// Returns the column values that appear more than once.
pub fn generate_unique_test(table: &str, column: &str) -> String {
    format!(
        "SELECT {column}, COUNT(*) AS n\nFROM {table}\nWHERE {column} IS NOT NULL\nGROUP BY {column}\nHAVING COUNT(*) > 1"
    )
}

/// Generate SQL for a unique-by assertion.
///
/// Returns the column values that appear more than once within a group.
pub fn generate_unique_by_test(table: &str, column: &str, by: &[String]) -> String {
    let group = by.join(", ");
    format!(
        "SELECT {group}, {column}, COUNT(*) AS n\nFROM {table}\nWHERE {column} IS NOT NULL\nGROUP BY {group}, {column}\nHAVING COUNT(*) > 1"
    )
}

/// Generate SQL for a set assertion.
///
/// Returns the distinct column values outside the allowed set.
pub fn generate_set_test(table: &str, column: &str, values: &[String]) -> String {
    let allowed = values
        .iter()
        .map(|value| format_set_value(value))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "SELECT {column}\nFROM {table}\nWHERE {column} IS NOT NULL\nAND {column} NOT IN ({allowed})\nGROUP BY {column}"
    )
}

/// Quote a set value unless it is already a SQL literal.
fn format_set_value(value: &str) -> String {
    let already_literal = (value.starts_with('\'') && value.ends_with('\''))
        || value.parse::<f64>().is_ok();
    if already_literal {
        value.to_string()
    } else {
        format!("'{}'", value.replace('\'', "''"))
    }
}

/// The table reference of the test synthesised for one assertion.
///
/// Lives under the `tests` schema, named after the parent's full chain, the
/// column, and the assertion kind: `tests.core__users__email___no_nulls`.
fn test_table_ref(parent: &TableRef, assertion: &Assertion) -> TableRef {
    let mut packed: Vec<&str> = parent.schema().iter().map(String::as_str).collect();
    packed.push(parent.name());
    let mut name = format!(
        "{}__{}___{}",
        packed.join("__"),
        assertion.column(),
        assertion.kind_label()
    );
    if let Assertion::UniqueBy { by, .. } = assertion {
        name.push_str("___");
        name.push_str(&by.join("_"));
    }
    TableRef::new(vec!["tests".to_string()], name)
}

/// Expand a script's assertions into synthetic test scripts.
///
/// Each test queries the parent's audit table and depends on exactly its
/// parent. Scripts that are themselves tests yield nothing.
pub fn assertion_scripts(parent: &Script) -> Vec<Script> {
    if parent.is_test() {
        return Vec::new();
    }

    let audit_reference = parent.table_ref.audit().to_sql_reference();

    parent
        .assertions
        .iter()
        .map(|assertion| {
            let sql = match assertion {
                Assertion::NoNulls { column } => generate_no_nulls_test(&audit_reference, column),
                Assertion::Unique { column } => generate_unique_test(&audit_reference, column),
                Assertion::UniqueBy { column, by } => {
                    generate_unique_by_test(&audit_reference, column, by)
                }
                Assertion::Set { column, values } => {
                    generate_set_test(&audit_reference, column, values)
                }
            };
            Script {
                table_ref: test_table_ref(&parent.table_ref, assertion),
                kind: ScriptKind::TestAssertion,
                sql,
                dependencies: [parent.table_ref.clone()].into_iter().collect(),
                external_dependencies: Default::default(),
                assertions: Vec::new(),
                clustering_fields: Vec::new(),
                is_incremental: false,
                modified_at: parent.modified_at,
                path: parent.path.clone(),
            }
        })
        .collect()
}

#[cfg(test)]
#[path = "generator_test.rs"]
mod tests;
