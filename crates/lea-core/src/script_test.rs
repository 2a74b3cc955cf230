use super::*;

#[test]
fn test_script_kind_is_test() {
    assert!(!ScriptKind::Regular.is_test());
    assert!(ScriptKind::TestSingular.is_test());
    assert!(ScriptKind::TestAssertion.is_test());
}

#[test]
fn test_assertion_column_accessor() {
    let assertion = Assertion::UniqueBy {
        column: "order_id".to_string(),
        by: vec!["account".to_string()],
    };
    assert_eq!(assertion.column(), "order_id");
}

#[test]
fn test_assertion_kind_labels() {
    let column = "c".to_string();
    assert_eq!(
        Assertion::NoNulls {
            column: column.clone()
        }
        .kind_label(),
        "no_nulls"
    );
    assert_eq!(
        Assertion::Unique {
            column: column.clone()
        }
        .kind_label(),
        "unique"
    );
    assert_eq!(
        Assertion::UniqueBy {
            column: column.clone(),
            by: vec![]
        }
        .kind_label(),
        "unique_by"
    );
    assert_eq!(
        Assertion::Set {
            column,
            values: vec![]
        }
        .kind_label(),
        "set"
    );
}
