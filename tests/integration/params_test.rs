//! Parameter extraction and substitution properties.

use std::collections::HashMap;

use duneq::commands;
use duneq::params::{extract_parameters, substitute_parameters};
use pretty_assertions::assert_eq;

#[test]
fn distinct_names_in_first_seen_order() {
    let sql = "SELECT * FROM t WHERE a = {{x}} AND b = {{y}} AND c = {{x}}";
    assert_eq!(extract_parameters(sql), vec!["x", "y"]);
}

#[test]
fn token_free_text_yields_empty_set() {
    assert_eq!(extract_parameters(""), Vec::<String>::new());
    assert_eq!(
        extract_parameters("SELECT count(*) FROM dex.trades"),
        Vec::<String>::new()
    );
    assert_eq!(
        extract_parameters("not sql at all {nor this} {{nor this}}..."),
        Vec::<String>::new()
    );
}

#[test]
fn extraction_matches_substitution_targets() {
    let sql = "WHERE chain = '{{chain}}' AND day >= DATE '{{start}}' AND chain != '{{chain}}'";

    let mut values = HashMap::new();
    for name in extract_parameters(sql) {
        values.insert(name, "v".to_string());
    }
    let substituted = substitute_parameters(sql, &values);

    // Every detected placeholder is gone after substitution.
    assert_eq!(extract_parameters(&substituted), Vec::<String>::new());
}

#[test]
fn prepare_sql_reports_every_missing_placeholder() {
    let err = commands::prepare_sql(
        "SELECT {{a}}, {{b}}, {{c}} FROM t",
        &["b=2".to_string()],
    )
    .unwrap_err();

    let message = err.to_string();
    assert!(message.contains("a"));
    assert!(message.contains("c"));
    assert!(!message.contains("b,"));
}

#[test]
fn prepare_sql_escapes_quotes_in_values() {
    let sql = commands::prepare_sql(
        "WHERE name = '{{name}}'",
        &["name=O'Brien".to_string()],
    )
    .unwrap();
    assert_eq!(sql, "WHERE name = 'O''Brien'");
}
