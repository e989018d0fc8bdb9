//! Integration tests for variable preprocessing.

use promviz::lowering::preprocess::{
    replace_builtin_variables, replace_variables, restore_builtin_variables, restore_variables,
};

#[test]
fn test_builtin_variables_round_trip() {
    let expr = "rate(m[$__rate_interval]) + irate(m[$__interval])";
    let replaced = replace_builtin_variables(expr);
    assert!(!replaced.contains('$'));
    assert_eq!(restore_builtin_variables(&replaced), expr);
}

#[test]
fn test_builtin_placeholders_preserve_offsets() {
    let expr = "rate(m[$__interval_ms])";
    let replaced = replace_builtin_variables(expr);
    assert_eq!(replaced.len(), expr.len());
    // The bracket positions are unchanged.
    assert_eq!(replaced.find('['), expr.find('['));
    assert_eq!(replaced.find(']'), expr.find(']'));
}

#[test]
fn test_template_variables_are_identifier_shaped() {
    let (replaced, table) = replace_variables("sum(rate($metric[5m]))");
    assert_eq!(table.len(), 1);
    let placeholder = table.keys().next().unwrap();
    assert!(placeholder.starts_with("__v"));
    assert!(placeholder
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_'));
    assert!(replaced.contains(placeholder.as_str()));
}

#[test]
fn test_template_forms_all_recorded() {
    let (_, table) = replace_variables("$a + [[host]] + ${env:csv} + ${region}");
    let mut originals: Vec<&str> = table.values().map(String::as_str).collect();
    originals.sort();
    assert_eq!(originals, vec!["$a", "${env:csv}", "${region}", "[[host]]"]);
}

#[test]
fn test_restore_variables_round_trip() {
    let expr = r#"topk($count, m{job="$job"})"#;
    let (replaced, table) = replace_variables(expr);
    assert!(!replaced.contains('$'));
    assert_eq!(restore_variables(&replaced, &table), expr);
}

#[test]
fn test_builtin_runs_before_template() {
    // Builtin rewriting leaves no `$__` for the template pattern to claim.
    let expr = "rate(m[$__rate_interval])";
    let after_builtin = replace_builtin_variables(expr);
    let (replaced, table) = replace_variables(&after_builtin);
    assert!(table.is_empty());
    assert_eq!(replaced, after_builtin);
}
