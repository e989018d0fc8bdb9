//! Integration tests for lowering query text to the visual query model.

use promviz::{build_visual_query, LabelFilter, OpValue, VectorMatchType};

fn label(name: &str, op: &str, value: &str) -> LabelFilter {
    LabelFilter {
        label: name.to_string(),
        op: op.to_string(),
        value: value.to_string(),
    }
}

fn op_ids(result: &promviz::BuildResult) -> Vec<&str> {
    result
        .query
        .operations
        .iter()
        .map(|op| op.id.as_str())
        .collect()
}

#[test]
fn test_bare_metric() {
    let result = build_visual_query("http_requests_total");
    assert_eq!(result.query.metric, "http_requests_total");
    assert!(result.query.labels.is_empty());
    assert!(result.query.operations.is_empty());
    assert!(result.query.binary_queries.is_empty());
    assert!(result.errors.is_empty());
}

#[test]
fn test_metric_with_label_matchers() {
    let result = build_visual_query(r#"m{a="x", b!='y', c=~"z.*", d!~`w`}"#);
    assert_eq!(result.query.metric, "m");
    assert_eq!(
        result.query.labels,
        vec![
            label("a", "=", "x"),
            label("b", "!=", "y"),
            label("c", "=~", "z.*"),
            label("d", "!~", "w"),
        ]
    );
    assert!(result.errors.is_empty());
}

#[test]
fn test_quoted_metric_name() {
    let result = build_visual_query(r#"{"my.metric"}"#);
    assert_eq!(result.query.metric, "my.metric");
    assert!(result.query.labels.is_empty());
    assert!(result.errors.is_empty());
}

#[test]
fn test_quoted_metric_name_with_labels() {
    let result = build_visual_query(r#"{"my.metric", job="api"}"#);
    assert_eq!(result.query.metric, "my.metric");
    assert_eq!(result.query.labels, vec![label("job", "=", "api")]);
}

#[test]
fn test_quoted_label_matcher() {
    let result = build_visual_query(r#"{"label.with.dots"='val'}"#);
    assert_eq!(
        result.query.labels,
        vec![label("label.with.dots", "=", "val")]
    );
    assert!(result.errors.is_empty());
}

#[test]
fn test_nested_functions_apply_innermost_first() {
    let result = build_visual_query("histogram_quantile(0.95, rate(m[5m]))");
    assert_eq!(result.query.metric, "m");
    assert_eq!(op_ids(&result), vec!["rate", "histogram_quantile"]);
    assert_eq!(result.query.operations[0].params, vec![OpValue::from("5m")]);
    assert_eq!(result.query.operations[1].params, vec![OpValue::from(0.95)]);
    assert!(result.errors.is_empty());
}

#[test]
fn test_aggregation_by() {
    let result = build_visual_query("sum by (job, instance) (rate(m[5m]))");
    assert_eq!(op_ids(&result), vec!["rate", "__sum_by"]);
    assert_eq!(
        result.query.operations[1].params,
        vec![OpValue::from("job"), OpValue::from("instance")]
    );
}

#[test]
fn test_aggregation_without_trailing_modifier() {
    let result = build_visual_query("sum(m) without (job)");
    assert_eq!(op_ids(&result), vec!["__sum_without"]);
    assert_eq!(result.query.operations[0].params, vec![OpValue::from("job")]);
    assert_eq!(result.query.metric, "m");
}

#[test]
fn test_aggregation_params_precede_grouping_labels() {
    let result = build_visual_query("topk by (job) (5, m)");
    assert_eq!(op_ids(&result), vec!["__topk_by"]);
    assert_eq!(
        result.query.operations[0].params,
        vec![OpValue::from(5.0), OpValue::from("job")]
    );
}

#[test]
fn test_scalar_binary_appends_operation() {
    let result = build_visual_query("metric * 2");
    assert_eq!(result.query.metric, "metric");
    assert!(result.query.binary_queries.is_empty());
    assert_eq!(op_ids(&result), vec!["__multiply_by"]);
    assert_eq!(result.query.operations[0].params, vec![OpValue::from(2.0)]);
}

#[test]
fn test_scalar_binary_applies_after_existing_chain() {
    let result = build_visual_query("rate(m[5m]) * 60");
    assert_eq!(op_ids(&result), vec!["rate", "__multiply_by"]);
}

#[test]
fn test_scalar_comparison_carries_bool_flag() {
    let result = build_visual_query("metric == bool 2");
    assert_eq!(op_ids(&result), vec!["__equal_to"]);
    assert_eq!(
        result.query.operations[0].params,
        vec![OpValue::from(2.0), OpValue::from(true)]
    );

    let result = build_visual_query("metric > 0.5");
    assert_eq!(op_ids(&result), vec!["__greater_than"]);
    assert_eq!(
        result.query.operations[0].params,
        vec![OpValue::from(0.5), OpValue::from(false)]
    );
}

#[test]
fn test_binary_with_vector_matching() {
    let result = build_visual_query("metric_a + on(host) metric_b");
    assert_eq!(result.query.metric, "metric_a");
    assert_eq!(result.query.binary_queries.len(), 1);
    let binary = &result.query.binary_queries[0];
    assert_eq!(binary.operator, "+");
    assert_eq!(binary.vector_matches_type, Some(VectorMatchType::On));
    assert_eq!(binary.vector_matches.as_deref(), Some("host"));
    assert_eq!(binary.is_bool, None);
    assert_eq!(binary.query.metric, "metric_b");
    assert!(result.errors.is_empty());
}

#[test]
fn test_binary_ignoring_with_multiple_labels() {
    let result = build_visual_query("metric_a / ignoring(env, region) metric_b");
    let binary = &result.query.binary_queries[0];
    assert_eq!(binary.operator, "/");
    assert_eq!(binary.vector_matches_type, Some(VectorMatchType::Ignoring));
    assert_eq!(binary.vector_matches.as_deref(), Some("env, region"));
}

#[test]
fn test_binary_bool_between_vectors() {
    let result = build_visual_query("metric_a == bool metric_b");
    let binary = &result.query.binary_queries[0];
    assert_eq!(binary.operator, "==");
    assert_eq!(binary.is_bool, Some(true));
    assert_eq!(binary.query.metric, "metric_b");
}

#[test]
fn test_binary_between_two_query_pipelines() {
    let result = build_visual_query("sum(rate(m[5m])) / sum(rate(n[5m]))");
    assert_eq!(result.query.metric, "m");
    assert_eq!(op_ids(&result), vec!["rate", "sum"]);
    let binary = &result.query.binary_queries[0];
    assert_eq!(binary.operator, "/");
    assert_eq!(binary.query.metric, "n");
    assert_eq!(
        binary
            .query
            .operations
            .iter()
            .map(|op| op.id.as_str())
            .collect::<Vec<_>>(),
        vec!["rate", "sum"]
    );
}

#[test]
fn test_left_number_literal_is_dropped() {
    // Known incomplete behavior, preserved: a literal left operand is not
    // folded into the result.
    let result = build_visual_query("2 + metric");
    assert_eq!(result.query.metric, "");
    assert!(result.query.operations.is_empty());
    assert_eq!(result.query.binary_queries.len(), 1);
    assert_eq!(result.query.binary_queries[0].operator, "+");
    assert_eq!(result.query.binary_queries[0].query.metric, "metric");
    assert!(result.errors.is_empty());
}

#[test]
fn test_scalar_factor_on_left_edge_of_right_subtree() {
    let result = build_visual_query("metric + 2 * 3");
    assert_eq!(result.query.metric, "metric");
    assert_eq!(op_ids(&result), vec!["__addition", "__multiply_by"]);
    assert_eq!(result.query.operations[0].params, vec![OpValue::from(2.0)]);
    assert_eq!(result.query.operations[1].params, vec![OpValue::from(3.0)]);
}

#[test]
fn test_repeated_metric_last_write_wins() {
    // Traversal-order artifact, preserved: the right-hand chain's left
    // operand overwrites the metric observed first.
    let result = build_visual_query("metric_a + metric_b * metric_c");
    assert_eq!(result.query.metric, "metric_b");
    assert_eq!(result.query.binary_queries.len(), 1);
    assert_eq!(result.query.binary_queries[0].operator, "*");
    assert_eq!(result.query.binary_queries[0].query.metric, "metric_c");
}

#[test]
fn test_empty_input() {
    let result = build_visual_query("");
    assert!(result.query.is_empty());
    assert!(result.errors.is_empty());
}

#[test]
fn test_whitespace_only_input() {
    let result = build_visual_query("   \n  ");
    assert!(result.query.is_empty());
    assert!(result.errors.is_empty());
}

#[test]
fn test_empty_result_discards_errors() {
    let result = build_visual_query("()");
    assert!(result.query.is_empty());
    assert!(result.errors.is_empty());
}

#[test]
fn test_paren_group_reports_error_but_continues() {
    let result = build_visual_query("(metric_a)");
    assert_eq!(result.query.metric, "metric_a");
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].from, Some(0));
    assert_eq!(result.errors[0].to, Some(10));
}

#[test]
fn test_info_function_is_ambiguous_but_processed() {
    let result = build_visual_query("info(metric)");
    assert_eq!(result.query.metric, "metric");
    assert_eq!(op_ids(&result), vec!["info"]);
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].text, "Query parsing is ambiguous.");
}

#[test]
fn test_binary_inside_function_args_is_ambiguous() {
    let result = build_visual_query("topk(5, metric_a / metric_b)");
    assert_eq!(result.query.metric, "metric_a");
    assert_eq!(op_ids(&result), vec!["topk"]);
    assert_eq!(result.query.operations[0].params, vec![OpValue::from(5.0)]);
    assert_eq!(result.query.binary_queries.len(), 1);
    assert_eq!(result.query.binary_queries[0].query.metric, "metric_b");
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].text, "Query parsing is ambiguous.");
}

#[test]
fn test_string_argument_is_unquoted() {
    let result = build_visual_query(r#"label_join(m, "dst", ",", "a", "b")"#);
    assert_eq!(result.query.metric, "m");
    assert_eq!(
        result.query.operations[0].params,
        vec![
            OpValue::from("dst"),
            OpValue::from(","),
            OpValue::from("a"),
            OpValue::from("b")
        ]
    );
}

#[test]
fn test_vector_selector_argument_is_not_a_param() {
    let result = build_visual_query("topk(5, http_requests_total)");
    assert_eq!(result.query.metric, "http_requests_total");
    assert_eq!(op_ids(&result), vec!["topk"]);
    assert_eq!(result.query.operations[0].params, vec![OpValue::from(5.0)]);
}

#[test]
fn test_range_function_interval_param() {
    let result = build_visual_query("rate(m[5m])");
    assert_eq!(result.query.metric, "m");
    assert_eq!(op_ids(&result), vec!["rate"]);
    assert_eq!(result.query.operations[0].params, vec![OpValue::from("5m")]);
    assert!(result.errors.is_empty());
}

#[test]
fn test_over_time_suffix_interval_param() {
    let result = build_visual_query("avg_over_time(m[1h])");
    assert_eq!(op_ids(&result), vec!["avg_over_time"]);
    assert_eq!(result.query.operations[0].params, vec![OpValue::from("1h")]);
}

#[test]
fn test_range_without_metric_yet() {
    let result = build_visual_query("rate([5m])");
    assert_eq!(result.query.metric, "");
    assert_eq!(op_ids(&result), vec!["rate"]);
    assert_eq!(result.query.operations[0].params, vec![OpValue::from("5m")]);
    assert!(result.errors.is_empty());
}

#[test]
fn test_builtin_interval_variable_round_trips() {
    let result = build_visual_query("rate(m[$__rate_interval])");
    assert_eq!(result.query.metric, "m");
    assert_eq!(op_ids(&result), vec!["rate"]);
    assert_eq!(
        result.query.operations[0].params,
        vec![OpValue::from("$__rate_interval")]
    );
    // The failed range parse is a known false positive, not an error.
    assert!(result.errors.is_empty());
}

#[test]
fn test_template_variable_interval_round_trips() {
    let result = build_visual_query("rate(m[$interval])");
    assert_eq!(
        result.query.operations[0].params,
        vec![OpValue::from("$interval")]
    );
    assert!(result.errors.is_empty());
}

#[test]
fn test_template_variable_as_metric() {
    let result = build_visual_query(r#"$metric_var{job="api"}"#);
    assert_eq!(result.query.metric, "$metric_var");
    assert_eq!(result.query.labels, vec![label("job", "=", "api")]);
}

#[test]
fn test_template_variable_as_function_argument() {
    let result = build_visual_query("topk($count, m)");
    assert_eq!(result.query.metric, "m");
    assert_eq!(
        result.query.operations[0].params,
        vec![OpValue::from("$count")]
    );
    assert!(result.errors.is_empty());
}

#[test]
fn test_template_variable_in_label_value() {
    let result = build_visual_query(r#"m{job="$job"}"#);
    assert_eq!(result.query.labels, vec![label("job", "=", "$job")]);
}

#[test]
fn test_malformed_matcher_still_yields_filter() {
    let result = build_visual_query("metric{foo=}");
    assert_eq!(result.query.metric, "metric");
    assert_eq!(result.query.labels, vec![label("foo", "=", "")]);
    assert_eq!(result.errors.len(), 1);
    assert_eq!(
        result.errors[0].parent_type.as_deref(),
        Some("UnquotedLabelMatcher")
    );
}

#[test]
fn test_set_operator_with_scalar_is_one_generic_error() {
    let result = build_visual_query("metric and 2");
    assert_eq!(result.query.metric, "metric");
    assert_eq!(result.errors.len(), 1);
    assert_eq!(
        result.errors[0].text,
        "no scalar operation for operator and"
    );
    assert_eq!(result.errors[0].from, None);
}

#[test]
fn test_serialized_model_shape() {
    let result = build_visual_query("metric_a + on(host) metric_b");
    let json = serde_json::to_string_pretty(&result.query).unwrap();
    insta::assert_snapshot!(json, @r#"
    {
      "metric": "metric_a",
      "labels": [],
      "operations": [],
      "binaryQueries": [
        {
          "operator": "+",
          "vectorMatchesType": "on",
          "vectorMatches": "host",
          "query": {
            "metric": "metric_b",
            "labels": [],
            "operations": []
          }
        }
      ]
    }
    "#);
}
