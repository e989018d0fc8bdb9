//! The recursive node-kind state machine that builds the visual query.
//!
//! Each handler owns one node-kind family, mutates the context it is given,
//! and recurses back into [`handle_expression`] for anything nested. Nodes
//! with no handler of their own are transparent: the walk descends into
//! their children in source order.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::model::{
    BinaryQuery, LabelFilter, OpValue, Operation, ParsingError, VectorMatchType, VisualQuery,
};
use crate::syntax::{SyntaxKind, SyntaxNode};

use super::ops::{self, BinaryScalarOp};
use super::preprocess::{self, Replacements};
use super::{Context, WalkError};

/// Bracketed range annotation on a range-vector call. Extracted textually
/// because the window is not an ordinary grammar argument.
static RANGE_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[(.+)\]").unwrap());

/// Dispatch one node. This is the default state of the machine; the
/// specialized handlers below call back into it for nested expressions.
pub(crate) fn handle_expression(
    expr: &str,
    node: &SyntaxNode,
    context: &mut Context<'_>,
) -> Result<(), WalkError> {
    match node.kind() {
        SyntaxKind::Identifier => {
            // Expectation is that there is only one of these per query;
            // when there are more, the last one observed wins.
            context.query.metric = get_string(expr, node, context.replacements);
        }
        SyntaxKind::QuotedLabelName => {
            // No bare identifier, so the metric sits in the braces as a
            // quoted string (UTF-8 metric names must be written that way).
            if context.query.metric.is_empty() {
                let literal = get_opt_string(
                    expr,
                    node.child(SyntaxKind::StringLiteral),
                    context.replacements,
                );
                context.query.metric = strip_edges(&literal);
            }
        }
        SyntaxKind::UnquotedLabelMatcher => {
            let filter = get_label(expr, node, SyntaxKind::LabelName, context.replacements);
            context.query.labels.push(filter);
            if let Some(error) = node.child(SyntaxKind::Error) {
                context
                    .errors
                    .push(make_error(expr, error, Some(node.kind()), context.replacements));
            }
        }
        SyntaxKind::QuotedLabelMatcher => {
            let mut filter = get_label(expr, node, SyntaxKind::QuotedLabelName, context.replacements);
            filter.label = strip_edges(&filter.label);
            context.query.labels.push(filter);
            if let Some(error) = node.child(SyntaxKind::Error) {
                context
                    .errors
                    .push(make_error(expr, error, Some(node.kind()), context.replacements));
            }
        }
        SyntaxKind::FunctionCall => handle_function(expr, node, context)?,
        SyntaxKind::AggregateExpr => handle_aggregation(expr, node, context)?,
        SyntaxKind::BinaryExpr => handle_binary(expr, node, context)?,
        SyntaxKind::Error => {
            context
                .errors
                .push(make_error(expr, node, None, context.replacements));
        }
        _ => {
            if node.kind() == SyntaxKind::ParenExpr {
                // Grouping parentheses cannot be represented in the model;
                // report and keep descending.
                context
                    .errors
                    .push(make_error(expr, node, None, context.replacements));
            }
            let children = node.children();
            for (index, child) in children.iter().enumerate() {
                if child.kind() == SyntaxKind::Error {
                    if follows_vector_selector(children, index) {
                        // Known false positive left behind by variable
                        // substitution inside a bracketed range.
                        continue;
                    }
                    context
                        .errors
                        .push(make_error(expr, child, Some(node.kind()), context.replacements));
                    continue;
                }
                handle_expression(expr, child, context)?;
            }
        }
    }
    Ok(())
}

/// Handle a function call: the operation goes to the front of the chain,
/// an optional bracketed range becomes its first parameter, and the call
/// body is processed as arguments.
fn handle_function(
    expr: &str,
    node: &SyntaxNode,
    context: &mut Context<'_>,
) -> Result<(), WalkError> {
    let name_node = node
        .child(SyntaxKind::FunctionIdentifier)
        .ok_or(WalkError::MissingChild {
            parent: "FunctionCall",
            expected: "FunctionIdentifier",
        })?;
    let func_name = get_string(expr, name_node, context.replacements);

    // The visual model cannot distinguish the operand roles of `info`.
    if func_name == "info" {
        context.errors.push(ambiguity_error(node));
    }

    let mut operation = Operation {
        id: func_name.clone(),
        params: Vec::new(),
    };
    let mut interval = String::new();

    // The range window is not a grammar argument, so it is lifted straight
    // out of the call text; builtin variables substituted before the parse
    // return to their original spelling here.
    if ops::RANGE_FUNCTIONS.contains(&func_name.as_str()) || func_name.ends_with("_over_time") {
        let call_text = get_string(expr, node, context.replacements);
        if let Some(captures) = RANGE_PATTERN.captures(&call_text) {
            interval = captures[1].to_string();
            operation
                .params
                .push(OpValue::String(preprocess::restore_builtin_variables(&interval)));
        }
    }

    let Some(body) = node.child(SyntaxKind::FunctionCallBody) else {
        context.query.operations.insert(0, operation);
        return Ok(());
    };

    if get_string(expr, body, context.replacements) == format!("([{interval}])") {
        // A bare range with no metric chosen yet; there are no real
        // arguments to process.
        context.query.operations.insert(0, operation);
        return Ok(());
    }

    collect_scalar_args(expr, body, context, &mut operation.params);
    context.query.operations.insert(0, operation);
    walk_nested_args(expr, body, context)
}

/// Handle an aggregation. Like a function call, but a grouping modifier
/// rewrites the operation id and its labels land after the positional
/// parameters.
fn handle_aggregation(
    expr: &str,
    node: &SyntaxNode,
    context: &mut Context<'_>,
) -> Result<(), WalkError> {
    let name_node = node
        .child(SyntaxKind::AggregateOp)
        .ok_or(WalkError::MissingChild {
            parent: "AggregateExpr",
            expected: "AggregateOp",
        })?;
    let mut func_name = get_string(expr, name_node, context.replacements);

    let mut labels = Vec::new();
    if let Some(modifier) = node.child(SyntaxKind::AggregateModifier) {
        if modifier.child(SyntaxKind::By).is_some() {
            func_name = format!("__{func_name}_by");
        }
        if modifier.child(SyntaxKind::Without).is_some() {
            func_name = format!("__{func_name}_without");
        }
        collect_by_kind(expr, modifier, SyntaxKind::LabelName, context.replacements, &mut labels);
        collect_by_kind(
            expr,
            modifier,
            SyntaxKind::QuotedLabelName,
            context.replacements,
            &mut labels,
        );
    }

    let mut operation = Operation {
        id: func_name,
        params: Vec::new(),
    };

    let Some(body) = node.child(SyntaxKind::FunctionCallBody) else {
        operation.params.extend(labels.into_iter().map(OpValue::String));
        context.query.operations.insert(0, operation);
        return Ok(());
    };

    collect_scalar_args(expr, body, context, &mut operation.params);
    // Grouping labels sit after the positional arguments.
    operation.params.extend(labels.into_iter().map(OpValue::String));
    context.query.operations.insert(0, operation);
    walk_nested_args(expr, body, context)
}

/// How a call-body child participates in argument handling.
enum ArgKind {
    Number,
    String,
    /// A vector selector whose text is a recorded placeholder: a disguised
    /// template-variable reference.
    Replaced,
    /// Anything else is a nested expression for the main dispatcher.
    Nested,
}

fn classify_arg(expr: &str, node: &SyntaxNode, replacements: &Replacements) -> ArgKind {
    match node.kind() {
        SyntaxKind::NumberDurationLiteral => ArgKind::Number,
        SyntaxKind::StringLiteral => ArgKind::String,
        SyntaxKind::VectorSelector if replacements.contains_key(node.text(expr)) => {
            ArgKind::Replaced
        }
        _ => ArgKind::Nested,
    }
}

/// First pass over a call body: scalar parameters and ambiguity reports.
fn collect_scalar_args(
    expr: &str,
    body: &SyntaxNode,
    context: &mut Context<'_>,
    params: &mut Vec<OpValue>,
) {
    for child in body.children() {
        if let Some(binary) = embedded_binary(child) {
            // A binary operation inside function arguments has no place in
            // the operation pipeline.
            context.errors.push(ambiguity_error(binary));
        }
        match classify_arg(expr, child, context.replacements) {
            ArgKind::Number => {
                let text = get_string(expr, child, context.replacements);
                params.push(OpValue::Number(parse_float_prefix(&text)));
            }
            ArgKind::String => {
                let text = get_string(expr, child, context.replacements);
                params.push(OpValue::String(unquote(&text)));
            }
            ArgKind::Replaced => {
                if let Some(original) = context.replacements.get(child.text(expr)) {
                    params.push(OpValue::String(original.clone()));
                }
            }
            ArgKind::Nested => {}
        }
    }
}

/// Second pass over a call body: everything that was not a scalar
/// parameter is a nested expression and goes back through the dispatcher.
fn walk_nested_args(
    expr: &str,
    body: &SyntaxNode,
    context: &mut Context<'_>,
) -> Result<(), WalkError> {
    for child in body.children() {
        if matches!(
            classify_arg(expr, child, context.replacements),
            ArgKind::Nested
        ) {
            handle_expression(expr, child, context)?;
        }
    }
    Ok(())
}

/// Handle a binary expression. A literal right operand appends a scalar
/// operation; a genuine sub-query on the right becomes a nested
/// [`BinaryQuery`] built in a fresh context that shares this one's error
/// list and substitution table.
fn handle_binary(
    expr: &str,
    node: &SyntaxNode,
    context: &mut Context<'_>,
) -> Result<(), WalkError> {
    let children = node.children();
    let left = children.first().ok_or(WalkError::MissingChild {
        parent: "BinaryExpr",
        expected: "left operand",
    })?;
    let op_node = children.get(1).ok_or(WalkError::MissingChild {
        parent: "BinaryExpr",
        expected: "operator",
    })?;
    let operator = get_string(expr, op_node, context.replacements);
    let right = children.last().ok_or(WalkError::MissingChild {
        parent: "BinaryExpr",
        expected: "right operand",
    })?;

    let modifier = get_binary_modifier(
        expr,
        node.child(SyntaxKind::BoolModifier)
            .or_else(|| node.child(SyntaxKind::MatchingModifierClause)),
        context.replacements,
    );
    let has_bool = matches!(&modifier, Some(BinaryModifier::Bool));

    let op_def = ops::binary_scalar_op(&operator);

    if left.kind() == SyntaxKind::NumberDurationLiteral {
        // A literal left operand is currently dropped rather than folded
        // into the result.
    } else {
        handle_expression(expr, left, context)?;
    }

    if right.kind() == SyntaxKind::NumberDurationLiteral {
        let def = op_def.ok_or_else(|| WalkError::UnknownScalarOp(operator.clone()))?;
        let operation = make_bin_op(def, expr, right, has_bool, context.replacements);
        context.query.operations.push(operation);
    } else if right.kind() == SyntaxKind::BinaryExpr {
        // Precedence can hang the scalar factor for this operator level off
        // the left edge of the right subtree.
        let left_most = right.left_most();
        if left_most.kind() == SyntaxKind::NumberDurationLiteral {
            let def = op_def.ok_or_else(|| WalkError::UnknownScalarOp(operator.clone()))?;
            let operation = make_bin_op(def, expr, left_most, has_bool, context.replacements);
            context.query.operations.push(operation);
        }
        // The consumed literal is inert on the revisit, so the whole right
        // subtree still goes through the dispatcher.
        handle_expression(expr, right, context)?;
    } else {
        let mut binary = BinaryQuery {
            operator,
            is_bool: None,
            vector_matches_type: None,
            vector_matches: None,
            query: VisualQuery::default(),
        };
        match modifier {
            Some(BinaryModifier::Bool) => binary.is_bool = Some(true),
            Some(BinaryModifier::Matcher {
                match_type,
                matches,
            }) => {
                binary.vector_matches_type = Some(match_type);
                binary.vector_matches = Some(matches);
            }
            None => {}
        }
        let mut child_context = Context {
            query: VisualQuery::default(),
            errors: &mut *context.errors,
            replacements: context.replacements,
        };
        let walked = handle_expression(expr, right, &mut child_context);
        binary.query = child_context.query;
        // Pushed before the failure check so a partial nested query still
        // survives at the boundary.
        context.query.binary_queries.push(binary);
        walked?;
    }
    Ok(())
}

enum BinaryModifier {
    Bool,
    Matcher {
        match_type: VectorMatchType,
        matches: String,
    },
}

fn get_binary_modifier(
    expr: &str,
    node: Option<&SyntaxNode>,
    replacements: &Replacements,
) -> Option<BinaryModifier> {
    let node = node?;
    if node.kind() == SyntaxKind::BoolModifier {
        return Some(BinaryModifier::Bool);
    }
    let mut labels = Vec::new();
    if let Some(grouping) = node.child(SyntaxKind::GroupingLabels) {
        collect_by_kind(expr, grouping, SyntaxKind::LabelName, replacements, &mut labels);
    }
    let match_type = if node.child(SyntaxKind::On).is_some() {
        VectorMatchType::On
    } else {
        VectorMatchType::Ignoring
    };
    Some(BinaryModifier::Matcher {
        match_type,
        matches: labels.join(", "),
    })
}

fn make_bin_op(
    def: &BinaryScalarOp,
    expr: &str,
    node: &SyntaxNode,
    has_bool: bool,
    replacements: &Replacements,
) -> Operation {
    let value = parse_float_prefix(&get_string(expr, node, replacements));
    let mut params = vec![OpValue::Number(value)];
    if def.comparison {
        params.push(OpValue::Bool(has_bool));
    }
    Operation {
        id: def.id.to_string(),
        params,
    }
}

/// An error marker is suppressed when it immediately follows a bare vector
/// selector sibling (or one wrapping a vector selector as its first
/// child) - the shape variable substitution leaves inside bracketed ranges.
fn follows_vector_selector(children: &[SyntaxNode], index: usize) -> bool {
    let Some(previous) = index.checked_sub(1).and_then(|i| children.get(i)) else {
        return false;
    };
    previous.kind() == SyntaxKind::VectorSelector
        || previous.first_child().map(|c| c.kind()) == Some(SyntaxKind::VectorSelector)
}

fn embedded_binary(node: &SyntaxNode) -> Option<&SyntaxNode> {
    if node.kind() == SyntaxKind::BinaryExpr {
        return Some(node);
    }
    node.child(SyntaxKind::BinaryExpr)
}

fn ambiguity_error(node: &SyntaxNode) -> ParsingError {
    let span = node.span();
    ParsingError {
        text: "Query parsing is ambiguous.".to_string(),
        from: Some(span.start),
        to: Some(span.end),
        parent_type: None,
    }
}

fn make_error(
    expr: &str,
    node: &SyntaxNode,
    parent: Option<SyntaxKind>,
    replacements: &Replacements,
) -> ParsingError {
    let span = node.span();
    ParsingError {
        text: get_string(expr, node, replacements),
        from: Some(span.start),
        to: Some(span.end),
        parent_type: parent.map(|kind| kind.name().to_string()),
    }
}

fn get_label(
    expr: &str,
    node: &SyntaxNode,
    name_kind: SyntaxKind,
    replacements: &Replacements,
) -> LabelFilter {
    let label = get_opt_string(expr, node.child(name_kind), replacements);
    let op = get_opt_string(expr, node.child(SyntaxKind::MatchOp), replacements);
    let value = unquote(&get_opt_string(
        expr,
        node.child(SyntaxKind::StringLiteral),
        replacements,
    ));
    LabelFilter { label, op, value }
}

/// Collect the text of every descendant of the given kind, in source
/// order, without descending into matches.
fn collect_by_kind(
    expr: &str,
    node: &SyntaxNode,
    kind: SyntaxKind,
    replacements: &Replacements,
    out: &mut Vec<String>,
) {
    for child in node.children() {
        if child.kind() == kind {
            out.push(get_string(expr, child, replacements));
        } else {
            collect_by_kind(expr, child, kind, replacements, out);
        }
    }
}

/// A node's text with template placeholders restored. Every string pulled
/// out of the tree goes through here so variables keep their original
/// spelling in the model and in diagnostics.
fn get_string(expr: &str, node: &SyntaxNode, replacements: &Replacements) -> String {
    preprocess::restore_variables(node.text(expr), replacements)
}

fn get_opt_string(expr: &str, node: Option<&SyntaxNode>, replacements: &Replacements) -> String {
    node.map(|n| get_string(expr, n, replacements))
        .unwrap_or_default()
}

/// Drop one leading and one trailing character (a quote pair).
fn strip_edges(s: &str) -> String {
    let mut chars = s.chars();
    chars.next();
    chars.next_back();
    chars.as_str().to_string()
}

/// Strip one leading and one trailing quote character of any style.
fn unquote(s: &str) -> String {
    let mut out = s;
    if let Some(rest) = out.strip_prefix(['"', '\'', '`']) {
        out = rest;
    }
    if let Some(rest) = out.strip_suffix(['"', '\'', '`']) {
        out = rest;
    }
    out.to_string()
}

/// Longest-leading-prefix float parse: `5m` reads as 5, garbage reads as
/// NaN. Matches how the editor side coerces scalar parameters.
fn parse_float_prefix(text: &str) -> f64 {
    let trimmed = text.trim();
    let mut value = f64::NAN;
    for end in 1..=trimmed.len() {
        if !trimmed.is_char_boundary(end) {
            continue;
        }
        if let Ok(parsed) = trimmed[..end].parse::<f64>() {
            value = parsed;
        }
    }
    value
}
