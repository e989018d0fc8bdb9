//! Parser for the query language.
//!
//! A recursive-descent parser with precedence climbing over the token
//! stream, producing the concrete syntax tree the lowering pass walks. The
//! parser never fails: wherever the input stops making sense it emits an
//! [`SyntaxKind::Error`] node covering the offending tokens and carries on,
//! so partially-broken queries still yield all of their recoverable
//! structure. Bad bracket contents in particular become an error marker
//! sitting next to the vector selector, which is the shape variable
//! placeholders leave behind.

use chumsky::span::SimpleSpan;

use super::lexer::Token;
use super::tree::{Span, SyntaxKind, SyntaxNode};

/// Aggregation operator names. These are ordinary identifiers to the lexer
/// and only become aggregations when followed by a call body or a grouping
/// modifier.
const AGGREGATIONS: &[&str] = &[
    "sum",
    "avg",
    "min",
    "max",
    "count",
    "count_values",
    "group",
    "stddev",
    "stdvar",
    "topk",
    "bottomk",
    "quantile",
    "limitk",
    "limit_ratio",
];

/// Parse a token stream into a syntax tree rooted at [`SyntaxKind::Root`].
pub(crate) fn parse_tokens(source: &str, tokens: Vec<(Token<'_>, SimpleSpan)>) -> SyntaxNode {
    let tokens = tokens
        .into_iter()
        .map(|(tok, span)| (tok, span.start..span.end))
        .collect();
    Parser {
        tokens,
        pos: 0,
        end: source.len(),
    }
    .parse_root()
}

struct Parser<'src> {
    tokens: Vec<(Token<'src>, Span)>,
    pos: usize,
    end: usize,
}

/// Binary operator precedence; higher binds tighter. The second component
/// marks right associativity.
fn binary_op_prec(token: &Token<'_>) -> Option<(u8, bool)> {
    match token {
        Token::Caret => Some((6, true)),
        Token::Star | Token::Slash | Token::Percent => Some((5, false)),
        Token::Plus | Token::Minus => Some((4, false)),
        Token::EqEq | Token::Neq | Token::Gt | Token::Lt | Token::Ge | Token::Le => {
            Some((3, false))
        }
        Token::Ident("and") | Token::Ident("unless") => Some((2, false)),
        Token::Ident("or") => Some((1, false)),
        _ => None,
    }
}

fn quoted_label_name(span: Span) -> SyntaxNode {
    let literal = SyntaxNode::leaf(SyntaxKind::StringLiteral, span.clone());
    SyntaxNode::new(SyntaxKind::QuotedLabelName, span, vec![literal])
}

impl<'src> Parser<'src> {
    fn peek(&self) -> Option<&Token<'src>> {
        self.tokens.get(self.pos).map(|(tok, _)| tok)
    }

    fn peek_at(&self, offset: usize) -> Option<&Token<'src>> {
        self.tokens.get(self.pos + offset).map(|(tok, _)| tok)
    }

    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    /// Start offset of the current token, or end of input.
    fn cur_start(&self) -> usize {
        self.tokens
            .get(self.pos)
            .map(|(_, span)| span.start)
            .unwrap_or(self.end)
    }

    fn bump(&mut self) -> (Token<'src>, Span) {
        let (tok, span) = self.tokens[self.pos].clone();
        self.pos += 1;
        (tok, span)
    }

    fn parse_root(mut self) -> SyntaxNode {
        let mut children = Vec::new();
        if !self.at_end() {
            children.push(self.parse_expr(0));
            if !self.at_end() {
                // Everything after a complete expression is one error marker.
                let start = self.cur_start();
                let end = self
                    .tokens
                    .last()
                    .map(|(_, span)| span.end)
                    .unwrap_or(start);
                self.pos = self.tokens.len();
                children.push(SyntaxNode::leaf(SyntaxKind::Error, start..end));
            }
        }
        SyntaxNode::new(SyntaxKind::Root, 0..self.end, children)
    }

    fn parse_expr(&mut self, min_prec: u8) -> SyntaxNode {
        let mut lhs = self.parse_atom();
        loop {
            let Some((prec, right_assoc)) = self.peek().and_then(binary_op_prec) else {
                break;
            };
            if prec < min_prec {
                break;
            }
            let (_, op_span) = self.bump();
            let op_node = SyntaxNode::leaf(SyntaxKind::BinOp, op_span);
            let modifier = self.parse_binary_modifier();
            let next_min = if right_assoc { prec } else { prec + 1 };
            let rhs = self.parse_expr(next_min);
            let span = lhs.span().start..rhs.span().end;
            let mut children = vec![lhs, op_node];
            if let Some(modifier) = modifier {
                children.push(modifier);
            }
            children.push(rhs);
            lhs = SyntaxNode::new(SyntaxKind::BinaryExpr, span, children);
        }
        lhs
    }

    fn parse_atom(&mut self) -> SyntaxNode {
        match self.peek().copied() {
            Some(Token::Number(_)) | Some(Token::Duration(_)) => {
                let (_, span) = self.bump();
                SyntaxNode::leaf(SyntaxKind::NumberDurationLiteral, span)
            }
            Some(Token::Minus) | Some(Token::Plus)
                if matches!(
                    self.peek_at(1),
                    Some(Token::Number(_)) | Some(Token::Duration(_))
                ) =>
            {
                let (_, sign_span) = self.bump();
                let (_, num_span) = self.bump();
                SyntaxNode::leaf(SyntaxKind::NumberDurationLiteral, sign_span.start..num_span.end)
            }
            Some(Token::Str(_)) => {
                let (_, span) = self.bump();
                SyntaxNode::leaf(SyntaxKind::StringLiteral, span)
            }
            Some(Token::LParen) => {
                let (_, lparen) = self.bump();
                let inner = self.parse_expr(0);
                let mut end = inner.span().end;
                if matches!(self.peek(), Some(Token::RParen)) {
                    let (_, rparen) = self.bump();
                    end = rparen.end;
                }
                SyntaxNode::new(SyntaxKind::ParenExpr, lparen.start..end, vec![inner])
            }
            Some(Token::LBrace) => {
                // Metric-less selector; the metric may still appear inside
                // the braces as a quoted name.
                let matchers = self.parse_label_matchers();
                let span = matchers.span();
                let selector =
                    SyntaxNode::new(SyntaxKind::VectorSelector, span, vec![matchers]);
                self.maybe_matrix(selector)
            }
            Some(Token::Ident(name)) => {
                if AGGREGATIONS.contains(&name) && self.aggregation_follows() {
                    self.parse_aggregate_expr()
                } else if matches!(self.peek_at(1), Some(Token::LParen)) {
                    self.parse_function_call()
                } else {
                    self.parse_vector_selector()
                }
            }
            Some(_) => {
                let (_, span) = self.bump();
                SyntaxNode::leaf(SyntaxKind::Error, span)
            }
            None => SyntaxNode::leaf(SyntaxKind::Error, self.end..self.end),
        }
    }

    fn aggregation_follows(&self) -> bool {
        matches!(
            self.peek_at(1),
            Some(Token::LParen) | Some(Token::Ident("by")) | Some(Token::Ident("without"))
        )
    }

    fn parse_vector_selector(&mut self) -> SyntaxNode {
        let (_, ident_span) = self.bump();
        let start = ident_span.start;
        let mut end = ident_span.end;
        let mut children = vec![SyntaxNode::leaf(SyntaxKind::Identifier, ident_span)];
        if matches!(self.peek(), Some(Token::LBrace)) {
            let matchers = self.parse_label_matchers();
            end = matchers.span().end;
            children.push(matchers);
        }
        let selector = SyntaxNode::new(SyntaxKind::VectorSelector, start..end, children);
        self.maybe_matrix(selector)
    }

    /// Wrap a selector in a matrix selector when a bracketed range follows.
    ///
    /// A well-formed range is a single literal immediately closed. Anything
    /// else inside the brackets (variable placeholders, subquery ranges,
    /// garbage) is consumed up to the closing bracket and becomes an error
    /// marker next to the selector.
    fn maybe_matrix(&mut self, selector: SyntaxNode) -> SyntaxNode {
        if !matches!(self.peek(), Some(Token::LBracket)) {
            return selector;
        }
        let (_, lbracket) = self.bump();
        let start = selector.span().start;
        let well_formed = matches!(
            self.peek(),
            Some(Token::Duration(_)) | Some(Token::Number(_))
        ) && matches!(self.peek_at(1), Some(Token::RBracket));
        let (range_node, end) = if well_formed {
            let (_, range_span) = self.bump();
            let (_, rbracket) = self.bump();
            (
                SyntaxNode::leaf(SyntaxKind::NumberDurationLiteral, range_span),
                rbracket.end,
            )
        } else {
            let mut end = lbracket.end;
            loop {
                let Some(token) = self.peek().copied() else { break };
                let (_, span) = self.bump();
                end = span.end;
                if matches!(token, Token::RBracket) {
                    break;
                }
            }
            (SyntaxNode::leaf(SyntaxKind::Error, lbracket.start..end), end)
        };
        SyntaxNode::new(
            SyntaxKind::MatrixSelector,
            start..end,
            vec![selector, range_node],
        )
    }

    fn match_op_at(&self, offset: usize) -> bool {
        matches!(
            self.peek_at(offset),
            Some(Token::Eq) | Some(Token::Neq) | Some(Token::EqRegex) | Some(Token::NeqRegex)
        )
    }

    fn parse_label_matchers(&mut self) -> SyntaxNode {
        let (_, lbrace) = self.bump();
        let start = lbrace.start;
        let mut end = lbrace.end;
        let mut children = Vec::new();
        loop {
            match self.peek().copied() {
                None => break,
                Some(Token::RBrace) => {
                    let (_, span) = self.bump();
                    end = span.end;
                    break;
                }
                Some(Token::Comma) => {
                    let (_, span) = self.bump();
                    end = span.end;
                }
                Some(Token::Ident(_)) => {
                    let matcher = self.parse_matcher(false);
                    end = matcher.span().end;
                    children.push(matcher);
                }
                Some(Token::Str(_)) => {
                    if self.match_op_at(1) {
                        let matcher = self.parse_matcher(true);
                        end = matcher.span().end;
                        children.push(matcher);
                    } else {
                        // A bare quoted name selects the metric itself.
                        let (_, span) = self.bump();
                        end = span.end;
                        children.push(quoted_label_name(span));
                    }
                }
                Some(_) => {
                    let (_, span) = self.bump();
                    end = span.end;
                    children.push(SyntaxNode::leaf(SyntaxKind::Error, span));
                }
            }
        }
        SyntaxNode::new(SyntaxKind::LabelMatchers, start..end, children)
    }

    fn parse_matcher(&mut self, quoted: bool) -> SyntaxNode {
        let (_, name_span) = self.bump();
        let start = name_span.start;
        let mut end = name_span.end;
        let name_node = if quoted {
            quoted_label_name(name_span)
        } else {
            SyntaxNode::leaf(SyntaxKind::LabelName, name_span)
        };
        let mut children = vec![name_node];
        if self.match_op_at(0) {
            let (_, op_span) = self.bump();
            end = op_span.end;
            children.push(SyntaxNode::leaf(SyntaxKind::MatchOp, op_span));
            match self.peek().copied() {
                Some(Token::Str(_)) => {
                    let (_, span) = self.bump();
                    end = span.end;
                    children.push(SyntaxNode::leaf(SyntaxKind::StringLiteral, span));
                }
                Some(Token::RBrace) | Some(Token::Comma) | None => {
                    // Missing value.
                    children.push(SyntaxNode::leaf(SyntaxKind::Error, end..end));
                }
                Some(_) => {
                    let (_, span) = self.bump();
                    end = span.end;
                    children.push(SyntaxNode::leaf(SyntaxKind::Error, span));
                }
            }
        } else {
            // Bare label name with no operator.
            children.push(SyntaxNode::leaf(SyntaxKind::Error, end..end));
        }
        let kind = if quoted {
            SyntaxKind::QuotedLabelMatcher
        } else {
            SyntaxKind::UnquotedLabelMatcher
        };
        SyntaxNode::new(kind, start..end, children)
    }

    fn parse_function_call(&mut self) -> SyntaxNode {
        let (_, name_span) = self.bump();
        let start = name_span.start;
        let name_node = SyntaxNode::leaf(SyntaxKind::FunctionIdentifier, name_span);
        let body = self.parse_call_body();
        let end = body.span().end;
        SyntaxNode::new(SyntaxKind::FunctionCall, start..end, vec![name_node, body])
    }

    /// Parse `( arg, arg, ... )`. The body span includes both parentheses.
    fn parse_call_body(&mut self) -> SyntaxNode {
        let (_, lparen) = self.bump();
        let start = lparen.start;
        let mut end = lparen.end;
        let mut children = Vec::new();
        loop {
            match self.peek().copied() {
                None => break,
                Some(Token::RParen) => {
                    let (_, span) = self.bump();
                    end = span.end;
                    break;
                }
                Some(Token::Comma) => {
                    let (_, span) = self.bump();
                    end = span.end;
                }
                Some(_) => {
                    let arg = self.parse_expr(0);
                    end = end.max(arg.span().end);
                    children.push(arg);
                }
            }
        }
        SyntaxNode::new(SyntaxKind::FunctionCallBody, start..end, children)
    }

    fn parse_aggregate_expr(&mut self) -> SyntaxNode {
        let (_, op_span) = self.bump();
        let start = op_span.start;
        let mut end = op_span.end;
        let mut children = vec![SyntaxNode::leaf(SyntaxKind::AggregateOp, op_span)];
        let mut has_modifier = false;

        if matches!(
            self.peek(),
            Some(Token::Ident("by")) | Some(Token::Ident("without"))
        ) {
            let modifier = self.parse_aggregate_modifier();
            end = modifier.span().end;
            children.push(modifier);
            has_modifier = true;
        }

        if matches!(self.peek(), Some(Token::LParen)) {
            let body = self.parse_call_body();
            end = body.span().end;
            children.push(body);
        } else {
            children.push(SyntaxNode::leaf(SyntaxKind::Error, end..end));
        }

        if !has_modifier
            && matches!(
                self.peek(),
                Some(Token::Ident("by")) | Some(Token::Ident("without"))
            )
        {
            let modifier = self.parse_aggregate_modifier();
            end = modifier.span().end;
            children.push(modifier);
        }

        SyntaxNode::new(SyntaxKind::AggregateExpr, start..end, children)
    }

    fn parse_aggregate_modifier(&mut self) -> SyntaxNode {
        let (token, keyword_span) = self.bump();
        let kind = if matches!(token, Token::Ident("by")) {
            SyntaxKind::By
        } else {
            SyntaxKind::Without
        };
        let start = keyword_span.start;
        let mut end = keyword_span.end;
        let mut children = vec![SyntaxNode::leaf(kind, keyword_span)];
        if matches!(self.peek(), Some(Token::LParen)) {
            let labels = self.parse_grouping_labels();
            end = labels.span().end;
            children.push(labels);
        }
        SyntaxNode::new(SyntaxKind::AggregateModifier, start..end, children)
    }

    /// Parse `( label, label, ... )` where labels may be quoted.
    fn parse_grouping_labels(&mut self) -> SyntaxNode {
        let (_, lparen) = self.bump();
        let start = lparen.start;
        let mut end = lparen.end;
        let mut children = Vec::new();
        loop {
            match self.peek().copied() {
                None => break,
                Some(Token::RParen) => {
                    let (_, span) = self.bump();
                    end = span.end;
                    break;
                }
                Some(Token::Comma) => {
                    let (_, span) = self.bump();
                    end = span.end;
                }
                Some(Token::Ident(_)) => {
                    let (_, span) = self.bump();
                    end = span.end;
                    children.push(SyntaxNode::leaf(SyntaxKind::LabelName, span));
                }
                Some(Token::Str(_)) => {
                    let (_, span) = self.bump();
                    end = span.end;
                    children.push(quoted_label_name(span));
                }
                Some(_) => {
                    let (_, span) = self.bump();
                    end = span.end;
                    children.push(SyntaxNode::leaf(SyntaxKind::Error, span));
                }
            }
        }
        SyntaxNode::new(SyntaxKind::GroupingLabels, start..end, children)
    }

    fn parse_binary_modifier(&mut self) -> Option<SyntaxNode> {
        match self.peek().copied() {
            Some(Token::Ident("bool")) => {
                let (_, span) = self.bump();
                Some(SyntaxNode::leaf(SyntaxKind::BoolModifier, span))
            }
            Some(Token::Ident("on")) | Some(Token::Ident("ignoring")) => {
                let (token, keyword_span) = self.bump();
                let kind = if matches!(token, Token::Ident("on")) {
                    SyntaxKind::On
                } else {
                    SyntaxKind::Ignoring
                };
                let start = keyword_span.start;
                let mut end = keyword_span.end;
                let mut children = vec![SyntaxNode::leaf(kind, keyword_span)];
                if matches!(self.peek(), Some(Token::LParen)) {
                    let labels = self.parse_grouping_labels();
                    end = labels.span().end;
                    children.push(labels);
                }
                if matches!(
                    self.peek(),
                    Some(Token::Ident("group_left")) | Some(Token::Ident("group_right"))
                ) {
                    let (token, span) = self.bump();
                    let kind = if matches!(token, Token::Ident("group_left")) {
                        SyntaxKind::GroupLeft
                    } else {
                        SyntaxKind::GroupRight
                    };
                    end = span.end;
                    children.push(SyntaxNode::leaf(kind, span));
                    if matches!(self.peek(), Some(Token::LParen)) {
                        let labels = self.parse_grouping_labels();
                        end = labels.span().end;
                        children.push(labels);
                    }
                }
                Some(SyntaxNode::new(
                    SyntaxKind::MatchingModifierClause,
                    start..end,
                    children,
                ))
            }
            _ => None,
        }
    }
}
