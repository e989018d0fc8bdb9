//! Grammar engine for the query language.
//!
//! This module turns query text into a typed, range-annotated concrete
//! syntax tree. It knows nothing about the visual query model; the lowering
//! pass consumes the tree through [`SyntaxNode`]'s navigation methods.
//!
//! Parsing is total: there is no error result. Input the grammar cannot
//! account for shows up as [`SyntaxKind::Error`] nodes embedded in the tree
//! at the points of failure, with the recoverable structure around them
//! intact. Callers that care about syntax errors look for those nodes.
//!
//! # Example
//!
//! ```ignore
//! use promviz::syntax::{self, SyntaxKind};
//!
//! let tree = syntax::parse(r#"rate(http_requests_total{job="api"}[5m])"#);
//! assert_eq!(tree.kind(), SyntaxKind::Root);
//! ```

pub mod lexer;
pub mod parser;
pub mod tree;

pub use tree::{Span, SyntaxKind, SyntaxNode};

/// Parse query text into a syntax tree.
pub fn parse(source: &str) -> SyntaxNode {
    match lexer::lex(source) {
        Ok(tokens) => parser::parse_tokens(source, tokens),
        // The lexer has a catch-all token, so this arm is not expected to
        // run; degrade to a single error marker if it ever does.
        Err(_) => SyntaxNode::new(
            SyntaxKind::Root,
            0..source.len(),
            vec![SyntaxNode::leaf(SyntaxKind::Error, 0..source.len())],
        ),
    }
}
