//! Lowering query text to the visual query model.
//!
//! The entry point rewrites variables into parseable placeholders, parses
//! the result with the grammar engine, and walks the tree with a node-kind
//! state machine that builds the model incrementally in a [`Context`]
//! threaded through the recursion. The walk never gives up on partially
//! broken input: handlers record recoverable problems on the shared error
//! list and keep going, and the one traversal failure that cannot be
//! recovered from is converted into a single generic diagnostic at this
//! boundary, keeping whatever partial model had been built.

pub mod ops;
pub mod preprocess;
mod walk;

use thiserror::Error;

use crate::model::{ParsingError, VisualQuery};
use crate::syntax;
use preprocess::Replacements;

/// Result of lowering one query string.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BuildResult {
    pub query: VisualQuery,
    pub errors: Vec<ParsingError>,
}

/// Failure inside the tree walk.
///
/// Handlers record recoverable problems as [`ParsingError`]s and continue;
/// this type is reserved for tree shapes the walk cannot continue past. It
/// never escapes [`build_visual_query`], which converts it into one generic
/// diagnostic.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub(crate) enum WalkError {
    #[error("expected {expected} in {parent} node")]
    MissingChild {
        parent: &'static str,
        expected: &'static str,
    },
    #[error("no scalar operation for operator {0}")]
    UnknownScalarOp(String),
}

/// The mutable state threaded through the walk: the query being built
/// (owned by exactly one context) plus the error list and the variable
/// substitution table, which are shared with every other context of the
/// same call. Binary expressions with a genuine sub-query on the right
/// spawn a child context targeting the nested query.
pub(crate) struct Context<'a> {
    pub(crate) query: VisualQuery,
    pub(crate) errors: &'a mut Vec<ParsingError>,
    pub(crate) replacements: &'a Replacements,
}

/// Lower a query string into a visual query model plus diagnostics.
///
/// Never fails: whatever could be understood of the input is returned and
/// problems are reported through the error list. A wholly-empty result
/// discards its errors, so garbage-only input comes back clean. The
/// substitution table is internal bookkeeping and does not survive the
/// call.
pub fn build_visual_query(expr: &str) -> BuildResult {
    let replaced = preprocess::replace_builtin_variables(expr);
    let (replaced, replacements) = preprocess::replace_variables(&replaced);
    let tree = syntax::parse(&replaced);

    let mut errors = Vec::new();
    let mut context = Context {
        query: VisualQuery::default(),
        errors: &mut errors,
        replacements: &replacements,
    };
    if let Err(error) = walk::handle_expression(&replaced, &tree, &mut context) {
        context.errors.push(ParsingError {
            text: error.to_string(),
            ..ParsingError::default()
        });
    }

    let query = context.query;
    if query.is_empty() {
        errors.clear();
    }
    BuildResult { query, errors }
}
