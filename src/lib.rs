//! # promviz
//!
//! Lowers PromQL-style queries into an editable visual query model.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                     Query text                           │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [preprocess]
//! ┌─────────────────────────────────────────────────────────┐
//! │     Rewritten text + variable substitution table         │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [syntax]
//! ┌─────────────────────────────────────────────────────────┐
//! │      Syntax tree (error markers embedded, never fails)   │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [lowering]
//! ┌─────────────────────────────────────────────────────────┐
//! │        VisualQuery + ParsingError diagnostics            │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! The visual query model is the editable representation a graphical query
//! builder works on: a metric, label filters, an ordered operation
//! pipeline, and nested binary queries. Lowering is best-effort by design -
//! it runs on every keystroke in an editor, so it recovers as much model as
//! it can from partially-written queries and reports the rest as
//! diagnostics instead of failing.
//!
//! ```ignore
//! use promviz::build_visual_query;
//!
//! let result = build_visual_query(r#"sum by (job) (rate(http_requests_total[5m]))"#);
//! assert_eq!(result.query.metric, "http_requests_total");
//! assert_eq!(result.query.operations[0].id, "rate");
//! assert_eq!(result.query.operations[1].id, "__sum_by");
//! ```

pub mod lowering;
pub mod model;
pub mod syntax;

pub use lowering::{build_visual_query, BuildResult};
pub use model::{
    BinaryQuery, LabelFilter, OpValue, Operation, ParsingError, VectorMatchType, VisualQuery,
};
