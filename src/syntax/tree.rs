//! Syntax tree types.
//!
//! The parser produces an immutable tree of [`SyntaxNode`]s. Every node
//! carries a kind tag and a `[from, to)` byte range into the text it was
//! parsed from; the text itself is not stored, so node contents are always
//! read back through [`SyntaxNode::text`] against the source.

/// A byte range into the parsed text.
pub type Span = std::ops::Range<usize>;

/// Node kinds of the query grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyntaxKind {
    Root,
    /// Error marker covering input the parser could not make sense of.
    Error,
    Identifier,
    VectorSelector,
    MatrixSelector,
    LabelMatchers,
    UnquotedLabelMatcher,
    QuotedLabelMatcher,
    LabelName,
    QuotedLabelName,
    MatchOp,
    StringLiteral,
    /// Numbers and duration literals share one kind; both read as scalars.
    NumberDurationLiteral,
    FunctionCall,
    FunctionIdentifier,
    FunctionCallBody,
    AggregateExpr,
    AggregateOp,
    AggregateModifier,
    By,
    Without,
    GroupingLabels,
    BinaryExpr,
    BinOp,
    BoolModifier,
    MatchingModifierClause,
    On,
    Ignoring,
    GroupLeft,
    GroupRight,
    ParenExpr,
}

impl SyntaxKind {
    /// Diagnostic name of the node kind.
    pub fn name(self) -> &'static str {
        match self {
            SyntaxKind::Root => "Root",
            SyntaxKind::Error => "Error",
            SyntaxKind::Identifier => "Identifier",
            SyntaxKind::VectorSelector => "VectorSelector",
            SyntaxKind::MatrixSelector => "MatrixSelector",
            SyntaxKind::LabelMatchers => "LabelMatchers",
            SyntaxKind::UnquotedLabelMatcher => "UnquotedLabelMatcher",
            SyntaxKind::QuotedLabelMatcher => "QuotedLabelMatcher",
            SyntaxKind::LabelName => "LabelName",
            SyntaxKind::QuotedLabelName => "QuotedLabelName",
            SyntaxKind::MatchOp => "MatchOp",
            SyntaxKind::StringLiteral => "StringLiteral",
            SyntaxKind::NumberDurationLiteral => "NumberDurationLiteral",
            SyntaxKind::FunctionCall => "FunctionCall",
            SyntaxKind::FunctionIdentifier => "FunctionIdentifier",
            SyntaxKind::FunctionCallBody => "FunctionCallBody",
            SyntaxKind::AggregateExpr => "AggregateExpr",
            SyntaxKind::AggregateOp => "AggregateOp",
            SyntaxKind::AggregateModifier => "AggregateModifier",
            SyntaxKind::By => "By",
            SyntaxKind::Without => "Without",
            SyntaxKind::GroupingLabels => "GroupingLabels",
            SyntaxKind::BinaryExpr => "BinaryExpr",
            SyntaxKind::BinOp => "BinOp",
            SyntaxKind::BoolModifier => "BoolModifier",
            SyntaxKind::MatchingModifierClause => "MatchingModifierClause",
            SyntaxKind::On => "On",
            SyntaxKind::Ignoring => "Ignoring",
            SyntaxKind::GroupLeft => "GroupLeft",
            SyntaxKind::GroupRight => "GroupRight",
            SyntaxKind::ParenExpr => "ParenExpr",
        }
    }
}

/// One node of the syntax tree.
#[derive(Debug, Clone, PartialEq)]
pub struct SyntaxNode {
    kind: SyntaxKind,
    span: Span,
    children: Vec<SyntaxNode>,
}

impl SyntaxNode {
    pub(crate) fn new(kind: SyntaxKind, span: Span, children: Vec<SyntaxNode>) -> Self {
        Self {
            kind,
            span,
            children,
        }
    }

    pub(crate) fn leaf(kind: SyntaxKind, span: Span) -> Self {
        Self::new(kind, span, Vec::new())
    }

    pub fn kind(&self) -> SyntaxKind {
        self.kind
    }

    /// The `[from, to)` byte range this node covers in the parsed text.
    pub fn span(&self) -> Span {
        self.span.clone()
    }

    /// The slice of `source` this node was parsed from.
    pub fn text<'s>(&self, source: &'s str) -> &'s str {
        &source[self.span.clone()]
    }

    /// Direct children in source order.
    pub fn children(&self) -> &[SyntaxNode] {
        &self.children
    }

    /// First direct child of the given kind.
    pub fn child(&self, kind: SyntaxKind) -> Option<&SyntaxNode> {
        self.children.iter().find(|c| c.kind == kind)
    }

    pub fn first_child(&self) -> Option<&SyntaxNode> {
        self.children.first()
    }

    /// Deepest descendant reached by following first children.
    pub fn left_most(&self) -> &SyntaxNode {
        let mut current = self;
        while let Some(first) = current.children.first() {
            current = first;
        }
        current
    }
}
