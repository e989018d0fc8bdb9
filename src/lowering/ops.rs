//! Binary scalar operator lookup.
//!
//! Maps operator symbols to the canonical operation ids the query editor
//! models scalar arithmetic steps with. The table lives outside the walk so
//! the editor side can share it.

/// Descriptor for a binary operator applied to a scalar operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BinaryScalarOp {
    pub id: &'static str,
    pub sign: &'static str,
    /// Comparison operators carry their `bool` modifier as a parameter.
    pub comparison: bool,
}

pub const BINARY_SCALAR_OPS: &[BinaryScalarOp] = &[
    BinaryScalarOp {
        id: "__addition",
        sign: "+",
        comparison: false,
    },
    BinaryScalarOp {
        id: "__subtraction",
        sign: "-",
        comparison: false,
    },
    BinaryScalarOp {
        id: "__multiply_by",
        sign: "*",
        comparison: false,
    },
    BinaryScalarOp {
        id: "__divide_by",
        sign: "/",
        comparison: false,
    },
    BinaryScalarOp {
        id: "__modulo",
        sign: "%",
        comparison: false,
    },
    BinaryScalarOp {
        id: "__exponent",
        sign: "^",
        comparison: false,
    },
    BinaryScalarOp {
        id: "__equal_to",
        sign: "==",
        comparison: true,
    },
    BinaryScalarOp {
        id: "__not_equal_to",
        sign: "!=",
        comparison: true,
    },
    BinaryScalarOp {
        id: "__greater_than",
        sign: ">",
        comparison: true,
    },
    BinaryScalarOp {
        id: "__less_than",
        sign: "<",
        comparison: true,
    },
    BinaryScalarOp {
        id: "__greater_or_equal",
        sign: ">=",
        comparison: true,
    },
    BinaryScalarOp {
        id: "__less_or_equal",
        sign: "<=",
        comparison: true,
    },
];

/// Look up the scalar operation for an operator symbol. Set operators
/// (`and`, `or`, `unless`) have no scalar form and return None.
pub fn binary_scalar_op(sign: &str) -> Option<&'static BinaryScalarOp> {
    BINARY_SCALAR_OPS.iter().find(|op| op.sign == sign)
}

/// Functions whose time window is written as a bracketed range on the
/// selector rather than as an ordinary argument. Functions ending in
/// `_over_time` are treated the same way.
pub const RANGE_FUNCTIONS: &[&str] = &["changes", "rate", "irate", "increase", "delta"];
