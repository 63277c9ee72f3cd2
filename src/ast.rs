//! The operation tree produced by the AST builder.
//!
//! Parsed formulas are represented as a single tagged enum, [`Operation`].
//! Both the interpreter and the compiler dispatch over it with exhaustive
//! pattern matching, so there is no visitor protocol. Every node is
//! real-valued; integer literals widen to `f64` during lexing.

use crate::Real;

/// A node in the operation tree of a parsed formula.
#[derive(Clone, Debug, PartialEq)]
pub enum Operation {
    /// A literal numerical value.
    ///
    /// Examples: `3.14`, `42`. Registered constants such as `pi` are
    /// resolved to this variant while the tree is built, which lets the
    /// optimizer fold expressions over them.
    Constant(Real),

    /// A named variable reference, lowercase-normalized.
    Variable(String),

    /// A unary operation applied to a single operand.
    ///
    /// Example: `-x`
    Unary {
        op: UnaryOp,
        operand: Box<Operation>,
    },

    /// A binary arithmetic operation.
    ///
    /// Example: `a + b`, `2 ^ n`
    Binary {
        op: BinaryOp,
        left: Box<Operation>,
        right: Box<Operation>,
    },

    /// A function call with ordered argument expressions.
    ///
    /// Example: `max(a, b)`, `sin(x)`. The idempotency flag is copied from
    /// the registry entry when the tree is built; only idempotent calls are
    /// eligible for constant folding.
    Function {
        name: String,
        args: Vec<Operation>,
        idempotent: bool,
    },
}

/// Unary operators.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnaryOp {
    /// Arithmetic negation, written as a prefix `-`.
    Neg,
}

/// Binary arithmetic operators.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    /// Remainder; the sign follows the dividend, as the host `%` does.
    Mod,
    /// Exponentiation, right-associative in the grammar.
    Pow,
}

impl BinaryOp {
    /// The operator's source spelling, used in error messages.
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Pow => "^",
        }
    }
}

impl Operation {
    /// True when this node is a literal.
    pub fn is_constant(&self) -> bool {
        matches!(self, Operation::Constant(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_constant() {
        assert!(Operation::Constant(1.0).is_constant());
        assert!(!Operation::Variable("x".to_string()).is_constant());
    }

    #[test]
    fn test_operator_symbols() {
        assert_eq!(BinaryOp::Pow.symbol(), "^");
        assert_eq!(BinaryOp::Mod.symbol(), "%");
    }
}
