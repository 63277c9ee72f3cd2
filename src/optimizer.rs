//! Constant folding over operation trees.
//!
//! A single bottom-up pass replaces every subtree that depends on no
//! variable with the constant it evaluates to. Folding runs through the
//! tree-walking interpreter against an empty environment, so the folded
//! value is bit-identical to what evaluation would have produced; a call to
//! a non-idempotent function is never folded, even over constant arguments.

use crate::ast::Operation;
use crate::formula::Environment;
use crate::interpreter::Interpreter;

/// The constant-folding pass.
pub struct Optimizer<'a> {
    interpreter: &'a Interpreter,
}

impl<'a> Optimizer<'a> {
    pub fn new(interpreter: &'a Interpreter) -> Self {
        Self { interpreter }
    }

    /// Folds `node` bottom-up and returns the optimized tree.
    pub fn fold(&self, node: Operation) -> Operation {
        match node {
            Operation::Constant(_) | Operation::Variable(_) => node,
            Operation::Unary { op, operand } => {
                let folded = Operation::Unary {
                    op,
                    operand: Box::new(self.fold(*operand)),
                };
                self.collapse(folded)
            }
            Operation::Binary { op, left, right } => {
                let folded = Operation::Binary {
                    op,
                    left: Box::new(self.fold(*left)),
                    right: Box::new(self.fold(*right)),
                };
                self.collapse(folded)
            }
            Operation::Function {
                name,
                args,
                idempotent,
            } => {
                let folded = Operation::Function {
                    name,
                    args: args.into_iter().map(|arg| self.fold(arg)).collect(),
                    idempotent,
                };
                if idempotent {
                    self.collapse(folded)
                } else {
                    folded
                }
            }
        }
    }

    /// Replaces `node` with a constant when all of its children already are.
    fn collapse(&self, node: Operation) -> Operation {
        let all_constant = match &node {
            Operation::Unary { operand, .. } => operand.is_constant(),
            Operation::Binary { left, right, .. } => left.is_constant() && right.is_constant(),
            Operation::Function { args, .. } => args.iter().all(Operation::is_constant),
            _ => false,
        };
        if !all_constant {
            return node;
        }
        // Folding never raises: if evaluation would fail, the subtree is
        // preserved and the error surfaces at evaluation time instead.
        match self.interpreter.evaluate(&node, &Environment::new()) {
            Ok(value) => Operation::Constant(value),
            Err(_) => node,
        }
    }
}
