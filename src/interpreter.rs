//! Tree-walking evaluation of operation trees.
//!
//! The interpreter is used three ways: directly, as the `Interpreted`
//! execution backend; by the optimizer, to fold constant subtrees; and as
//! the behavioral reference the compiler is tested against.

use std::sync::Arc;

use crate::Real;
use crate::ast::{BinaryOp, Operation, UnaryOp};
use crate::error::{CalcError, Result};
use crate::formula::{Environment, Formula};
use crate::registry::FunctionRegistry;

/// Recursive evaluator over `(node, environment)`.
pub struct Interpreter {
    functions: Arc<FunctionRegistry>,
}

impl Interpreter {
    /// Creates an interpreter against a snapshot of the function registry.
    pub fn new(functions: Arc<FunctionRegistry>) -> Self {
        Self { functions }
    }

    /// Evaluates `node` against `environment`.
    pub fn evaluate(&self, node: &Operation, environment: &Environment) -> Result<Real> {
        match node {
            Operation::Constant(value) => Ok(*value),
            Operation::Variable(name) => environment.get(name).copied().ok_or_else(|| {
                CalcError::UnboundVariable { name: name.clone() }
            }),
            Operation::Unary {
                op: UnaryOp::Neg,
                operand,
            } => Ok(-self.evaluate(operand, environment)?),
            Operation::Binary { op, left, right } => {
                let left = self.evaluate(left, environment)?;
                let right = self.evaluate(right, environment)?;
                Ok(apply_binary(*op, left, right))
            }
            Operation::Function { name, args, .. } => {
                let entry = self.functions.lookup(name).ok_or_else(|| {
                    CalcError::parse(0, format!("unknown function '{}'", name))
                })?;
                let mut values = Vec::with_capacity(args.len());
                for arg in args {
                    values.push(self.evaluate(arg, environment)?);
                }
                Ok((entry.callable())(&values))
            }
        }
    }

    /// The `Interpreted` executor: wraps the tree and the registry snapshot
    /// into a reusable callable that walks the tree on every invocation.
    pub fn build(&self, ast: Operation) -> Formula {
        let interpreter = Interpreter {
            functions: Arc::clone(&self.functions),
        };
        Formula::new(move |environment| interpreter.evaluate(&ast, environment))
    }
}

/// IEEE-754 binary64 semantics for every operator: `x/0` is an infinity,
/// `0/0` is NaN, `%` keeps the dividend's sign, `^` is the host `pow`.
pub(crate) fn apply_binary(op: BinaryOp, left: Real, right: Real) -> Real {
    match op {
        BinaryOp::Add => left + right,
        BinaryOp::Sub => left - right,
        BinaryOp::Mul => left * right,
        BinaryOp::Div => left / right,
        BinaryOp::Mod => left % right,
        BinaryOp::Pow => libm::pow(left, right),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::functions::default_function_registry;

    fn interpreter() -> Interpreter {
        Interpreter::new(Arc::new(default_function_registry()))
    }

    fn binary(op: BinaryOp, left: Operation, right: Operation) -> Operation {
        Operation::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    #[test]
    fn test_constant_and_variable() {
        let mut env = Environment::new();
        env.insert("x".to_string(), 4.5);
        let interpreter = interpreter();
        assert_eq!(
            interpreter
                .evaluate(&Operation::Constant(2.0), &env)
                .unwrap(),
            2.0
        );
        assert_eq!(
            interpreter
                .evaluate(&Operation::Variable("x".to_string()), &env)
                .unwrap(),
            4.5
        );
    }

    #[test]
    fn test_unbound_variable_error() {
        let err = interpreter()
            .evaluate(&Operation::Variable("y".to_string()), &Environment::new())
            .unwrap_err();
        assert_eq!(
            err,
            CalcError::UnboundVariable {
                name: "y".to_string()
            }
        );
    }

    #[test]
    fn test_division_by_zero_semantics() {
        let env = Environment::new();
        let interpreter = interpreter();
        let pos = binary(BinaryOp::Div, Operation::Constant(1.0), Operation::Constant(0.0));
        let neg = binary(BinaryOp::Div, Operation::Constant(-1.0), Operation::Constant(0.0));
        let nan = binary(BinaryOp::Div, Operation::Constant(0.0), Operation::Constant(0.0));
        assert_eq!(interpreter.evaluate(&pos, &env).unwrap(), f64::INFINITY);
        assert_eq!(interpreter.evaluate(&neg, &env).unwrap(), f64::NEG_INFINITY);
        assert!(interpreter.evaluate(&nan, &env).unwrap().is_nan());
    }

    #[test]
    fn test_modulo_sign_follows_dividend() {
        let env = Environment::new();
        let interpreter = interpreter();
        let node = binary(BinaryOp::Mod, Operation::Constant(-7.0), Operation::Constant(3.0));
        assert_eq!(interpreter.evaluate(&node, &env).unwrap(), -1.0);
    }

    #[test]
    fn test_function_call_packs_arguments_in_order() {
        let env = Environment::new();
        let node = Operation::Function {
            name: "ifless".to_string(),
            args: vec![
                Operation::Constant(1.0),
                Operation::Constant(2.0),
                Operation::Constant(10.0),
                Operation::Constant(20.0),
            ],
            idempotent: true,
        };
        assert_eq!(interpreter().evaluate(&node, &env).unwrap(), 10.0);
    }

    #[test]
    fn test_interpreted_executor_builds_reusable_callable() {
        let interpreter = interpreter();
        let ast = binary(
            BinaryOp::Mul,
            Operation::Variable("x".to_string()),
            Operation::Variable("x".to_string()),
        );
        let formula = interpreter.build(ast);
        for x in [1.0, 2.0, 3.5] {
            let mut env = Environment::new();
            env.insert("x".to_string(), x);
            assert_eq!(formula.evaluate(&env).unwrap(), x * x);
        }
    }
}
