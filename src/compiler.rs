//! Compilation of operation trees to native closures.
//!
//! The compiler turns every node into an already-resolved stage closure, so
//! the produced [`Formula`] does not walk the tree and performs no registry
//! or name-table lookup at call time: operator dispatch happens once, here,
//! and function entries are captured by `Arc` clone. Variables remain the
//! only names resolved per invocation, by environment lookup.
//!
//! The contract is observational equivalence with the interpreter on every
//! environment, which the test suite checks property-style.

use std::sync::Arc;

use crate::Real;
use crate::ast::{BinaryOp, Operation, UnaryOp};
use crate::error::{CalcError, Result};
use crate::formula::{Environment, Formula};
use crate::registry::FunctionRegistry;

type Stage = Box<dyn Fn(&Environment) -> Result<Real> + Send + Sync>;

/// Compiles operation trees against a snapshot of the function registry.
pub struct Compiler {
    functions: Arc<FunctionRegistry>,
}

impl Compiler {
    pub fn new(functions: Arc<FunctionRegistry>) -> Self {
        Self { functions }
    }

    /// The `Compiled` executor: stages the whole tree into one callable.
    pub fn build(&self, ast: &Operation) -> Result<Formula> {
        let stage = self.compile(ast)?;
        Ok(Formula::new(move |environment| stage(environment)))
    }

    fn compile(&self, node: &Operation) -> Result<Stage> {
        match node {
            Operation::Constant(value) => {
                let value = *value;
                Ok(Box::new(move |_| Ok(value)))
            }
            Operation::Variable(name) => {
                let name = name.clone();
                Ok(Box::new(move |environment| {
                    environment.get(&name).copied().ok_or_else(|| {
                        CalcError::UnboundVariable { name: name.clone() }
                    })
                }))
            }
            Operation::Unary {
                op: UnaryOp::Neg,
                operand,
            } => {
                let operand = self.compile(operand)?;
                Ok(Box::new(move |environment| Ok(-operand(environment)?)))
            }
            Operation::Binary { op, left, right } => {
                let left = self.compile(left)?;
                let right = self.compile(right)?;
                // One closure per operator keeps call time free of dispatch.
                Ok(match op {
                    BinaryOp::Add => Box::new(move |env| Ok(left(env)? + right(env)?)),
                    BinaryOp::Sub => Box::new(move |env| Ok(left(env)? - right(env)?)),
                    BinaryOp::Mul => Box::new(move |env| Ok(left(env)? * right(env)?)),
                    BinaryOp::Div => Box::new(move |env| Ok(left(env)? / right(env)?)),
                    BinaryOp::Mod => Box::new(move |env| Ok(left(env)? % right(env)?)),
                    BinaryOp::Pow => {
                        Box::new(move |env| Ok(libm::pow(left(env)?, right(env)?)))
                    }
                })
            }
            Operation::Function { name, args, .. } => {
                let entry = self.functions.lookup(name).ok_or_else(|| {
                    CalcError::parse(0, format!("unknown function '{}'", name))
                })?;
                let callable = Arc::clone(entry.callable());
                let stages: Vec<Stage> = args
                    .iter()
                    .map(|arg| self.compile(arg))
                    .collect::<Result<_>>()?;
                Ok(Box::new(move |environment| {
                    let mut values = Vec::with_capacity(stages.len());
                    for stage in &stages {
                        values.push(stage(environment)?);
                    }
                    Ok(callable(&values))
                }))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::AstBuilder;
    use crate::functions::{default_constant_registry, default_function_registry};
    use crate::interpreter::Interpreter;
    use crate::token::{Culture, TokenReader};

    fn compile(input: &str) -> (Formula, Formula) {
        let functions = Arc::new(default_function_registry());
        let constants = default_constant_registry();
        let tokens = TokenReader::new(Culture::invariant()).read(input).unwrap();
        let ast = AstBuilder::new(&functions, &constants).build(&tokens).unwrap();
        let compiled = Compiler::new(Arc::clone(&functions)).build(&ast).unwrap();
        let interpreted = Interpreter::new(functions).build(ast);
        (compiled, interpreted)
    }

    fn env(pairs: &[(&str, Real)]) -> Environment {
        pairs
            .iter()
            .map(|(name, value)| (name.to_string(), *value))
            .collect()
    }

    #[test]
    fn test_compiled_matches_interpreted() {
        let cases = [
            ("2+3*4", env(&[])),
            ("2^3^2", env(&[])),
            ("-2^2", env(&[])),
            ("x*x + 2*x + 1", env(&[("x", 3.0)])),
            ("sin(pi) + cos(0)", env(&[])),
            ("ifmore(a, 0, b, c)", env(&[("a", 1.0), ("b", 10.0), ("c", 20.0)])),
            ("a % b / c", env(&[("a", -7.0), ("b", 3.0), ("c", 2.0)])),
        ];
        for (input, environment) in cases {
            let (compiled, interpreted) = compile(input);
            let lhs = compiled.evaluate(&environment).unwrap();
            let rhs = interpreted.evaluate(&environment).unwrap();
            assert_eq!(lhs.to_bits(), rhs.to_bits(), "mismatch for {}", input);
        }
    }

    #[test]
    fn test_compiled_unbound_variable() {
        let (compiled, _) = compile("x + 1");
        let err = compiled.evaluate(&Environment::new()).unwrap_err();
        assert_eq!(
            err,
            CalcError::UnboundVariable {
                name: "x".to_string()
            }
        );
    }

    #[test]
    fn test_compiled_formula_is_reusable() {
        let (compiled, _) = compile("x * y");
        for (x, y) in [(1.0, 2.0), (3.0, 4.0), (0.5, -8.0)] {
            let environment = env(&[("x", x), ("y", y)]);
            assert_eq!(compiled.evaluate(&environment).unwrap(), x * y);
        }
    }

    #[test]
    fn test_compiled_keeps_function_entry_after_registry_mutation() {
        let mut functions = default_function_registry();
        functions
            .register(
                crate::registry::FunctionInfo::new(
                    "offset",
                    crate::registry::Arity::Fixed(1),
                    true,
                    true,
                    |args| args[0] + 100.0,
                ),
            )
            .unwrap();
        let functions = Arc::new(functions);
        let constants = default_constant_registry();
        let tokens = TokenReader::new(Culture::invariant())
            .read("offset(1)")
            .unwrap();
        let ast = AstBuilder::new(&functions, &constants).build(&tokens).unwrap();
        let compiled = Compiler::new(Arc::clone(&functions)).build(&ast).unwrap();

        // Replace the entry in a fresh registry generation; the compiled
        // formula still invokes the entry it captured.
        let mut mutated = (*functions).clone();
        mutated
            .register(
                crate::registry::FunctionInfo::new(
                    "offset",
                    crate::registry::Arity::Fixed(1),
                    true,
                    true,
                    |args| args[0] - 100.0,
                ),
            )
            .unwrap();
        assert_eq!(compiled.evaluate(&Environment::new()).unwrap(), 101.0);
    }
}
