#![doc = r#"
# calc-rs

A math formula parser, compiler, and evaluation engine for Rust.

## Overview

calc-rs converts textual mathematical formulas over the real numbers into
reusable, efficient evaluators. A caller supplies a formula such as
`"2*sin(x+pi)/max(a,b)"`, optionally a mapping of free variables to numeric
values, and receives either the numeric result or a reusable callable that
can be invoked repeatedly with different variable bindings.

Key features:
- Default library of scientific functions (`sin`, `logn`, `ifless`, ...) and
  the constants `e` and `pi`
- User-registered constants and n-ary functions (fixed arity 0..=16, plus a
  variadic form), with overwrite protection for the default library
- Culture-aware numeric literals (`1.5` or `1,5`, with `,` or `;` between
  function arguments)
- An algebraic optimizer that folds every subtree depending on no variable
- Two execution backends: tree-walk interpretation and compilation to a
  native closure tree with no per-call registry lookups
- A thread-safe, single-flight formula cache keyed by the formula text

## Quick Start

```rust
use calc_rs::CalculationEngine;

let engine = CalculationEngine::new();

let result = engine.calculate("2 + 3 * 4").unwrap();
assert_eq!(result, 14.0); // 2 + (3 * 4) = 14

let result = engine.calculate("logn(8, 2) + sqrt(abs(-9))").unwrap();
assert!((result - 6.0).abs() < 1e-12);
```

## Variables and Constants

Variable names are case-insensitive and may not shadow a registered
function or a non-overwritable constant:

```rust
use calc_rs::{CalculationEngine, Environment};

let mut engine = CalculationEngine::new();
engine.add_constant("rate", 0.05).unwrap();

let mut vars = Environment::new();
vars.insert("principal".to_string(), 1000.0);

let result = engine.calculate_with("principal * (1 + rate)", &vars).unwrap();
assert_eq!(result, 1050.0);
```

## Custom Functions

```rust
use calc_rs::CalculationEngine;

let mut engine = CalculationEngine::new();

engine.add_function("hypotenuse", 2, |args| {
    (args[0] * args[0] + args[1] * args[1]).sqrt()
}).unwrap();

engine.add_variadic_function("total", |args| args.iter().sum()).unwrap();

assert_eq!(engine.calculate("hypotenuse(3, 4)").unwrap(), 5.0);
assert_eq!(engine.calculate("total(1, 2, 3, 4)").unwrap(), 10.0);
```

Functions whose results are not a pure function of their arguments are
registered with [`CalculationEngine::add_volatile_function`] so the
optimizer never folds them, even over constant arguments.

## Reusable Formulas

Building returns the callable without invoking it; built formulas are
immutable and may be shared across threads:

```rust
use calc_rs::{CalculationEngine, Environment};

let engine = CalculationEngine::new();
let formula = engine.build("x^2 + 2*x + 1").unwrap();

for x in [1.0, 2.0, 3.0] {
    let mut env = Environment::new();
    env.insert("x".to_string(), x);
    assert_eq!(formula.evaluate(&env).unwrap(), (x + 1.0) * (x + 1.0));
}
```

The fluent surface binds variables by position instead:

```rust
use calc_rs::CalculationEngine;

let engine = CalculationEngine::new();
let gravity = engine
    .formula("mass * 9.81")
    .parameter("mass")
    .build()
    .unwrap();
assert_eq!(gravity.evaluate(&[2.0]).unwrap(), 19.62);
```

## Grammar

Binary operators `+ - * / %` are left-associative; `^` is
right-associative and binds tighter than unary minus, so `-2^2` is
`-(2^2)` and `2^3^2` is `2^(3^2)`. Whitespace is insignificant.

| Precedence | Operators | Associativity |
|------------|---------------|---------------|
| 1 | `+` `-` | Left |
| 2 | `*` `/` `%` | Left |
| 3 | unary `-` | Right |
| 4 | `^` | Right |

All arithmetic is IEEE-754 binary64: `1/0` is infinity, `0/0` is NaN, `%`
keeps the sign of the dividend.

## Concurrency

Registries are populated during setup (`&mut self`) and frozen for
evaluation (`&self`): `calculate`, `build`, and `verify` are safe to call
concurrently, evaluation acquires no shared lock, and concurrent builds of
the same formula text are collapsed into a single build whose result every
caller shares.
"#]

pub mod ast;
pub mod builder;
pub mod cache;
pub mod compiler;
pub mod engine;
pub mod error;
pub mod fluent;
pub mod formula;
pub mod functions;
pub mod interpreter;
pub mod optimizer;
pub mod registry;
pub mod token;

pub use ast::{BinaryOp, Operation, UnaryOp};
pub use builder::AstBuilder;
pub use cache::FormulaCache;
pub use compiler::Compiler;
pub use engine::{CalculationEngine, EngineOptions, ExecutionMode};
pub use error::{CalcError, Result};
pub use fluent::{BoundFormula, FormulaBuilder};
pub use formula::{Environment, Formula};
pub use interpreter::Interpreter;
pub use optimizer::Optimizer;
pub use registry::{
    Arity, ConstantInfo, ConstantRegistry, FunctionInfo, FunctionRegistry, MAX_FIXED_ARITY,
    NativeFn,
};
pub use token::{Culture, Token, TokenKind, TokenReader};

/// The numeric type every formula evaluates to.
pub type Real = f64;

/// Utility macro to check if two floating point values are approximately
/// equal within a specified epsilon. NaN compares equal to NaN and
/// same-signed infinities compare equal.
#[macro_export]
macro_rules! assert_approx_eq {
    // Case 1: assert_approx_eq!(left, right) -> use default epsilon
    ($left:expr, $right:expr $(,)?) => {
        $crate::assert_approx_eq!($left, $right, 1e-10)
    };
    // Case 2: assert_approx_eq!(left, right, epsilon) -> use specified epsilon
    ($left:expr, $right:expr, $epsilon:expr $(,)?) => {{
        let left_val: $crate::Real = $left;
        let right_val: $crate::Real = $right;
        let eps: $crate::Real = $epsilon;

        if left_val.is_nan() && right_val.is_nan() {
            // NaN == NaN for our purposes
        } else if left_val.is_infinite()
            && right_val.is_infinite()
            && left_val.signum() == right_val.signum()
        {
            // Same-signed infinities are equal
        } else {
            assert!(
                (left_val - right_val).abs() < eps,
                "assertion failed: `(left ≈ right)` (left: `{}`, right: `{}`, epsilon: `{}`)",
                left_val,
                right_val,
                eps
            );
        }
    }};
}
