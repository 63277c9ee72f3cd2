//! Built-in scientific functions and constants.
//!
//! This module implements the default library registered at engine
//! construction. All implementations go through the `libm` crate. Special
//! cases follow IEEE-754: division by zero inside the reciprocal trig
//! functions yields infinities, out-of-domain inputs yield NaN.
//!
//! Every default entry is idempotent and non-overwritable.

use crate::Real;
use crate::registry::{Arity, ConstantInfo, ConstantRegistry, FunctionInfo, FunctionRegistry};

pub fn sin(a: Real) -> Real {
    libm::sin(a)
}

pub fn cos(a: Real) -> Real {
    libm::cos(a)
}

pub fn tan(a: Real) -> Real {
    libm::tan(a)
}

/// Cosecant, `1 / sin`.
pub fn csc(a: Real) -> Real {
    1.0 / libm::sin(a)
}

/// Secant, `1 / cos`.
pub fn sec(a: Real) -> Real {
    1.0 / libm::cos(a)
}

/// Cotangent, `1 / tan`.
pub fn cot(a: Real) -> Real {
    1.0 / libm::tan(a)
}

pub fn asin(a: Real) -> Real {
    libm::asin(a)
}

pub fn acos(a: Real) -> Real {
    libm::acos(a)
}

pub fn atan(a: Real) -> Real {
    libm::atan(a)
}

/// Inverse cotangent, `atan(1 / x)`.
pub fn acot(a: Real) -> Real {
    libm::atan(1.0 / a)
}

/// Natural logarithm.
pub fn loge(a: Real) -> Real {
    libm::log(a)
}

pub fn log10(a: Real) -> Real {
    libm::log10(a)
}

/// Logarithm of `a` in base `base`.
pub fn logn(a: Real, base: Real) -> Real {
    libm::log(a) / libm::log(base)
}

pub fn sqrt(a: Real) -> Real {
    libm::sqrt(a)
}

pub fn abs(a: Real) -> Real {
    libm::fabs(a)
}

/// Returns the larger of two values.
pub fn max(a: Real, b: Real) -> Real {
    if a > b { a } else { b }
}

/// Returns the smaller of two values.
pub fn min(a: Real, b: Real) -> Real {
    if a < b { a } else { b }
}

/// `if(a, b, c)`: `b` when `a` is non-zero, `c` otherwise.
pub fn conditional(a: Real, b: Real, c: Real) -> Real {
    if a != 0.0 { b } else { c }
}

/// `ifless(a, b, c, d)`: `c` when `a < b`, `d` otherwise.
pub fn if_less(a: Real, b: Real, c: Real, d: Real) -> Real {
    if a < b { c } else { d }
}

/// `ifmore(a, b, c, d)`: `c` when `a > b`, `d` otherwise.
pub fn if_more(a: Real, b: Real, c: Real, d: Real) -> Real {
    if a > b { c } else { d }
}

/// `ifequal(a, b, c, d)`: `c` when `a == b` (strict binary64 equality,
/// no tolerance), `d` otherwise.
pub fn if_equal(a: Real, b: Real, c: Real, d: Real) -> Real {
    if a == b { c } else { d }
}

pub fn ceiling(a: Real) -> Real {
    libm::ceil(a)
}

pub fn floor(a: Real) -> Real {
    libm::floor(a)
}

pub fn truncate(a: Real) -> Real {
    libm::trunc(a)
}

/// Builds the default function library.
///
/// All entries are idempotent and non-overwritable; registering a user
/// function under one of these names afterwards fails.
pub fn default_function_registry() -> FunctionRegistry {
    let defaults: &[(&str, usize, fn(&[Real]) -> Real)] = &[
        ("sin", 1, |args| sin(args[0])),
        ("cos", 1, |args| cos(args[0])),
        ("tan", 1, |args| tan(args[0])),
        ("csc", 1, |args| csc(args[0])),
        ("sec", 1, |args| sec(args[0])),
        ("cot", 1, |args| cot(args[0])),
        ("asin", 1, |args| asin(args[0])),
        ("acos", 1, |args| acos(args[0])),
        ("atan", 1, |args| atan(args[0])),
        ("acot", 1, |args| acot(args[0])),
        ("loge", 1, |args| loge(args[0])),
        ("log10", 1, |args| log10(args[0])),
        ("logn", 2, |args| logn(args[0], args[1])),
        ("sqrt", 1, |args| sqrt(args[0])),
        ("abs", 1, |args| abs(args[0])),
        ("max", 2, |args| max(args[0], args[1])),
        ("min", 2, |args| min(args[0], args[1])),
        ("if", 3, |args| conditional(args[0], args[1], args[2])),
        ("ifless", 4, |args| if_less(args[0], args[1], args[2], args[3])),
        ("ifmore", 4, |args| if_more(args[0], args[1], args[2], args[3])),
        ("ifequal", 4, |args| {
            if_equal(args[0], args[1], args[2], args[3])
        }),
        ("ceiling", 1, |args| ceiling(args[0])),
        ("floor", 1, |args| floor(args[0])),
        ("truncate", 1, |args| truncate(args[0])),
    ];

    let mut registry = FunctionRegistry::new();
    for &(name, arity, implementation) in defaults {
        registry.insert(FunctionInfo::new(
            name,
            Arity::Fixed(arity),
            true,
            false,
            implementation,
        ));
    }
    registry
}

/// Builds the default constant registry: `e` and `pi`, non-overwritable.
pub fn default_constant_registry() -> ConstantRegistry {
    let mut registry = ConstantRegistry::new();
    registry.insert(ConstantInfo::new("e", core::f64::consts::E, false));
    registry.insert(ConstantInfo::new("pi", core::f64::consts::PI, false));
    registry
}
