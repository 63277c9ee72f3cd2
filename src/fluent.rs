//! Fluent construction of formulas with pre-declared variables.
//!
//! [`FormulaBuilder`] accumulates variable declarations for a formula and
//! produces a [`BoundFormula`], a callable that takes its arguments by
//! position in declaration order. This is a convenience surface over the
//! engine core; the pipeline and the cache behind it are the same ones
//! [`CalculationEngine::build`] uses.
//!
//! # Examples
//!
//! ```
//! use calc_rs::CalculationEngine;
//!
//! let engine = CalculationEngine::new();
//! let area = engine
//!     .formula("width * height")
//!     .parameter("width")
//!     .parameter("height")
//!     .build()
//!     .unwrap();
//! assert_eq!(area.evaluate(&[3.0, 4.0]).unwrap(), 12.0);
//! ```

use std::sync::Arc;

use crate::Real;
use crate::engine::CalculationEngine;
use crate::error::{CalcError, Result};
use crate::formula::{Environment, Formula};

/// Accumulates variable declarations for a formula.
pub struct FormulaBuilder<'e> {
    engine: &'e CalculationEngine,
    text: String,
    parameters: Vec<String>,
}

impl<'e> FormulaBuilder<'e> {
    pub(crate) fn new(engine: &'e CalculationEngine, text: &str) -> Self {
        Self {
            engine,
            text: text.to_string(),
            parameters: Vec::new(),
        }
    }

    /// Declares the next positional parameter. Names are lowercased.
    pub fn parameter(mut self, name: &str) -> Self {
        self.parameters.push(name.to_ascii_lowercase());
        self
    }

    /// Builds the callable bound to the declared parameter set.
    ///
    /// Fails when a declared name repeats, shadows a registered function or
    /// non-overwritable constant, or when the formula itself does not build.
    pub fn build(self) -> Result<BoundFormula> {
        for (index, name) in self.parameters.iter().enumerate() {
            if self.parameters[..index].contains(name) {
                return Err(CalcError::InvalidArgument(format!(
                    "parameter '{}' is declared twice",
                    name
                )));
            }
            self.engine.check_variable_name(name)?;
        }
        let formula = self.engine.build(&self.text)?;
        Ok(BoundFormula {
            formula,
            parameters: self.parameters,
            constants: self.engine.constant_snapshot(),
        })
    }
}

/// A formula bound to an ordered parameter declaration.
///
/// Like every built callable it is immutable, holds no per-invocation
/// state, and may be shared across threads.
#[derive(Debug)]
pub struct BoundFormula {
    formula: Arc<Formula>,
    parameters: Vec<String>,
    constants: Vec<(String, Real)>,
}

impl BoundFormula {
    /// The declared parameter names, in binding order.
    pub fn parameters(&self) -> &[String] {
        &self.parameters
    }

    /// Evaluates with one argument per declared parameter, in order.
    pub fn evaluate(&self, arguments: &[Real]) -> Result<Real> {
        if arguments.len() != self.parameters.len() {
            return Err(CalcError::InvalidArgument(format!(
                "formula declares {} parameters, got {} arguments",
                self.parameters.len(),
                arguments.len()
            )));
        }
        let mut environment = Environment::with_capacity(self.parameters.len());
        for (name, value) in self.parameters.iter().zip(arguments) {
            environment.insert(name.clone(), *value);
        }
        for (name, value) in &self.constants {
            environment.insert(name.clone(), *value);
        }
        self.formula.evaluate(&environment)
    }
}
