//! The reusable callable produced by the executors.

use std::collections::HashMap;

use crate::Real;
use crate::error::Result;

/// A variable environment for one evaluation: lowercase name to value.
///
/// Environments are borrowed read-only for the duration of a single
/// evaluation; the engine composes its own copy when it overlays registered
/// constants, so a caller's map is never aliased or mutated.
pub type Environment = HashMap<String, Real>;

type FormulaFn = Box<dyn Fn(&Environment) -> Result<Real> + Send + Sync>;

/// A built formula: `environment -> f64`.
///
/// A `Formula` closes over the function entries it was built against (so a
/// later registry mutation does not change its behavior) but never over a
/// variable environment, and it keeps no state between invocations. It may
/// be invoked concurrently from any number of threads.
pub struct Formula {
    run: FormulaFn,
}

impl Formula {
    pub(crate) fn new<F>(run: F) -> Self
    where
        F: Fn(&Environment) -> Result<Real> + Send + Sync + 'static,
    {
        Self { run: Box::new(run) }
    }

    /// Evaluates the formula against `environment`.
    ///
    /// The only runtime failure is a variable the formula references that is
    /// missing from the environment.
    pub fn evaluate(&self, environment: &Environment) -> Result<Real> {
        (self.run)(environment)
    }
}

impl core::fmt::Debug for Formula {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("Formula")
    }
}
