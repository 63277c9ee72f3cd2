//! The calculation engine facade.
//!
//! [`CalculationEngine`] wires the whole pipeline together: token reader,
//! AST builder, optimizer, executor, and formula cache, in front of the
//! function and constant registries.
//!
//! Registries are populated during setup through `&mut self` registration
//! methods, then frozen for evaluation: `calculate`, `build`, and `verify`
//! take `&self` and are safe to call concurrently from any number of
//! threads, and no shared lock is acquired per evaluation. Built callables
//! capture the registry generation they were built against, so a later
//! registration never changes the behavior of a formula a caller already
//! holds.
//!
//! # Examples
//!
//! ```
//! use calc_rs::{CalculationEngine, Environment};
//!
//! let engine = CalculationEngine::new();
//! assert_eq!(engine.calculate("2+3*4").unwrap(), 14.0);
//!
//! let mut vars = Environment::new();
//! vars.insert("x".to_string(), 3.0);
//! assert_eq!(engine.calculate_with("x*x + 2*x + 1", &vars).unwrap(), 16.0);
//! ```

use std::str::FromStr;
use std::sync::Arc;

use crate::Real;
use crate::builder::AstBuilder;
use crate::cache::FormulaCache;
use crate::compiler::Compiler;
use crate::error::{CalcError, Result};
use crate::fluent::FormulaBuilder;
use crate::formula::{Environment, Formula};
use crate::functions::{default_constant_registry, default_function_registry};
use crate::interpreter::Interpreter;
use crate::optimizer::Optimizer;
use crate::registry::{
    Arity, ConstantInfo, ConstantRegistry, FunctionInfo, FunctionRegistry, MAX_FIXED_ARITY,
};
use crate::token::{Culture, TokenReader};

/// Selects the executor that turns operation trees into callables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionMode {
    /// Tree-walking evaluation on every invocation.
    Interpreted,
    /// Compilation to a closure tree; no tree walk or registry lookup at
    /// call time.
    #[default]
    Compiled,
}

impl FromStr for ExecutionMode {
    type Err = CalcError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "interpreted" => Ok(ExecutionMode::Interpreted),
            "compiled" => Ok(ExecutionMode::Compiled),
            other => Err(CalcError::Config {
                message: format!("unknown execution mode '{}'", other),
            }),
        }
    }
}

/// Construction options for [`CalculationEngine`].
#[derive(Debug, Clone, Copy)]
pub struct EngineOptions {
    /// Decimal and argument separators used by the token reader.
    pub culture: Culture,
    /// Executor selection; defaults to [`ExecutionMode::Compiled`].
    pub execution_mode: ExecutionMode,
    /// Whether built formulas are cached by their exact text.
    pub cache_enabled: bool,
    /// Whether constant subtrees are folded before execution.
    pub optimizer_enabled: bool,
    /// Whether the default scientific function library is registered.
    pub default_functions: bool,
    /// Whether the default constants `e` and `pi` are registered.
    pub default_constants: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            culture: Culture::invariant(),
            execution_mode: ExecutionMode::Compiled,
            cache_enabled: true,
            optimizer_enabled: true,
            default_functions: true,
            default_constants: true,
        }
    }
}

/// The public calculate/build/verify surface over the expression pipeline.
pub struct CalculationEngine {
    options: EngineOptions,
    reader: TokenReader,
    functions: Arc<FunctionRegistry>,
    constants: Arc<ConstantRegistry>,
    cache: FormulaCache,
}

impl Default for CalculationEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl CalculationEngine {
    /// Creates an engine with the default options: invariant culture,
    /// compiled execution, cache and optimizer enabled, default library
    /// registered.
    pub fn new() -> Self {
        Self::with_options(EngineOptions::default())
    }

    pub fn with_options(options: EngineOptions) -> Self {
        let functions = if options.default_functions {
            default_function_registry()
        } else {
            FunctionRegistry::new()
        };
        let constants = if options.default_constants {
            default_constant_registry()
        } else {
            ConstantRegistry::new()
        };
        Self {
            options,
            reader: TokenReader::new(options.culture),
            functions: Arc::new(functions),
            constants: Arc::new(constants),
            cache: FormulaCache::new(),
        }
    }

    /// Evaluates `text` against an empty environment.
    pub fn calculate(&self, text: &str) -> Result<Real> {
        self.calculate_with(text, &Environment::new())
    }

    /// Evaluates `text` with the given variables.
    ///
    /// Variable names are lowercased and verified before the formula is
    /// built (through the cache) and invoked. The caller's map is copied;
    /// it is never aliased or mutated.
    pub fn calculate_with(&self, text: &str, variables: &Environment) -> Result<Real> {
        let lowered = lowercase_names(variables);
        self.verify_normalized(text, &lowered)?;
        let formula = self.build(text)?;
        formula.evaluate(&self.compose_environment(lowered))
    }

    /// Evaluates `text` without lowercasing or verifying variable names.
    ///
    /// The caller is responsible for pre-normalized, collision-free names.
    /// The variables map is still copied and registered constants still
    /// overlay it.
    pub fn calculate_unsafe(&self, text: &str, variables: &Environment) -> Result<Real> {
        let formula = self.build(text)?;
        formula.evaluate(&self.compose_environment(variables.clone()))
    }

    /// Checks that `text` is non-empty and that no variable name shadows a
    /// registered function or a non-overwritable constant.
    pub fn verify(&self, text: &str, variables: &Environment) -> Result<()> {
        self.verify_normalized(text, &lowercase_names(variables))
    }

    /// Builds the callable for `text` without invoking it.
    ///
    /// With caching enabled, repeated builds of the same text return the
    /// same callable and do not re-run the pipeline.
    pub fn build(&self, text: &str) -> Result<Arc<Formula>> {
        if self.options.cache_enabled {
            self.cache.get_or_build(text, || self.build_uncached(text))
        } else {
            self.build_uncached(text).map(Arc::new)
        }
    }

    /// Starts a fluent builder over `text` that binds variables by declared
    /// position.
    pub fn formula(&self, text: &str) -> FormulaBuilder<'_> {
        FormulaBuilder::new(self, text)
    }

    /// Registers an idempotent function of fixed arity `0..=16`.
    ///
    /// User registrations are overwritable: a later registration under the
    /// same name replaces this one. Default library names are protected and
    /// fail with a registration error.
    pub fn add_function<F>(&mut self, name: &str, arity: usize, implementation: F) -> Result<()>
    where
        F: Fn(&[Real]) -> Real + Send + Sync + 'static,
    {
        self.register_function(name, Arity::Fixed(arity), true, implementation)
    }

    /// Registers a fixed-arity function excluded from constant folding,
    /// for callables that are not pure functions of their arguments.
    pub fn add_volatile_function<F>(
        &mut self,
        name: &str,
        arity: usize,
        implementation: F,
    ) -> Result<()>
    where
        F: Fn(&[Real]) -> Real + Send + Sync + 'static,
    {
        self.register_function(name, Arity::Fixed(arity), false, implementation)
    }

    /// Registers an idempotent function accepting one or more arguments,
    /// passed as a single packed slice.
    pub fn add_variadic_function<F>(&mut self, name: &str, implementation: F) -> Result<()>
    where
        F: Fn(&[Real]) -> Real + Send + Sync + 'static,
    {
        self.register_function(name, Arity::Variadic, true, implementation)
    }

    /// Variadic registration excluded from constant folding.
    pub fn add_volatile_variadic_function<F>(&mut self, name: &str, implementation: F) -> Result<()>
    where
        F: Fn(&[Real]) -> Real + Send + Sync + 'static,
    {
        self.register_function(name, Arity::Variadic, false, implementation)
    }

    /// Registers a constant. User constants are overwritable; `e` and `pi`
    /// from the default library are not.
    pub fn add_constant(&mut self, name: &str, value: Real) -> Result<()> {
        Arc::make_mut(&mut self.constants).register(ConstantInfo::new(name, value, true))?;
        self.cache.clear();
        Ok(())
    }

    /// Registered functions in insertion order.
    pub fn functions(&self) -> impl Iterator<Item = &Arc<FunctionInfo>> {
        self.functions.iter()
    }

    /// Registered constants in insertion order.
    pub fn constants(&self) -> impl Iterator<Item = &ConstantInfo> {
        self.constants.iter()
    }

    fn register_function<F>(
        &mut self,
        name: &str,
        arity: Arity,
        idempotent: bool,
        implementation: F,
    ) -> Result<()>
    where
        F: Fn(&[Real]) -> Real + Send + Sync + 'static,
    {
        if let Arity::Fixed(n) = arity {
            if n > MAX_FIXED_ARITY {
                return Err(CalcError::Config {
                    message: format!(
                        "function '{}' declares arity {}, the maximum is {}",
                        name, n, MAX_FIXED_ARITY
                    ),
                });
            }
        }
        Arc::make_mut(&mut self.functions).register(FunctionInfo::new(
            name,
            arity,
            idempotent,
            true,
            implementation,
        ))?;
        // Cached callables reference entries by captured Arc, so staying
        // cached across a mutation would keep serving the replaced entry.
        self.cache.clear();
        Ok(())
    }

    fn build_uncached(&self, text: &str) -> Result<Formula> {
        let tokens = self.reader.read(text)?;
        let ast = AstBuilder::new(&self.functions, &self.constants).build(&tokens)?;
        let interpreter = Interpreter::new(Arc::clone(&self.functions));
        let ast = if self.options.optimizer_enabled {
            Optimizer::new(&interpreter).fold(ast)
        } else {
            ast
        };
        match self.options.execution_mode {
            ExecutionMode::Interpreted => Ok(interpreter.build(ast)),
            ExecutionMode::Compiled => Compiler::new(Arc::clone(&self.functions)).build(&ast),
        }
    }

    fn verify_normalized(&self, text: &str, variables: &Environment) -> Result<()> {
        if text.trim().is_empty() {
            return Err(CalcError::EmptyFormula);
        }
        for name in variables.keys() {
            self.check_variable_name(name)?;
        }
        Ok(())
    }

    /// A caller variable may not shadow any function or a non-overwritable
    /// constant.
    pub(crate) fn check_variable_name(&self, name: &str) -> Result<()> {
        if self.functions.contains(name) {
            return Err(CalcError::VariableName {
                name: name.to_string(),
            });
        }
        if self
            .constants
            .lookup(name)
            .is_some_and(|constant| !constant.is_overwritable())
        {
            return Err(CalcError::VariableName {
                name: name.to_string(),
            });
        }
        Ok(())
    }

    /// Copies caller variables and overlays registered constants.
    fn compose_environment(&self, mut variables: Environment) -> Environment {
        for constant in self.constants.iter() {
            variables.insert(constant.name().to_string(), constant.value());
        }
        variables
    }

    pub(crate) fn constant_snapshot(&self) -> Vec<(String, Real)> {
        self.constants
            .iter()
            .map(|constant| (constant.name().to_string(), constant.value()))
            .collect()
    }
}

fn lowercase_names(variables: &Environment) -> Environment {
    variables
        .iter()
        .map(|(name, value)| (name.to_ascii_lowercase(), *value))
        .collect()
}
