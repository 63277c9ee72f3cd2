//! Registries for named functions and constants.
//!
//! Both registries are case-insensitive maps that preserve insertion order,
//! so `functions()`/`constants()` on the engine iterate deterministically.
//! Entries carry an overwrite flag: the default library is registered
//! non-overwritable, while user entries replace earlier user entries of the
//! same name in place.

use std::sync::Arc;

use indexmap::IndexMap;

use crate::Real;
use crate::error::{CalcError, Result};

/// The callable shape stored for every registered function.
///
/// Fixed-arity functions receive exactly their declared number of arguments;
/// variadic functions receive the full ordered argument list as one slice.
pub type NativeFn = Arc<dyn Fn(&[Real]) -> Real + Send + Sync>;

/// Highest fixed arity a function registration may declare.
pub const MAX_FIXED_ARITY: usize = 16;

/// Number of arguments a registered function accepts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Arity {
    /// Exactly `n` arguments, `0..=16`.
    Fixed(usize),
    /// One or more arguments, passed as a single packed slice.
    Variadic,
}

impl Arity {
    /// Whether a call site with `count` arguments satisfies this arity.
    pub fn accepts(&self, count: usize) -> bool {
        match self {
            Arity::Fixed(n) => *n == count,
            Arity::Variadic => count >= 1,
        }
    }
}

/// A registered function: name, arity, callable, and folding/overwrite flags.
#[derive(Clone)]
pub struct FunctionInfo {
    name: String,
    arity: Arity,
    callable: NativeFn,
    idempotent: bool,
    overwritable: bool,
}

impl FunctionInfo {
    /// Creates a function entry. The name is lowercased. The public
    /// registration surface on the engine enforces the [`MAX_FIXED_ARITY`]
    /// cap before entries are created.
    pub fn new<F>(
        name: &str,
        arity: Arity,
        idempotent: bool,
        overwritable: bool,
        callable: F,
    ) -> Self
    where
        F: Fn(&[Real]) -> Real + Send + Sync + 'static,
    {
        Self {
            name: name.to_ascii_lowercase(),
            arity,
            callable: Arc::new(callable),
            idempotent,
            overwritable,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn arity(&self) -> Arity {
        self.arity
    }

    /// The callable itself. Executors clone this `Arc` at build time so a
    /// compiled formula keeps invoking the entry it was built against.
    pub fn callable(&self) -> &NativeFn {
        &self.callable
    }

    /// Idempotent means: identical arguments yield an identical result with
    /// no side effects, so the optimizer may fold constant calls.
    pub fn is_idempotent(&self) -> bool {
        self.idempotent
    }

    pub fn is_overwritable(&self) -> bool {
        self.overwritable
    }
}

impl core::fmt::Debug for FunctionInfo {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FunctionInfo")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .field("idempotent", &self.idempotent)
            .field("overwritable", &self.overwritable)
            .finish()
    }
}

/// A registered constant.
#[derive(Clone, Debug, PartialEq)]
pub struct ConstantInfo {
    name: String,
    value: Real,
    overwritable: bool,
}

impl ConstantInfo {
    pub fn new(name: &str, value: Real, overwritable: bool) -> Self {
        Self {
            name: name.to_ascii_lowercase(),
            value,
            overwritable,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> Real {
        self.value
    }

    pub fn is_overwritable(&self) -> bool {
        self.overwritable
    }
}

/// Case-insensitive, insertion-ordered map of function entries.
#[derive(Clone, Default)]
pub struct FunctionRegistry {
    entries: IndexMap<String, Arc<FunctionInfo>>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `info`, replacing an existing entry of the same name.
    ///
    /// Fails with a registration error when the existing entry is not
    /// overwritable. Replacement keeps the original insertion slot.
    pub fn register(&mut self, info: FunctionInfo) -> Result<()> {
        if let Some(existing) = self.entries.get(info.name()) {
            if !existing.is_overwritable() {
                return Err(CalcError::Registration {
                    name: info.name().to_string(),
                });
            }
        }
        self.entries.insert(info.name().to_string(), Arc::new(info));
        Ok(())
    }

    /// Unconditional insertion, used while the engine seeds the default
    /// library into an empty registry.
    pub(crate) fn insert(&mut self, info: FunctionInfo) {
        self.entries.insert(info.name().to_string(), Arc::new(info));
    }

    pub fn lookup(&self, name: &str) -> Option<&Arc<FunctionInfo>> {
        self.entries.get(&name.to_ascii_lowercase())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(&name.to_ascii_lowercase())
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<FunctionInfo>> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Case-insensitive, insertion-ordered map of constant entries.
#[derive(Clone, Debug, Default)]
pub struct ConstantRegistry {
    entries: IndexMap<String, ConstantInfo>,
}

impl ConstantRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `info` under the same overwrite rules as functions.
    pub fn register(&mut self, info: ConstantInfo) -> Result<()> {
        if let Some(existing) = self.entries.get(info.name()) {
            if !existing.is_overwritable() {
                return Err(CalcError::Registration {
                    name: info.name().to_string(),
                });
            }
        }
        self.entries.insert(info.name().to_string(), info);
        Ok(())
    }

    /// Unconditional insertion, used while the engine seeds the default
    /// constants into an empty registry.
    pub(crate) fn insert(&mut self, info: ConstantInfo) {
        self.entries.insert(info.name().to_string(), info);
    }

    pub fn lookup(&self, name: &str) -> Option<&ConstantInfo> {
        self.entries.get(&name.to_ascii_lowercase())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(&name.to_ascii_lowercase())
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &ConstantInfo> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed(name: &str, arity: usize, overwritable: bool) -> FunctionInfo {
        FunctionInfo::new(name, Arity::Fixed(arity), true, overwritable, |args| {
            args.iter().sum()
        })
    }

    #[test]
    fn test_register_and_lookup_case_insensitive() {
        let mut registry = FunctionRegistry::new();
        registry.register(fixed("Hypot", 2, true)).unwrap();
        assert!(registry.contains("HYPOT"));
        let entry = registry.lookup("hypot").unwrap();
        assert_eq!(entry.name(), "hypot");
        assert_eq!(entry.arity(), Arity::Fixed(2));
    }

    #[test]
    fn test_non_overwritable_entries_are_protected() {
        let mut registry = FunctionRegistry::new();
        registry.register(fixed("sin", 1, false)).unwrap();
        let err = registry.register(fixed("sin", 1, true)).unwrap_err();
        assert_eq!(
            err,
            CalcError::Registration {
                name: "sin".to_string()
            }
        );
    }

    #[test]
    fn test_user_entries_replace_in_place() {
        let mut registry = FunctionRegistry::new();
        registry.register(fixed("a", 1, true)).unwrap();
        registry.register(fixed("b", 1, true)).unwrap();
        registry.register(fixed("a", 2, true)).unwrap();
        let order: Vec<&str> = registry.iter().map(|e| e.name()).collect();
        assert_eq!(order, vec!["a", "b"]);
        assert_eq!(registry.lookup("a").unwrap().arity(), Arity::Fixed(2));
    }

    #[test]
    fn test_arity_acceptance() {
        assert!(Arity::Fixed(2).accepts(2));
        assert!(!Arity::Fixed(2).accepts(1));
        assert!(Arity::Variadic.accepts(1));
        assert!(Arity::Variadic.accepts(9));
        assert!(!Arity::Variadic.accepts(0));
    }

    #[test]
    fn test_constant_registry_order_and_overwrite() {
        let mut registry = ConstantRegistry::new();
        registry
            .register(ConstantInfo::new("pi", core::f64::consts::PI, false))
            .unwrap();
        registry.register(ConstantInfo::new("g", 9.81, true)).unwrap();
        registry.register(ConstantInfo::new("g", 9.80665, true)).unwrap();

        let names: Vec<&str> = registry.iter().map(|c| c.name()).collect();
        assert_eq!(names, vec!["pi", "g"]);
        assert_eq!(registry.lookup("G").unwrap().value(), 9.80665);
        assert!(registry
            .register(ConstantInfo::new("PI", 3.0, true))
            .is_err());
    }
}
