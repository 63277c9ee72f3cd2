//! Concurrent formula-text to callable cache.
//!
//! The cache is a map of lazies: each formula text owns a
//! [`once_cell::sync::OnceCell`], so concurrent requests for the same text
//! serialize on that cell (exactly one build runs, the others block and
//! receive its result) while requests for distinct texts build fully in
//! parallel. A failed build leaves its cell empty, which is the same as not
//! being cached at all: the next request for that text rebuilds.
//!
//! Keys are the exact formula string; no normalization is applied.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use once_cell::sync::OnceCell;

use crate::error::Result;
use crate::formula::Formula;

type Slot = Arc<OnceCell<Arc<Formula>>>;

/// Thread-safe, single-flight cache from formula text to built callable.
#[derive(Default)]
pub struct FormulaCache {
    entries: Mutex<HashMap<String, Slot>>,
}

impl FormulaCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached callable for `text`, building it with `build` if
    /// absent. At most one build runs per key at a time; a failed build is
    /// not retained.
    pub fn get_or_build<F>(&self, text: &str, build: F) -> Result<Arc<Formula>>
    where
        F: FnOnce() -> Result<Formula>,
    {
        let slot = {
            let mut entries = self.lock();
            Arc::clone(
                entries
                    .entry(text.to_string())
                    .or_insert_with(|| Arc::new(OnceCell::new())),
            )
        };
        // The map lock is released here; only same-key callers contend on
        // the cell while the build runs.
        slot.get_or_try_init(|| build().map(Arc::new))
            .map(Arc::clone)
    }

    /// Returns the cached callable for `text` without building.
    pub fn try_get(&self, text: &str) -> Option<Arc<Formula>> {
        let entries = self.lock();
        entries.get(text).and_then(|slot| slot.get().cloned())
    }

    /// Drops every entry. Used when a registry mutation could make cached
    /// callables observably stale.
    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Slot>> {
        // A poisoned map only means a build panicked; the data is a plain
        // map of lazies and stays usable.
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
