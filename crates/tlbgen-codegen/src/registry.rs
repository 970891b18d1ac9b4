//! The process-resident module registry.
//!
//! [`ModuleRegistry`] is the first cache tier: every module that has been
//! generated or imported in this process, keyed by qualified name. It is an
//! explicit object so tests can run against a fresh registry, and it owns
//! the generation lock that serializes top-level `get_module` calls.

use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::{Mutex, MutexGuard};
use tlbgen_storage::{GeneratedModule, ModuleName};

/// Resident modules plus the generation lock.
#[derive(Debug, Default)]
pub struct ModuleRegistry {
    modules: DashMap<ModuleName, Arc<GeneratedModule>>,
    generation: Mutex<()>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &ModuleName) -> Option<Arc<GeneratedModule>> {
        self.modules.get(name).map(|entry| Arc::clone(entry.value()))
    }

    pub fn contains(&self, name: &ModuleName) -> bool {
        self.modules.contains_key(name)
    }

    /// Registers `module` under its own name, replacing any previous entry.
    pub fn insert(&self, module: GeneratedModule) -> Arc<GeneratedModule> {
        let module = Arc::new(module);
        self.modules
            .insert(module.name.clone(), Arc::clone(&module));
        module
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Resident module names, sorted.
    pub fn names(&self) -> Vec<ModuleName> {
        let mut names: Vec<ModuleName> = self.modules.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    /// Takes the generation lock. Held for a whole top-level request.
    pub fn lock_generation(&self) -> MutexGuard<'_, ()> {
        self.generation.lock()
    }
}
