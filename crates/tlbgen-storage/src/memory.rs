//! In-memory implementation of [`ModuleStore`].
//!
//! [`InMemoryStore`] backs the "no generation directory" mode. Modules are
//! sealed and verified exactly like on-disk modules, but only ever live in
//! a [`DashMap`]; nothing touches the filesystem.

use dashmap::DashMap;
use tracing::debug;

use crate::envelope;
use crate::error::StorageError;
use crate::traits::{import_committed, ModuleStore, StoreLookup};
use crate::types::{Backing, GeneratedModule, ModuleName};

/// Process-local module store.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    sealed: DashMap<ModuleName, String>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.sealed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sealed.is_empty()
    }
}

impl ModuleStore for InMemoryStore {
    fn describe(&self) -> String {
        "in-memory".to_string()
    }

    fn is_persistent(&self) -> bool {
        false
    }

    fn load(&self, name: &ModuleName) -> StoreLookup {
        let Some(sealed) = self.sealed.get(name) else {
            return StoreLookup::Absent;
        };
        match envelope::open(name, sealed.value()) {
            Ok(body) => StoreLookup::Hit(GeneratedModule::new(
                name.clone(),
                body,
                Backing::InMemory,
            )),
            Err(e) => StoreLookup::Invalid {
                reason: e.to_string(),
            },
        }
    }

    fn commit(&self, name: &ModuleName, body: &str) -> Result<GeneratedModule, StorageError> {
        debug!("storing {} in memory ({} bytes)", name, body.len());
        self.sealed.insert(name.clone(), envelope::seal(name, body));
        import_committed(self, name)
    }

    fn list_modules(&self) -> Result<Vec<ModuleName>, StorageError> {
        let mut names: Vec<ModuleName> = self.sealed.iter().map(|e| e.key().clone()).collect();
        names.sort();
        Ok(names)
    }
}
