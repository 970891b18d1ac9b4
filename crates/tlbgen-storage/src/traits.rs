//! The [`ModuleStore`] trait defining the storage contract for generated
//! modules.
//!
//! A store persists the *sealed* text of a module (see [`crate::envelope`])
//! and hands back [`GeneratedModule`] objects. Lookups never fail: a module
//! that is missing, unreadable or corrupt is reported through
//! [`StoreLookup`] so the caller can regenerate it.
//!
//! Both backends ([`crate::FileStore`], [`crate::InMemoryStore`]) implement
//! this trait and are swappable behind `Arc<dyn ModuleStore>`.

use std::path::Path;

use crate::error::StorageError;
use crate::types::{GeneratedModule, ModuleName};

/// Result of looking a module up in a store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreLookup {
    /// The module exists and its seal verified.
    Hit(GeneratedModule),
    /// Nothing stored under this name.
    Absent,
    /// Something is stored but cannot be imported.
    Invalid { reason: String },
}

/// The storage contract for generated modules.
pub trait ModuleStore: Send + Sync {
    /// Short human-readable description, e.g. the directory path.
    fn describe(&self) -> String;

    /// Whether committed modules survive the process.
    fn is_persistent(&self) -> bool;

    /// Directory holding the stored modules, if the store has one.
    fn location(&self) -> Option<&Path> {
        None
    }

    /// Imports the module stored under `name`.
    fn load(&self, name: &ModuleName) -> StoreLookup;

    /// Seals and stores `body` under `name`, overwriting any previous
    /// version, then imports it back.
    ///
    /// On failure no partial module is left under `name`.
    fn commit(&self, name: &ModuleName, body: &str) -> Result<GeneratedModule, StorageError>;

    /// Names of all stored modules, sorted.
    fn list_modules(&self) -> Result<Vec<ModuleName>, StorageError>;
}

/// Shared post-commit import check: a module that does not load back after
/// a successful write is an import failure.
pub(crate) fn import_committed(
    store: &dyn ModuleStore,
    name: &ModuleName,
) -> Result<GeneratedModule, StorageError> {
    match store.load(name) {
        StoreLookup::Hit(module) => Ok(module),
        StoreLookup::Absent => Err(StorageError::ImportFailed {
            name: name.clone(),
            reason: "module vanished after write".to_string(),
        }),
        StoreLookup::Invalid { reason } => Err(StorageError::ImportFailed {
            name: name.clone(),
            reason,
        }),
    }
}
