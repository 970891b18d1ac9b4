//! Storage-layer types for generated modules.
//!
//! [`ModuleName`] is the qualified name of a generated module
//! (`gen::<stem>`); the stem doubles as the file stem in the on-disk store.
//! [`GeneratedModule`] is the immutable module object handed back to callers.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Package every generated module lives in.
pub const GEN_PACKAGE: &str = "gen";

/// Stem of the package initializer file.
pub const PACKAGE_INIT_STEM: &str = "mod";

/// Qualified name of a generated module, e.g. `gen::Acme`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ModuleName(String);

impl ModuleName {
    /// Names the module `stem` inside [`GEN_PACKAGE`].
    pub fn in_package(stem: &str) -> Self {
        ModuleName(format!("{}::{}", GEN_PACKAGE, stem))
    }

    /// Last path segment; the file stem in the on-disk store.
    pub fn stem(&self) -> &str {
        self.0.rsplit("::").next().unwrap_or(&self.0)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ModuleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where a module's source lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Backing {
    OnDisk(PathBuf),
    InMemory,
}

/// A generated module. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedModule {
    pub name: ModuleName,
    pub source_text: Arc<str>,
    pub backing: Backing,
}

impl GeneratedModule {
    pub fn new(name: ModuleName, source_text: impl Into<Arc<str>>, backing: Backing) -> Self {
        GeneratedModule {
            name,
            source_text: source_text.into(),
            backing,
        }
    }

    pub fn is_in_memory(&self) -> bool {
        self.backing == Backing::InMemory
    }
}

/// Summary of a module for listings and CLI output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleSummary {
    pub name: ModuleName,
    pub backing: Backing,
    pub source_bytes: usize,
}

impl From<&GeneratedModule> for ModuleSummary {
    fn from(module: &GeneratedModule) -> Self {
        ModuleSummary {
            name: module.name.clone(),
            backing: module.backing.clone(),
            source_bytes: module.source_text.len(),
        }
    }
}
