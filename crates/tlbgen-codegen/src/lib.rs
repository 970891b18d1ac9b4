//! Code generation and module caching for type libraries.
//!
//! This crate turns parsed type libraries into Rust wrapper modules and
//! keeps them cached across the resident registry and a module store.
//!
//! # Modules
//!
//! - [`error`] -- GenerationError and the aggregate GetModuleError
//! - [`naming`] -- Wrapper and friendly module naming rules
//! - [`symbols`] -- The known-symbol table of runtime support types
//! - [`types`] -- Mapping from type references to Rust type syntax
//! - [`codegen`] -- The wrapper and friendly module generator
//! - [`registry`] -- The process-resident module registry
//! - [`pipeline`] -- The import orchestrator, [`ModuleGenerator`]

pub mod codegen;
pub mod error;
pub mod naming;
pub mod pipeline;
pub mod registry;
pub mod symbols;
pub mod types;

pub use codegen::{CodeGenerator, GeneratedSource};
pub use error::{GenerationError, GetModuleError};
pub use pipeline::{GenStats, LibraryNames, ModuleGenerator};
pub use registry::ModuleRegistry;
pub use symbols::KnownSymbols;

use std::ffi::OsString;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Environment variable selecting the generation directory.
///
/// An empty value or `-` selects in-memory mode.
pub const GEN_DIR_ENV: &str = "TLBGEN_GEN_DIR";

/// Settings controlling where generated modules are stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenSettings {
    /// Generation directory. `None` means in-memory only.
    pub gen_dir: Option<PathBuf>,
}

impl Default for GenSettings {
    fn default() -> Self {
        GenSettings {
            gen_dir: Some(PathBuf::from("./gen")),
        }
    }
}

impl GenSettings {
    pub fn in_memory() -> Self {
        GenSettings { gen_dir: None }
    }

    pub fn with_gen_dir(dir: impl Into<PathBuf>) -> Self {
        GenSettings {
            gen_dir: Some(dir.into()),
        }
    }

    /// Reads [`GEN_DIR_ENV`], falling back to the default directory.
    pub fn from_env() -> Self {
        Self::from_env_value(std::env::var_os(GEN_DIR_ENV))
    }

    fn from_env_value(value: Option<OsString>) -> Self {
        match value {
            None => GenSettings::default(),
            Some(v) if v.is_empty() || v == "-" => GenSettings::in_memory(),
            Some(v) => GenSettings::with_gen_dir(v),
        }
    }
}
