//! Storage for generated type-library modules.
//!
//! Provides the [`ModuleStore`] trait defining the storage contract, plus
//! the [`FileStore`] (generation directory) and [`InMemoryStore`] backends.
//!
//! # Architecture
//!
//! Every stored module is *sealed*: its body is prefixed with a header
//! naming the module and carrying a blake3 checksum. Loading a module
//! verifies the seal, so a corrupt or foreign file is reported as
//! [`StoreLookup::Invalid`] instead of being handed to a caller.
//!
//! # Modules
//!
//! - [`error`]: StorageError enum with all persistence failure modes
//! - [`types`]: ModuleName, GeneratedModule and related types
//! - [`envelope`]: seal/open of module text
//! - [`traits`]: ModuleStore trait and StoreLookup
//! - [`file`]: FileStore implementation
//! - [`memory`]: InMemoryStore implementation

pub mod envelope;
pub mod error;
pub mod file;
pub mod memory;
pub mod traits;
pub mod types;

// Re-export key types for ergonomic use.
pub use envelope::{checksum, seal, EnvelopeError};
pub use error::StorageError;
pub use file::FileStore;
pub use memory::InMemoryStore;
pub use traits::{ModuleStore, StoreLookup};
pub use types::{Backing, GeneratedModule, ModuleName, ModuleSummary, GEN_PACKAGE, PACKAGE_INIT_STEM};
