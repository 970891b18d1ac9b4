//! Storage error types for tlbgen-storage.
//!
//! [`StorageError`] covers the persistence failures that abort a
//! generation. Lookup problems (absent or corrupt modules) are not errors;
//! they are reported through [`crate::traits::StoreLookup`].

use std::path::PathBuf;

use thiserror::Error;

use crate::types::ModuleName;

/// Errors produced by module stores.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The store directory or its initializer could not be created.
    #[error("cannot open module store {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Writing a module failed; nothing was left at the target path.
    #[error("failed to write module {name}: {source}")]
    WriteFailed {
        name: ModuleName,
        #[source]
        source: std::io::Error,
    },

    /// A freshly committed module did not load back.
    #[error("failed to import module {name}: {reason}")]
    ImportFailed { name: ModuleName, reason: String },

    /// Filesystem I/O error outside a single module write.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
