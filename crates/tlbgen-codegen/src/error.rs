//! Codegen error types covering every failure of a `get_module` call.

use tlbgen_core::{LibraryIdentity, LoadError, ParseError, ResolutionError};
use tlbgen_storage::StorageError;

/// Errors raised while naming or generating a module.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    /// The library's friendly name would shadow a wrapper module name.
    #[error("friendly name '{declared}' collides with generated module {module}")]
    NameCollision { declared: String, module: String },

    /// Loading a referenced library produced a different library, so the
    /// module the referrer points at would never exist.
    #[error("requested type library {requested} but loaded {loaded}")]
    IdentityMismatch {
        requested: LibraryIdentity,
        loaded: LibraryIdentity,
    },
}

/// Everything a top-level `get_module` call can fail with.
///
/// Store lookup problems never show up here: a missing or corrupt cached
/// module is regenerated instead.
#[derive(Debug, thiserror::Error)]
pub enum GetModuleError {
    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Generation(#[from] GenerationError),

    /// Writing or importing a freshly generated module failed.
    #[error("persistence failed: {0}")]
    Persistence(#[from] StorageError),
}
