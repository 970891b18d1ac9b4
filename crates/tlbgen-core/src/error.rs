//! Error types for resolving, loading and parsing type libraries.
//!
//! Uses `thiserror` for structured, matchable variants. Resolution and load
//! failures are fatal to a request; parse failures are only fatal when the
//! descriptor itself is corrupt.

use std::path::PathBuf;

use thiserror::Error;

use crate::guid::Guid;

/// `TYPE_E_CANTLOADLIBRARY`: the library file is missing or unloadable.
pub const TYPE_E_CANTLOADLIBRARY: i32 = 0x8002_9C4A_u32 as i32;
/// `TYPE_E_UNSUPFORMAT`: the file is not a type library in a known format.
pub const TYPE_E_UNSUPFORMAT: i32 = 0x8002_8019_u32 as i32;
/// `E_ACCESSDENIED`.
pub const E_ACCESSDENIED: i32 = 0x8007_0005_u32 as i32;

/// Failures turning a designator into a loadable reference.
#[derive(Debug, Error)]
pub enum ResolutionError {
    /// A registry key the designator depends on does not exist.
    #[error("not registered: {key}")]
    NotRegistered { key: String },

    /// The designator could mean more than one library.
    #[error("ambiguous designator '{designator}': {reason}")]
    AmbiguousDesignator { designator: String, reason: String },

    /// A registry version value could not be parsed.
    #[error("malformed version '{value}' under {key}")]
    MalformedVersion { key: String, value: String },
}

/// Failures reported by the library loader.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("type library not found: {reference} ({code:#010x})")]
    NotFound { reference: String, code: i32 },

    #[error("invalid type library format in {}: {message} ({code:#010x})", path.display())]
    InvalidFormat {
        path: PathBuf,
        message: String,
        code: i32,
    },

    #[error("access denied reading {} ({code:#010x})", path.display())]
    AccessDenied { path: PathBuf, code: i32 },
}

impl LoadError {
    pub fn not_found(reference: impl Into<String>) -> Self {
        LoadError::NotFound {
            reference: reference.into(),
            code: TYPE_E_CANTLOADLIBRARY,
        }
    }

    pub fn invalid_format(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        LoadError::InvalidFormat {
            path: path.into(),
            message: message.into(),
            code: TYPE_E_UNSUPFORMAT,
        }
    }

    pub fn access_denied(path: impl Into<PathBuf>) -> Self {
        LoadError::AccessDenied {
            path: path.into(),
            code: E_ACCESSDENIED,
        }
    }

    /// The native HRESULT-style code of the failure.
    pub fn code(&self) -> i32 {
        match self {
            LoadError::NotFound { code, .. }
            | LoadError::InvalidFormat { code, .. }
            | LoadError::AccessDenied { code, .. } => *code,
        }
    }
}

/// Failures while turning a loaded library into parsed items.
#[derive(Debug, Error)]
pub enum ParseError {
    /// One item has a shape the parser cannot express.
    ///
    /// The parser records this and degrades the item to a stub; it is not
    /// returned for a whole library.
    #[error("unsupported construct: {0}")]
    UnsupportedConstruct(String),

    /// The descriptor is structurally broken.
    #[error("corrupt descriptor for {libid}: {reason}")]
    CorruptDescriptor { libid: Guid, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_error_codes() {
        assert_eq!(LoadError::not_found("x.tlb").code(), -2147312566);
        assert_eq!(LoadError::access_denied("/x").code(), E_ACCESSDENIED);
        assert_eq!(
            LoadError::invalid_format("/x", "bad").code(),
            TYPE_E_UNSUPFORMAT
        );
    }

    #[test]
    fn load_error_message_carries_code() {
        let message = LoadError::not_found("missing.tlb").to_string();
        assert!(message.contains("missing.tlb"));
        assert!(message.contains("0x80029c4a"));
    }
}
