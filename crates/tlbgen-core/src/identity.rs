//! Library identity and the designators clients use to request a library.
//!
//! [`LibraryIdentity`] is the immutable key every generated wrapper module is
//! named after. [`LibraryReference`] is the closed set of ways a caller can
//! point at a library; the resolver turns each one into a
//! [`NormalizedRef`] the loader understands.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::guid::Guid;
use crate::loader::TypeLibraryHandle;

/// Canonical identity of a type library: LIBID, version and locale.
///
/// Two identities are equal iff all four fields match. The ordering is
/// only used to make dependency processing reproducible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LibraryIdentity {
    pub libid: Guid,
    pub major: u16,
    pub minor: u16,
    pub lcid: u32,
}

impl LibraryIdentity {
    pub fn new(libid: Guid, major: u16, minor: u16, lcid: u32) -> Self {
        LibraryIdentity {
            libid,
            major,
            minor,
            lcid,
        }
    }
}

impl fmt::Display for LibraryIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}.{} (lcid {})",
            self.libid, self.major, self.minor, self.lcid
        )
    }
}

/// An object that declares the library it was registered from.
///
/// Resolves exactly like [`LibraryReference::RegistryLibSpec`] with the
/// declared version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisteredObject {
    pub reg_libid: Guid,
    pub reg_version: (u16, u16),
}

/// Every designator a caller may use to request a type library.
#[derive(Debug, Clone)]
pub enum LibraryReference {
    /// An absolute filesystem path, used as-is.
    AbsolutePath(PathBuf),
    /// A path relative to the caller's base directory or the working directory.
    RelativePath(PathBuf),
    /// A coclass CLSID, resolved through `CLSID\{clsid}\TypeLib` and `Version`.
    RegistryClsid(Guid),
    /// A LIBID with an optional version and locale.
    ///
    /// When the version is omitted the highest registered version is used.
    RegistryLibSpec {
        libid: Guid,
        major: Option<u16>,
        minor: Option<u16>,
        lcid: Option<u32>,
    },
    /// An object exposing `reg_libid` and `reg_version`.
    ObjectLike(RegisteredObject),
    /// A library that is already loaded; bypasses resolution.
    AlreadyLoaded(TypeLibraryHandle),
}

impl LibraryReference {
    /// Registry designator for an exact identity.
    ///
    /// Used when chasing external libraries referenced by a descriptor.
    pub fn exact(identity: &LibraryIdentity) -> Self {
        LibraryReference::RegistryLibSpec {
            libid: identity.libid,
            major: Some(identity.major),
            minor: Some(identity.minor),
            lcid: Some(identity.lcid),
        }
    }

    /// Builds a path designator, choosing the absolute or relative variant.
    pub fn path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        if path.is_absolute() {
            LibraryReference::AbsolutePath(path)
        } else {
            LibraryReference::RelativePath(path)
        }
    }
}

/// A reference the loader can act on directly.
#[derive(Debug, Clone)]
pub enum NormalizedRef {
    /// A filesystem path; relative paths are left to the loader's search path.
    Path(PathBuf),
    /// A fully versioned registry entry.
    Registered {
        libid: Guid,
        major: u16,
        minor: u16,
        lcid: u32,
    },
    /// Already loaded, nothing to do.
    Loaded(TypeLibraryHandle),
}

impl fmt::Display for NormalizedRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NormalizedRef::Path(path) => write!(f, "{}", path.display()),
            NormalizedRef::Registered {
                libid,
                major,
                minor,
                lcid,
            } => write!(f, "{} {}.{} (lcid {})", libid, major, minor, lcid),
            NormalizedRef::Loaded(handle) => write!(f, "loaded {}", handle.identity()),
        }
    }
}
