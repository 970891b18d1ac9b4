//! The library loader boundary.
//!
//! [`TypeLibLoader`] turns a [`NormalizedRef`] into a [`TypeLibraryHandle`].
//! The handle exposes the identity attributes, declared name and the source
//! path the library was loaded from (when one is known).
//!
//! [`DescriptorFileLoader`] is the in-tree loader: it reads JSON
//! descriptors from disk, searching configured directories for relative
//! paths and consulting a [`Registry`] for registered libraries.

use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use crate::descriptor::TypeLibDescriptor;
use crate::error::LoadError;
use crate::guid::Guid;
use crate::identity::{LibraryIdentity, NormalizedRef};
use crate::registry::Registry;

/// Opaque, cheaply clonable handle to a loaded type library.
#[derive(Clone)]
pub struct TypeLibraryHandle {
    inner: Arc<LoadedLibrary>,
}

struct LoadedLibrary {
    descriptor: TypeLibDescriptor,
    source_path: Option<PathBuf>,
}

impl TypeLibraryHandle {
    pub fn new(descriptor: TypeLibDescriptor, source_path: Option<PathBuf>) -> Self {
        TypeLibraryHandle {
            inner: Arc::new(LoadedLibrary {
                descriptor,
                source_path,
            }),
        }
    }

    pub fn identity(&self) -> LibraryIdentity {
        self.inner.descriptor.identity()
    }

    pub fn declared_name(&self) -> Option<&str> {
        self.inner.descriptor.declared_name()
    }

    /// Filesystem path the library was loaded from, if any.
    pub fn source_path(&self) -> Option<&Path> {
        self.inner.source_path.as_deref()
    }

    pub fn descriptor(&self) -> &TypeLibDescriptor {
        &self.inner.descriptor
    }

    /// Whether both handles refer to the same loaded library object.
    pub fn same_library(&self, other: &TypeLibraryHandle) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for TypeLibraryHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeLibraryHandle")
            .field("identity", &self.identity())
            .field("source_path", &self.inner.source_path)
            .finish()
    }
}

/// Loads type libraries from normalized references.
pub trait TypeLibLoader: Send + Sync {
    fn load(&self, reference: &NormalizedRef) -> Result<TypeLibraryHandle, LoadError>;
}

/// Loader for JSON type-library descriptors on disk.
pub struct DescriptorFileLoader {
    registry: Arc<dyn Registry>,
    search_paths: Vec<PathBuf>,
}

impl DescriptorFileLoader {
    pub fn new(registry: Arc<dyn Registry>) -> Self {
        DescriptorFileLoader {
            registry,
            search_paths: Vec::new(),
        }
    }

    /// Directories searched, in order, for relative paths.
    pub fn with_search_paths(mut self, paths: Vec<PathBuf>) -> Self {
        self.search_paths = paths;
        self
    }

    fn load_path(&self, path: &Path) -> Result<TypeLibraryHandle, LoadError> {
        if path.is_absolute() {
            return read_descriptor(path);
        }
        for dir in &self.search_paths {
            let candidate = dir.join(path);
            if candidate.is_file() {
                debug!("found {} on search path {}", path.display(), dir.display());
                return read_descriptor(&candidate);
            }
        }
        Err(LoadError::not_found(path.display().to_string()))
    }

    fn load_registered(
        &self,
        libid: &Guid,
        major: u16,
        minor: u16,
        lcid: u32,
    ) -> Result<TypeLibraryHandle, LoadError> {
        let version = format!("{:x}.{:x}", major, minor);
        let path = self
            .registry
            .typelib_path(libid, &version, &format!("{:x}", lcid))
            .or_else(|| self.registry.typelib_path(libid, &version, "0"))
            .ok_or_else(|| {
                LoadError::not_found(format!("{} {}.{} (lcid {})", libid, major, minor, lcid))
            })?;
        let handle = self.load_path(&path)?;

        // The lcid may legitimately differ (neutral-locale fallback).
        let declared = handle.identity();
        if declared.libid != *libid || declared.major != major || declared.minor != minor {
            return Err(LoadError::invalid_format(
                handle.source_path().unwrap_or(&path),
                format!(
                    "descriptor declares {} but is registered as {} {}.{}",
                    declared, libid, major, minor
                ),
            ));
        }
        Ok(handle)
    }
}

impl TypeLibLoader for DescriptorFileLoader {
    fn load(&self, reference: &NormalizedRef) -> Result<TypeLibraryHandle, LoadError> {
        match reference {
            NormalizedRef::Path(path) => self.load_path(path),
            NormalizedRef::Registered {
                libid,
                major,
                minor,
                lcid,
            } => self.load_registered(libid, *major, *minor, *lcid),
            NormalizedRef::Loaded(handle) => Ok(handle.clone()),
        }
    }
}

/// Reads and decodes one descriptor file.
fn read_descriptor(path: &Path) -> Result<TypeLibraryHandle, LoadError> {
    let data = std::fs::read_to_string(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => LoadError::not_found(path.display().to_string()),
        ErrorKind::PermissionDenied => LoadError::access_denied(path),
        _ => LoadError::invalid_format(path, e.to_string()),
    })?;
    let descriptor: TypeLibDescriptor =
        serde_json::from_str(&data).map_err(|e| LoadError::invalid_format(path, e.to_string()))?;
    Ok(TypeLibraryHandle::new(descriptor, Some(path.to_path_buf())))
}
