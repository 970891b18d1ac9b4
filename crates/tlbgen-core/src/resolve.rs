//! Identity resolution: designator -> loadable reference.
//!
//! [`resolve`] handles every [`LibraryReference`] variant with an exhaustive
//! match. Path designators are made absolute when the file can be found
//! relative to the caller's base directory or the working directory;
//! registry designators are read (never written) through a [`Registry`].
//!
//! [`parse_designator`] maps the textual designators accepted on the
//! command line onto [`LibraryReference`] values.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::ResolutionError;
use crate::guid::Guid;
use crate::identity::{LibraryReference, NormalizedRef};
use crate::registry::Registry;

/// Result of resolving one designator.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub reference: NormalizedRef,
    /// The path is absolute and known to exist.
    pub is_absolute: bool,
    /// The path as requested by a path designator, `None` for the others.
    pub designator_path: Option<PathBuf>,
}

/// Normalizes `reference` into something the loader can load.
///
/// `base_dir` is the directory relative paths are tried against first;
/// the process working directory is tried next.
pub fn resolve(
    reference: &LibraryReference,
    base_dir: Option<&Path>,
    registry: &dyn Registry,
) -> Result<Resolution, ResolutionError> {
    match reference {
        LibraryReference::AbsolutePath(path) => Ok(Resolution {
            reference: NormalizedRef::Path(path.clone()),
            is_absolute: true,
            designator_path: Some(path.clone()),
        }),
        LibraryReference::RelativePath(path) => Ok(resolve_relative(path, base_dir)),
        LibraryReference::RegistryClsid(clsid) => {
            let (libid, major, minor) = resolve_clsid(clsid, registry)?;
            Ok(registered(libid, major, minor, 0))
        }
        LibraryReference::RegistryLibSpec {
            libid,
            major,
            minor,
            lcid,
        } => {
            let (major, minor) = match (major, minor) {
                (Some(major), Some(minor)) => (*major, *minor),
                (major, None) => highest_version(libid, *major, registry)?,
                (None, Some(minor)) => {
                    return Err(ResolutionError::AmbiguousDesignator {
                        designator: format!("{} ?.{}", libid, minor),
                        reason: "minor version given without a major version".into(),
                    })
                }
            };
            Ok(registered(*libid, major, minor, lcid.unwrap_or(0)))
        }
        LibraryReference::ObjectLike(object) => {
            let (major, minor) = object.reg_version;
            Ok(registered(object.reg_libid, major, minor, 0))
        }
        LibraryReference::AlreadyLoaded(handle) => Ok(Resolution {
            reference: NormalizedRef::Loaded(handle.clone()),
            is_absolute: false,
            designator_path: None,
        }),
    }
}

fn registered(libid: Guid, major: u16, minor: u16, lcid: u32) -> Resolution {
    Resolution {
        reference: NormalizedRef::Registered {
            libid,
            major,
            minor,
            lcid,
        },
        is_absolute: false,
        designator_path: None,
    }
}

fn resolve_relative(path: &Path, base_dir: Option<&Path>) -> Resolution {
    let found = |candidate: PathBuf| Resolution {
        reference: NormalizedRef::Path(candidate),
        is_absolute: true,
        designator_path: Some(path.to_path_buf()),
    };

    if let Some(base) = base_dir {
        let candidate = base.join(path);
        if candidate.exists() {
            debug!("resolved {} against base {}", path.display(), base.display());
            return found(absolutize(candidate));
        }
    }
    if let Ok(cwd) = std::env::current_dir() {
        let candidate = cwd.join(path);
        if candidate.exists() {
            debug!("resolved {} against working directory", path.display());
            return found(candidate);
        }
    }
    // Left alone: the loader may still find it on its search path.
    Resolution {
        reference: NormalizedRef::Path(path.to_path_buf()),
        is_absolute: false,
        designator_path: Some(path.to_path_buf()),
    }
}

fn absolutize(path: PathBuf) -> PathBuf {
    if path.is_absolute() {
        return path;
    }
    match std::env::current_dir() {
        Ok(cwd) => cwd.join(path),
        Err(_) => path,
    }
}

fn resolve_clsid(clsid: &Guid, registry: &dyn Registry) -> Result<(Guid, u16, u16), ResolutionError> {
    let typelib_key = format!(r"CLSID\{}\TypeLib", clsid);
    let libid_value = registry
        .clsid_typelib(clsid)
        .ok_or_else(|| ResolutionError::NotRegistered {
            key: typelib_key.clone(),
        })?;
    let libid: Guid = libid_value
        .parse()
        .map_err(|_| ResolutionError::NotRegistered {
            key: format!("{} (invalid LIBID '{}')", typelib_key, libid_value),
        })?;

    let version_key = format!(r"CLSID\{}\Version", clsid);
    let version = registry
        .clsid_version(clsid)
        .ok_or_else(|| ResolutionError::NotRegistered {
            key: version_key.clone(),
        })?;
    let (major, minor) =
        parse_version(&version, 10).ok_or_else(|| ResolutionError::MalformedVersion {
            key: version_key,
            value: version.clone(),
        })?;
    Ok((libid, major, minor))
}

/// Picks the highest registered `major.minor`, optionally within one major.
fn highest_version(
    libid: &Guid,
    major: Option<u16>,
    registry: &dyn Registry,
) -> Result<(u16, u16), ResolutionError> {
    let key = format!(r"TypeLib\{}", libid);
    let subkeys = registry.typelib_versions(libid);
    if subkeys.is_empty() {
        return Err(ResolutionError::NotRegistered { key });
    }

    let mut parsed = Vec::with_capacity(subkeys.len());
    for subkey in &subkeys {
        match parse_version(subkey, 16) {
            Some(version) => parsed.push(version),
            None => debug!("skipping malformed version subkey {}\\{}", key, subkey),
        }
    }
    if parsed.is_empty() {
        return Err(ResolutionError::MalformedVersion {
            key,
            value: subkeys.join(", "),
        });
    }

    parsed
        .into_iter()
        .filter(|(m, _)| major.map_or(true, |wanted| *m == wanted))
        .max()
        .ok_or_else(|| ResolutionError::NotRegistered {
            key: format!(r"{}\{:x}.*", key, major.unwrap_or_default()),
        })
}

/// Parses `"major.minor"` in the given radix.
fn parse_version(text: &str, radix: u32) -> Option<(u16, u16)> {
    let (major, minor) = text.trim().split_once('.')?;
    Some((
        u16::from_str_radix(major, radix).ok()?,
        u16::from_str_radix(minor, radix).ok()?,
    ))
}

/// Parses a textual designator.
///
/// - `clsid:{GUID}` -> [`LibraryReference::RegistryClsid`]
/// - `{GUID}` or `GUID` -> [`LibraryReference::RegistryLibSpec`], highest version
/// - `GUID,major,minor[,lcid]` -> [`LibraryReference::RegistryLibSpec`]
/// - anything else -> a path designator
///
/// Text that reads as a registry designator but also names an existing
/// file is rejected as ambiguous.
pub fn parse_designator(
    text: &str,
    base_dir: Option<&Path>,
) -> Result<LibraryReference, ResolutionError> {
    let registry_form = parse_registry_designator(text)?;
    let Some(reference) = registry_form else {
        return Ok(LibraryReference::path(text));
    };

    let as_path = Path::new(text);
    let exists = as_path.exists() || base_dir.is_some_and(|base| base.join(as_path).exists());
    if exists {
        return Err(ResolutionError::AmbiguousDesignator {
            designator: text.to_string(),
            reason: "names both a registry entry and an existing file".into(),
        });
    }
    Ok(reference)
}

fn parse_registry_designator(text: &str) -> Result<Option<LibraryReference>, ResolutionError> {
    let trimmed = text.trim();
    if let Some(rest) = trimmed.strip_prefix("clsid:") {
        return match rest.parse::<Guid>() {
            Ok(clsid) => Ok(Some(LibraryReference::RegistryClsid(clsid))),
            Err(_) => Err(ResolutionError::AmbiguousDesignator {
                designator: text.to_string(),
                reason: "'clsid:' prefix without a valid GUID".into(),
            }),
        };
    }

    let mut parts = trimmed.split(',').map(str::trim);
    let Some(Ok(libid)) = parts.next().map(str::parse::<Guid>) else {
        return Ok(None);
    };
    let rest: Vec<&str> = parts.collect();
    let invalid = || ResolutionError::AmbiguousDesignator {
        designator: text.to_string(),
        reason: "expected GUID,major,minor[,lcid]".into(),
    };
    let reference = match rest.as_slice() {
        [] => LibraryReference::RegistryLibSpec {
            libid,
            major: None,
            minor: None,
            lcid: None,
        },
        [major, minor] | [major, minor, _] => LibraryReference::RegistryLibSpec {
            libid,
            major: Some(major.parse().map_err(|_| invalid())?),
            minor: Some(minor.parse().map_err(|_| invalid())?),
            lcid: match rest.get(2) {
                Some(lcid) => Some(lcid.parse().map_err(|_| invalid())?),
                None => None,
            },
        },
        _ => return Err(invalid()),
    };
    Ok(Some(reference))
}
