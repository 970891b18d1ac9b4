//! Read-only view of the platform class/type-library registry.
//!
//! The resolver only ever reads: `CLSID\{clsid}\TypeLib`,
//! `CLSID\{clsid}\Version`, the version subkeys of `TypeLib\{libid}` and
//! the registered path under `TypeLib\{libid}\{version}\{lcid}`.
//! [`StaticRegistry`] is a serde-loadable implementation backed by maps.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::guid::Guid;

/// The registry queries the resolver and loader depend on.
pub trait Registry: Send + Sync {
    /// Value of `CLSID\{clsid}\TypeLib` (a LIBID string).
    fn clsid_typelib(&self, clsid: &Guid) -> Option<String>;

    /// Value of `CLSID\{clsid}\Version` (`"major.minor"`, decimal).
    fn clsid_version(&self, clsid: &Guid) -> Option<String>;

    /// Subkey names of `TypeLib\{libid}` (`"major.minor"`, hexadecimal).
    fn typelib_versions(&self, libid: &Guid) -> Vec<String>;

    /// Registered file path for a library version and locale.
    ///
    /// `lcid` is the hexadecimal subkey name, as in the platform registry.
    fn typelib_path(&self, libid: &Guid, version: &str, lcid: &str) -> Option<PathBuf>;
}

/// A CLSID registration entry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClassEntry {
    #[serde(default)]
    pub typelib: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
}

/// Map-backed registry.
///
/// `typelibs` is keyed `libid -> version key -> lcid key -> path`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StaticRegistry {
    #[serde(default)]
    pub classes: BTreeMap<Guid, ClassEntry>,
    #[serde(default)]
    pub typelibs: BTreeMap<Guid, BTreeMap<String, BTreeMap<String, PathBuf>>>,
}

impl StaticRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a registry snapshot from a JSON file.
    pub fn load(path: &Path) -> std::io::Result<Self> {
        let data = std::fs::read_to_string(path)?;
        serde_json::from_str(&data).map_err(std::io::Error::other)
    }

    pub fn register_class(&mut self, clsid: Guid, typelib: Guid, version: &str) -> &mut Self {
        self.classes.insert(
            clsid,
            ClassEntry {
                typelib: Some(typelib.to_string()),
                version: Some(version.to_string()),
            },
        );
        self
    }

    /// Registers a library file, using the platform's hexadecimal key forms.
    pub fn register_typelib(
        &mut self,
        libid: Guid,
        major: u16,
        minor: u16,
        lcid: u32,
        path: impl Into<PathBuf>,
    ) -> &mut Self {
        self.typelibs
            .entry(libid)
            .or_default()
            .entry(format!("{:x}.{:x}", major, minor))
            .or_default()
            .insert(format!("{:x}", lcid), path.into());
        self
    }
}

impl Registry for StaticRegistry {
    fn clsid_typelib(&self, clsid: &Guid) -> Option<String> {
        self.classes.get(clsid)?.typelib.clone()
    }

    fn clsid_version(&self, clsid: &Guid) -> Option<String> {
        self.classes.get(clsid)?.version.clone()
    }

    fn typelib_versions(&self, libid: &Guid) -> Vec<String> {
        self.typelibs
            .get(libid)
            .map(|versions| versions.keys().cloned().collect())
            .unwrap_or_default()
    }

    fn typelib_path(&self, libid: &Guid, version: &str, lcid: &str) -> Option<PathBuf> {
        self.typelibs.get(libid)?.get(version)?.get(lcid).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_typelib_uses_hex_keys() {
        let libid = Guid::from_u128(7);
        let mut reg = StaticRegistry::new();
        reg.register_typelib(libid, 10, 1, 0x409, "/libs/acme.json");

        assert_eq!(reg.typelib_versions(&libid), vec!["a.1".to_string()]);
        assert_eq!(
            reg.typelib_path(&libid, "a.1", "409"),
            Some(PathBuf::from("/libs/acme.json"))
        );
        assert!(reg.typelib_path(&libid, "a.1", "0").is_none());
    }

    #[test]
    fn unknown_keys_are_absent() {
        let reg = StaticRegistry::new();
        let guid = Guid::from_u128(1);
        assert!(reg.clsid_typelib(&guid).is_none());
        assert!(reg.clsid_version(&guid).is_none());
        assert!(reg.typelib_versions(&guid).is_empty());
    }

    #[test]
    fn loads_from_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("registry.json");
        std::fs::write(
            &path,
            r#"{
                "classes": {
                    "{22222222-2222-2222-2222-222222222222}": {
                        "typelib": "{11111111-1111-1111-1111-111111111111}",
                        "version": "1.0"
                    }
                },
                "typelibs": {
                    "{11111111-1111-1111-1111-111111111111}": {
                        "1.0": { "0": "/libs/acme.json" }
                    }
                }
            }"#,
        )
        .unwrap();

        let reg = StaticRegistry::load(&path).unwrap();
        let clsid: Guid = "{22222222-2222-2222-2222-222222222222}".parse().unwrap();
        assert_eq!(
            reg.clsid_typelib(&clsid).as_deref(),
            Some("{11111111-1111-1111-1111-111111111111}")
        );
        assert_eq!(reg.clsid_version(&clsid).as_deref(), Some("1.0"));
    }
}
