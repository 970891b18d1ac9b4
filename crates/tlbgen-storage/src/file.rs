//! On-disk implementation of [`ModuleStore`].
//!
//! [`FileStore`] keeps one sealed file per module in a generation
//! directory, `<dir>/<stem>.rs`, next to the package initializer
//! `<dir>/mod.rs`. Writes go through a temporary file in the same
//! directory that is renamed into place, so a reader never observes a
//! half-written module and a failed write leaves the target untouched.
//!
//! The directory and initializer are recreated whenever they are found
//! missing, so deleting the generation directory between runs is safe.

use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::envelope;
use crate::error::StorageError;
use crate::traits::{import_committed, ModuleStore, StoreLookup};
use crate::types::{Backing, GeneratedModule, ModuleName, PACKAGE_INIT_STEM};

const INITIALIZER: &str = "//! Generated type-library bindings. Modules in this directory are\n\
//! written by tlbgen and may be deleted at any time.\n";

/// Directory-backed module store.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Opens (creating if needed) a store rooted at `dir`.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let store = FileStore { dir: dir.into() };
        store.ensure_layout().map_err(|source| StorageError::Open {
            path: store.dir.clone(),
            source,
        })?;
        Ok(store)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File path a module is stored at.
    pub fn module_path(&self, name: &ModuleName) -> PathBuf {
        self.dir.join(format!("{}.rs", name.stem()))
    }

    pub fn initializer_path(&self) -> PathBuf {
        self.dir.join(format!("{}.rs", PACKAGE_INIT_STEM))
    }

    /// Deletes every stored module, keeping the initializer.
    ///
    /// Returns the number of modules removed.
    pub fn clear(&self) -> Result<usize, StorageError> {
        let names = self.list_modules()?;
        for name in &names {
            match std::fs::remove_file(self.module_path(name)) {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        info!("cleared {} module(s) from {}", names.len(), self.dir.display());
        Ok(names.len())
    }

    fn ensure_layout(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        let init = self.initializer_path();
        if !init.is_file() {
            debug!("writing package initializer {}", init.display());
            self.write_atomic(&init, INITIALIZER)?;
        }
        Ok(())
    }

    fn write_atomic(&self, target: &Path, contents: &str) -> std::io::Result<()> {
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(contents.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(target).map_err(|e| e.error)?;
        Ok(())
    }
}

impl ModuleStore for FileStore {
    fn describe(&self) -> String {
        self.dir.display().to_string()
    }

    fn is_persistent(&self) -> bool {
        true
    }

    fn location(&self) -> Option<&Path> {
        Some(&self.dir)
    }

    fn load(&self, name: &ModuleName) -> StoreLookup {
        let path = self.module_path(name);
        let text = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return StoreLookup::Absent,
            Err(e) => {
                return StoreLookup::Invalid {
                    reason: format!("cannot read {}: {}", path.display(), e),
                }
            }
        };
        match envelope::open(name, &text) {
            Ok(body) => StoreLookup::Hit(GeneratedModule::new(
                name.clone(),
                body,
                Backing::OnDisk(path),
            )),
            Err(e) => StoreLookup::Invalid {
                reason: format!("{}: {}", path.display(), e),
            },
        }
    }

    fn commit(&self, name: &ModuleName, body: &str) -> Result<GeneratedModule, StorageError> {
        let path = self.module_path(name);
        let write_failed = |source| StorageError::WriteFailed {
            name: name.clone(),
            source,
        };
        self.ensure_layout().map_err(write_failed)?;
        self.write_atomic(&path, &envelope::seal(name, body))
            .map_err(write_failed)?;
        debug!("wrote {} to {}", name, path.display());
        import_committed(self, name)
    }

    fn list_modules(&self) -> Result<Vec<ModuleName>, StorageError> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut names = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("rs") {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if stem == PACKAGE_INIT_STEM || stem.starts_with('.') {
                continue;
            }
            names.push(ModuleName::in_package(stem));
        }
        names.sort();
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn acme() -> ModuleName {
        ModuleName::in_package("Acme")
    }

    #[test]
    fn open_creates_directory_and_initializer() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("gen");
        let store = FileStore::open(&dir).unwrap();
        assert!(dir.is_dir());
        assert!(store.initializer_path().is_file());
        assert!(store.list_modules().unwrap().is_empty());
        assert_eq!(store.location(), Some(dir.as_path()));
    }

    #[test]
    fn commit_writes_sealed_file() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FileStore::open(tmp.path()).unwrap();
        let module = store.commit(&acme(), "pub const A: i32 = 1;\n").unwrap();

        let path = tmp.path().join("Acme.rs");
        assert_eq!(module.backing, Backing::OnDisk(path.clone()));
        let on_disk = std::fs::read_to_string(&path).unwrap();
        assert!(on_disk.starts_with("// @generated by tlbgen"));
        assert!(on_disk.ends_with("pub const A: i32 = 1;\n"));
        assert_eq!(store.load(&acme()), StoreLookup::Hit(module));
    }

    #[test]
    fn missing_module_is_absent() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FileStore::open(tmp.path()).unwrap();
        assert_eq!(store.load(&acme()), StoreLookup::Absent);
    }

    #[test]
    fn corrupt_module_is_invalid() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FileStore::open(tmp.path()).unwrap();
        store.commit(&acme(), "pub const A: i32 = 1;\n").unwrap();
        std::fs::write(tmp.path().join("Acme.rs"), "fn broken(").unwrap();

        assert!(matches!(store.load(&acme()), StoreLookup::Invalid { .. }));
    }

    #[test]
    fn recreates_deleted_directory_on_commit() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("gen");
        let store = FileStore::open(&dir).unwrap();
        std::fs::remove_dir_all(&dir).unwrap();

        store.commit(&acme(), "x").unwrap();
        assert!(store.initializer_path().is_file());
        assert!(dir.join("Acme.rs").is_file());
    }

    #[test]
    fn failed_write_leaves_no_target() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("gen");
        let store = FileStore::open(&dir).unwrap();
        std::fs::remove_dir_all(&dir).unwrap();
        std::fs::write(&dir, "not a directory").unwrap();

        let err = store.commit(&acme(), "x").unwrap_err();
        assert!(matches!(err, StorageError::WriteFailed { .. }));
        assert!(!dir.join("Acme.rs").exists());
    }

    #[test]
    fn list_and_clear_skip_initializer() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FileStore::open(tmp.path()).unwrap();
        store.commit(&ModuleName::in_package("Zeta"), "").unwrap();
        store.commit(&acme(), "").unwrap();
        std::fs::write(tmp.path().join("notes.txt"), "ignored").unwrap();

        let names: Vec<String> = store
            .list_modules()
            .unwrap()
            .iter()
            .map(|n| n.to_string())
            .collect();
        assert_eq!(names, vec!["gen::Acme", "gen::Zeta"]);

        assert_eq!(store.clear().unwrap(), 2);
        assert!(store.list_modules().unwrap().is_empty());
        assert!(store.initializer_path().is_file());
    }
}
