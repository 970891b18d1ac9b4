//! The import orchestrator.
//!
//! [`ModuleGenerator::get_module`] runs one request through
//! resolve -> load -> wrapper cache check -> parse -> generate -> persist
//! -> chase externals -> friendly cache check -> generate -> persist.
//!
//! # Architecture
//!
//! - Cache tiers are checked in order: the resident [`ModuleRegistry`],
//!   then the active [`ModuleStore`]. A store lookup that misses or finds a
//!   corrupt module falls through to regeneration and is never surfaced.
//! - A wrapper is persisted before its externals are chased, so a failing
//!   dependency never rolls it back.
//! - Externals are chased with an explicit worklist and a visited set, so
//!   mutually referencing libraries terminate and each identity is
//!   generated at most once per request.
//! - The generation lock is held for the whole request and the store is
//!   snapshotted at its start; changing the generation directory mid-request
//!   does not affect a running request.

use std::collections::{BTreeSet, HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;
use tracing::{debug, info, warn};

use tlbgen_core::{
    resolve, DescriptorParser, EntryParser, LibraryIdentity, LibraryReference, NormalizedRef,
    Registry, TypeLibLoader, TypeLibraryHandle,
};
use tlbgen_storage::{
    FileStore, GeneratedModule, InMemoryStore, ModuleName, ModuleStore, StorageError, StoreLookup,
};

use crate::codegen::CodeGenerator;
use crate::error::{GenerationError, GetModuleError};
use crate::naming;
use crate::registry::ModuleRegistry;
use crate::GenSettings;

/// Counters describing the work a generator has done.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GenStats {
    /// Descriptor parses.
    pub parses: u64,
    pub wrappers_generated: u64,
    pub friendly_generated: u64,
    /// Lookups answered by the resident registry.
    pub resident_hits: u64,
    /// Lookups answered by importing from the store.
    pub store_hits: u64,
}

#[derive(Debug, Default)]
struct Counters {
    parses: AtomicU64,
    wrappers_generated: AtomicU64,
    friendly_generated: AtomicU64,
    resident_hits: AtomicU64,
    store_hits: AtomicU64,
}

impl Counters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> GenStats {
        GenStats {
            parses: self.parses.load(Ordering::Relaxed),
            wrappers_generated: self.wrappers_generated.load(Ordering::Relaxed),
            friendly_generated: self.friendly_generated.load(Ordering::Relaxed),
            resident_hits: self.resident_hits.load(Ordering::Relaxed),
            store_hits: self.store_hits.load(Ordering::Relaxed),
        }
    }
}

/// Canonical names of a library, without generating anything.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LibraryNames {
    pub identity: LibraryIdentity,
    pub declared_name: Option<String>,
    pub wrapper: ModuleName,
    pub friendly: Option<ModuleName>,
    pub source_path: Option<PathBuf>,
}

/// Where generated modules go.
enum StoreSource {
    /// A generation directory, opened at the start of each request.
    /// `None` selects in-memory mode.
    Configured(Option<PathBuf>),
    /// A caller-provided store, used as is.
    Provided(Arc<dyn ModuleStore>),
}

/// Generates, caches and imports type-library modules.
pub struct ModuleGenerator {
    modules: Arc<ModuleRegistry>,
    registry: Arc<dyn Registry>,
    loader: Arc<dyn TypeLibLoader>,
    parser: Arc<dyn DescriptorParser>,
    codegen: CodeGenerator,
    source: RwLock<StoreSource>,
    /// Backs in-memory mode and the fallback from an unusable directory.
    memory: Arc<InMemoryStore>,
    counters: Counters,
}

impl ModuleGenerator {
    pub fn new(
        registry: Arc<dyn Registry>,
        loader: Arc<dyn TypeLibLoader>,
        settings: &GenSettings,
    ) -> Self {
        ModuleGenerator {
            modules: Arc::new(ModuleRegistry::new()),
            registry,
            loader,
            parser: Arc::new(EntryParser),
            codegen: CodeGenerator::default(),
            source: RwLock::new(StoreSource::Configured(settings.gen_dir.clone())),
            memory: Arc::new(InMemoryStore::new()),
            counters: Counters::default(),
        }
    }

    pub fn with_parser(mut self, parser: Arc<dyn DescriptorParser>) -> Self {
        self.parser = parser;
        self
    }

    pub fn with_codegen(mut self, codegen: CodeGenerator) -> Self {
        self.codegen = codegen;
        self
    }

    /// Replaces the generation directory with a caller-provided store.
    pub fn with_store(self, store: Arc<dyn ModuleStore>) -> Self {
        *self.source.write() = StoreSource::Provided(store);
        self
    }

    /// Selects the generation directory; `None` forces in-memory mode.
    ///
    /// Takes effect at the start of the next top-level request.
    pub fn set_gen_dir(&self, gen_dir: Option<PathBuf>) {
        *self.source.write() = StoreSource::Configured(gen_dir);
    }

    /// Directory the next request generates into, `None` when it would
    /// generate in memory.
    pub fn gen_dir(&self) -> Option<PathBuf> {
        self.store().location().map(Path::to_path_buf)
    }

    /// Opens the store the next request would use.
    ///
    /// A configured directory that cannot be opened falls back to the
    /// in-memory store; it is retried on every call.
    pub fn store(&self) -> Arc<dyn ModuleStore> {
        let dir = match &*self.source.read() {
            StoreSource::Provided(store) => return Arc::clone(store),
            StoreSource::Configured(None) => return self.memory.clone(),
            StoreSource::Configured(Some(dir)) => dir.clone(),
        };
        match FileStore::open(&dir) {
            Ok(store) => {
                debug!("using generation directory {}", dir.display());
                Arc::new(store)
            }
            Err(e) => {
                warn!("{}; generating in memory instead", e);
                self.memory.clone()
            }
        }
    }

    pub fn modules(&self) -> &Arc<ModuleRegistry> {
        &self.modules
    }

    pub fn stats(&self) -> GenStats {
        self.counters.snapshot()
    }

    /// Returns the friendly module for `reference`, or the wrapper module
    /// when the library has no usable friendly name.
    pub fn get_module(
        &self,
        reference: &LibraryReference,
    ) -> Result<Arc<GeneratedModule>, GetModuleError> {
        self.get_module_relative_to(reference, None)
    }

    /// Like [`get_module`](Self::get_module), resolving relative paths
    /// against `base_dir` first.
    pub fn get_module_relative_to(
        &self,
        reference: &LibraryReference,
        base_dir: Option<&Path>,
    ) -> Result<Arc<GeneratedModule>, GetModuleError> {
        let _generation = self.modules.lock_generation();
        let store = self.store();

        let (handle, source_path) = self.load(reference, base_dir)?;
        let identity = handle.identity();
        let (wrapper, externals) =
            self.ensure_wrapper(&handle, source_path.as_deref(), store.as_ref())?;
        if !externals.is_empty() {
            self.chase_externals(identity, externals, store.as_ref());
        }
        self.ensure_friendly(&handle, &wrapper, store.as_ref())
    }

    /// Resolves and loads `reference` and reports its canonical names.
    pub fn names(
        &self,
        reference: &LibraryReference,
        base_dir: Option<&Path>,
    ) -> Result<LibraryNames, GetModuleError> {
        let (handle, source_path) = self.load(reference, base_dir)?;
        let identity = handle.identity();
        Ok(LibraryNames {
            identity,
            declared_name: handle.declared_name().map(str::to_string),
            wrapper: naming::wrapper_module_name(&identity),
            friendly: naming::friendly_module_name(handle.declared_name())?,
            source_path,
        })
    }

    /// Resolves and loads a designator, recovering the best source path.
    fn load(
        &self,
        reference: &LibraryReference,
        base_dir: Option<&Path>,
    ) -> Result<(TypeLibraryHandle, Option<PathBuf>), GetModuleError> {
        let resolution = resolve(reference, base_dir, self.registry.as_ref())?;
        debug!("resolved designator to {}", resolution.reference);
        let handle = self.loader.load(&resolution.reference)?;

        let source_path = match resolution.reference {
            NormalizedRef::Path(path) if resolution.is_absolute => Some(path),
            _ => handle
                .source_path()
                .map(Path::to_path_buf)
                .or(resolution.designator_path),
        };
        Ok((handle, source_path))
    }

    fn ensure_wrapper(
        &self,
        handle: &TypeLibraryHandle,
        source_path: Option<&Path>,
        store: &dyn ModuleStore,
    ) -> Result<(Arc<GeneratedModule>, BTreeSet<LibraryIdentity>), GetModuleError> {
        let identity = handle.identity();
        let name = naming::wrapper_module_name(&identity);
        if let Some(module) = self.lookup(&name, store, |_| true) {
            return Ok((module, BTreeSet::new()));
        }

        let items = self.parser.parse(handle)?;
        Counters::bump(&self.counters.parses);

        info!("Generating {}", name);
        let generated = self.codegen.generate_wrapper(&identity, &items, source_path);
        let module = self.commit(&name, &generated.text, store)?;
        Counters::bump(&self.counters.wrappers_generated);
        Ok((module, generated.externals))
    }

    fn ensure_friendly(
        &self,
        handle: &TypeLibraryHandle,
        wrapper: &Arc<GeneratedModule>,
        store: &dyn ModuleStore,
    ) -> Result<Arc<GeneratedModule>, GetModuleError> {
        let Some(name) = naming::friendly_module_name(handle.declared_name())? else {
            debug!("{} has no friendly name", handle.identity());
            return Ok(Arc::clone(wrapper));
        };

        let code = self.codegen.generate_friendly(&wrapper.name);
        if let Some(module) = self.lookup(&name, store, |m| *m.source_text == *code) {
            return Ok(module);
        }

        info!("Generating {}", name);
        let module = self.commit(&name, &code, store)?;
        Counters::bump(&self.counters.friendly_generated);
        Ok(module)
    }

    fn chase_externals(
        &self,
        root: LibraryIdentity,
        externals: BTreeSet<LibraryIdentity>,
        store: &dyn ModuleStore,
    ) {
        let mut visited = HashSet::from([root]);
        let mut pending: VecDeque<LibraryIdentity> = externals.into_iter().collect();
        while let Some(identity) = pending.pop_front() {
            if !visited.insert(identity) {
                continue;
            }
            match self.generate_external(&identity, store) {
                Ok(more) => pending.extend(more),
                Err(e) => warn!("failed to generate external library {}: {}", identity, e),
            }
        }
    }

    /// Runs the wrapper and friendly steps for one external library and
    /// returns the libraries it depends on in turn.
    fn generate_external(
        &self,
        identity: &LibraryIdentity,
        store: &dyn ModuleStore,
    ) -> Result<BTreeSet<LibraryIdentity>, GetModuleError> {
        debug!("chasing external library {}", identity);
        let (handle, source_path) = self.load(&LibraryReference::exact(identity), None)?;
        let loaded = handle.identity();
        if loaded != *identity {
            return Err(GenerationError::IdentityMismatch {
                requested: *identity,
                loaded,
            }
            .into());
        }
        let (wrapper, externals) = self.ensure_wrapper(&handle, source_path.as_deref(), store)?;
        self.ensure_friendly(&handle, &wrapper, store)?;
        Ok(externals)
    }

    /// Checks the resident registry, then the store. `accept` rejects stale
    /// hits.
    fn lookup(
        &self,
        name: &ModuleName,
        store: &dyn ModuleStore,
        accept: impl Fn(&GeneratedModule) -> bool,
    ) -> Option<Arc<GeneratedModule>> {
        if let Some(module) = self.modules.get(name) {
            if accept(module.as_ref()) {
                debug!("{} is resident", name);
                Counters::bump(&self.counters.resident_hits);
                return Some(module);
            }
            debug!("resident {} is stale", name);
        }

        match store.load(name) {
            StoreLookup::Hit(module) if accept(&module) => {
                debug!("imported {} from {}", name, store.describe());
                Counters::bump(&self.counters.store_hits);
                Some(self.modules.insert(module))
            }
            StoreLookup::Hit(_) => {
                info!("{} in {} is stale; regenerating", name, store.describe());
                None
            }
            StoreLookup::Absent => {
                debug!("{} not in {}", name, store.describe());
                None
            }
            StoreLookup::Invalid { reason } => {
                warn!("cannot import {}: {}; regenerating", name, reason);
                None
            }
        }
    }

    fn commit(
        &self,
        name: &ModuleName,
        text: &str,
        store: &dyn ModuleStore,
    ) -> Result<Arc<GeneratedModule>, StorageError> {
        let module = store.commit(name, text)?;
        Ok(self.modules.insert(module))
    }
}
