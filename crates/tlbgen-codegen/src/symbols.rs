//! The known-symbol table.
//!
//! Maps a symbol name to the module that already defines it. The code
//! generator never re-declares a known symbol; it imports it from its
//! owning module instead. The default table covers the runtime support
//! types every wrapper relies on.

use std::collections::{BTreeMap, BTreeSet};

/// Module providing the COM base types.
pub const RUNTIME_MODULE: &str = "tlbgen_runtime";
/// Module providing the automation data types.
pub const AUTOMATION_MODULE: &str = "tlbgen_runtime::automation";

const RUNTIME_SYMBOLS: &[&str] = &[
    "GUID",
    "HRESULT",
    "IUnknown",
    "IUnknown_Vtbl",
    "IDispatch",
    "IDispatch_Vtbl",
];

const AUTOMATION_SYMBOLS: &[&str] = &[
    "BSTR",
    "VARIANT",
    "VARIANT_BOOL",
    "CY",
    "DATE",
    "DECIMAL",
    "SAFEARRAY",
    "PSTR",
    "PWSTR",
];

const FFI_SYMBOLS: &[&str] = &["c_void", "c_char"];

/// Symbol name -> qualified owning module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KnownSymbols {
    symbols: BTreeMap<String, String>,
}

impl KnownSymbols {
    /// An empty table.
    pub fn empty() -> Self {
        KnownSymbols {
            symbols: BTreeMap::new(),
        }
    }

    /// Adds or replaces one symbol.
    pub fn insert(&mut self, name: impl Into<String>, module: impl Into<String>) -> &mut Self {
        self.symbols.insert(name.into(), module.into());
        self
    }

    pub fn module_of(&self, name: &str) -> Option<&str> {
        self.symbols.get(name).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.symbols.contains_key(name)
    }

    /// All symbol names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.symbols.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Groups `used` symbols by owning module; unknown names are skipped.
    pub fn imports<'a>(
        &self,
        used: impl IntoIterator<Item = &'a str>,
    ) -> BTreeMap<&str, BTreeSet<&str>> {
        let mut imports: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
        for name in used {
            if let Some((name, module)) = self.symbols.get_key_value(name) {
                imports
                    .entry(module.as_str())
                    .or_default()
                    .insert(name.as_str());
            }
        }
        imports
    }
}

impl Default for KnownSymbols {
    fn default() -> Self {
        let mut table = KnownSymbols::empty();
        for name in RUNTIME_SYMBOLS {
            table.insert(*name, RUNTIME_MODULE);
        }
        for name in AUTOMATION_SYMBOLS {
            table.insert(*name, AUTOMATION_MODULE);
        }
        for name in FFI_SYMBOLS {
            table.insert(*name, "core::ffi");
        }
        table
    }
}

/// Later entries override earlier ones.
impl<K: Into<String>, M: Into<String>> Extend<(K, M)> for KnownSymbols {
    fn extend<I: IntoIterator<Item = (K, M)>>(&mut self, iter: I) {
        for (name, module) in iter {
            self.insert(name, module);
        }
    }
}
