//! Mapping from type-library type references to Rust type syntax.
//!
//! [`TypeRenderer`] renders [`TypeRef`]s while recording which known
//! symbols the module has to import and which names resolved to nothing
//! (those get placeholder stubs). Automation base types map as follows:
//!
//! - integers and floats map to the Rust primitive of the same width
//! - `VARIANT_BOOL`, `BSTR`, `VARIANT`, `CY`, `DATE`, `DECIMAL`, strings and
//!   safe arrays map to the runtime's automation types
//! - `IUnknown`, `IDispatch` and `HRESULT` map to the runtime's COM types
//! - references into another library map to `super::<wrapper>::<Name>`
//!
//! Local items are referred to by the identifiers [`LocalNames`] assigned
//! them, which are unique across the whole module.

use std::collections::{BTreeMap, BTreeSet};

use tlbgen_core::items::ParamDirection;
use tlbgen_core::{BuiltinType, ItemMap, LibraryIdentity, ParsedItem, TypeRef};
use tracing::debug;

use crate::naming::{sanitize_ident, wrapper_stem};
use crate::symbols::KnownSymbols;

/// `preferred`, or the first `preferred_N` (N >= 2) not in `taken`.
pub fn next_free(taken: &BTreeSet<String>, preferred: &str) -> String {
    if !taken.contains(preferred) {
        return preferred.to_string();
    }
    let mut n = 2;
    loop {
        let candidate = format!("{}_{}", preferred, n);
        if !taken.contains(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

/// Module-scope identifiers of a library's own items.
///
/// Known symbols are reserved first since the module imports them. Items
/// then claim their sanitized name in declaration order; a later item whose
/// name sanitizes to a taken identifier gets a numeric suffix. Interfaces
/// also claim their `_Vtbl` type.
#[derive(Debug, Clone, Default)]
pub struct LocalNames {
    idents: BTreeMap<String, String>,
    vtbls: BTreeMap<String, String>,
    taken: BTreeSet<String>,
}

impl LocalNames {
    pub fn assign(items: &ItemMap, known: &KnownSymbols) -> Self {
        let mut names = LocalNames {
            taken: known.names().map(str::to_string).collect(),
            ..LocalNames::default()
        };
        for item in items.values() {
            if known.contains(item.name()) {
                continue;
            }
            let ident = names.claim(&sanitize_ident(item.name()));
            if let ParsedItem::Interface { .. } = item {
                let vtbl = names.claim(&format!("{}_Vtbl", ident));
                names.vtbls.insert(item.name().to_string(), vtbl);
            }
            names.idents.insert(item.name().to_string(), ident);
        }
        names
    }

    fn claim(&mut self, preferred: &str) -> String {
        let ident = next_free(&self.taken, preferred);
        if ident != preferred {
            debug!("`{}` is taken; using `{}`", preferred, ident);
        }
        self.taken.insert(ident.clone());
        ident
    }

    /// Identifier of the item declared as `name`.
    pub fn ident(&self, name: &str) -> Option<&str> {
        self.idents.get(name).map(String::as_str)
    }

    /// Vtable identifier of the interface declared as `name`.
    pub fn vtbl(&self, name: &str) -> Option<&str> {
        self.vtbls.get(name).map(String::as_str)
    }

    /// Every identifier claimed so far, known symbols included.
    pub fn taken(&self) -> &BTreeSet<String> {
        &self.taken
    }
}

/// Renders type references for one wrapper module.
pub struct TypeRenderer<'a> {
    own: &'a LibraryIdentity,
    local: &'a ItemMap,
    known: &'a KnownSymbols,
    names: LocalNames,
    used: BTreeSet<String>,
    unresolved: BTreeSet<String>,
}

impl<'a> TypeRenderer<'a> {
    pub fn new(own: &'a LibraryIdentity, local: &'a ItemMap, known: &'a KnownSymbols) -> Self {
        TypeRenderer {
            own,
            local,
            known,
            names: LocalNames::assign(local, known),
            used: BTreeSet::new(),
            unresolved: BTreeSet::new(),
        }
    }

    pub fn names(&self) -> &LocalNames {
        &self.names
    }

    /// Known symbols referenced so far.
    pub fn used(&self) -> &BTreeSet<String> {
        &self.used
    }

    /// Names that are neither local items nor known symbols.
    pub fn unresolved(&self) -> &BTreeSet<String> {
        &self.unresolved
    }

    /// Resolves a bare name: known symbols first, then local items.
    pub fn symbol(&mut self, name: &str) -> String {
        if self.known.contains(name) {
            self.used.insert(name.to_string());
            return name.to_string();
        }
        if let Some(ident) = self.names.ident(name) {
            return ident.to_string();
        }
        let ident = sanitize_ident(name);
        self.unresolved.insert(ident.clone());
        ident
    }

    /// Renders `ty` as a value type.
    pub fn render(&mut self, ty: &TypeRef) -> String {
        match ty {
            TypeRef::Builtin(BuiltinType::Void) => "()".to_string(),
            TypeRef::Builtin(builtin) => self.builtin(*builtin),
            TypeRef::Pointer(inner) => match inner.as_ref() {
                TypeRef::Builtin(BuiltinType::Void) => format!("*mut {}", self.symbol("c_void")),
                inner => format!("*mut {}", self.render(inner)),
            },
            TypeRef::Array { element, length } => {
                format!("[{}; {}]", self.render(element), length)
            }
            TypeRef::SafeArray(_) => format!("*mut {}", self.symbol("SAFEARRAY")),
            TypeRef::Named(name) => self.symbol(name),
            TypeRef::External { library, name } => {
                if library == self.own {
                    self.symbol(name)
                } else {
                    format!("super::{}::{}", wrapper_stem(library), sanitize_ident(name))
                }
            }
            TypeRef::Unsupported(_) => format!("*mut {}", self.symbol("c_void")),
        }
    }

    /// Renders a method parameter type; out and in/out params are pointers.
    pub fn param(&mut self, ty: &TypeRef, direction: ParamDirection) -> String {
        let rendered = self.render(ty);
        match direction {
            ParamDirection::In => rendered,
            ParamDirection::Out | ParamDirection::InOut => format!("*mut {}", rendered),
        }
    }

    /// Vtable type of an interface's base; `IUnknown_Vtbl` when absent.
    pub fn base_vtbl(&mut self, base: Option<&TypeRef>) -> String {
        match base {
            None | Some(TypeRef::Builtin(BuiltinType::Unknown)) => self.symbol("IUnknown_Vtbl"),
            Some(TypeRef::Builtin(BuiltinType::Dispatch)) => self.symbol("IDispatch_Vtbl"),
            Some(TypeRef::Named(name)) => self.vtbl_symbol(name),
            Some(TypeRef::External { library, name }) if library == self.own => {
                self.vtbl_symbol(name)
            }
            Some(TypeRef::External { library, name }) => format!(
                "super::{}::{}_Vtbl",
                wrapper_stem(library),
                sanitize_ident(name)
            ),
            Some(_) => self.symbol("IUnknown_Vtbl"),
        }
    }

    fn vtbl_symbol(&mut self, interface: &str) -> String {
        let vtbl = format!("{}_Vtbl", interface);
        if self.known.contains(&vtbl) {
            self.used.insert(vtbl.clone());
            return vtbl;
        }
        if let Some(ident) = self.names.vtbl(interface) {
            return ident.to_string();
        }
        match self.local.get(interface) {
            Some(ParsedItem::DispInterface { .. }) => self.symbol("IDispatch_Vtbl"),
            Some(other) => {
                debug!("base `{}` is not an interface; using IUnknown", other.name());
                self.symbol("IUnknown_Vtbl")
            }
            None => {
                let ident = format!("{}_Vtbl", sanitize_ident(interface));
                self.unresolved.insert(ident.clone());
                ident
            }
        }
    }

    fn builtin(&mut self, builtin: BuiltinType) -> String {
        let primitive = match builtin {
            BuiltinType::I1 => "i8",
            BuiltinType::I2 => "i16",
            BuiltinType::I4 | BuiltinType::Int | BuiltinType::Error => "i32",
            BuiltinType::I8 => "i64",
            BuiltinType::Ui1 => "u8",
            BuiltinType::Ui2 => "u16",
            BuiltinType::Ui4 | BuiltinType::Uint => "u32",
            BuiltinType::Ui8 => "u64",
            BuiltinType::R4 => "f32",
            BuiltinType::R8 => "f64",
            BuiltinType::Void => "()",
            BuiltinType::Bool => return self.symbol("VARIANT_BOOL"),
            BuiltinType::Cy => return self.symbol("CY"),
            BuiltinType::Date => return self.symbol("DATE"),
            BuiltinType::Bstr => return self.symbol("BSTR"),
            BuiltinType::Variant => return self.symbol("VARIANT"),
            BuiltinType::Decimal => return self.symbol("DECIMAL"),
            BuiltinType::Hresult => return self.symbol("HRESULT"),
            BuiltinType::Unknown => return self.symbol("IUnknown"),
            BuiltinType::Dispatch => return self.symbol("IDispatch"),
            BuiltinType::Lpstr => return self.symbol("PSTR"),
            BuiltinType::Lpwstr => return self.symbol("PWSTR"),
        };
        primitive.to_string()
    }
}
