//! The code generator: parsed items -> Rust module source.
//!
//! [`CodeGenerator::generate_wrapper`] is a pure function of the library
//! identity, its items, the known-symbol table and the source path, so the
//! same inputs always produce byte-identical text. Items are emitted in
//! declaration order. An item the generator cannot express becomes an
//! opaque placeholder type; one exotic item never fails a whole module.
//!
//! [`CodeGenerator::generate_friendly`] emits the alias module, a single
//! glob re-export of the wrapper.

use std::collections::BTreeSet;
use std::path::Path;

use tlbgen_core::items::{ConstValue, Constant, ImplementedInterface, InvokeKind, Method};
use tlbgen_core::{externals, Guid, ItemMap, LibraryIdentity, ParsedItem, TypeRef};
use tlbgen_storage::ModuleName;
use tracing::debug;

use crate::naming::sanitize_ident;
use crate::symbols::KnownSymbols;
use crate::types::{next_free, TypeRenderer};

const LINT_ALLOWS: &str =
    "#![allow(non_camel_case_types, non_snake_case, non_upper_case_globals, dead_code)]";

/// Output of [`CodeGenerator::generate_wrapper`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedSource {
    pub text: String,
    /// Other libraries the generated code refers to.
    pub externals: BTreeSet<LibraryIdentity>,
}

/// Generates wrapper and friendly module source.
#[derive(Debug, Clone, Default)]
pub struct CodeGenerator {
    known: KnownSymbols,
}

/// Line-oriented source buffer.
#[derive(Default)]
struct Emitter {
    out: String,
    indent: usize,
}

impl Emitter {
    fn line(&mut self, text: &str) {
        if !text.is_empty() {
            for _ in 0..self.indent {
                self.out.push_str("    ");
            }
            self.out.push_str(text);
        }
        self.out.push('\n');
    }

    fn blank(&mut self) {
        self.out.push('\n');
    }

    fn open(&mut self, text: &str) {
        self.line(text);
        self.indent += 1;
    }

    fn close(&mut self) {
        self.indent = self.indent.saturating_sub(1);
        self.line("}");
    }
}

impl CodeGenerator {
    pub fn new(known: KnownSymbols) -> Self {
        CodeGenerator { known }
    }

    /// Generates the wrapper module for one library.
    pub fn generate_wrapper(
        &self,
        identity: &LibraryIdentity,
        items: &ItemMap,
        source_path: Option<&Path>,
    ) -> GeneratedSource {
        let types = TypeRenderer::new(identity, items, &self.known);
        let mut ctx = WrapperContext {
            taken: types.names().taken().clone(),
            aliases: BTreeSet::new(),
            types,
            body: Emitter::default(),
        };

        for item in items.values() {
            if let Some(module) = self.known.module_of(item.name()) {
                ctx.body
                    .line(&format!("// `{}` is provided by {}.", item.name(), module));
                ctx.body.blank();
                continue;
            }
            ctx.item(item);
            ctx.body.blank();
        }

        let placeholders: Vec<String> = ctx
            .types
            .unresolved()
            .iter()
            .filter(|name| !ctx.defines_type(name))
            .cloned()
            .collect();
        for name in &placeholders {
            debug!("no declaration for `{}`; emitting a placeholder", name);
            ctx.body
                .line(&format!("/// Placeholder for unresolved type `{}`.", name));
            opaque_struct(&mut ctx.body, name);
            ctx.body.blank();
        }

        let mut out = Emitter::default();
        out.line(&format!("//! Wrapper module for type library {}.", identity));
        out.line("//!");
        match source_path {
            Some(path) => out.line(&format!("//! Source: {}", path.display())),
            None => out.line("//! Source: <no file>"),
        }
        out.line(LINT_ALLOWS);
        out.blank();

        let imports = self.known.imports(ctx.types.used().iter().map(String::as_str));
        for (module, names) in &imports {
            let names: Vec<&str> = names.iter().copied().collect();
            if let [single] = names.as_slice() {
                out.line(&format!("use {}::{};", module, single));
            } else {
                out.line(&format!("use {}::{{{}}};", module, names.join(", ")));
            }
        }
        if !imports.is_empty() {
            out.blank();
        }

        let mut text = out.out;
        text.push_str(&ctx.body.out);
        // Exactly one trailing newline.
        while text.ends_with("\n\n") {
            text.pop();
        }

        GeneratedSource {
            text,
            externals: externals(items, identity),
        }
    }

    /// Generates the friendly module that re-exports `wrapper`.
    pub fn generate_friendly(&self, wrapper: &ModuleName) -> String {
        format!(
            "//! Friendly alias for `{}`.\npub use super::{}::*;\n",
            wrapper,
            wrapper.stem()
        )
    }
}

/// Per-module generation state.
struct WrapperContext<'a> {
    types: TypeRenderer<'a>,
    /// Every module-scope identifier in either namespace.
    taken: BTreeSet<String>,
    /// Type aliases derived from coclasses.
    aliases: BTreeSet<String>,
    body: Emitter,
}

impl WrapperContext<'_> {
    fn ident(&self, name: &str) -> String {
        self.types
            .names()
            .ident(name)
            .map_or_else(|| sanitize_ident(name), str::to_string)
    }

    /// Whether the module declares or imports a type called `ident`.
    fn defines_type(&self, ident: &str) -> bool {
        self.types.names().taken().contains(ident) || self.aliases.contains(ident)
    }

    fn item(&mut self, item: &ParsedItem) {
        match item {
            ParsedItem::Interface {
                name,
                iid,
                base,
                methods,
            } => self.interface(name, iid.as_ref(), base.as_ref(), methods),
            ParsedItem::DispInterface { name, iid, methods } => {
                self.dispinterface(name, iid.as_ref(), methods)
            }
            ParsedItem::CoClass {
                name,
                clsid,
                implemented_interfaces,
            } => self.coclass(name, clsid.as_ref(), implemented_interfaces),
            ParsedItem::Enum { name, members } => self.enumeration(name, members),
            ParsedItem::Struct { name, fields } => {
                let ident = self.ident(name);
                self.body.line("#[repr(C)]");
                self.body.open(&format!("pub struct {} {{", ident));
                let mut seen = BTreeSet::new();
                for field in fields {
                    let field_ident = sanitize_ident(&field.name);
                    if !seen.insert(field_ident.clone()) {
                        continue;
                    }
                    let ty = self.types.render(&field.ty);
                    self.body.line(&format!("pub {}: {},", field_ident, ty));
                }
                self.body.close();
            }
            ParsedItem::Alias { name, target_type } => {
                let ty = self.types.render(target_type);
                let ident = self.ident(name);
                self.body.line(&format!("pub type {} = {};", ident, ty));
            }
            ParsedItem::Module { name, constants } => self.constant_module(name, constants),
            ParsedItem::Opaque { name, construct } => {
                self.body
                    .line(&format!("/// Unsupported `{}` declaration.", construct));
                let ident = self.ident(name);
                opaque_struct(&mut self.body, &ident);
            }
        }
    }

    /// Reserves a module-scope name. A taken name is prefixed with its
    /// owner's identifier, then numbered until free.
    fn reserve(&mut self, preferred: String, owner: &str) -> String {
        let name = if self.taken.contains(&preferred) {
            next_free(&self.taken, &format!("{}_{}", owner, preferred))
        } else {
            preferred
        };
        self.taken.insert(name.clone());
        name
    }

    fn guid_const(&mut self, prefix: &str, ident: &str, guid: Option<&Guid>) {
        let Some(guid) = guid else {
            return;
        };
        let guid_ty = self.types.symbol("GUID");
        let name = self.reserve(format!("{}_{}", prefix, ident), ident);
        self.body.line(&format!(
            "pub const {}: {} = {}::from_u128(0x{});",
            name,
            guid_ty,
            guid_ty,
            guid.0.hyphenated().to_string().replace('-', "_")
        ));
    }

    fn interface(
        &mut self,
        name: &str,
        iid: Option<&Guid>,
        base: Option<&TypeRef>,
        methods: &[Method],
    ) {
        let ident = self.ident(name);
        let vtbl = self
            .types
            .names()
            .vtbl(name)
            .map_or_else(|| format!("{}_Vtbl", ident), str::to_string);
        let c_void = self.types.symbol("c_void");
        self.body.line(&format!("/// Interface `{}`.", name));
        self.body.line("#[repr(transparent)]");
        self.body
            .line(&format!("pub struct {}(pub *mut {});", ident, c_void));
        self.guid_const("IID", &ident, iid);

        let base_vtbl = self.types.base_vtbl(base);
        let hresult = self.types.symbol("HRESULT");
        self.body.line("#[repr(C)]");
        self.body.open(&format!("pub struct {} {{", vtbl));
        self.body.line(&format!("pub base__: {},", base_vtbl));
        let mut seen = BTreeSet::new();
        for method in methods {
            let slot = next_free(&seen, &method_slot_name(method));
            seen.insert(slot.clone());

            let mut params = vec![format!("this: *mut {}", c_void)];
            for (index, param) in method.params.iter().enumerate() {
                let param_ident = match sanitize_ident(&param.name).as_str() {
                    "_" => format!("arg{}", index),
                    "this" => "this_".to_string(),
                    other => other.to_string(),
                };
                let ty = self.types.param(&param.ty, param.direction);
                params.push(format!("{}: {}", param_ident, ty));
            }
            if !is_void(&method.returns) {
                let ty = self.types.render(&method.returns);
                params.push(format!("result__: *mut {}", ty));
            }
            self.body.line(&format!(
                "pub {}: unsafe extern \"system\" fn({}) -> {},",
                slot,
                params.join(", "),
                hresult
            ));
        }
        self.body.close();
    }

    fn dispinterface(&mut self, name: &str, iid: Option<&Guid>, methods: &[Method]) {
        let ident = self.ident(name);
        let dispatch = self.types.symbol("IDispatch");
        self.body.line(&format!("/// Dispatch interface `{}`.", name));
        self.body.line("#[repr(transparent)]");
        self.body
            .line(&format!("pub struct {}(pub {});", ident, dispatch));
        self.guid_const("IID", &ident, iid);

        let mut seen = BTreeSet::new();
        let dispids: Vec<(String, i32)> = methods
            .iter()
            .filter_map(|m| Some((sanitize_ident(&m.name), m.memid?)))
            .filter(|(name, _)| seen.insert(name.clone()))
            .collect();
        if dispids.is_empty() {
            return;
        }
        self.body.open(&format!("impl {} {{", ident));
        for (member, memid) in dispids {
            self.body
                .line(&format!("pub const DISPID_{}: i32 = {};", member, memid));
        }
        self.body.close();
    }

    fn coclass(&mut self, name: &str, clsid: Option<&Guid>, interfaces: &[ImplementedInterface]) {
        let ident = self.ident(name);
        self.body.line(&format!("/// Coclass `{}`.", name));
        self.guid_const("CLSID", &ident, clsid);
        self.body.line(&format!("pub struct {};", ident));

        if !interfaces.is_empty() {
            let labels: Vec<String> = interfaces
                .iter()
                .map(|i| format!("{:?}", interface_label(&i.interface)))
                .collect();
            self.body.open(&format!("impl {} {{", ident));
            self.body.line(&format!(
                "pub const INTERFACES: &'static [&'static str] = &[{}];",
                labels.join(", ")
            ));
            self.body.close();
        }

        let default = interfaces
            .iter()
            .find(|i| i.default && !i.source)
            .or_else(|| interfaces.iter().find(|i| !i.source));
        let source = interfaces
            .iter()
            .find(|i| i.default && i.source)
            .or_else(|| interfaces.iter().find(|i| i.source));
        for (suffix, chosen) in [("Default", default), ("Source", source)] {
            if let Some(chosen) = chosen {
                let ty = self.types.render(&chosen.interface);
                let alias = self.reserve(format!("{}_{}", ident, suffix), &ident);
                self.aliases.insert(alias.clone());
                self.body.line(&format!("pub type {} = {};", alias, ty));
            }
        }
    }

    fn enumeration(&mut self, name: &str, members: &[(String, i64)]) {
        let ident = self.ident(name);
        let repr = if members
            .iter()
            .all(|(_, v)| i32::try_from(*v).is_ok())
        {
            "i32"
        } else {
            "i64"
        };
        self.body.line(&format!("/// Enumeration `{}`.", name));
        self.body.line(&format!("pub type {} = {};", ident, repr));
        for (member, value) in members {
            let const_ident = self.reserve(sanitize_ident(member), &ident);
            self.body
                .line(&format!("pub const {}: {} = {};", const_ident, ident, value));
        }
    }

    fn constant_module(&mut self, name: &str, constants: &[Constant]) {
        let ident = self.ident(name);
        self.body.open(&format!("pub mod {} {{", ident));
        let mut seen = BTreeSet::new();
        for constant in constants {
            let ident = sanitize_ident(&constant.name);
            if !seen.insert(ident.clone()) {
                continue;
            }
            let (ty, value) = const_literal(&constant.value);
            self.body
                .line(&format!("pub const {}: {} = {};", ident, ty, value));
        }
        self.body.close();
    }
}

fn opaque_struct(out: &mut Emitter, ident: &str) {
    out.line("#[repr(C)]");
    out.open(&format!("pub struct {} {{", ident));
    out.line("_opaque: [u8; 0],");
    out.close();
}

fn is_void(ty: &TypeRef) -> bool {
    matches!(ty, TypeRef::Builtin(tlbgen_core::BuiltinType::Void))
}

fn method_slot_name(method: &Method) -> String {
    let ident = sanitize_ident(&method.name);
    match method.kind {
        InvokeKind::Func => ident,
        InvokeKind::PropGet => format!("get_{}", ident),
        InvokeKind::PropPut => format!("put_{}", ident),
        InvokeKind::PropPutRef => format!("putref_{}", ident),
    }
}

fn interface_label(ty: &TypeRef) -> String {
    match ty {
        TypeRef::Named(name) | TypeRef::External { name, .. } => name.clone(),
        TypeRef::Builtin(builtin) => format!("{:?}", builtin),
        other => format!("{:?}", other),
    }
}

fn const_literal(value: &ConstValue) -> (&'static str, String) {
    match value {
        ConstValue::Int(v) if i32::try_from(*v).is_ok() => ("i32", v.to_string()),
        ConstValue::Int(v) => ("i64", v.to_string()),
        ConstValue::Float(v) if v.is_nan() => ("f64", "f64::NAN".to_string()),
        ConstValue::Float(v) if v.is_infinite() && *v > 0.0 => {
            ("f64", "f64::INFINITY".to_string())
        }
        ConstValue::Float(v) if v.is_infinite() => ("f64", "f64::NEG_INFINITY".to_string()),
        ConstValue::Float(v) => ("f64", format!("{:?}", v)),
        ConstValue::Str(s) => ("&str", format!("{:?}", s)),
        ConstValue::Bool(b) => ("bool", b.to_string()),
    }
}
