//! Parsed type-library items.
//!
//! [`ParsedItem`] is the structured view of one declaration in a type
//! library. Items are kept in an [`ItemMap`] whose insertion order is the
//! declaration order in the library; generated code follows that order.
//!
//! Type references that point into another library are
//! [`TypeRef::External`]; [`externals`] collects the set of libraries a
//! parsed library depends on.

use std::collections::BTreeSet;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::guid::Guid;
use crate::identity::LibraryIdentity;

/// Item name -> item, in declaration order.
pub type ItemMap = IndexMap<String, ParsedItem>;

/// Automation base types (the `VT_*` family) a type reference can name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuiltinType {
    Bool,
    I1,
    I2,
    I4,
    I8,
    Ui1,
    Ui2,
    Ui4,
    Ui8,
    Int,
    Uint,
    R4,
    R8,
    Cy,
    Date,
    Bstr,
    Variant,
    Decimal,
    Error,
    Hresult,
    Void,
    Unknown,
    Dispatch,
    Lpstr,
    Lpwstr,
}

/// A reference to a type from inside an item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeRef {
    Builtin(BuiltinType),
    Pointer(Box<TypeRef>),
    Array { element: Box<TypeRef>, length: u32 },
    SafeArray(Box<TypeRef>),
    /// A type declared in the same library (or a known runtime symbol).
    Named(String),
    /// A type declared in another library.
    External {
        library: LibraryIdentity,
        name: String,
    },
    /// A shape the parser could not express; rendered as a placeholder.
    Unsupported(String),
}

impl TypeRef {
    /// Calls `f` for every external reference reachable from this type.
    pub fn visit_externals(&self, f: &mut impl FnMut(&LibraryIdentity)) {
        match self {
            TypeRef::External { library, .. } => f(library),
            TypeRef::Pointer(inner) | TypeRef::SafeArray(inner) => inner.visit_externals(f),
            TypeRef::Array { element, .. } => element.visit_externals(f),
            TypeRef::Builtin(_) | TypeRef::Named(_) | TypeRef::Unsupported(_) => {}
        }
    }
}

/// How a method is invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvokeKind {
    #[default]
    Func,
    PropGet,
    PropPut,
    PropPutRef,
}

/// Parameter passing direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamDirection {
    #[default]
    In,
    Out,
    InOut,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Param {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: TypeRef,
    #[serde(default)]
    pub direction: ParamDirection,
    #[serde(default)]
    pub optional: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Method {
    pub name: String,
    #[serde(default)]
    pub kind: InvokeKind,
    /// Member id (DISPID) when the library declares one.
    #[serde(default)]
    pub memid: Option<i32>,
    #[serde(default)]
    pub params: Vec<Param>,
    /// `[retval]` type; `Void` when the method returns only an HRESULT.
    #[serde(default = "void_type")]
    pub returns: TypeRef,
}

fn void_type() -> TypeRef {
    TypeRef::Builtin(BuiltinType::Void)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: TypeRef,
}

/// An interface implemented by a coclass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImplementedInterface {
    pub interface: TypeRef,
    #[serde(default)]
    pub default: bool,
    /// Outgoing (event) interface.
    #[serde(default)]
    pub source: bool,
}

/// A literal value in a module constant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstValue {
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Constant {
    pub name: String,
    pub value: ConstValue,
}

/// One declaration in a type library.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ParsedItem {
    Interface {
        name: String,
        #[serde(default)]
        iid: Option<Guid>,
        #[serde(default)]
        base: Option<TypeRef>,
        #[serde(default)]
        methods: Vec<Method>,
    },
    DispInterface {
        name: String,
        #[serde(default)]
        iid: Option<Guid>,
        #[serde(default)]
        methods: Vec<Method>,
    },
    CoClass {
        name: String,
        #[serde(default)]
        clsid: Option<Guid>,
        #[serde(default)]
        implemented_interfaces: Vec<ImplementedInterface>,
    },
    Enum {
        name: String,
        #[serde(default)]
        members: Vec<(String, i64)>,
    },
    Struct {
        name: String,
        #[serde(default)]
        fields: Vec<Field>,
    },
    Alias {
        name: String,
        target_type: TypeRef,
    },
    Module {
        name: String,
        #[serde(default)]
        constants: Vec<Constant>,
    },
    /// A declaration the parser does not support; generated as a stub.
    Opaque { name: String, construct: String },
}

impl ParsedItem {
    pub fn name(&self) -> &str {
        match self {
            ParsedItem::Interface { name, .. }
            | ParsedItem::DispInterface { name, .. }
            | ParsedItem::CoClass { name, .. }
            | ParsedItem::Enum { name, .. }
            | ParsedItem::Struct { name, .. }
            | ParsedItem::Alias { name, .. }
            | ParsedItem::Module { name, .. }
            | ParsedItem::Opaque { name, .. } => name,
        }
    }

    /// Every type reference directly held by this item.
    pub fn type_refs(&self) -> Vec<&TypeRef> {
        let mut refs = Vec::new();
        match self {
            ParsedItem::Interface { base, methods, .. } => {
                if let Some(base) = base {
                    refs.push(base);
                }
                method_type_refs(methods, &mut refs);
            }
            ParsedItem::DispInterface { methods, .. } => method_type_refs(methods, &mut refs),
            ParsedItem::CoClass {
                implemented_interfaces,
                ..
            } => refs.extend(implemented_interfaces.iter().map(|i| &i.interface)),
            ParsedItem::Struct { fields, .. } => refs.extend(fields.iter().map(|f| &f.ty)),
            ParsedItem::Alias { target_type, .. } => refs.push(target_type),
            ParsedItem::Enum { .. } | ParsedItem::Module { .. } | ParsedItem::Opaque { .. } => {}
        }
        refs
    }
}

fn method_type_refs<'a>(methods: &'a [Method], refs: &mut Vec<&'a TypeRef>) {
    for method in methods {
        refs.extend(method.params.iter().map(|p| &p.ty));
        refs.push(&method.returns);
    }
}

/// The libraries referenced by `items`, excluding `own`.
///
/// A library is never its own external: self-references are resolved
/// locally by the generator.
pub fn externals(items: &ItemMap, own: &LibraryIdentity) -> BTreeSet<LibraryIdentity> {
    let mut found = BTreeSet::new();
    for item in items.values() {
        for ty in item.type_refs() {
            ty.visit_externals(&mut |library| {
                if library != own {
                    found.insert(*library);
                }
            });
        }
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lib(n: u128) -> LibraryIdentity {
        LibraryIdentity::new(Guid::from_u128(n), 1, 0, 0)
    }

    fn external(n: u128, name: &str) -> TypeRef {
        TypeRef::External {
            library: lib(n),
            name: name.into(),
        }
    }

    #[test]
    fn externals_collects_nested_references() {
        let mut items = ItemMap::new();
        items.insert(
            "Point".into(),
            ParsedItem::Struct {
                name: "Point".into(),
                fields: vec![Field {
                    name: "owner".into(),
                    ty: TypeRef::Pointer(Box::new(external(2, "IOwner"))),
                }],
            },
        );
        items.insert(
            "Grid".into(),
            ParsedItem::Alias {
                name: "Grid".into(),
                target_type: TypeRef::SafeArray(Box::new(TypeRef::Array {
                    element: Box::new(external(3, "Cell")),
                    length: 4,
                })),
            },
        );

        let found = externals(&items, &lib(1));
        assert_eq!(found.into_iter().collect::<Vec<_>>(), vec![lib(2), lib(3)]);
    }

    #[test]
    fn externals_skips_own_library() {
        let mut items = ItemMap::new();
        items.insert(
            "Self".into(),
            ParsedItem::Alias {
                name: "Self".into(),
                target_type: external(1, "Other"),
            },
        );
        assert!(externals(&items, &lib(1)).is_empty());
    }

    #[test]
    fn externals_deduplicates() {
        let mut items = ItemMap::new();
        for name in ["A", "B"] {
            items.insert(
                name.into(),
                ParsedItem::Alias {
                    name: name.into(),
                    target_type: external(5, "Shared"),
                },
            );
        }
        assert_eq!(externals(&items, &lib(1)).len(), 1);
    }

    #[test]
    fn method_types_are_visited() {
        let item = ParsedItem::Interface {
            name: "IThing".into(),
            iid: None,
            base: Some(external(7, "IBase")),
            methods: vec![Method {
                name: "Get".into(),
                kind: InvokeKind::PropGet,
                memid: Some(1),
                params: vec![Param {
                    name: "index".into(),
                    ty: TypeRef::Builtin(BuiltinType::I4),
                    direction: ParamDirection::In,
                    optional: false,
                }],
                returns: external(8, "Value"),
            }],
        };
        let mut items = ItemMap::new();
        items.insert("IThing".into(), item);
        let found: Vec<_> = externals(&items, &lib(1)).into_iter().collect();
        assert_eq!(found, vec![lib(7), lib(8)]);
    }

    #[test]
    fn item_deserializes_from_tagged_json() {
        let json = r#"{"kind":"enum","name":"Color","members":[["Red",0],["Blue",2]]}"#;
        let item: ParsedItem = serde_json::from_str(json).unwrap();
        assert_eq!(item.name(), "Color");
        match item {
            ParsedItem::Enum { members, .. } => assert_eq!(members[1], ("Blue".into(), 2)),
            other => panic!("unexpected item: {:?}", other),
        }
    }
}
