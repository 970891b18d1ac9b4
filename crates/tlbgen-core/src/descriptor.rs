//! On-disk type-library descriptors.
//!
//! A [`TypeLibDescriptor`] is the structured form the external loader
//! produces for one type library: its identity attributes, optional human
//! name and documentation, and the raw declaration entries. Entries are kept
//! as untyped JSON so that the parser can degrade one exotic entry without
//! rejecting the whole library.

use serde::{Deserialize, Serialize};

use crate::guid::Guid;
use crate::identity::LibraryIdentity;

/// The structured descriptor of a single type library.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypeLibDescriptor {
    pub libid: Guid,
    pub major: u16,
    pub minor: u16,
    #[serde(default)]
    pub lcid: u32,
    /// Human-readable library name, e.g. `UIAutomationClient`.
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub doc: Option<String>,
    /// Declaration entries in declaration order.
    #[serde(default)]
    pub items: Vec<serde_json::Value>,
}

impl TypeLibDescriptor {
    /// An empty descriptor for the given identity.
    pub fn new(identity: LibraryIdentity) -> Self {
        TypeLibDescriptor {
            libid: identity.libid,
            major: identity.major,
            minor: identity.minor,
            lcid: identity.lcid,
            name: None,
            doc: None,
            items: Vec::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Appends an entry, serializing it to the raw JSON form.
    pub fn with_item(mut self, item: impl Serialize) -> Self {
        match serde_json::to_value(item) {
            Ok(value) => self.items.push(value),
            Err(e) => self
                .items
                .push(serde_json::json!({ "kind": "invalid", "error": e.to_string() })),
        }
        self
    }

    pub fn with_raw_item(mut self, value: serde_json::Value) -> Self {
        self.items.push(value);
        self
    }

    pub fn identity(&self) -> LibraryIdentity {
        LibraryIdentity::new(self.libid, self.major, self.minor, self.lcid)
    }

    /// The declared name, if it is non-blank.
    pub fn declared_name(&self) -> Option<&str> {
        self.name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }
}
