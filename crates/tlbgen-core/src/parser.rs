//! The descriptor parser boundary.
//!
//! [`DescriptorParser::parse`] turns a loaded library into an [`ItemMap`]
//! in declaration order. [`EntryParser`] is the in-tree implementation for
//! JSON descriptors: structurally broken descriptors are rejected, while a
//! single entry of an unknown or malformed kind degrades to
//! [`ParsedItem::Opaque`] so the rest of the library still generates.

use tracing::warn;

use crate::error::ParseError;
use crate::items::{ItemMap, ParsedItem};
use crate::loader::TypeLibraryHandle;

/// Parses a loaded type library into its items.
pub trait DescriptorParser: Send + Sync {
    fn parse(&self, handle: &TypeLibraryHandle) -> Result<ItemMap, ParseError>;
}

/// Parser for raw descriptor entries.
#[derive(Debug, Default, Clone, Copy)]
pub struct EntryParser;

impl DescriptorParser for EntryParser {
    fn parse(&self, handle: &TypeLibraryHandle) -> Result<ItemMap, ParseError> {
        let descriptor = handle.descriptor();
        let corrupt = |reason: String| ParseError::CorruptDescriptor {
            libid: descriptor.libid,
            reason,
        };

        let mut items = ItemMap::with_capacity(descriptor.items.len());
        for (index, entry) in descriptor.items.iter().enumerate() {
            let object = entry
                .as_object()
                .ok_or_else(|| corrupt(format!("entry {} is not an object", index)))?;
            let name = object
                .get("name")
                .and_then(|n| n.as_str())
                .ok_or_else(|| corrupt(format!("entry {} has no name", index)))?
                .to_string();
            if items.contains_key(&name) {
                return Err(corrupt(format!("duplicate item '{}'", name)));
            }

            let item = match serde_json::from_value::<ParsedItem>(entry.clone()) {
                Ok(ParsedItem::Opaque { .. }) | Err(_) => {
                    let construct = object
                        .get("kind")
                        .and_then(|k| k.as_str())
                        .unwrap_or("<missing kind>")
                        .to_string();
                    let err = ParseError::UnsupportedConstruct(format!("{} ({})", name, construct));
                    warn!("{}; generating a stub", err);
                    ParsedItem::Opaque {
                        name: name.clone(),
                        construct,
                    }
                }
                Ok(item) => item,
            };
            items.insert(name, item);
        }
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::TypeLibDescriptor;
    use crate::guid::Guid;
    use crate::identity::LibraryIdentity;
    use serde_json::json;

    fn handle(entries: Vec<serde_json::Value>) -> TypeLibraryHandle {
        let id = LibraryIdentity::new(Guid::from_u128(1), 1, 0, 0);
        let mut desc = TypeLibDescriptor::new(id);
        desc.items = entries;
        TypeLibraryHandle::new(desc, None)
    }

    #[test]
    fn preserves_declaration_order() {
        let items = EntryParser
            .parse(&handle(vec![
                json!({"kind": "struct", "name": "Zeta", "fields": []}),
                json!({"kind": "enum", "name": "Alpha", "members": [["A", 1]]}),
                json!({"kind": "alias", "name": "Mid", "target_type": {"builtin": "i4"}}),
            ]))
            .unwrap();
        let names: Vec<_> = items.keys().cloned().collect();
        assert_eq!(names, vec!["Zeta", "Alpha", "Mid"]);
    }

    #[test]
    fn unknown_kind_degrades_to_opaque() {
        let items = EntryParser
            .parse(&handle(vec![
                json!({"kind": "union", "name": "Blob", "arms": []}),
                json!({"kind": "enum", "name": "Color", "members": []}),
            ]))
            .unwrap();
        assert_eq!(
            items["Blob"],
            ParsedItem::Opaque {
                name: "Blob".into(),
                construct: "union".into()
            }
        );
        assert!(matches!(items["Color"], ParsedItem::Enum { .. }));
    }

    #[test]
    fn malformed_known_kind_degrades_to_opaque() {
        let items = EntryParser
            .parse(&handle(vec![json!({"kind": "alias", "name": "Broken"})]))
            .unwrap();
        assert!(matches!(&items["Broken"], ParsedItem::Opaque { construct, .. } if construct == "alias"));
    }

    #[test]
    fn nameless_entry_is_corrupt() {
        let err = EntryParser
            .parse(&handle(vec![json!({"kind": "enum"})]))
            .unwrap_err();
        assert!(matches!(err, ParseError::CorruptDescriptor { .. }));
    }

    #[test]
    fn non_object_entry_is_corrupt() {
        let err = EntryParser.parse(&handle(vec![json!(42)])).unwrap_err();
        assert!(matches!(err, ParseError::CorruptDescriptor { .. }));
    }

    #[test]
    fn duplicate_names_are_corrupt() {
        let err = EntryParser
            .parse(&handle(vec![
                json!({"kind": "enum", "name": "Color"}),
                json!({"kind": "struct", "name": "Color"}),
            ]))
            .unwrap_err();
        assert!(matches!(err, ParseError::CorruptDescriptor { reason, .. } if reason.contains("Color")));
    }
}
