//! Module naming rules.
//!
//! Wrapper modules are named after the library identity alone:
//! `gen::_` + the upper-case LIBID with `-` replaced by `_`, then the lcid,
//! major and minor version in decimal, each separated by `_`:
//!
//! ```text
//! gen::_11111111_1111_1111_1111_111111111111_0_1_0
//! ```
//!
//! Friendly modules are named after the library's declared name, sanitized
//! into a Rust identifier. Several versions of one library share a friendly
//! name.

use tlbgen_core::LibraryIdentity;
use tlbgen_storage::ModuleName;

use crate::error::GenerationError;

/// Strict and reserved Rust keywords; identifiers equal to one get a
/// trailing `_`.
const KEYWORDS: &[&str] = &[
    "Self", "abstract", "as", "async", "await", "become", "box", "break", "const", "continue",
    "crate", "do", "dyn", "else", "enum", "extern", "false", "final", "fn", "for", "gen", "if",
    "impl", "in", "let", "loop", "macro", "match", "mod", "move", "mut", "override", "priv",
    "pub", "ref", "return", "self", "static", "struct", "super", "trait", "true", "try", "type",
    "typeof", "unsafe", "unsized", "use", "virtual", "where", "while", "yield",
];

/// File stem of the wrapper module for `identity`.
pub fn wrapper_stem(identity: &LibraryIdentity) -> String {
    format!(
        "_{}_{}_{}_{}",
        identity.libid.hyphenated().replace('-', "_"),
        identity.lcid,
        identity.major,
        identity.minor
    )
}

pub fn wrapper_module_name(identity: &LibraryIdentity) -> ModuleName {
    ModuleName::in_package(&wrapper_stem(identity))
}

/// Whether `stem` has the shape produced by [`wrapper_stem`].
pub fn is_wrapper_stem(stem: &str) -> bool {
    let Some(rest) = stem.strip_prefix('_') else {
        return false;
    };
    let parts: Vec<&str> = rest.split('_').collect();
    if parts.len() != 8 {
        return false;
    }
    let hex_ok = [8, 4, 4, 4, 12]
        .iter()
        .zip(&parts[..5])
        .all(|(len, part)| {
            part.len() == *len
                && part
                    .chars()
                    .all(|c| c.is_ascii_digit() || ('A'..='F').contains(&c))
        });
    let dec_ok = parts[5..]
        .iter()
        .all(|part| !part.is_empty() && part.chars().all(|c| c.is_ascii_digit()));
    hex_ok && dec_ok
}

/// Turns arbitrary text into a Rust identifier.
///
/// Characters outside `[A-Za-z0-9_]` become `_`, a leading digit gets a
/// `_` prefix and keywords get a `_` suffix. Empty input yields `_`.
pub fn sanitize_ident(text: &str) -> String {
    let mut ident: String = text
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if ident.is_empty() {
        return "_".to_string();
    }
    if ident.starts_with(|c: char| c.is_ascii_digit()) {
        ident.insert(0, '_');
    }
    if KEYWORDS.contains(&ident.as_str()) {
        ident.push('_');
    }
    ident
}

/// File stem of the friendly module for a declared library name.
///
/// `Ok(None)` means the library has no usable friendly name.
pub fn friendly_stem(declared: &str) -> Result<Option<String>, GenerationError> {
    if !declared.chars().any(|c| c.is_ascii_alphanumeric()) {
        return Ok(None);
    }
    let stem = sanitize_ident(declared);
    if is_wrapper_stem(&stem) {
        return Err(GenerationError::NameCollision {
            declared: declared.to_string(),
            module: ModuleName::in_package(&stem).to_string(),
        });
    }
    Ok(Some(stem))
}

pub fn friendly_module_name(
    declared: Option<&str>,
) -> Result<Option<ModuleName>, GenerationError> {
    let Some(declared) = declared else {
        return Ok(None);
    };
    Ok(friendly_stem(declared)?.map(|stem| ModuleName::in_package(&stem)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use tlbgen_core::Guid;

    fn acme() -> LibraryIdentity {
        LibraryIdentity::new(Guid::from_u128(0x11111111_1111_1111_1111_111111111111), 1, 0, 0)
    }

    #[test]
    fn wrapper_name_pattern() {
        assert_eq!(
            wrapper_module_name(&acme()).as_str(),
            "gen::_11111111_1111_1111_1111_111111111111_0_1_0"
        );
    }

    #[test]
    fn wrapper_name_uses_upper_case_hex_and_decimal_version() {
        let id = LibraryIdentity::new(
            Guid::from_u128(0x00020430_0000_0000_c000_000000000046),
            2,
            10,
            0x409,
        );
        assert_eq!(
            wrapper_stem(&id),
            "_00020430_0000_0000_C000_000000000046_1033_2_10"
        );
        assert!(is_wrapper_stem(&wrapper_stem(&id)));
    }

    #[test]
    fn friendly_names() {
        assert_eq!(friendly_stem("Acme").unwrap().as_deref(), Some("Acme"));
        assert_eq!(
            friendly_stem("Acme Widgets 2.0").unwrap().as_deref(),
            Some("Acme_Widgets_2_0")
        );
        assert_eq!(friendly_stem("3DEngine").unwrap().as_deref(), Some("_3DEngine"));
        assert_eq!(friendly_stem("type").unwrap().as_deref(), Some("type_"));
        assert_eq!(friendly_stem("mod").unwrap().as_deref(), Some("mod_"));
    }

    #[test]
    fn unusable_names_have_no_friendly_module() {
        assert_eq!(friendly_stem("").unwrap(), None);
        assert_eq!(friendly_stem("___").unwrap(), None);
        assert_eq!(friendly_stem(" - ").unwrap(), None);
        assert_eq!(friendly_module_name(None).unwrap(), None);
    }

    #[test]
    fn wrapper_shaped_friendly_name_collides() {
        let err = friendly_stem("_11111111_1111_1111_1111_111111111111_0_1_0").unwrap_err();
        assert!(matches!(err, GenerationError::NameCollision { .. }));
    }

    #[test]
    fn lower_case_hex_is_not_wrapper_shaped() {
        assert!(!is_wrapper_stem("_aaaaaaaa_1111_1111_1111_111111111111_0_1_0"));
        assert!(!is_wrapper_stem("Acme"));
        assert!(!is_wrapper_stem("_11111111_1111_1111_1111_111111111111_0_1"));
    }

    fn any_identity() -> impl Strategy<Value = LibraryIdentity> {
        (any::<u128>(), any::<u16>(), any::<u16>(), any::<u32>()).prop_map(
            |(libid, major, minor, lcid)| {
                LibraryIdentity::new(Guid::from_u128(libid), major, minor, lcid)
            },
        )
    }

    proptest! {
        #[test]
        fn distinct_identities_get_distinct_wrapper_names(a in any_identity(), b in any_identity()) {
            prop_assume!(a != b);
            prop_assert_ne!(wrapper_stem(&a), wrapper_stem(&b));
        }

        #[test]
        fn wrapper_stems_are_wrapper_shaped(id in any_identity()) {
            prop_assert!(is_wrapper_stem(&wrapper_stem(&id)));
        }

        #[test]
        fn friendly_stems_are_identifiers(name in "\\PC{0,24}") {
            if let Ok(Some(stem)) = friendly_stem(&name) {
                let first = stem.chars().next().unwrap();
                prop_assert!(first == '_' || first.is_ascii_alphabetic());
                prop_assert!(stem.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'));
                prop_assert!(!KEYWORDS.contains(&stem.as_str()));
            }
        }
    }
}
