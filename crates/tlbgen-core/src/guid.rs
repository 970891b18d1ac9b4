//! GUID newtype used for LIBIDs, CLSIDs and IIDs.
//!
//! Wraps [`uuid::Uuid`] so the rest of the workspace gets the registry
//! rendering (`{XXXXXXXX-XXXX-XXXX-XXXX-XXXXXXXXXXXX}`, upper case) and a
//! parser that accepts the braced and bare forms.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

/// A 128-bit globally unique identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Guid(pub Uuid);

/// Returned when a string is not a GUID in either accepted form.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid GUID: '{0}'")]
pub struct GuidParseError(pub String);

impl Guid {
    /// Builds a GUID from its 128-bit integer value.
    pub const fn from_u128(value: u128) -> Self {
        Guid(Uuid::from_u128(value))
    }

    /// Upper-case hyphenated hex without braces.
    pub fn hyphenated(&self) -> String {
        self.0.hyphenated().to_string().to_uppercase()
    }
}

impl fmt::Display for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}}}", self.hyphenated())
    }
}

impl FromStr for Guid {
    type Err = GuidParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let inner = trimmed
            .strip_prefix('{')
            .and_then(|rest| rest.strip_suffix('}'))
            .unwrap_or(trimmed);
        // Only the hyphenated form is a registry GUID; uuid also accepts
        // simple and URN forms, which we reject.
        if inner.len() != 36 {
            return Err(GuidParseError(s.to_string()));
        }
        Uuid::parse_str(inner)
            .map(Guid)
            .map_err(|_| GuidParseError(s.to_string()))
    }
}

impl Serialize for Guid {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Guid {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ACME: &str = "{944DE083-8FB8-45CF-BCB7-C477ACB2F897}";

    #[test]
    fn display_is_braced_upper_case() {
        let guid: Guid = "944de083-8fb8-45cf-bcb7-c477acb2f897".parse().unwrap();
        assert_eq!(guid.to_string(), ACME);
    }

    #[test]
    fn parses_braced_and_bare() {
        let braced: Guid = ACME.parse().unwrap();
        let bare: Guid = "944DE083-8FB8-45CF-BCB7-C477ACB2F897".parse().unwrap();
        assert_eq!(braced, bare);
    }

    #[test]
    fn rejects_simple_form_and_garbage() {
        assert!("944DE0838FB845CFBCB7C477ACB2F897".parse::<Guid>().is_err());
        assert!("not-a-guid".parse::<Guid>().is_err());
        assert!("{944DE083-8FB8-45CF-BCB7-C477ACB2F897".parse::<Guid>().is_err());
    }

    #[test]
    fn from_u128_matches_parse() {
        let guid = Guid::from_u128(0x11111111_1111_1111_1111_111111111111);
        assert_eq!(guid.hyphenated(), "11111111-1111-1111-1111-111111111111");
    }

    #[test]
    fn serde_uses_registry_form() {
        let guid: Guid = ACME.parse().unwrap();
        let json = serde_json::to_string(&guid).unwrap();
        assert_eq!(json, format!("\"{}\"", ACME));
        let back: Guid = serde_json::from_str(&json).unwrap();
        assert_eq!(guid, back);
    }
}
