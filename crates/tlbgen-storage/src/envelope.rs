//! Sealed module source.
//!
//! Every stored module is prefixed with a three-line header naming the
//! module and carrying a blake3 checksum of the body. Opening a sealed
//! text verifies both, which is what "importing" a stored module means:
//! a truncated, edited or misplaced file fails to open.

use thiserror::Error;

use crate::types::ModuleName;

const MARKER: &str = "// @generated by tlbgen. Do not edit.";
const MODULE_PREFIX: &str = "// module: ";
const CHECKSUM_PREFIX: &str = "// checksum: blake3:";

/// Why a sealed text failed to open.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnvelopeError {
    #[error("missing or malformed header")]
    MalformedHeader,

    #[error("module name mismatch: expected {expected}, found {found}")]
    NameMismatch { expected: String, found: String },

    #[error("checksum mismatch: expected {expected}, computed {computed}")]
    ChecksumMismatch { expected: String, computed: String },
}

/// Hex blake3 digest of a module body.
pub fn checksum(body: &str) -> String {
    blake3::hash(body.as_bytes()).to_hex().to_string()
}

/// Prefixes `body` with the header for `name`.
pub fn seal(name: &ModuleName, body: &str) -> String {
    format!(
        "{}\n{}{}\n{}{}\n{}",
        MARKER,
        MODULE_PREFIX,
        name,
        CHECKSUM_PREFIX,
        checksum(body),
        body
    )
}

/// Verifies a sealed text and returns its body.
pub fn open<'a>(name: &ModuleName, sealed: &'a str) -> Result<&'a str, EnvelopeError> {
    let mut lines = sealed.splitn(4, '\n');
    let (Some(marker), Some(module_line), Some(checksum_line)) =
        (lines.next(), lines.next(), lines.next())
    else {
        return Err(EnvelopeError::MalformedHeader);
    };
    let body = lines.next().unwrap_or("");

    if marker != MARKER {
        return Err(EnvelopeError::MalformedHeader);
    }
    let found = module_line
        .strip_prefix(MODULE_PREFIX)
        .ok_or(EnvelopeError::MalformedHeader)?;
    if found != name.as_str() {
        return Err(EnvelopeError::NameMismatch {
            expected: name.to_string(),
            found: found.to_string(),
        });
    }
    let expected = checksum_line
        .strip_prefix(CHECKSUM_PREFIX)
        .ok_or(EnvelopeError::MalformedHeader)?;
    let computed = checksum(body);
    if expected != computed {
        return Err(EnvelopeError::ChecksumMismatch {
            expected: expected.to_string(),
            computed,
        });
    }
    Ok(body)
}
