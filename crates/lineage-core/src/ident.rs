//! Allow-list validation for identifiers that end up inside query text.
//!
//! Labels, property names, and constraint/index names cannot be supplied as
//! bound parameters, so they are substituted into the Cypher string. Every
//! such identifier must pass [`sanitize_identifier`] first.

use std::fmt;

use crate::error::IdentError;

/// Validate that `raw` consists only of ASCII letters, digits and underscores.
///
/// Returns the input unchanged on success.
pub fn sanitize_identifier(raw: &str) -> Result<&str, IdentError> {
    if raw.is_empty() {
        return Err(IdentError::Empty);
    }
    if raw
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'_')
    {
        Ok(raw)
    } else {
        Err(IdentError::InvalidCharacters(raw.to_string()))
    }
}

/// An identifier that has passed [`sanitize_identifier`].
///
/// Only constructible through validation, so any `Identifier` is safe to
/// format directly into a query.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identifier(String);

impl Identifier {
    pub fn new(raw: &str) -> Result<Self, IdentError> {
        sanitize_identifier(raw).map(|s| Self(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
