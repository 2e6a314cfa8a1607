//! File identity.
//!
//! A file's identity is the UUID assigned by the CDN, not the descriptor's
//! structure: the same file can appear as a bare URL string, a URL with
//! transformation modifiers appended, or a rich metadata object, and all of
//! them must compare equal. Extraction accepts any of those shapes and only
//! recognizes the canonical hyphenated 8-4-4-4-12 form.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Unique identity of an uploaded file on the CDN.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileUuid(Uuid);

impl FileUuid {
    /// Creates a file UUID from an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> Uuid {
        self.0
    }

    /// Parses a file UUID from its canonical string form.
    pub fn parse(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }

    /// Extracts a file UUID from arbitrary descriptor text: a bare
    /// canonical UUID string, or a UUID path segment inside a CDN URL
    /// (including group segments like `<uuid>~3`).
    ///
    /// Returns `None` for anything malformed; never panics.
    #[must_use]
    pub fn extract(value: &str) -> Option<Self> {
        value
            .trim()
            .split('/')
            .find_map(canonical_uuid_segment)
            .map(Self)
    }
}

impl fmt::Display for FileUuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for FileUuid {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Parses a URL path segment as a canonical UUID, tolerating a group
/// suffix (`<uuid>~<count>`).
pub(crate) fn canonical_uuid_segment(segment: &str) -> Option<Uuid> {
    let head = segment
        .split_once('~')
        .map_or(segment, |(head, _)| head);
    if !is_canonical(head) {
        return None;
    }
    Uuid::parse_str(head).ok()
}

/// Returns true when `s` is exactly the hyphenated 8-4-4-4-12 hex form.
/// `Uuid::parse_str` alone is too lenient (it accepts simple/braced/urn
/// forms), which would misidentify ordinary 32-hex path segments.
fn is_canonical(s: &str) -> bool {
    let bytes = s.as_bytes();
    if bytes.len() != 36 {
        return false;
    }
    bytes.iter().enumerate().all(|(i, &c)| match i {
        8 | 13 | 18 | 23 => c == b'-',
        _ => c.is_ascii_hexdigit(),
    })
}
