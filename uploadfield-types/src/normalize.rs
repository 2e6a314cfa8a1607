//! Recursive shape normalization for persisted values.
//!
//! Persisted upload state arrives in ambiguous shapes: a JSON string, an
//! already-decoded object, a double-encoded JSON string, a single item, a
//! list, or a single-element list whose sole element is itself a list or a
//! JSON string. One recursive normalizer resolves all of them into a flat,
//! deduplicated descriptor list, replacing ad-hoc shape branching.
//!
//! Normalization is best-effort and total: invalid fragments are dropped,
//! nothing is ever an error.

use crate::descriptor::{FileDescriptor, RichFile};
use crate::ids::FileUuid;
use serde_json::Value;
use std::collections::HashSet;

/// Intermediate shape of one fragment of persisted state.
#[derive(Debug, Clone, PartialEq)]
pub enum FileRef {
    /// A bare CDN URL (or UUID) string.
    Url(String),
    /// A decoded rich object.
    Descriptor(RichFile),
    /// A nested list of fragments.
    List(Vec<FileRef>),
}

impl FileRef {
    /// Classifies a JSON value, recursing through nested lists and
    /// JSON-encoded strings. Returns `None` for fragments that cannot
    /// denote a file (null, numbers, booleans, placeholders).
    #[must_use]
    pub fn from_value(value: &Value) -> Option<FileRef> {
        match value {
            Value::Null | Value::Bool(_) | Value::Number(_) => None,
            Value::String(s) => Self::from_raw(s),
            Value::Array(items) => {
                let children: Vec<FileRef> =
                    items.iter().filter_map(Self::from_value).collect();
                if children.is_empty() {
                    None
                } else {
                    Some(FileRef::List(children))
                }
            }
            Value::Object(_) => {
                let rich: RichFile = serde_json::from_value(value.clone()).ok()?;
                if rich.cdn_url.is_empty() && rich.uuid.is_none() {
                    return None;
                }
                Some(FileRef::Descriptor(rich))
            }
        }
    }

    /// Classifies a raw string fragment. A string whose content parses as
    /// JSON is treated as an encoded fragment and recursed into (this is
    /// where double-encoded state unwinds); anything else is a URL.
    #[must_use]
    pub fn from_raw(raw: &str) -> Option<FileRef> {
        let trimmed = raw.trim();
        if is_placeholder(trimmed) {
            return None;
        }
        match serde_json::from_str::<Value>(trimmed) {
            // A bare URL is not valid JSON, so reaching here means the
            // string was an encoded array/object/string: unwind one level.
            Ok(inner) => Self::from_value(&inner),
            Err(_) => Some(FileRef::Url(trimmed.to_string())),
        }
    }

    fn flatten_into(self, out: &mut Vec<FileDescriptor>) {
        match self {
            FileRef::Url(url) => out.push(FileDescriptor::Url(url)),
            FileRef::Descriptor(rich) => out.push(FileDescriptor::Rich(rich)),
            FileRef::List(children) => {
                for child in children {
                    child.flatten_into(out);
                }
            }
        }
    }
}

/// Normalizes a decoded JSON value into a flat, deduplicated descriptor
/// list.
#[must_use]
pub fn normalize_value(value: &Value) -> Vec<FileDescriptor> {
    let mut flat = Vec::new();
    if let Some(file_ref) = FileRef::from_value(value) {
        file_ref.flatten_into(&mut flat);
    }
    dedup_by_uuid(flat)
}

/// Normalizes a raw persisted string (JSON or bare URL) into a flat,
/// deduplicated descriptor list.
#[must_use]
pub fn normalize_raw(raw: &str) -> Vec<FileDescriptor> {
    let mut flat = Vec::new();
    if let Some(file_ref) = FileRef::from_raw(raw) {
        file_ref.flatten_into(&mut flat);
    }
    dedup_by_uuid(flat)
}

/// Removes later entries whose UUID duplicates an earlier one. Entries
/// without an extractable UUID are never deduplicated (best-effort only).
#[must_use]
pub fn dedup_by_uuid(list: Vec<FileDescriptor>) -> Vec<FileDescriptor> {
    let mut seen: HashSet<FileUuid> = HashSet::new();
    list.into_iter()
        .filter(|descriptor| match descriptor.file_uuid() {
            Some(uuid) => seen.insert(uuid),
            None => true,
        })
        .collect()
}

/// Literal placeholder forms that persist as junk instead of absent state.
fn is_placeholder(trimmed: &str) -> bool {
    matches!(trimmed, "" | "null" | "[null]")
}
