//! Wire representation of the canonical file list.
//!
//! Two serialized forms exist:
//! - the *cached* canonical representation, always a JSON array, kept by
//!   the store for change detection;
//! - the *host-bound* wire value, whose shape depends on the field mode
//!   (single → bare value or single object, multiple → JSON array, always).
//!
//! Comparison between serializations is normalized (parse then compare) so
//! key order or whitespace differences never register as a change.

use crate::descriptor::FileDescriptor;
use crate::{Error, Result};
use serde_json::Value;

/// Empty sentinel written to the host in single mode when no file is held.
pub const EMPTY_SENTINEL: &str = "";

/// Projects descriptors to their state form: metadata mode keeps rich
/// objects unchanged, URL-only mode flattens rich objects to their
/// `cdnUrl`.
#[must_use]
pub fn format_for_state(list: &[FileDescriptor], with_metadata: bool) -> Vec<Value> {
    list.iter()
        .map(|descriptor| {
            if with_metadata {
                serde_json::to_value(descriptor).unwrap_or(Value::Null)
            } else {
                Value::String(descriptor.cdn_url().to_string())
            }
        })
        .collect()
}

/// Serializes the canonical cached representation: always a JSON array.
#[must_use]
pub fn serialize_list(list: &[FileDescriptor], with_metadata: bool) -> String {
    let values = format_for_state(list, with_metadata);
    serde_json::to_string(&Value::Array(values)).unwrap_or_else(|_| "[]".to_string())
}

/// Builds the host-bound wire value: single mode yields the first element
/// (or the empty sentinel), multiple mode always yields a JSON array.
#[must_use]
pub fn build_wire_value(
    list: &[FileDescriptor],
    is_multiple: bool,
    with_metadata: bool,
) -> Value {
    let mut values = format_for_state(list, with_metadata);
    if is_multiple {
        Value::Array(values)
    } else if values.is_empty() {
        Value::String(EMPTY_SENTINEL.to_string())
    } else {
        values.swap_remove(0)
    }
}

/// Normalized comparison of two serializations: both sides are parsed and
/// compared structurally, so formatting differences are invisible. Falls
/// back to raw string equality when either side is not JSON.
#[must_use]
pub fn normalized_eq(a: &str, b: &str) -> bool {
    match (
        serde_json::from_str::<Value>(a),
        serde_json::from_str::<Value>(b),
    ) {
        (Ok(left), Ok(right)) => left == right,
        _ => a == b,
    }
}

/// Parses a cached canonical representation back into descriptors.
/// Returns `None` when the input is not a JSON list; individual elements
/// that fail to classify are skipped.
#[must_use]
pub fn parse_list(serialized: &str) -> Option<Vec<FileDescriptor>> {
    let value: Value = serde_json::from_str(serialized).ok()?;
    let items = value.as_array()?;
    Some(
        items
            .iter()
            .filter_map(|item| serde_json::from_value(item.clone()).ok())
            .collect(),
    )
}

/// Parses a single descriptor from its wire form.
pub fn parse_descriptor(serialized: &str) -> Result<FileDescriptor> {
    serde_json::from_str(serialized).map_err(Error::Serialization)
}

/// Returns true when a host-bound value denotes "no files": null, an empty
/// or placeholder string, or an empty list (decoded or serialized).
#[must_use]
pub fn is_empty_state(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => matches!(s.trim(), "" | "[]" | "null" | "[null]"),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}
