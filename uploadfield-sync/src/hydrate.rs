//! Initial state hydration.
//!
//! The persisted initial value is normalized through the recursive
//! shape resolver, group references are expanded (with fallback), and each
//! surviving descriptor is registered with the widget: by UUID when no URL
//! modifiers are present (the cheap path), by full CDN URL when modifiers
//! (e.g. a crop) must be preserved — UUID-only registration would lose
//! them.

use crate::engine::Command;
use crate::group::GroupExpander;
use serde_json::Value;
use tracing::{debug, warn};
use uploadfield_types::{dedup_by_uuid, normalize_value, FileDescriptor};

/// A probe for the widget's locale files; hydration waits (bounded) until
/// they are loaded so registered files render with labels.
pub trait LocalesProbe: Send + Sync {
    /// Returns whether locale resources finished loading.
    fn locales_ready(&self) -> bool;
}

/// Default probe: locales are always considered ready.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalesAlwaysReady;

impl LocalesProbe for LocalesAlwaysReady {
    fn locales_ready(&self) -> bool {
        true
    }
}

/// Normalizes a persisted initial value into descriptors. Total: malformed
/// or placeholder input yields the empty list.
#[must_use]
pub fn normalize_initial(value: &Value) -> Vec<FileDescriptor> {
    normalize_value(value)
}

/// Expands group references into their members, keeping the unexpanded
/// group descriptor when expansion fails. Non-group descriptors pass
/// through untouched; the result is re-deduplicated since expansion can
/// surface members already present individually.
pub async fn resolve_groups(
    list: Vec<FileDescriptor>,
    expander: &dyn GroupExpander,
) -> Vec<FileDescriptor> {
    let mut resolved = Vec::with_capacity(list.len());
    for descriptor in list {
        let Some(group) = descriptor.group_ref() else {
            resolved.push(descriptor);
            continue;
        };
        match expander.expand(&group).await {
            Ok(members) if !members.is_empty() => {
                debug!("expanded group {} into {} file(s)", group.uuid, members.len());
                resolved.extend(members);
            }
            Ok(_) => resolved.push(descriptor),
            Err(error) => {
                warn!(
                    "expanding group {} failed ({error}), keeping unexpanded descriptor",
                    group.uuid
                );
                resolved.push(descriptor);
            }
        }
    }
    dedup_by_uuid(resolved)
}

/// Plans widget registration for hydrated descriptors: by UUID when no
/// modifiers are present, by full CDN URL otherwise. Unexpanded group
/// references always go by URL; their UUID alone does not denote the
/// group.
#[must_use]
pub fn plan_registration(list: &[FileDescriptor]) -> Vec<Command> {
    list.iter()
        .map(|descriptor| match descriptor.file_uuid() {
            Some(uuid) if !descriptor.has_modifiers() && descriptor.group_ref().is_none() => {
                Command::AddFileFromUuid(uuid)
            }
            _ => Command::AddFileFromCdnUrl(descriptor.cdn_url().to_string()),
        })
        .collect()
}
