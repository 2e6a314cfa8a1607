//! Pure list algebra over descriptor lists.
//!
//! All operations locate entries by extracted UUID, never by structural
//! equality, so a bare URL and a rich object for the same file always find
//! each other. Operations returning `Option` yield `None` for a no-op
//! (target not found); the caller decides whether to count it.

use uploadfield_types::{FileDescriptor, FileUuid, RichFile};

/// Mode flags governing list shape: replace-on-single vs append-on-multiple
/// and bare-URL vs rich-object entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreMode {
    /// Multiple-file field: adds append; single-file field: adds replace.
    pub multiple: bool,
    /// Rich-object wire format instead of bare URLs.
    pub with_metadata: bool,
}

/// A URL change for one file, as reported by the widget.
#[derive(Debug, Clone, PartialEq)]
pub struct UrlUpdate {
    /// Identity of the file being updated. `None` when no UUID could be
    /// extracted from the report; such updates can never match and are
    /// counted as no-ops.
    pub uuid: Option<FileUuid>,
    /// The new CDN URL (modifiers embedded).
    pub cdn_url: String,
    /// Explicit modifier substring, when the widget reported one.
    pub cdn_url_modifiers: Option<String>,
}

/// One buffered store mutation, applied in arrival order at flush time.
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    /// A completed upload to ingest.
    Add(FileDescriptor),
    /// A URL change (e.g. a crop applied in the widget editor).
    UpdateUrl(UrlUpdate),
    /// A file removed in the widget.
    Remove(FileDescriptor),
}

/// Adds a file: multiple mode appends iff no existing entry shares the new
/// file's UUID; single mode replaces the whole list.
#[must_use]
pub fn add(list: &[FileDescriptor], new_file: FileDescriptor, mode: StoreMode) -> Vec<FileDescriptor> {
    if !mode.multiple {
        return vec![new_file];
    }
    if list.iter().any(|entry| entry.same_file(&new_file)) {
        return list.to_vec();
    }
    let mut next = list.to_vec();
    next.push(new_file);
    next
}

/// Applies a URL change to the entry with the update's UUID.
///
/// Metadata mode merges into the existing object, preserving untouched
/// fields; URL-only mode replaces the entry with the bare new URL. Single
/// mode collapses the result to just the updated entry. Returns `None`
/// when no entry matches.
#[must_use]
pub fn update_url(
    list: &[FileDescriptor],
    update: &UrlUpdate,
    mode: StoreMode,
) -> Option<Vec<FileDescriptor>> {
    let uuid = update.uuid?;
    let index = position_of(list, uuid)?;

    let updated = if mode.with_metadata {
        let mut rich = match &list[index] {
            FileDescriptor::Rich(existing) => existing.clone(),
            // A bare URL entry in metadata mode is promoted to an object.
            FileDescriptor::Url(_) => RichFile {
                uuid: Some(uuid.to_string()),
                ..Default::default()
            },
        };
        rich.apply_url_change(&update.cdn_url, update.cdn_url_modifiers.as_deref());
        FileDescriptor::Rich(rich)
    } else {
        FileDescriptor::Url(update.cdn_url.clone())
    };

    if mode.multiple {
        let mut next = list.to_vec();
        next[index] = updated;
        Some(next)
    } else {
        Some(vec![updated])
    }
}

/// Removes the entry sharing the target's UUID. Single mode collapses to
/// the empty list. Returns `None` when no entry matches (including targets
/// with no extractable UUID).
#[must_use]
pub fn remove(
    list: &[FileDescriptor],
    target: &FileDescriptor,
    mode: StoreMode,
) -> Option<Vec<FileDescriptor>> {
    let uuid = target.file_uuid()?;
    let index = position_of(list, uuid)?;

    if mode.multiple {
        let mut next = list.to_vec();
        next.remove(index);
        Some(next)
    } else {
        Some(Vec::new())
    }
}

fn position_of(list: &[FileDescriptor], uuid: FileUuid) -> Option<usize> {
    list.iter()
        .position(|entry| entry.file_uuid() == Some(uuid))
}
