//! File descriptors.
//!
//! One uploaded file is represented either as a bare CDN URL string or as a
//! rich metadata object. Both shapes appear on the wire depending on the
//! field's metadata mode, and both must resolve to the same identity.

use crate::ids::{canonical_uuid_segment, FileUuid};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Rich metadata for one uploaded file, as reported by the upload widget.
///
/// Unknown keys are preserved through the flattened `extra` map so that a
/// round trip through the store never drops fields the widget added.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RichFile {
    /// The file's UUID, when the widget reports it directly.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,

    /// Canonical CDN URL, `https://<cdn-host>/<uuid>/<modifiers?>`.
    pub cdn_url: String,

    /// Transformation modifiers (e.g. a crop), when present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cdn_url_modifiers: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_image: Option<bool>,

    /// Widget-defined keys we don't model; carried through untouched.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl RichFile {
    /// Resolves the file's identity: the explicit `uuid` field when
    /// present, otherwise the UUID embedded in `cdnUrl`.
    #[must_use]
    pub fn file_uuid(&self) -> Option<FileUuid> {
        self.uuid
            .as_deref()
            .and_then(FileUuid::extract)
            .or_else(|| FileUuid::extract(&self.cdn_url))
    }

    /// Applies a URL change in place: the new URL replaces the old one and
    /// the modifier substring is taken from the event when supplied,
    /// otherwise recomputed from the new URL. All other fields keep their
    /// current values.
    pub fn apply_url_change(&mut self, cdn_url: &str, modifiers: Option<&str>) {
        self.cdn_url = cdn_url.to_string();
        self.cdn_url_modifiers = match modifiers {
            Some(m) if !m.is_empty() => Some(m.to_string()),
            _ => modifiers_from_url(cdn_url),
        };
    }

    /// Returns true when the file carries transformation modifiers, either
    /// explicitly or embedded in its URL.
    #[must_use]
    pub fn has_modifiers(&self) -> bool {
        match &self.cdn_url_modifiers {
            Some(m) if !m.is_empty() => true,
            _ => modifiers_from_url(&self.cdn_url).is_some(),
        }
    }

    /// Copies fields absent here from `other`. Used when an external write
    /// carries a thinner object for a file we already know richly: the
    /// external values win where present, ours fill the gaps.
    pub fn fill_missing_from(&mut self, other: &RichFile) {
        if self.uuid.is_none() {
            self.uuid = other.uuid.clone();
        }
        if self.cdn_url_modifiers.is_none() {
            self.cdn_url_modifiers = other.cdn_url_modifiers.clone();
        }
        if self.name.is_none() {
            self.name = other.name.clone();
        }
        if self.size.is_none() {
            self.size = other.size;
        }
        if self.mime_type.is_none() {
            self.mime_type = other.mime_type.clone();
        }
        if self.is_image.is_none() {
            self.is_image = other.is_image;
        }
        for (key, value) in &other.extra {
            self.extra
                .entry(key.clone())
                .or_insert_with(|| value.clone());
        }
    }
}

/// One file's representation: a bare CDN URL or a rich metadata object.
///
/// Identity is the extracted UUID (see [`FileUuid::extract`]), never
/// structural equality: `Url("https://cdn/<u>/")` and a [`RichFile`] with
/// the same UUID are the same file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FileDescriptor {
    /// Bare CDN URL.
    Url(String),
    /// Rich metadata object.
    Rich(RichFile),
}

impl FileDescriptor {
    /// Returns the descriptor's CDN URL.
    #[must_use]
    pub fn cdn_url(&self) -> &str {
        match self {
            Self::Url(url) => url,
            Self::Rich(rich) => &rich.cdn_url,
        }
    }

    /// Resolves the descriptor's identity, if one can be extracted.
    #[must_use]
    pub fn file_uuid(&self) -> Option<FileUuid> {
        match self {
            Self::Url(url) => FileUuid::extract(url),
            Self::Rich(rich) => rich.file_uuid(),
        }
    }

    /// True iff both descriptors extract to equal non-null UUIDs.
    /// Descriptors without an extractable UUID never compare equal.
    #[must_use]
    pub fn same_file(&self, other: &FileDescriptor) -> bool {
        match (self.file_uuid(), other.file_uuid()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }

    /// Returns true when the descriptor carries transformation modifiers.
    #[must_use]
    pub fn has_modifiers(&self) -> bool {
        match self {
            Self::Url(url) => modifiers_from_url(url).is_some(),
            Self::Rich(rich) => rich.has_modifiers(),
        }
    }

    /// Interprets the descriptor as a file-group reference, if its URL
    /// carries a group segment.
    #[must_use]
    pub fn group_ref(&self) -> Option<GroupRef> {
        GroupRef::parse(self.cdn_url())
    }
}

/// A reference to a file group: `https://<cdn>/<uuid>~<count>/`.
///
/// Groups are produced by widgets configured for grouped output; they stand
/// for `count` individual files and are expanded during hydration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupRef {
    /// The group's own UUID.
    pub uuid: FileUuid,
    /// Number of files in the group.
    pub count: u32,
    /// The original group URL, kept verbatim for the expansion fallback.
    pub url: String,
}

impl GroupRef {
    /// Parses a group reference out of a CDN URL. Returns `None` for plain
    /// single-file URLs.
    #[must_use]
    pub fn parse(url: &str) -> Option<Self> {
        let segment = url
            .trim()
            .split('/')
            .find(|segment| segment.contains('~'))?;
        let (head, tail) = segment.split_once('~')?;
        let uuid = canonical_uuid_segment(head).map(FileUuid::from_uuid)?;
        let count: u32 = tail.parse().ok().filter(|&n| n > 0)?;
        Some(Self {
            uuid,
            count,
            url: url.trim().to_string(),
        })
    }
}

/// Extracts the modifier substring from a CDN URL: everything after the
/// UUID path segment, e.g. `-/crop/1:1/` out of
/// `https://cdn/<uuid>/-/crop/1:1/`. Returns `None` when the URL has no
/// UUID segment or nothing follows it.
#[must_use]
pub fn modifiers_from_url(url: &str) -> Option<String> {
    let segments: Vec<&str> = url.trim().split('/').collect();
    let uuid_index = segments
        .iter()
        .position(|segment| canonical_uuid_segment(segment).is_some())?;
    let rest = &segments[uuid_index + 1..];
    if rest.iter().all(|segment| segment.is_empty()) {
        return None;
    }
    Some(rest.join("/"))
}
