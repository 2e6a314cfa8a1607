//! Upload widget abstraction.
//!
//! The widget is an external black box. Two things cross its boundary:
//! the capability API we call into (add/clear/value), and the event stream
//! it fires at us. Readiness is discovered by probing the capability API,
//! not by the widget element merely existing.

use crate::error::SyncResult;
use async_trait::async_trait;
use serde_json::Value;
use uploadfield_store::UrlUpdate;
use uploadfield_types::{FileDescriptor, FileUuid};

/// An event fired by the widget, tagged with its originating context.
#[derive(Debug, Clone, PartialEq)]
pub struct WidgetEvent {
    /// Context name of the instance the event belongs to. Multiple
    /// instances coexist on one page; events are filtered by this.
    pub ctx_name: String,
    /// What happened.
    pub detail: EventDetail,
}

impl WidgetEvent {
    /// Convenience constructor.
    #[must_use]
    pub fn new(ctx_name: impl Into<String>, detail: EventDetail) -> Self {
        Self {
            ctx_name: ctx_name.into(),
            detail,
        }
    }
}

/// Payload of one widget event.
#[derive(Debug, Clone, PartialEq)]
pub enum EventDetail {
    /// An upload began; no payload.
    UploadStarted,
    /// An upload completed; descriptor or bare CDN URL per widget mode.
    UploadSuccess(FileDescriptor),
    /// A file's URL changed (e.g. crop applied in the widget editor).
    UrlChanged {
        /// The file's UUID as reported, when present.
        uuid: Option<String>,
        /// The new CDN URL.
        cdn_url: String,
        /// Modifier substring; an empty/absent value marks the report as
        /// redundant.
        cdn_url_modifiers: Option<String>,
    },
    /// A file was removed in the widget.
    Removed(FileDescriptor),
}

impl EventDetail {
    /// Resolves a URL-change event into a located update, extracting the
    /// UUID from the reported field or the URL itself.
    #[must_use]
    pub fn as_url_update(&self) -> Option<UrlUpdate> {
        match self {
            Self::UrlChanged {
                uuid,
                cdn_url,
                cdn_url_modifiers,
            } => Some(UrlUpdate {
                uuid: uuid
                    .as_deref()
                    .and_then(FileUuid::extract)
                    .or_else(|| FileUuid::extract(cdn_url)),
                cdn_url: cdn_url.clone(),
                cdn_url_modifiers: cdn_url_modifiers.clone(),
            }),
            _ => None,
        }
    }
}

/// The widget's capability API.
#[async_trait]
pub trait UploadWidget: Send + Sync {
    /// Probes whether the capability API is actually usable (the known
    /// capability method exists), not merely whether the element exists.
    fn is_ready(&self) -> bool;

    /// Registers a file by UUID — the cheap path, valid only when no URL
    /// modifiers need preserving.
    async fn add_file_from_uuid(&self, uuid: &FileUuid) -> SyncResult<()>;

    /// Registers a file by full CDN URL, preserving modifiers.
    async fn add_file_from_cdn_url(&self, url: &str) -> SyncResult<()>;

    /// Removes every file from the widget.
    async fn remove_all_files(&self) -> SyncResult<()>;

    /// Reads the widget's own current value.
    async fn value(&self) -> SyncResult<Value>;

    /// One-time DOM relaxation: strips `required` from the widget's
    /// companion form input so the host form can submit.
    async fn relax_required_input(&self) -> SyncResult<()>;
}

/// A mock widget for testing.
pub mod mock {
    use super::*;
    use crate::error::SyncError;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::{Arc, Mutex};

    /// One recorded widget API call.
    #[derive(Debug, Clone, PartialEq)]
    pub enum WidgetCall {
        AddFromUuid(String),
        AddFromCdnUrl(String),
        RemoveAll,
        RelaxRequired,
    }

    /// A mock widget recording every call, becoming ready after a
    /// configurable number of probes.
    #[derive(Debug, Default)]
    pub struct MockWidget {
        ready_after_probes: AtomicU32,
        probes: AtomicU32,
        calls: Arc<Mutex<Vec<WidgetCall>>>,
        value: Arc<Mutex<Value>>,
    }

    impl MockWidget {
        /// Creates a widget that is ready immediately.
        pub fn ready() -> Self {
            Self::ready_after(0)
        }

        /// Creates a widget that reports ready only from the `n+1`-th
        /// probe onward.
        pub fn ready_after(n: u32) -> Self {
            Self {
                ready_after_probes: AtomicU32::new(n),
                ..Default::default()
            }
        }

        /// Creates a widget that never becomes ready.
        pub fn never_ready() -> Self {
            Self::ready_after(u32::MAX)
        }

        /// Returns all recorded calls so far.
        pub fn calls(&self) -> Vec<WidgetCall> {
            self.calls.lock().unwrap().clone()
        }

        /// Number of readiness probes observed.
        pub fn probe_count(&self) -> u32 {
            self.probes.load(Ordering::SeqCst)
        }

        fn record(&self, call: WidgetCall) {
            self.calls.lock().unwrap().push(call);
        }

        fn ready_now(&self) -> bool {
            self.probes.load(Ordering::SeqCst) >= self.ready_after_probes.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl UploadWidget for MockWidget {
        fn is_ready(&self) -> bool {
            let seen = self.probes.fetch_add(1, Ordering::SeqCst);
            seen >= self.ready_after_probes.load(Ordering::SeqCst)
        }

        async fn add_file_from_uuid(&self, uuid: &FileUuid) -> SyncResult<()> {
            if !self.ready_now() {
                return Err(SyncError::WidgetUnavailable);
            }
            self.record(WidgetCall::AddFromUuid(uuid.to_string()));
            Ok(())
        }

        async fn add_file_from_cdn_url(&self, url: &str) -> SyncResult<()> {
            if !self.ready_now() {
                return Err(SyncError::WidgetUnavailable);
            }
            self.record(WidgetCall::AddFromCdnUrl(url.to_string()));
            Ok(())
        }

        async fn remove_all_files(&self) -> SyncResult<()> {
            self.record(WidgetCall::RemoveAll);
            Ok(())
        }

        async fn value(&self) -> SyncResult<Value> {
            Ok(self.value.lock().unwrap().clone())
        }

        async fn relax_required_input(&self) -> SyncResult<()> {
            self.record(WidgetCall::RelaxRequired);
            Ok(())
        }
    }
}
