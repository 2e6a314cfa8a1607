//! Observable field events.
//!
//! Emitted by the driver for host application hooks (e.g. an "uploading"
//! activity indicator or an audit trail). Purely informational; the engine
//! never depends on anyone listening.

/// Notifications broadcast by a running field instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldEvent {
    /// The widget API became ready.
    WidgetReady,
    /// An upload began in the widget.
    UploadStarted,
    /// Hydration finished with this many files.
    Hydrated { count: usize },
    /// A commit changed the canonical list to this many files.
    Committed { count: usize },
    /// An external host-state change cleared the list.
    ExternalCleared,
    /// The instance was torn down.
    Destroyed,
}
