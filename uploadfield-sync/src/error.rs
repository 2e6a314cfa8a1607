//! Error types for the sync layer.

use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur in sync operations.
///
/// None of these propagate to the host framework: the driver absorbs every
/// fault at the point of occurrence and logs it. The worst user-visible
/// effect of any variant is a stale or empty file list.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The widget API is not (yet) available.
    #[error("widget not ready")]
    WidgetUnavailable,

    /// The widget never became ready within the bounded retry loop.
    #[error("widget failed to initialize after {attempts} attempts")]
    WidgetRetriesExhausted { attempts: u32 },

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A file-group reference could not be expanded into its members.
    #[error("group expansion failed: {0}")]
    GroupExpansion(String),

    /// The host-bound property is gone (instance torn down host-side).
    #[error("host binding detached")]
    HostDetached,

    /// The field instance was destroyed.
    #[error("field instance destroyed")]
    Destroyed,
}
