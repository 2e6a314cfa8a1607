//! File-group expansion.
//!
//! Widgets configured for grouped output hand back one group URL standing
//! for several files. Expanding a group into its members needs the
//! network, so it lives behind a trait; an expansion failure falls back to
//! the unexpanded group descriptor rather than dropping files.

use crate::error::{SyncError, SyncResult};
use async_trait::async_trait;
use uploadfield_types::{FileDescriptor, GroupRef};

/// Expands a file-group reference into its member descriptors.
#[async_trait]
pub trait GroupExpander: Send + Sync {
    /// Resolves the group's members. Implementations should return the
    /// members in group order.
    async fn expand(&self, group: &GroupRef) -> SyncResult<Vec<FileDescriptor>>;
}

/// Default expander: always fails, so callers keep the unexpanded group
/// descriptor. Correct for deployments that never enable grouped output.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoGroupExpander;

#[async_trait]
impl GroupExpander for NoGroupExpander {
    async fn expand(&self, _group: &GroupRef) -> SyncResult<Vec<FileDescriptor>> {
        Err(SyncError::GroupExpansion("no expander configured".into()))
    }
}
