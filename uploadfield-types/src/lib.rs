//! Core type definitions for the upload field engine.
//!
//! This crate defines the descriptor model shared by the store and sync
//! layers:
//! - File identity (UUID extracted from CDN URLs or rich objects)
//! - The descriptor union (bare URL vs rich metadata object)
//! - Recursive shape normalization for persisted values (JSON string vs
//!   object vs double-encoded JSON, single item vs list)
//! - Wire (de)serialization for the host-bound state property
//!
//! Everything here is synchronous and I/O-free. Normalization APIs are
//! total: malformed input degrades to an empty or best-effort result,
//! never a panic.

mod descriptor;
mod ids;
mod normalize;
pub mod wire;

pub use descriptor::{modifiers_from_url, FileDescriptor, GroupRef, RichFile};
pub use ids::FileUuid;
pub use normalize::{dedup_by_uuid, normalize_raw, normalize_value, FileRef};

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur at explicit parse entry points.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid UUID: {0}")]
    InvalidUuid(#[from] uuid::Error),
}
