//! Canonical file list store.
//!
//! The authoritative in-memory descriptor list for one field instance,
//! split into two layers:
//!
//! - [`list`] — pure list algebra (add/update/remove) with no state;
//! - [`FileStore`] — the cached canonical serialization plus commit-time
//!   change detection over it.
//!
//! Invariant: no two entries resolve to the same non-null UUID. Entries
//! without an extractable UUID are never deduplicated (best-effort only).
//!
//! Nothing in this crate returns an error: malformed cached state degrades
//! to an empty list, unmatched updates/removes are counted no-ops.

pub mod list;
mod store;

pub use list::{add, remove, update_url, Mutation, StoreMode, UrlUpdate};
pub use store::{CommitOutcome, FileStore, StoreCounters};
