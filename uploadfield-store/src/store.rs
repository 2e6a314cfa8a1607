//! The per-instance store: cached canonical serialization plus commit.
//!
//! The cached string is the only mutable shared state per field instance.
//! It is mutated exclusively here (`commit`, `seed`, cache recovery), which
//! serializes all writers through one synchronous call path.

use crate::list::{self, Mutation, StoreMode};
use serde_json::Value;
use tracing::{debug, warn};
use uploadfield_types::wire;
use uploadfield_types::FileDescriptor;

/// Outcome of a commit attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    /// Serialization normalizes equal to the cache; nothing to sync.
    Unchanged,
    /// The cache was updated; the serialized value must go outbound.
    Committed {
        /// The new canonical serialization.
        serialized: String,
    },
}

/// Observability counters for silently-absorbed no-ops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreCounters {
    /// URL changes whose UUID matched no entry.
    pub unmatched_updates: u64,
    /// Removals whose UUID matched no entry.
    pub unmatched_removals: u64,
    /// Cached serializations reconstructed from a shredded shape.
    pub recovered_caches: u64,
}

/// Authoritative in-memory file list for one field instance.
#[derive(Debug, Clone)]
pub struct FileStore {
    mode: StoreMode,
    /// Cached canonical serialization; always a JSON array once non-empty.
    cached: String,
    counters: StoreCounters,
}

impl FileStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new(mode: StoreMode) -> Self {
        Self {
            mode,
            cached: String::new(),
            counters: StoreCounters::default(),
        }
    }

    /// Returns the store's mode flags.
    #[must_use]
    pub fn mode(&self) -> StoreMode {
        self.mode
    }

    /// Returns the cached canonical serialization.
    #[must_use]
    pub fn cached(&self) -> &str {
        &self.cached
    }

    /// Returns the no-op counters.
    #[must_use]
    pub fn counters(&self) -> StoreCounters {
        self.counters
    }

    /// Parses the cached serialization into descriptors. Any parse failure
    /// or non-list result yields the empty list. A cache shredded into an
    /// object-as-character-map is heuristically reconstructed first.
    pub fn current_files(&mut self) -> Vec<FileDescriptor> {
        if self.cached.trim().is_empty() {
            return Vec::new();
        }
        if let Some(list) = wire::parse_list(&self.cached) {
            return list;
        }
        if let Some(reconstructed) = recover_shredded(&self.cached) {
            warn!("cached serialization was shredded into a character map; reconstructed");
            self.counters.recovered_caches += 1;
            self.cached = reconstructed;
            return wire::parse_list(&self.cached).unwrap_or_default();
        }
        debug!("cached serialization unreadable, treating as empty");
        Vec::new()
    }

    /// Applies one buffered mutation to a working list, counting no-ops.
    pub fn apply(&mut self, list: Vec<FileDescriptor>, mutation: &Mutation) -> Vec<FileDescriptor> {
        match mutation {
            Mutation::Add(new_file) => list::add(&list, new_file.clone(), self.mode),
            Mutation::UpdateUrl(update) => {
                match list::update_url(&list, update, self.mode) {
                    Some(next) => next,
                    None => {
                        self.counters.unmatched_updates += 1;
                        list
                    }
                }
            }
            Mutation::Remove(target) => match list::remove(&list, target, self.mode) {
                Some(next) => next,
                None => {
                    self.counters.unmatched_removals += 1;
                    list
                }
            },
        }
    }

    /// Serializes the list and compares it to the cache with a normalized
    /// comparison; only a genuine difference updates the cache.
    pub fn commit(&mut self, list: &[FileDescriptor]) -> CommitOutcome {
        let serialized = wire::serialize_list(list, self.mode.with_metadata);
        if wire::normalized_eq(&serialized, &self.cached) {
            return CommitOutcome::Unchanged;
        }
        self.cached = serialized.clone();
        CommitOutcome::Committed { serialized }
    }

    /// Writes the post-hydration baseline directly into the cache, without
    /// signaling a change. Returns the baseline serialization.
    pub fn seed(&mut self, list: &[FileDescriptor]) -> String {
        self.cached = wire::serialize_list(list, self.mode.with_metadata);
        self.cached.clone()
    }

    /// Restores a cached serialization verbatim, e.g. the first host-bound
    /// value observed before hydration, adopted as baseline rather than as
    /// a delta. The text is taken as-is; `current_files` copes with
    /// whatever shape it turns out to be.
    pub fn restore_cached(&mut self, serialized: String) {
        self.cached = serialized;
    }
}

/// Detects the shredded-cache corruption: a JSON object whose keys are the
/// consecutive integers `0..n` and whose values are single-character
/// strings is a string that was spread into a character map. Reassembles
/// the original string.
fn recover_shredded(cached: &str) -> Option<String> {
    let value: Value = serde_json::from_str(cached).ok()?;
    let map = value.as_object()?;
    if map.is_empty() {
        return None;
    }

    let mut chars: Vec<(usize, char)> = Vec::with_capacity(map.len());
    for (key, entry) in map {
        let index: usize = key.parse().ok()?;
        let s = entry.as_str()?;
        let mut iter = s.chars();
        let c = iter.next()?;
        if iter.next().is_some() {
            return None;
        }
        chars.push((index, c));
    }

    chars.sort_by_key(|&(index, _)| index);
    if chars.iter().enumerate().any(|(i, &(index, _))| i != index) {
        return None;
    }

    Some(chars.into_iter().map(|(_, c)| c).collect())
}
