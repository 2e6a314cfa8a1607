//! Process-wide init registry.
//!
//! The host framework re-renders liberally, and every re-render re-runs
//! field init. The registry deduplicates: one claim per context name,
//! process-wide. It is injected explicitly into each engine rather than
//! living as ambient global state.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Shared set of context names whose instance already initialized.
#[derive(Debug, Clone, Default)]
pub struct InitRegistry {
    claimed: Arc<Mutex<HashSet<String>>>,
}

impl InitRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims a context name. Returns false when it was already claimed,
    /// in which case the caller must skip initialization.
    pub fn try_claim(&self, ctx_name: &str) -> bool {
        let claimed = self.claimed.lock().unwrap().insert(ctx_name.to_string());
        if !claimed {
            debug!("context {ctx_name} already initialized, skipping");
        }
        claimed
    }

    /// Releases a claim on teardown so a later re-mount can init again.
    pub fn release(&self, ctx_name: &str) {
        self.claimed.lock().unwrap().remove(ctx_name);
    }

    /// Returns whether a context name is currently claimed.
    #[must_use]
    pub fn is_claimed(&self, ctx_name: &str) -> bool {
        self.claimed.lock().unwrap().contains(ctx_name)
    }
}
