//! Host form framework binding.
//!
//! One two-way-bound property carries the canonical value. Outbound writes
//! go through this trait; inbound changes (including the host's echo of
//! our own writes) reach the driver through its host-change channel.

use crate::error::SyncResult;
use async_trait::async_trait;
use serde_json::Value;

/// Write access to the host-bound state property.
#[async_trait]
pub trait HostBinding: Send + Sync {
    /// Writes the canonical value into the bound property.
    async fn write_state(&self, value: Value) -> SyncResult<()>;
}

/// A mock host binding for testing.
pub mod mock {
    use super::*;
    use std::sync::{Arc, Mutex};
    use tokio::sync::mpsc;

    /// A mock binding recording every write, optionally echoing each write
    /// back as an inbound change the way a real two-way binding does.
    #[derive(Debug)]
    pub struct MockHost {
        writes: Arc<Mutex<Vec<Value>>>,
        echo_tx: Mutex<Option<mpsc::UnboundedSender<Value>>>,
    }

    impl MockHost {
        /// Creates a binding that only records.
        pub fn new() -> Self {
            Self {
                writes: Arc::new(Mutex::new(Vec::new())),
                echo_tx: Mutex::new(None),
            }
        }

        /// Makes every subsequent write echo into the given channel.
        pub fn echo_into(&self, tx: mpsc::UnboundedSender<Value>) {
            *self.echo_tx.lock().unwrap() = Some(tx);
        }

        /// Returns all recorded writes so far.
        pub fn writes(&self) -> Vec<Value> {
            self.writes.lock().unwrap().clone()
        }
    }

    impl Default for MockHost {
        fn default() -> Self {
            Self::new()
        }
    }

    #[async_trait]
    impl HostBinding for MockHost {
        async fn write_state(&self, value: Value) -> SyncResult<()> {
            self.writes.lock().unwrap().push(value.clone());
            if let Some(tx) = self.echo_tx.lock().unwrap().as_ref() {
                let _ = tx.send(value);
            }
            Ok(())
        }
    }
}
