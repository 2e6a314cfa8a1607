//! Bidirectional state reconciliation for the upload field.
//!
//! Keeps the canonical list of uploaded-file descriptors consistent
//! between two independently-clocked sources: the upload widget's event
//! stream and the host form framework's two-way-bound state property.
//! Tolerates bursty/out-of-order events, ambiguous serialization shapes,
//! single-vs-multiple modes and a widget whose readiness is only
//! discoverable by polling — without ever corrupting the list or feeding
//! an update loop.
//!
//! # Architecture
//!
//! The engine is a pure state machine. It consumes widget events, host
//! changes and timer firings, and produces [`Command`]s. The driver
//! handles all I/O (widget calls, host writes, timers).
//!
//! ## Components
//!
//! - **Engine**: lifecycle state machine, ingest, inbound/outbound sync
//! - **Guard**: suppresses the host's echo of our own writes
//! - **Ingest**: debounced FIFO buffering of widget events
//! - **Hydrate**: one-time normalization and loading of persisted state
//! - **Driver**: the per-instance `select!` loop executing commands
//!
//! ## Sync process
//!
//! 1. **Init**: claim the context, poll for widget readiness (bounded)
//! 2. **Hydrate**: normalize the persisted value, register files
//! 3. **Ingest**: buffer widget events, flush after the debounce window
//! 4. **Outbound**: commit to the host-bound property, guard armed
//! 5. **Inbound**: absorb echoes, merge or clear on genuine changes
//!
//! # Example
//!
//! ```
//! use uploadfield_sync::{FieldConfig, FieldEngine, InitRegistry};
//!
//! let config = FieldConfig {
//!     ctx_name: "form.attachments".to_string(),
//!     is_multiple: true,
//!     ..Default::default()
//! };
//!
//! let mut engine = FieldEngine::new(config, None, InitRegistry::new());
//! let commands = engine.begin();
//! assert!(!commands.is_empty());
//! ```

mod config;
mod driver;
mod engine;
mod error;
mod events;
mod group;
mod guard;
pub mod host;
pub mod hydrate;
mod ingest;
mod registry;
pub mod widget;

pub use config::{parse_size, validate_crop_preset, ConfigError, FieldConfig};
pub use driver::{spawn_field, FieldHandle, FieldPorts};
pub use engine::{Command, FieldEngine, Lifecycle};
pub use error::{SyncError, SyncResult};
pub use events::FieldEvent;
pub use group::{GroupExpander, NoGroupExpander};
pub use guard::LoopGuard;
pub use host::HostBinding;
pub use hydrate::{LocalesAlwaysReady, LocalesProbe};
pub use ingest::PendingBuffer;
pub use registry::InitRegistry;
pub use widget::{EventDetail, UploadWidget, WidgetEvent};
