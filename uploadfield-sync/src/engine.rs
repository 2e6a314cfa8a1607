//! Reconciliation engine — stateful sync logic without I/O.
//!
//! The engine is a pure state machine. It consumes widget events, host
//! state changes and timer firings, and produces `Command`s. The driver
//! handles all I/O (widget calls, host writes, timers), so everything
//! here is testable without a runtime.
//!
//! Data flow: widget events → ingest buffer → flush → store commit →
//! outbound host write (guard armed). Host changes → inbound sync →
//! guard echo consumption, or store merge/clear → re-commit. There is no
//! global order between the two sources; the loop guard is what keeps
//! the cycle from feeding back.

use crate::config::FieldConfig;
use crate::events::FieldEvent;
use crate::guard::LoopGuard;
use crate::hydrate;
use crate::ingest::PendingBuffer;
use crate::registry::InitRegistry;
use crate::widget::{EventDetail, WidgetEvent};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use uploadfield_store::{CommitOutcome, FileStore, Mutation, StoreCounters};
use uploadfield_types::{dedup_by_uuid, normalize_value, wire, FileDescriptor, FileUuid};

/// Lifecycle of one field instance.
///
/// `Uninitialized → AwaitingWidget (polling) → Hydrating → Ready`; from
/// `Ready` every transition is event-driven and returns to `Ready`.
/// `Unavailable` (retries exhausted) and `Destroyed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    /// Not yet begun.
    Uninitialized,
    /// Polling for widget readiness.
    AwaitingWidget {
        /// Failed probes so far.
        attempt: u32,
    },
    /// Widget ready; hydration in flight.
    Hydrating,
    /// Fully live: ingest and both sync directions active.
    Ready,
    /// The widget never became ready; the field stays visible but
    /// unsynchronized.
    Unavailable,
    /// Torn down; every input is a no-op.
    Destroyed,
}

/// Commands the engine hands back for the driver to execute.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Register a file with the widget by UUID.
    AddFileFromUuid(FileUuid),
    /// Register a file with the widget by full CDN URL.
    AddFileFromCdnUrl(String),
    /// Remove every file from the widget.
    RemoveAllFiles,
    /// Write the canonical value into the host-bound property.
    WriteHostState(Value),
    /// (Re)arm the readiness poll timer.
    ScheduleReadinessPoll(Duration),
    /// (Re)arm the debounce flush timer, replacing any pending deadline.
    ScheduleFlush(Duration),
    /// Lift the loop guard after the host's next render tick.
    ReleaseGuardAfterTick,
    /// Strip `required` from the widget's companion form input.
    RelaxRequiredInput,
    /// Hand the initial value to the driver for async hydration
    /// (locales wait + group expansion), which then calls
    /// [`FieldEngine::complete_hydration`].
    BeginHydration(Value),
    /// Broadcast a field event.
    Notify(FieldEvent),
}

/// The reconciliation engine for one field instance.
pub struct FieldEngine {
    config: FieldConfig,
    /// Write-once initial value, consumed by hydration.
    initial_state: Option<Value>,
    store: FileStore,
    pending: PendingBuffer,
    guard: LoopGuard,
    lifecycle: Lifecycle,
    registry: InitRegistry,
    owns_claim: bool,
    /// Hydration ran (it runs at most once).
    state_has_been_initialized: bool,
    /// At least one host-bound value was observed.
    seen_host_value: bool,
}

impl FieldEngine {
    /// Creates an engine for one field instance.
    #[must_use]
    pub fn new(config: FieldConfig, initial_state: Option<Value>, registry: InitRegistry) -> Self {
        let store = FileStore::new(config.store_mode());
        Self {
            config,
            initial_state,
            store,
            pending: PendingBuffer::new(),
            guard: LoopGuard::new(),
            lifecycle: Lifecycle::Uninitialized,
            registry,
            owns_claim: false,
            state_has_been_initialized: false,
            seen_host_value: false,
        }
    }

    /// Returns the instance configuration.
    #[must_use]
    pub fn config(&self) -> &FieldConfig {
        &self.config
    }

    /// Returns the current lifecycle state.
    #[must_use]
    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    /// Returns the store's no-op counters.
    #[must_use]
    pub fn counters(&self) -> StoreCounters {
        self.store.counters()
    }

    /// Parses the canonical list out of the store cache.
    pub fn current_files(&mut self) -> Vec<FileDescriptor> {
        self.store.current_files()
    }

    /// Returns whether the loop guard is armed.
    #[must_use]
    pub fn is_guard_armed(&self) -> bool {
        self.guard.is_armed()
    }

    /// Number of buffered, not-yet-flushed mutations.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    // ── Initialization ───────────────────────────────────────────

    /// Begins initialization: claims the context in the registry and
    /// starts the readiness poll. A context that is already claimed
    /// (host re-render) skips straight to `Destroyed` and does nothing.
    pub fn begin(&mut self) -> Vec<Command> {
        if self.lifecycle != Lifecycle::Uninitialized {
            return Vec::new();
        }
        if !self.registry.try_claim(&self.config.ctx_name) {
            self.lifecycle = Lifecycle::Destroyed;
            return Vec::new();
        }
        self.owns_claim = true;
        self.lifecycle = Lifecycle::AwaitingWidget { attempt: 0 };
        vec![Command::ScheduleReadinessPoll(Duration::ZERO)]
    }

    /// Feeds one readiness probe result. Bounded: after
    /// `max_widget_retries` failed probes the field parks in
    /// `Unavailable` — logged, non-fatal.
    pub fn widget_readiness(&mut self, ready: bool) -> Vec<Command> {
        let Lifecycle::AwaitingWidget { attempt } = self.lifecycle else {
            return Vec::new();
        };

        if ready {
            debug!(
                "widget for {} ready after {} probe(s)",
                self.config.ctx_name,
                attempt + 1
            );
            self.lifecycle = Lifecycle::Hydrating;
            let mut commands = vec![
                Command::RelaxRequiredInput,
                Command::Notify(FieldEvent::WidgetReady),
            ];
            match self.initial_state.take() {
                Some(value) if !wire::is_empty_state(&value) => {
                    commands.push(Command::BeginHydration(value));
                }
                _ => commands.extend(self.complete_hydration(Vec::new())),
            }
            return commands;
        }

        let next = attempt + 1;
        if next >= self.config.max_widget_retries {
            error!(
                "widget for {} failed to initialize after {} retries",
                self.config.ctx_name, next
            );
            self.lifecycle = Lifecycle::Unavailable;
            return Vec::new();
        }
        self.lifecycle = Lifecycle::AwaitingWidget { attempt: next };
        vec![Command::ScheduleReadinessPoll(
            self.config.widget_retry_interval,
        )]
    }

    /// Finishes hydration with the normalized (and group-expanded)
    /// descriptors. Runs at most once; the result becomes the store's
    /// baseline without raising the guard or writing the host.
    pub fn complete_hydration(&mut self, descriptors: Vec<FileDescriptor>) -> Vec<Command> {
        if self.state_has_been_initialized {
            debug!("state already initialized for {}", self.config.ctx_name);
            return Vec::new();
        }
        self.state_has_been_initialized = true;

        let descriptors = dedup_by_uuid(descriptors);
        let mut commands = Vec::new();
        if !descriptors.is_empty() {
            // Clear whatever the widget restored on its own before
            // re-registering the persisted files.
            commands.push(Command::RemoveAllFiles);
            commands.extend(hydrate::plan_registration(&descriptors));
        }
        self.store.seed(&descriptors);
        self.lifecycle = Lifecycle::Ready;
        info!(
            "hydrated {} with {} file(s)",
            self.config.ctx_name,
            descriptors.len()
        );
        commands.push(Command::Notify(FieldEvent::Hydrated {
            count: descriptors.len(),
        }));
        commands
    }

    // ── Event-driven ingest ──────────────────────────────────────

    /// Consumes one widget event: filters it to this instance, buffers
    /// its mutation and resets the debounce timer.
    pub fn widget_event(&mut self, event: WidgetEvent) -> Vec<Command> {
        if event.ctx_name != self.config.ctx_name {
            debug!(
                "dropping event for foreign context {} (we are {})",
                event.ctx_name, self.config.ctx_name
            );
            return Vec::new();
        }
        if !matches!(self.lifecycle, Lifecycle::Hydrating | Lifecycle::Ready) {
            debug!("dropping widget event in {:?}", self.lifecycle);
            return Vec::new();
        }

        match event.detail {
            EventDetail::UploadStarted => {
                vec![Command::Notify(FieldEvent::UploadStarted)]
            }
            EventDetail::UploadSuccess(descriptor) => {
                let stored = if self.config.is_with_metadata {
                    descriptor
                } else {
                    FileDescriptor::Url(descriptor.cdn_url().to_string())
                };
                self.pending.push(Mutation::Add(stored));
                vec![Command::ScheduleFlush(self.config.debounce)]
            }
            ref detail @ EventDetail::UrlChanged { .. } => {
                match detail.as_url_update() {
                    Some(update)
                        if update
                            .cdn_url_modifiers
                            .as_deref()
                            .is_some_and(|m| !m.is_empty()) =>
                    {
                        self.pending.push(Mutation::UpdateUrl(update));
                        vec![Command::ScheduleFlush(self.config.debounce)]
                    }
                    // An unmodified URL report is redundant.
                    _ => {
                        debug!("ignoring url change without modifiers");
                        Vec::new()
                    }
                }
            }
            EventDetail::Removed(descriptor) => {
                self.pending.push(Mutation::Remove(descriptor));
                vec![Command::ScheduleFlush(self.config.debounce)]
            }
        }
    }

    /// Drains the ingest buffer in arrival order, applies every mutation
    /// and commits once.
    pub fn flush(&mut self) -> Vec<Command> {
        if self.pending.is_empty() || !matches!(self.lifecycle, Lifecycle::Hydrating | Lifecycle::Ready)
        {
            return Vec::new();
        }

        let batch = self.pending.drain();
        debug!("flushing {} buffered mutation(s)", batch.len());
        let mut list = self.store.current_files();
        for mutation in &batch {
            list = self.store.apply(list, mutation);
        }

        if self.config.is_multiple
            && self.config.multiple_max > 0
            && list.len() > self.config.multiple_max as usize
        {
            warn!(
                "{} holds {} files, above the configured maximum of {}",
                self.config.ctx_name,
                list.len(),
                self.config.multiple_max
            );
        }

        match self.store.commit(&list) {
            CommitOutcome::Unchanged => Vec::new(),
            CommitOutcome::Committed { .. } => self.outbound(&list),
        }
    }

    // ── Inbound sync ─────────────────────────────────────────────

    /// Consumes one host-bound property change.
    pub fn host_changed(&mut self, value: Value) -> Vec<Command> {
        if self.lifecycle == Lifecycle::Destroyed {
            return Vec::new();
        }

        if self.guard.absorb() {
            debug!("absorbed echo of our own host write");
            self.seen_host_value = true;
            return Vec::new();
        }

        // The very first observed value before hydration is the baseline,
        // not a delta.
        if !self.seen_host_value && !self.state_has_been_initialized {
            self.seen_host_value = true;
            debug!("adopting first observed host value as baseline");
            let raw = match value {
                Value::String(s) => s,
                other => other.to_string(),
            };
            self.store.restore_cached(raw);
            return Vec::new();
        }
        self.seen_host_value = true;

        if wire::is_empty_state(&value) {
            if self.store.current_files().is_empty() {
                return Vec::new();
            }
            info!("external clear of {}", self.config.ctx_name);
            self.pending.clear();
            let _ = self.store.commit(&[]);
            return vec![
                Command::RemoveAllFiles,
                Command::Notify(FieldEvent::ExternalCleared),
            ];
        }

        let external = normalize_value(&value);
        if external.is_empty() {
            debug!("ignoring unreadable external value");
            return Vec::new();
        }

        let current = self.store.current_files();
        let mut commands: Vec<Command> = external
            .iter()
            .filter(|incoming| !current.iter().any(|held| held.same_file(incoming)))
            .map(|incoming| Command::AddFileFromCdnUrl(incoming.cdn_url().to_string()))
            .collect();

        // Host state is authoritative on conflict: the store is rebuilt to
        // exactly the external content, keeping richer metadata we already
        // held for matching UUIDs.
        let rebuilt: Vec<FileDescriptor> = external
            .iter()
            .map(|incoming| {
                let held = incoming
                    .file_uuid()
                    .and_then(|uuid| current.iter().find(|c| c.file_uuid() == Some(uuid)));
                match held {
                    Some(existing) => merge_preferring_richer(existing, incoming),
                    None => incoming.clone(),
                }
            })
            .collect();

        if !self.pending.is_empty() {
            debug!(
                "discarding {} pending local mutation(s): host state wins",
                self.pending.len()
            );
            self.pending.clear();
        }

        match self.store.commit(&rebuilt) {
            CommitOutcome::Unchanged => {}
            CommitOutcome::Committed { .. } => commands.extend(self.outbound(&rebuilt)),
        }
        commands
    }

    /// Lifts the loop guard; the driver calls this on the host's next
    /// render tick after a multi-file commit.
    pub fn release_guard(&mut self) {
        self.guard.release();
    }

    // ── Teardown ─────────────────────────────────────────────────

    /// Destroys the instance: releases the registry claim and makes every
    /// further input a no-op.
    pub fn destroy(&mut self) -> Vec<Command> {
        if self.lifecycle == Lifecycle::Destroyed {
            return Vec::new();
        }
        if self.owns_claim {
            self.registry.release(&self.config.ctx_name);
            self.owns_claim = false;
        }
        self.pending.clear();
        self.guard.release();
        self.lifecycle = Lifecycle::Destroyed;
        vec![Command::Notify(FieldEvent::Destroyed)]
    }

    // ── Outbound sync ────────────────────────────────────────────

    /// Builds the outbound command sequence for a real commit: arm the
    /// guard, write the host, and (in multiple mode) keep the guard up
    /// until the host's next tick so its echo is absorbed first.
    fn outbound(&mut self, list: &[FileDescriptor]) -> Vec<Command> {
        self.guard.arm(self.config.is_multiple);
        let wire_value = wire::build_wire_value(
            list,
            self.config.is_multiple,
            self.config.is_with_metadata,
        );
        let mut commands = vec![Command::WriteHostState(wire_value)];
        if self.config.is_multiple {
            commands.push(Command::ReleaseGuardAfterTick);
        }
        commands.push(Command::Notify(FieldEvent::Committed { count: list.len() }));
        commands
    }
}

/// Merges an externally supplied descriptor with the one the store already
/// held for the same UUID. External values win where present; the held
/// entry fills what the external one lacks.
fn merge_preferring_richer(held: &FileDescriptor, incoming: &FileDescriptor) -> FileDescriptor {
    match (held, incoming) {
        (FileDescriptor::Rich(existing), FileDescriptor::Url(url)) => {
            let mut kept = existing.clone();
            if kept.cdn_url != *url {
                kept.apply_url_change(url, None);
            }
            FileDescriptor::Rich(kept)
        }
        (FileDescriptor::Rich(existing), FileDescriptor::Rich(thin)) => {
            let mut merged = thin.clone();
            merged.fill_missing_from(existing);
            FileDescriptor::Rich(merged)
        }
        _ => incoming.clone(),
    }
}
