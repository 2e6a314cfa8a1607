//! Field driver — the I/O shell around the engine.
//!
//! One task per field instance serializes everything: widget events, host
//! state changes, the debounce flush and the readiness poll all pass
//! through a single `select!` loop, so no two engine steps ever
//! interleave. The engine stays pure; this is where its commands touch
//! the widget, the host binding, and the clock.
//!
//! Every fault is absorbed here with a log line. Nothing propagates to
//! the host framework.

use crate::engine::{Command, FieldEngine, Lifecycle};
use crate::events::FieldEvent;
use crate::group::{GroupExpander, NoGroupExpander};
use crate::host::HostBinding;
use crate::hydrate::{self, LocalesAlwaysReady, LocalesProbe};
use crate::widget::{UploadWidget, WidgetEvent};
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::warn;

/// Capacity of the field event broadcast channel; a slow subscriber loses
/// old notifications rather than blocking the loop.
const EVENT_CHANNEL_CAPACITY: usize = 32;

/// The external collaborators of one field instance.
pub struct FieldPorts {
    /// The upload widget's capability API.
    pub widget: Arc<dyn UploadWidget>,
    /// The host-bound state property.
    pub host: Arc<dyn HostBinding>,
    /// File-group expansion (network).
    pub groups: Arc<dyn GroupExpander>,
    /// Widget locale readiness probe.
    pub locales: Arc<dyn LocalesProbe>,
}

impl FieldPorts {
    /// Creates ports with the default (inert) group expander and an
    /// always-ready locales probe.
    pub fn new(widget: Arc<dyn UploadWidget>, host: Arc<dyn HostBinding>) -> Self {
        Self {
            widget,
            host,
            groups: Arc::new(NoGroupExpander),
            locales: Arc::new(LocalesAlwaysReady),
        }
    }

    /// Replaces the group expander.
    #[must_use]
    pub fn with_groups(mut self, groups: Arc<dyn GroupExpander>) -> Self {
        self.groups = groups;
        self
    }

    /// Replaces the locales probe.
    #[must_use]
    pub fn with_locales(mut self, locales: Arc<dyn LocalesProbe>) -> Self {
        self.locales = locales;
        self
    }
}

enum DriverCommand {
    Destroy,
}

/// Handle to a running field instance.
///
/// Dropping the handle closes the input channels, which stops the loop on
/// its next turn; `destroy` tears down explicitly.
pub struct FieldHandle {
    widget_tx: mpsc::UnboundedSender<WidgetEvent>,
    host_tx: mpsc::UnboundedSender<Value>,
    control_tx: mpsc::UnboundedSender<DriverCommand>,
    events_tx: broadcast::Sender<FieldEvent>,
    join: JoinHandle<()>,
}

impl FieldHandle {
    /// Feeds one widget event into the instance.
    pub fn widget_event(&self, event: WidgetEvent) {
        let _ = self.widget_tx.send(event);
    }

    /// Feeds one host-bound property change into the instance.
    pub fn host_changed(&self, value: Value) {
        let _ = self.host_tx.send(value);
    }

    /// Returns a sender feeding the host-change channel, for bindings that
    /// push their own change notifications (echoes included).
    pub fn host_sender(&self) -> mpsc::UnboundedSender<Value> {
        self.host_tx.clone()
    }

    /// Subscribes to field event notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<FieldEvent> {
        self.events_tx.subscribe()
    }

    /// Requests teardown: listeners detach and every in-flight timer
    /// becomes a no-op.
    pub fn destroy(&self) {
        let _ = self.control_tx.send(DriverCommand::Destroy);
    }

    /// Waits for the instance loop to finish.
    pub async fn stopped(self) {
        let _ = self.join.await;
    }
}

/// Spawns the driver task for one engine and returns its handle.
pub fn spawn_field(engine: FieldEngine, ports: FieldPorts) -> FieldHandle {
    let (widget_tx, widget_rx) = mpsc::unbounded_channel();
    let (host_tx, host_rx) = mpsc::unbounded_channel();
    let (control_tx, control_rx) = mpsc::unbounded_channel();
    let (events_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

    let join = tokio::spawn(run_event_loop(
        engine,
        ports,
        widget_rx,
        host_rx,
        control_rx,
        events_tx.clone(),
    ));

    FieldHandle {
        widget_tx,
        host_tx,
        control_tx,
        events_tx,
        join,
    }
}

/// Runs the per-instance event loop.
async fn run_event_loop(
    mut engine: FieldEngine,
    ports: FieldPorts,
    mut widget_rx: mpsc::UnboundedReceiver<WidgetEvent>,
    mut host_rx: mpsc::UnboundedReceiver<Value>,
    mut control_rx: mpsc::UnboundedReceiver<DriverCommand>,
    events_tx: broadcast::Sender<FieldEvent>,
) {
    // Single replaceable deadlines: scheduling again moves them.
    let mut flush_at: Option<Instant> = None;
    let mut poll_at: Option<Instant> = None;

    let startup = engine.begin();
    execute(
        &mut engine,
        &ports,
        &events_tx,
        &mut host_rx,
        &mut flush_at,
        &mut poll_at,
        startup,
    )
    .await;

    loop {
        if engine.lifecycle() == Lifecycle::Destroyed {
            break;
        }

        let commands = tokio::select! {
            maybe_command = control_rx.recv() => match maybe_command {
                Some(DriverCommand::Destroy) | None => engine.destroy(),
            },
            Some(event) = widget_rx.recv() => engine.widget_event(event),
            Some(value) = host_rx.recv() => engine.host_changed(value),
            _ = sleep_until_opt(flush_at), if flush_at.is_some() => {
                flush_at = None;
                engine.flush()
            }
            _ = sleep_until_opt(poll_at), if poll_at.is_some() => {
                poll_at = None;
                engine.widget_readiness(ports.widget.is_ready())
            }
            else => engine.destroy(),
        };

        execute(
            &mut engine,
            &ports,
            &events_tx,
            &mut host_rx,
            &mut flush_at,
            &mut poll_at,
            commands,
        )
        .await;
    }
}

async fn sleep_until_opt(at: Option<Instant>) {
    match at {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => futures::future::pending().await,
    }
}

/// Executes a command batch in order. Hydration and guard release expand
/// into further engine calls whose commands join the back of the queue.
#[allow(clippy::too_many_arguments)]
async fn execute(
    engine: &mut FieldEngine,
    ports: &FieldPorts,
    events_tx: &broadcast::Sender<FieldEvent>,
    host_rx: &mut mpsc::UnboundedReceiver<Value>,
    flush_at: &mut Option<Instant>,
    poll_at: &mut Option<Instant>,
    commands: Vec<Command>,
) {
    let mut queue: VecDeque<Command> = commands.into();
    while let Some(command) = queue.pop_front() {
        match command {
            Command::AddFileFromUuid(uuid) => {
                if let Err(error) = ports.widget.add_file_from_uuid(&uuid).await {
                    warn!("widget add-by-uuid failed: {error}");
                }
            }
            Command::AddFileFromCdnUrl(url) => {
                if let Err(error) = ports.widget.add_file_from_cdn_url(&url).await {
                    warn!("widget add-by-url failed: {error}");
                }
            }
            Command::RemoveAllFiles => {
                if let Err(error) = ports.widget.remove_all_files().await {
                    warn!("widget clear failed: {error}");
                }
            }
            Command::WriteHostState(value) => {
                if let Err(error) = ports.host.write_state(value).await {
                    warn!("host state write failed: {error}");
                }
            }
            Command::ScheduleFlush(delay) => {
                *flush_at = Some(Instant::now() + delay);
            }
            Command::ScheduleReadinessPoll(delay) => {
                *poll_at = Some(Instant::now() + delay);
            }
            Command::RelaxRequiredInput => {
                if let Err(error) = ports.widget.relax_required_input().await {
                    warn!("relaxing required input failed: {error}");
                }
            }
            Command::ReleaseGuardAfterTick => {
                // Let the host's own echo of our write arrive, absorb it,
                // then lift the guard.
                tokio::task::yield_now().await;
                while let Ok(value) = host_rx.try_recv() {
                    queue.extend(engine.host_changed(value));
                }
                engine.release_guard();
            }
            Command::BeginHydration(value) => {
                wait_for_locales(engine, ports).await;
                let normalized = hydrate::normalize_initial(&value);
                let resolved = hydrate::resolve_groups(normalized, ports.groups.as_ref()).await;
                queue.extend(engine.complete_hydration(resolved));
            }
            Command::Notify(event) => {
                let _ = events_tx.send(event);
            }
        }
    }
}

/// Bounded wait for widget locales: poll count × fixed interval, then
/// proceed regardless.
async fn wait_for_locales(engine: &FieldEngine, ports: &FieldPorts) {
    let config = engine.config();
    let mut polls = 0;
    while !ports.locales.locales_ready() && polls < config.max_locales_polls {
        tokio::time::sleep(config.locales_poll_interval).await;
        polls += 1;
    }
}
