use async_trait::async_trait;
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use uploadfield_sync::host::mock::MockHost;
use uploadfield_sync::widget::mock::{MockWidget, WidgetCall};
use uploadfield_sync::widget::{EventDetail, WidgetEvent};
use uploadfield_sync::{
    spawn_field, FieldConfig, FieldEngine, FieldEvent, FieldHandle, FieldPorts, GroupExpander,
    InitRegistry, SyncResult,
};
use uploadfield_types::{FileDescriptor, GroupRef};

const UUID_A: &str = "6fa459ea-ee8a-3ca4-894e-db77e160355e";
const UUID_B: &str = "16fd2706-8baf-433b-82eb-8c7fada847da";
const UUID_G: &str = "886313e1-3b8a-5372-9b90-0c9aee199e5d";

const CTX: &str = "form.files";

fn url(uuid: &str) -> String {
    format!("https://ucarecdn.com/{uuid}/")
}

fn config() -> FieldConfig {
    FieldConfig {
        ctx_name: CTX.to_string(),
        is_multiple: true,
        ..Default::default()
    }
}

fn upload(uuid: &str) -> WidgetEvent {
    WidgetEvent::new(
        CTX,
        EventDetail::UploadSuccess(FileDescriptor::Url(url(uuid))),
    )
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

fn spawn(
    widget: Arc<MockWidget>,
    host: Arc<MockHost>,
    initial: Option<serde_json::Value>,
) -> FieldHandle {
    init_tracing();
    let engine = FieldEngine::new(config(), initial, InitRegistry::new());
    spawn_field(engine, FieldPorts::new(widget, host))
}

async fn expect_no_event(events: &mut tokio::sync::broadcast::Receiver<FieldEvent>) {
    let result = tokio::time::timeout(Duration::from_secs(5), events.recv()).await;
    assert!(result.is_err(), "unexpected event: {result:?}");
}

// ── Happy path ───────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn upload_burst_debounces_to_one_host_write() {
    let widget = Arc::new(MockWidget::ready());
    let host = Arc::new(MockHost::new());
    let handle = spawn(widget.clone(), host.clone(), None);
    let mut events = handle.subscribe();

    assert_eq!(events.recv().await.unwrap(), FieldEvent::WidgetReady);
    assert_eq!(events.recv().await.unwrap(), FieldEvent::Hydrated { count: 0 });

    handle.widget_event(upload(UUID_A));
    handle.widget_event(upload(UUID_B));

    assert_eq!(
        events.recv().await.unwrap(),
        FieldEvent::Committed { count: 2 }
    );
    // One debounced commit, one write, in arrival order.
    assert_eq!(host.writes(), vec![json!([url(UUID_A), url(UUID_B)])]);

    handle.destroy();
    handle.stopped().await;
}

#[tokio::test(start_paused = true)]
async fn host_echo_is_absorbed() {
    let widget = Arc::new(MockWidget::ready());
    let host = Arc::new(MockHost::new());
    let handle = spawn(widget.clone(), host.clone(), None);
    // Every write comes straight back, like a real two-way binding.
    host.echo_into(handle.host_sender());
    let mut events = handle.subscribe();

    assert_eq!(events.recv().await.unwrap(), FieldEvent::WidgetReady);
    assert_eq!(events.recv().await.unwrap(), FieldEvent::Hydrated { count: 0 });

    handle.widget_event(upload(UUID_A));
    assert_eq!(
        events.recv().await.unwrap(),
        FieldEvent::Committed { count: 1 }
    );

    // The echo must produce no second commit and no second write.
    expect_no_event(&mut events).await;
    assert_eq!(host.writes().len(), 1);
}

// ── Readiness polling ────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn polls_until_widget_ready() {
    let widget = Arc::new(MockWidget::ready_after(3));
    let host = Arc::new(MockHost::new());
    let handle = spawn(widget.clone(), host.clone(), None);
    let mut events = handle.subscribe();

    assert_eq!(events.recv().await.unwrap(), FieldEvent::WidgetReady);
    assert_eq!(events.recv().await.unwrap(), FieldEvent::Hydrated { count: 0 });
    assert_eq!(widget.probe_count(), 4);
}

#[tokio::test(start_paused = true)]
async fn gives_up_after_bounded_retries() {
    let widget = Arc::new(MockWidget::never_ready());
    let host = Arc::new(MockHost::new());
    let handle = spawn(widget.clone(), host.clone(), None);
    let mut events = handle.subscribe();

    // Terminal but non-fatal: no readiness, no hydration, no crash.
    expect_no_event(&mut events).await;
    assert_eq!(widget.probe_count(), 10);
    assert!(host.writes().is_empty());
}

// ── Hydration ────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn hydration_registers_initial_files() {
    let widget = Arc::new(MockWidget::ready());
    let host = Arc::new(MockHost::new());
    let initial = json!([url(UUID_A)]);
    let handle = spawn(widget.clone(), host.clone(), Some(initial));
    let mut events = handle.subscribe();

    assert_eq!(events.recv().await.unwrap(), FieldEvent::WidgetReady);
    assert_eq!(events.recv().await.unwrap(), FieldEvent::Hydrated { count: 1 });

    assert_eq!(
        widget.calls(),
        vec![
            WidgetCall::RelaxRequired,
            WidgetCall::RemoveAll,
            WidgetCall::AddFromUuid(UUID_A.to_string()),
        ]
    );
    // Hydration seeds the baseline; it never writes the host.
    assert!(host.writes().is_empty());
}

struct TwoFileExpander;

#[async_trait]
impl GroupExpander for TwoFileExpander {
    async fn expand(&self, _group: &GroupRef) -> SyncResult<Vec<FileDescriptor>> {
        Ok(vec![
            FileDescriptor::Url(url(UUID_A)),
            FileDescriptor::Url(url(UUID_B)),
        ])
    }
}

#[tokio::test(start_paused = true)]
async fn hydration_expands_groups() {
    let widget = Arc::new(MockWidget::ready());
    let host = Arc::new(MockHost::new());
    let initial = json!(format!("https://ucarecdn.com/{UUID_G}~2/"));
    let engine = FieldEngine::new(config(), Some(initial), InitRegistry::new());
    let ports =
        FieldPorts::new(widget.clone(), host.clone()).with_groups(Arc::new(TwoFileExpander));
    let handle = spawn_field(engine, ports);
    let mut events = handle.subscribe();

    assert_eq!(events.recv().await.unwrap(), FieldEvent::WidgetReady);
    assert_eq!(events.recv().await.unwrap(), FieldEvent::Hydrated { count: 2 });

    assert!(widget
        .calls()
        .contains(&WidgetCall::AddFromUuid(UUID_A.to_string())));
    assert!(widget
        .calls()
        .contains(&WidgetCall::AddFromUuid(UUID_B.to_string())));
}

#[tokio::test(start_paused = true)]
async fn group_expansion_failure_keeps_group_descriptor() {
    let widget = Arc::new(MockWidget::ready());
    let host = Arc::new(MockHost::new());
    let group_url = format!("https://ucarecdn.com/{UUID_G}~2/");
    // Default ports carry the inert expander, which always fails.
    let handle = spawn(widget.clone(), host.clone(), Some(json!(group_url.clone())));
    let mut events = handle.subscribe();

    assert_eq!(events.recv().await.unwrap(), FieldEvent::WidgetReady);
    assert_eq!(events.recv().await.unwrap(), FieldEvent::Hydrated { count: 1 });

    // Fallback: the unexpanded group registers by its full URL.
    assert!(widget.calls().contains(&WidgetCall::AddFromCdnUrl(group_url)));
}

// ── Inbound ──────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn external_clear_drives_widget() {
    let widget = Arc::new(MockWidget::ready());
    let host = Arc::new(MockHost::new());
    let handle = spawn(widget.clone(), host.clone(), Some(json!([url(UUID_A)])));
    let mut events = handle.subscribe();

    assert_eq!(events.recv().await.unwrap(), FieldEvent::WidgetReady);
    assert_eq!(events.recv().await.unwrap(), FieldEvent::Hydrated { count: 1 });

    handle.host_changed(json!([]));
    assert_eq!(events.recv().await.unwrap(), FieldEvent::ExternalCleared);
    assert_eq!(widget.calls().last(), Some(&WidgetCall::RemoveAll));
}

// ── Lifecycle ────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn duplicate_context_instance_is_inert() {
    let registry = InitRegistry::new();
    let widget = Arc::new(MockWidget::ready());
    let host = Arc::new(MockHost::new());

    let first = spawn_field(
        FieldEngine::new(config(), None, registry.clone()),
        FieldPorts::new(widget.clone(), host.clone()),
    );
    let mut events = first.subscribe();
    assert_eq!(events.recv().await.unwrap(), FieldEvent::WidgetReady);

    // Same context again (host re-render): skips init and stops.
    let second = spawn_field(
        FieldEngine::new(config(), None, registry.clone()),
        FieldPorts::new(widget.clone(), host.clone()),
    );
    second.stopped().await;
    assert!(registry.is_claimed(CTX));
}

#[tokio::test(start_paused = true)]
async fn destroy_detaches_everything() {
    let widget = Arc::new(MockWidget::ready());
    let host = Arc::new(MockHost::new());
    let handle = spawn(widget.clone(), host.clone(), None);
    let mut events = handle.subscribe();

    assert_eq!(events.recv().await.unwrap(), FieldEvent::WidgetReady);
    assert_eq!(events.recv().await.unwrap(), FieldEvent::Hydrated { count: 0 });

    handle.destroy();
    assert_eq!(events.recv().await.unwrap(), FieldEvent::Destroyed);

    // Anything after teardown is a no-op.
    handle.widget_event(upload(UUID_A));
    expect_no_event(&mut events).await;
    assert!(host.writes().is_empty());
}
