use pretty_assertions::assert_eq;
use uploadfield_store::{
    add, remove, update_url, CommitOutcome, FileStore, Mutation, StoreMode, UrlUpdate,
};
use uploadfield_types::{FileDescriptor, FileUuid, RichFile};

const UUID_A: &str = "6fa459ea-ee8a-3ca4-894e-db77e160355e";
const UUID_B: &str = "16fd2706-8baf-433b-82eb-8c7fada847da";
const UUID_C: &str = "886313e1-3b8a-5372-9b90-0c9aee199e5d";

const MULTI_META: StoreMode = StoreMode { multiple: true, with_metadata: true };
const MULTI_URL: StoreMode = StoreMode { multiple: true, with_metadata: false };
const SINGLE_URL: StoreMode = StoreMode { multiple: false, with_metadata: false };

fn url(uuid: &str) -> String {
    format!("https://ucarecdn.com/{uuid}/")
}

fn bare(uuid: &str) -> FileDescriptor {
    FileDescriptor::Url(url(uuid))
}

fn rich(uuid: &str, name: &str) -> FileDescriptor {
    FileDescriptor::Rich(RichFile {
        uuid: Some(uuid.to_string()),
        cdn_url: url(uuid),
        name: Some(name.to_string()),
        ..Default::default()
    })
}

fn uuids(list: &[FileDescriptor]) -> Vec<String> {
    list.iter()
        .map(|d| d.file_uuid().unwrap().to_string())
        .collect()
}

// ── add ──────────────────────────────────────────────────────────

#[test]
fn add_appends_in_multiple_mode() {
    let list = add(&[bare(UUID_A)], bare(UUID_B), MULTI_URL);
    assert_eq!(uuids(&list), vec![UUID_A, UUID_B]);
}

#[test]
fn add_dedupes_by_uuid_across_shapes() {
    // Same file arrives once as a bare URL, once as a rich object.
    let list = add(&[bare(UUID_A)], rich(UUID_A, "dupe.png"), MULTI_META);
    assert_eq!(list.len(), 1);
    assert_eq!(list, vec![bare(UUID_A)]);
}

#[test]
fn add_replaces_in_single_mode() {
    let list = add(&[bare(UUID_A)], bare(UUID_B), SINGLE_URL);
    assert_eq!(uuids(&list), vec![UUID_B]);
}

// ── update_url ───────────────────────────────────────────────────

fn crop_update(uuid: &str) -> UrlUpdate {
    UrlUpdate {
        uuid: Some(FileUuid::parse(uuid).unwrap()),
        cdn_url: format!("https://ucarecdn.com/{uuid}/-/crop/1:1/"),
        cdn_url_modifiers: Some("-/crop/1:1/".to_string()),
    }
}

#[test]
fn update_merges_preserving_untouched_fields() {
    let list = vec![rich(UUID_A, "photo.jpg"), bare(UUID_B)];
    let next = update_url(&list, &crop_update(UUID_A), MULTI_META).unwrap();

    match &next[0] {
        FileDescriptor::Rich(merged) => {
            assert_eq!(merged.cdn_url, format!("https://ucarecdn.com/{UUID_A}/-/crop/1:1/"));
            assert_eq!(merged.cdn_url_modifiers.as_deref(), Some("-/crop/1:1/"));
            assert_eq!(merged.name.as_deref(), Some("photo.jpg"));
        }
        other => panic!("expected rich entry, got {other:?}"),
    }
    assert_eq!(next[1], bare(UUID_B));
}

#[test]
fn update_replaces_with_bare_url_in_url_mode() {
    let list = vec![bare(UUID_A)];
    let next = update_url(&list, &crop_update(UUID_A), MULTI_URL).unwrap();
    assert_eq!(
        next,
        vec![FileDescriptor::Url(format!("https://ucarecdn.com/{UUID_A}/-/crop/1:1/"))]
    );
}

#[test]
fn update_collapses_in_single_mode() {
    let list = vec![bare(UUID_A), bare(UUID_B)];
    let next = update_url(&list, &crop_update(UUID_A), SINGLE_URL).unwrap();
    assert_eq!(next.len(), 1);
}

#[test]
fn update_unmatched_is_none() {
    let list = vec![bare(UUID_A)];
    assert_eq!(update_url(&list, &crop_update(UUID_B), MULTI_META), None);
}

// ── remove ───────────────────────────────────────────────────────

#[test]
fn remove_by_uuid() {
    let list = vec![bare(UUID_A), bare(UUID_B), bare(UUID_C)];
    // The removal event reports the rich shape; the list holds bare URLs.
    let next = remove(&list, &rich(UUID_B, "x"), MULTI_URL).unwrap();
    assert_eq!(uuids(&next), vec![UUID_A, UUID_C]);
}

#[test]
fn remove_unmatched_is_none() {
    let list = vec![bare(UUID_A)];
    assert_eq!(remove(&list, &bare(UUID_B), MULTI_URL), None);
    // Target with no extractable UUID is also a no-op.
    let junk = FileDescriptor::Url("https://example.com/f.png".to_string());
    assert_eq!(remove(&list, &junk, MULTI_URL), None);
}

#[test]
fn remove_collapses_in_single_mode() {
    let list = vec![bare(UUID_A)];
    let next = remove(&list, &bare(UUID_A), SINGLE_URL).unwrap();
    assert!(next.is_empty());
}

// ── FileStore: apply + counters ──────────────────────────────────

#[test]
fn unmatched_operations_counted_not_errored() {
    let mut store = FileStore::new(MULTI_URL);
    let list = store.apply(vec![bare(UUID_A)], &Mutation::Remove(bare(UUID_B)));
    let list = store.apply(list, &Mutation::UpdateUrl(crop_update(UUID_C)));

    assert_eq!(uuids(&list), vec![UUID_A]);
    assert_eq!(store.counters().unmatched_removals, 1);
    assert_eq!(store.counters().unmatched_updates, 1);
}

// ── FileStore: commit ────────────────────────────────────────────

#[test]
fn commit_detects_change_then_settles() {
    let mut store = FileStore::new(MULTI_URL);
    let list = vec![bare(UUID_A)];

    match store.commit(&list) {
        CommitOutcome::Committed { serialized } => {
            assert_eq!(serialized, format!(r#"["{}"]"#, url(UUID_A)));
        }
        CommitOutcome::Unchanged => panic!("first commit must register"),
    }
    // Same list again: normalized-equal, no change.
    assert_eq!(store.commit(&list), CommitOutcome::Unchanged);
}

#[test]
fn commit_ignores_formatting_differences() {
    let mut store = FileStore::new(MULTI_META);
    let list = vec![rich(UUID_A, "a.png")];
    assert!(matches!(store.commit(&list), CommitOutcome::Committed { .. }));

    // Re-parse the cache and commit the parsed copy: key order and
    // whitespace may differ, but nothing real changed.
    let reparsed = store.current_files();
    assert_eq!(store.commit(&reparsed), CommitOutcome::Unchanged);
}

#[test]
fn removal_noop_leaves_cache_identical() {
    let mut store = FileStore::new(MULTI_URL);
    let list = vec![bare(UUID_A)];
    store.commit(&list);
    let before = store.cached().to_string();

    let after_apply = store.apply(list, &Mutation::Remove(bare(UUID_B)));
    assert_eq!(store.commit(&after_apply), CommitOutcome::Unchanged);
    assert_eq!(store.cached(), before);
}

// ── FileStore: current_files recovery ────────────────────────────

#[test]
fn unreadable_cache_yields_empty() {
    let mut store = FileStore::new(MULTI_URL);
    assert!(store.current_files().is_empty());

    store.seed(&[bare(UUID_A)]);
    assert_eq!(store.current_files().len(), 1);
}

#[test]
fn shredded_cache_is_reconstructed() {
    // The object-as-character-map corruption of `["<url>"]`.
    let original = format!(r#"["{}"]"#, url(UUID_A));
    let shredded: serde_json::Map<String, serde_json::Value> = original
        .chars()
        .enumerate()
        .map(|(i, c)| (i.to_string(), serde_json::Value::String(c.to_string())))
        .collect();

    let mut store = FileStore::new(MULTI_URL);
    store.restore_cached(serde_json::Value::Object(shredded).to_string());

    let files = store.current_files();
    assert_eq!(uuids(&files), vec![UUID_A]);
    assert_eq!(store.counters().recovered_caches, 1);
    assert_eq!(store.cached(), original);
}

#[test]
fn non_list_json_yields_empty() {
    let mut store = FileStore::new(MULTI_URL);
    store.restore_cached("42".to_string());
    assert!(store.current_files().is_empty());
    assert_eq!(store.counters().recovered_caches, 0);
}

// ── FileStore: seed ──────────────────────────────────────────────

#[test]
fn seed_sets_baseline_without_change_signal() {
    let mut store = FileStore::new(MULTI_META);
    let baseline = store.seed(&[rich(UUID_A, "a.png")]);
    assert_eq!(store.cached(), baseline);

    // Committing the same content right after hydration is a no-op.
    let files = store.current_files();
    assert_eq!(store.commit(&files), CommitOutcome::Unchanged);
}
