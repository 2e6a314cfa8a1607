use pretty_assertions::assert_eq;
use proptest::prelude::*;
use serde_json::{json, Value};
use uploadfield_types::wire::{
    build_wire_value, format_for_state, is_empty_state, normalized_eq, parse_descriptor,
    parse_list, serialize_list,
};
use uploadfield_types::{FileDescriptor, RichFile};
use uuid::Uuid;

const UUID_A: &str = "6fa459ea-ee8a-3ca4-894e-db77e160355e";
const UUID_B: &str = "16fd2706-8baf-433b-82eb-8c7fada847da";

fn url(uuid: &str) -> String {
    format!("https://ucarecdn.com/{uuid}/")
}

fn rich(uuid: &str) -> FileDescriptor {
    FileDescriptor::Rich(RichFile {
        uuid: Some(uuid.to_string()),
        cdn_url: url(uuid),
        name: Some("photo.jpg".to_string()),
        ..Default::default()
    })
}

// ── format_for_state ─────────────────────────────────────────────

#[test]
fn metadata_mode_keeps_objects() {
    let formatted = format_for_state(&[rich(UUID_A)], true);
    assert_eq!(formatted[0]["uuid"], UUID_A);
    assert_eq!(formatted[0]["name"], "photo.jpg");
}

#[test]
fn url_only_mode_flattens_objects() {
    let formatted = format_for_state(&[rich(UUID_A)], false);
    assert_eq!(formatted[0], Value::String(url(UUID_A)));
}

// ── build_wire_value ─────────────────────────────────────────────

#[test]
fn multiple_mode_always_array() {
    let wire = build_wire_value(&[rich(UUID_A)], true, true);
    assert!(wire.is_array());

    let empty = build_wire_value(&[], true, true);
    assert_eq!(empty, json!([]));
}

#[test]
fn single_mode_first_element_or_sentinel() {
    let wire = build_wire_value(&[rich(UUID_A), rich(UUID_B)], false, false);
    assert_eq!(wire, Value::String(url(UUID_A)));

    let empty = build_wire_value(&[], false, false);
    assert_eq!(empty, Value::String(String::new()));
}

// ── Normalized comparison ────────────────────────────────────────

#[test]
fn key_order_is_invisible() {
    let a = r#"[{"uuid":"u","cdnUrl":"c"}]"#;
    let b = r#"[{"cdnUrl":"c","uuid":"u"}]"#;
    assert!(normalized_eq(a, b));
}

#[test]
fn whitespace_is_invisible() {
    let a = r#"["x", "y"]"#;
    let b = r#"["x","y"]"#;
    assert!(normalized_eq(a, b));
}

#[test]
fn genuine_differences_register() {
    assert!(!normalized_eq(r#"["x"]"#, r#"["y"]"#));
    assert!(!normalized_eq("", "[]"));
}

#[test]
fn non_json_falls_back_to_raw_equality() {
    assert!(normalized_eq("not json", "not json"));
    assert!(!normalized_eq("not json", "also not json"));
}

// ── parse_list ───────────────────────────────────────────────────

#[test]
fn parse_list_rejects_non_lists() {
    assert_eq!(parse_list("not json"), None);
    assert_eq!(parse_list(r#"{"cdnUrl":"c"}"#), None);
    assert_eq!(parse_list("42"), None);
}

#[test]
fn parse_descriptor_single_entry_point() {
    let parsed = parse_descriptor(&format!(r#""{}""#, url(UUID_A))).unwrap();
    assert!(matches!(parsed, FileDescriptor::Url(_)));
    assert!(parse_descriptor("not json").is_err());
}

#[test]
fn parse_list_round_trips() {
    let list = vec![rich(UUID_A), FileDescriptor::Url(url(UUID_B))];
    let serialized = serialize_list(&list, true);
    let parsed = parse_list(&serialized).unwrap();
    assert_eq!(parsed, list);
}

// ── is_empty_state ───────────────────────────────────────────────

#[test]
fn empty_forms() {
    assert!(is_empty_state(&json!(null)));
    assert!(is_empty_state(&json!("")));
    assert!(is_empty_state(&json!("  ")));
    assert!(is_empty_state(&json!("[]")));
    assert!(is_empty_state(&json!("null")));
    assert!(is_empty_state(&json!([])));
}

#[test]
fn non_empty_forms() {
    assert!(!is_empty_state(&json!(url(UUID_A))));
    assert!(!is_empty_state(&json!([url(UUID_A)])));
    assert!(!is_empty_state(&json!({"cdnUrl": url(UUID_A)})));
}

// ── Round-trip property ──────────────────────────────────────────

fn descriptor_strategy() -> impl Strategy<Value = FileDescriptor> {
    (any::<u128>(), any::<bool>()).prop_map(|(raw, as_rich)| {
        let uuid = Uuid::from_u128(raw);
        let cdn_url = format!("https://ucarecdn.com/{uuid}/");
        if as_rich {
            FileDescriptor::Rich(RichFile {
                uuid: Some(uuid.to_string()),
                cdn_url,
                ..Default::default()
            })
        } else {
            FileDescriptor::Url(cdn_url)
        }
    })
}

proptest! {
    /// Serializing then parsing preserves the UUID set and count in both
    /// metadata modes.
    #[test]
    fn serialize_parse_preserves_uuids(
        list in proptest::collection::vec(descriptor_strategy(), 0..8),
        with_metadata in any::<bool>(),
    ) {
        let serialized = serialize_list(&list, with_metadata);
        let parsed = parse_list(&serialized).unwrap();
        prop_assert_eq!(parsed.len(), list.len());
        let before: Vec<_> = list.iter().map(|d| d.file_uuid()).collect();
        let after: Vec<_> = parsed.iter().map(|d| d.file_uuid()).collect();
        prop_assert_eq!(before, after);
    }
}
