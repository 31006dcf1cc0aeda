//! Unit tests for composite query keys

use revalid_domain::QueryKey;

#[test]
fn test_prefix_is_segment_wise() {
    let key = QueryKey::from(["todos", "42", "comments"]);
    assert!(key.starts_with(&QueryKey::from(["todos"])));
    assert!(key.starts_with(&QueryKey::from(["todos", "42"])));
    assert!(!key.starts_with(&QueryKey::from(["todos", "4"])));
}

#[test]
fn test_child_appends_segment() {
    let parent = QueryKey::from("todos");
    let child = parent.child("7");
    assert_eq!(child.parts(), ["todos".to_string(), "7".to_string()]);
    assert_eq!(parent.len(), 1);
}

#[test]
fn test_serializes_as_segment_list() {
    let key = QueryKey::from(["a", "b"]);
    let json = serde_json::to_string(&key).expect("serialization should succeed");
    assert_eq!(json, r#"["a","b"]"#);
}

#[test]
fn test_display() {
    assert_eq!(QueryKey::from(["a", "b"]).to_string(), "[a, b]");
}
