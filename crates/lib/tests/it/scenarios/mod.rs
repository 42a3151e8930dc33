//! End-to-end scenarios
//!
//! Editing sessions spanning several operations: documents imported from
//! JSON, edited as a selection and exported back.

use std::sync::Arc;

use arbor::content::{Value, ValueType};
use serde_json::json;

use crate::helpers::*;

fn documents() -> Vec<serde_json::Value> {
    vec![
        json!({
            "name": "left",
            "size": 1,
            "visible": true,
            "camera": { "fov": 60.0, "zoom": 1.0 },
            "tags": ["a", "b"]
        }),
        json!({
            "name": "right",
            "size": 1,
            "visible": false,
            "camera": { "fov": 90.0, "zoom": 1.0 },
            "tags": ["a"]
        }),
    ]
}

#[tokio::test]
async fn test_edit_imported_documents() {
    let graph = graph();
    let roots: Vec<_> = documents()
        .iter()
        .map(|document| graph.insert_json("Document", document).unwrap())
        .collect();
    let (mut view, root, undo) = view_with_undo(&graph, &roots);

    assert_eq!(view.value(at(&view, "Root.size")).unwrap(), Value::Int(1));
    assert!(view.has_multiple_values(at(&view, "Root.name")).unwrap());
    assert!(view.has_multiple_values(at(&view, "Root.camera.fov")).unwrap());
    assert!(!view.has_multiple_values(at(&view, "Root.camera.zoom")).unwrap());
    assert_eq!(view.node(root).unwrap().value_type(), &ValueType::Object("Document".into()));

    view.set_value(at(&view, "Root.camera.fov"), Value::Float(75.0))
        .unwrap();
    view.set_value(at(&view, "Root.visible"), Value::Bool(true))
        .unwrap();
    let tags = at(&view, "Root.tags");
    view.invoke_command(tags, "AddItem", &Value::from("c"))
        .await
        .unwrap();
    view.run_deferred().unwrap();

    assert_eq!(
        undo.names(),
        vec![
            "Update property Root.camera.fov".to_string(),
            "Update property Root.visible".to_string(),
            "Execute AddItem".to_string(),
        ]
    );

    let left = graph.export_json(roots[0]).unwrap();
    let right = graph.export_json(roots[1]).unwrap();
    assert_eq!(left["camera"]["fov"], json!(75.0));
    assert_eq!(right["camera"]["fov"], json!(75.0));
    assert_eq!(right["visible"], json!(true));
    assert_eq!(left["tags"], json!(["a", "b", "c"]));
    assert_eq!(right["tags"], json!(["a", "c"]));
    assert_eq!(left["name"], json!("left"));

    // "c" sits at different positions in the two lists, so it has no
    // combined item; "a" and "b" still do.
    assert_eq!(child_names(&view, tags), vec!["Item 0", "Item 1"]);
    view.verify_structure().unwrap();
    view.check_consistency(root).unwrap();
}

#[test]
fn test_combined_action_spans_several_writes() {
    let graph = graph();
    let a = item(&graph, 1, "a");
    let b = item(&graph, 2, "b");
    let (mut view, _, undo) = view_with_undo(&graph, &[a, b]);
    let observer = Arc::new(RecordingObserver::default());
    view.add_observer(observer.clone());
    let x = at(&view, "Root.x");
    let y = at(&view, "Root.y");

    {
        let mut action = view.begin_combined_action();
        action.set_value(x, Value::Int(0)).unwrap();
        action.set_value(y, Value::from("origin")).unwrap();
        action.set_name("Reset item");
        assert!(action.in_action());
        // Nothing is reported until the action ends
        assert!(observer.batches().is_empty());
    }

    assert!(!view.in_action());
    assert_eq!(undo.names(), vec!["Reset item".to_string()]);
    assert_eq!(
        observer.batches(),
        vec![vec!["Root.x".to_string(), "Root.y".to_string()]]
    );
    assert_eq!(graph.member_value(b, "x").unwrap(), Value::Int(0));
    assert_eq!(graph.member_value(a, "y").unwrap(), "origin");
}

#[test]
fn test_failed_write_leaves_no_transaction() {
    let graph = graph();
    let a = item(&graph, 1, "a");
    let (mut view, _, undo) = view_with_undo(&graph, &[a]);

    let x = at(&view, "Root.x");
    let err = view.set_value(x, Value::from("not a number")).unwrap_err();
    assert!(err.is_type_error());
    assert!(undo.is_empty());
    assert_eq!(undo.open_transactions(), 0);
    assert_eq!(view.value(x).unwrap(), Value::Int(1));
}

#[test]
fn test_refresh_rules() {
    let graph = graph();
    let root = scene(&graph, "intro", 60.0, &["a"]);
    let (mut view, root_node) = view_of(&graph, &[root]);

    let err = view.refresh(root_node).unwrap_err();
    assert!(err.is_structure_error());

    let camera = at(&view, "Root.camera");
    let fov = at(&view, "Root.camera.fov");
    view.refresh(camera).unwrap();
    // Children are rebuilt with new ids
    assert!(!view.contains(fov));
    assert_eq!(child_names(&view, camera), vec!["fov", "name_"]);
    view.verify_structure().unwrap();
}

#[test]
fn test_clear_releases_every_node() {
    let graph = graph();
    let a = item(&graph, 1, "a");
    let b = item(&graph, 2, "b");
    let (mut view, root) = view_of(&graph, &[a, b]);
    assert!(view.node_count() > 0);

    view.clear();
    assert_eq!(view.node_count(), 0);
    assert_eq!(view.root(), None);
    assert!(view.node(root).unwrap_err().is_destroyed_node());
}
