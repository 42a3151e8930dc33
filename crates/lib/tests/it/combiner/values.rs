use std::sync::Arc;

use arbor::{
    GraphView, Result,
    content::{Value, ValueType},
    node::Node,
    service::{GraphViewService, NodeInitializedHook},
    view::VirtualNode,
};

use crate::helpers::*;

#[test]
fn test_diverging_values_read_as_default() {
    let graph = graph();
    let a = item(&graph, 1, "a");
    let b = item(&graph, 1, "b");
    let (view, root) = view_of(&graph, &[a, b]);

    assert!(view.node(root).unwrap().is_combined());
    assert_eq!(view.single_roots().len(), 2);
    assert_eq!(child_names(&view, root), vec!["x", "y"]);

    let x = at(&view, "Root.x");
    assert!(!view.has_multiple_values(x).unwrap());
    assert_eq!(view.value(x).unwrap(), Value::Int(1));

    let y = at(&view, "Root.y");
    assert!(view.has_multiple_values(y).unwrap());
    assert!(view.has_multiple_initial_values(y).unwrap());
    assert_eq!(view.value(y).unwrap(), ValueType::Text.default_value());
    assert_eq!(
        view.distinct_initial_values(y).unwrap(),
        vec![Value::from("a"), Value::from("b")]
    );
}

#[test]
fn test_combined_write_is_one_edit() {
    let graph = graph();
    let a = item(&graph, 1, "a");
    let b = item(&graph, 1, "b");
    let (mut view, _, undo) = view_with_undo(&graph, &[a, b]);
    let observer = Arc::new(RecordingObserver::default());
    view.add_observer(observer.clone());

    let y = at(&view, "Root.y");
    view.set_value(y, Value::from("c")).unwrap();

    assert_eq!(graph.member_value(a, "y").unwrap(), "c");
    assert_eq!(graph.member_value(b, "y").unwrap(), "c");
    assert!(!view.has_multiple_values(y).unwrap());
    assert_eq!(view.value(y).unwrap(), "c");

    assert_eq!(undo.names(), vec!["Update property Root.y".to_string()]);
    assert_eq!(undo.open_transactions(), 0);
    assert_eq!(observer.batches(), vec![vec!["Root.y".to_string()]]);
    // Nothing is left for later: the write refreshed the node itself
    assert_eq!(view.pending_deferred(), 0);
    assert!(!view.in_action());
}

#[test]
fn test_reset_initial_values() {
    let graph = graph();
    let a = item(&graph, 1, "a");
    let b = item(&graph, 1, "b");
    let (mut view, _, undo) = view_with_undo(&graph, &[a, b]);
    let y = at(&view, "Root.y");

    view.set_value(y, Value::from("c")).unwrap();
    view.reset_initial_values(y).unwrap();
    assert_eq!(graph.member_value(a, "y").unwrap(), "a");
    assert_eq!(graph.member_value(b, "y").unwrap(), "b");
    assert!(view.has_multiple_values(y).unwrap());
    assert_eq!(undo.len(), 2);

    // Resetting again leaves the same state
    view.reset_initial_values(y).unwrap();
    assert_eq!(graph.member_value(a, "y").unwrap(), "a");
    assert_eq!(graph.member_value(b, "y").unwrap(), "b");
    assert_eq!(
        view.distinct_initial_values(y).unwrap(),
        vec![Value::from("a"), Value::from("b")]
    );
}

#[tokio::test]
async fn test_reset_through_command() {
    let graph = graph();
    let a = item(&graph, 1, "a");
    let b = item(&graph, 2, "a");
    let (mut view, root) = view_of(&graph, &[a, b]);
    let x = at(&view, "Root.x");
    assert!(command_names(&view, root).contains(&"ResetInitialValues".to_string()));

    view.set_value(x, Value::Int(5)).unwrap();
    view.invoke_command(x, "ResetInitialValues", &Value::Null)
        .await
        .unwrap();
    assert_eq!(graph.member_value(a, "x").unwrap(), Value::Int(1));
    assert_eq!(graph.member_value(b, "x").unwrap(), Value::Int(2));
}

#[test]
fn test_external_edits_coalesce_into_one_refresh() {
    let graph = graph();
    let a = item(&graph, 1, "a");
    let b = item(&graph, 1, "b");
    let (mut view, _) = view_of(&graph, &[a, b]);
    let observer = Arc::new(RecordingObserver::default());
    view.add_observer(observer.clone());
    let y = at(&view, "Root.y");

    graph.set_member_value(a, "y", Value::from("q")).unwrap();
    graph.set_member_value(b, "y", Value::from("q")).unwrap();
    view.process_content_changes().unwrap();

    assert_eq!(view.pending_deferred(), 1);
    assert_eq!(view.run_deferred().unwrap(), 1);
    assert_eq!(view.pending_deferred(), 0);
    assert!(!view.has_multiple_values(y).unwrap());
    assert_eq!(view.value(y).unwrap(), "q");
    assert!(
        observer
            .changed_properties("Root.y")
            .contains(&"has_multiple_values".to_string())
    );
}

#[test]
fn test_combinable_is_symmetric() {
    let graph = graph();
    let a = item(&graph, 1, "a");
    let b = item(&graph, 2, "b");
    let c = item(&graph, 3, "c");
    let (view, _) = view_of(&graph, &[a, b, c]);
    let roots = view.single_roots().to_vec();

    let permutations = [
        [0, 1, 2],
        [0, 2, 1],
        [1, 0, 2],
        [1, 2, 0],
        [2, 0, 1],
        [2, 1, 0],
    ];
    for order in permutations {
        let nodes: Vec<_> = order.iter().map(|i| roots[*i]).collect();
        assert!(view.are_combinable(&nodes, false).unwrap());
    }

    let x = view.child(roots[0], "x").unwrap().unwrap();
    let y = view.child(roots[1], "y").unwrap().unwrap();
    assert!(!view.are_combinable(&[x, y], false).unwrap());
    assert!(!view.are_combinable(&[y, x], false).unwrap());
    assert!(!view.are_combinable(&[x, y], true).unwrap());
}

#[test]
fn test_uncombinable_roots_fail() {
    let graph = graph();
    let a = item(&graph, 1, "a");
    let b = camera(&graph, 60.0, "main");
    let mut view = GraphView::new(graph.clone(), settings());

    let err = view.build_root(&providers(&[a, b])).unwrap_err();
    assert!(err.is_combine_error());
    assert_eq!(view.root(), None);
    assert_eq!(view.node_count(), 0);
}

#[test]
fn test_nodes_cannot_move_into_combined_nodes() {
    let graph = graph();
    let a = item(&graph, 1, "a");
    let b = item(&graph, 1, "b");
    let (mut view, root) = view_of(&graph, &[a, b]);

    let loose = view
        .create_virtual(VirtualNode::new("loose", ValueType::Int, || Value::Int(0)))
        .unwrap();
    let err = view.move_node(loose, root, None).unwrap_err();
    assert!(err.is_structure_error());

    let y = at(&view, "Root.y");
    let single_root = view.single_roots()[0];
    let err = view.move_node(y, single_root, Some("z")).unwrap_err();
    assert!(err.is_structure_error());
}

#[test]
fn test_only_common_members_are_combined() {
    let graph = graph();
    let a = item(&graph, 1, "a");
    let b = graph
        .object("Item")
        .field("x", ValueType::Int, 1)
        .field("y", ValueType::Text, "b")
        .field("z", ValueType::Bool, true)
        .insert()
        .unwrap();
    let (view, root) = view_of(&graph, &[a, b]);

    assert_eq!(child_names(&view, root), vec!["x", "y"]);
    let combined = view.node(at(&view, "Root.x")).unwrap().as_combined().unwrap();
    assert_eq!(combined.nodes().len(), 2);
}

/// Uppercases text written to `y` members and rejects blank text.
struct ShoutingHook;

impl NodeInitializedHook for ShoutingHook {
    fn on_node_initialized(&self, node: &mut Node) -> Result<()> {
        if node.name() != "y" {
            return Ok(());
        }
        node.set_coerce_value(|value| match value {
            Value::Text(text) => Value::Text(text.to_uppercase()),
            other => other,
        })?;
        node.set_accept_value(
            |value| !matches!(value, Value::Text(text) if text.trim().is_empty()),
        )
    }
}

#[test]
fn test_reset_bypasses_write_callbacks() {
    let graph = graph();
    let a = item(&graph, 1, "a");
    let b = item(&graph, 1, "b");
    let mut service = GraphViewService::new(settings());
    service.add_node_initialized_hook(Arc::new(ShoutingHook));
    let mut view = service
        .create_view(graph.clone(), &providers(&[a, b]))
        .unwrap()
        .unwrap();
    let y = at(&view, "Root.y");

    view.set_value(y, Value::from("c")).unwrap();
    assert_eq!(graph.member_value(a, "y").unwrap(), "C");
    view.set_value(y, Value::from("  ")).unwrap();
    assert_eq!(graph.member_value(b, "y").unwrap(), "C");

    // The captured values are restored as they were
    view.reset_initial_values(y).unwrap();
    assert_eq!(graph.member_value(a, "y").unwrap(), "a");
    assert_eq!(graph.member_value(b, "y").unwrap(), "b");
}
