use std::sync::{Arc, Mutex};

use arbor::{
    content::{MemberDescriptor, Value, ValueType},
    node::NodeError,
    view::VirtualNode,
};

use crate::helpers::*;

#[test]
fn test_explicit_order_sorts_first() {
    let graph = graph();
    let root = graph
        .object("Ordered")
        .field_with(MemberDescriptor::new("A", 0).with_order(2), ValueType::Int, 1)
        .field_with(MemberDescriptor::new("B", 1), ValueType::Int, 2)
        .field_with(MemberDescriptor::new("C", 2).with_order(1), ValueType::Int, 3)
        .insert()
        .unwrap();
    let (view, root_node) = view_of(&graph, &[root]);

    assert_eq!(child_names(&view, root_node), vec!["C", "A", "B"]);
}

#[test]
fn test_custom_order_resorts_siblings() {
    let graph = graph();
    let root = item(&graph, 1, "a");
    let (mut view, root_node) = view_of(&graph, &[root]);
    assert_eq!(child_names(&view, root_node), vec!["x", "y"]);

    let y = at(&view, "Root.y");
    view.set_custom_order(y, Some(0)).unwrap();
    assert_eq!(child_names(&view, root_node), vec!["y", "x"]);
    assert_eq!(view.node(y).unwrap().order(), Some(0));

    view.set_custom_order(y, None).unwrap();
    assert_eq!(child_names(&view, root_node), vec!["x", "y"]);
}

#[test]
fn test_hidden_children_are_counted() {
    let graph = graph();
    let root = item(&graph, 1, "a");
    let (mut view, root_node) = view_of(&graph, &[root]);
    assert_eq!(view.node(root_node).unwrap().visible_children_count(), 2);

    let x = at(&view, "Root.x");
    view.set_visible(x, false).unwrap();
    assert_eq!(view.node(root_node).unwrap().visible_children_count(), 1);
    assert_eq!(view.node(root_node).unwrap().child_count(), 2);
    view.verify_structure().unwrap();

    view.set_visible(x, true).unwrap();
    assert_eq!(view.node(root_node).unwrap().visible_children_count(), 2);
}

#[test]
fn test_virtual_child_name_must_be_unique() {
    let graph = graph();
    let root = item(&graph, 1, "a");
    let (mut view, root_node) = view_of(&graph, &[root]);

    let err = view
        .add_virtual_child(root_node, VirtualNode::new("x", ValueType::Int, || Value::Int(0)))
        .unwrap_err();
    assert!(err.is_structure_error());
    assert!(matches!(
        err,
        arbor::Error::Node(NodeError::DuplicateMemberName { .. })
    ));
    // The rejected node does not linger
    assert_eq!(child_names(&view, root_node), vec!["x", "y"]);
}

#[test]
fn test_virtual_child_with_reserved_name() {
    let graph = graph();
    let root = item(&graph, 1, "a");
    let (mut view, root_node) = view_of(&graph, &[root]);

    let id = view
        .add_virtual_child(root_node, VirtualNode::new("value", ValueType::Int, || Value::Int(7)))
        .unwrap();
    assert_eq!(view.node(id).unwrap().name(), "value_");
    assert_eq!(child_names(&view, root_node), vec!["value_", "x", "y"]);
    assert_eq!(view.child(root_node, "value").unwrap(), Some(id));
    assert_eq!(at(&view, "Root.value"), id);
    assert_eq!(view.value(id).unwrap(), Value::Int(7));
}

#[test]
fn test_clear_releases_detached_nodes() {
    let graph = graph();
    let root = item(&graph, 1, "a");
    let (mut view, _) = view_of(&graph, &[root]);
    let loose = view
        .create_virtual(VirtualNode::new("loose", ValueType::Int, || Value::Int(0)))
        .unwrap();

    view.clear();
    assert_eq!(view.node_count(), 0);
    assert!(view.node(loose).unwrap_err().is_destroyed_node());
}

#[test]
fn test_move_renames_and_reparents() {
    let graph = graph();
    let root = item(&graph, 1, "a");
    let (mut view, root_node) = view_of(&graph, &[root]);

    let stored = Arc::new(Mutex::new(Value::Int(5)));
    let getter = stored.clone();
    let group = view
        .add_virtual_child(root_node, VirtualNode::new("group", ValueType::Any, || Value::Null))
        .unwrap();
    let extra = view
        .add_virtual_child(
            root_node,
            VirtualNode::new("extra", ValueType::Int, move || getter.lock().unwrap().clone()),
        )
        .unwrap();

    view.move_node(extra, group, Some("renamed")).unwrap();
    assert_eq!(view.node(extra).unwrap().path(), "Root.group.renamed");
    assert_eq!(view.node(extra).unwrap().parent(), Some(group));
    assert_eq!(view.child(root_node, "extra").unwrap(), None);
    assert_eq!(view.node(root_node).unwrap().child_count(), 3);
    assert_eq!(view.value(at(&view, "Root.group.renamed")).unwrap(), Value::Int(5));

    // A node cannot move below itself
    let err = view.move_node(group, extra, None).unwrap_err();
    assert!(matches!(err, arbor::Error::Node(NodeError::InvalidMove { .. })));
    view.verify_structure().unwrap();
}

#[test]
fn test_roots_cannot_move() {
    let graph = graph();
    let root = item(&graph, 1, "a");
    let (mut view, root_node) = view_of(&graph, &[root]);
    let holder = view
        .add_virtual_child(root_node, VirtualNode::new("holder", ValueType::Any, || Value::Null))
        .unwrap();

    let err = view.move_node(root_node, holder, None).unwrap_err();
    assert!(matches!(err, arbor::Error::Node(NodeError::InvalidMove { .. })));
}

#[test]
fn test_destroyed_ids_are_invalid() {
    let graph = graph();
    let root = item(&graph, 1, "a");
    let (mut view, root_node) = view_of(&graph, &[root]);

    let y = at(&view, "Root.y");
    view.destroy(y).unwrap();
    assert!(!view.contains(y));
    assert!(view.node(y).unwrap_err().is_destroyed_node());
    assert!(view.value(y).unwrap_err().is_destroyed_node());
    assert_eq!(child_names(&view, root_node), vec!["x"]);
    assert_eq!(view.node(root_node).unwrap().visible_children_count(), 1);
}

#[test]
fn test_guid_lookup() {
    let graph = graph();
    let root = item(&graph, 1, "a");
    let (view, root_node) = view_of(&graph, &[root]);

    let x = at(&view, "Root.x");
    let guid = view.node(x).unwrap().guid();
    assert_ne!(guid, view.node(root_node).unwrap().guid());
    assert_eq!(view.find_by_guid(guid), Some(x));
}
