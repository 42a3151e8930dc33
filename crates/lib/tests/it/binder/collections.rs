use arbor::{
    Index,
    command::CombineMode,
    content::{Value, ValueType},
};

use crate::helpers::*;

#[test]
fn test_primitive_list_member() {
    let graph = graph();
    let root = scene(&graph, "intro", 60.0, &["red", "blue"]);
    let (view, _) = view_of(&graph, &[root]);

    let tags = at(&view, "Root.tags");
    let node = view.node(tags).unwrap();
    assert!(node.has_list());
    assert!(!node.is_primitive());
    assert_eq!(child_names(&view, tags), vec!["0", "1"]);
    assert_eq!(
        command_names(&view, tags),
        vec!["AddItem", "RemoveItem", "ClearCollection"]
    );

    let first = at(&view, "Root.tags.0");
    let item = view.node(first).unwrap();
    assert!(item.is_primitive());
    assert_eq!(item.index(), &Index::Position(0));
    assert_eq!(item.combine_mode(), Some(CombineMode::AlwaysCombine));
    assert_eq!(view.value(first).unwrap(), "red");
    // Items carry the operations of their list
    assert!(view.command(first, "RemoveItem").unwrap().is_some());
}

#[test]
fn test_write_list_item() {
    let graph = graph();
    let root = scene(&graph, "intro", 60.0, &["red", "blue"]);
    let (mut view, _) = view_of(&graph, &[root]);

    let second = at(&view, "Root.tags.1");
    view.set_value(second, Value::from("green")).unwrap();
    assert_eq!(view.value(second).unwrap(), "green");

    let exported = graph.export_json(root).unwrap();
    assert_eq!(exported["tags"], serde_json::json!(["red", "green"]));
}

#[test]
fn test_external_add_rebuilds_items() {
    let graph = graph();
    let root = scene(&graph, "intro", 60.0, &["red"]);
    let (mut view, _) = view_of(&graph, &[root]);
    let tags = at(&view, "Root.tags");
    let list = view.node(tags).unwrap().as_graph().unwrap().target().unwrap();

    arbor::content::ContentGraph::add_item(graph.as_ref(), list, None, Value::from("blue")).unwrap();
    view.process_content_changes().unwrap();

    assert_eq!(child_names(&view, tags), vec!["0", "1"]);
    assert_eq!(view.value(at(&view, "Root.tags.1")).unwrap(), "blue");
    view.verify_structure().unwrap();
}

#[test]
fn test_dictionary_entries() {
    let graph = graph();
    let limits = graph
        .create_dictionary(
            ValueType::Int,
            [("low".to_string(), Value::Int(1)), ("high".to_string(), Value::Int(9))],
        )
        .unwrap();
    let root = graph
        .object("Config")
        .field(
            "limits",
            ValueType::Dictionary(Box::new(ValueType::Int)),
            graph.object_ref(limits).unwrap(),
        )
        .insert()
        .unwrap();
    let (view, _) = view_of(&graph, &[root]);

    let node = at(&view, "Root.limits");
    assert!(view.node(node).unwrap().has_dictionary());
    assert!(!view.node(node).unwrap().has_list());
    // Keys are presented in key order
    assert_eq!(child_names(&view, node), vec!["high", "low"]);
    let high = at(&view, "Root.limits.high");
    assert_eq!(view.node(high).unwrap().index(), &Index::from("high"));
    assert_eq!(view.value(high).unwrap(), Value::Int(9));
}

#[test]
fn test_dictionary_keys_with_separators() {
    let graph = graph();
    let entries = graph
        .create_dictionary(
            ValueType::Int,
            [("a.b".to_string(), Value::Int(1)), ("a_b".to_string(), Value::Int(2))],
        )
        .unwrap();
    let root = graph
        .object("Config")
        .field(
            "entries",
            ValueType::Dictionary(Box::new(ValueType::Int)),
            graph.object_ref(entries).unwrap(),
        )
        .insert()
        .unwrap();
    let (view, _) = view_of(&graph, &[root]);

    let node = at(&view, "Root.entries");
    assert_eq!(child_names(&view, node), vec!["a%2Eb", "a_b"]);
    let dotted = at(&view, "Root.entries.a%2Eb");
    assert_eq!(view.node(dotted).unwrap().index(), &Index::from("a.b"));
    assert_eq!(view.value(dotted).unwrap(), Value::Int(1));
    assert_eq!(view.value(at(&view, "Root.entries.a_b")).unwrap(), Value::Int(2));
    view.verify_structure().unwrap();
}

#[test]
fn test_list_of_objects_expands_each_item() {
    let graph = graph();
    let first = item(&graph, 1, "a");
    let second = item(&graph, 2, "b");
    let items = graph
        .create_list(
            ValueType::Object("Item".into()),
            vec![
                graph.object_ref(first).unwrap(),
                graph.object_ref(second).unwrap(),
                Value::Null,
            ],
        )
        .unwrap();
    let root = graph
        .object("Inventory")
        .field(
            "items",
            ValueType::List(Box::new(ValueType::Object("Item".into()))),
            graph.object_ref(items).unwrap(),
        )
        .insert()
        .unwrap();
    let (view, _) = view_of(&graph, &[root]);

    let list = at(&view, "Root.items");
    assert_eq!(child_names(&view, list), vec!["0", "1", "2"]);

    let b = at(&view, "Root.items.1");
    assert_eq!(view.node(b).unwrap().as_graph().unwrap().target(), Some(second));
    assert_eq!(child_names(&view, b), vec!["x", "y"]);
    assert_eq!(view.value(at(&view, "Root.items.1.y")).unwrap(), "b");

    // A null entry has a node but nothing below it
    let empty = at(&view, "Root.items.2");
    assert_eq!(view.node(empty).unwrap().as_graph().unwrap().target(), None);
    assert_eq!(view.node(empty).unwrap().child_count(), 0);
}
