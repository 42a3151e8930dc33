use arbor::{
    constants::RESERVED_NAMES,
    content::{MemberDescriptor, Value, ValueType},
    node::names,
};

use crate::helpers::*;

#[test]
fn test_reserved_member_names_are_escaped() {
    let graph = graph();
    let root = graph
        .object("Setting")
        .field("value", ValueType::Int, 3)
        .field("children", ValueType::Text, "none")
        .field("speed", ValueType::Float, 1.5)
        .insert()
        .unwrap();
    let (view, root_node) = view_of(&graph, &[root]);

    assert_eq!(
        child_names(&view, root_node),
        vec!["value_", "children_", "speed"]
    );

    // Lookups escape the queried name the same way
    let value = view.child(root_node, "value").unwrap().unwrap();
    assert_eq!(view.child(root_node, "value_").unwrap(), Some(value));
    assert_eq!(view.value(value).unwrap(), Value::Int(3));
    assert_eq!(at(&view, "Root.value"), value);
}

#[test]
fn test_escape_round_trip_over_reserved_names() {
    for group in RESERVED_NAMES {
        for name in *group {
            let escaped = names::escape(name).into_owned();
            assert_ne!(&escaped, name);
            assert!(!names::is_reserved(&escaped));
            assert_eq!(names::escape(&escaped), escaped);
        }
    }
    assert_eq!(names::escape("position"), "position");
}

#[test]
fn test_display_name_and_display_path() {
    let graph = graph();
    let inner = graph
        .object("Lens")
        .field_with(
            MemberDescriptor::new("focal", 0).with_display_name("Focal length"),
            ValueType::Float,
            35.0,
        )
        .insert()
        .unwrap();
    let root = graph
        .object("Camera")
        .field_with(
            MemberDescriptor::new("lens", 0).with_display_name("Lens"),
            ValueType::Object("Lens".into()),
            graph.object_ref(inner).unwrap(),
        )
        .insert()
        .unwrap();
    let (view, _) = view_of(&graph, &[root]);

    let focal = at(&view, "Root.lens.focal");
    let node = view.node(focal).unwrap();
    assert_eq!(node.path(), "Root.lens.focal");
    assert_eq!(node.display_name(), "Focal length");
    assert_eq!(view.display_path(focal).unwrap(), "Lens.Focal length");
    assert_eq!(view.level(focal).unwrap(), 2);
}

#[test]
fn test_unknown_path_is_rejected() {
    let graph = graph();
    let root = item(&graph, 1, "a");
    let (view, _) = view_of(&graph, &[root]);

    let err = view.resolve_path("Root.z").unwrap_err();
    assert!(err.is_invalid_path());
    let err = view.resolve_path("Other.x").unwrap_err();
    assert!(err.is_invalid_path());
}
