use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use arbor::{
    GraphView, Result,
    content::{Value, ValueType},
    node::{Node, NodeError},
    service::{
        ExpandReferencePolicy, GraphViewService, NodeInitializedHook, ObjectProvider,
        PropertyProvider,
    },
};

use crate::helpers::*;

#[test]
fn test_scene_tree_layout() {
    let graph = graph();
    let root = scene(&graph, "intro", 60.0, &["red"]);
    let (view, root_node) = view_of(&graph, &[root]);

    assert_eq!(child_names(&view, root_node), vec!["title", "camera", "tags"]);
    let camera = at(&view, "Root.camera");
    // `name` is a node property, so the member is escaped
    assert_eq!(child_names(&view, camera), vec!["fov", "name_"]);
    assert_eq!(view.value(at(&view, "Root.camera.fov")).unwrap(), Value::Float(60.0));
    assert_eq!(view.value(at(&view, "Root.camera.name")).unwrap(), "main");
    view.verify_structure().unwrap();
    view.check_consistency(root_node).unwrap();
}

#[test]
fn test_null_reference_has_no_children() {
    let graph = graph();
    let root = graph
        .object("Scene")
        .field("title", ValueType::Text, "empty")
        .field("camera", ValueType::Object("Camera".into()), Value::Null)
        .insert()
        .unwrap();
    let (view, _) = view_of(&graph, &[root]);

    let camera = at(&view, "Root.camera");
    let node = view.node(camera).unwrap();
    assert_eq!(node.child_count(), 0);
    assert!(!node.is_primitive());
    assert_eq!(node.as_graph().unwrap().target(), None);
    assert!(view.value(camera).unwrap().is_null());
}

#[test]
fn test_partial_expansion_stops_after_one_level() {
    let graph = graph();
    let lens = graph
        .object("Lens")
        .field("focal", ValueType::Float, 35.0)
        .insert()
        .unwrap();
    let camera = graph
        .object("Camera")
        .field("fov", ValueType::Float, 60.0)
        .field("lens", ValueType::Object("Lens".into()), graph.object_ref(lens).unwrap())
        .insert()
        .unwrap();
    let root = graph
        .object("Scene")
        .field("camera", ValueType::Object("Camera".into()), graph.object_ref(camera).unwrap())
        .insert()
        .unwrap();

    let provider: Arc<dyn PropertyProvider> =
        Arc::new(ObjectProvider::new(root).with_reference_policy(ExpandReferencePolicy::Partial));
    let mut view = GraphView::new(graph.clone(), settings());
    view.build_root(&[provider]).unwrap().unwrap();

    assert_eq!(child_names(&view, at(&view, "Root.camera")), vec!["fov", "lens"]);
    let lens_node = at(&view, "Root.camera.lens");
    assert_eq!(view.node(lens_node).unwrap().child_count(), 0);
    assert_eq!(
        view.node(lens_node).unwrap().as_graph().unwrap().expansion(),
        ExpandReferencePolicy::None
    );

    let none: Arc<dyn PropertyProvider> =
        Arc::new(ObjectProvider::new(root).with_reference_policy(ExpandReferencePolicy::None));
    view.build_root(&[none]).unwrap().unwrap();
    assert_eq!(view.node(at(&view, "Root.camera")).unwrap().child_count(), 0);
}

#[test]
fn test_hidden_members_are_skipped() {
    let graph = graph();
    let root = item(&graph, 1, "a");
    let provider: Arc<dyn PropertyProvider> = Arc::new(ObjectProvider::new(root).hide_member("x"));
    let mut view = GraphView::new(graph.clone(), settings());
    let root_node = view.build_root(&[provider]).unwrap().unwrap();

    assert_eq!(child_names(&view, root_node), vec!["y"]);
}

#[test]
fn test_replaced_reference_rebuilds_children() {
    let graph = graph();
    let root = scene(&graph, "intro", 60.0, &[]);
    let (mut view, root_node) = view_of(&graph, &[root]);
    let observer = Arc::new(RecordingObserver::default());
    view.add_observer(observer.clone());
    let old_fov = at(&view, "Root.camera.fov");

    let wide = camera(&graph, 90.0, "wide");
    graph
        .set_member_value(root, "camera", graph.object_ref(wide).unwrap())
        .unwrap();

    // Until the change is applied the tree is bound to the old camera
    let err = view.check_consistency(root_node).unwrap_err();
    assert!(err.is_structure_error());

    view.process_content_changes().unwrap();
    view.check_consistency(root_node).unwrap();
    assert!(!view.contains(old_fov));
    assert_eq!(view.value(at(&view, "Root.camera.fov")).unwrap(), Value::Float(90.0));
    assert_eq!(view.value(at(&view, "Root.camera.name")).unwrap(), "wide");
    assert_eq!(observer.batches(), vec![vec!["Root.camera".to_string()]]);
    assert!(observer.changed_properties("Root.camera").contains(&"value".to_string()));
}

#[test]
fn test_writes_refresh_the_value_only() {
    let graph = graph();
    let root = item(&graph, 1, "a");
    let (mut view, _) = view_of(&graph, &[root]);
    let observer = Arc::new(RecordingObserver::default());
    view.add_observer(observer.clone());
    let y = at(&view, "Root.y");

    view.set_value(y, Value::from("b")).unwrap();
    assert_eq!(graph.member_value(root, "y").unwrap(), "b");
    assert!(view.contains(y));
    assert_eq!(observer.changed_properties("Root.y"), vec!["value".to_string()]);
    assert_eq!(observer.batches(), vec![vec!["Root.y".to_string()]]);

    // Writing the current value changes nothing
    view.set_value(y, Value::from("b")).unwrap();
    assert_eq!(observer.batches().len(), 1);
}

#[test]
fn test_read_only_member_rejects_writes() {
    let graph = graph();
    let root = graph
        .object("Item")
        .field_with(
            arbor::content::MemberDescriptor::new("id", 0).read_only(),
            ValueType::Int,
            7,
        )
        .insert()
        .unwrap();
    let (mut view, _) = view_of(&graph, &[root]);

    let id = at(&view, "Root.id");
    let err = view.set_value(id, Value::Int(8)).unwrap_err();
    assert!(matches!(
        err,
        arbor::Error::Node(arbor::node::NodeError::ReadOnly { .. })
    ));
    assert_eq!(graph.member_value(root, "id").unwrap(), Value::Int(7));
}

/// Rejects `fov` members once armed.
#[derive(Default)]
struct RejectFov {
    armed: AtomicBool,
}

impl NodeInitializedHook for RejectFov {
    fn on_node_initialized(&self, node: &mut Node) -> Result<()> {
        if self.armed.load(Ordering::SeqCst) && node.name() == "fov" {
            return Err(NodeError::ReadOnly {
                path: node.path().to_string(),
            }
            .into());
        }
        Ok(())
    }
}

#[test]
fn test_failed_child_is_not_left_attached() {
    let graph = graph();
    let root = scene(&graph, "intro", 60.0, &["red"]);
    let hook = Arc::new(RejectFov::default());
    let mut service = GraphViewService::new(settings());
    service.add_node_initialized_hook(hook.clone());
    let mut view = service
        .create_view(graph.clone(), &providers(&[root]))
        .unwrap()
        .unwrap();
    let camera = at(&view, "Root.camera");
    let nodes_before = view.node_count();

    hook.armed.store(true, Ordering::SeqCst);
    let err = view.refresh(camera).unwrap_err();
    assert_eq!(err.module(), "node");

    // The rejected member was discarded along with its siblings
    assert!(view.child(camera, "fov").unwrap().is_none());
    assert!(child_names(&view, camera).is_empty());
    assert_eq!(view.node_count(), nodes_before - 2);
    view.verify_structure().unwrap();
}

#[test]
fn test_value_of_uninitialized_node() {
    let graph = graph();
    let root = scene(&graph, "intro", 60.0, &["red"]);
    let hook = Arc::new(RejectFov::default());
    let mut service = GraphViewService::new(settings());
    service.add_node_initialized_hook(hook.clone());
    let mut view = service
        .create_view(graph.clone(), &providers(&[root]))
        .unwrap()
        .unwrap();
    let camera = at(&view, "Root.camera");

    hook.armed.store(true, Ordering::SeqCst);
    view.refresh(camera).unwrap_err();

    // The camera never finished initializing
    let err = view.value(camera).unwrap_err();
    assert!(matches!(
        err,
        arbor::Error::Node(NodeError::UninitializedAccess { .. })
    ));
    hook.armed.store(false, Ordering::SeqCst);
    view.refresh(camera).unwrap();
    assert!(view.value(camera).is_ok());
    assert_eq!(child_names(&view, camera), vec!["fov", "name_"]);
}
