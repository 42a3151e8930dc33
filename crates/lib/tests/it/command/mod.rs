//! Command integration tests
//!
//! Commands attached to nodes by the content and by hooks, how they combine
//! across a selection, and the transactions they run in.

use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use arbor::{
    Index, Result,
    command::{NodeCommand, NodeOperation, UndoToken},
    content::{ContentId, ContentPath, Value},
    node::Node,
    service::{GraphViewService, NodeInitializedHook},
    view::MemberRef,
};

use crate::helpers::*;

/// Adds one shared `Rename` operation to the roots presenting `objects`.
struct RenameHook {
    objects: Vec<ContentId>,
    operation: Arc<dyn NodeOperation>,
}

impl NodeInitializedHook for RenameHook {
    fn on_node_initialized(&self, node: &mut Node) -> Result<()> {
        let Some(source) = node.as_graph().map(|state| state.source()) else {
            return Ok(());
        };
        if node.parent().is_none() && self.objects.contains(&source) {
            node.add_command(NodeCommand::model(
                self.operation.clone(),
                ContentPath::new(source),
                Index::Empty,
            ))?;
        }
        Ok(())
    }
}

fn service_with_rename(objects: &[ContentId]) -> GraphViewService {
    let mut service = GraphViewService::new(settings());
    service.add_node_initialized_hook(Arc::new(RenameHook {
        objects: objects.to_vec(),
        operation: Arc::new(Rename),
    }));
    service
}

#[test]
fn test_command_combined_only_when_all_have_it() {
    let graph = graph();
    let a = item(&graph, 1, "a");
    let b = item(&graph, 1, "b");
    let c = item(&graph, 1, "c");

    let partial = service_with_rename(&[a, b])
        .create_view(graph.clone(), &providers(&[a, b, c]))
        .unwrap()
        .unwrap();
    let root = partial.root().unwrap();
    assert!(partial.command(root, "Rename").unwrap().is_none());
    // The roots that have it still expose it
    let single = partial.single_roots()[0];
    assert!(partial.command(single, "Rename").unwrap().is_some());

    let full = service_with_rename(&[a, b, c])
        .create_view(graph.clone(), &providers(&[a, b, c]))
        .unwrap()
        .unwrap();
    let root = full.root().unwrap();
    assert_eq!(
        command_names(&full, root),
        vec!["Rename".to_string(), "ResetInitialValues".to_string()]
    );
}

#[tokio::test]
async fn test_combined_command_runs_on_every_object() {
    let graph = graph();
    let a = item(&graph, 1, "a");
    let b = item(&graph, 1, "b");
    let undo = Arc::new(arbor::action::ActionStack::new());
    let mut view = service_with_rename(&[a, b])
        .with_undo_service(undo.clone())
        .create_view(graph.clone(), &providers(&[a, b]))
        .unwrap()
        .unwrap();
    let root = view.root().unwrap();

    view.invoke_command(root, "Rename", &Value::from("z"))
        .await
        .unwrap();
    assert_eq!(graph.member_value(a, "y").unwrap(), "z");
    assert_eq!(graph.member_value(b, "y").unwrap(), "z");

    // The combined value catches up once deferred work runs
    assert_eq!(view.run_deferred().unwrap(), 1);
    let y = at(&view, "Root.y");
    assert!(!view.has_multiple_values(y).unwrap());
    assert_eq!(view.value(y).unwrap(), "z");

    let entries = undo.entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].name, "Execute Rename");
    assert_eq!(entries[0].nested, 2);
}

#[tokio::test]
async fn test_combined_command_reports_one_batch() {
    let graph = graph();
    let a = item(&graph, 1, "a");
    let b = item(&graph, 1, "b");
    let mut view = service_with_rename(&[a, b])
        .create_view(graph.clone(), &providers(&[a, b]))
        .unwrap()
        .unwrap();
    let observer = Arc::new(RecordingObserver::default());
    view.add_observer(observer.clone());
    let root = view.root().unwrap();

    view.invoke_command(root, "Rename", &Value::from("z"))
        .await
        .unwrap();
    view.run_deferred().unwrap();

    assert!(!view.in_action());
    assert_eq!(observer.batches(), vec![vec!["Root.y".to_string()]]);
}

#[tokio::test]
async fn test_model_command_undo() {
    let graph = graph();
    let a = item(&graph, 1, "a");
    let mut view = service_with_rename(&[a])
        .create_view(graph.clone(), &providers(&[a]))
        .unwrap()
        .unwrap();
    let root = view.root().unwrap();

    let token = view
        .invoke_command(root, "Rename", &Value::from("renamed"))
        .await
        .unwrap();
    assert!(token.can_undo);
    assert_eq!(view.value(at(&view, "Root.y")).unwrap(), "renamed");

    let command = view.command(root, "Rename").unwrap().unwrap().clone();
    let context = arbor::command::CommandContext {
        content: view.content().clone(),
        undo: None,
    };
    command.undo(&context, &token).await.unwrap();
    view.process_content_changes().unwrap();
    assert_eq!(view.value(at(&view, "Root.y")).unwrap(), "a");
}

#[tokio::test]
async fn test_unknown_command() {
    let graph = graph();
    let a = item(&graph, 1, "a");
    let (mut view, root) = view_of(&graph, &[a]);

    let err = view
        .invoke_command(root, "Missing", &Value::Null)
        .await
        .unwrap_err();
    assert!(err.is_not_found());
    assert!(err.is_command_error());
}

#[tokio::test]
async fn test_direct_command_on_node() {
    let graph = graph();
    let a = item(&graph, 1, "a");
    let (mut view, root, undo) = view_with_undo(&graph, &[a]);

    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    view.add_command(
        root,
        NodeCommand::direct("Ping", move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(UndoToken::none())
        })
        .with_transaction_name("Ping the item"),
    )
    .unwrap();

    view.invoke_command(root, "Ping", &Value::Null).await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(undo.names(), vec!["Ping the item".to_string()]);

    // Commands share the member namespace of the node
    let err = view
        .add_command(root, NodeCommand::direct("x", |_| Ok(UndoToken::none())))
        .unwrap_err();
    assert!(err.is_structure_error());

    assert!(view.remove_command(root, "Ping").unwrap().is_some());
    assert!(view.command(root, "Ping").unwrap().is_none());
}

#[test]
fn test_lookup_member_order() {
    let graph = graph();
    let a = item(&graph, 1, "a");
    let (mut view, root) = view_of(&graph, &[a]);
    view.add_command(root, NodeCommand::direct("Ping", |_| Ok(UndoToken::none())))
        .unwrap();
    view.add_associated_data(root, "hint", serde_json::json!("shown in tooltips"))
        .unwrap();

    assert!(matches!(
        view.lookup_member(root, "x").unwrap(),
        Some(MemberRef::Child(_))
    ));
    assert!(matches!(
        view.lookup_member(root, "Ping").unwrap(),
        Some(MemberRef::Command(command)) if command.name() == "Ping"
    ));
    assert!(matches!(
        view.lookup_member(root, "hint").unwrap(),
        Some(MemberRef::Data(data)) if data == &serde_json::json!("shown in tooltips")
    ));
    assert!(view.lookup_member(root, "nothing").unwrap().is_none());
}
