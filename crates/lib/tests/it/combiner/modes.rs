use std::sync::Arc;

use arbor::{
    Result,
    command::{CombineMode, NodeCommand, UndoToken},
    content::ContentId,
    node::Node,
    service::{GraphViewService, NodeInitializedHook},
    view::CombineError,
};

use crate::helpers::*;

/// Gives a `Ping` command to chosen roots and a combine mode to chosen `x`
/// members.
#[derive(Default)]
struct PolicyHook {
    ping: Vec<(ContentId, CombineMode)>,
    members: Vec<(ContentId, CombineMode)>,
}

impl NodeInitializedHook for PolicyHook {
    fn on_node_initialized(&self, node: &mut Node) -> Result<()> {
        let Some(object) = node.as_graph().map(|state| state.source_path().root()) else {
            return Ok(());
        };
        if node.parent().is_none() {
            if let Some((_, mode)) = self.ping.iter().find(|(id, _)| *id == object) {
                node.add_command(
                    NodeCommand::direct("Ping", |_| Ok(UndoToken::none())).with_combine_mode(*mode),
                )?;
            }
        } else if node.name() == "x"
            && let Some((_, mode)) = self.members.iter().find(|(id, _)| *id == object)
        {
            node.set_combine_mode(*mode)?;
        }
        Ok(())
    }
}

fn service(hook: PolicyHook) -> GraphViewService {
    let mut service = GraphViewService::new(settings());
    service.add_node_initialized_hook(Arc::new(hook));
    service
}

#[test]
fn test_commands_with_inconsistent_modes() {
    let graph = graph();
    let a = item(&graph, 1, "a");
    let b = item(&graph, 2, "b");
    let hook = PolicyHook {
        ping: vec![(a, CombineMode::AlwaysCombine), (b, CombineMode::DoNotCombine)],
        ..PolicyHook::default()
    };

    let err = service(hook)
        .create_view(graph.clone(), &providers(&[a, b]))
        .unwrap_err();
    assert!(err.is_combine_error());
    assert!(matches!(
        &err,
        arbor::Error::Combine(CombineError::InconsistentCombineMode { name }) if name == "Ping"
    ));
}

#[test]
fn test_members_with_inconsistent_modes() {
    let graph = graph();
    let a = item(&graph, 1, "a");
    let b = item(&graph, 2, "b");
    let hook = PolicyHook {
        members: vec![(a, CombineMode::AlwaysCombine)],
        ..PolicyHook::default()
    };

    let err = service(hook)
        .create_view(graph.clone(), &providers(&[a, b]))
        .unwrap_err();
    assert!(matches!(
        &err,
        arbor::Error::Combine(CombineError::InconsistentCombineMode { name }) if name == "x"
    ));
}

#[test]
fn test_do_not_combine_groups_are_dropped() {
    let graph = graph();
    let a = item(&graph, 1, "a");
    let b = item(&graph, 2, "b");
    let hook = PolicyHook {
        ping: vec![(a, CombineMode::DoNotCombine), (b, CombineMode::DoNotCombine)],
        members: vec![(a, CombineMode::DoNotCombine), (b, CombineMode::DoNotCombine)],
    };

    let view = service(hook)
        .create_view(graph.clone(), &providers(&[a, b]))
        .unwrap()
        .unwrap();
    let root = view.root().unwrap();

    assert_eq!(command_names(&view, root), vec!["ResetInitialValues"]);
    assert_eq!(child_names(&view, root), vec!["y"]);
    // The single trees keep what the combined tree leaves out
    for single in view.single_roots() {
        assert!(view.command(*single, "Ping").unwrap().is_some());
        assert!(view.child(*single, "x").unwrap().is_some());
    }
    view.verify_structure().unwrap();
}
