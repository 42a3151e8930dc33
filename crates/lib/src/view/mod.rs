//! The owner of a presented tree.
//!
//! A [`GraphView`] owns every node of one tree in an arena indexed by
//! [`NodeId`]. It binds graph nodes to their backing content (see the
//! `binder` module), fuses the trees of a multi-selection into combined
//! nodes (`combiner`), runs value writes and commands inside transactions
//! (`action`), and keeps the tree in sync with the content by draining the
//! change notifications the content graph sends it.
//!
//! All mutation goes through `&mut GraphView`, which keeps the tree on one
//! logical thread. Work that must happen "later" (the coalesced refresh of
//! combined nodes whose backing nodes changed) is queued and run by
//! [`GraphView::run_deferred`].

mod action;
mod binder;
mod combiner;
pub mod errors;
mod tree;
mod virtual_node;

use std::{
    collections::{HashMap, VecDeque},
    fmt,
    sync::Arc,
};

pub use action::CombinedAction;
pub use errors::CombineError;
use tokio::sync::mpsc;
pub use virtual_node::VirtualNode;

use crate::{
    Index, Result,
    action::{TransactionId, UndoService},
    command::{CommandContext, CommandError, CommandKind, NodeCommand, UndoToken},
    constants::property,
    content::{ChangeKind, ChangePhase, ChangeReceiver, ContentChange, ContentGraph, ContentId, Value},
    node::{Node, NodeError, NodeId, NodeKind},
    service::{NodeInitializedHook, NodeInitializedHookCollection, PropertyProvider, TreeObserver},
    settings::ViewSettings,
};

/// A member of a node found by [`GraphView::lookup_member`].
#[derive(Debug, Clone, Copy)]
pub enum MemberRef<'a> {
    Child(NodeId),
    Command(&'a NodeCommand),
    Data(&'a serde_json::Value),
}

/// Bookkeeping of the combined action in progress, if any.
#[derive(Debug, Default)]
struct ActionState {
    depth: usize,
    transaction: Option<TransactionId>,
    name: Option<String>,
    /// Paths of the nodes whose value changed, flushed once at the end
    pending_paths: Vec<String>,
    /// Combined node whose value is being written
    writing: Option<NodeId>,
    changed_during_write: Vec<NodeId>,
}

/// A live, editable tree presenting one or several backing objects.
pub struct GraphView {
    content: Arc<dyn ContentGraph>,
    settings: ViewSettings,
    undo: Option<Arc<dyn UndoService>>,
    hooks: NodeInitializedHookCollection,
    observers: Vec<Arc<dyn TreeObserver>>,
    nodes: HashMap<NodeId, Node>,
    next_id: u64,
    root: Option<NodeId>,
    single_roots: Vec<NodeId>,
    changes: ChangeReceiver,
    /// Graph nodes listening to each content location
    subscriptions: HashMap<ContentId, Vec<NodeId>>,
    /// Combined node fusing each graph node, if any
    combined_by_single: HashMap<NodeId, NodeId>,
    deferred: VecDeque<NodeId>,
    action: ActionState,
}

impl fmt::Debug for GraphView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphView")
            .field("root", &self.root)
            .field("single_roots", &self.single_roots)
            .field("nodes", &self.nodes.len())
            .field("deferred", &self.deferred.len())
            .finish_non_exhaustive()
    }
}

impl GraphView {
    /// Creates an empty view listening to the changes of `content`.
    pub fn new(content: Arc<dyn ContentGraph>, settings: ViewSettings) -> Self {
        let (sender, changes) = mpsc::unbounded_channel();
        content.subscribe(sender);
        Self {
            content,
            settings,
            undo: None,
            hooks: NodeInitializedHookCollection::new(),
            observers: Vec::new(),
            nodes: HashMap::new(),
            next_id: 0,
            root: None,
            single_roots: Vec::new(),
            changes,
            subscriptions: HashMap::new(),
            combined_by_single: HashMap::new(),
            deferred: VecDeque::new(),
            action: ActionState::default(),
        }
    }

    pub fn with_undo_service(mut self, undo: Arc<dyn UndoService>) -> Self {
        self.undo = Some(undo);
        self
    }

    pub fn set_undo_service(&mut self, undo: Arc<dyn UndoService>) {
        self.undo = Some(undo);
    }

    pub fn add_observer(&mut self, observer: Arc<dyn TreeObserver>) {
        self.observers.push(observer);
    }

    pub fn add_node_initialized_hook(&mut self, hook: Arc<dyn NodeInitializedHook>) {
        self.hooks.add_hook(hook);
    }

    pub(crate) fn set_node_initialized_hooks(&mut self, hooks: NodeInitializedHookCollection) {
        self.hooks = hooks;
    }

    pub fn settings(&self) -> &ViewSettings {
        &self.settings
    }

    pub fn content(&self) -> &Arc<dyn ContentGraph> {
        &self.content
    }

    /// Builds the root of the tree, replacing any previous one.
    ///
    /// One provider yields a graph root; several yield a combined root over
    /// one graph tree per provider. Providers that cannot provide a tree are
    /// ignored.
    ///
    /// # Errors
    /// Returns [`CombineError::UncombinableSet`] if the roots of several
    /// providers are not structurally equivalent.
    pub fn build_root(&mut self, providers: &[Arc<dyn PropertyProvider>]) -> Result<Option<NodeId>> {
        self.clear();

        let providers: Vec<Arc<dyn PropertyProvider>> = providers
            .iter()
            .filter(|provider| provider.can_provide_tree())
            .cloned()
            .collect();

        let mut single_roots = Vec::with_capacity(providers.len());
        for provider in providers {
            match self.create_graph_root(provider) {
                Ok(root) => single_roots.push(root),
                Err(e) => {
                    self.discard_trees(&single_roots);
                    return Err(e);
                }
            }
        }
        self.single_roots = single_roots.clone();

        let root = match single_roots.as_slice() {
            [] => None,
            [single] => Some(*single),
            _ => {
                let root_name = self.settings.root_name.clone();
                let combined =
                    self.build_combined_node(None, root_name, single_roots.clone(), Index::Empty, false);
                match combined {
                    Ok(root) => Some(root),
                    Err(e) => {
                        self.discard_trees(&single_roots);
                        self.single_roots.clear();
                        return Err(e);
                    }
                }
            }
        };
        self.root = root;
        self.check_structure()?;
        tracing::debug!(nodes = self.nodes.len(), "Tree built");
        Ok(root)
    }

    fn discard_trees(&mut self, roots: &[NodeId]) {
        for root in roots {
            self.destroy_subtree(*root);
        }
    }

    /// Destroys every node of the view, including detached nodes made by
    /// [`GraphView::create_virtual`].
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.subscriptions.clear();
        self.combined_by_single.clear();
        self.root = None;
        self.single_roots.clear();
        self.deferred.clear();
    }

    /// The presented root: a graph root, or the combined root of a
    /// multi-selection.
    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    /// Roots of the graph trees backing the presented tree.
    pub fn single_roots(&self) -> &[NodeId] {
        &self.single_roots
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Number of live nodes, including the graph trees behind a combined root.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Returns a node.
    ///
    /// # Errors
    /// Returns [`NodeError::DestroyedNodeAccess`] if the node was destroyed.
    pub fn node(&self, id: NodeId) -> Result<&Node> {
        self.nodes
            .get(&id)
            .ok_or_else(|| NodeError::DestroyedNodeAccess { node: id }.into())
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> Result<&mut Node> {
        self.nodes
            .get_mut(&id)
            .ok_or_else(|| NodeError::DestroyedNodeAccess { node: id }.into())
    }

    fn allocate_id(&mut self) -> NodeId {
        self.next_id += 1;
        NodeId::new(self.next_id)
    }

    /// Children of a node, in sibling order.
    pub fn children(&self, id: NodeId) -> Result<Vec<NodeId>> {
        Ok(self.node(id)?.children().collect())
    }

    /// Finds a child by name. The name is escaped before comparing.
    pub fn child(&self, id: NodeId, name: &str) -> Result<Option<NodeId>> {
        Ok(self.node(id)?.child_id(name))
    }

    pub fn command(&self, id: NodeId, name: &str) -> Result<Option<&NodeCommand>> {
        Ok(self.node(id)?.command(name))
    }

    /// Resolves a name against the children of a node, then its commands,
    /// then its associated data.
    pub fn lookup_member(&self, id: NodeId, name: &str) -> Result<Option<MemberRef<'_>>> {
        let node = self.node(id)?;
        if let Some(child) = node.child_id(name) {
            return Ok(Some(MemberRef::Child(child)));
        }
        if let Some(command) = node.command(name) {
            return Ok(Some(MemberRef::Command(command)));
        }
        Ok(node.associated(name).map(MemberRef::Data))
    }

    /// Reads the value presented by a node.
    ///
    /// A combined node with diverging values yields the default value of
    /// its type.
    ///
    /// # Errors
    /// Returns [`NodeError::UninitializedAccess`] for a graph node whose
    /// initialization has not completed.
    pub fn value(&self, id: NodeId) -> Result<Value> {
        let node = self.node(id)?;
        match &node.kind {
            NodeKind::Graph(state) => {
                if !state.is_initialized {
                    return Err(NodeError::UninitializedAccess {
                        path: node.path.clone(),
                    }
                    .into());
                }
                self.content.retrieve(state.source, &node.index)
            }
            NodeKind::Combined(state) => {
                if self.has_multiple_values(id)? {
                    return Ok(node.value_type.default_value());
                }
                match state.nodes.first() {
                    Some(first) => self.value(*first),
                    None => Ok(node.value_type.default_value()),
                }
            }
            NodeKind::Virtual(state) => Ok((state.getter)()),
        }
    }

    /// Writes a value through a node.
    ///
    /// A graph node writes its content location. A combined node writes
    /// every visible backing node inside one combined action, then refreshes
    /// once. Writing the current value is a no-op.
    ///
    /// # Errors
    /// Returns [`NodeError::ReadOnly`] for read-only nodes, or any error of
    /// the content graph.
    pub fn set_value(&mut self, id: NodeId, value: Value) -> Result<()> {
        let node = self.node(id)?;
        if node.is_read_only {
            return Err(NodeError::ReadOnly {
                path: node.path.clone(),
            }
            .into());
        }
        let path = node.path.clone();

        match node.kind {
            NodeKind::Combined(_) => {
                let writes = self.combined_writes(id, &value)?;
                let name = self.settings.update_message(&path, &value);
                self.write_combined(id, name, writes, true)
            }
            NodeKind::Virtual(_) => self.set_virtual_value(id, value),
            NodeKind::Graph(_) => {
                let Some((source, index, value)) = self.prepare_graph_write(id, value, true)? else {
                    return Ok(());
                };
                let name = self.settings.update_message(&path, &value);
                self.with_action(Some(name), move |view| {
                    view.content.update(source, &index, value)?;
                    view.process_content_changes()
                })
            }
        }
    }

    /// Resolves what writing `value` to a graph node means: the location, the
    /// index and the coerced value, or `None` if the write is rejected or
    /// would not change anything. The accept and coerce callbacks of the
    /// node only run with `apply_callbacks` set.
    pub(crate) fn prepare_graph_write(
        &self,
        id: NodeId,
        value: Value,
        apply_callbacks: bool,
    ) -> Result<Option<(ContentId, Index, Value)>> {
        let node = self.node(id)?;
        let state = node.as_graph().ok_or_else(|| NodeError::KindMismatch {
            path: node.path.clone(),
            expected: "graph",
        })?;

        let value = match &state.coerce_value {
            Some(coerce) if apply_callbacks => coerce(value),
            _ => value,
        };
        if apply_callbacks
            && let Some(accept) = &state.accept_value
            && !accept(&value)
        {
            tracing::debug!(path = %node.path, "Value rejected by node");
            return Ok(None);
        }
        if self.content.retrieve(state.source, &node.index)? == value {
            return Ok(None);
        }
        Ok(Some((state.source, node.index.clone(), value)))
    }

    /// Invokes a command of a node and applies the resulting content changes.
    ///
    /// # Errors
    /// Returns [`CommandError::CommandNotFound`] if the node has no such
    /// command, or the error of the command itself.
    pub async fn invoke_command(
        &mut self,
        id: NodeId,
        name: &str,
        parameter: &Value,
    ) -> Result<UndoToken> {
        let node = self.node(id)?;
        let command = node
            .command(name)
            .cloned()
            .ok_or_else(|| CommandError::CommandNotFound {
                path: node.path.clone(),
                name: name.to_string(),
            })?;

        if matches!(command.kind(), CommandKind::ResetInitialValues) {
            self.reset_initial_values(id)?;
            return Ok(UndoToken::none());
        }

        let context = CommandContext {
            content: self.content.clone(),
            undo: self.undo.clone(),
        };
        // The command runs its own transaction; the action reports the nodes
        // it changed in one batch.
        self.begin_action(None, false);
        let result = match command.invoke(&context, parameter).await {
            Ok(token) => self.process_content_changes().map(|()| token),
            Err(e) => self.process_content_changes().and(Err(e)),
        };
        self.end_action(result.is_ok());
        result
    }

    /// Applies every pending change notification of the content graph.
    ///
    /// Called after every write performed through the view; call it after
    /// writing the content by other means.
    pub fn process_content_changes(&mut self) -> Result<()> {
        while let Ok(change) = self.changes.try_recv() {
            self.apply_content_change(&change)?;
        }
        Ok(())
    }

    fn apply_content_change(&mut self, change: &ContentChange) -> Result<()> {
        let Some(listeners) = self.subscriptions.get(&change.content).cloned() else {
            return Ok(());
        };

        for id in listeners {
            let Some(node) = self.nodes.get(&id) else {
                continue;
            };
            let Some(state) = node.as_graph() else {
                continue;
            };
            let relevant = match change.kind {
                ChangeKind::ValueChange | ChangeKind::CollectionUpdate => {
                    change.content == state.source && change.index == node.index
                }
                ChangeKind::CollectionAdd | ChangeKind::CollectionRemove => {
                    Some(change.content) == state.target && (node.has_list || node.has_dictionary)
                }
            };
            if !relevant {
                continue;
            }

            match change.phase {
                ChangePhase::Changing => self.notify_changing(id, property::VALUE),
                ChangePhase::Changed => self.on_content_changed(id)?,
            }
        }
        Ok(())
    }

    fn on_content_changed(&mut self, id: NodeId) -> Result<()> {
        self.notify_changed(id, property::VALUE);
        if !self.node(id)?.is_primitive {
            self.refresh_graph(id)?;
        }
        let path = self.node(id)?.path.clone();
        self.notify_node_changed(path);

        if let Some(&combined) = self.combined_by_single.get(&id) {
            match self.action.writing {
                Some(writing) if writing == combined => {}
                Some(_) => {
                    if !self.action.changed_during_write.contains(&combined) {
                        self.action.changed_during_write.push(combined);
                    }
                }
                None => self.queue_combined_refresh(combined),
            }
        }
        Ok(())
    }

    fn queue_combined_refresh(&mut self, id: NodeId) {
        let Some(state) = self.nodes.get_mut(&id).and_then(Node::combined_mut) else {
            return;
        };
        if state.refresh_queued {
            return;
        }
        state.refresh_queued = true;
        self.deferred.push_back(id);
        tracing::trace!(node = %id, "Combined refresh queued");
    }

    /// Runs the deferred work queued since the last call.
    ///
    /// Returns the number of refreshes performed.
    pub fn run_deferred(&mut self) -> Result<usize> {
        let mut performed = 0;
        while let Some(id) = self.deferred.pop_front() {
            let Some(state) = self.nodes.get_mut(&id).and_then(Node::combined_mut) else {
                continue;
            };
            state.refresh_queued = false;
            self.refresh_combined(id)?;
            self.process_content_changes()?;
            performed += 1;
        }
        Ok(performed)
    }

    /// Number of deferred refreshes waiting for [`GraphView::run_deferred`].
    pub fn pending_deferred(&self) -> usize {
        self.deferred.len()
    }

    /// Rebuilds the children, commands and associated data of a node.
    ///
    /// # Errors
    /// Returns [`NodeError::RootRefresh`] for nodes without a parent.
    pub fn refresh(&mut self, id: NodeId) -> Result<()> {
        let node = self.node(id)?;
        if node.parent.is_none() {
            return Err(NodeError::RootRefresh {
                path: node.path.clone(),
            }
            .into());
        }
        match node.kind {
            NodeKind::Graph(_) => self.refresh_graph(id),
            NodeKind::Combined(_) => self.refresh_combined(id),
            NodeKind::Virtual(_) => {
                self.notify_changing(id, property::VALUE);
                self.notify_changed(id, property::VALUE);
                Ok(())
            }
        }
    }

    pub(crate) fn notify_changing(&self, id: NodeId, property: &str) {
        let Some(node) = self.nodes.get(&id) else {
            return;
        };
        if self.settings.trace_property_changes {
            tracing::trace!("Node property changing: [{}].{property}", node.path);
        }
        for observer in &self.observers {
            observer.property_changing(&node.path, property);
        }
    }

    pub(crate) fn notify_changed(&self, id: NodeId, property: &str) {
        let Some(node) = self.nodes.get(&id) else {
            return;
        };
        if self.settings.trace_property_changes {
            tracing::trace!("Node property changed: [{}].{property}", node.path);
        }
        for observer in &self.observers {
            observer.property_changed(&node.path, property);
        }
    }

    /// Notifies that a child is about to change, along with its synthetic
    /// has-child property. Repeated calls before the matching
    /// [`GraphView::notify_child_changed`] notify nothing.
    pub(crate) fn notify_child_changing(&mut self, parent: NodeId, name: &str) {
        let Some(node) = self.nodes.get_mut(&parent) else {
            return;
        };
        if node.pending_has_child.insert(name.to_string()) {
            self.notify_changing(parent, name);
            self.notify_changing(parent, &format!("{}{name}", crate::constants::HAS_CHILD_PREFIX));
        }
    }

    pub(crate) fn notify_child_changed(&mut self, parent: NodeId, name: &str) {
        let Some(node) = self.nodes.get_mut(&parent) else {
            return;
        };
        if node.pending_has_child.remove(name) {
            self.notify_changed(parent, name);
            self.notify_changed(parent, &format!("{}{name}", crate::constants::HAS_CHILD_PREFIX));
        }
    }

    /// Records that the value of the node at `path` changed. Inside a
    /// combined action the path is flushed once when the action ends.
    pub(crate) fn notify_node_changed(&mut self, path: String) {
        if self.action.depth > 0 {
            if !self.action.pending_paths.contains(&path) {
                self.action.pending_paths.push(path);
            }
            return;
        }
        let paths = [path];
        for observer in &self.observers {
            observer.nodes_changed(&paths);
        }
    }

    fn subscribe(&mut self, id: NodeId, content: ContentId) {
        let listeners = self.subscriptions.entry(content).or_default();
        if !listeners.contains(&id) {
            listeners.push(id);
        }
    }

    fn unsubscribe(&mut self, id: NodeId, content: ContentId) {
        if let Some(listeners) = self.subscriptions.get_mut(&content) {
            listeners.retain(|listener| *listener != id);
            if listeners.is_empty() {
                self.subscriptions.remove(&content);
            }
        }
    }

    /// Runs the consistency check on a node if enabled in the settings.
    fn check_node(&self, id: NodeId) -> Result<()> {
        if self.settings.consistency_checks {
            self.node(id)?.check_members()?;
        }
        Ok(())
    }

    fn check_structure(&self) -> Result<()> {
        if self.settings.consistency_checks {
            self.verify_structure()?;
        }
        Ok(())
    }
}
