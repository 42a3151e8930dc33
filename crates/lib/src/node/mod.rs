//! Nodes of a presented tree.
//!
//! A [`Node`] is one entry of the tree a [`GraphView`](crate::view::GraphView)
//! presents: a name unique among its siblings, a value type, an optional
//! collection index, ordering attributes, visibility, commands, and a map of
//! associated data for UI hints. Nodes live in the view's arena and are
//! addressed by [`NodeId`]; an id is never reused, so a destroyed node is
//! simply an id the arena no longer knows.
//!
//! What a node is bound to is described by its [`NodeKind`]:
//!
//! - [`NodeKind::Graph`] - one location of a backing content graph
//! - [`NodeKind::Combined`] - N structurally equivalent graph nodes
//! - [`NodeKind::Virtual`] - a getter/setter pair, bound to no content

pub mod errors;
pub mod names;
pub mod ordering;

use std::{
    collections::{BTreeMap, HashSet},
    fmt,
    sync::Arc,
};

pub use errors::NodeError;
pub use ordering::SortKey;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    Index, Result,
    command::{CombineMode, NodeCommand},
    content::{ContentId, ContentPath, MemberDescriptor, Value, ValueType},
    service::{ExpandReferencePolicy, PropertyProvider},
};

/// Identity of a node in its view's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(u64);

impl NodeId {
    pub(crate) fn new(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node{}", self.0)
    }
}

/// Callback deciding whether a value may be written to a node.
pub type AcceptValueFn = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

/// Callback transforming a value before it is written to a node.
pub type CoerceValueFn = Arc<dyn Fn(Value) -> Value + Send + Sync>;

/// Reads the value of a virtual node.
pub type VirtualGetter = Arc<dyn Fn() -> Value + Send + Sync>;

/// Writes the value of a virtual node.
pub type VirtualSetter = Arc<dyn Fn(Value) -> Result<()> + Send + Sync>;

/// Binding of a node to one location of a content graph.
#[derive(Clone)]
pub struct GraphState {
    pub(crate) source: ContentId,
    pub(crate) source_path: ContentPath,
    pub(crate) target: Option<ContentId>,
    pub(crate) descriptor: Option<MemberDescriptor>,
    pub(crate) provider: Arc<dyn PropertyProvider>,
    pub(crate) expansion: ExpandReferencePolicy,
    pub(crate) combine_mode: CombineMode,
    pub(crate) custom_order: Option<i32>,
    pub(crate) is_initialized: bool,
    pub(crate) accept_value: Option<AcceptValueFn>,
    pub(crate) coerce_value: Option<CoerceValueFn>,
}

impl GraphState {
    /// The content location this node was created for.
    pub fn source(&self) -> ContentId {
        self.source
    }

    pub fn source_path(&self) -> &ContentPath {
        &self.source_path
    }

    /// The location the source resolves to, `None` for a null reference.
    pub fn target(&self) -> Option<ContentId> {
        self.target
    }

    pub fn descriptor(&self) -> Option<&MemberDescriptor> {
        self.descriptor.as_ref()
    }

    pub fn expansion(&self) -> ExpandReferencePolicy {
        self.expansion
    }

    pub fn custom_order(&self) -> Option<i32> {
        self.custom_order
    }

    pub fn is_initialized(&self) -> bool {
        self.is_initialized
    }
}

impl fmt::Debug for GraphState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphState")
            .field("source", &self.source)
            .field("source_path", &self.source_path)
            .field("target", &self.target)
            .field("expansion", &self.expansion)
            .field("combine_mode", &self.combine_mode)
            .field("custom_order", &self.custom_order)
            .field("is_initialized", &self.is_initialized)
            .finish_non_exhaustive()
    }
}

/// N graph nodes fused into one.
#[derive(Debug, Clone)]
pub struct CombinedState {
    pub(crate) nodes: Vec<NodeId>,
    pub(crate) initial_values: Vec<Value>,
    pub(crate) distinct_initial_values: Vec<Value>,
    pub(crate) refresh_queued: bool,
    /// Combined list items pair nodes with different names.
    pub(crate) list_item: bool,
}

impl CombinedState {
    /// The combined graph nodes, in selection order.
    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    /// Values of the combined nodes when the combined node was built.
    pub fn initial_values(&self) -> &[Value] {
        &self.initial_values
    }

    pub fn distinct_initial_values(&self) -> &[Value] {
        &self.distinct_initial_values
    }

    /// Whether a deferred refresh of this node is pending.
    pub fn is_refresh_queued(&self) -> bool {
        self.refresh_queued
    }

    /// Whether this node fuses list items paired by value.
    pub fn is_list_item(&self) -> bool {
        self.list_item
    }
}

/// A node whose value goes through a getter and an optional setter.
#[derive(Clone)]
pub struct VirtualState {
    pub(crate) getter: VirtualGetter,
    pub(crate) setter: Option<VirtualSetter>,
}

impl fmt::Debug for VirtualState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VirtualState")
            .field("writable", &self.setter.is_some())
            .finish()
    }
}

/// What a node is bound to.
#[derive(Debug, Clone)]
pub enum NodeKind {
    Graph(GraphState),
    Combined(CombinedState),
    Virtual(VirtualState),
}

impl NodeKind {
    pub fn label(&self) -> &'static str {
        match self {
            NodeKind::Graph(_) => "graph",
            NodeKind::Combined(_) => "combined",
            NodeKind::Virtual(_) => "virtual",
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct ChildRef {
    pub(crate) id: NodeId,
    pub(crate) key: SortKey,
}

/// A node of a presented tree.
#[derive(Debug, Clone)]
pub struct Node {
    pub(crate) id: NodeId,
    pub(crate) name: String,
    pub(crate) display_name: String,
    pub(crate) path: String,
    pub(crate) value_type: ValueType,
    pub(crate) index: Index,
    pub(crate) order: Option<i32>,
    pub(crate) declaration: Option<usize>,
    pub(crate) is_read_only: bool,
    pub(crate) is_visible: bool,
    pub(crate) is_primitive: bool,
    pub(crate) has_list: bool,
    pub(crate) has_dictionary: bool,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<ChildRef>,
    pub(crate) visible_children: usize,
    pub(crate) commands: Vec<NodeCommand>,
    pub(crate) associated_data: BTreeMap<String, serde_json::Value>,
    pub(crate) guid: Uuid,
    /// Synthetic has-child properties whose changed notification is pending
    pub(crate) pending_has_child: HashSet<String>,
    pub(crate) kind: NodeKind,
}

impl Node {
    pub(crate) fn new(id: NodeId, name: String, value_type: ValueType, kind: NodeKind) -> Self {
        Self {
            id,
            display_name: name.clone(),
            path: name.clone(),
            name,
            value_type,
            index: Index::Empty,
            order: None,
            declaration: None,
            is_read_only: false,
            is_visible: true,
            is_primitive: false,
            has_list: false,
            has_dictionary: false,
            parent: None,
            children: Vec::new(),
            visible_children: 0,
            commands: Vec::new(),
            associated_data: BTreeMap::new(),
            guid: Uuid::new_v4(),
            pending_has_child: HashSet::new(),
            kind,
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Name of the node, unique among its siblings.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Dotted path from the root, e.g. `Root.Transform.Position`.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn value_type(&self) -> &ValueType {
        &self.value_type
    }

    /// Index of the item this node presents, [`Index::Empty`] for members.
    pub fn index(&self) -> &Index {
        &self.index
    }

    pub fn order(&self) -> Option<i32> {
        self.order
    }

    pub fn is_read_only(&self) -> bool {
        self.is_read_only
    }

    pub fn is_visible(&self) -> bool {
        self.is_visible
    }

    /// Primitive nodes never have children.
    pub fn is_primitive(&self) -> bool {
        self.is_primitive
    }

    /// Whether the node presents a list or a dictionary.
    pub fn has_list(&self) -> bool {
        self.has_list
    }

    pub fn has_dictionary(&self) -> bool {
        self.has_dictionary
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Children, in sibling order.
    pub fn children(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.children.iter().map(|child| child.id)
    }

    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    /// Finds a child by name, escaping the name first.
    pub fn child_id(&self, name: &str) -> Option<NodeId> {
        let name = names::escape(name);
        self.children
            .iter()
            .find(|child| child.key.name == name)
            .map(|child| child.id)
    }

    pub fn visible_children_count(&self) -> usize {
        self.visible_children
    }

    pub fn commands(&self) -> &[NodeCommand] {
        &self.commands
    }

    pub fn command(&self, name: &str) -> Option<&NodeCommand> {
        self.commands.iter().find(|command| command.name() == name)
    }

    pub fn associated_data(&self) -> &BTreeMap<String, serde_json::Value> {
        &self.associated_data
    }

    pub fn associated(&self, key: &str) -> Option<&serde_json::Value> {
        self.associated_data.get(key)
    }

    /// Identity of the node, independent of its path.
    pub fn guid(&self) -> Uuid {
        self.guid
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn is_combined(&self) -> bool {
        matches!(self.kind, NodeKind::Combined(_))
    }

    pub fn as_graph(&self) -> Option<&GraphState> {
        match &self.kind {
            NodeKind::Graph(state) => Some(state),
            _ => None,
        }
    }

    pub fn as_combined(&self) -> Option<&CombinedState> {
        match &self.kind {
            NodeKind::Combined(state) => Some(state),
            _ => None,
        }
    }

    pub(crate) fn graph_mut(&mut self) -> Option<&mut GraphState> {
        match &mut self.kind {
            NodeKind::Graph(state) => Some(state),
            _ => None,
        }
    }

    pub(crate) fn combined_mut(&mut self) -> Option<&mut CombinedState> {
        match &mut self.kind {
            NodeKind::Combined(state) => Some(state),
            _ => None,
        }
    }

    /// Policy applied when this node is combined with its counterparts of a
    /// multi-selection. Only graph nodes take part in combination.
    pub fn combine_mode(&self) -> Option<CombineMode> {
        self.as_graph().map(|state| state.combine_mode)
    }

    pub(crate) fn sort_key(&self) -> SortKey {
        SortKey {
            order: self.order,
            index: self.index.clone(),
            declaration: self.declaration,
            name: self.name.clone(),
        }
    }

    pub fn set_display_name(&mut self, display_name: impl Into<String>) {
        self.display_name = display_name.into();
    }

    /// Changes visibility. The view keeps the parent's visible child count in
    /// sync when this is called from a node-initialized hook.
    pub fn set_visible(&mut self, visible: bool) {
        self.is_visible = visible;
    }

    pub fn set_read_only(&mut self, read_only: bool) {
        self.is_read_only = read_only;
    }

    /// Sets the combine policy of a graph node.
    pub fn set_combine_mode(&mut self, combine_mode: CombineMode) -> Result<()> {
        let path = self.path.clone();
        let state = self.graph_mut().ok_or(NodeError::KindMismatch {
            path,
            expected: "graph",
        })?;
        state.combine_mode = combine_mode;
        Ok(())
    }

    /// Sets the callback deciding whether a value may be written.
    pub fn set_accept_value(
        &mut self,
        accept: impl Fn(&Value) -> bool + Send + Sync + 'static,
    ) -> Result<()> {
        let path = self.path.clone();
        let state = self.graph_mut().ok_or(NodeError::KindMismatch {
            path,
            expected: "graph",
        })?;
        state.accept_value = Some(Arc::new(accept));
        Ok(())
    }

    /// Sets the callback transforming a value before it is written.
    pub fn set_coerce_value(
        &mut self,
        coerce: impl Fn(Value) -> Value + Send + Sync + 'static,
    ) -> Result<()> {
        let path = self.path.clone();
        let state = self.graph_mut().ok_or(NodeError::KindMismatch {
            path,
            expected: "graph",
        })?;
        state.coerce_value = Some(Arc::new(coerce));
        Ok(())
    }

    /// Fails if `name` is already used by a child, a command or an
    /// associated data key.
    pub(crate) fn check_name_available(&self, name: &str) -> Result<()> {
        let taken = self.children.iter().any(|child| child.key.name == name)
            || self.command(name).is_some()
            || self.associated_data.contains_key(name);
        if taken {
            return Err(NodeError::DuplicateMemberName {
                path: self.path.clone(),
                name: name.to_string(),
            }
            .into());
        }
        Ok(())
    }

    /// Adds a command.
    ///
    /// # Errors
    /// Returns [`NodeError::DuplicateMemberName`] if the name is taken.
    pub fn add_command(&mut self, command: NodeCommand) -> Result<()> {
        self.check_name_available(command.name())?;
        self.commands.push(command);
        Ok(())
    }

    pub(crate) fn remove_command(&mut self, name: &str) -> Option<NodeCommand> {
        let position = self
            .commands
            .iter()
            .position(|command| command.name() == name)?;
        Some(self.commands.remove(position))
    }

    /// Adds an associated data entry.
    ///
    /// # Errors
    /// Returns [`NodeError::DuplicateMemberName`] if the key is taken.
    pub fn add_associated_data(
        &mut self,
        key: impl Into<String>,
        value: serde_json::Value,
    ) -> Result<()> {
        let key = key.into();
        self.check_name_available(&key)?;
        self.associated_data.insert(key, value);
        Ok(())
    }

    /// Adds or replaces an associated data entry.
    ///
    /// # Errors
    /// Returns [`NodeError::DuplicateMemberName`] if a child or a command
    /// uses the key.
    pub fn add_or_update_associated_data(
        &mut self,
        key: impl Into<String>,
        value: serde_json::Value,
    ) -> Result<()> {
        let key = key.into();
        if !self.associated_data.contains_key(&key) {
            self.check_name_available(&key)?;
        }
        self.associated_data.insert(key, value);
        Ok(())
    }

    pub fn remove_associated_data(&mut self, key: &str) -> Option<serde_json::Value> {
        self.associated_data.remove(key)
    }

    /// Verifies the naming invariants of the node's members.
    ///
    /// Child names must be valid path segments, and no name may be shared by
    /// two members across children, commands and associated data.
    pub fn check_members(&self) -> Result<()> {
        let mut seen = HashSet::new();
        let names = self
            .children
            .iter()
            .map(|child| child.key.name.as_str())
            .chain(self.commands.iter().map(NodeCommand::name))
            .chain(self.associated_data.keys().map(String::as_str));
        for (position, name) in names.enumerate() {
            if position < self.children.len() && !names::is_valid(name) {
                return Err(NodeError::InvalidMemberName {
                    path: self.path.clone(),
                    name: name.to_string(),
                }
                .into());
            }
            if !seen.insert(name) {
                return Err(NodeError::DuplicateMemberName {
                    path: self.path.clone(),
                    name: name.to_string(),
                }
                .into());
            }
        }
        Ok(())
    }
}
