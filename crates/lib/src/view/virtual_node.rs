//! Nodes backed by getter/setter closures instead of content.

use std::sync::Arc;

use super::GraphView;
use crate::{
    Index, Result,
    constants::property,
    content::{Value, ValueType},
    node::{Node, NodeError, NodeId, NodeKind, VirtualGetter, VirtualSetter, VirtualState, names},
};

/// Description of a virtual node, turned into a node by
/// [`GraphView::create_virtual`] or [`GraphView::add_virtual_child`].
pub struct VirtualNode {
    name: String,
    value_type: ValueType,
    order: Option<i32>,
    index: Index,
    getter: VirtualGetter,
    setter: Option<VirtualSetter>,
}

impl VirtualNode {
    /// A read-only virtual node.
    pub fn new(
        name: impl Into<String>,
        value_type: ValueType,
        getter: impl Fn() -> Value + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            value_type,
            order: None,
            index: Index::Empty,
            getter: Arc::new(getter),
            setter: None,
        }
    }

    /// Makes the node writable.
    pub fn with_setter(mut self, setter: impl Fn(Value) -> Result<()> + Send + Sync + 'static) -> Self {
        self.setter = Some(Arc::new(setter));
        self
    }

    pub fn with_order(mut self, order: i32) -> Self {
        self.order = Some(order);
        self
    }

    pub fn with_index(mut self, index: Index) -> Self {
        self.index = index;
        self
    }
}

impl GraphView {
    /// Creates a detached virtual node. Reserved names are escaped like
    /// member names.
    ///
    /// # Errors
    /// Returns [`NodeError::InvalidMemberName`] if the name is blank or
    /// contains a path separator.
    pub fn create_virtual(&mut self, spec: VirtualNode) -> Result<NodeId> {
        let VirtualNode {
            name,
            value_type,
            order,
            index,
            getter,
            setter,
        } = spec;
        if !names::is_valid(&name) {
            return Err(NodeError::InvalidMemberName {
                path: String::new(),
                name,
            }
            .into());
        }
        let name = names::escape(&name).into_owned();

        let id = self.allocate_id();
        let read_only = setter.is_none();
        let primitive = value_type.is_primitive();
        let mut node = Node::new(
            id,
            name,
            value_type,
            NodeKind::Virtual(VirtualState { getter, setter }),
        );
        node.order = order;
        node.index = index;
        node.is_read_only = read_only;
        node.is_primitive = primitive;
        self.nodes.insert(id, node);
        Ok(id)
    }

    /// Creates a virtual node and adds it under `parent`.
    pub fn add_virtual_child(&mut self, parent: NodeId, spec: VirtualNode) -> Result<NodeId> {
        let id = self.create_virtual(spec)?;
        if let Err(e) = self.add_child(parent, id) {
            self.destroy_subtree(id);
            return Err(e);
        }
        Ok(id)
    }

    pub(crate) fn set_virtual_value(&mut self, id: NodeId, value: Value) -> Result<()> {
        let node = self.node(id)?;
        let NodeKind::Virtual(state) = &node.kind else {
            return Err(NodeError::KindMismatch {
                path: node.path.clone(),
                expected: "virtual",
            }
            .into());
        };
        let path = node.path.clone();
        let Some(setter) = state.setter.clone() else {
            return Err(NodeError::ReadOnly { path }.into());
        };

        self.notify_changing(id, property::VALUE);
        let result = setter(value);
        self.notify_changed(id, property::VALUE);
        result?;
        self.notify_node_changed(path);
        Ok(())
    }
}
