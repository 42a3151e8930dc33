//! Structural operations on the node tree.

use uuid::Uuid;

use super::GraphView;
use crate::{
    Result,
    command::NodeCommand,
    constants::{HAS_COMMAND_PREFIX, PATH_SEPARATOR, property},
    node::{ChildRef, NodeError, NodeId, NodeKind, names, ordering},
};

impl GraphView {
    /// Attaches a detached node as a child of `parent`.
    ///
    /// # Errors
    /// - [`NodeError::AlreadyParented`] if the node has a parent or is a root
    /// - [`NodeError::DuplicateMemberName`] if the parent already has a
    ///   member with the node's name
    /// - [`NodeError::InvalidMove`] if `parent` is inside the node's subtree
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        let child_node = self.node(child)?;
        let is_root = self.root == Some(child) || self.single_roots.contains(&child);
        if child_node.parent.is_some() || is_root {
            return Err(NodeError::AlreadyParented {
                path: child_node.path.clone(),
            }
            .into());
        }
        let name = child_node.name.clone();
        let key = child_node.sort_key();
        let visible = child_node.is_visible;

        if self.is_in_subtree(parent, child)? {
            return Err(NodeError::InvalidMove {
                reason: format!("'{name}' cannot become a child of its own subtree"),
            }
            .into());
        }
        let parent_node = self.node(parent)?;
        if parent_node.children.iter().any(|existing| existing.id == child) {
            return Err(NodeError::AlreadyParented {
                path: parent_node.path.clone(),
            }
            .into());
        }
        parent_node.check_name_available(&name)?;

        self.notify_child_changing(parent, &name);
        if visible {
            self.notify_changing(parent, property::VISIBLE_CHILDREN_COUNT);
        }

        let parent_node = self.node_mut(parent)?;
        let position = ordering::insertion_point(&parent_node.children, &key, |c| &c.key);
        parent_node.children.insert(position, ChildRef { id: child, key });
        if visible {
            parent_node.visible_children += 1;
        }
        self.node_mut(child)?.parent = Some(parent);
        self.update_paths(child);

        if visible {
            self.notify_changed(parent, property::VISIBLE_CHILDREN_COUNT);
        }
        self.notify_child_changed(parent, &name);
        self.check_node(parent)
    }

    /// Detaches a child from its parent. The child stays alive.
    ///
    /// # Errors
    /// Returns [`NodeError::NotAChild`] if `child` is not a direct child of
    /// `parent`.
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        let parent_node = self.node(parent)?;
        let position = parent_node
            .children
            .iter()
            .position(|existing| existing.id == child)
            .ok_or_else(|| NodeError::NotAChild {
                parent: parent_node.path.clone(),
                child,
            })?;
        let name = parent_node.children[position].key.name.clone();
        let visible = self.nodes.get(&child).is_some_and(|node| node.is_visible);

        self.notify_child_changing(parent, &name);
        if visible {
            self.notify_changing(parent, property::VISIBLE_CHILDREN_COUNT);
        }

        let parent_node = self.node_mut(parent)?;
        parent_node.children.remove(position);
        if visible {
            parent_node.visible_children = parent_node.visible_children.saturating_sub(1);
        }
        if let Some(node) = self.nodes.get_mut(&child) {
            node.parent = None;
            self.update_paths(child);
        }

        if visible {
            self.notify_changed(parent, property::VISIBLE_CHILDREN_COUNT);
        }
        self.notify_child_changed(parent, &name);
        Ok(())
    }

    /// Moves a node under a new parent, optionally renaming it.
    ///
    /// # Errors
    /// Returns [`NodeError::InvalidMove`] if the node or the new parent is a
    /// combined node, if the node is a root, if the move would create a
    /// cycle, or if the new parent already has a member with the resulting
    /// name.
    pub fn move_node(&mut self, id: NodeId, new_parent: NodeId, new_name: Option<&str>) -> Result<()> {
        let invalid = |reason: String| NodeError::InvalidMove { reason };

        let node = self.node(id)?;
        if node.is_combined() {
            return Err(invalid(format!("combined node '{}' cannot be moved", node.path)).into());
        }
        if node.parent.is_none() && (self.root == Some(id) || self.single_roots.contains(&id)) {
            return Err(invalid(format!("root '{}' cannot be moved", node.path)).into());
        }
        let old_parent = node.parent;
        let name = match new_name {
            Some(name) => names::escape(name).into_owned(),
            None => node.name.clone(),
        };
        if !names::is_valid(&name) {
            return Err(invalid(format!("'{name}' is not a valid node name")).into());
        }

        let target = self.node(new_parent)?;
        if target.is_combined() {
            return Err(invalid(format!(
                "cannot move into combined node '{}'",
                target.path
            ))
            .into());
        }
        if self.is_in_subtree(new_parent, id)? {
            return Err(invalid(format!(
                "'{}' is the node itself or one of its descendants",
                target.path
            ))
            .into());
        }
        let unchanged = old_parent == Some(new_parent) && self.node(id)?.name == name;
        if unchanged {
            return Ok(());
        }
        if target.check_name_available(&name).is_err() {
            return Err(invalid(format!("'{}' already has a member named '{name}'", target.path)).into());
        }

        if let Some(old_parent) = old_parent {
            self.remove_child(old_parent, id)?;
        }
        self.node_mut(id)?.name = name;
        self.add_child(new_parent, id)
    }

    /// Destroys a node and its whole subtree, detaching it from its parent
    /// first. Every id of the subtree becomes invalid.
    pub fn destroy(&mut self, id: NodeId) -> Result<()> {
        if let Some(parent) = self.node(id)?.parent {
            self.remove_child(parent, id)?;
        }
        self.destroy_subtree(id);
        if self.root == Some(id) {
            self.root = None;
        }
        self.single_roots.retain(|root| *root != id);
        Ok(())
    }

    /// Releases a subtree without notifying the parent.
    pub(crate) fn destroy_subtree(&mut self, id: NodeId) {
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let Some(node) = self.nodes.remove(&current) else {
                continue;
            };
            stack.extend(node.children.iter().map(|child| child.id));

            match &node.kind {
                NodeKind::Graph(state) => {
                    self.unsubscribe(current, state.source);
                    if let Some(target) = state.target {
                        self.unsubscribe(current, target);
                    }
                    self.combined_by_single.remove(&current);
                }
                NodeKind::Combined(state) => {
                    for single in &state.nodes {
                        if self.combined_by_single.get(single) == Some(&current) {
                            self.combined_by_single.remove(single);
                        }
                    }
                    self.deferred.retain(|queued| *queued != current);
                }
                NodeKind::Virtual(_) => {}
            }
        }
    }

    /// Destroys every child of a node.
    pub(crate) fn clear_children(&mut self, id: NodeId) -> Result<()> {
        let children: Vec<NodeId> = self.node(id)?.children().collect();
        for child in children {
            self.destroy(child)?;
        }
        Ok(())
    }

    /// Returns true if `candidate` is `root` or one of its descendants.
    fn is_in_subtree(&self, candidate: NodeId, root: NodeId) -> Result<bool> {
        let mut current = Some(candidate);
        while let Some(id) = current {
            if id == root {
                return Ok(true);
            }
            current = self.node(id)?.parent;
        }
        Ok(false)
    }

    /// Recomputes the paths of a subtree from its parent's path.
    pub(crate) fn update_paths(&mut self, id: NodeId) {
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let parent_path = self
                .nodes
                .get(&current)
                .and_then(|node| node.parent)
                .and_then(|parent| self.nodes.get(&parent))
                .map(|parent| parent.path.clone());
            let Some(node) = self.nodes.get_mut(&current) else {
                continue;
            };
            node.path = match parent_path {
                Some(parent_path) => format!("{parent_path}{PATH_SEPARATOR}{}", node.name),
                None => node.name.clone(),
            };
            stack.extend(node.children.iter().map(|child| child.id));
        }
    }

    /// Re-inserts a node among its siblings after its sort key changed.
    pub(crate) fn resort(&mut self, id: NodeId) -> Result<()> {
        let node = self.node(id)?;
        let Some(parent) = node.parent else {
            return Ok(());
        };
        let key = node.sort_key();
        let parent_node = self.node_mut(parent)?;
        parent_node.children.retain(|child| child.id != id);
        let position = ordering::insertion_point(&parent_node.children, &key, |c| &c.key);
        parent_node.children.insert(position, ChildRef { id, key });
        Ok(())
    }

    /// Shows or hides a node, keeping the parent's visible child count in sync.
    pub fn set_visible(&mut self, id: NodeId, visible: bool) -> Result<()> {
        let node = self.node(id)?;
        if node.is_visible == visible {
            return Ok(());
        }
        let parent = node.parent;

        self.notify_changing(id, property::IS_VISIBLE);
        self.node_mut(id)?.is_visible = visible;
        if let Some(parent) = parent {
            self.adjust_visible_count(parent, visible)?;
        }
        self.notify_changed(id, property::IS_VISIBLE);
        Ok(())
    }

    pub(crate) fn adjust_visible_count(&mut self, parent: NodeId, shown: bool) -> Result<()> {
        self.notify_changing(parent, property::VISIBLE_CHILDREN_COUNT);
        let parent_node = self.node_mut(parent)?;
        parent_node.visible_children = if shown {
            parent_node.visible_children + 1
        } else {
            parent_node.visible_children.saturating_sub(1)
        };
        self.notify_changed(parent, property::VISIBLE_CHILDREN_COUNT);
        Ok(())
    }

    /// Overrides the member order of a graph node and re-sorts it among its
    /// siblings. `None` restores the order of the member metadata.
    pub fn set_custom_order(&mut self, id: NodeId, order: Option<i32>) -> Result<()> {
        let node = self.node_mut(id)?;
        let path = node.path.clone();
        let state = node.graph_mut().ok_or(NodeError::KindMismatch {
            path,
            expected: "graph",
        })?;
        state.custom_order = order;
        let member_order = state.descriptor.as_ref().and_then(|d| d.order);

        self.notify_changing(id, property::CUSTOM_ORDER);
        self.notify_changing(id, property::ORDER);
        self.node_mut(id)?.order = order.or(member_order);
        self.resort(id)?;
        self.notify_changed(id, property::ORDER);
        self.notify_changed(id, property::CUSTOM_ORDER);
        Ok(())
    }

    /// Adds a command to a node, notifying its synthetic has-command property.
    pub fn add_command(&mut self, id: NodeId, command: NodeCommand) -> Result<()> {
        let synthetic = format!("{HAS_COMMAND_PREFIX}{}", command.name());
        self.node(id)?.check_name_available(command.name())?;
        self.notify_changing(id, &synthetic);
        self.node_mut(id)?.add_command(command)?;
        self.notify_changed(id, &synthetic);
        Ok(())
    }

    pub fn remove_command(&mut self, id: NodeId, name: &str) -> Result<Option<NodeCommand>> {
        if self.node(id)?.command(name).is_none() {
            return Ok(None);
        }
        let synthetic = format!("{HAS_COMMAND_PREFIX}{name}");
        self.notify_changing(id, &synthetic);
        let removed = self.node_mut(id)?.remove_command(name);
        self.notify_changed(id, &synthetic);
        Ok(removed)
    }

    pub(crate) fn clear_commands(&mut self, id: NodeId) -> Result<()> {
        let names: Vec<String> = self
            .node(id)?
            .commands
            .iter()
            .map(|command| command.name().to_string())
            .collect();
        for name in names {
            self.remove_command(id, &name)?;
        }
        Ok(())
    }

    /// Adds an associated data entry to a node.
    ///
    /// # Errors
    /// Returns [`NodeError::DuplicateMemberName`] if the key is taken.
    pub fn add_associated_data(
        &mut self,
        id: NodeId,
        key: impl Into<String>,
        value: serde_json::Value,
    ) -> Result<()> {
        let key = key.into();
        self.node(id)?.check_name_available(&key)?;
        self.notify_changing(id, &key);
        self.node_mut(id)?.add_associated_data(key.clone(), value)?;
        self.notify_changed(id, &key);
        self.check_node(id)
    }

    /// Adds or replaces an associated data entry of a node.
    pub fn add_or_update_associated_data(
        &mut self,
        id: NodeId,
        key: impl Into<String>,
        value: serde_json::Value,
    ) -> Result<()> {
        let key = key.into();
        self.notify_changing(id, &key);
        self.node_mut(id)?
            .add_or_update_associated_data(key.clone(), value)?;
        self.notify_changed(id, &key);
        self.check_node(id)
    }

    pub fn remove_associated_data(
        &mut self,
        id: NodeId,
        key: &str,
    ) -> Result<Option<serde_json::Value>> {
        if self.node(id)?.associated(key).is_none() {
            return Ok(None);
        }
        self.notify_changing(id, key);
        let removed = self.node_mut(id)?.remove_associated_data(key);
        self.notify_changed(id, key);
        Ok(removed)
    }

    pub(crate) fn clear_associated_data(&mut self, id: NodeId) -> Result<()> {
        let keys: Vec<String> = self.node(id)?.associated_data.keys().cloned().collect();
        for key in keys {
            self.remove_associated_data(id, &key)?;
        }
        Ok(())
    }

    /// Path built from the display names of a node and its ancestors. The
    /// root contributes nothing.
    pub fn display_path(&self, id: NodeId) -> Result<String> {
        let mut segments = Vec::new();
        let mut current = self.node(id)?;
        while let Some(parent) = current.parent {
            segments.push(current.display_name.as_str());
            current = self.node(parent)?;
        }
        segments.reverse();
        Ok(segments.join(&PATH_SEPARATOR.to_string()))
    }

    /// Depth of a node; a root has level 0.
    pub fn level(&self, id: NodeId) -> Result<usize> {
        let mut level = 0;
        let mut current = self.node(id)?;
        while let Some(parent) = current.parent {
            level += 1;
            current = self.node(parent)?;
        }
        Ok(level)
    }

    /// Resolves a dotted path such as `Root.Transform.Position` against the
    /// presented tree. Segments are escaped like member names.
    ///
    /// # Errors
    /// Returns [`NodeError::InvalidPath`] if the path is empty, does not
    /// start with the root's name, or names a missing child.
    pub fn resolve_path(&self, path: &str) -> Result<NodeId> {
        let invalid = |reason: String| NodeError::InvalidPath {
            path: path.to_string(),
            reason,
        };

        let root = self
            .root
            .ok_or_else(|| invalid("the view has no root".to_string()))?;
        let mut segments = path.split(PATH_SEPARATOR);
        let first = segments.next().unwrap_or_default();
        let root_node = self.node(root)?;
        if first != root_node.name {
            return Err(invalid(format!("the root is named '{}'", root_node.name)).into());
        }

        let mut current = root;
        for segment in segments {
            current = self
                .node(current)?
                .child_id(segment)
                .ok_or_else(|| invalid(format!("no child named '{segment}'")))?;
        }
        Ok(current)
    }

    /// Finds a node by its guid, in the presented tree or a backing graph tree.
    pub fn find_by_guid(&self, guid: Uuid) -> Option<NodeId> {
        self.nodes
            .values()
            .find(|node| node.guid == guid)
            .map(|node| node.id)
    }

    /// Verifies the structural invariants of every node: member names are
    /// valid and unique, parent and child links agree, and visible child
    /// counts are exact.
    pub fn verify_structure(&self) -> Result<()> {
        for node in self.nodes.values() {
            node.check_members()?;

            let mut visible = 0;
            for child in &node.children {
                let child_node = self.node(child.id)?;
                if child_node.parent != Some(node.id) || child_node.name != child.key.name {
                    return Err(NodeError::NotAChild {
                        parent: node.path.clone(),
                        child: child.id,
                    }
                    .into());
                }
                if child_node.is_visible {
                    visible += 1;
                }
            }
            if visible != node.visible_children {
                return Err(NodeError::Inconsistent {
                    path: node.path.clone(),
                    reason: format!(
                        "visible child count is {} but {visible} children are visible",
                        node.visible_children
                    ),
                }
                .into());
            }
        }
        Ok(())
    }
}
