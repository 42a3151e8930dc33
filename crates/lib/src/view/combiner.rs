//! Fusion of the graph nodes of a multi-selection.
//!
//! A combined node stands for N structurally equivalent graph nodes, one
//! per selected object. Its commands and children are the ones the N nodes
//! have in common, as decided by their [`CombineMode`]. Reading it yields
//! the shared value, or the type default when the values diverge; writing
//! it writes all N nodes inside one combined action.

use std::collections::BTreeMap;

use super::{CombineError, GraphView};
use crate::{
    Index, Result,
    command::{CombineMode, NodeCommand},
    constants::property,
    content::Value,
    node::{CombinedState, Node, NodeError, NodeId, NodeKind},
};

/// Name reported when list items of a selection disagree on their policy.
const LIST_ITEM_GROUP: &str = "(ListItem)";

/// Attributes of a combined node derived from the nodes it combines.
#[derive(Debug)]
struct CombinedFlags {
    read_only: bool,
    visible: bool,
    primitive: bool,
    has_list: bool,
    has_dictionary: bool,
    order: Option<i32>,
    declaration: Option<usize>,
    display_name: String,
}

impl CombinedFlags {
    fn apply(self, node: &mut Node, list_item: bool) {
        node.is_read_only = self.read_only;
        node.is_visible = self.visible;
        node.is_primitive = self.primitive;
        node.has_list = self.has_list;
        node.has_dictionary = self.has_dictionary;
        node.order = self.order;
        node.declaration = self.declaration;
        if !list_item {
            node.display_name = self.display_name;
        }
    }
}

impl GraphView {
    /// Returns true if the nodes share the same type, index and, unless
    /// `ignore_name` is set, name.
    pub fn are_combinable(&self, nodes: &[NodeId], ignore_name: bool) -> Result<bool> {
        let Some((first, rest)) = nodes.split_first() else {
            return Ok(true);
        };
        let first = self.node(*first)?;
        for id in rest {
            let node = self.node(*id)?;
            if node.value_type != first.value_type
                || node.index != first.index
                || (!ignore_name && node.name != first.name)
            {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn combine_mode_of(&self, id: NodeId) -> Result<CombineMode> {
        Ok(self
            .node(id)?
            .combine_mode()
            .unwrap_or(CombineMode::DoNotCombine))
    }

    /// Decides whether a group of same-named children of a selection of
    /// `selection_size` nodes is combined.
    fn should_combine(
        &self,
        nodes: &[NodeId],
        selection_size: usize,
        name: &str,
        ignore_name: bool,
    ) -> Result<bool> {
        if !self.are_combinable(nodes, ignore_name)? {
            return Ok(false);
        }
        let Some(first) = nodes.first() else {
            return Ok(false);
        };
        let mode = self.combine_mode_of(*first)?;
        for id in nodes {
            if self.combine_mode_of(*id)? != mode {
                return Err(CombineError::InconsistentCombineMode {
                    name: name.to_string(),
                }
                .into());
            }
        }
        Ok(mode.should_combine(nodes.len(), selection_size))
    }

    fn combined_flags(&self, nodes: &[NodeId]) -> Result<CombinedFlags> {
        let mut flags = CombinedFlags {
            read_only: false,
            visible: false,
            primitive: true,
            has_list: false,
            has_dictionary: false,
            order: None,
            declaration: None,
            display_name: String::new(),
        };
        let mut null_order = false;

        for (position, id) in nodes.iter().enumerate() {
            let node = self.node(*id)?;
            flags.read_only |= node.is_read_only;
            flags.visible |= node.is_visible;
            flags.primitive &= node.is_primitive;

            // A missing order wins over later orders, unless every order
            // seen so far agrees.
            if node.order.is_none() {
                null_order = true;
            }
            if flags.order == node.order || (!null_order && flags.order.is_none()) {
                flags.order = node.order;
            }

            if position == 0 {
                flags.has_list = node.has_list;
                flags.has_dictionary = node.has_dictionary;
                flags.declaration = node.declaration;
                flags.display_name = node.display_name.clone();
            }
        }
        Ok(flags)
    }

    /// Creates a combined node over `nodes` and builds its commands, children
    /// and associated data.
    ///
    /// # Errors
    /// Returns [`CombineError::UncombinableSet`] if the nodes are not graph
    /// nodes sharing type, index and (unless `list_item`) name.
    pub(crate) fn build_combined_node(
        &mut self,
        parent: Option<NodeId>,
        name: String,
        nodes: Vec<NodeId>,
        index: Index,
        list_item: bool,
    ) -> Result<NodeId> {
        let uncombinable = |reason: String| CombineError::UncombinableSet { reason };

        let Some(&first) = nodes.first() else {
            return Err(uncombinable("no node to combine".to_string()).into());
        };
        for single in &nodes {
            let node = self.node(*single)?;
            if node.as_graph().is_none() {
                return Err(uncombinable(format!("'{}' is not a graph node", node.path)).into());
            }
        }
        if !self.are_combinable(&nodes, list_item)? {
            return Err(uncombinable(format!(
                "{} nodes named '{name}' differ in type, name or index",
                nodes.len()
            ))
            .into());
        }

        let flags = self.combined_flags(&nodes)?;
        let mut initial_values = Vec::with_capacity(nodes.len());
        for single in &nodes {
            initial_values.push(self.value(*single)?);
        }
        let mut distinct_initial_values: Vec<Value> = Vec::new();
        for value in &initial_values {
            if !distinct_initial_values.contains(value) {
                distinct_initial_values.push(value.clone());
            }
        }

        let id = self.allocate_id();
        let value_type = self.node(first)?.value_type.clone();
        let state = CombinedState {
            nodes: nodes.clone(),
            initial_values,
            distinct_initial_values,
            refresh_queued: false,
            list_item,
        };
        let mut node = Node::new(id, name, value_type, NodeKind::Combined(state));
        node.index = index;
        flags.apply(&mut node, list_item);
        self.nodes.insert(id, node);
        for single in &nodes {
            self.combined_by_single.insert(*single, id);
        }

        if let Some(parent) = parent
            && let Err(e) = self.add_child(parent, id)
        {
            self.destroy_subtree(id);
            return Err(e);
        }
        if let Err(e) = self.initialize_combined(id) {
            if let Err(cleanup) = self.destroy(id) {
                tracing::warn!("Failed to discard combined node {id}: {cleanup}");
            }
            return Err(e);
        }
        Ok(id)
    }

    /// Builds the commands, children and associated data of a combined node.
    fn initialize_combined(&mut self, id: NodeId) -> Result<()> {
        let node = self.node(id)?;
        let Some(state) = node.as_combined() else {
            return Ok(());
        };
        let nodes = state.nodes.clone();
        let count = nodes.len();
        let Some(&first) = nodes.first() else {
            return Ok(());
        };

        let mut groups: BTreeMap<String, Vec<NodeCommand>> = BTreeMap::new();
        for single in &nodes {
            for command in &self.node(*single)?.commands {
                groups
                    .entry(command.name().to_string())
                    .or_default()
                    .push(command.clone());
            }
        }
        for (name, group) in groups {
            let Some(mode) = group.first().map(NodeCommand::combine_mode) else {
                continue;
            };
            if group.iter().any(|command| command.combine_mode() != mode) {
                return Err(CombineError::InconsistentCombineMode { name }.into());
            }
            if mode.should_combine(group.len(), count) {
                let command = NodeCommand::combined(name, group)?;
                self.add_command(id, command)?;
            }
        }
        self.add_command(id, NodeCommand::reset_initial_values())?;

        let first_node = self.node(first)?;
        if !first_node.has_list || first_node.has_dictionary {
            for (name, group) in self.children_by_name(&nodes)? {
                if self.should_combine(&group, count, &name, false)? {
                    let index = self.node(group[0])?.index.clone();
                    self.build_combined_node(Some(id), name, group, index, false)?;
                }
            }
        } else if let Some(slots) = self.children_by_value(&nodes)? {
            let mut position = 0;
            for group in slots {
                if self.should_combine(&group, count, LIST_ITEM_GROUP, true)? {
                    let name = self.settings.list_item_name(position);
                    self.build_combined_node(Some(id), name, group, Index::Position(position), true)?;
                    position += 1;
                }
            }
        }

        for (key, value) in self.shared_associated_data(&nodes)? {
            self.add_associated_data(id, key, value)?;
        }
        self.check_node(id)
    }

    /// Children of the nodes grouped by name, in order of first appearance.
    fn children_by_name(&self, nodes: &[NodeId]) -> Result<Vec<(String, Vec<NodeId>)>> {
        let mut groups: Vec<(String, Vec<NodeId>)> = Vec::new();
        for single in nodes {
            let node = self.node(*single)?;
            for child in &node.children {
                match groups.iter_mut().find(|(name, _)| *name == child.key.name) {
                    Some((_, group)) => group.push(child.id),
                    None => groups.push((child.key.name.clone(), vec![child.id])),
                }
            }
        }
        Ok(groups)
    }

    /// Pairs the items of several lists by value.
    ///
    /// Each item joins the first slot holding an equal value that no item of
    /// the same list joined yet, or opens a new slot. This pairing is best
    /// effort: lists whose items repeat or diverge produce slots that do not
    /// line up with positions. Returns `None` if any item is not primitive.
    fn children_by_value(&self, nodes: &[NodeId]) -> Result<Option<Vec<Vec<NodeId>>>> {
        let mut slots: Vec<(Value, Vec<NodeId>)> = Vec::new();
        for single in nodes {
            let mut used: Vec<usize> = Vec::new();
            for child in self.node(*single)?.children() {
                if !self.node(child)?.is_primitive {
                    return Ok(None);
                }
                let value = self.value(child)?;
                let free = slots
                    .iter()
                    .enumerate()
                    .position(|(slot, (key, _))| *key == value && !used.contains(&slot));
                let slot = match free {
                    Some(slot) => slot,
                    None => {
                        slots.push((value, Vec::new()));
                        slots.len() - 1
                    }
                };
                slots[slot].1.push(child);
                used.push(slot);
            }
        }
        Ok(Some(slots.into_iter().map(|(_, group)| group).collect()))
    }

    /// Associated data entries present and equal on every node.
    fn shared_associated_data(&self, nodes: &[NodeId]) -> Result<Vec<(String, serde_json::Value)>> {
        let Some((first, rest)) = nodes.split_first() else {
            return Ok(Vec::new());
        };
        let mut shared = Vec::new();
        for (key, value) in &self.node(*first)?.associated_data {
            let mut everywhere = true;
            for other in rest {
                if self.node(*other)?.associated(key) != Some(value) {
                    everywhere = false;
                    break;
                }
            }
            if everywhere {
                shared.push((key.clone(), value.clone()));
            }
        }
        Ok(shared)
    }

    /// Rebuilds a combined node from the current state of the nodes it
    /// combines. A root is rebuilt in place.
    pub(crate) fn refresh_combined(&mut self, id: NodeId) -> Result<()> {
        let node = self.node(id)?;
        let Some(state) = node.as_combined() else {
            return Ok(());
        };
        tracing::debug!(path = %node.path, "Refreshing combined node");
        let nodes = state.nodes.clone();
        let list_item = state.list_item;
        let parent = node.parent;
        let was_visible = node.is_visible;

        let refreshed = [
            property::VALUE,
            property::HAS_MULTIPLE_VALUES,
            property::IS_PRIMITIVE,
            property::HAS_LIST,
            property::HAS_DICTIONARY,
        ];
        for name in refreshed {
            self.notify_changing(id, name);
        }

        let alive = nodes.iter().all(|single| self.contains(*single));
        if alive && self.are_combinable(&nodes, list_item)? {
            self.clear_commands(id)?;
            self.clear_children(id)?;
            self.clear_associated_data(id)?;

            let flags = self.combined_flags(&nodes)?;
            let is_visible = flags.visible;
            flags.apply(self.node_mut(id)?, list_item);
            if was_visible != is_visible
                && let Some(parent) = parent
            {
                self.adjust_visible_count(parent, is_visible)?;
            }
            self.resort(id)?;
            self.initialize_combined(id)?;
        } else {
            tracing::debug!(node = %id, "Combined nodes changed shape; waiting for parent refresh");
        }

        for name in refreshed {
            self.notify_changed(id, name);
        }
        Ok(())
    }

    /// Returns true if the nodes combined by `id` currently disagree.
    ///
    /// Primitive nodes disagree when their values differ; other nodes when
    /// their values have different runtime shapes. Always false for nodes
    /// that are not combined.
    pub fn has_multiple_values(&self, id: NodeId) -> Result<bool> {
        let node = self.node(id)?;
        let Some(state) = node.as_combined() else {
            return Ok(false);
        };
        let mut values = Vec::with_capacity(state.nodes.len());
        for single in &state.nodes {
            values.push(self.value(*single)?);
        }
        Ok(differ(&values, node.is_primitive))
    }

    /// Returns true if the nodes combined by `id` disagreed when it was built.
    pub fn has_multiple_initial_values(&self, id: NodeId) -> Result<bool> {
        let node = self.node(id)?;
        Ok(node
            .as_combined()
            .is_some_and(|state| differ(&state.initial_values, node.is_primitive)))
    }

    /// The distinct values of the combined nodes when `id` was built.
    pub fn distinct_initial_values(&self, id: NodeId) -> Result<Vec<Value>> {
        let node = self.node(id)?;
        Ok(node
            .as_combined()
            .map(|state| state.distinct_initial_values.clone())
            .unwrap_or_default())
    }

    /// Writes back the values the combined nodes had when `id` was built,
    /// inside one combined action. The values are written as captured,
    /// without running the accept and coerce callbacks of the nodes.
    pub fn reset_initial_values(&mut self, id: NodeId) -> Result<()> {
        let node = self.node(id)?;
        let state = node.as_combined().ok_or_else(|| NodeError::KindMismatch {
            path: node.path.clone(),
            expected: "combined",
        })?;
        let writes: Vec<(NodeId, Value)> = state
            .nodes
            .iter()
            .copied()
            .zip(state.initial_values.iter().cloned())
            .collect();
        let name = self.settings.update_message(&node.path, &Value::Null);
        self.write_combined(id, name, writes, false)
    }

    /// Writes of a value to a combined node: one per visible combined node.
    pub(crate) fn combined_writes(&self, id: NodeId, value: &Value) -> Result<Vec<(NodeId, Value)>> {
        let node = self.node(id)?;
        let Some(state) = node.as_combined() else {
            return Ok(Vec::new());
        };
        let mut writes = Vec::with_capacity(state.nodes.len());
        for single in &state.nodes {
            if self.node(*single)?.is_visible {
                writes.push((*single, value.clone()));
            }
        }
        Ok(writes)
    }

    /// Performs the writes of a combined node inside one combined action,
    /// then refreshes it once, along with every other combined node whose
    /// backing nodes changed during the writes.
    pub(crate) fn write_combined(
        &mut self,
        id: NodeId,
        name: String,
        writes: Vec<(NodeId, Value)>,
        apply_callbacks: bool,
    ) -> Result<()> {
        let path = self.node(id)?.path.clone();
        self.notify_changing(id, property::VALUE);
        self.notify_changing(id, property::HAS_MULTIPLE_VALUES);

        let previous_writer = self.action.writing.replace(id);
        let previous_changed = std::mem::take(&mut self.action.changed_during_write);
        let result = self.with_action(Some(name), |view| {
            for (single, value) in writes {
                if let Some((source, index, value)) =
                    view.prepare_graph_write(single, value, apply_callbacks)?
                {
                    view.content.update(source, &index, value)?;
                    view.process_content_changes()?;
                }
            }
            let changed = std::mem::take(&mut view.action.changed_during_write);
            view.refresh_combined(id)?;
            for other in changed {
                if other != id && view.contains(other) {
                    view.refresh_combined(other)?;
                }
            }
            view.notify_node_changed(path);
            Ok(())
        });
        self.action.writing = previous_writer;
        self.action.changed_during_write = previous_changed;

        self.notify_changed(id, property::HAS_MULTIPLE_VALUES);
        self.notify_changed(id, property::VALUE);
        result
    }
}

fn differ(values: &[Value], primitive: bool) -> bool {
    let Some((first, rest)) = values.split_first() else {
        return false;
    };
    rest.iter().any(|value| {
        if primitive {
            value != first
        } else {
            value.shape() != first.shape()
        }
    })
}
