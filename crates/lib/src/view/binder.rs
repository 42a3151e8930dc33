//! Binding of graph nodes to backing content.
//!
//! A graph node presents one location of the content graph: a member of an
//! object, or the item at some index of a collection. Initializing it
//! resolves the location it really points to (the target), builds its
//! commands from the operations of the target and of the source, and
//! expands its children according to the shape of the target.

use std::sync::Arc;

use super::GraphView;
use crate::{
    Index, Result,
    command::{CombineMode, NodeCommand},
    constants::property,
    content::{CollectionShape, ContentId, ContentKind, ContentPath, MemberDescriptor, ValueType},
    node::{GraphState, Node, NodeError, NodeId, NodeKind, names},
    service::{ExpandReferencePolicy, PropertyProvider},
};

/// Everything needed to create a graph node.
struct GraphNodeSpec {
    name: String,
    source: ContentId,
    source_path: ContentPath,
    index: Index,
    descriptor: Option<MemberDescriptor>,
    value_type: ValueType,
    provider: Arc<dyn PropertyProvider>,
    expansion: ExpandReferencePolicy,
}

impl GraphView {
    /// Creates the graph root presenting the root content of a provider.
    pub(crate) fn create_graph_root(&mut self, provider: Arc<dyn PropertyProvider>) -> Result<NodeId> {
        let root = provider.root_content();
        let spec = GraphNodeSpec {
            name: self.settings.root_name.clone(),
            source: root,
            source_path: ContentPath::new(root),
            index: Index::Empty,
            descriptor: None,
            value_type: self.content.value_type(root)?,
            provider,
            expansion: ExpandReferencePolicy::Full,
        };
        self.create_graph_node(None, spec)
    }

    fn create_graph_node(&mut self, parent: Option<NodeId>, spec: GraphNodeSpec) -> Result<NodeId> {
        let is_primitive = self.is_primitive_location(&spec.value_type, spec.source, &spec.index)?;
        // Items of primitive collections are combined even when only part of a
        // selection holds them.
        let combine_mode = if !spec.index.is_empty() && is_primitive {
            CombineMode::AlwaysCombine
        } else {
            CombineMode::CombineOnlyForAll
        };

        let id = self.allocate_id();
        let state = GraphState {
            source: spec.source,
            source_path: spec.source_path,
            target: None,
            descriptor: spec.descriptor,
            provider: spec.provider,
            expansion: spec.expansion,
            combine_mode,
            custom_order: None,
            is_initialized: false,
            accept_value: None,
            coerce_value: None,
        };
        let mut node = Node::new(id, spec.name, spec.value_type, NodeKind::Graph(state));
        node.index = spec.index;
        node.is_primitive = is_primitive;
        apply_descriptor(&mut node);
        self.nodes.insert(id, node);

        if let Some(parent) = parent
            && let Err(e) = self.add_child(parent, id)
        {
            self.destroy_subtree(id);
            return Err(e);
        }

        if let Err(e) = self
            .initialize_graph_node(id)
            .and_then(|()| self.run_node_hooks(id))
        {
            if let Err(cleanup) = self.destroy(id) {
                tracing::warn!("Failed to discard node {id}: {cleanup}");
            }
            return Err(e);
        }
        Ok(id)
    }

    fn is_primitive_location(&self, value_type: &ValueType, source: ContentId, index: &Index) -> Result<bool> {
        if value_type.is_primitive() {
            return Ok(true);
        }
        if *value_type == ValueType::Any {
            return Ok(self.content.retrieve(source, index)?.is_primitive());
        }
        Ok(false)
    }

    /// Resolves the location a source points to.
    ///
    /// A single reference resolves to the referenced object, an indexed
    /// reference to the object at that index (`None` for a null reference),
    /// and anything else to the source itself.
    pub(crate) fn resolve_target(&self, source: ContentId, index: &Index) -> Result<Option<ContentId>> {
        if let Some(target) = self.content.target_reference(source)? {
            return Ok(Some(target));
        }
        if !index.is_empty()
            && let Some(references) = self.content.item_references(source)?
        {
            return Ok(references
                .into_iter()
                .find(|reference| &reference.index == index)
                .and_then(|reference| reference.target));
        }
        if index.is_empty() && self.content.kind(source)? == ContentKind::Member {
            let value_type = self.content.value_type(source)?;
            let holds_reference = matches!(
                value_type,
                ValueType::Object(_) | ValueType::List(_) | ValueType::Dictionary(_)
            );
            if holds_reference && self.content.retrieve(source, index)?.is_null() {
                return Ok(None);
            }
        }
        Ok(Some(source))
    }

    /// Binds a graph node to its content: resolves its target, builds its
    /// commands, subscribes to its content and expands its children.
    fn initialize_graph_node(&mut self, id: NodeId) -> Result<()> {
        let node = self.node(id)?;
        let Some(state) = node.as_graph() else {
            return Ok(());
        };
        let source = state.source;
        let source_path = state.source_path.clone();
        let provider = state.provider.clone();
        let expansion = state.expansion;
        let index = node.index.clone();
        let value_type = node.value_type.clone();
        let is_primitive = node.is_primitive;
        let path = node.path.clone();

        let target = self.resolve_target(source, &index)?;
        let target_path = source_path.target_of(self.content.as_ref(), source, &index)?;
        if let Some(target) = target {
            let resolved = target_path.resolve(self.content.as_ref())?;
            if resolved != target {
                return Err(NodeError::InvalidPath {
                    path,
                    reason: format!("content path {target_path} resolves to {resolved}, not {target}"),
                }
                .into());
            }
        }
        // The item of a primitive collection targets the collection itself,
        // which it does not present.
        let presented = target.filter(|target| index.is_empty() || *target != source);

        let shape = match presented {
            Some(target) => self.content.collection_shape(target)?,
            None => None,
        };
        let has_list = value_type.is_list() || matches!(shape, Some(CollectionShape::List { .. }));
        let has_dictionary =
            value_type.is_dictionary() || matches!(shape, Some(CollectionShape::Dictionary { .. }));

        let mut commands: Vec<NodeCommand> = Vec::new();
        if let Some(target) = target
            && target != source
        {
            for operation in self.content.operations(target)? {
                commands.push(NodeCommand::model(operation, target_path.clone(), Index::Empty));
            }
        }
        for operation in self.content.operations(source)? {
            if commands.iter().all(|command| command.name() != operation.name()) {
                commands.push(NodeCommand::model(operation, source_path.clone(), index.clone()));
            }
        }

        let node = self.node_mut(id)?;
        node.has_list = has_list;
        node.has_dictionary = has_dictionary;
        if let Some(state) = node.graph_mut() {
            state.target = target;
        }
        for command in commands {
            self.add_command(id, command)?;
        }

        self.subscribe(id, source);
        if let Some(target) = target {
            self.subscribe(id, target);
        }

        if let Some(target) = presented
            && !is_primitive
            && expansion != ExpandReferencePolicy::None
            && self.content.kind(target)? == ContentKind::Object
        {
            self.expand_children(id, target, &target_path, &provider, expansion.for_children())?;
        }

        if let Some(state) = self.node_mut(id)?.graph_mut() {
            state.is_initialized = true;
        }
        self.check_node(id)
    }

    /// Creates the children of a node presenting `target`.
    fn expand_children(
        &mut self,
        id: NodeId,
        target: ContentId,
        target_path: &ContentPath,
        provider: &Arc<dyn PropertyProvider>,
        inherited: ExpandReferencePolicy,
    ) -> Result<()> {
        let reference_policy = |member: Option<&MemberDescriptor>, referenced: Option<ContentId>| match referenced {
            Some(referenced) if inherited != ExpandReferencePolicy::None => {
                provider.should_expand_reference(member, referenced)
            }
            _ => inherited,
        };
        let item_spec = |index: Index, value_type: ValueType, expansion: ExpandReferencePolicy| GraphNodeSpec {
            name: names::escape(&names::item_name(&index)).into_owned(),
            source: target,
            source_path: target_path.clone(),
            index,
            descriptor: None,
            value_type,
            provider: provider.clone(),
            expansion,
        };

        if let Some(references) = self.content.item_references(target)? {
            let element = self
                .content
                .value_type(target)?
                .element_type()
                .cloned()
                .unwrap_or(ValueType::Any);
            for reference in references {
                if !provider.should_construct_item(target, &reference.index) {
                    continue;
                }
                let expansion = reference_policy(None, reference.target);
                let spec = item_spec(reference.index, element.clone(), expansion);
                self.create_graph_node(Some(id), spec)?;
            }
            return Ok(());
        }

        let shape = self.content.collection_shape(target)?;
        match shape {
            Some(CollectionShape::Dictionary { value, keys }) => {
                for key in keys {
                    let index = Index::Key(key);
                    if provider.should_construct_item(target, &index) {
                        self.create_graph_node(Some(id), item_spec(index, value.clone(), inherited))?;
                    }
                }
            }
            Some(CollectionShape::List { element, count }) => {
                for position in 0..count {
                    let index = Index::Position(position);
                    if provider.should_construct_item(target, &index) {
                        self.create_graph_node(Some(id), item_spec(index, element.clone(), inherited))?;
                    }
                }
            }
            None => {
                let members = self.content.members(target)?;
                for member in members {
                    let Some(descriptor) = self.content.member_descriptor(member)? else {
                        continue;
                    };
                    if !descriptor.browsable || !provider.should_construct_member(&descriptor) {
                        continue;
                    }
                    let referenced = self.content.target_reference(member)?;
                    let spec = GraphNodeSpec {
                        name: names::escape(&descriptor.name).into_owned(),
                        source: member,
                        source_path: target_path.push_member(descriptor.name.clone()),
                        index: Index::Empty,
                        value_type: self.content.value_type(member)?,
                        provider: provider.clone(),
                        expansion: reference_policy(Some(&descriptor), referenced),
                        descriptor: Some(descriptor),
                    };
                    self.create_graph_node(Some(id), spec)?;
                }
            }
        }
        Ok(())
    }

    /// Runs the node-initialized hooks on a graph node.
    fn run_node_hooks(&mut self, id: NodeId) -> Result<()> {
        if !self.hooks.has_hooks() {
            return Ok(());
        }
        let Self { hooks, nodes, .. } = self;
        let Some(node) = nodes.get_mut(&id) else {
            return Ok(());
        };
        let was_visible = node.is_visible;
        let result = hooks.execute_hooks(node);
        let is_visible = node.is_visible;
        let parent = node.parent;

        if was_visible != is_visible
            && let Some(parent) = parent
        {
            self.adjust_visible_count(parent, is_visible)?;
        }
        result
    }

    /// Rebuilds a graph node from its content. A root is rebuilt in place.
    pub(crate) fn refresh_graph(&mut self, id: NodeId) -> Result<()> {
        let node = self.node(id)?;
        let Some(state) = node.as_graph() else {
            return Ok(());
        };
        tracing::debug!(path = %node.path, "Refreshing node");
        let source = state.source;
        let target = state.target;
        let value_type = node.value_type.clone();
        let index = node.index.clone();

        for name in [property::IS_PRIMITIVE, property::HAS_LIST, property::HAS_DICTIONARY] {
            self.notify_changing(id, name);
        }

        self.clear_commands(id)?;
        self.clear_children(id)?;
        self.clear_associated_data(id)?;
        self.unsubscribe(id, source);
        if let Some(target) = target {
            self.unsubscribe(id, target);
        }

        let is_primitive = self.is_primitive_location(&value_type, source, &index)?;
        let node = self.node_mut(id)?;
        node.is_primitive = is_primitive;
        apply_descriptor(node);
        if let Some(state) = node.graph_mut() {
            state.target = None;
            state.is_initialized = false;
        }

        self.initialize_graph_node(id)?;
        self.run_node_hooks(id)?;

        for name in [property::IS_PRIMITIVE, property::HAS_LIST, property::HAS_DICTIONARY] {
            self.notify_changed(id, name);
        }
        Ok(())
    }

    /// Verifies that the graph nodes of a subtree still resolve to the
    /// targets they were built for.
    ///
    /// # Errors
    /// Returns [`NodeError::Inconsistent`] for the first node whose target
    /// changed without the node being refreshed.
    pub fn check_consistency(&self, id: NodeId) -> Result<()> {
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let node = self.node(current)?;
            if let Some(state) = node.as_graph()
                && state.is_initialized
            {
                let target = self.resolve_target(state.source, &node.index)?;
                if target != state.target {
                    return Err(NodeError::Inconsistent {
                        path: node.path.clone(),
                        reason: format!(
                            "bound to {:?} but the content now resolves to {target:?}",
                            state.target
                        ),
                    }
                    .into());
                }
            }
            stack.extend(node.children());
        }
        Ok(())
    }
}

/// Applies the member metadata of a graph node: order, declaration index,
/// display name and read-only flag.
fn apply_descriptor(node: &mut Node) {
    let Some(state) = node.as_graph() else {
        return;
    };
    let custom_order = state.custom_order;
    let Some(descriptor) = state.descriptor.clone() else {
        node.order = custom_order;
        return;
    };
    node.order = custom_order.or(descriptor.order);
    node.declaration = Some(descriptor.declaration_index);
    node.display_name = descriptor.display_name.unwrap_or(descriptor.name);
    node.is_read_only = descriptor.read_only;
}
