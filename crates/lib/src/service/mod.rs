//! Tree factory and the extension points of a view.
//!
//! [`GraphViewService`] builds [`GraphView`]s from a set of
//! [`PropertyProvider`]s: a single root when one provider can provide a
//! tree, a combined root when several can. Hooks registered on the service
//! enrich every freshly initialized graph node, and observers receive the
//! property notifications of every view the service creates.

use std::sync::Arc;

use crate::{
    Index, Result,
    action::UndoService,
    content::{ContentGraph, ContentId, MemberDescriptor},
    node::Node,
    settings::ViewSettings,
    view::GraphView,
};

/// How far the object behind a reference is expanded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExpandReferencePolicy {
    /// The reference gets a node, but no children.
    None,
    /// The referenced object is expanded one level; its own children are not.
    Partial,
    /// The referenced object is expanded recursively.
    #[default]
    Full,
}

impl ExpandReferencePolicy {
    /// Policy inherited by the children of a node expanded with this policy.
    pub fn for_children(&self) -> ExpandReferencePolicy {
        match self {
            ExpandReferencePolicy::Full => ExpandReferencePolicy::Full,
            ExpandReferencePolicy::Partial | ExpandReferencePolicy::None => {
                ExpandReferencePolicy::None
            }
        }
    }
}

/// Decides what part of a content graph is presented.
pub trait PropertyProvider: Send + Sync {
    /// Whether this provider has anything to present.
    fn can_provide_tree(&self) -> bool {
        true
    }

    /// The object presented at the root of the tree.
    fn root_content(&self) -> ContentId;

    /// Whether a browsable member gets a node.
    fn should_construct_member(&self, _member: &MemberDescriptor) -> bool {
        true
    }

    /// Whether an item of a list or a dictionary gets a node.
    fn should_construct_item(&self, _collection: ContentId, _index: &Index) -> bool {
        true
    }

    /// How the object behind a reference is expanded.
    ///
    /// `member` is `None` for references stored in collections.
    fn should_expand_reference(
        &self,
        _member: Option<&MemberDescriptor>,
        _target: ContentId,
    ) -> ExpandReferencePolicy {
        ExpandReferencePolicy::Full
    }
}

/// A [`PropertyProvider`] presenting one object, optionally hiding members
/// by name and limiting reference expansion.
#[derive(Debug, Clone)]
pub struct ObjectProvider {
    root: ContentId,
    hidden: Vec<String>,
    reference_policy: ExpandReferencePolicy,
}

impl ObjectProvider {
    pub fn new(root: ContentId) -> Self {
        Self {
            root,
            hidden: Vec::new(),
            reference_policy: ExpandReferencePolicy::Full,
        }
    }

    /// Hides every member with this name.
    pub fn hide_member(mut self, name: impl Into<String>) -> Self {
        self.hidden.push(name.into());
        self
    }

    /// Applies this policy to every reference.
    pub fn with_reference_policy(mut self, policy: ExpandReferencePolicy) -> Self {
        self.reference_policy = policy;
        self
    }
}

impl PropertyProvider for ObjectProvider {
    fn root_content(&self) -> ContentId {
        self.root
    }

    fn should_construct_member(&self, member: &MemberDescriptor) -> bool {
        !self.hidden.contains(&member.name)
    }

    fn should_expand_reference(
        &self,
        _member: Option<&MemberDescriptor>,
        _target: ContentId,
    ) -> ExpandReferencePolicy {
        self.reference_policy
    }
}

/// Trait for hooks enriching freshly initialized graph nodes.
///
/// Hooks run once per graph node, after its children exist and before the
/// tree is handed back to the caller, and again each time the node is
/// rebuilt by a refresh.
pub trait NodeInitializedHook: Send + Sync {
    /// Called when a graph node has been initialized.
    ///
    /// # Returns
    /// Hook failures are logged and reported to the caller building the tree.
    fn on_node_initialized(&self, node: &mut Node) -> Result<()>;
}

/// A collection of node-initialized hooks executed together.
#[derive(Default, Clone)]
pub struct NodeInitializedHookCollection {
    hooks: Vec<Arc<dyn NodeInitializedHook>>,
}

impl NodeInitializedHookCollection {
    /// Create a new empty hook collection.
    pub fn new() -> Self {
        Self { hooks: Vec::new() }
    }

    /// Add a hook to the collection.
    pub fn add_hook(&mut self, hook: Arc<dyn NodeInitializedHook>) {
        self.hooks.push(hook);
    }

    /// Execute all hooks on the given node.
    ///
    /// Hooks are executed in the order they were added. If a hook fails,
    /// execution continues with remaining hooks and the first error is
    /// returned.
    pub fn execute_hooks(&self, node: &mut Node) -> Result<()> {
        let mut first_error = None;

        for hook in &self.hooks {
            if let Err(e) = hook.on_node_initialized(node) {
                tracing::error!("Node initialized hook failed on '{}': {e}", node.path());
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }

        match first_error {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    /// Check if there are any hooks registered.
    pub fn has_hooks(&self) -> bool {
        !self.hooks.is_empty()
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }
}

/// Receives the notifications of a view, as a UI binding layer would.
///
/// Property names are node properties (`value`, `display_name`, ...), child
/// names, or synthetic names prefixed with
/// [`HAS_CHILD_PREFIX`](crate::constants::HAS_CHILD_PREFIX) or
/// [`HAS_COMMAND_PREFIX`](crate::constants::HAS_COMMAND_PREFIX).
pub trait TreeObserver: Send + Sync {
    fn property_changing(&self, _path: &str, _property: &str) {}

    fn property_changed(&self, _path: &str, _property: &str) {}

    /// Batched notification that the values of these nodes changed.
    ///
    /// Sent once per combined action, or once per write outside of one.
    fn nodes_changed(&self, _paths: &[String]) {}
}

/// Builds views and carries their shared configuration.
#[derive(Default)]
pub struct GraphViewService {
    settings: ViewSettings,
    hooks: NodeInitializedHookCollection,
    observers: Vec<Arc<dyn TreeObserver>>,
    undo: Option<Arc<dyn UndoService>>,
}

impl GraphViewService {
    pub fn new(settings: ViewSettings) -> Self {
        Self {
            settings,
            ..Default::default()
        }
    }

    /// Every write and command of the created views runs in a transaction
    /// of this service.
    pub fn with_undo_service(mut self, undo: Arc<dyn UndoService>) -> Self {
        self.undo = Some(undo);
        self
    }

    pub fn settings(&self) -> &ViewSettings {
        &self.settings
    }

    pub fn add_node_initialized_hook(&mut self, hook: Arc<dyn NodeInitializedHook>) {
        self.hooks.add_hook(hook);
    }

    pub fn add_observer(&mut self, observer: Arc<dyn TreeObserver>) {
        self.observers.push(observer);
    }

    /// Builds a view over `content`.
    ///
    /// Providers that cannot provide a tree are ignored. Returns `None` if
    /// none is left, a view with a single root if one is left, and a view
    /// with a combined root otherwise.
    ///
    /// # Errors
    /// Fails with [`CombineError::UncombinableSet`](crate::view::CombineError)
    /// if several roots are not structurally equivalent, or with any error
    /// raised while binding the content.
    pub fn create_view(
        &self,
        content: Arc<dyn ContentGraph>,
        providers: &[Arc<dyn PropertyProvider>],
    ) -> Result<Option<GraphView>> {
        let providers: Vec<Arc<dyn PropertyProvider>> = providers
            .iter()
            .filter(|provider| provider.can_provide_tree())
            .cloned()
            .collect();
        if providers.is_empty() {
            return Ok(None);
        }

        let mut view = GraphView::new(content, self.settings.clone());
        if let Some(undo) = &self.undo {
            view.set_undo_service(undo.clone());
        }
        view.set_node_initialized_hooks(self.hooks.clone());
        for observer in &self.observers {
            view.add_observer(observer.clone());
        }
        view.build_root(&providers)?;
        Ok(Some(view))
    }
}
