//! Backing content reached through a reflection layer.
//!
//! The node tree never owns the data it presents. It reads and writes it
//! through a [`ContentGraph`], which exposes objects, their members, the
//! items of collections and the references between objects. Every write
//! performed through the graph is announced as a pair of [`ContentChange`]
//! events (`Changing`, then `Changed`) sent to the subscribed channels.
//!
//! # Core Types
//!
//! - [`ContentGraph`] - The reflection contract consumed by the node tree
//! - [`Value`] / [`ValueType`] - Values and static types of locations
//! - [`ContentPath`] - Path-based addressing that survives tree rebuilds
//! - [`memory::InMemoryGraph`] - Reference implementation backed by memory

pub mod errors;
pub mod memory;
pub mod path;
pub mod value;

use std::{fmt, sync::Arc};

pub use errors::ContentError;
pub use path::{ContentPath, PathStep};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
pub use value::{ObjectRef, Value, ValueType};

use crate::{Index, Result, command::NodeOperation};

/// Identity of a content location in the backing graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContentId(u64);

impl ContentId {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Kind of a content location.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    /// An object: a plain object with members, a list or a dictionary.
    Object,
    /// A member of an object, holding a single value.
    Member,
}

/// Reflection metadata of an object member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberDescriptor {
    /// Name of the member in its declaring type.
    pub name: String,
    /// Name to show instead of `name`, if any.
    pub display_name: Option<String>,
    /// Explicit sort order among siblings.
    pub order: Option<i32>,
    /// Position of the member in its type declaration.
    pub declaration_index: usize,
    /// Whether the member should be presented at all.
    pub browsable: bool,
    /// Whether the member can be written.
    pub read_only: bool,
}

impl MemberDescriptor {
    pub fn new(name: impl Into<String>, declaration_index: usize) -> Self {
        Self {
            name: name.into(),
            display_name: None,
            order: None,
            declaration_index,
            browsable: true,
            read_only: false,
        }
    }

    pub fn with_order(mut self, order: i32) -> Self {
        self.order = Some(order);
        self
    }

    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    pub fn hidden(mut self) -> Self {
        self.browsable = false;
        self
    }

    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }
}

/// A reference stored in a collection of references.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemReference {
    /// Index of the reference in its collection.
    pub index: Index,
    /// The referenced object, or `None` for a null reference.
    pub target: Option<ContentId>,
}

/// Shape of a collection object.
#[derive(Debug, Clone, PartialEq)]
pub enum CollectionShape {
    /// A list with `count` items of type `element`.
    List { element: ValueType, count: usize },
    /// A dictionary with the given keys and values of type `value`.
    Dictionary { value: ValueType, keys: Vec<String> },
}

/// Kind of a content change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// The value at an index (or the member value) was replaced.
    ValueChange,
    /// An item was added to a collection.
    CollectionAdd,
    /// An item was removed from a collection.
    CollectionRemove,
    /// An item of a collection was replaced in place.
    CollectionUpdate,
}

impl ChangeKind {
    /// Returns true for changes that add or remove items.
    pub fn is_structural(&self) -> bool {
        matches!(self, ChangeKind::CollectionAdd | ChangeKind::CollectionRemove)
    }
}

/// Whether a change notification precedes or follows the write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangePhase {
    Changing,
    Changed,
}

/// A change notification emitted by a [`ContentGraph`].
#[derive(Debug, Clone, PartialEq)]
pub struct ContentChange {
    /// The content whose value changed.
    pub content: ContentId,
    pub kind: ChangeKind,
    pub phase: ChangePhase,
    /// Index of the affected item, or [`Index::Empty`] for a member value.
    pub index: Index,
    pub old_value: Value,
    pub new_value: Value,
}

/// Channel end used by content graphs to deliver change notifications.
pub type ChangeSender = mpsc::UnboundedSender<ContentChange>;

/// Receiving end of a change notification channel.
pub type ChangeReceiver = mpsc::UnboundedReceiver<ContentChange>;

/// Reflection contract over a backing object graph.
///
/// Implementations own the data. The node tree only reads through this trait
/// and writes through [`ContentGraph::update`], which must emit a `Changing`
/// and a `Changed` [`ContentChange`] to every subscribed sender.
pub trait ContentGraph: Send + Sync {
    /// Kind of the location.
    fn kind(&self, id: ContentId) -> Result<ContentKind>;

    /// Static type of the location.
    fn value_type(&self, id: ContentId) -> Result<ValueType>;

    /// Whether the location holds a primitive value.
    fn is_primitive(&self, id: ContentId) -> Result<bool> {
        Ok(self.value_type(id)?.is_primitive())
    }

    /// Reads the value of a member, or of the item at `index` of a collection.
    fn retrieve(&self, id: ContentId, index: &Index) -> Result<Value>;

    /// Writes the value of a member, or of the item at `index` of a collection.
    fn update(&self, id: ContentId, index: &Index, value: Value) -> Result<()>;

    /// Members of an object, in declaration order.
    fn members(&self, id: ContentId) -> Result<Vec<ContentId>>;

    /// Reflection metadata of a member, `None` for objects.
    fn member_descriptor(&self, id: ContentId) -> Result<Option<MemberDescriptor>>;

    /// Finds the member of an object by name.
    fn member_by_name(&self, object: ContentId, name: &str) -> Result<Option<ContentId>> {
        for member in self.members(object)? {
            if let Some(descriptor) = self.member_descriptor(member)?
                && descriptor.name == name
            {
                return Ok(Some(member));
            }
        }
        Ok(None)
    }

    /// The object referenced by a member holding a single reference.
    fn target_reference(&self, id: ContentId) -> Result<Option<ContentId>>;

    /// References held by a collection of objects, `None` if the location is
    /// not a collection of references.
    fn item_references(&self, id: ContentId) -> Result<Option<Vec<ItemReference>>>;

    /// Shape of a list or dictionary object, `None` for anything else.
    fn collection_shape(&self, id: ContentId) -> Result<Option<CollectionShape>>;

    /// Inserts an item into a list or a dictionary.
    ///
    /// For lists, `index` is the insertion position (`None` appends). For
    /// dictionaries, `index` is the new key. Returns the index of the new item.
    fn add_item(&self, id: ContentId, _index: Option<Index>, _value: Value) -> Result<Index> {
        Err(ContentError::NotACollection { id }.into())
    }

    /// Removes the item at `index` from a list or a dictionary and returns it.
    fn remove_item(&self, id: ContentId, _index: &Index) -> Result<Value> {
        Err(ContentError::NotACollection { id }.into())
    }

    /// Backing operations exposed by the location.
    fn operations(&self, id: ContentId) -> Result<Vec<Arc<dyn NodeOperation>>>;

    /// Registers a channel that receives every change notification.
    fn subscribe(&self, sender: ChangeSender);
}
