//! In-memory implementation of [`ContentGraph`].
//!
//! Objects, lists and dictionaries are stored as entries keyed by
//! [`ContentId`]; members are separate entries owned by their object, so
//! that each member can be observed on its own. Every write emits a
//! `Changing` and a `Changed` [`ContentChange`] to each subscribed sender;
//! senders whose receiver was dropped are pruned on the next write.

mod json;
pub mod operations;

use std::{
    collections::{BTreeMap, HashMap},
    fmt,
    sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use super::{
    ChangeKind, ChangePhase, ChangeSender, CollectionShape, ContentChange, ContentError,
    ContentGraph, ContentId, ContentKind, ItemReference, MemberDescriptor, ObjectRef, Value,
    ValueType,
};
use crate::{Index, Result, command::NodeOperation};

#[derive(Debug, Clone)]
enum ObjectBody {
    Plain {
        members: Vec<ContentId>,
    },
    List {
        element: ValueType,
        items: Vec<Value>,
    },
    Dictionary {
        value: ValueType,
        entries: BTreeMap<String, Value>,
    },
}

#[derive(Debug, Clone)]
enum ContentEntry {
    Object {
        type_name: String,
        body: ObjectBody,
    },
    Member {
        descriptor: MemberDescriptor,
        value_type: ValueType,
        value: Value,
    },
}

impl ContentEntry {
    fn value_type(&self) -> ValueType {
        match self {
            ContentEntry::Object { type_name, body } => match body {
                ObjectBody::Plain { .. } => ValueType::Object(type_name.clone()),
                ObjectBody::List { element, .. } => ValueType::List(Box::new(element.clone())),
                ObjectBody::Dictionary { value, .. } => {
                    ValueType::Dictionary(Box::new(value.clone()))
                }
            },
            ContentEntry::Member { value_type, .. } => value_type.clone(),
        }
    }
}

#[derive(Default)]
struct MemoryState {
    next_id: u64,
    entries: HashMap<ContentId, ContentEntry>,
    /// Operations keyed by the display name of the value type they apply to
    operations: HashMap<String, Vec<Arc<dyn NodeOperation>>>,
    collection_operations: Vec<Arc<dyn NodeOperation>>,
}

impl MemoryState {
    fn allocate(&mut self) -> ContentId {
        self.next_id += 1;
        ContentId::new(self.next_id)
    }

    fn entry(&self, id: ContentId) -> Result<&ContentEntry> {
        self.entries
            .get(&id)
            .ok_or_else(|| ContentError::NotFound { id }.into())
    }

    fn entry_mut(&mut self, id: ContentId) -> Result<&mut ContentEntry> {
        self.entries
            .get_mut(&id)
            .ok_or_else(|| ContentError::NotFound { id }.into())
    }
}

/// A [`ContentGraph`] holding all content in memory.
pub struct InMemoryGraph {
    state: RwLock<MemoryState>,
    watchers: Mutex<Vec<ChangeSender>>,
}

impl fmt::Debug for InMemoryGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryGraph")
            .field("entries", &self.read().entries.len())
            .finish()
    }
}

impl Default for InMemoryGraph {
    fn default() -> Self {
        Self::new()
    }
}

/// Converts values to the representation stored for a static type.
fn normalize(value_type: &ValueType, value: Value) -> Value {
    match (value_type, value) {
        (ValueType::Float, Value::Int(int)) => Value::Float(int as f64),
        (_, value) => value,
    }
}

fn check_type(id: ContentId, value_type: &ValueType, value: &Value) -> Result<()> {
    if value_type.accepts(value) {
        Ok(())
    } else {
        Err(ContentError::TypeMismatch {
            id,
            expected: value_type.to_string(),
            actual: value.shape().to_string(),
        }
        .into())
    }
}

impl InMemoryGraph {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(MemoryState::default()),
            watchers: Mutex::new(Vec::new()),
        }
    }

    /// Exposes the stock `AddItem`, `RemoveItem` and `ClearCollection`
    /// operations on every list and dictionary.
    ///
    /// The same operation instances are shared by all collections, so the
    /// commands they produce combine across a selection.
    pub fn with_collection_operations(self) -> Self {
        self.write().collection_operations = operations::collection_operations();
        self
    }

    fn read(&self) -> RwLockReadGuard<'_, MemoryState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, MemoryState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, change: ContentChange) {
        let mut watchers = self.watchers.lock().unwrap_or_else(PoisonError::into_inner);
        watchers.retain(|sender| sender.send(change.clone()).is_ok());
    }

    fn emit_pair(&self, content: ContentId, kind: ChangeKind, index: Index, old: Value, new: Value) {
        for phase in [ChangePhase::Changing, ChangePhase::Changed] {
            self.emit(ContentChange {
                content,
                kind,
                phase,
                index: index.clone(),
                old_value: old.clone(),
                new_value: new.clone(),
            });
        }
    }

    /// Registers an operation for every location of the given static type.
    pub fn register_operation(&self, value_type: &ValueType, operation: Arc<dyn NodeOperation>) {
        self.write()
            .operations
            .entry(value_type.to_string())
            .or_default()
            .push(operation);
    }

    /// Starts building a plain object of the given type.
    pub fn object(&self, type_name: impl Into<String>) -> ObjectBuilder<'_> {
        ObjectBuilder {
            graph: self,
            type_name: type_name.into(),
            fields: Vec::new(),
        }
    }

    /// Creates a list object.
    pub fn create_list(&self, element: ValueType, items: Vec<Value>) -> Result<ContentId> {
        let mut state = self.write();
        let id = state.allocate();
        let mut stored = Vec::with_capacity(items.len());
        for item in items {
            check_type(id, &element, &item)?;
            stored.push(normalize(&element, item));
        }
        state.entries.insert(
            id,
            ContentEntry::Object {
                type_name: ValueType::List(Box::new(element.clone())).to_string(),
                body: ObjectBody::List {
                    element,
                    items: stored,
                },
            },
        );
        Ok(id)
    }

    /// Creates a dictionary object.
    pub fn create_dictionary(
        &self,
        value: ValueType,
        entries: impl IntoIterator<Item = (String, Value)>,
    ) -> Result<ContentId> {
        let mut state = self.write();
        let id = state.allocate();
        let mut stored = BTreeMap::new();
        for (key, item) in entries {
            check_type(id, &value, &item)?;
            stored.insert(key, normalize(&value, item));
        }
        state.entries.insert(
            id,
            ContentEntry::Object {
                type_name: ValueType::Dictionary(Box::new(value.clone())).to_string(),
                body: ObjectBody::Dictionary {
                    value,
                    entries: stored,
                },
            },
        );
        Ok(id)
    }

    /// A value referencing the given object.
    pub fn object_ref(&self, id: ContentId) -> Result<Value> {
        match self.read().entry(id)? {
            ContentEntry::Object { type_name, .. } => Ok(Value::Object(ObjectRef {
                id,
                type_name: type_name.clone(),
            })),
            ContentEntry::Member { .. } => Err(ContentError::NotAnObject { id }.into()),
        }
    }

    /// Finds a member by name, failing if the object has none.
    pub fn member(&self, object: ContentId, name: &str) -> Result<ContentId> {
        self.member_by_name(object, name)?.ok_or_else(|| {
            ContentError::InvalidPath {
                path: format!("{object}.{name}"),
            }
            .into()
        })
    }

    /// Reads the value of a member by name.
    pub fn member_value(&self, object: ContentId, name: &str) -> Result<Value> {
        let member = self.member(object, name)?;
        self.retrieve(member, &Index::Empty)
    }

    /// Writes the value of a member by name.
    pub fn set_member_value(&self, object: ContentId, name: &str, value: Value) -> Result<()> {
        let member = self.member(object, name)?;
        self.update(member, &Index::Empty, value)
    }

    /// Number of subscribed senders still alive as of the last write.
    pub fn watcher_count(&self) -> usize {
        self.watchers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl ContentGraph for InMemoryGraph {
    fn kind(&self, id: ContentId) -> Result<ContentKind> {
        match self.read().entry(id)? {
            ContentEntry::Object { .. } => Ok(ContentKind::Object),
            ContentEntry::Member { .. } => Ok(ContentKind::Member),
        }
    }

    fn value_type(&self, id: ContentId) -> Result<ValueType> {
        Ok(self.read().entry(id)?.value_type())
    }

    fn retrieve(&self, id: ContentId, index: &Index) -> Result<Value> {
        let state = self.read();
        let out_of_range = || ContentError::IndexOutOfRange {
            id,
            index: index.clone(),
        };
        match (state.entry(id)?, index) {
            (ContentEntry::Member { value, .. }, Index::Empty) => Ok(value.clone()),
            (ContentEntry::Object { type_name, .. }, Index::Empty) => {
                Ok(Value::Object(ObjectRef {
                    id,
                    type_name: type_name.clone(),
                }))
            }
            (
                ContentEntry::Object {
                    body: ObjectBody::List { items, .. },
                    ..
                },
                Index::Position(position),
            ) => items
                .get(*position)
                .cloned()
                .ok_or_else(|| out_of_range().into()),
            (
                ContentEntry::Object {
                    body: ObjectBody::Dictionary { entries, .. },
                    ..
                },
                Index::Key(key),
            ) => entries
                .get(key)
                .cloned()
                .ok_or_else(|| out_of_range().into()),
            _ => Err(out_of_range().into()),
        }
    }

    fn update(&self, id: ContentId, index: &Index, value: Value) -> Result<()> {
        let mut state = self.write();
        let out_of_range = || ContentError::IndexOutOfRange {
            id,
            index: index.clone(),
        };
        let (kind, old, new) = match (state.entry_mut(id)?, index) {
            (
                ContentEntry::Member {
                    descriptor,
                    value_type,
                    value: slot,
                },
                Index::Empty,
            ) => {
                if descriptor.read_only {
                    return Err(ContentError::ReadOnly { id }.into());
                }
                check_type(id, value_type, &value)?;
                let new = normalize(value_type, value);
                let old = std::mem::replace(slot, new.clone());
                (ChangeKind::ValueChange, old, new)
            }
            (
                ContentEntry::Object {
                    body: ObjectBody::List { element, items },
                    ..
                },
                Index::Position(position),
            ) => {
                check_type(id, element, &value)?;
                let new = normalize(element, value);
                let slot = items.get_mut(*position).ok_or_else(out_of_range)?;
                let old = std::mem::replace(slot, new.clone());
                (ChangeKind::CollectionUpdate, old, new)
            }
            (
                ContentEntry::Object {
                    body: ObjectBody::Dictionary { value: element, entries },
                    ..
                },
                Index::Key(key),
            ) => {
                check_type(id, element, &value)?;
                let new = normalize(element, value);
                let slot = entries.get_mut(key).ok_or_else(out_of_range)?;
                let old = std::mem::replace(slot, new.clone());
                (ChangeKind::CollectionUpdate, old, new)
            }
            _ => return Err(out_of_range().into()),
        };
        drop(state);

        tracing::trace!(content = %id, index = %index, "Content updated");
        self.emit_pair(id, kind, index.clone(), old, new);
        Ok(())
    }

    fn members(&self, id: ContentId) -> Result<Vec<ContentId>> {
        match self.read().entry(id)? {
            ContentEntry::Object {
                body: ObjectBody::Plain { members },
                ..
            } => Ok(members.clone()),
            ContentEntry::Object { .. } => Ok(Vec::new()),
            ContentEntry::Member { .. } => Err(ContentError::NotAnObject { id }.into()),
        }
    }

    fn member_descriptor(&self, id: ContentId) -> Result<Option<MemberDescriptor>> {
        match self.read().entry(id)? {
            ContentEntry::Member { descriptor, .. } => Ok(Some(descriptor.clone())),
            ContentEntry::Object { .. } => Ok(None),
        }
    }

    fn target_reference(&self, id: ContentId) -> Result<Option<ContentId>> {
        match self.read().entry(id)? {
            ContentEntry::Member {
                value: Value::Object(object),
                ..
            } => Ok(Some(object.id)),
            _ => Ok(None),
        }
    }

    fn item_references(&self, id: ContentId) -> Result<Option<Vec<ItemReference>>> {
        let state = self.read();
        let reference = |index: Index, value: &Value| ItemReference {
            index,
            target: value.as_object().map(|object| object.id),
        };
        match state.entry(id)? {
            ContentEntry::Object {
                body: ObjectBody::List { element, items },
                ..
            } if is_reference_type(element) => Ok(Some(
                items
                    .iter()
                    .enumerate()
                    .map(|(position, value)| reference(Index::Position(position), value))
                    .collect(),
            )),
            ContentEntry::Object {
                body: ObjectBody::Dictionary { value, entries },
                ..
            } if is_reference_type(value) => Ok(Some(
                entries
                    .iter()
                    .map(|(key, value)| reference(Index::Key(key.clone()), value))
                    .collect(),
            )),
            _ => Ok(None),
        }
    }

    fn collection_shape(&self, id: ContentId) -> Result<Option<CollectionShape>> {
        match self.read().entry(id)? {
            ContentEntry::Object {
                body: ObjectBody::List { element, items },
                ..
            } => Ok(Some(CollectionShape::List {
                element: element.clone(),
                count: items.len(),
            })),
            ContentEntry::Object {
                body: ObjectBody::Dictionary { value, entries },
                ..
            } => Ok(Some(CollectionShape::Dictionary {
                value: value.clone(),
                keys: entries.keys().cloned().collect(),
            })),
            _ => Ok(None),
        }
    }

    fn add_item(&self, id: ContentId, index: Option<Index>, value: Value) -> Result<Index> {
        let mut state = self.write();
        let added = match state.entry_mut(id)? {
            ContentEntry::Object {
                body: ObjectBody::List { element, items },
                ..
            } => {
                check_type(id, element, &value)?;
                let position = match index {
                    None => items.len(),
                    Some(Index::Position(position)) if position <= items.len() => position,
                    Some(index) => return Err(ContentError::IndexOutOfRange { id, index }.into()),
                };
                let value = normalize(element, value);
                items.insert(position, value.clone());
                (Index::Position(position), value)
            }
            ContentEntry::Object {
                body: ObjectBody::Dictionary { value: element, entries },
                ..
            } => {
                check_type(id, element, &value)?;
                let key = match index {
                    Some(Index::Key(key)) => key,
                    other => {
                        return Err(ContentError::IndexOutOfRange {
                            id,
                            index: other.unwrap_or_default(),
                        }
                        .into());
                    }
                };
                if entries.contains_key(&key) {
                    return Err(ContentError::DuplicateKey { id, key }.into());
                }
                let value = normalize(element, value);
                entries.insert(key.clone(), value.clone());
                (Index::Key(key), value)
            }
            _ => return Err(ContentError::NotACollection { id }.into()),
        };
        drop(state);

        let (index, value) = added;
        tracing::trace!(content = %id, index = %index, "Item added");
        self.emit_pair(id, ChangeKind::CollectionAdd, index.clone(), Value::Null, value);
        Ok(index)
    }

    fn remove_item(&self, id: ContentId, index: &Index) -> Result<Value> {
        let mut state = self.write();
        let out_of_range = || ContentError::IndexOutOfRange {
            id,
            index: index.clone(),
        };
        let removed = match (state.entry_mut(id)?, index) {
            (
                ContentEntry::Object {
                    body: ObjectBody::List { items, .. },
                    ..
                },
                Index::Position(position),
            ) => {
                if *position >= items.len() {
                    return Err(out_of_range().into());
                }
                items.remove(*position)
            }
            (
                ContentEntry::Object {
                    body: ObjectBody::Dictionary { entries, .. },
                    ..
                },
                Index::Key(key),
            ) => entries.remove(key).ok_or_else(out_of_range)?,
            (
                ContentEntry::Object {
                    body: ObjectBody::Plain { .. },
                    ..
                }
                | ContentEntry::Member { .. },
                _,
            ) => return Err(ContentError::NotACollection { id }.into()),
            _ => return Err(out_of_range().into()),
        };
        drop(state);

        tracing::trace!(content = %id, index = %index, "Item removed");
        self.emit_pair(
            id,
            ChangeKind::CollectionRemove,
            index.clone(),
            removed.clone(),
            Value::Null,
        );
        Ok(removed)
    }

    fn operations(&self, id: ContentId) -> Result<Vec<Arc<dyn NodeOperation>>> {
        let state = self.read();
        let entry = state.entry(id)?;
        let mut operations = state
            .operations
            .get(&entry.value_type().to_string())
            .cloned()
            .unwrap_or_default();
        if let ContentEntry::Object {
            body: ObjectBody::List { .. } | ObjectBody::Dictionary { .. },
            ..
        } = entry
        {
            operations.extend(state.collection_operations.iter().cloned());
        }
        Ok(operations)
    }

    fn subscribe(&self, sender: ChangeSender) {
        self.watchers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(sender);
    }
}

/// Whether items of this type are stored as references to other content.
fn is_reference_type(value_type: &ValueType) -> bool {
    matches!(
        value_type,
        ValueType::Object(_) | ValueType::List(_) | ValueType::Dictionary(_)
    )
}

/// Builder for a plain object, obtained from [`InMemoryGraph::object`].
pub struct ObjectBuilder<'a> {
    graph: &'a InMemoryGraph,
    type_name: String,
    fields: Vec<(MemberDescriptor, ValueType, Value)>,
}

impl ObjectBuilder<'_> {
    /// Adds a member with default display metadata.
    pub fn field(self, name: &str, value_type: ValueType, value: impl Into<Value>) -> Self {
        let descriptor = MemberDescriptor::new(name, self.fields.len());
        self.field_with(descriptor, value_type, value)
    }

    /// Adds a member with explicit metadata.
    pub fn field_with(
        mut self,
        descriptor: MemberDescriptor,
        value_type: ValueType,
        value: impl Into<Value>,
    ) -> Self {
        self.fields.push((descriptor, value_type, value.into()));
        self
    }

    /// Inserts the object and its members into the graph.
    pub fn insert(self) -> Result<ContentId> {
        let mut state = self.graph.write();
        let id = state.allocate();
        let mut members = Vec::with_capacity(self.fields.len());
        let mut entries = Vec::with_capacity(self.fields.len());
        for (descriptor, value_type, value) in self.fields {
            let member = state.allocate();
            check_type(member, &value_type, &value)?;
            let value = normalize(&value_type, value);
            members.push(member);
            entries.push((
                member,
                ContentEntry::Member {
                    descriptor,
                    value_type,
                    value,
                },
            ));
        }
        state.entries.extend(entries);
        state.entries.insert(
            id,
            ContentEntry::Object {
                type_name: self.type_name,
                body: ObjectBody::Plain { members },
            },
        );
        Ok(id)
    }
}
