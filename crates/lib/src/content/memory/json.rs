//! JSON import and export for [`InMemoryGraph`].
//!
//! JSON objects become plain objects whose type is named by their `$type`
//! member, or else by the member holding them. Arrays become lists; arrays
//! of objects become lists of references.

use std::collections::HashSet;

use serde_json::{Map, Number, Value as Json};

use super::InMemoryGraph;
use crate::{
    Index, Result, constants,
    content::{CollectionShape, ContentError, ContentGraph, ContentId, Value, ValueType},
};

fn conversion(reason: impl Into<String>) -> crate::Error {
    ContentError::Conversion {
        reason: reason.into(),
    }
    .into()
}

/// Finds a common element type for the items of an array.
fn unify(types: &[ValueType]) -> ValueType {
    let Some(first) = types.first() else {
        return ValueType::Any;
    };
    if types.iter().all(|t| t == first) {
        return first.clone();
    }
    if types.iter().all(|t| matches!(t, ValueType::Object(_))) {
        return first.clone();
    }
    if types
        .iter()
        .all(|t| matches!(t, ValueType::Int | ValueType::Float))
    {
        return ValueType::Float;
    }
    ValueType::Any
}

impl InMemoryGraph {
    /// Imports a JSON document and returns the id of its root.
    ///
    /// `type_name` names the root object unless the document carries a
    /// `$type` member.
    pub fn insert_json(&self, type_name: &str, document: &Json) -> Result<ContentId> {
        match document {
            Json::Object(map) => self.insert_json_object(type_name, map),
            Json::Array(items) => self.insert_json_array(type_name, items).map(|(id, _)| id),
            other => Err(conversion(format!(
                "expected an object or an array at the root, found {other}"
            ))),
        }
    }

    fn insert_json_object(&self, fallback_type: &str, map: &Map<String, Json>) -> Result<ContentId> {
        let type_name = map
            .get(constants::JSON_TYPE_KEY)
            .and_then(Json::as_str)
            .unwrap_or(fallback_type);
        let mut builder = self.object(type_name);
        for (name, json) in map {
            if name == constants::JSON_TYPE_KEY {
                continue;
            }
            let (value_type, value) = self.import_value(name, json)?;
            builder = builder.field(name, value_type, value);
        }
        builder.insert()
    }

    fn insert_json_array(&self, name: &str, items: &[Json]) -> Result<(ContentId, ValueType)> {
        let mut types = Vec::new();
        let mut values = Vec::with_capacity(items.len());
        for item in items {
            let (value_type, value) = self.import_value(name, item)?;
            if !value.is_null() {
                types.push(value_type);
            }
            values.push(value);
        }
        let element = unify(&types);
        let id = self.create_list(element.clone(), values)?;
        Ok((id, element))
    }

    fn import_value(&self, name: &str, json: &Json) -> Result<(ValueType, Value)> {
        Ok(match json {
            Json::Null => (ValueType::Any, Value::Null),
            Json::Bool(value) => (ValueType::Bool, Value::Bool(*value)),
            Json::Number(number) => match number.as_i64() {
                Some(int) => (ValueType::Int, Value::Int(int)),
                None => {
                    let float = number
                        .as_f64()
                        .ok_or_else(|| conversion(format!("unsupported number {number}")))?;
                    (ValueType::Float, Value::Float(float))
                }
            },
            Json::String(text) => (ValueType::Text, Value::Text(text.clone())),
            Json::Object(map) => {
                let id = self.insert_json_object(name, map)?;
                let value = self.object_ref(id)?;
                (self.value_type(id)?, value)
            }
            Json::Array(items) => {
                let (id, element) = self.insert_json_array(name, items)?;
                (ValueType::List(Box::new(element)), self.object_ref(id)?)
            }
        })
    }

    /// Exports the object `id` and everything it references as JSON.
    ///
    /// Nested objects carry a `$type` member when their type differs from
    /// the name of the member holding them.
    pub fn export_json(&self, id: ContentId) -> Result<Json> {
        let mut visiting = HashSet::new();
        self.export_object(id, None, &mut visiting)
    }

    fn export_object(
        &self,
        id: ContentId,
        member_name: Option<&str>,
        visiting: &mut HashSet<ContentId>,
    ) -> Result<Json> {
        if !visiting.insert(id) {
            return Err(conversion(format!("content {id} references itself")));
        }
        let name = member_name.unwrap_or_default();
        let json = match self.collection_shape(id)? {
            Some(CollectionShape::List { count, .. }) => {
                let mut items = Vec::with_capacity(count);
                for position in 0..count {
                    let value = self.retrieve(id, &Index::Position(position))?;
                    items.push(self.export_value(&value, name, visiting)?);
                }
                Json::Array(items)
            }
            Some(CollectionShape::Dictionary { keys, .. }) => {
                let mut map = Map::new();
                for key in keys {
                    let value = self.retrieve(id, &Index::Key(key.clone()))?;
                    map.insert(key, self.export_value(&value, name, visiting)?);
                }
                Json::Object(map)
            }
            None => {
                let mut map = Map::new();
                if let (Some(member_name), ValueType::Object(type_name)) =
                    (member_name, self.value_type(id)?)
                    && type_name != member_name
                {
                    map.insert(constants::JSON_TYPE_KEY.to_string(), Json::String(type_name));
                }
                for member in self.members(id)? {
                    let Some(descriptor) = self.member_descriptor(member)? else {
                        continue;
                    };
                    let value = self.retrieve(member, &Index::Empty)?;
                    let json = self.export_value(&value, &descriptor.name, visiting)?;
                    map.insert(descriptor.name, json);
                }
                Json::Object(map)
            }
        };
        visiting.remove(&id);
        Ok(json)
    }

    fn export_value(
        &self,
        value: &Value,
        member_name: &str,
        visiting: &mut HashSet<ContentId>,
    ) -> Result<Json> {
        Ok(match value {
            Value::Null => Json::Null,
            Value::Bool(value) => Json::Bool(*value),
            Value::Int(value) => Json::Number((*value).into()),
            Value::Float(value) => Number::from_f64(*value).map_or(Json::Null, Json::Number),
            Value::Text(value) => Json::String(value.clone()),
            Value::Object(object) => self.export_object(object.id, Some(member_name), visiting)?,
        })
    }
}
