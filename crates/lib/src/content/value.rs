//! Values and value types read from backing content.
//!
//! Content values are a closed set of primitive categories plus an opaque
//! object reference. Nodes never construct types at runtime; they dispatch
//! on these tags instead.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::ContentId;

/// Reference to a non-primitive piece of content (an object, a list or a
/// dictionary) living in the backing graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectRef {
    /// The content holding the referenced object.
    pub id: ContentId,
    /// Runtime type name of the referenced object.
    pub type_name: String,
}

/// A value stored at a content location.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// No value, or a null reference.
    #[default]
    Null,
    /// Boolean value
    Bool(bool),
    /// Integer value
    Int(i64),
    /// Floating point value
    Float(f64),
    /// Text value
    Text(String),
    /// Opaque reference to an object, list or dictionary.
    Object(ObjectRef),
}

impl Value {
    /// Returns true for null values.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns true for values of a primitive category.
    pub fn is_primitive(&self) -> bool {
        matches!(
            self,
            Value::Bool(_) | Value::Int(_) | Value::Float(_) | Value::Text(_)
        )
    }

    /// Returns the referenced object, if this value is one.
    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Value::Object(object) => Some(object),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(value) => Some(*value),
            _ => None,
        }
    }

    /// Name of the runtime shape of this value.
    ///
    /// Two non-primitive values have the same shape when they reference
    /// objects of the same runtime type.
    pub fn shape(&self) -> &str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Text(_) => "text",
            Value::Object(object) => &object.type_name,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(value) => write!(f, "{value}"),
            Value::Int(value) => write!(f, "{value}"),
            Value::Float(value) => write!(f, "{value}"),
            Value::Text(value) => write!(f, "{value}"),
            Value::Object(object) => write!(f, "{}{}", object.type_name, object.id),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(value as i64)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl PartialEq<&str> for Value {
    fn eq(&self, other: &&str) -> bool {
        self.as_text() == Some(*other)
    }
}

impl PartialEq<i64> for Value {
    fn eq(&self, other: &i64) -> bool {
        self.as_int() == Some(*other)
    }
}

/// Static type of a content location.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueType {
    /// Untyped location; accepts any value.
    Any,
    Bool,
    Int,
    Float,
    Text,
    /// Object of the named type.
    Object(String),
    /// List of elements of the given type.
    List(Box<ValueType>),
    /// Dictionary with text keys and values of the given type.
    Dictionary(Box<ValueType>),
}

impl ValueType {
    /// Returns true for primitive categories, whose nodes never have children.
    pub fn is_primitive(&self) -> bool {
        matches!(
            self,
            ValueType::Bool | ValueType::Int | ValueType::Float | ValueType::Text
        )
    }

    pub fn is_list(&self) -> bool {
        matches!(self, ValueType::List(_))
    }

    pub fn is_dictionary(&self) -> bool {
        matches!(self, ValueType::Dictionary(_))
    }

    /// The type-default sentinel, used when several values cannot be shown as one.
    pub fn default_value(&self) -> Value {
        match self {
            ValueType::Bool => Value::Bool(false),
            ValueType::Int => Value::Int(0),
            ValueType::Float => Value::Float(0.0),
            ValueType::Text => Value::Text(String::new()),
            _ => Value::Null,
        }
    }

    /// Element type of a list or value type of a dictionary.
    pub fn element_type(&self) -> Option<&ValueType> {
        match self {
            ValueType::List(element) | ValueType::Dictionary(element) => Some(element),
            _ => None,
        }
    }

    /// Infers the static type of a value.
    pub fn of(value: &Value) -> ValueType {
        match value {
            Value::Null => ValueType::Any,
            Value::Bool(_) => ValueType::Bool,
            Value::Int(_) => ValueType::Int,
            Value::Float(_) => ValueType::Float,
            Value::Text(_) => ValueType::Text,
            Value::Object(object) => ValueType::Object(object.type_name.clone()),
        }
    }

    /// Returns true if the value can be stored at a location of this type.
    pub fn accepts(&self, value: &Value) -> bool {
        match (self, value) {
            (ValueType::Any, _) | (_, Value::Null) => true,
            (ValueType::Bool, Value::Bool(_))
            | (ValueType::Int, Value::Int(_))
            | (ValueType::Float, Value::Float(_))
            | (ValueType::Float, Value::Int(_))
            | (ValueType::Text, Value::Text(_)) => true,
            (ValueType::Object(_), Value::Object(_))
            | (ValueType::List(_), Value::Object(_))
            | (ValueType::Dictionary(_), Value::Object(_)) => true,
            _ => false,
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueType::Any => write!(f, "any"),
            ValueType::Bool => write!(f, "bool"),
            ValueType::Int => write!(f, "int"),
            ValueType::Float => write!(f, "float"),
            ValueType::Text => write!(f, "text"),
            ValueType::Object(name) => write!(f, "{name}"),
            ValueType::List(element) => write!(f, "list<{element}>"),
            ValueType::Dictionary(element) => write!(f, "dictionary<{element}>"),
        }
    }
}
