//! Stock collection operations.

use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    Index, Result,
    command::{CombineMode, CommandError, NodeOperation, OperationContext, UndoToken},
    constants,
    content::{CollectionShape, Value},
};

/// The stock operations, one shared instance each.
pub fn collection_operations() -> Vec<Arc<dyn NodeOperation>> {
    vec![
        Arc::new(AddItem),
        Arc::new(RemoveItem),
        Arc::new(ClearCollection),
    ]
}

/// Reads an item index from a command parameter.
fn index_parameter(parameter: &Value) -> Option<Index> {
    match parameter {
        Value::Int(position) if *position >= 0 => Some(Index::Position(*position as usize)),
        Value::Text(key) => Some(Index::Key(key.clone())),
        _ => None,
    }
}

fn index_token(index: &Index) -> Value {
    match index {
        Index::Position(position) => Value::Int(*position as i64),
        Index::Key(key) => Value::Text(key.clone()),
        Index::Empty => Value::Null,
    }
}

fn invalid_parameter(name: &str, parameter: &Value) -> crate::Error {
    CommandError::OperationFailed {
        name: name.to_string(),
        reason: format!("invalid parameter '{parameter}'"),
    }
    .into()
}

/// Appends an item to a list, or adds a key with a default value to a
/// dictionary.
///
/// For lists the parameter is the new item; `null` appends the default
/// value of the element type. For dictionaries the parameter is the key.
#[derive(Debug, Default)]
pub struct AddItem;

#[async_trait]
impl NodeOperation for AddItem {
    fn name(&self) -> &str {
        constants::ADD_ITEM_OPERATION
    }

    fn combine_mode(&self) -> CombineMode {
        CombineMode::AlwaysCombine
    }

    async fn execute(&self, context: &OperationContext, parameter: &Value) -> Result<UndoToken> {
        let shape = context.content.collection_shape(context.location)?;
        let index = match shape {
            Some(CollectionShape::List { element, .. }) => {
                let item = if parameter.is_null() {
                    element.default_value()
                } else {
                    parameter.clone()
                };
                context.content.add_item(context.location, None, item)?
            }
            Some(CollectionShape::Dictionary { value, .. }) => {
                let key = parameter
                    .as_text()
                    .ok_or_else(|| invalid_parameter(self.name(), parameter))?;
                context.content.add_item(
                    context.location,
                    Some(Index::Key(key.to_string())),
                    value.default_value(),
                )?
            }
            None => return Err(invalid_parameter(self.name(), parameter)),
        };
        Ok(UndoToken::new(index_token(&index)))
    }

    async fn undo(&self, context: &OperationContext, token: &UndoToken) -> Result<()> {
        let index = token
            .token
            .as_ref()
            .and_then(index_parameter)
            .ok_or_else(|| invalid_parameter(self.name(), &Value::Null))?;
        context.content.remove_item(context.location, &index)?;
        Ok(())
    }
}

/// Removes the item whose position or key is given as parameter.
///
/// Invoked on an item node with a `null` parameter, removes that item.
#[derive(Debug, Default)]
pub struct RemoveItem;

#[async_trait]
impl NodeOperation for RemoveItem {
    fn name(&self) -> &str {
        constants::REMOVE_ITEM_OPERATION
    }

    fn combine_mode(&self) -> CombineMode {
        CombineMode::AlwaysCombine
    }

    async fn execute(&self, context: &OperationContext, parameter: &Value) -> Result<UndoToken> {
        let index = index_parameter(parameter)
            .or_else(|| (!context.index.is_empty()).then(|| context.index.clone()))
            .ok_or_else(|| invalid_parameter(self.name(), parameter))?;
        context.content.remove_item(context.location, &index)?;
        Ok(UndoToken::none())
    }
}

/// Removes every item of a collection.
#[derive(Debug, Default)]
pub struct ClearCollection;

#[async_trait]
impl NodeOperation for ClearCollection {
    fn name(&self) -> &str {
        constants::CLEAR_COLLECTION_OPERATION
    }

    fn combine_mode(&self) -> CombineMode {
        CombineMode::AlwaysCombine
    }

    async fn execute(&self, context: &OperationContext, _parameter: &Value) -> Result<UndoToken> {
        let indices: Vec<Index> = match context.content.collection_shape(context.location)? {
            Some(CollectionShape::List { count, .. }) => {
                (0..count).rev().map(Index::Position).collect()
            }
            Some(CollectionShape::Dictionary { keys, .. }) => {
                keys.into_iter().map(Index::Key).collect()
            }
            None => return Err(invalid_parameter(self.name(), &Value::Null)),
        };
        for index in indices {
            context.content.remove_item(context.location, &index)?;
        }
        Ok(UndoToken::none())
    }
}
