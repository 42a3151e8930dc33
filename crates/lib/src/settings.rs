//! View configuration.

use serde::{Deserialize, Serialize};

/// Settings of a [`GraphView`](crate::view::GraphView).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewSettings {
    /// Verify the member naming invariants after every structural change.
    pub consistency_checks: bool,
    /// Trace every property notification at `trace` level.
    pub trace_property_changes: bool,
    /// Name of root nodes.
    pub root_name: String,
    /// Prefix of the names of combined list items.
    pub list_item_name_prefix: String,
    /// Transaction name of value writes; `{path}` and `{value}` are replaced.
    pub update_message_format: String,
}

impl Default for ViewSettings {
    fn default() -> Self {
        Self {
            consistency_checks: cfg!(debug_assertions),
            trace_property_changes: false,
            root_name: "Root".to_string(),
            list_item_name_prefix: "Item ".to_string(),
            update_message_format: "Update property {path}".to_string(),
        }
    }
}

impl ViewSettings {
    /// Formats the transaction name of a value write.
    pub fn update_message(&self, path: &str, value: &impl std::fmt::Display) -> String {
        self.update_message_format
            .replace("{path}", path)
            .replace("{value}", &value.to_string())
    }

    /// Name of the combined list item at `position`.
    pub fn list_item_name(&self, position: usize) -> String {
        format!("{}{position}", self.list_item_name_prefix)
    }
}
