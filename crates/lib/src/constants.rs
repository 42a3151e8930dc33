//! Constants used throughout the arbor library.
//!
//! This module provides central definitions for the property names exposed
//! by each kind of node, the prefixes of synthetic notification names, and
//! the names of built-in commands.

/// Property names exposed by every node.
pub const NODE_PROPERTIES: &[&str] = &[
    "name",
    "display_name",
    "display_path",
    "path",
    "type",
    "index",
    "order",
    "level",
    "parent",
    "children",
    "visible_children_count",
    "commands",
    "associated_data",
    "guid",
    "value",
    "is_read_only",
    "is_visible",
    "is_primitive",
    "has_list",
    "has_dictionary",
];

/// Property names exposed by nodes bound to backing content.
pub const GRAPH_NODE_PROPERTIES: &[&str] = &[
    "source",
    "target",
    "custom_order",
    "combine_mode",
    "is_initialized",
];

/// Property names exposed by combined nodes.
pub const COMBINED_NODE_PROPERTIES: &[&str] = &[
    "combined_nodes",
    "has_multiple_values",
    "has_multiple_initial_values",
    "distinct_initial_values",
    "reset_initial_values",
];

/// Every reserved property name, across all node kinds.
///
/// No entry ends with [`ESCAPE_SUFFIX`], which keeps escaping idempotent.
pub const RESERVED_NAMES: &[&[&str]] = &[
    NODE_PROPERTIES,
    GRAPH_NODE_PROPERTIES,
    COMBINED_NODE_PROPERTIES,
];

/// Appended to member names that collide with a reserved name.
pub const ESCAPE_SUFFIX: char = '_';

/// Separator between the segments of a node path.
pub const PATH_SEPARATOR: char = '.';

/// Prefix of the synthetic property notified alongside a child change.
pub const HAS_CHILD_PREFIX: &str = "has-child-";

/// Prefix of the synthetic property notified alongside a command change.
pub const HAS_COMMAND_PREFIX: &str = "has-command-";

/// Name of the built-in command restoring the initial values of a combined node.
pub const RESET_INITIAL_VALUES_COMMAND: &str = "ResetInitialValues";

/// Prefix of the generated transaction name of a command.
pub const EXECUTE_COMMAND_PREFIX: &str = "Execute";

/// Name of the stock operation appending an item to a collection.
pub const ADD_ITEM_OPERATION: &str = "AddItem";

/// Name of the stock operation removing an item from a collection.
pub const REMOVE_ITEM_OPERATION: &str = "RemoveItem";

/// Name of the stock operation emptying a collection.
pub const CLEAR_COLLECTION_OPERATION: &str = "ClearCollection";

/// Member holding the type name of an object in JSON documents.
pub const JSON_TYPE_KEY: &str = "$type";

/// Property names used in change notifications.
pub mod property {
    pub const VALUE: &str = "value";
    pub const DISPLAY_NAME: &str = "display_name";
    pub const IS_VISIBLE: &str = "is_visible";
    pub const IS_PRIMITIVE: &str = "is_primitive";
    pub const HAS_LIST: &str = "has_list";
    pub const HAS_DICTIONARY: &str = "has_dictionary";
    pub const ORDER: &str = "order";
    pub const CUSTOM_ORDER: &str = "custom_order";
    pub const VISIBLE_CHILDREN_COUNT: &str = "visible_children_count";
    pub const HAS_MULTIPLE_VALUES: &str = "has_multiple_values";
}
