//!
//! Arbor: a live, editable property tree over an object graph.
//! This library builds the node trees a property editor presents, keeps them in sync with the
//! objects they describe, and fuses the trees of a multi-selection into one editable view.
//!
//! ## Core Concepts
//!
//! Arbor is built around several key concepts:
//!
//! * **Content (`content::ContentGraph`)**: The backing object graph. Every member, list and
//!   dictionary is a content location that can be read, written, and watched for changes.
//!   `content::memory::InMemoryGraph` is the bundled implementation.
//! * **Nodes (`node::Node`)**: The elements of a presented tree. Graph nodes mirror one content
//!   location, combined nodes stand for the same member across several selected objects, and
//!   virtual nodes are driven by caller-supplied closures.
//! * **Views (`view::GraphView`)**: The owner of a tree. A view builds the tree from
//!   `service::PropertyProvider`s, propagates writes, refreshes nodes when the content changes,
//!   and brackets every edit in one transaction.
//! * **Commands (`command::NodeCommand`)**: Named actions attached to nodes, such as adding an
//!   item to a list. Same-named commands of a multi-selection are fused according to their
//!   `command::CombineMode`.
//! * **Transactions (`action::UndoService`)**: The undo/redo log every write and command reports
//!   to. `action::ActionStack` is an in-memory implementation.

pub mod action;
pub mod command;
pub mod constants;
pub mod content;
pub mod index;
pub mod node;
pub mod service;
pub mod settings;
pub mod view;

/// Re-export the `Index` enum for easier access.
pub use index::Index;
/// Re-export the `GraphView` struct for easier access.
pub use view::GraphView;

/// Result type used throughout the Arbor library.
pub type Result<T> = std::result::Result<T, Error>;

/// Common error type for the Arbor library.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Structured content errors from the content module
    #[error(transparent)]
    Content(content::ContentError),

    /// Structured node tree errors from the node module
    #[error(transparent)]
    Node(node::NodeError),

    /// Structured combination errors from the view module
    #[error(transparent)]
    Combine(view::CombineError),

    /// Structured command errors from the command module
    #[error(transparent)]
    Command(command::CommandError),

    /// Structured transaction errors from the action module
    #[error(transparent)]
    Action(action::ActionError),
}

impl Error {
    /// Get the originating module for this error.
    pub fn module(&self) -> &'static str {
        match self {
            Error::Content(_) => "content",
            Error::Node(_) => "node",
            Error::Combine(_) => "view",
            Error::Command(_) => "command",
            Error::Action(_) => "action",
        }
    }

    /// Check if this error indicates a resource was not found.
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::Content(content_err) => content_err.is_not_found(),
            Error::Command(command_err) => command_err.is_not_found(),
            _ => false,
        }
    }

    /// Check if this error indicates an unresolvable path, of a node or of
    /// a content location.
    pub fn is_invalid_path(&self) -> bool {
        match self {
            Error::Content(content_err) => content_err.is_invalid_path(),
            Error::Node(node_err) => node_err.is_invalid_path(),
            _ => false,
        }
    }

    /// Check if this error is type-related.
    pub fn is_type_error(&self) -> bool {
        match self {
            Error::Content(content_err) => content_err.is_type_error(),
            _ => false,
        }
    }

    /// Check if this error indicates access to a destroyed node.
    pub fn is_destroyed_node(&self) -> bool {
        match self {
            Error::Node(node_err) => node_err.is_destroyed(),
            _ => false,
        }
    }

    /// Check if this error reports a broken tree invariant.
    pub fn is_structure_error(&self) -> bool {
        match self {
            Error::Node(node_err) => node_err.is_structure_error() || node_err.is_name_error(),
            _ => false,
        }
    }

    /// Check if this error is combination-related.
    pub fn is_combine_error(&self) -> bool {
        matches!(self, Error::Combine(_))
    }

    /// Check if this error is command-related.
    pub fn is_command_error(&self) -> bool {
        matches!(self, Error::Command(_))
    }

    /// Check if this error is transaction-related.
    pub fn is_action_error(&self) -> bool {
        matches!(self, Error::Action(_))
    }
}
