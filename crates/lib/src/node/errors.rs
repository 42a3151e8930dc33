//! Error types for node tree operations.

use thiserror::Error;

use super::NodeId;

/// Errors raised by node tree operations.
///
/// All of them are contract violations: they indicate that the caller built
/// or used an inconsistent tree, and they are returned as soon as detected.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum NodeError {
    /// The node was destroyed
    #[error("Node {node} has been destroyed")]
    DestroyedNodeAccess { node: NodeId },

    /// A child, command or associated data key already uses this name
    #[error("Node '{path}' already has a member named '{name}'")]
    DuplicateMemberName { path: String, name: String },

    /// Member names must be non-blank and must not contain the path separator
    #[error("Invalid member name '{name}' in node '{path}'")]
    InvalidMemberName { path: String, name: String },

    /// A node path could not be resolved or is malformed
    #[error("Invalid node path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    /// A value was read before the node finished initializing
    #[error("Node '{path}' accessed before initialization")]
    UninitializedAccess { path: String },

    /// The move would create a cycle, collide with a sibling, or involves a combined node
    #[error("Invalid move: {reason}")]
    InvalidMove { reason: String },

    /// The node to add already belongs to a parent
    #[error("Node '{path}' already has a parent")]
    AlreadyParented { path: String },

    /// The node is not a direct child of the given parent
    #[error("Node {child} is not a child of '{parent}'")]
    NotAChild { parent: String, child: NodeId },

    /// Root nodes cannot be refreshed
    #[error("Cannot refresh root node '{path}'")]
    RootRefresh { path: String },

    /// The node value cannot be written
    #[error("Node '{path}' is read-only")]
    ReadOnly { path: String },

    /// The bookkeeping of a node no longer matches its children or content
    #[error("Inconsistent node '{path}': {reason}")]
    Inconsistent { path: String, reason: String },

    /// The operation does not apply to this kind of node
    #[error("Node '{path}' is not a {expected} node")]
    KindMismatch { path: String, expected: &'static str },
}

impl NodeError {
    /// Check if this error indicates use of a destroyed node
    pub fn is_destroyed(&self) -> bool {
        matches!(self, NodeError::DestroyedNodeAccess { .. })
    }

    /// Check if this error is a naming conflict or an invalid name
    pub fn is_name_error(&self) -> bool {
        matches!(
            self,
            NodeError::DuplicateMemberName { .. } | NodeError::InvalidMemberName { .. }
        )
    }

    /// Check if this error is a path resolution failure
    pub fn is_invalid_path(&self) -> bool {
        matches!(self, NodeError::InvalidPath { .. })
    }

    /// Check if this error is a structural violation of the tree
    pub fn is_structure_error(&self) -> bool {
        matches!(
            self,
            NodeError::InvalidMove { .. }
                | NodeError::AlreadyParented { .. }
                | NodeError::NotAChild { .. }
                | NodeError::RootRefresh { .. }
                | NodeError::Inconsistent { .. }
        )
    }
}

impl From<NodeError> for crate::Error {
    fn from(err: NodeError) -> Self {
        crate::Error::Node(err)
    }
}
