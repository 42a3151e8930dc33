//! Error types for backing content access.

use thiserror::Error;

use super::ContentId;
use crate::Index;

/// Errors raised by a [`ContentGraph`](super::ContentGraph) or while
/// resolving a [`ContentPath`](super::ContentPath).
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ContentError {
    /// The content location does not exist
    #[error("Content not found: {id}")]
    NotFound { id: ContentId },

    /// A content path could not be resolved against the graph
    #[error("Invalid content path: {path}")]
    InvalidPath { path: String },

    /// The index does not designate an item of the collection
    #[error("Index [{index}] out of range for content {id}")]
    IndexOutOfRange { id: ContentId, index: Index },

    /// The value does not match the static type of the location
    #[error("Type mismatch on content {id}: expected {expected}, found {actual}")]
    TypeMismatch {
        id: ContentId,
        expected: String,
        actual: String,
    },

    /// The dictionary already holds the key
    #[error("Key '{key}' already present in content {id}")]
    DuplicateKey { id: ContentId, key: String },

    /// The operation requires a list or a dictionary
    #[error("Content {id} is not a collection")]
    NotACollection { id: ContentId },

    /// The operation requires an object content
    #[error("Content {id} is not an object")]
    NotAnObject { id: ContentId },

    /// The member cannot be written
    #[error("Content {id} is read-only")]
    ReadOnly { id: ContentId },

    /// Importing or exporting a document failed
    #[error("Document conversion failed: {reason}")]
    Conversion { reason: String },
}

impl ContentError {
    /// Check if this error indicates a missing content location
    pub fn is_not_found(&self) -> bool {
        matches!(self, ContentError::NotFound { .. })
    }

    /// Check if this error is a path resolution failure
    pub fn is_invalid_path(&self) -> bool {
        matches!(self, ContentError::InvalidPath { .. })
    }

    /// Check if this error is a type mismatch
    pub fn is_type_error(&self) -> bool {
        matches!(
            self,
            ContentError::TypeMismatch { .. }
                | ContentError::NotACollection { .. }
                | ContentError::NotAnObject { .. }
        )
    }

    /// Get the content id involved, if any
    pub fn content_id(&self) -> Option<ContentId> {
        match self {
            ContentError::NotFound { id }
            | ContentError::IndexOutOfRange { id, .. }
            | ContentError::DuplicateKey { id, .. }
            | ContentError::TypeMismatch { id, .. }
            | ContentError::NotACollection { id }
            | ContentError::NotAnObject { id }
            | ContentError::ReadOnly { id } => Some(*id),
            _ => None,
        }
    }
}

impl From<ContentError> for crate::Error {
    fn from(err: ContentError) -> Self {
        crate::Error::Content(err)
    }
}
