//! Error types for node combination.

use thiserror::Error;

/// Errors raised while fusing the nodes of a multi-selection.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum CombineError {
    /// Same-named commands or children disagree on their combine policy
    #[error("Inconsistent combine mode for '{name}'")]
    InconsistentCombineMode { name: String },

    /// The nodes are not structurally equivalent
    #[error("Nodes cannot be combined: {reason}")]
    UncombinableSet { reason: String },

    /// The commands do not wrap the same backing operation
    #[error("Commands named '{name}' do not share a backing operation")]
    UncombinableCommands { name: String },
}

impl CombineError {
    /// Check if this error comes from a combine policy conflict
    pub fn is_inconsistent_mode(&self) -> bool {
        matches!(self, CombineError::InconsistentCombineMode { .. })
    }

    /// Check if this error comes from structurally different nodes
    pub fn is_uncombinable(&self) -> bool {
        matches!(
            self,
            CombineError::UncombinableSet { .. } | CombineError::UncombinableCommands { .. }
        )
    }
}

impl From<CombineError> for crate::Error {
    fn from(err: CombineError) -> Self {
        crate::Error::Combine(err)
    }
}
