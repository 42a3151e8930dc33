//! Error types for node commands.

use thiserror::Error;

/// Errors raised while looking up or invoking a node command.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum CommandError {
    /// The node exposes no command with this name
    #[error("Command '{name}' not found on node '{path}'")]
    CommandNotFound { path: String, name: String },

    /// The backing operation reported a failure
    #[error("Command '{name}' failed: {reason}")]
    OperationFailed { name: String, reason: String },

    /// The command can only be invoked through the view that owns it
    #[error("Command '{name}' must be invoked through its view")]
    RequiresView { name: String },

    /// The command has nothing to undo
    #[error("Command '{name}' cannot be undone")]
    NotUndoable { name: String },
}

impl CommandError {
    /// Check if this error indicates a missing command
    pub fn is_not_found(&self) -> bool {
        matches!(self, CommandError::CommandNotFound { .. })
    }

    /// Check if the backing operation failed
    pub fn is_operation_failure(&self) -> bool {
        matches!(self, CommandError::OperationFailed { .. })
    }

    /// Get the command name involved
    pub fn command_name(&self) -> &str {
        match self {
            CommandError::CommandNotFound { name, .. }
            | CommandError::OperationFailed { name, .. }
            | CommandError::RequiresView { name }
            | CommandError::NotUndoable { name } => name,
        }
    }
}

impl From<CommandError> for crate::Error {
    fn from(err: CommandError) -> Self {
        crate::Error::Command(err)
    }
}
