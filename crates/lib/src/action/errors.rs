//! Error types for undo/redo transactions.

use thiserror::Error;

use super::TransactionId;

/// Errors raised by an [`UndoService`](super::UndoService).
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ActionError {
    /// The transaction was never created or is already finished
    #[error("Unknown transaction: {transaction}")]
    UnknownTransaction { transaction: TransactionId },

    /// Transactions must be finished in the reverse order of their creation
    #[error("Transaction {transaction} completed while {innermost} is still open")]
    OutOfOrder {
        transaction: TransactionId,
        innermost: TransactionId,
    },
}

impl ActionError {
    /// Check if this error refers to an unknown transaction
    pub fn is_unknown_transaction(&self) -> bool {
        matches!(self, ActionError::UnknownTransaction { .. })
    }

    /// Get the transaction involved
    pub fn transaction(&self) -> TransactionId {
        match self {
            ActionError::UnknownTransaction { transaction }
            | ActionError::OutOfOrder { transaction, .. } => *transaction,
        }
    }
}

impl From<ActionError> for crate::Error {
    fn from(err: ActionError) -> Self {
        crate::Error::Action(err)
    }
}
