//! Undo/redo transaction boundaries.
//!
//! The node tree never inspects the undo history. It only opens a
//! transaction before a write or a command, names it, and completes it
//! afterwards through an [`UndoService`]. [`ActionStack`] is an in-memory
//! implementation that folds nested transactions into the outermost one
//! and records one [`ActionEntry`] per outermost transaction.

pub mod errors;

use std::{
    fmt,
    sync::{Mutex, MutexGuard, PoisonError},
};

pub use errors::ActionError;
use serde::{Deserialize, Serialize};

use crate::Result;

/// Identifier of an open transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransactionId(u64);

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tx{}", self.0)
    }
}

/// Call contract of the undo/redo transaction log.
pub trait UndoService: Send + Sync {
    /// Opens a new transaction, nested in any transaction still open.
    fn create_transaction(&self) -> TransactionId;

    /// Sets the user-facing name of an open transaction.
    fn set_name(&self, transaction: TransactionId, name: &str) -> Result<()>;

    /// Completes an open transaction.
    fn complete(&self, transaction: TransactionId) -> Result<()>;

    /// Drops an open transaction without recording it.
    ///
    /// Called when the operation running inside the transaction failed.
    /// Rolling back any partial effect is left to the implementation.
    fn discard(&self, transaction: TransactionId) -> Result<()> {
        self.complete(transaction)
    }
}

/// A completed outermost transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionEntry {
    pub name: String,
    /// Number of nested transactions folded into this entry.
    pub nested: usize,
}

#[derive(Debug)]
struct OpenTransaction {
    id: TransactionId,
    name: Option<String>,
    nested: usize,
}

#[derive(Debug, Default)]
struct StackState {
    next_id: u64,
    open: Vec<OpenTransaction>,
    entries: Vec<ActionEntry>,
}

/// In-memory [`UndoService`] recording completed transactions.
#[derive(Debug, Default)]
pub struct ActionStack {
    state: Mutex<StackState>,
}

impl ActionStack {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, StackState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Completed entries, oldest first.
    pub fn entries(&self) -> Vec<ActionEntry> {
        self.state().entries.clone()
    }

    /// Names of the completed entries, oldest first.
    pub fn names(&self) -> Vec<String> {
        self.state()
            .entries
            .iter()
            .map(|entry| entry.name.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.state().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state().entries.is_empty()
    }

    /// Number of transactions currently open.
    pub fn open_transactions(&self) -> usize {
        self.state().open.len()
    }

    /// Forgets every completed entry.
    pub fn clear(&self) {
        self.state().entries.clear();
    }

    fn pop_innermost(state: &mut StackState, transaction: TransactionId) -> Result<OpenTransaction> {
        let innermost = state
            .open
            .last()
            .map(|open| open.id)
            .ok_or(ActionError::UnknownTransaction { transaction })?;
        if innermost != transaction {
            if state.open.iter().any(|open| open.id == transaction) {
                return Err(ActionError::OutOfOrder {
                    transaction,
                    innermost,
                }
                .into());
            }
            return Err(ActionError::UnknownTransaction { transaction }.into());
        }
        state
            .open
            .pop()
            .ok_or_else(|| ActionError::UnknownTransaction { transaction }.into())
    }
}

impl UndoService for ActionStack {
    fn create_transaction(&self) -> TransactionId {
        let mut state = self.state();
        state.next_id += 1;
        let id = TransactionId(state.next_id);
        state.open.push(OpenTransaction {
            id,
            name: None,
            nested: 0,
        });
        tracing::trace!(transaction = %id, depth = state.open.len(), "Transaction opened");
        id
    }

    fn set_name(&self, transaction: TransactionId, name: &str) -> Result<()> {
        let mut state = self.state();
        let open = state
            .open
            .iter_mut()
            .find(|open| open.id == transaction)
            .ok_or(ActionError::UnknownTransaction { transaction })?;
        open.name = Some(name.to_string());
        Ok(())
    }

    fn complete(&self, transaction: TransactionId) -> Result<()> {
        let mut state = self.state();
        let finished = Self::pop_innermost(&mut state, transaction)?;
        match state.open.last_mut() {
            Some(outer) => {
                outer.nested += finished.nested + 1;
                if outer.name.is_none() {
                    outer.name = finished.name;
                }
            }
            None => {
                let name = finished
                    .name
                    .unwrap_or_else(|| format!("Transaction {}", finished.id.0));
                tracing::debug!(name = %name, nested = finished.nested, "Transaction recorded");
                state.entries.push(ActionEntry {
                    name,
                    nested: finished.nested,
                });
            }
        }
        Ok(())
    }

    fn discard(&self, transaction: TransactionId) -> Result<()> {
        let mut state = self.state();
        Self::pop_innermost(&mut state, transaction)?;
        tracing::debug!(transaction = %transaction, "Transaction discarded");
        Ok(())
    }
}
