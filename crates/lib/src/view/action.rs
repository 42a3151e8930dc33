//! Combined actions: the scope of one user-visible edit.
//!
//! Every write made through a [`GraphView`] runs inside an action. Actions
//! nest; only the outermost one opens a transaction on the undo service and
//! reports the paths of the changed nodes to the observers, once, when it
//! ends.

use std::ops::{Deref, DerefMut};

use super::GraphView;
use crate::Result;

impl GraphView {
    /// Runs `f` inside an action named `name`.
    ///
    /// The transaction of the outermost action is completed if `f` succeeds
    /// and discarded otherwise. The name of the outermost named action wins.
    pub(crate) fn with_action<T>(
        &mut self,
        name: Option<String>,
        f: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<T> {
        self.begin_action(name, true);
        let result = f(self);
        self.end_action(result.is_ok());
        result
    }

    /// Opens an action. With `transactional` unset the outermost action only
    /// batches notifications, for callers that open their own transaction.
    pub(crate) fn begin_action(&mut self, name: Option<String>, transactional: bool) {
        if self.action.depth == 0 {
            self.action.transaction = self
                .undo
                .as_ref()
                .filter(|_| transactional)
                .map(|undo| undo.create_transaction());
            tracing::trace!("Combined action started");
        }
        self.action.depth += 1;
        if let Some(name) = name {
            self.action.name.get_or_insert(name);
        }
    }

    pub(crate) fn end_action(&mut self, success: bool) {
        self.action.depth = self.action.depth.saturating_sub(1);
        if self.action.depth > 0 {
            return;
        }

        let paths = std::mem::take(&mut self.action.pending_paths);
        let name = self.action.name.take();
        let transaction = self.action.transaction.take();

        if !paths.is_empty() {
            for observer in &self.observers {
                observer.nodes_changed(&paths);
            }
        }

        let (Some(undo), Some(transaction)) = (&self.undo, transaction) else {
            return;
        };
        let outcome = if success {
            name.as_deref()
                .map_or(Ok(()), |name| undo.set_name(transaction, name))
                .and_then(|()| undo.complete(transaction))
        } else {
            undo.discard(transaction)
        };
        if let Err(e) = outcome {
            tracing::warn!("Failed to close transaction {transaction}: {e}");
        }
        tracing::trace!(changed = paths.len(), "Combined action ended");
    }

    /// Opens an action spanning several writes. The action ends, and the
    /// changed paths are reported, when the returned guard is dropped.
    pub fn begin_combined_action(&mut self) -> CombinedAction<'_> {
        self.begin_action(None, true);
        CombinedAction { view: self }
    }

    /// Returns true while an action is open.
    pub fn in_action(&self) -> bool {
        self.action.depth > 0
    }
}

/// Guard of an action opened by [`GraphView::begin_combined_action`].
///
/// Dereferences to the view so writes can be made through it.
pub struct CombinedAction<'a> {
    view: &'a mut GraphView,
}

impl CombinedAction<'_> {
    /// Names the transaction of the action, replacing any name given by the
    /// writes made so far.
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.view.action.name = Some(name.into());
    }
}

impl Deref for CombinedAction<'_> {
    type Target = GraphView;

    fn deref(&self) -> &GraphView {
        self.view
    }
}

impl DerefMut for CombinedAction<'_> {
    fn deref_mut(&mut self) -> &mut GraphView {
        self.view
    }
}

impl Drop for CombinedAction<'_> {
    fn drop(&mut self) {
        self.view.end_action(true);
    }
}
