//! Invocable node commands.
//!
//! A [`NodeOperation`] is an action exposed by the backing content, for
//! example adding an item to a list. Nodes never hold operations directly:
//! they hold [`NodeCommand`]s, which wrap either a caller-supplied closure,
//! a backing operation addressed by [`ContentPath`], or the same backing
//! operation applied to every node of a multi-selection. Every invocation
//! runs inside one transaction of the [`UndoService`], if one is present.

pub mod errors;

use std::{fmt, sync::Arc};

use async_trait::async_trait;
pub use errors::CommandError;
use serde::{Deserialize, Serialize};

use crate::{
    Index, Result,
    action::UndoService,
    constants,
    content::{ContentGraph, ContentId, ContentPath, Value},
    view::CombineError,
};

/// Policy deciding whether same-named commands or nodes of a
/// multi-selection are fused into one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CombineMode {
    /// Never combined.
    DoNotCombine,
    /// Combined only when every node of the selection exposes it.
    CombineOnlyForAll,
    /// Combined as soon as at least one node exposes it.
    AlwaysCombine,
}

impl CombineMode {
    /// Decides whether a group of `group_size` items taken from a selection
    /// of `selection_size` nodes is combined.
    pub fn should_combine(&self, group_size: usize, selection_size: usize) -> bool {
        match self {
            CombineMode::DoNotCombine => false,
            CombineMode::AlwaysCombine => true,
            CombineMode::CombineOnlyForAll => group_size == selection_size,
        }
    }
}

/// Result of a command invocation, used to undo it later.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UndoToken {
    pub can_undo: bool,
    pub token: Option<Value>,
}

impl UndoToken {
    /// A token for an invocation that cannot be undone.
    pub fn none() -> Self {
        Self::default()
    }

    /// A token carrying the state needed to undo an invocation.
    pub fn new(token: Value) -> Self {
        Self {
            can_undo: true,
            token: Some(token),
        }
    }
}

/// Location a backing operation runs against.
#[derive(Clone)]
pub struct OperationContext {
    pub content: Arc<dyn ContentGraph>,
    pub location: ContentId,
    /// Index of the item the node represents, [`Index::Empty`] otherwise.
    pub index: Index,
}

/// An operation exposed by the backing content.
///
/// Operations are identified by their `Arc`: a combined command can only be
/// built from commands sharing the very same operation instance.
#[async_trait]
pub trait NodeOperation: Send + Sync {
    fn name(&self) -> &str;

    fn combine_mode(&self) -> CombineMode {
        CombineMode::CombineOnlyForAll
    }

    /// Runs the operation.
    async fn execute(&self, context: &OperationContext, parameter: &Value) -> Result<UndoToken>;

    /// Reverts a previous execution.
    async fn undo(&self, _context: &OperationContext, _token: &UndoToken) -> Result<()> {
        Ok(())
    }

    /// Called before the operation is applied to every node of a selection.
    fn start_combined_invoke(&self) {}

    /// Called after the operation was applied to every node of a selection.
    fn end_combined_invoke(&self) {}
}

/// Closure run by a direct command.
pub type RedoFn = Arc<dyn Fn(&Value) -> Result<UndoToken> + Send + Sync>;

/// Closure reverting a direct command.
pub type UndoFn = Arc<dyn Fn(&UndoToken) -> Result<()> + Send + Sync>;

/// What a [`NodeCommand`] runs when invoked.
#[derive(Clone)]
pub enum CommandKind {
    /// Caller-supplied closures.
    Direct { redo: RedoFn, undo: Option<UndoFn> },
    /// A backing operation, run on the location `path` resolves to at invoke time.
    Model {
        operation: Arc<dyn NodeOperation>,
        path: ContentPath,
        index: Index,
    },
    /// The same backing operation run once per node of a selection.
    Combined {
        operation: Arc<dyn NodeOperation>,
        commands: Vec<NodeCommand>,
    },
    /// Restores the values a combined node had when it was built.
    ResetInitialValues,
}

/// A named, invocable action attached to a node.
#[derive(Clone)]
pub struct NodeCommand {
    name: String,
    combine_mode: CombineMode,
    transaction_name: Option<String>,
    kind: CommandKind,
}

impl fmt::Debug for NodeCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match &self.kind {
            CommandKind::Direct { .. } => "direct",
            CommandKind::Model { .. } => "model",
            CommandKind::Combined { .. } => "combined",
            CommandKind::ResetInitialValues => "reset",
        };
        f.debug_struct("NodeCommand")
            .field("name", &self.name)
            .field("combine_mode", &self.combine_mode)
            .field("kind", &kind)
            .finish()
    }
}

/// Collaborators needed to invoke a command.
#[derive(Clone)]
pub struct CommandContext {
    pub content: Arc<dyn ContentGraph>,
    pub undo: Option<Arc<dyn UndoService>>,
}

impl NodeCommand {
    /// Creates a command running `redo` when invoked.
    ///
    /// Direct commands are never combined unless a mode is set explicitly.
    pub fn direct(
        name: impl Into<String>,
        redo: impl Fn(&Value) -> Result<UndoToken> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            combine_mode: CombineMode::DoNotCombine,
            transaction_name: None,
            kind: CommandKind::Direct {
                redo: Arc::new(redo),
                undo: None,
            },
        }
    }

    /// Creates a command running a backing operation on the location
    /// designated by `path`.
    pub fn model(operation: Arc<dyn NodeOperation>, path: ContentPath, index: Index) -> Self {
        Self {
            name: operation.name().to_string(),
            combine_mode: operation.combine_mode(),
            transaction_name: None,
            kind: CommandKind::Model {
                operation,
                path,
                index,
            },
        }
    }

    /// Fuses same-named commands of a selection into one.
    ///
    /// # Errors
    /// Returns [`CombineError::UncombinableCommands`] if the commands do not
    /// all wrap the same backing operation.
    pub fn combined(name: impl Into<String>, commands: Vec<NodeCommand>) -> Result<Self> {
        let name = name.into();
        let uncombinable = || CombineError::UncombinableCommands { name: name.clone() };

        let operation = commands
            .first()
            .and_then(NodeCommand::operation)
            .cloned()
            .ok_or_else(uncombinable)?;
        for command in &commands {
            let same = matches!(
                &command.kind,
                CommandKind::Model { operation: other, .. } if Arc::ptr_eq(other, &operation)
            );
            if !same {
                return Err(uncombinable().into());
            }
        }

        Ok(Self {
            combine_mode: operation.combine_mode(),
            transaction_name: None,
            kind: CommandKind::Combined {
                operation,
                commands,
            },
            name,
        })
    }

    /// The built-in command of combined nodes.
    pub fn reset_initial_values() -> Self {
        Self {
            name: constants::RESET_INITIAL_VALUES_COMMAND.to_string(),
            combine_mode: CombineMode::DoNotCombine,
            transaction_name: None,
            kind: CommandKind::ResetInitialValues,
        }
    }

    pub fn with_undo(
        mut self,
        undo_fn: impl Fn(&UndoToken) -> Result<()> + Send + Sync + 'static,
    ) -> Self {
        if let CommandKind::Direct { undo, .. } = &mut self.kind {
            *undo = Some(Arc::new(undo_fn));
        }
        self
    }

    pub fn with_combine_mode(mut self, combine_mode: CombineMode) -> Self {
        self.combine_mode = combine_mode;
        self
    }

    /// Overrides the generated transaction name.
    pub fn with_transaction_name(mut self, name: impl Into<String>) -> Self {
        self.transaction_name = Some(name.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn combine_mode(&self) -> CombineMode {
        self.combine_mode
    }

    pub fn kind(&self) -> &CommandKind {
        &self.kind
    }

    /// The backing operation, for model and combined commands.
    pub fn operation(&self) -> Option<&Arc<dyn NodeOperation>> {
        match &self.kind {
            CommandKind::Model { operation, .. } | CommandKind::Combined { operation, .. } => {
                Some(operation)
            }
            _ => None,
        }
    }

    /// Name of the transaction opened by each invocation.
    pub fn transaction_name(&self) -> String {
        self.transaction_name
            .clone()
            .unwrap_or_else(|| format!("{} {}", constants::EXECUTE_COMMAND_PREFIX, self.name))
    }

    /// Invokes the command inside one transaction.
    ///
    /// The transaction is completed only if the command succeeds; on failure
    /// it is discarded and the error is returned unchanged.
    pub async fn invoke(&self, context: &CommandContext, parameter: &Value) -> Result<UndoToken> {
        if matches!(self.kind, CommandKind::ResetInitialValues) {
            return Err(CommandError::RequiresView {
                name: self.name.clone(),
            }
            .into());
        }

        tracing::debug!(command = %self.name, "Invoking command");
        let transaction = context.undo.as_ref().map(|undo| undo.create_transaction());
        let result = self.run(context, parameter).await;

        if let (Some(undo), Some(transaction)) = (&context.undo, transaction) {
            match &result {
                Ok(_) => {
                    undo.set_name(transaction, &self.transaction_name())?;
                    undo.complete(transaction)?;
                }
                Err(e) => {
                    tracing::debug!(command = %self.name, "Command failed: {e}");
                    if let Err(discard_error) = undo.discard(transaction) {
                        tracing::warn!("Failed to discard transaction: {discard_error}");
                    }
                }
            }
        }
        result
    }

    async fn run(&self, context: &CommandContext, parameter: &Value) -> Result<UndoToken> {
        match &self.kind {
            CommandKind::Direct { redo, .. } => redo(parameter),
            CommandKind::Model {
                operation,
                path,
                index,
            } => {
                let operation_context = Self::operation_context(context, path, index)?;
                operation.execute(&operation_context, parameter).await
            }
            CommandKind::Combined {
                operation,
                commands,
            } => {
                operation.start_combined_invoke();
                let mut result = Ok(());
                for command in commands {
                    if let Err(e) = Box::pin(command.invoke(context, parameter)).await {
                        result = Err(e);
                        break;
                    }
                }
                operation.end_combined_invoke();
                result.map(|_| UndoToken::none())
            }
            CommandKind::ResetInitialValues => Err(CommandError::RequiresView {
                name: self.name.clone(),
            }
            .into()),
        }
    }

    /// Reverts an invocation of this command.
    pub async fn undo(&self, context: &CommandContext, token: &UndoToken) -> Result<()> {
        let not_undoable = || CommandError::NotUndoable {
            name: self.name.clone(),
        };
        if !token.can_undo {
            return Err(not_undoable().into());
        }
        match &self.kind {
            CommandKind::Direct { undo, .. } => {
                let undo = undo.as_ref().ok_or_else(not_undoable)?;
                undo(token)
            }
            CommandKind::Model {
                operation,
                path,
                index,
            } => {
                let operation_context = Self::operation_context(context, path, index)?;
                operation.undo(&operation_context, token).await
            }
            _ => Err(not_undoable().into()),
        }
    }

    fn operation_context(
        context: &CommandContext,
        path: &ContentPath,
        index: &Index,
    ) -> Result<OperationContext> {
        let location = path.resolve(context.content.as_ref())?;
        Ok(OperationContext {
            content: context.content.clone(),
            location,
            index: index.clone(),
        })
    }
}
