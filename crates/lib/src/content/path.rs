//! Paths into the backing content graph.
//!
//! A [`ContentPath`] records how a content location was reached from a root
//! object: which members were traversed, which references were followed and
//! which collection items were selected. Commands store paths instead of
//! live content ids so that they keep working after the node tree has been
//! rebuilt.

use std::fmt;

use super::{ContentGraph, ContentId, errors::ContentError};
use crate::{Index, Result};

/// One traversal step of a [`ContentPath`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathStep {
    /// Enter the member with the given name.
    Member(String),
    /// Follow the single reference held by the current member.
    Target,
    /// Follow the reference stored at the given index of the current collection.
    Index(Index),
}

/// An owned path from a root content to a content location.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContentPath {
    root: ContentId,
    steps: Vec<PathStep>,
}

impl ContentPath {
    /// Creates a path designating the root content itself.
    pub fn new(root: ContentId) -> Self {
        Self {
            root,
            steps: Vec::new(),
        }
    }

    pub fn root(&self) -> ContentId {
        self.root
    }

    pub fn steps(&self) -> &[PathStep] {
        &self.steps
    }

    /// Returns true if the path designates its root.
    pub fn is_root(&self) -> bool {
        self.steps.is_empty()
    }

    /// Returns a copy of this path extended with a member step.
    pub fn push_member(&self, name: impl Into<String>) -> Self {
        self.with_step(PathStep::Member(name.into()))
    }

    /// Returns a copy of this path extended with a reference step.
    pub fn push_target(&self) -> Self {
        self.with_step(PathStep::Target)
    }

    /// Returns a copy of this path extended with an indexed reference step.
    pub fn push_index(&self, index: Index) -> Self {
        self.with_step(PathStep::Index(index))
    }

    fn with_step(&self, step: PathStep) -> Self {
        let mut path = self.clone();
        path.steps.push(step);
        path
    }

    /// Computes the path of the location a source content resolves to.
    ///
    /// If the source holds a single reference the path follows it; if it holds a
    /// collection of references and `index` is set, the path follows the
    /// reference at that index. Otherwise the source path is returned unchanged.
    pub fn target_of(
        &self,
        graph: &dyn ContentGraph,
        source: ContentId,
        index: &Index,
    ) -> Result<ContentPath> {
        let mut path = self.clone();
        if graph.target_reference(source)?.is_some() {
            path = path.push_target();
        }
        if !index.is_empty() && graph.item_references(source)?.is_some() {
            path = path.push_index(index.clone());
        }
        Ok(path)
    }

    /// Resolves the path against the graph.
    ///
    /// # Errors
    /// Returns [`ContentError::InvalidPath`] if any step cannot be followed.
    pub fn resolve(&self, graph: &dyn ContentGraph) -> Result<ContentId> {
        let invalid = || ContentError::InvalidPath {
            path: self.to_string(),
        };

        graph.kind(self.root).map_err(|_| invalid())?;
        let mut current = self.root;
        for step in &self.steps {
            current = match step {
                PathStep::Member(name) => graph
                    .member_by_name(current, name)?
                    .ok_or_else(invalid)?,
                PathStep::Target => graph.target_reference(current)?.ok_or_else(invalid)?,
                PathStep::Index(index) => graph
                    .item_references(current)?
                    .and_then(|references| {
                        references
                            .into_iter()
                            .find(|reference| &reference.index == index)
                    })
                    .and_then(|reference| reference.target)
                    .ok_or_else(invalid)?,
            };
        }
        Ok(current)
    }
}

impl fmt::Display for ContentPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.root)?;
        for step in &self.steps {
            match step {
                PathStep::Member(name) => write!(f, ".{name}")?,
                PathStep::Target => write!(f, "->")?,
                PathStep::Index(index) => write!(f, "[{index}]")?,
            }
        }
        Ok(())
    }
}
