//! Collection index of a node.
//!
//! A node that mirrors an item of a list or a dictionary carries the
//! [`Index`] of that item inside its parent collection. Nodes bound to
//! plain members carry [`Index::Empty`].

use std::{cmp::Ordering, fmt};

use serde::{Deserialize, Serialize};

/// Position of an item within a collection or dictionary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Index {
    /// Not an item of a collection.
    #[default]
    Empty,
    /// Position in a list.
    Position(usize),
    /// Key in a dictionary.
    Key(String),
}

impl Index {
    /// Returns true if this index does not designate any item.
    pub fn is_empty(&self) -> bool {
        matches!(self, Index::Empty)
    }

    /// Returns the list position, if this index is one.
    pub fn as_position(&self) -> Option<usize> {
        match self {
            Index::Position(position) => Some(*position),
            _ => None,
        }
    }

    /// Returns the dictionary key, if this index is one.
    pub fn as_key(&self) -> Option<&str> {
        match self {
            Index::Key(key) => Some(key),
            _ => None,
        }
    }

    /// Compares two indices when they hold the same kind of value.
    ///
    /// Returns `None` when either index is empty or when one is a position
    /// and the other a key, since those have no meaningful order.
    pub fn compare(&self, other: &Index) -> Option<Ordering> {
        match (self, other) {
            (Index::Position(a), Index::Position(b)) => Some(a.cmp(b)),
            (Index::Key(a), Index::Key(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

impl fmt::Display for Index {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Index::Empty => Ok(()),
            Index::Position(position) => write!(f, "{position}"),
            Index::Key(key) => write!(f, "{key}"),
        }
    }
}

impl From<usize> for Index {
    fn from(position: usize) -> Self {
        Index::Position(position)
    }
}

impl From<&str> for Index {
    fn from(key: &str) -> Self {
        Index::Key(key.to_string())
    }
}

impl From<String> for Index {
    fn from(key: String) -> Self {
        Index::Key(key)
    }
}
