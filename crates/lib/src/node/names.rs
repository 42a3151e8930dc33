//! Member names of nodes.
//!
//! A member name becomes a path segment and a lookup key, so it must not
//! collide with the properties every node exposes. Colliding names get
//! [`ESCAPE_SUFFIX`] appended, and lookups escape the queried name the same
//! way before comparing.

use std::borrow::Cow;

use crate::{
    Index,
    constants::{ESCAPE_SUFFIX, PATH_SEPARATOR, RESERVED_NAMES},
};

/// Returns true if `name` is a property of some kind of node.
pub fn is_reserved(name: &str) -> bool {
    RESERVED_NAMES
        .iter()
        .any(|names| names.contains(&name))
}

/// Escapes a member name so that it does not collide with a reserved name.
///
/// Escaping is idempotent: `escape(&escape(name)) == escape(name)`.
pub fn escape(name: &str) -> Cow<'_, str> {
    if is_reserved(name) {
        Cow::Owned(format!("{name}{ESCAPE_SUFFIX}"))
    } else {
        Cow::Borrowed(name)
    }
}

/// Name of the node presenting the item at `index` of a collection.
///
/// Keys are percent-encoded: path separators become `%2E` and `%` becomes
/// `%25`, so distinct keys always get distinct names.
pub fn item_name(index: &Index) -> String {
    match index {
        Index::Empty => String::new(),
        Index::Position(position) => position.to_string(),
        Index::Key(key) => encode_key(key),
    }
}

fn encode_key(key: &str) -> String {
    let mut name = String::with_capacity(key.len());
    for c in key.chars() {
        match c {
            KEY_ESCAPE => name.push_str("%25"),
            PATH_SEPARATOR => name.push_str("%2E"),
            c => name.push(c),
        }
    }
    name
}

const KEY_ESCAPE: char = '%';

/// Returns true if `name` can be used as a path segment.
pub fn is_valid(name: &str) -> bool {
    !name.trim().is_empty() && !name.contains(PATH_SEPARATOR)
}
