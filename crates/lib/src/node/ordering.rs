//! Sibling ordering.

use std::cmp::Ordering;

use crate::Index;

/// The attributes of a node that decide its position among its siblings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub order: Option<i32>,
    pub index: Index,
    pub declaration: Option<usize>,
    pub name: String,
}

/// Compares two siblings.
///
/// Keys, in priority: explicit order (a node with an order sorts before one
/// without), collection index when both are of the same kind, declaration
/// position, then name, case-insensitively when neither node has an order.
/// The exact name breaks remaining ties.
pub fn compare_siblings(a: &SortKey, b: &SortKey) -> Ordering {
    match (a.order, b.order) {
        (Some(x), Some(y)) if x != y => return x.cmp(&y),
        (Some(_), None) => return Ordering::Less,
        (None, Some(_)) => return Ordering::Greater,
        _ => {}
    }

    if let Some(ordering) = a.index.compare(&b.index)
        && ordering != Ordering::Equal
    {
        return ordering;
    }

    if let (Some(x), Some(y)) = (a.declaration, b.declaration)
        && x != y
    {
        return x.cmp(&y);
    }

    if a.order.is_none() && b.order.is_none() {
        let ordering = a.name.to_lowercase().cmp(&b.name.to_lowercase());
        if ordering != Ordering::Equal {
            return ordering;
        }
    }

    a.name.cmp(&b.name)
}

/// Position at which `key` must be inserted into `sorted` to keep it sorted.
///
/// Inserts after any sibling comparing equal.
pub fn insertion_point<T>(sorted: &[T], key: &SortKey, key_of: impl Fn(&T) -> &SortKey) -> usize {
    sorted.partition_point(|item| compare_siblings(key_of(item), key) != Ordering::Greater)
}
