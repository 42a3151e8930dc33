//! Node tree integration tests
//!
//! Structural operations on a built tree: naming, ordering, moves,
//! visibility and the lifetime of node ids.

mod naming;
mod structure;
