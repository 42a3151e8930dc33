//! Combination integration tests
//!
//! Trees of several selected objects fused into one editable tree: shared
//! values, writes fanned out to every object, list item pairing, combine
//! policies and the refreshes that follow external edits.

mod modes;
mod values;
