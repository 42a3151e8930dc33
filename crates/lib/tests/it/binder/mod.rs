//! Binding integration tests
//!
//! How graph nodes present objects, references and collections, and how they
//! follow changes made to the content behind the view's back.

mod collections;
mod references;
