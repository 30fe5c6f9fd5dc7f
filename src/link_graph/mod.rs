//! The deferred-write link graph: a tree of [`Node`]s that emit placeholder
//! offsets during write, gathered into a namespaced symbol table, laid out
//! with per-node alignment, and back-patched by [`Linker`] once every
//! address is known.

pub mod link;
pub mod linker;
pub mod node;

pub use link::{Hook, Link, Relation};
pub use linker::Linker;
pub use node::Node;
