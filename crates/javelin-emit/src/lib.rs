//! Source-initializer emission.
//!
//! Flattens a live object graph into C global-variable declarations so a
//! translated program starts with its heap pre-built. The walk labels
//! objects before recursing, which is what turns aliasing and cycles
//! into plain symbol reuse instead of infinite descent.

pub mod flatten;
pub mod heap;

pub use flatten::{FlattenOutput, ObjectFlattener};
pub use heap::HeapModel;
