//! Type registration, id assignment, and definition ordering.
//!
//! This crate turns source-level type names into [`TypeDescriptor`]s:
//! numbered, laid out, and ordered so that embedded-by-value types are
//! defined before their embedders. Both the source emitter and the wire
//! codec drive the same [`TypeRegistry`], so a type id means the same
//! thing in generated code and on the wire.

pub mod descriptor;
pub mod order;
pub mod registry;

pub use descriptor::{DescriptorId, TypeDescriptor, TypeKind};
pub use order::DependencyOrderer;
pub use registry::TypeRegistry;
