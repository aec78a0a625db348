//! Core data model for the javelin flattening engine.
//!
//! This crate holds everything the registry, the source emitter, and the
//! wire codec share: the source-type names, the live heap-value model,
//! the object-header id table, the per-session identity tracker, the
//! type-metadata provider interface, and the unified error hierarchy.

pub mod error;
pub mod header;
pub mod identity;
pub mod provider;
pub mod types;
pub mod value;

pub use error::{FlattenError, JavelinError, RegistryError, WireError};
pub use header::HeaderFlags;
pub use identity::IdentityTracker;
pub use provider::{ClassInfo, ClassPool, ClassShape, TypeProvider};
pub use types::{FieldDef, JavaType, PrimKind, QualifiedName};
pub use value::{ObjRef, ObjectBody, ObjectIdent, PrimArray, Value};
