//! Unified error types for the flattening engine.
//!
//! One error enum per phase, convertible into the top-level
//! [`JavelinError`] for unified handling:
//!
//! ```text
//! JavelinError
//! ├── RegistryError - type classification and id allocation
//! ├── FlattenError  - source-initializer emission
//! └── WireError     - binary encode/decode
//! ```
//!
//! None of these are retried internally, and no partial output survives
//! any of them: a failed flatten or encode call produces nothing usable.

use thiserror::Error;

use crate::types::{JavaType, QualifiedName};

/// Errors raised while classifying and registering types.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RegistryError {
    /// A referenced type could not be resolved to a descriptor. Aborts
    /// the whole compilation unit.
    #[error("unknown type: {0}")]
    TypeNotFound(JavaType),

    /// The record type-id space ran past its hard upper bound.
    #[error("too many record types")]
    RecordIdSpaceExhausted,

    /// The reference-array id space ran past its hard upper bound. This
    /// is a design limit, not a transient condition.
    #[error("too many array types")]
    ArrayIdSpaceExhausted,

    /// Primitive types have no descriptor of their own.
    #[error("not a reference type: {0}")]
    PrimitiveType(JavaType),

    /// Immutable value classes must extend `java.lang.Object` directly.
    #[error("{0}'s direct superclass must be java.lang.Object")]
    BadImmutableSuperclass(QualifiedName),
}

/// Errors raised while flattening a graph into C declarations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FlattenError {
    /// A value has no encoding in the source emitter.
    #[error("cannot translate a value of type {0} into C")]
    Unsupported(JavaType),

    /// A field value could not be read consistently with the declared
    /// layout of its class.
    #[error("cannot access {class}.{field}")]
    FieldAccess { class: QualifiedName, field: String },

    /// An object carries a different number of fields than its
    /// descriptor declares.
    #[error("field layout mismatch for {class}: {declared} declared, object has {actual}")]
    FieldMismatch {
        class: QualifiedName,
        declared: usize,
        actual: usize,
    },

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Errors raised by the binary codec.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum WireError {
    /// The type has no encoding in the wire format (object arrays,
    /// non-int/long/float/double primitives, custom-serialized types).
    #[error("not supported type: {0}")]
    Unsupported(JavaType),

    /// A field value disagrees with its declared type.
    #[error("cannot access {class}.{field}")]
    FieldAccess { class: QualifiedName, field: String },

    #[error("unexpected end of stream")]
    Truncated,

    #[error("unknown tag byte 0x{0:02x}")]
    UnknownTag(u8),

    #[error("unknown type id {0}")]
    UnknownTypeId(u16),

    /// A back-reference pointed past the id table.
    #[error("dangling object id {0}")]
    DanglingObjectId(u16),

    /// More objects in one encoding session than the 15-bit id space
    /// can name.
    #[error("too many objects in one stream")]
    TooManyObjects,

    /// An object carries a different number of fields than its
    /// descriptor declares.
    #[error("field layout mismatch for {class}: {declared} declared, object has {actual}")]
    FieldMismatch {
        class: QualifiedName,
        declared: usize,
        actual: usize,
    },

    /// The size word of a record did not match the words its fields
    /// occupy.
    #[error("size mismatch for {class}: declared {declared} words, walked {actual}")]
    SizeMismatch {
        class: QualifiedName,
        declared: u16,
        actual: u16,
    },

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Top-level wrapper over all phases.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum JavelinError {
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Flatten(#[from] FlattenError),
    #[error(transparent)]
    Wire(#[from] WireError),
}
