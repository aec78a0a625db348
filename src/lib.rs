//! Flattens live JVM object graphs into two linear forms: C global
//! declarations a translated program compiles in, and a self-describing
//! binary stream for the remote-call boundary. Both walks share the same
//! cycle-breaking discipline (label an object before visiting its
//! fields) and the same [`TypeRegistry`] id space.

pub use javelin_core::error::{FlattenError, JavelinError, RegistryError, WireError};
pub use javelin_core::header;
pub use javelin_core::identity::IdentityTracker;
pub use javelin_core::provider::{ClassInfo, ClassPool, ClassShape, TypeProvider};
pub use javelin_core::types::{FieldDef, JavaType, PrimKind, QualifiedName};
pub use javelin_core::value::{ObjRef, ObjectBody, PrimArray, Value};
pub use javelin_emit::{FlattenOutput, HeapModel, ObjectFlattener};
pub use javelin_registry::{
    DependencyOrderer, DescriptorId, TypeDescriptor, TypeKind, TypeRegistry,
};
pub use javelin_wire::{scalar, BinaryDecoder, BinaryEncoder, ByteReader, ByteWriter};

pub mod prelude {
    pub use javelin_core::error::JavelinError;
    pub use javelin_core::provider::{ClassPool, ClassShape, TypeProvider};
    pub use javelin_core::types::{FieldDef, JavaType, PrimKind, QualifiedName};
    pub use javelin_core::value::{PrimArray, Value};
    pub use javelin_emit::{HeapModel, ObjectFlattener};
    pub use javelin_registry::TypeRegistry;
    pub use javelin_wire::{BinaryDecoder, BinaryEncoder};
}
