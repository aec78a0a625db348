//! Source-level type names.
//!
//! A [`JavaType`] identifies a type as the bytecode sees it: a primitive,
//! a class, or an array of either. Type identity is structural on the
//! fully-qualified name; object identity (for flattening live graphs)
//! lives in [`crate::value`] instead.

use std::fmt;
use std::sync::Arc;

use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::header;

/// Fully-qualified class name, e.g. `java.lang.String`.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QualifiedName(Arc<str>);

impl QualifiedName {
    /// The built-in root class.
    pub const OBJECT: &'static str = "java.lang.Object";
    /// The built-in string class, special-cased by the registry.
    pub const STRING: &'static str = "java.lang.String";

    pub fn new(name: impl Into<Arc<str>>) -> Self {
        QualifiedName(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The name after the last `.`, used for C struct tags.
    pub fn simple_name(&self) -> &str {
        self.0.rsplit('.').next().unwrap_or(&self.0)
    }

    pub fn is_object(&self) -> bool {
        &*self.0 == Self::OBJECT
    }

    pub fn is_string(&self) -> bool {
        &*self.0 == Self::STRING
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "QualifiedName({})", self.0)
    }
}

impl From<&str> for QualifiedName {
    fn from(name: &str) -> Self {
        QualifiedName::new(name)
    }
}

/// The eight JVM primitive kinds.
///
/// Discriminants follow the fixed enumeration order of the id table in
/// [`crate::header`]: the array type id is `0xf0 + kind` and the wire
/// field tag is `0xf8 + kind`.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive)]
pub enum PrimKind {
    Bool = 0,
    Byte,
    Char,
    Short,
    Int,
    Long,
    Float,
    Double,
}

impl PrimKind {
    /// The C spelling of this primitive.
    pub fn c_name(self) -> &'static str {
        match self {
            PrimKind::Bool => "char",
            PrimKind::Byte => "signed char",
            PrimKind::Char => "unsigned short",
            PrimKind::Short => "signed short",
            PrimKind::Int => "int",
            PrimKind::Long => "long",
            PrimKind::Float => "float",
            PrimKind::Double => "double",
        }
    }

    /// The Java spelling, for diagnostics.
    pub fn java_name(self) -> &'static str {
        match self {
            PrimKind::Bool => "boolean",
            PrimKind::Byte => "byte",
            PrimKind::Char => "char",
            PrimKind::Short => "short",
            PrimKind::Int => "int",
            PrimKind::Long => "long",
            PrimKind::Float => "float",
            PrimKind::Double => "double",
        }
    }

    /// Type id of the primitive-array kind with this component.
    pub fn array_type_id(self) -> u8 {
        header::PRIM_ARRAY_BASE + u8::from(self)
    }

    /// Wire tag byte for a scalar field of this kind.
    pub fn field_tag(self) -> u8 {
        header::PRIM_FIELD_BASE + u8::from(self)
    }

    pub fn from_array_type_id(id: u8) -> Option<Self> {
        id.checked_sub(header::PRIM_ARRAY_BASE)
            .and_then(|k| PrimKind::try_from(k).ok())
    }

    /// Payload size in 32-bit words.
    pub fn words(self) -> u16 {
        match self {
            PrimKind::Long | PrimKind::Double => 2,
            _ => 1,
        }
    }
}

impl fmt::Display for PrimKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.java_name())
    }
}

/// A source-level type: primitive, class, or array.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum JavaType {
    Prim(PrimKind),
    Class(QualifiedName),
    PrimArray(PrimKind),
    RefArray(Box<JavaType>),
}

impl JavaType {
    pub fn class(name: &str) -> Self {
        JavaType::Class(QualifiedName::new(name))
    }

    pub fn ref_array(component: JavaType) -> Self {
        JavaType::RefArray(Box::new(component))
    }

    pub fn string() -> Self {
        JavaType::class(QualifiedName::STRING)
    }

    pub fn is_primitive(&self) -> bool {
        matches!(self, JavaType::Prim(_))
    }

    pub fn is_reference(&self) -> bool {
        !self.is_primitive()
    }

    pub fn is_array(&self) -> bool {
        matches!(self, JavaType::PrimArray(_) | JavaType::RefArray(_))
    }

    /// Component type of an array, if this is one.
    pub fn component(&self) -> Option<JavaType> {
        match self {
            JavaType::PrimArray(k) => Some(JavaType::Prim(*k)),
            JavaType::RefArray(c) => Some((**c).clone()),
            _ => None,
        }
    }

    pub fn class_name(&self) -> Option<&QualifiedName> {
        match self {
            JavaType::Class(name) => Some(name),
            _ => None,
        }
    }
}

impl fmt::Display for JavaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JavaType::Prim(k) => f.write_str(k.java_name()),
            JavaType::Class(name) => f.write_str(name.as_str()),
            JavaType::PrimArray(k) => write!(f, "{}[]", k.java_name()),
            JavaType::RefArray(c) => write!(f, "{c}[]"),
        }
    }
}

/// One declared field: name plus static type, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDef {
    pub name: String,
    pub ty: JavaType,
}

impl FieldDef {
    pub fn new(name: &str, ty: JavaType) -> Self {
        FieldDef { name: name.to_string(), ty }
    }
}
