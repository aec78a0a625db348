//! Per-type layout and metadata.
//!
//! A [`TypeDescriptor`] records everything either flattener needs to
//! know about one source type: its numeric id, its representation
//! [`TypeKind`], its full field list (inherited fields first), and the
//! C names of its reference and object types. The variant set is closed;
//! the flatteners dispatch on the kind tag and stay generic over it.

use javelin_core::header::{self, HeaderFlags};
use javelin_core::types::{FieldDef, JavaType, PrimKind};

use crate::registry::TypeRegistry;

/// Stable handle to a descriptor inside its registry.
///
/// The registry is the sole owner of descriptors; every holder keeps one
/// of these and goes through the registry, so repeat registration hands
/// back the identical descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DescriptorId(pub(crate) u32);

impl DescriptorId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Representation of a type in the target.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeKind {
    /// Heap record: struct with a header word, handled by pointer.
    Record,
    /// Flattened immutable value, embedded by value (union when the
    /// source type is an interface).
    ImmutableValue { is_union: bool },
    /// Opaque native data: header, flag word, raw body of the given
    /// C-expression size. Field values never cross the boundary.
    Opaque { body_size: String },
    /// The built-in string representation.
    BuiltinString,
    PrimitiveArray(PrimKind),
    ReferenceArray { component: JavaType },
}

impl TypeKind {
    pub fn is_array(&self) -> bool {
        matches!(self, TypeKind::PrimitiveArray(_) | TypeKind::ReferenceArray { .. })
    }

    /// True for kinds whose wire encoding is delegated to a custom
    /// serializer rather than the generic record walk.
    pub fn has_custom_serializer(&self) -> bool {
        matches!(
            self,
            TypeKind::BuiltinString | TypeKind::ImmutableValue { .. } | TypeKind::Opaque { .. }
        )
    }
}

/// The registry's record of one type.
#[derive(Debug)]
pub struct TypeDescriptor {
    pub(crate) ty: JavaType,
    pub(crate) type_id: u32,
    pub(crate) kind: TypeKind,
    /// All non-static fields, superclass fields first.
    pub(crate) fields: Vec<FieldDef>,
    /// Object type name for class kinds (`struct Point_3`), reference
    /// type name for array kinds (`struct Point_3**`, `int*`).
    pub(crate) type_name: String,
    pub(crate) has_instances: bool,
    pub(crate) subtypes: Vec<DescriptorId>,
}

impl TypeDescriptor {
    pub fn ty(&self) -> &JavaType {
        &self.ty
    }

    /// The type id. For class kinds this is the full record id; for
    /// array kinds it is the kind byte that occupies the upper 8 bits of
    /// the 24-bit id space.
    pub fn type_id(&self) -> u32 {
        self.type_id
    }

    pub fn kind(&self) -> &TypeKind {
        &self.kind
    }

    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    pub fn has_instances(&self) -> bool {
        self.has_instances
    }

    pub fn subtypes(&self) -> &[DescriptorId] {
        &self.subtypes
    }

    /// The C type of a reference to this type.
    pub fn reference_type(&self) -> String {
        match &self.kind {
            TypeKind::Record | TypeKind::Opaque { .. } | TypeKind::BuiltinString => {
                format!("{}*", self.type_name)
            }
            // Immutables are embedded by value; a "reference" is the
            // struct itself.
            TypeKind::ImmutableValue { .. } => self.type_name.clone(),
            TypeKind::PrimitiveArray(_) | TypeKind::ReferenceArray { .. } => {
                self.type_name.clone()
            }
        }
    }

    /// The C type of the object itself. For arrays this is the
    /// component type.
    pub fn object_type(&self) -> String {
        if self.kind.is_array() {
            self.type_name[..self.type_name.len() - 1].to_string()
        } else {
            self.type_name.clone()
        }
    }

    /// The full 32-bit header word for an instance of this type.
    pub fn header_word(&self, flags: HeaderFlags) -> u32 {
        if self.kind.is_array() {
            self.type_id << 24
        } else {
            header::header_word(self.type_id, flags)
        }
    }

    /// C member name of the `index`-th field.
    pub fn field_member(&self, index: usize) -> String {
        format!("{}_{}", normalized(&self.fields[index].name), index)
    }

    /// Member name of this type's slot inside an immutable-interface
    /// union.
    pub fn union_member(&self) -> String {
        format!("t{}", self.type_id)
    }

    /// Renders the C definition of this type. Arrays have none.
    pub fn definition_code(&self, registry: &TypeRegistry) -> String {
        match &self.kind {
            // An interface-typed immutable is a union over the object
            // types of its registered implementors.
            TypeKind::ImmutableValue { is_union: true } => {
                let mut out = String::new();
                out.push_str(&self.type_name);
                out.push_str(" {\n ");
                out.push_str(header::HEADER_DECL);
                out.push('\n');
                for &sub in &self.subtypes {
                    let t = registry.get(sub);
                    out.push_str("  ");
                    out.push_str(&t.object_type());
                    out.push(' ');
                    out.push_str(&t.union_member());
                    out.push_str(";\n");
                }
                out.push_str("};\n");
                out
            }
            TypeKind::Record | TypeKind::ImmutableValue { .. } => {
                let mut out = String::new();
                out.push_str(&self.type_name);
                out.push_str(" {");
                out.push_str(header::HEADER_DECL);
                for (i, field) in self.fields.iter().enumerate() {
                    let ty = registry
                        .type_name(&field.ty, true)
                        .unwrap_or_else(|_| "void*".to_string());
                    out.push_str(&ty);
                    out.push(' ');
                    out.push_str(&self.field_member(i));
                    out.push_str("; ");
                }
                out.push_str("};\n");
                out
            }
            TypeKind::Opaque { body_size } => {
                format!(
                    "{} {{{}int flag; double body[(({}) + sizeof(double) - 1) / sizeof(double)]; }};\n",
                    self.type_name,
                    header::HEADER_DECL,
                    body_size
                )
            }
            TypeKind::BuiltinString => format!(
                "{} {{{}int length; char body[1]; }};\n",
                self.type_name,
                header::HEADER_DECL
            ),
            TypeKind::PrimitiveArray(_) | TypeKind::ReferenceArray { .. } => String::new(),
        }
    }
}

/// `$` in nested-class names is not a valid C identifier character.
pub(crate) fn normalized(name: &str) -> String {
    name.replace('$', "_")
}
