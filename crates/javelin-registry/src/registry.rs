//! The type registry.
//!
//! The registry assigns every reference type a numeric id and a
//! [`TypeDescriptor`], on demand and exactly once. Record ids count up
//! from [`header::FIRST_RECORD_ID`]; reference-array kinds draw from the
//! separate byte range `0x01..=0xef`; primitive-array kinds are the
//! fixed bytes `0xf0..=0xf7`. `java.lang.String` and `java.lang.Object`
//! are built in and registered at construction.
//!
//! Registration is idempotent: a second request for the same
//! [`JavaType`] returns the existing descriptor id without touching the
//! counters.

use log::debug;
use rustc_hash::FxHashMap;

use javelin_core::error::RegistryError;
use javelin_core::header;
use javelin_core::provider::{ClassShape, TypeProvider};
use javelin_core::types::{FieldDef, JavaType, QualifiedName};

use crate::descriptor::{normalized, DescriptorId, TypeDescriptor, TypeKind};
use crate::order::DependencyOrderer;

/// Id and layout assignment for every type in one compilation unit.
#[derive(Debug)]
pub struct TypeRegistry {
    descriptors: Vec<TypeDescriptor>,
    index: FxHashMap<JavaType, DescriptorId>,
    /// Class-kind descriptors by their record type id. Array kinds live
    /// in a different id space and are not included.
    by_type_id: FxHashMap<u32, DescriptorId>,
    next_record_id: u32,
    next_array_kind: u32,
    instantiated: usize,
    orderer: DependencyOrderer,
}

impl TypeRegistry {
    pub fn new() -> Self {
        let mut reg = TypeRegistry {
            descriptors: Vec::new(),
            index: FxHashMap::default(),
            by_type_id: FxHashMap::default(),
            next_record_id: header::FIRST_RECORD_ID,
            next_array_kind: header::FIRST_ARRAY_KIND,
            instantiated: 0,
            orderer: DependencyOrderer::new(),
        };
        reg.insert(TypeDescriptor {
            ty: JavaType::string(),
            type_id: header::STRING_TYPE_ID,
            kind: TypeKind::BuiltinString,
            fields: Vec::new(),
            type_name: "struct java_string".to_string(),
            has_instances: false,
            subtypes: Vec::new(),
        });
        let object_id = reg.next_record_id;
        reg.next_record_id += 1;
        reg.insert(TypeDescriptor {
            ty: JavaType::class(QualifiedName::OBJECT),
            type_id: object_id,
            kind: TypeKind::Record,
            fields: Vec::new(),
            type_name: "struct java_object".to_string(),
            has_instances: false,
            subtypes: Vec::new(),
        });
        reg
    }

    /// Registers `ty` and everything its descriptor depends on, and
    /// returns its descriptor id. Idempotent.
    pub fn register(
        &mut self,
        ty: &JavaType,
        provider: &dyn TypeProvider,
    ) -> Result<DescriptorId, RegistryError> {
        if ty.is_primitive() {
            return Err(RegistryError::PrimitiveType(ty.clone()));
        }
        if let Some(&id) = self.index.get(ty) {
            return Ok(id);
        }
        match ty {
            JavaType::Prim(_) => unreachable!("handled above"),
            JavaType::PrimArray(k) => Ok(self.insert(TypeDescriptor {
                ty: ty.clone(),
                type_id: u32::from(k.array_type_id()),
                kind: TypeKind::PrimitiveArray(*k),
                fields: Vec::new(),
                type_name: format!("{}*", k.c_name()),
                has_instances: false,
                subtypes: Vec::new(),
            })),
            JavaType::RefArray(component) => {
                let comp = self.register(component, provider)?;
                let kind_id = self.register_array_kind()?;
                let type_name = format!("{}*", self.get(comp).reference_type());
                Ok(self.insert(TypeDescriptor {
                    ty: ty.clone(),
                    type_id: kind_id,
                    kind: TypeKind::ReferenceArray { component: (**component).clone() },
                    fields: Vec::new(),
                    type_name,
                    has_instances: false,
                    subtypes: Vec::new(),
                }))
            }
            JavaType::Class(name) => self.register_class(name, provider),
        }
    }

    fn register_class(
        &mut self,
        name: &QualifiedName,
        provider: &dyn TypeProvider,
    ) -> Result<DescriptorId, RegistryError> {
        let info = provider
            .class_info(name)
            .ok_or_else(|| RegistryError::TypeNotFound(JavaType::Class(name.clone())))?;

        let (kind, keyword) = match &info.shape {
            ClassShape::Record => (TypeKind::Record, "struct"),
            ClassShape::ImmutableValue => {
                match &info.superclass {
                    Some(sup) if sup.is_object() => {}
                    _ => return Err(RegistryError::BadImmutableSuperclass(name.clone())),
                }
                let keyword = if info.is_interface { "union" } else { "struct" };
                (TypeKind::ImmutableValue { is_union: info.is_interface }, keyword)
            }
            ClassShape::Opaque { body_size } => {
                (TypeKind::Opaque { body_size: body_size.clone() }, "struct")
            }
        };

        // record ids share the 16-bit wire slot with the object-id bit
        if self.next_record_id > header::LAST_RECORD_ID {
            return Err(RegistryError::RecordIdSpaceExhausted);
        }
        let type_id = self.next_record_id;
        self.next_record_id += 1;
        let type_name = if name.is_object() {
            "struct java_object".to_string()
        } else {
            format!("{} {}_{}", keyword, normalized(name.simple_name()), type_id)
        };
        let fields = collect_fields(provider, name)?;
        let id = self.insert(TypeDescriptor {
            ty: JavaType::Class(name.clone()),
            type_id,
            kind,
            fields,
            type_name,
            has_instances: false,
            subtypes: Vec::new(),
        });

        // Supertype links give interface unions their member list and
        // record the subtype back-edges.
        if let Some(sup) = &info.superclass {
            let sup_id = self.register(&JavaType::Class(sup.clone()), provider)?;
            self.descriptors[sup_id.index()].subtypes.push(id);
        }
        for itf in &info.interfaces {
            let itf_id = self.register(&JavaType::Class(itf.clone()), provider)?;
            self.descriptors[itf_id.index()].subtypes.push(id);
            // An interface union embeds its implementors by value, so
            // each implementor is defined first.
            if matches!(self.descriptors[id.index()].kind, TypeKind::ImmutableValue { .. }) {
                self.orderer.require(itf_id, id);
            }
        }

        self.record_embedding_edges(id);
        Ok(id)
    }

    /// Records definition-order constraints around a freshly registered
    /// class. Embedded-by-value field types must be defined before the
    /// struct that embeds them; both directions are scanned so the
    /// constraint holds no matter which side registers first.
    fn record_embedding_edges(&mut self, id: DescriptorId) {
        let mut edges: Vec<(DescriptorId, DescriptorId)> = Vec::new();
        {
            let desc = &self.descriptors[id.index()];
            for field in &desc.fields {
                if let Some(&fid) = self.index.get(&field.ty) {
                    if matches!(
                        self.descriptors[fid.index()].kind,
                        TypeKind::ImmutableValue { .. }
                    ) && fid != id
                    {
                        edges.push((id, fid));
                    }
                }
            }
            if matches!(desc.kind, TypeKind::ImmutableValue { .. }) {
                let ty = desc.ty.clone();
                for (i, other) in self.descriptors.iter().enumerate() {
                    let oid = DescriptorId(i as u32);
                    if oid == id {
                        continue;
                    }
                    if matches!(other.kind, TypeKind::Record | TypeKind::ImmutableValue { .. })
                        && other.fields.iter().any(|f| f.ty == ty)
                    {
                        edges.push((oid, id));
                    }
                }
            }
        }
        for (producer, dependency) in edges {
            self.orderer.require(producer, dependency);
        }
    }

    /// Allocates the next reference-array kind id. The byte range
    /// `0x01..=0xef` is a hard limit; running past it is fatal.
    pub fn register_array_kind(&mut self) -> Result<u32, RegistryError> {
        if self.next_array_kind > header::LAST_ARRAY_KIND {
            return Err(RegistryError::ArrayIdSpaceExhausted);
        }
        let id = self.next_array_kind;
        self.next_array_kind += 1;
        Ok(id)
    }

    fn insert(&mut self, desc: TypeDescriptor) -> DescriptorId {
        let id = DescriptorId(self.descriptors.len() as u32);
        debug!("registered {} as type id 0x{:x}", desc.ty, desc.type_id);
        self.index.insert(desc.ty.clone(), id);
        if !desc.kind.is_array() {
            self.by_type_id.insert(desc.type_id, id);
        }
        self.descriptors.push(desc);
        self.orderer.discover(id);
        id
    }

    /// The descriptor id of `ty`, if it has been registered.
    pub fn lookup(&self, ty: &JavaType) -> Option<DescriptorId> {
        self.index.get(ty).copied()
    }

    pub fn get(&self, id: DescriptorId) -> &TypeDescriptor {
        &self.descriptors[id.index()]
    }

    /// Resolves a record type id back to its descriptor. Array kinds
    /// are not resolvable this way.
    pub fn descriptor_by_type_id(&self, type_id: u32) -> Option<DescriptorId> {
        self.by_type_id.get(&type_id).copied()
    }

    /// Notes that instances of `id` appear in the output.
    pub fn mark_instantiated(&mut self, id: DescriptorId) {
        let desc = &mut self.descriptors[id.index()];
        if !desc.has_instances {
            desc.has_instances = true;
            self.instantiated += 1;
        }
    }

    /// Number of distinct types marked as instantiated.
    pub fn instantiated_types(&self) -> usize {
        self.instantiated
    }

    /// Every registered descriptor, ordered so that a type embedded by
    /// value in another is positioned before it.
    pub fn sorted_types(&self) -> Vec<DescriptorId> {
        self.orderer.order()
    }

    /// Renders the struct and union definitions of all registered types
    /// in dependency order.
    pub fn definitions(&self) -> String {
        let mut out = String::new();
        for id in self.sorted_types() {
            out.push_str(&self.get(id).definition_code(self));
        }
        out
    }

    /// The C type name usable for casts and declarations. With
    /// `use_void`, unregistered reference types fall back to `void*`.
    pub fn type_name(&self, ty: &JavaType, use_void: bool) -> Result<String, RegistryError> {
        if let JavaType::Prim(k) = ty {
            return Ok(k.c_name().to_string());
        }
        match self.lookup(ty) {
            Some(id) => Ok(self.get(id).reference_type()),
            None if use_void => Ok("void*".to_string()),
            None => Err(RegistryError::TypeNotFound(ty.clone())),
        }
    }

    /// The C type of the object itself (the struct, or an array's
    /// component type).
    pub fn object_type_name(&self, ty: &JavaType) -> Result<String, RegistryError> {
        if let JavaType::Prim(k) = ty {
            return Ok(k.c_name().to_string());
        }
        let id = self
            .lookup(ty)
            .ok_or_else(|| RegistryError::TypeNotFound(ty.clone()))?;
        Ok(self.get(id).object_type())
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        TypeRegistry::new()
    }
}

/// All non-static fields of `name`, superclass fields first.
fn collect_fields(
    provider: &dyn TypeProvider,
    name: &QualifiedName,
) -> Result<Vec<FieldDef>, RegistryError> {
    let mut out = Vec::new();
    walk_fields(provider, name, &mut out)?;
    Ok(out)
}

fn walk_fields(
    provider: &dyn TypeProvider,
    name: &QualifiedName,
    out: &mut Vec<FieldDef>,
) -> Result<(), RegistryError> {
    let info = provider
        .class_info(name)
        .ok_or_else(|| RegistryError::TypeNotFound(JavaType::Class(name.clone())))?;
    if let Some(sup) = &info.superclass {
        walk_fields(provider, sup, out)?;
    }
    out.extend(info.fields.iter().cloned());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use javelin_core::header::HeaderFlags;
    use javelin_core::provider::ClassPool;
    use javelin_core::types::PrimKind;

    #[test]
    fn builtins_are_preregistered() {
        let reg = TypeRegistry::new();
        let s = reg.lookup(&JavaType::string()).unwrap();
        assert_eq!(reg.get(s).type_id(), header::STRING_TYPE_ID);
        assert_eq!(reg.get(s).reference_type(), "struct java_string*");
        let o = reg.lookup(&JavaType::class(QualifiedName::OBJECT)).unwrap();
        assert_eq!(reg.get(o).type_id(), header::FIRST_RECORD_ID);
        assert_eq!(reg.get(o).object_type(), "struct java_object");
    }

    #[test]
    fn registration_is_idempotent() {
        let mut pool = ClassPool::new();
        pool.record("Point", vec![
            FieldDef::new("x", JavaType::Prim(PrimKind::Int)),
            FieldDef::new("y", JavaType::Prim(PrimKind::Int)),
        ]);
        let mut reg = TypeRegistry::new();
        let ty = JavaType::class("Point");
        let a = reg.register(&ty, &pool).unwrap();
        let b = reg.register(&ty, &pool).unwrap();
        assert_eq!(a, b);
        assert_eq!(reg.get(a).type_id(), header::FIRST_RECORD_ID + 1);
    }

    #[test]
    fn struct_names_carry_simple_name_and_id() {
        let mut pool = ClassPool::new();
        pool.record("com.example.Outer$Inner", vec![]);
        let mut reg = TypeRegistry::new();
        let id = reg.register(&JavaType::class("com.example.Outer$Inner"), &pool).unwrap();
        assert_eq!(reg.get(id).object_type(), "struct Outer_Inner_4");
        assert_eq!(reg.get(id).reference_type(), "struct Outer_Inner_4*");
    }

    #[test]
    fn inherited_fields_come_first() {
        let mut pool = ClassPool::new();
        pool.record("Base", vec![FieldDef::new("a", JavaType::Prim(PrimKind::Int))]);
        pool.subclass("Derived", "Base", vec![
            FieldDef::new("b", JavaType::Prim(PrimKind::Long)),
        ]);
        let mut reg = TypeRegistry::new();
        let id = reg.register(&JavaType::class("Derived"), &pool).unwrap();
        let fields = reg.get(id).fields();
        assert_eq!(fields.len(), 2);
        assert_eq!(fields[0].name, "a");
        assert_eq!(fields[1].name, "b");
        // superclass registered and linked back
        let base = reg.lookup(&JavaType::class("Base")).unwrap();
        assert_eq!(reg.get(base).subtypes(), &[id]);
    }

    #[test]
    fn primitive_types_have_no_descriptor() {
        let mut reg = TypeRegistry::new();
        let pool = ClassPool::new();
        let err = reg.register(&JavaType::Prim(PrimKind::Int), &pool).unwrap_err();
        assert!(matches!(err, RegistryError::PrimitiveType(_)));
    }

    #[test]
    fn primitive_arrays_use_fixed_ids() {
        let mut reg = TypeRegistry::new();
        let pool = ClassPool::new();
        let id = reg.register(&JavaType::PrimArray(PrimKind::Int), &pool).unwrap();
        assert_eq!(reg.get(id).type_id(), 0xf4);
        assert_eq!(reg.get(id).reference_type(), "int*");
        assert_eq!(reg.get(id).object_type(), "int");
        assert_eq!(reg.get(id).header_word(HeaderFlags::empty()), 0xf4 << 24);
    }

    #[test]
    fn reference_arrays_allocate_kind_ids_in_order() {
        let mut pool = ClassPool::new();
        pool.record("Point", vec![]);
        let mut reg = TypeRegistry::new();
        let a = reg.register(&JavaType::ref_array(JavaType::class("Point")), &pool).unwrap();
        let b = reg
            .register(&JavaType::ref_array(JavaType::string()), &pool)
            .unwrap();
        assert_eq!(reg.get(a).type_id(), 0x01);
        assert_eq!(reg.get(b).type_id(), 0x02);
        assert_eq!(reg.get(a).reference_type(), "struct Point_4**");
        assert_eq!(reg.get(b).reference_type(), "struct java_string**");
    }

    #[test]
    fn array_kind_space_is_bounded() {
        let mut pool = ClassPool::new();
        let mut reg = TypeRegistry::new();
        // 0x01..=0xef succeed, the next allocation fails.
        for i in 0..0xef {
            let name = format!("C{i}");
            pool.record(&name, vec![]);
            reg.register(&JavaType::ref_array(JavaType::class(&name)), &pool)
                .unwrap();
        }
        pool.record("Overflow", vec![]);
        let err = reg
            .register(&JavaType::ref_array(JavaType::class("Overflow")), &pool)
            .unwrap_err();
        assert!(matches!(err, RegistryError::ArrayIdSpaceExhausted));
    }

    #[test]
    fn record_id_space_is_bounded() {
        let mut pool = ClassPool::new();
        pool.record("Last", vec![]);
        pool.record("Overflow", vec![]);
        let mut reg = TypeRegistry::new();
        // jump to the end of the id range instead of burning 32k ids
        reg.next_record_id = header::LAST_RECORD_ID;
        let last = reg.register(&JavaType::class("Last"), &pool).unwrap();
        assert_eq!(reg.get(last).type_id(), header::LAST_RECORD_ID);
        let err = reg.register(&JavaType::class("Overflow"), &pool).unwrap_err();
        assert!(matches!(err, RegistryError::RecordIdSpaceExhausted));
    }

    #[test]
    fn record_ids_resolve_back_but_array_kinds_do_not() {
        let mut pool = ClassPool::new();
        pool.record("Point", vec![]);
        let mut reg = TypeRegistry::new();
        let id = reg.register(&JavaType::class("Point"), &pool).unwrap();
        let tid = reg.get(id).type_id();
        assert_eq!(reg.descriptor_by_type_id(tid), Some(id));
        reg.register(&JavaType::ref_array(JavaType::class("Point")), &pool).unwrap();
        // array kind 0x01 must not shadow the custom-serializer marker
        assert_eq!(reg.descriptor_by_type_id(0x01), None);
    }

    #[test]
    fn immutable_requires_object_superclass() {
        let mut pool = ClassPool::new();
        pool.record("Base", vec![]);
        pool.immutable("Vec", vec![FieldDef::new("x", JavaType::Prim(PrimKind::Float))]);
        pool.define("BadVec", {
            let mut info = javelin_core::provider::ClassInfo::record(Some("Base"), vec![]);
            info.shape = ClassShape::ImmutableValue;
            info
        });
        let mut reg = TypeRegistry::new();
        assert!(reg.register(&JavaType::class("Vec"), &pool).is_ok());
        let err = reg.register(&JavaType::class("BadVec"), &pool).unwrap_err();
        assert!(matches!(err, RegistryError::BadImmutableSuperclass(_)));
    }

    #[test]
    fn embedded_immutables_are_defined_first() {
        let mut pool = ClassPool::new();
        pool.immutable("Vec", vec![FieldDef::new("x", JavaType::Prim(PrimKind::Float))]);
        pool.record("Body", vec![FieldDef::new("pos", JavaType::class("Vec"))]);
        let mut reg = TypeRegistry::new();
        // embedder first: the edge must still come out right
        let body = reg.register(&JavaType::class("Body"), &pool).unwrap();
        let vec = reg.register(&JavaType::class("Vec"), &pool).unwrap();
        let order = reg.sorted_types();
        let pos = |id| order.iter().position(|&x| x == id).unwrap();
        assert!(pos(vec) < pos(body));
    }

    #[test]
    fn immutable_interface_renders_as_union_of_implementors() {
        let mut pool = ClassPool::new();
        pool.define("Shape", javelin_core::provider::ClassInfo {
            superclass: Some(QualifiedName::new(QualifiedName::OBJECT)),
            interfaces: Vec::new(),
            fields: Vec::new(),
            shape: ClassShape::ImmutableValue,
            is_interface: true,
        });
        pool.immutable("Circle", vec![FieldDef::new("r", JavaType::Prim(PrimKind::Double))]);
        pool.add_interface("Circle", "Shape");
        let mut reg = TypeRegistry::new();
        let circle = reg.register(&JavaType::class("Circle"), &pool).unwrap();
        let shape = reg.lookup(&JavaType::class("Shape")).unwrap();
        let circle_id = reg.get(circle).type_id();
        let code = reg.get(shape).definition_code(&reg);
        assert!(code.starts_with(&format!("union Shape_{}", reg.get(shape).type_id())));
        assert!(code.contains(&format!("struct Circle_{circle_id} t{circle_id};\n")));
        // the union depends on its member struct
        let order = reg.sorted_types();
        let pos = |id| order.iter().position(|&x| x == id).unwrap();
        assert!(pos(circle) < pos(shape));
    }

    #[test]
    fn definition_code_of_a_record() {
        let mut pool = ClassPool::new();
        pool.record("Point", vec![
            FieldDef::new("x", JavaType::Prim(PrimKind::Int)),
            FieldDef::new("next", JavaType::class("Point")),
        ]);
        let mut reg = TypeRegistry::new();
        let id = reg.register(&JavaType::class("Point"), &pool).unwrap();
        assert_eq!(
            reg.get(id).definition_code(&reg),
            "struct Point_4 { int header_; int x_0; struct Point_4* next_1; };\n"
        );
    }

    #[test]
    fn unregistered_field_types_render_as_void_pointer() {
        let mut pool = ClassPool::new();
        pool.record("Holder", vec![FieldDef::new("data", JavaType::class("Unseen"))]);
        let mut reg = TypeRegistry::new();
        let id = reg.register(&JavaType::class("Holder"), &pool).unwrap();
        let code = reg.get(id).definition_code(&reg);
        assert!(code.contains("void* data_0; "));
        assert!(matches!(
            reg.type_name(&JavaType::class("Unseen"), false),
            Err(RegistryError::TypeNotFound(_))
        ));
    }

    #[test]
    fn instantiated_marking_counts_each_type_once() {
        let mut pool = ClassPool::new();
        pool.record("Point", vec![]);
        let mut reg = TypeRegistry::new();
        let id = reg.register(&JavaType::class("Point"), &pool).unwrap();
        reg.mark_instantiated(id);
        reg.mark_instantiated(id);
        assert_eq!(reg.instantiated_types(), 1);
        assert!(reg.get(id).has_instances());
    }
}
