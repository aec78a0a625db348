//! Type-metadata provider interface.
//!
//! The registry never inspects bytecode itself; a provider hands it, for
//! any class name, the declared non-static fields (declaration order),
//! the direct superclass and interfaces, and the representation shape.
//! [`ClassPool`] is the in-memory implementation used by drivers and
//! tests.

use rustc_hash::FxHashMap;

use crate::types::{FieldDef, QualifiedName};

/// How a class is represented in the target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassShape {
    /// Heap record: struct with a header word, referenced by pointer.
    Record,
    /// Flattened immutable value: struct (union for interfaces) embedded
    /// by value wherever it appears.
    ImmutableValue,
    /// Opaque native data: header, flag word, and a raw body whose size
    /// is the given C expression.
    Opaque { body_size: String },
}

/// Everything the registry needs to know about one class.
#[derive(Debug, Clone)]
pub struct ClassInfo {
    pub superclass: Option<QualifiedName>,
    pub interfaces: Vec<QualifiedName>,
    /// Declared non-static fields, in declaration order. Inherited
    /// fields are *not* included; the registry walks the superclass
    /// chain itself.
    pub fields: Vec<FieldDef>,
    pub shape: ClassShape,
    pub is_interface: bool,
}

impl ClassInfo {
    pub fn record(superclass: Option<&str>, fields: Vec<FieldDef>) -> Self {
        ClassInfo {
            superclass: superclass.map(QualifiedName::new),
            interfaces: Vec::new(),
            fields,
            shape: ClassShape::Record,
            is_interface: false,
        }
    }
}

/// Read access to class metadata.
pub trait TypeProvider {
    fn class_info(&self, name: &QualifiedName) -> Option<&ClassInfo>;
}

/// In-memory class table.
///
/// `java.lang.Object` is predefined; every class added through the
/// convenience methods defaults to it as superclass.
#[derive(Debug, Default)]
pub struct ClassPool {
    classes: FxHashMap<QualifiedName, ClassInfo>,
}

impl ClassPool {
    pub fn new() -> Self {
        let mut pool = ClassPool { classes: FxHashMap::default() };
        pool.classes.insert(
            QualifiedName::new(QualifiedName::OBJECT),
            ClassInfo::record(None, Vec::new()),
        );
        pool
    }

    pub fn define(&mut self, name: &str, info: ClassInfo) -> QualifiedName {
        let name = QualifiedName::new(name);
        self.classes.insert(name.clone(), info);
        name
    }

    /// Defines an ordinary class extending `java.lang.Object`.
    pub fn record(&mut self, name: &str, fields: Vec<FieldDef>) -> QualifiedName {
        self.define(name, ClassInfo::record(Some(QualifiedName::OBJECT), fields))
    }

    pub fn subclass(
        &mut self,
        name: &str,
        superclass: &str,
        fields: Vec<FieldDef>,
    ) -> QualifiedName {
        self.define(name, ClassInfo::record(Some(superclass), fields))
    }

    pub fn immutable(&mut self, name: &str, fields: Vec<FieldDef>) -> QualifiedName {
        self.define(
            name,
            ClassInfo {
                superclass: Some(QualifiedName::new(QualifiedName::OBJECT)),
                interfaces: Vec::new(),
                fields,
                shape: ClassShape::ImmutableValue,
                is_interface: false,
            },
        )
    }

    pub fn opaque(&mut self, name: &str, body_size: &str) -> QualifiedName {
        self.define(
            name,
            ClassInfo {
                superclass: Some(QualifiedName::new(QualifiedName::OBJECT)),
                interfaces: Vec::new(),
                fields: Vec::new(),
                shape: ClassShape::Opaque { body_size: body_size.to_string() },
                is_interface: false,
            },
        )
    }

    pub fn add_interface(&mut self, class: &str, interface: &str) {
        let key = QualifiedName::new(class);
        if let Some(info) = self.classes.get_mut(&key) {
            info.interfaces.push(QualifiedName::new(interface));
        }
    }
}

impl TypeProvider for ClassPool {
    fn class_info(&self, name: &QualifiedName) -> Option<&ClassInfo> {
        self.classes.get(name)
    }
}
