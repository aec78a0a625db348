//! The live heap-object model.
//!
//! Flattening walks a graph of objects that may alias each other and may
//! be cyclic. [`ObjRef`] is a shared handle; two handles to the same heap
//! cell compare equal by *identity* ([`ObjRef::ident`]), never by
//! structure. Interior mutability is what lets a graph be wired into a
//! cycle after construction, and what lets the decoder fill fields of an
//! object that is already registered in its id table.

use std::cell::{Ref, RefCell, RefMut};
use std::rc::Rc;

use crate::types::{JavaType, PrimKind, QualifiedName};

/// A scalar or reference value held in a field or array slot.
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Byte(i8),
    Char(u16),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Ref(ObjRef),
}

impl Value {
    pub fn record(class: &str, fields: Vec<Value>) -> Value {
        Value::Ref(ObjRef::new(ObjectBody::Record {
            class: QualifiedName::new(class),
            fields,
        }))
    }

    pub fn string(s: &str) -> Value {
        Value::Ref(ObjRef::new(ObjectBody::Str(s.to_string())))
    }

    pub fn prim_array(arr: PrimArray) -> Value {
        Value::Ref(ObjRef::new(ObjectBody::PrimArray(arr)))
    }

    pub fn int_array(elems: Vec<i32>) -> Value {
        Value::prim_array(PrimArray::Int(elems))
    }

    pub fn ref_array(component: JavaType, elems: Vec<Value>) -> Value {
        Value::Ref(ObjRef::new(ObjectBody::RefArray { component, elems }))
    }

    pub fn is_primitive(&self) -> bool {
        !matches!(self, Value::Null | Value::Ref(_))
    }

    pub fn as_ref(&self) -> Option<&ObjRef> {
        match self {
            Value::Ref(obj) => Some(obj),
            _ => None,
        }
    }
}

/// Identity of a heap object: the address of its shared cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectIdent(usize);

/// Shared handle to a heap object. Cloning aliases, never copies.
#[derive(Debug, Clone)]
pub struct ObjRef(Rc<RefCell<ObjectBody>>);

impl ObjRef {
    pub fn new(body: ObjectBody) -> Self {
        ObjRef(Rc::new(RefCell::new(body)))
    }

    /// Pointer identity of the heap cell. This is the key the identity
    /// tracker uses; structural equality plays no part.
    pub fn ident(&self) -> ObjectIdent {
        ObjectIdent(Rc::as_ptr(&self.0) as usize)
    }

    pub fn same_identity(&self, other: &ObjRef) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn body(&self) -> Ref<'_, ObjectBody> {
        self.0.borrow()
    }

    pub fn body_mut(&self) -> RefMut<'_, ObjectBody> {
        self.0.borrow_mut()
    }

    /// The runtime type of the object this handle points at.
    pub fn runtime_type(&self) -> JavaType {
        match &*self.body() {
            ObjectBody::Record { class, .. } => JavaType::Class(class.clone()),
            ObjectBody::PrimArray(arr) => JavaType::PrimArray(arr.kind()),
            ObjectBody::RefArray { component, .. } => {
                JavaType::RefArray(Box::new(component.clone()))
            }
            ObjectBody::Str(_) => JavaType::string(),
        }
    }

    /// Replaces one field of a record or one slot of a reference array.
    /// Used to wire cycles and by the wire decoder while the object is
    /// still being reconstructed. Returns `false` when the body has no
    /// such slot, leaving the object untouched.
    pub fn set_field(&self, index: usize, value: Value) -> bool {
        let slot = match &mut *self.body_mut() {
            ObjectBody::Record { fields, .. } => fields.get_mut(index).map(|s| *s = value),
            ObjectBody::RefArray { elems, .. } => elems.get_mut(index).map(|s| *s = value),
            _ => None,
        };
        slot.is_some()
    }
}

/// The heap cell behind an [`ObjRef`].
#[derive(Debug)]
pub enum ObjectBody {
    /// An ordinary instance: class plus one value per field, in the
    /// registry's field order (inherited fields first).
    Record {
        class: QualifiedName,
        fields: Vec<Value>,
    },
    PrimArray(PrimArray),
    RefArray {
        component: JavaType,
        elems: Vec<Value>,
    },
    Str(String),
}

/// A primitive array, one variant per component kind.
#[derive(Debug, Clone, PartialEq)]
pub enum PrimArray {
    Bool(Vec<bool>),
    Byte(Vec<i8>),
    Char(Vec<u16>),
    Short(Vec<i16>),
    Int(Vec<i32>),
    Long(Vec<i64>),
    Float(Vec<f32>),
    Double(Vec<f64>),
}

impl PrimArray {
    pub fn kind(&self) -> PrimKind {
        match self {
            PrimArray::Bool(_) => PrimKind::Bool,
            PrimArray::Byte(_) => PrimKind::Byte,
            PrimArray::Char(_) => PrimKind::Char,
            PrimArray::Short(_) => PrimKind::Short,
            PrimArray::Int(_) => PrimKind::Int,
            PrimArray::Long(_) => PrimKind::Long,
            PrimArray::Float(_) => PrimKind::Float,
            PrimArray::Double(_) => PrimKind::Double,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            PrimArray::Bool(v) => v.len(),
            PrimArray::Byte(v) => v.len(),
            PrimArray::Char(v) => v.len(),
            PrimArray::Short(v) => v.len(),
            PrimArray::Int(v) => v.len(),
            PrimArray::Long(v) => v.len(),
            PrimArray::Float(v) => v.len(),
            PrimArray::Double(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
