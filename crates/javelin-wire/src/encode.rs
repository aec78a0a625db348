//! Binary graph encoding.
//!
//! The stream opens with a 16-bit object count, then the depth-first
//! encoding of the root. Each object is assigned its id *before* its
//! fields are encoded, so aliasing and cycles become 3-byte
//! back-references (`HEAD` plus the id with [`header::OBJECT_ID_BIT`]
//! set). A record is `HEAD`, its 16-bit type id, a 16-bit size in
//! 32-bit words, then one tagged entry per field; the size follows the
//! receiver's layout rule: one word of header, one word per int-sized
//! scalar, two words for long/double/references, plus one padding word
//! when a two-word entry would start at an odd offset.
//!
//! Only int, long, float and double survive as scalars, and only their
//! array types as arrays. Everything else (object arrays, short fields,
//! strings, custom-serialized kinds) is rejected.

use log::trace;

use javelin_core::error::WireError;
use javelin_core::header;
use javelin_core::identity::IdentityTracker;
use javelin_core::provider::TypeProvider;
use javelin_core::types::{FieldDef, JavaType, PrimKind, QualifiedName};
use javelin_core::value::{ObjRef, ObjectBody, PrimArray, Value};
use javelin_registry::TypeRegistry;

use crate::bytes::ByteWriter;
use crate::tags::WireTag;

/// One encoding session: a shared id space and one output stream.
pub struct BinaryEncoder<'a> {
    registry: &'a mut TypeRegistry,
    provider: &'a dyn TypeProvider,
    body: ByteWriter,
    ids: IdentityTracker<u16>,
    counter: u16,
    little_endian: bool,
}

impl<'a> BinaryEncoder<'a> {
    pub fn new(
        registry: &'a mut TypeRegistry,
        provider: &'a dyn TypeProvider,
        little_endian: bool,
    ) -> Self {
        BinaryEncoder {
            registry,
            provider,
            body: ByteWriter::new(little_endian),
            ids: IdentityTracker::new(),
            counter: 0,
            little_endian,
        }
    }

    /// Encodes one root. May be called repeatedly; all roots share the
    /// session's id space and envelope count.
    pub fn encode(&mut self, root: &Value) -> Result<(), WireError> {
        match root {
            Value::Null => {
                self.write_null();
                Ok(())
            }
            Value::Ref(obj) => self.encode_object(obj),
            scalar => Err(WireError::Unsupported(scalar_type(scalar))),
        }
    }

    /// The finished stream: envelope count word plus the encoded body.
    pub fn finish(self) -> Vec<u8> {
        let mut out = ByteWriter::new(self.little_endian);
        out.write_u16(self.counter);
        out.extend(&self.body.into_bytes());
        out.into_bytes()
    }

    fn write_null(&mut self) {
        self.body.write_u8(header::HEAD);
        self.body.write_u16(header::NULL_ID);
    }

    fn encode_object(&mut self, obj: &ObjRef) -> Result<(), WireError> {
        if let Some(&id) = self.ids.get(obj) {
            self.body.write_u8(header::HEAD);
            self.body.write_u16(id | header::OBJECT_ID_BIT);
            return Ok(());
        }
        if self.counter >= header::OBJECT_ID_BIT {
            return Err(WireError::TooManyObjects);
        }
        self.ids.insert(obj, self.counter);
        self.counter += 1;

        let body = obj.body();
        match &*body {
            ObjectBody::PrimArray(arr) => self.encode_prim_array(arr),
            ObjectBody::RefArray { component, .. } => {
                Err(WireError::Unsupported(JavaType::ref_array(component.clone())))
            }
            ObjectBody::Str(_) => {
                // strings report a custom serializer, which has no
                // wire implementation
                let did = self.registry.register(&JavaType::string(), self.provider)?;
                self.registry.mark_instantiated(did);
                Err(WireError::Unsupported(JavaType::string()))
            }
            ObjectBody::Record { class, fields } => self.encode_record(class, fields),
        }
    }

    fn encode_prim_array(&mut self, arr: &PrimArray) -> Result<(), WireError> {
        let tag = WireTag::for_array(arr.kind())
            .ok_or_else(|| WireError::Unsupported(JavaType::PrimArray(arr.kind())))?;
        self.body.write_u8(tag.into());
        match arr {
            PrimArray::Int(v) => {
                self.body.write_u32(v.len() as u32);
                for e in v {
                    self.body.write_i32(*e);
                }
            }
            PrimArray::Long(v) => {
                self.body.write_u32(v.len() as u32);
                for e in v {
                    self.body.write_i64(*e);
                }
            }
            PrimArray::Float(v) => {
                self.body.write_u32(v.len() as u32);
                for e in v {
                    self.body.write_f32(*e);
                }
            }
            PrimArray::Double(v) => {
                self.body.write_u32(v.len() as u32);
                for e in v {
                    self.body.write_f64(*e);
                }
            }
            _ => unreachable!("tag lookup rejects other kinds"),
        }
        Ok(())
    }

    fn encode_record(
        &mut self,
        class: &QualifiedName,
        values: &[Value],
    ) -> Result<(), WireError> {
        let did = self
            .registry
            .register(&JavaType::Class(class.clone()), self.provider)?;
        self.registry.mark_instantiated(did);
        let desc = self.registry.get(did);
        if desc.kind().has_custom_serializer() {
            return Err(WireError::Unsupported(desc.ty().clone()));
        }
        let type_id = desc.type_id();
        let fields = desc.fields().to_vec();
        if fields.len() != values.len() {
            return Err(WireError::FieldMismatch {
                class: class.clone(),
                declared: fields.len(),
                actual: values.len(),
            });
        }

        let size = record_size(&fields);
        trace!("encoding {class} as type id {type_id}, {size} words");
        self.body.write_u8(header::HEAD);
        // the registry caps record ids at LAST_RECORD_ID, so the cast
        // cannot clip into the object-id bit
        self.body.write_u16(type_id as u16);
        self.body.write_u16(size as u16);

        for (field, value) in fields.iter().zip(values) {
            self.encode_field(class, field, value)?;
        }
        Ok(())
    }

    fn encode_field(
        &mut self,
        class: &QualifiedName,
        field: &FieldDef,
        value: &Value,
    ) -> Result<(), WireError> {
        let mismatch = || WireError::FieldAccess {
            class: class.clone(),
            field: field.name.clone(),
        };
        match &field.ty {
            JavaType::Prim(kind) => {
                let tag = WireTag::for_field(*kind)
                    .ok_or_else(|| WireError::Unsupported(JavaType::Prim(*kind)))?;
                self.body.write_u8(tag.into());
                match (kind, value) {
                    (PrimKind::Int, Value::Int(v)) => self.body.write_i32(*v),
                    (PrimKind::Long, Value::Long(v)) => self.body.write_i64(*v),
                    (PrimKind::Float, Value::Float(v)) => self.body.write_f32(*v),
                    (PrimKind::Double, Value::Double(v)) => self.body.write_f64(*v),
                    _ => return Err(mismatch()),
                }
                Ok(())
            }
            _ => match value {
                Value::Null => {
                    self.write_null();
                    Ok(())
                }
                Value::Ref(obj) => self.encode_object(obj),
                _ => Err(mismatch()),
            },
        }
    }
}

/// Receiver-layout size of a record, in 32-bit words: header word, one
/// word per int-sized scalar, an even-aligned pair of words for
/// everything else.
pub fn record_size(fields: &[FieldDef]) -> u32 {
    let mut size: u32 = 1;
    for field in fields {
        let delta = match &field.ty {
            JavaType::Prim(k) if k.words() == 1 => 1,
            _ => {
                if size % 2 > 0 {
                    3
                } else {
                    2
                }
            }
        };
        size += delta;
    }
    size
}

fn scalar_type(value: &Value) -> JavaType {
    match value {
        Value::Bool(_) => JavaType::Prim(PrimKind::Bool),
        Value::Byte(_) => JavaType::Prim(PrimKind::Byte),
        Value::Char(_) => JavaType::Prim(PrimKind::Char),
        Value::Short(_) => JavaType::Prim(PrimKind::Short),
        Value::Int(_) => JavaType::Prim(PrimKind::Int),
        Value::Long(_) => JavaType::Prim(PrimKind::Long),
        Value::Float(_) => JavaType::Prim(PrimKind::Float),
        Value::Double(_) => JavaType::Prim(PrimKind::Double),
        Value::Null | Value::Ref(_) => JavaType::class(QualifiedName::OBJECT),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use javelin_core::provider::ClassPool;

    fn point_pool() -> ClassPool {
        let mut pool = ClassPool::new();
        pool.record("Point", vec![
            FieldDef::new("x", JavaType::Prim(PrimKind::Int)),
            FieldDef::new("y", JavaType::Prim(PrimKind::Int)),
        ]);
        pool
    }

    #[test]
    fn null_root_encodes_as_empty_envelope_and_marker() {
        let pool = ClassPool::new();
        let mut reg = TypeRegistry::new();
        let mut enc = BinaryEncoder::new(&mut reg, &pool, true);
        enc.encode(&Value::Null).unwrap();
        assert_eq!(enc.finish(), vec![0, 0, 0x00, 0, 0]);
    }

    #[test]
    fn record_stream_layout() {
        let pool = point_pool();
        let mut reg = TypeRegistry::new();
        let mut enc = BinaryEncoder::new(&mut reg, &pool, true);
        let p = Value::record("Point", vec![Value::Int(7), Value::Int(-1)]);
        enc.encode(&p).unwrap();
        assert_eq!(
            enc.finish(),
            vec![
                1, 0, // one object
                0x00, 4, 0, // head, type id 4
                3, 0, // 3 words: header + two ints
                0xfc, 7, 0, 0, 0, // int field
                0xfc, 0xff, 0xff, 0xff, 0xff, // int field -1
            ]
        );
    }

    #[test]
    fn shared_object_becomes_a_back_reference() {
        let mut pool = ClassPool::new();
        pool.record("Leaf", vec![FieldDef::new("v", JavaType::Prim(PrimKind::Int))]);
        pool.record("Pair", vec![
            FieldDef::new("a", JavaType::class("Leaf")),
            FieldDef::new("b", JavaType::class("Leaf")),
        ]);
        let mut reg = TypeRegistry::new();
        let mut enc = BinaryEncoder::new(&mut reg, &pool, true);
        let leaf = Value::record("Leaf", vec![Value::Int(5)]);
        let pair = Value::record("Pair", vec![leaf.clone(), leaf.clone()]);
        enc.encode(&pair).unwrap();
        let bytes = enc.finish();
        // second occurrence: head + (id 1 | OBJECT_ID_BIT), 3 bytes
        let tail = &bytes[bytes.len() - 3..];
        assert_eq!(tail, &[0x00, 0x01, 0x80]);
    }

    #[test]
    fn self_cycle_encodes_a_back_reference() {
        let mut pool = ClassPool::new();
        pool.record("Node", vec![FieldDef::new("next", JavaType::class("Node"))]);
        let mut reg = TypeRegistry::new();
        let mut enc = BinaryEncoder::new(&mut reg, &pool, true);
        let node = Value::record("Node", vec![Value::Null]);
        let obj = node.as_ref().unwrap().clone();
        obj.set_field(0, Value::Ref(obj.clone()));
        enc.encode(&node).unwrap();
        // head, type id 4, size 4 (the reference starts at the odd word
        // 1 and pads to 2), then the 3-byte back-reference to object 0
        assert_eq!(enc.finish(), vec![1, 0, 0x00, 4, 0, 4, 0, 0x00, 0x00, 0x80]);
    }

    #[test]
    fn size_word_follows_the_alignment_rule() {
        let mk = |tys: &[JavaType]| {
            tys.iter()
                .enumerate()
                .map(|(i, t)| FieldDef::new(&format!("f{i}"), t.clone()))
                .collect::<Vec<_>>()
        };
        let int = JavaType::Prim(PrimKind::Int);
        let dbl = JavaType::Prim(PrimKind::Double);
        // double lands at the even offset 2: no padding
        assert_eq!(record_size(&mk(&[int.clone(), dbl.clone(), int.clone()])), 5);
        // double at offset 1 pads one word first
        assert_eq!(record_size(&mk(&[dbl.clone(), int.clone(), int.clone()])), 6);
        assert_eq!(record_size(&mk(&[])), 1);
        // references are two words
        assert_eq!(record_size(&mk(&[int, JavaType::class("X")])), 4);
    }

    #[test]
    fn unsupported_kinds_are_rejected() {
        let mut pool = ClassPool::new();
        pool.record("HasShort", vec![
            FieldDef::new("s", JavaType::Prim(PrimKind::Short)),
        ]);
        let mut reg = TypeRegistry::new();

        let mut enc = BinaryEncoder::new(&mut reg, &pool, true);
        let err = enc
            .encode(&Value::record("HasShort", vec![Value::Short(1)]))
            .unwrap_err();
        assert!(matches!(err, WireError::Unsupported(JavaType::Prim(PrimKind::Short))));

        let mut enc = BinaryEncoder::new(&mut reg, &pool, true);
        let err = enc
            .encode(&Value::prim_array(PrimArray::Bool(vec![true])))
            .unwrap_err();
        assert!(matches!(err, WireError::Unsupported(JavaType::PrimArray(PrimKind::Bool))));

        let mut enc = BinaryEncoder::new(&mut reg, &pool, true);
        let arr = Value::ref_array(JavaType::class("HasShort"), vec![]);
        assert!(matches!(enc.encode(&arr), Err(WireError::Unsupported(_))));

        let mut enc = BinaryEncoder::new(&mut reg, &pool, true);
        assert!(matches!(
            enc.encode(&Value::string("no")),
            Err(WireError::Unsupported(_))
        ));
    }

    #[test]
    fn int_array_dump_is_length_prefixed() {
        let pool = ClassPool::new();
        let mut reg = TypeRegistry::new();
        let mut enc = BinaryEncoder::new(&mut reg, &pool, true);
        enc.encode(&Value::int_array(vec![1, 2])).unwrap();
        assert_eq!(
            enc.finish(),
            vec![1, 0, 0xf4, 2, 0, 0, 0, 1, 0, 0, 0, 2, 0, 0, 0]
        );
    }
}
