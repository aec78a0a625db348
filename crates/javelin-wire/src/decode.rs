//! Binary graph decoding.
//!
//! The mirror of [`crate::encode`]: reads the envelope count, then
//! rebuilds the object graph depth-first against a registry that already
//! knows the type ids in play. Every decoded object is appended to the
//! id table *before* its fields are read, which is what lets a
//! back-reference inside those fields resolve, including a reference to
//! the object currently under construction.
//!
//! Padding words in a record exist only in the receiver's memory layout;
//! they consume no stream bytes. The walked word count must still land
//! exactly on the size word, or the record is rejected.

use log::trace;

use javelin_core::error::WireError;
use javelin_core::header;
use javelin_core::types::JavaType;
use javelin_core::value::{ObjRef, ObjectBody, PrimArray, Value};
use javelin_registry::{TypeKind, TypeRegistry};

use crate::bytes::ByteReader;
use crate::scalar;
use crate::tags::WireTag;

/// One decoding session over a complete stream.
pub struct BinaryDecoder<'a> {
    registry: &'a TypeRegistry,
    reader: ByteReader<'a>,
    objects: Vec<Value>,
}

impl<'a> BinaryDecoder<'a> {
    pub fn new(registry: &'a TypeRegistry, data: &'a [u8], little_endian: bool) -> Self {
        BinaryDecoder {
            registry,
            reader: ByteReader::new(data, little_endian),
            objects: Vec::new(),
        }
    }

    /// Decodes the root of the stream. An envelope counting no objects
    /// decodes to null without touching the rest of the stream.
    pub fn decode(mut self) -> Result<Value, WireError> {
        let count = self.reader.read_u16()?;
        if count < 1 {
            return Ok(Value::Null);
        }
        trace!("decoding a stream of {count} objects");
        self.decode_value()
    }

    /// Decodes with a declared-type hint. A primitive hint reads a bare
    /// scalar with no envelope; anything else reads the object stream.
    pub fn decode_hinted(mut self, hint: &JavaType) -> Result<Value, WireError> {
        match hint {
            JavaType::Prim(_) => scalar::read_scalar(&mut self.reader, hint),
            _ => self.decode(),
        }
    }

    fn decode_value(&mut self) -> Result<Value, WireError> {
        let byte = self.reader.read_u8()?;
        self.decode_tagged(WireTag::parse(byte)?)
    }

    fn decode_tagged(&mut self, tag: WireTag) -> Result<Value, WireError> {
        match tag {
            WireTag::Head => self.decode_headed(),
            WireTag::IntArray
            | WireTag::LongArray
            | WireTag::FloatArray
            | WireTag::DoubleArray => self.read_prim_array(tag),
            // scalar field tags only appear inside a record entry
            field => Err(WireError::UnknownTag(field.into())),
        }
    }

    fn decode_headed(&mut self) -> Result<Value, WireError> {
        let word = self.reader.read_u16()?;
        if word == header::NULL_ID {
            return Ok(Value::Null);
        }
        if word & header::OBJECT_ID_BIT != 0 {
            let id = word & !header::OBJECT_ID_BIT;
            return self
                .objects
                .get(id as usize)
                .cloned()
                .ok_or(WireError::DanglingObjectId(id));
        }
        if word == header::CUSTOM_ID {
            return self.read_raw_data();
        }
        self.read_record(word)
    }

    /// A custom-serialized frame: a 32-bit header word, then a raw byte
    /// dump whose first word the header overwrites.
    fn read_raw_data(&mut self) -> Result<Value, WireError> {
        let head = self.reader.read_u32()?;
        let len = self.reader.read_u32()? as usize;
        let mut bytes = self.reader.read_bytes(len)?;
        let head_bytes = if self.reader.little_endian() {
            head.to_le_bytes()
        } else {
            head.to_be_bytes()
        };
        for (slot, b) in bytes.iter_mut().zip(head_bytes) {
            *slot = b;
        }
        let value = Value::prim_array(PrimArray::Byte(
            bytes.into_iter().map(|b| b as i8).collect(),
        ));
        self.objects.push(value.clone());
        Ok(value)
    }

    fn read_record(&mut self, type_id: u16) -> Result<Value, WireError> {
        let size = self.reader.read_u16()?;
        let did = self
            .registry
            .descriptor_by_type_id(u32::from(type_id))
            .ok_or(WireError::UnknownTypeId(type_id))?;
        let desc = self.registry.get(did);
        let class = match (desc.kind(), desc.ty().class_name()) {
            (TypeKind::Record, Some(name)) => name.clone(),
            _ => return Err(WireError::Unsupported(desc.ty().clone())),
        };
        let field_count = desc.fields().len();
        trace!("decoding {class} (type id {type_id}, {size} words)");

        // registered before the fields so back-references into this
        // object resolve
        let obj = ObjRef::new(ObjectBody::Record {
            class: class.clone(),
            fields: vec![Value::Null; field_count],
        });
        self.objects.push(Value::Ref(obj.clone()));

        let mut offset: u16 = 1;
        for index in 0..field_count {
            let byte = self.reader.read_u8()?;
            let value = match WireTag::parse(byte)? {
                WireTag::IntField => {
                    offset += 1;
                    Value::Int(self.reader.read_i32()?)
                }
                WireTag::FloatField => {
                    offset += 1;
                    Value::Float(self.reader.read_f32()?)
                }
                WireTag::LongField => {
                    offset = align(offset) + 2;
                    Value::Long(self.reader.read_i64()?)
                }
                WireTag::DoubleField => {
                    offset = align(offset) + 2;
                    Value::Double(self.reader.read_f64()?)
                }
                reference => {
                    offset = align(offset) + 2;
                    self.decode_tagged(reference)?
                }
            };
            obj.set_field(index, value);
        }
        if offset != size {
            return Err(WireError::SizeMismatch {
                class,
                declared: size,
                actual: offset,
            });
        }
        Ok(Value::Ref(obj))
    }

    fn read_prim_array(&mut self, tag: WireTag) -> Result<Value, WireError> {
        let len = self.reader.read_u32()? as usize;
        let arr = match tag {
            WireTag::IntArray => PrimArray::Int(
                (0..len).map(|_| self.reader.read_i32()).collect::<Result<_, _>>()?,
            ),
            WireTag::LongArray => PrimArray::Long(
                (0..len).map(|_| self.reader.read_i64()).collect::<Result<_, _>>()?,
            ),
            WireTag::FloatArray => PrimArray::Float(
                (0..len).map(|_| self.reader.read_f32()).collect::<Result<_, _>>()?,
            ),
            WireTag::DoubleArray => PrimArray::Double(
                (0..len).map(|_| self.reader.read_f64()).collect::<Result<_, _>>()?,
            ),
            _ => unreachable!("caller dispatches array tags only"),
        };
        let value = Value::prim_array(arr);
        self.objects.push(value.clone());
        Ok(value)
    }
}

/// Word offset of the next two-word entry: odd offsets get a padding
/// word that exists only in the receiver's layout.
fn align(offset: u16) -> u16 {
    offset + offset % 2
}
