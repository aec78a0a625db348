//! Bare scalar transfer for the remote-call boundary.
//!
//! Call arguments and return values that are plain scalars, primitive
//! arrays, or strings skip the graph codec entirely: no envelope, no id
//! table, just the raw payload. Arrays and strings travel as a 32-bit
//! length followed by their elements; a string element is one byte per
//! character, so only the low byte of each character survives.
//!
//! `char` has no transfer encoding at this boundary, and neither do
//! boolean or short arrays.

use javelin_core::error::WireError;
use javelin_core::types::{JavaType, PrimKind, QualifiedName};
use javelin_core::value::{ObjectBody, PrimArray, Value};

use crate::bytes::{ByteReader, ByteWriter};

/// Writes one scalar, primitive-array, or string value.
pub fn write_scalar(w: &mut ByteWriter, value: &Value) -> Result<(), WireError> {
    match value {
        Value::Bool(v) => w.write_u8(u8::from(*v)),
        Value::Byte(v) => w.write_u8(*v as u8),
        Value::Short(v) => w.write_u16(*v as u16),
        Value::Int(v) => w.write_i32(*v),
        Value::Long(v) => w.write_i64(*v),
        Value::Float(v) => w.write_f32(*v),
        Value::Double(v) => w.write_f64(*v),
        Value::Char(_) => {
            return Err(WireError::Unsupported(JavaType::Prim(PrimKind::Char)));
        }
        Value::Null => {
            return Err(WireError::Unsupported(JavaType::class(QualifiedName::OBJECT)));
        }
        Value::Ref(obj) => match &*obj.body() {
            ObjectBody::Str(s) => {
                w.write_u32(s.chars().count() as u32);
                for c in s.chars() {
                    w.write_u8(c as u8);
                }
            }
            ObjectBody::PrimArray(arr) => write_array(w, arr)?,
            _ => return Err(WireError::Unsupported(obj.runtime_type())),
        },
    }
    Ok(())
}

fn write_array(w: &mut ByteWriter, arr: &PrimArray) -> Result<(), WireError> {
    w.write_u32(arr.len() as u32);
    match arr {
        PrimArray::Byte(v) => {
            for e in v {
                w.write_u8(*e as u8);
            }
        }
        PrimArray::Int(v) => {
            for e in v {
                w.write_i32(*e);
            }
        }
        PrimArray::Long(v) => {
            for e in v {
                w.write_i64(*e);
            }
        }
        PrimArray::Float(v) => {
            for e in v {
                w.write_f32(*e);
            }
        }
        PrimArray::Double(v) => {
            for e in v {
                w.write_f64(*e);
            }
        }
        other => {
            return Err(WireError::Unsupported(JavaType::PrimArray(other.kind())));
        }
    }
    Ok(())
}

/// Reads one value of the given declared type, the inverse of
/// [`write_scalar`].
pub fn read_scalar(r: &mut ByteReader<'_>, ty: &JavaType) -> Result<Value, WireError> {
    match ty {
        JavaType::Prim(kind) => match kind {
            PrimKind::Bool => Ok(Value::Bool(r.read_u8()? != 0)),
            PrimKind::Byte => Ok(Value::Byte(r.read_u8()? as i8)),
            PrimKind::Short => Ok(Value::Short(r.read_u16()? as i16)),
            PrimKind::Int => Ok(Value::Int(r.read_i32()?)),
            PrimKind::Long => Ok(Value::Long(r.read_i64()?)),
            PrimKind::Float => Ok(Value::Float(r.read_f32()?)),
            PrimKind::Double => Ok(Value::Double(r.read_f64()?)),
            PrimKind::Char => Err(WireError::Unsupported(ty.clone())),
        },
        JavaType::PrimArray(kind) => read_array(r, *kind, ty),
        JavaType::Class(name) if name.is_string() => {
            let len = r.read_u32()? as usize;
            let bytes = r.read_bytes(len)?;
            let s: String = bytes.into_iter().map(char::from).collect();
            Ok(Value::string(&s))
        }
        _ => Err(WireError::Unsupported(ty.clone())),
    }
}

fn read_array(
    r: &mut ByteReader<'_>,
    kind: PrimKind,
    ty: &JavaType,
) -> Result<Value, WireError> {
    let len = r.read_u32()? as usize;
    let arr = match kind {
        PrimKind::Byte => {
            PrimArray::Byte(r.read_bytes(len)?.into_iter().map(|b| b as i8).collect())
        }
        PrimKind::Int => {
            PrimArray::Int((0..len).map(|_| r.read_i32()).collect::<Result<_, _>>()?)
        }
        PrimKind::Long => {
            PrimArray::Long((0..len).map(|_| r.read_i64()).collect::<Result<_, _>>()?)
        }
        PrimKind::Float => {
            PrimArray::Float((0..len).map(|_| r.read_f32()).collect::<Result<_, _>>()?)
        }
        PrimKind::Double => {
            PrimArray::Double((0..len).map(|_| r.read_f64()).collect::<Result<_, _>>()?)
        }
        _ => return Err(WireError::Unsupported(ty.clone())),
    };
    Ok(Value::prim_array(arr))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(value: &Value, ty: &JavaType, little_endian: bool) -> Value {
        let mut w = ByteWriter::new(little_endian);
        write_scalar(&mut w, value).unwrap();
        let bytes = w.into_bytes();
        let mut r = ByteReader::new(&bytes, little_endian);
        let out = read_scalar(&mut r, ty).unwrap();
        assert_eq!(r.remaining(), 0);
        out
    }

    #[test]
    fn primitives_round_trip() {
        for le in [true, false] {
            assert!(matches!(
                round_trip(&Value::Bool(true), &JavaType::Prim(PrimKind::Bool), le),
                Value::Bool(true)
            ));
            assert!(matches!(
                round_trip(&Value::Short(-2), &JavaType::Prim(PrimKind::Short), le),
                Value::Short(-2)
            ));
            assert!(matches!(
                round_trip(&Value::Double(0.3), &JavaType::Prim(PrimKind::Double), le),
                Value::Double(d) if d == 0.3
            ));
        }
    }

    #[test]
    fn arrays_are_length_prefixed() {
        let mut w = ByteWriter::new(true);
        write_scalar(&mut w, &Value::prim_array(PrimArray::Byte(vec![1, -1]))).unwrap();
        assert_eq!(w.into_bytes(), vec![2, 0, 0, 0, 1, 0xff]);

        let v = round_trip(
            &Value::int_array(vec![3, 4]),
            &JavaType::PrimArray(PrimKind::Int),
            false,
        );
        match &*v.as_ref().unwrap().body() {
            ObjectBody::PrimArray(arr) => assert_eq!(*arr, PrimArray::Int(vec![3, 4])),
            _ => unreachable!(),
        }
    }

    #[test]
    fn strings_travel_as_one_byte_per_char() {
        let mut w = ByteWriter::new(true);
        write_scalar(&mut w, &Value::string("hi")).unwrap();
        assert_eq!(w.into_bytes(), vec![2, 0, 0, 0, b'h', b'i']);

        let v = round_trip(&Value::string("abc"), &JavaType::string(), true);
        match &*v.as_ref().unwrap().body() {
            ObjectBody::Str(s) => assert_eq!(s, "abc"),
            _ => unreachable!(),
        }
    }

    #[test]
    fn kinds_without_a_transfer_encoding_are_rejected() {
        let mut w = ByteWriter::new(true);
        assert!(matches!(
            write_scalar(&mut w, &Value::Char(65)),
            Err(WireError::Unsupported(JavaType::Prim(PrimKind::Char)))
        ));
        assert!(matches!(
            write_scalar(&mut w, &Value::prim_array(PrimArray::Short(vec![1]))),
            Err(WireError::Unsupported(JavaType::PrimArray(PrimKind::Short)))
        ));
        assert!(matches!(
            write_scalar(&mut w, &Value::record("X", vec![])),
            Err(WireError::Unsupported(_))
        ));

        let mut r = ByteReader::new(&[0], true);
        assert!(matches!(
            read_scalar(&mut r, &JavaType::Prim(PrimKind::Char)),
            Err(WireError::Unsupported(_))
        ));
        let mut r = ByteReader::new(&[0], true);
        assert!(matches!(
            read_scalar(&mut r, &JavaType::class("Foo")),
            Err(WireError::Unsupported(_))
        ));
    }
}
