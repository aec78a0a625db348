//! Wire tag bytes.
//!
//! Every encoded entity opens with one tag byte: `0x00` introduces the
//! null marker, a back-reference, or a record; `0xf4..=0xf7` introduce
//! the four supported primitive-array dumps; `0xfc..=0xff` tag the four
//! supported scalar field kinds inside a record. The remaining primitive
//! tags exist in the id table but never appear on the wire.

use num_enum::{IntoPrimitive, TryFromPrimitive};

use javelin_core::error::WireError;
use javelin_core::types::PrimKind;

/// A tag byte the codec can actually emit or accept.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
pub enum WireTag {
    /// Null marker, back-reference, or record header follows.
    Head = 0x00,
    IntArray = 0xf4,
    LongArray = 0xf5,
    FloatArray = 0xf6,
    DoubleArray = 0xf7,
    IntField = 0xfc,
    LongField = 0xfd,
    FloatField = 0xfe,
    DoubleField = 0xff,
}

impl WireTag {
    pub fn parse(byte: u8) -> Result<WireTag, WireError> {
        WireTag::try_from(byte).map_err(|_| WireError::UnknownTag(byte))
    }

    /// The array tag for a primitive kind, if that kind is encodable.
    pub fn for_array(kind: PrimKind) -> Option<WireTag> {
        match kind {
            PrimKind::Int => Some(WireTag::IntArray),
            PrimKind::Long => Some(WireTag::LongArray),
            PrimKind::Float => Some(WireTag::FloatArray),
            PrimKind::Double => Some(WireTag::DoubleArray),
            _ => None,
        }
    }

    /// The field tag for a primitive kind, if that kind is encodable.
    pub fn for_field(kind: PrimKind) -> Option<WireTag> {
        match kind {
            PrimKind::Int => Some(WireTag::IntField),
            PrimKind::Long => Some(WireTag::LongField),
            PrimKind::Float => Some(WireTag::FloatField),
            PrimKind::Double => Some(WireTag::DoubleField),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_match_the_id_table() {
        assert_eq!(u8::from(WireTag::IntArray), PrimKind::Int.array_type_id());
        assert_eq!(u8::from(WireTag::DoubleArray), PrimKind::Double.array_type_id());
        assert_eq!(u8::from(WireTag::IntField), PrimKind::Int.field_tag());
        assert_eq!(u8::from(WireTag::LongField), PrimKind::Long.field_tag());
    }

    #[test]
    fn unencodable_kinds_have_no_tag() {
        assert_eq!(WireTag::for_array(PrimKind::Bool), None);
        assert_eq!(WireTag::for_field(PrimKind::Short), None);
        // 0xf8 is the boolean field tag; the codec never emits it
        assert!(matches!(WireTag::parse(0xf8), Err(WireError::UnknownTag(0xf8))));
    }
}
