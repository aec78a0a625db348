//! Object-header layout and the type-id table.
//!
//! Every non-flattened object starts with a 32-bit header word. The upper
//! 24 bits hold the type id, the lower 8 bits are runtime flags. The id
//! space is partitioned:
//!
//! - `0` is the null marker, `1` the custom-serializer marker, `2` the
//!   built-in string type.
//! - Ordinary records get `3..=0x7fff`; `0x8000..=0xffff` is reserved for
//!   object ids in the wire encoding (see [`OBJECT_ID_BIT`]).
//! - Reference-array kinds occupy the upper byte `0x01..=0xef` of the
//!   24-bit id (the stored kind id is the byte value).
//! - Primitive-array kinds are the fixed byte values `0xf0..=0xf7`;
//!   scalar field tags are `0xf8..=0xff`.

use bitflags::bitflags;

/// Tag byte introducing a null marker, back-reference, or record.
pub const HEAD: u8 = 0x00;

/// 16-bit id slot value meaning "null".
pub const NULL_ID: u16 = 0;

/// 16-bit id slot value meaning "custom-serialized raw data follows".
pub const CUSTOM_ID: u16 = 1;

/// Fixed type id of `java.lang.String`.
pub const STRING_TYPE_ID: u32 = 2;

/// First id handed out to an ordinary record type.
pub const FIRST_RECORD_ID: u32 = 3;

/// Last usable record type id. The wire encoding writes type ids into
/// a 16-bit slot whose high bit is [`OBJECT_ID_BIT`], so record ids
/// must stay below it.
pub const LAST_RECORD_ID: u32 = 0x7fff;

/// High bit distinguishing an object id from a type id in the same
/// 16-bit wire slot.
pub const OBJECT_ID_BIT: u16 = 0x8000;

/// First reference-array kind id.
pub const FIRST_ARRAY_KIND: u32 = 0x01;

/// Last usable reference-array kind id; the next byte value starts the
/// primitive-array range.
pub const LAST_ARRAY_KIND: u32 = 0xef;

/// Base of the primitive-array id range (`boolean[]`).
pub const PRIM_ARRAY_BASE: u8 = 0xf0;

/// Base of the scalar field-tag range (`boolean`).
pub const PRIM_FIELD_BASE: u8 = 0xf8;

/// Shift applied to a type id when packed into a header word.
pub const FLAG_BITS: u32 = 8;

/// C member name of the hidden header word.
pub const HEADER_FIELD: &str = "header_";

/// C declaration of the hidden header word, as embedded in every struct.
pub const HEADER_DECL: &str = " int header_; ";

bitflags! {
    /// The low 8 bits of an object header.
    ///
    /// The translator always emits objects with no flags set; the bits
    /// belong to the target runtime after load.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct HeaderFlags: u8 {}
}

/// Packs a record type id and flag bits into a header word.
pub fn header_word(type_id: u32, flags: HeaderFlags) -> u32 {
    (type_id << FLAG_BITS) | u32::from(flags.bits())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_word_shifts_type_id() {
        assert_eq!(header_word(3, HeaderFlags::empty()), 3 << 8);
        assert_eq!(header_word(STRING_TYPE_ID, HeaderFlags::empty()), 0x200);
    }

    #[test]
    fn id_ranges_are_disjoint() {
        assert!(LAST_ARRAY_KIND < u32::from(PRIM_ARRAY_BASE));
        assert!(PRIM_ARRAY_BASE < PRIM_FIELD_BASE);
        assert_eq!(FIRST_RECORD_ID, STRING_TYPE_ID + 1);
        // record ids never collide with the object-id bit
        assert_eq!(LAST_RECORD_ID + 1, u32::from(OBJECT_ID_BIT));
    }
}
