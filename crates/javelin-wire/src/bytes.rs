//! Raw byte-stream access.
//!
//! Scalars cross the wire as fixed-width values in the codec's byte
//! order; floats travel as their IEEE-754 bit patterns. The reader
//! reports a clean [`WireError::Truncated`] instead of panicking when
//! the stream runs short.

use javelin_core::error::WireError;

/// Growable output buffer with a byte-order policy.
#[derive(Debug)]
pub struct ByteWriter {
    buf: Vec<u8>,
    little_endian: bool,
}

impl ByteWriter {
    pub fn new(little_endian: bool) -> Self {
        ByteWriter { buf: Vec::new(), little_endian }
    }

    pub fn little_endian(&self) -> bool {
        self.little_endian
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn extend(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    pub fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    pub fn write_u16(&mut self, v: u16) {
        let b = if self.little_endian { v.to_le_bytes() } else { v.to_be_bytes() };
        self.buf.extend_from_slice(&b);
    }

    pub fn write_i32(&mut self, v: i32) {
        let b = if self.little_endian { v.to_le_bytes() } else { v.to_be_bytes() };
        self.buf.extend_from_slice(&b);
    }

    pub fn write_u32(&mut self, v: u32) {
        self.write_i32(v as i32);
    }

    pub fn write_i64(&mut self, v: i64) {
        let b = if self.little_endian { v.to_le_bytes() } else { v.to_be_bytes() };
        self.buf.extend_from_slice(&b);
    }

    pub fn write_f32(&mut self, v: f32) {
        self.write_i32(v.to_bits() as i32);
    }

    pub fn write_f64(&mut self, v: f64) {
        self.write_i64(v.to_bits() as i64);
    }
}

/// Cursor over an input stream with the matching byte-order policy.
#[derive(Debug)]
pub struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
    little_endian: bool,
}

impl<'a> ByteReader<'a> {
    pub fn new(data: &'a [u8], little_endian: bool) -> Self {
        ByteReader { data, pos: 0, little_endian }
    }

    pub fn little_endian(&self) -> bool {
        self.little_endian
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], WireError> {
        if self.remaining() < n {
            return Err(WireError::Truncated);
        }
        let s = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(s)
    }

    pub fn read_u8(&mut self) -> Result<u8, WireError> {
        Ok(self.take(1)?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16, WireError> {
        let b: [u8; 2] = self.take(2)?.try_into().map_err(|_| WireError::Truncated)?;
        Ok(if self.little_endian { u16::from_le_bytes(b) } else { u16::from_be_bytes(b) })
    }

    pub fn read_i32(&mut self) -> Result<i32, WireError> {
        let b: [u8; 4] = self.take(4)?.try_into().map_err(|_| WireError::Truncated)?;
        Ok(if self.little_endian { i32::from_le_bytes(b) } else { i32::from_be_bytes(b) })
    }

    pub fn read_u32(&mut self) -> Result<u32, WireError> {
        Ok(self.read_i32()? as u32)
    }

    pub fn read_i64(&mut self) -> Result<i64, WireError> {
        let b: [u8; 8] = self.take(8)?.try_into().map_err(|_| WireError::Truncated)?;
        Ok(if self.little_endian { i64::from_le_bytes(b) } else { i64::from_be_bytes(b) })
    }

    pub fn read_f32(&mut self) -> Result<f32, WireError> {
        Ok(f32::from_bits(self.read_i32()? as u32))
    }

    pub fn read_f64(&mut self) -> Result<f64, WireError> {
        Ok(f64::from_bits(self.read_i64()? as u64))
    }

    pub fn read_bytes(&mut self, n: usize) -> Result<Vec<u8>, WireError> {
        Ok(self.take(n)?.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalars_round_trip_in_both_orders() {
        for le in [true, false] {
            let mut w = ByteWriter::new(le);
            w.write_u16(0x8001);
            w.write_i32(-7);
            w.write_i64(1 << 40);
            w.write_f32(1.5);
            w.write_f64(-2.25);
            let bytes = w.into_bytes();
            let mut r = ByteReader::new(&bytes, le);
            assert_eq!(r.read_u16().unwrap(), 0x8001);
            assert_eq!(r.read_i32().unwrap(), -7);
            assert_eq!(r.read_i64().unwrap(), 1 << 40);
            assert_eq!(r.read_f32().unwrap(), 1.5);
            assert_eq!(r.read_f64().unwrap(), -2.25);
            assert_eq!(r.remaining(), 0);
        }
    }

    #[test]
    fn little_endian_layout_is_low_byte_first() {
        let mut w = ByteWriter::new(true);
        w.write_i32(0x0403_0201);
        assert_eq!(w.into_bytes(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn short_streams_report_truncation() {
        let mut r = ByteReader::new(&[1, 2], true);
        assert!(matches!(r.read_i32(), Err(WireError::Truncated)));
        // the failed read consumes nothing usable; u16 still works
        let mut r = ByteReader::new(&[1, 2], true);
        assert_eq!(r.read_u16().unwrap(), 0x0201);
    }
}
