//! Fixed-size little-endian encoding primitives.
//!
//! A [`WireRecord`] is written as the concatenation of its fields, each one a
//! [`WireField`] of known size. There are no tags, separators or length
//! prefixes; a buffer of records is valid iff its length is a multiple of
//! [`WireRecord::WIRE_SIZE`].

use bytes::{Buf, BufMut};
use glam::DVec3;

/// A scalar or small aggregate with a fixed encoded size.
pub trait WireField: Sized {
    const WIRE_SIZE: usize;

    fn put<B: BufMut>(&self, buf: &mut B);

    /// Reads one value. Panics if `buf` holds fewer than `WIRE_SIZE` bytes.
    fn get<B: Buf>(buf: &mut B) -> Self;
}

/// A plain record encoded field by field. Usually derived.
pub trait WireRecord: Sized {
    const WIRE_SIZE: usize;

    fn put<B: BufMut>(&self, buf: &mut B);

    fn get<B: Buf>(buf: &mut B) -> Self;
}

impl WireField for f64 {
    const WIRE_SIZE: usize = 8;

    fn put<B: BufMut>(&self, buf: &mut B) {
        buf.put_f64_le(*self);
    }

    fn get<B: Buf>(buf: &mut B) -> Self {
        buf.get_f64_le()
    }
}

impl WireField for i32 {
    const WIRE_SIZE: usize = 4;

    fn put<B: BufMut>(&self, buf: &mut B) {
        buf.put_i32_le(*self);
    }

    fn get<B: Buf>(buf: &mut B) -> Self {
        buf.get_i32_le()
    }
}

impl WireField for u32 {
    const WIRE_SIZE: usize = 4;

    fn put<B: BufMut>(&self, buf: &mut B) {
        buf.put_u32_le(*self);
    }

    fn get<B: Buf>(buf: &mut B) -> Self {
        buf.get_u32_le()
    }
}

impl WireField for u8 {
    const WIRE_SIZE: usize = 1;

    fn put<B: BufMut>(&self, buf: &mut B) {
        buf.put_u8(*self);
    }

    fn get<B: Buf>(buf: &mut B) -> Self {
        buf.get_u8()
    }
}

impl WireField for bool {
    const WIRE_SIZE: usize = 1;

    fn put<B: BufMut>(&self, buf: &mut B) {
        buf.put_u8(u8::from(*self));
    }

    fn get<B: Buf>(buf: &mut B) -> Self {
        buf.get_u8() != 0
    }
}

impl WireField for DVec3 {
    const WIRE_SIZE: usize = 3 * <f64 as WireField>::WIRE_SIZE;

    fn put<B: BufMut>(&self, buf: &mut B) {
        self.x.put(buf);
        self.y.put(buf);
        self.z.put(buf);
    }

    fn get<B: Buf>(buf: &mut B) -> Self {
        let x = f64::get(buf);
        let y = f64::get(buf);
        let z = f64::get(buf);
        DVec3::new(x, y, z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalars_are_little_endian() {
        let mut buf = Vec::new();
        0x0102_0304_i32.put(&mut buf);
        assert_eq!(buf, vec![0x04, 0x03, 0x02, 0x01]);
    }

    #[test]
    fn vector_reads_back_in_component_order() {
        let mut buf = Vec::new();
        DVec3::new(1.5, -2.0, 3.25).put(&mut buf);
        assert_eq!(buf.len(), <DVec3 as WireField>::WIRE_SIZE);

        let mut slice = &buf[..];
        assert_eq!(<DVec3 as WireField>::get(&mut slice), DVec3::new(1.5, -2.0, 3.25));
        assert!(slice.is_empty());
    }

    #[test]
    fn bool_is_one_byte() {
        let mut buf = Vec::new();
        true.put(&mut buf);
        false.put(&mut buf);
        assert_eq!(buf, vec![1, 0]);
    }
}
