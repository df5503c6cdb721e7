//! Flat state encoding shared by every stateful component.
//!
//! Layout rules:
//! - integers are written little-endian with their exact width
//! - `bool` is one byte, `0` or `1`
//! - byte sequences carry a `u64` length prefix followed by the raw bytes
//!
//! There is no version tag or checksum. A buffer is only meaningful to an
//! emulator built from the same cartridge, and decoding panics when the
//! buffer runs out before every field has been read.

/// A component whose reachable state can be written to and read back from a
/// flat byte buffer.
///
/// `deserialize` consumes exactly the bytes `serialize` produced and returns
/// whatever follows them, so components can be chained in a fixed order.
pub trait Serializable {
    fn serialize(&self, buffer: &mut Vec<u8>);
    fn deserialize<'a>(&mut self, buffer: &'a [u8]) -> &'a [u8];
}

/// Fixed-width integer that can be encoded little-endian.
pub trait Primitive: Copy {
    const WIDTH: usize;
    fn write_le(self, buffer: &mut Vec<u8>);
    fn read_le(bytes: &[u8]) -> Self;
}

macro_rules! impl_primitive {
    ($($t:ty),*) => {$(
        impl Primitive for $t {
            const WIDTH: usize = std::mem::size_of::<$t>();

            fn write_le(self, buffer: &mut Vec<u8>) {
                buffer.extend_from_slice(&self.to_le_bytes());
            }

            fn read_le(bytes: &[u8]) -> Self {
                let mut raw = [0u8; std::mem::size_of::<$t>()];
                raw.copy_from_slice(bytes);
                <$t>::from_le_bytes(raw)
            }
        }
    )*};
}

impl_primitive!(u8, u16, u32, u64, i8, i16, i32, i64);

fn take<'a>(buffer: &mut &'a [u8], len: usize) -> &'a [u8] {
    assert!(
        buffer.len() >= len,
        "state buffer truncated: need {len} bytes, {} remaining",
        buffer.len()
    );
    let (head, rest) = buffer.split_at(len);
    *buffer = rest;
    head
}

pub fn write_int<T: Primitive>(buffer: &mut Vec<u8>, value: T) {
    value.write_le(buffer);
}

pub fn read_int<T: Primitive>(buffer: &mut &[u8]) -> T {
    T::read_le(take(buffer, T::WIDTH))
}

pub fn write_bool(buffer: &mut Vec<u8>, value: bool) {
    buffer.push(value as u8);
}

pub fn read_bool(buffer: &mut &[u8]) -> bool {
    take(buffer, 1)[0] != 0
}

/// `usize` values are always stored as `u64` so the layout does not depend on
/// the host pointer width.
pub fn write_usize(buffer: &mut Vec<u8>, value: usize) {
    write_int(buffer, value as u64);
}

pub fn read_usize(buffer: &mut &[u8]) -> usize {
    read_int::<u64>(buffer) as usize
}

pub fn write_bytes(buffer: &mut Vec<u8>, bytes: &[u8]) {
    write_usize(buffer, bytes.len());
    buffer.extend_from_slice(bytes);
}

pub fn read_bytes(buffer: &mut &[u8]) -> Vec<u8> {
    let len = read_usize(buffer);
    take(buffer, len).to_vec()
}

/// Reads a length-prefixed sequence into a fixed-size destination.
///
/// Panics when the stored length differs from `dest.len()`.
pub fn read_bytes_into(buffer: &mut &[u8], dest: &mut [u8]) {
    let len = read_usize(buffer);
    assert_eq!(
        len,
        dest.len(),
        "state buffer holds {len} bytes where {} were expected",
        dest.len()
    );
    dest.copy_from_slice(take(buffer, len));
}
