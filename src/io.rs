//! Byte-level encode/decode helpers, grounded on the teacher's
//! `Encodeable`/`Decodeable` traits (`io.rs`). The codec is little-endian
//! throughout, matching spec §6's on-disk format.

use std::convert::TryInto;
use std::io::Read;
use std::mem::size_of;

pub trait Encodable {
    fn encode(&self) -> Vec<u8>;
}

pub trait Decodable: Sized {
    fn decode_from<R: Read>(reader: &mut R) -> Self;
}

pub fn read_exact_bytes<R: Read>(reader: &mut R, n: usize) -> Vec<u8> {
    let mut buf = vec![0u8; n];
    reader
        .read_exact(&mut buf)
        .unwrap_or_else(|e| panic!("io error reading {} bytes: {}", n, e));
    buf
}

macro_rules! impl_int_codec {
    (for $($t:ty),+) => {
        $(
            impl Encodable for $t {
                fn encode(&self) -> Vec<u8> {
                    self.to_le_bytes().to_vec()
                }
            }

            impl Decodable for $t {
                fn decode_from<R: Read>(reader: &mut R) -> Self {
                    let bytes = read_exact_bytes(reader, size_of::<Self>());
                    Self::from_le_bytes(bytes.try_into().unwrap())
                }
            }
        )*
    }
}

impl_int_codec!(for u8, u16, u32, u64, i8, i16, i32, i64);

/// Fixed-width string: exactly `width` bytes, right-padded with NUL (0x00).
///
/// Spec §9 open question 1: the Go source pads with ASCII `'0'` and strips
/// `'0'` on read, which silently corrupts a string that legitimately ends in
/// `'0'` characters. This crate uses NUL padding/stripping instead and
/// documents the deviation here rather than reproducing the bug.
pub fn encode_fixed_string(s: &str, width: usize) -> Vec<u8> {
    let bytes = s.as_bytes();
    assert!(
        bytes.len() <= width,
        "string {:?} exceeds fixed width {}",
        s,
        width
    );
    let mut buf = vec![0u8; width];
    buf[..bytes.len()].copy_from_slice(bytes);
    buf
}

pub fn decode_fixed_string(buf: &[u8]) -> String {
    let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    String::from_utf8_lossy(&buf[..end]).into_owned()
}
