//! Generation-time LEB128 rendering.
//!
//! Field tags and fixed-width packed lengths are known while emitting, so
//! their varint bytes are computed here and written into the generated
//! source as literals.

use bytes::BufMut;

/// Encode `value` as a base-128 varint into the provided buffer. Returns
/// the number of bytes written (1..=10).
pub fn encode_uvarint<B: BufMut>(mut value: u64, buf: &mut B) -> usize {
    let mut written = 0;
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        written += 1;
        if value == 0 {
            buf.put_u8(byte);
            return written;
        }
        buf.put_u8(byte | 0x80);
    }
}

/// The varint bytes of `value`.
pub fn uvarint_bytes(value: u64) -> Vec<u8> {
    let mut buf = Vec::with_capacity(10);
    encode_uvarint(value, &mut buf);
    buf
}
