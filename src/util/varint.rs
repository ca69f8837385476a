// Copyright 2019 Fullstop000 <fullstop1005@gmail.com>.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// See the License for the specific language governing permissions and
// limitations under the License.

//! Unsigned little-endian base-128 (LEB128) varint decoding.
//!
//! Every context in this crate reads varints out of an in-memory buffer
//! (a decompressed data block, a reassembled log batch, ...), so the
//! decoder below is generic over `std::io::Read` and is almost always
//! instantiated with `io::Cursor<&[u8]>`.

use std::io::Read;

/// Maximum varint length for a 32-bit value.
pub const MAX_VARINT_LEN_32: usize = 5;
/// Maximum varint length for a 64-bit value.
pub const MAX_VARINT_LEN_64: usize = 10;

/// Reads a single unsigned LEB128 varint from `r`, stopping after the first
/// byte whose high bit is clear or after `max_bytes` bytes, whichever comes
/// first.
///
/// Returns `None` only when zero bytes could be read at all (immediate
/// EOF). A varint that runs out of input partway through is tolerated: the
/// value accumulated from whatever bytes were read is returned as `Some`,
/// matching the log reader's documented tolerance for a torn trailing
/// record. Callers that need to detect this case check whether the
/// underlying reader has any bytes left before trusting the result.
pub fn read_varint64<R: Read>(r: &mut R, max_bytes: usize) -> Option<u64> {
    let mut result: u64 = 0;
    let mut byte = [0u8; 1];
    for i in 0..max_bytes {
        if r.read(&mut byte).unwrap_or(0) == 0 {
            return if i == 0 { None } else { Some(result) };
        }
        result |= u64::from(byte[0] & 0x7F) << (7 * i);
        if byte[0] & 0x80 == 0 {
            break;
        }
    }
    Some(result)
}

/// Like [`read_varint64`] but clamped to `MAX_VARINT_LEN_32` bytes and
/// truncated to `u32`, for the 32-bit contexts (block entry lengths, log
/// batch key/value lengths) that make up most of this crate's varint use.
pub fn read_varint32<R: Read>(r: &mut R) -> Option<u32> {
    read_varint64(r, MAX_VARINT_LEN_32).map(|v| v as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn single_byte_roundtrip() {
        for v in [0u32, 1, 63, 127] {
            let encoded = encode_for_test(v as u64);
            let mut c = Cursor::new(encoded.as_slice());
            assert_eq!(read_varint32(&mut c), Some(v));
        }
    }

    #[test]
    fn multi_byte_roundtrip() {
        for v in [128u64, 300, 16384, 0xFFFF_FFFF, u64::MAX] {
            let encoded = encode_for_test(v);
            let mut c = Cursor::new(encoded.as_slice());
            assert_eq!(read_varint64(&mut c, MAX_VARINT_LEN_64), Some(v));
        }
    }

    #[test]
    fn empty_input_is_none() {
        let mut c = Cursor::new(&[][..]);
        assert_eq!(read_varint64(&mut c, MAX_VARINT_LEN_64), None);
    }

    #[test]
    fn partial_varint_yields_accumulated_value() {
        // Two continuation bytes promising a third that never arrives.
        let mut c = Cursor::new(&[0x80u8, 0x80][..]);
        // Both bytes have the high bit set, so nothing would normally
        // terminate the loop; EOF on the third read should still hand back
        // whatever was accumulated instead of failing outright.
        assert_eq!(read_varint64(&mut c, MAX_VARINT_LEN_64), Some(0));
    }

    #[test]
    fn five_byte_varint_reaches_max_u32() {
        let encoded = [0xFFu8, 0xFF, 0xFF, 0xFF, 0x0F];
        let mut c = Cursor::new(&encoded[..]);
        assert_eq!(read_varint32(&mut c), Some(0xFFFF_FFFF));
    }

    #[test]
    fn max_bytes_cap_truncates_runaway_continuation() {
        // All five bytes carry the continuation bit; read_varint32 must not
        // read a sixth byte even though the stream has one available.
        let encoded = [0xFFu8, 0xFF, 0xFF, 0xFF, 0xFF, 0x00];
        let mut c = Cursor::new(&encoded[..]);
        assert_eq!(read_varint32(&mut c), Some(0xFFFF_FFFF));
        assert_eq!(c.position(), 5);
    }

    fn encode_for_test(mut v: u64) -> Vec<u8> {
        let mut out = Vec::new();
        loop {
            let mut b = (v & 0x7F) as u8;
            v >>= 7;
            if v != 0 {
                b |= 0x80;
            }
            out.push(b);
            if v == 0 {
                break;
            }
        }
        out
    }
}
