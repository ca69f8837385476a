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

//! Fixed-width little-endian integer decoding, used wherever the format
//! calls for a plain binary field rather than a varint: the table magic,
//! the data block restart count, and the log batch header.

/// Decodes a little-endian `u32` from the first 4 bytes of `src`.
///
/// # Panics
/// Panics if `src` has fewer than 4 bytes: every call site here has
/// already validated the buffer is long enough to contain the field, so
/// this stays an unchecked decode rather than returning a `Result`.
#[inline]
pub fn decode_fixed_32(src: &[u8]) -> u32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(&src[..4]);
    u32::from_le_bytes(buf)
}

/// Decodes a little-endian `i32` from the first 4 bytes of `src`.
#[inline]
pub fn decode_fixed_i32(src: &[u8]) -> i32 {
    decode_fixed_32(src) as i32
}

/// Decodes a little-endian `u64` from the first 8 bytes of `src`.
#[inline]
pub fn decode_fixed_64(src: &[u8]) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&src[..8]);
    u64::from_le_bytes(buf)
}

/// Appends `v` to `dst` as 4 little-endian bytes.
#[inline]
pub fn put_fixed_32(dst: &mut Vec<u8>, v: u32) {
    dst.extend_from_slice(&v.to_le_bytes());
}

/// Appends `v` to `dst` as 8 little-endian bytes.
#[inline]
pub fn put_fixed_64(dst: &mut Vec<u8>, v: u64) {
    dst.extend_from_slice(&v.to_le_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_32_roundtrip() {
        let mut buf = Vec::new();
        put_fixed_32(&mut buf, 0xDEAD_BEEF);
        assert_eq!(decode_fixed_32(&buf), 0xDEAD_BEEF);
    }

    #[test]
    fn fixed_64_roundtrip() {
        let mut buf = Vec::new();
        put_fixed_64(&mut buf, 0xDB4775248B80FB57);
        assert_eq!(decode_fixed_64(&buf), 0xDB4775248B80FB57);
    }

    #[test]
    fn fixed_i32_negative() {
        let mut buf = Vec::new();
        put_fixed_32(&mut buf, (-1i32) as u32);
        assert_eq!(decode_fixed_i32(&buf), -1);
    }
}
