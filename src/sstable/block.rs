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

//! Decodes the prefix-compressed (key, value) entries inside a single,
//! already-decompressed data or index block. See the module docs on
//! [`crate::sstable`] for the block layout this walks.

use crate::error::{Error, Result, Status};
use crate::util::coding::{decode_fixed_32, decode_fixed_i32};
use crate::util::varint::read_varint32;
use std::io::Cursor;

fn corrupt(msg: &str) -> Error {
    Error::new(Status::Corruption, Some(msg))
}

/// Lazily walks every entry in a decoded block, in on-disk order.
///
/// Every entry after a restart point stores only the suffix that differs
/// from the previous key, so entries must be walked strictly in order from
/// the first restart point; there is no way to decode entry `i` without
/// having decoded everything before it since the last restart. Since a full
/// scan visits every entry anyway, this always starts at the block's first
/// restart point rather than tracking the full restart array.
///
/// Owns the decoded block buffer so callers don't have to keep it alive
/// separately; once the iterator is dropped the buffer goes with it.
pub struct BlockIter {
    raw: Vec<u8>,
    restart_array_offset: usize,
    pos: usize,
    key: Vec<u8>,
    done: bool,
}

impl BlockIter {
    /// Validates `raw`'s restart footer and positions a cursor at the first
    /// entry. Returns `Status::Corruption` if the footer itself doesn't fit
    /// inside the buffer; per-entry corruption is instead surfaced lazily
    /// as an `Err` item from the iterator.
    pub fn new(raw: Vec<u8>) -> Result<Self> {
        if raw.len() < 4 {
            return Err(corrupt("block too short to hold a restart count"));
        }
        let restart_count = decode_fixed_32(&raw[raw.len() - 4..]) as usize;
        let restart_array_bytes = restart_count
            .checked_add(1)
            .and_then(|n| n.checked_mul(4))
            .ok_or_else(|| corrupt("restart count overflows block size"))?;
        if raw.len() < restart_array_bytes {
            return Err(corrupt("block shorter than its own restart array"));
        }
        let restart_array_offset = raw.len() - restart_array_bytes;

        let first_entry_offset =
            decode_fixed_i32(&raw[restart_array_offset..restart_array_offset + 4]);
        if first_entry_offset < 0 || first_entry_offset as usize > restart_array_offset {
            return Err(corrupt("first restart point out of range"));
        }

        Ok(BlockIter {
            raw,
            restart_array_offset,
            pos: first_entry_offset as usize,
            key: Vec::new(),
            done: false,
        })
    }

    fn decode_one(&mut self) -> Result<(Vec<u8>, Vec<u8>)> {
        let mut cursor = Cursor::new(self.raw.as_slice());
        cursor.set_position(self.pos as u64);

        let shared = read_varint32(&mut cursor)
            .ok_or_else(|| corrupt("truncated entry header (shared length)"))? as usize;
        let non_shared = read_varint32(&mut cursor)
            .ok_or_else(|| corrupt("truncated entry header (non-shared length)"))? as usize;
        let value_len = read_varint32(&mut cursor)
            .ok_or_else(|| corrupt("truncated entry header (value length)"))? as usize;

        if shared > self.key.len() {
            return Err(corrupt("shared prefix longer than the previous key"));
        }
        self.key.truncate(shared);

        let suffix_start = cursor.position() as usize;
        let suffix_end = suffix_start
            .checked_add(non_shared)
            .ok_or_else(|| corrupt("key suffix length overflows block"))?;
        if suffix_end > self.raw.len() {
            return Err(corrupt("key suffix runs past end of block"));
        }
        self.key.extend_from_slice(&self.raw[suffix_start..suffix_end]);

        let value_start = suffix_end;
        let value_end = value_start
            .checked_add(value_len)
            .ok_or_else(|| corrupt("value length overflows block"))?;
        if value_end > self.raw.len() {
            return Err(corrupt("value runs past end of block"));
        }
        let value = self.raw[value_start..value_end].to_vec();

        self.pos = value_end;
        Ok((self.key.clone(), value))
    }
}

impl Iterator for BlockIter {
    type Item = Result<(Vec<u8>, Vec<u8>)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.pos >= self.restart_array_offset {
            return None;
        }
        match self.decode_one() {
            Ok(entry) => Some(Ok(entry)),
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
