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

//! Reads a write-ahead `.log` file.
//!
//! A log file is a sequence of 32 KiB physical blocks. Each block holds one
//! or more 7-byte-header fragments (4-byte CRC, 2-byte little-endian
//! length, 1-byte type) whose payloads are reassembled into logical
//! batches: a lone `Full` fragment is a whole batch by itself, while
//! `First`/`Middle`/`Last` fragments concatenate across block boundaries.
//! Each reassembled batch is then a WriteBatch: a 12-byte header (8-byte
//! sequence number, 4-byte record count) followed by that many records.
//!
//! Truncation and corruption are tolerated rather than treated as errors: a
//! torn trailing fragment or batch just yields fewer records than the file
//! nominally promises. This mirrors the log writer's own behavior, which
//! can leave a torn record at the tail of the last block after a crash.
//! Reading is lazy and holds at most one physical block and one
//! reassembled batch buffer at a time, per the directory scanner's memory
//! bounds.

use crate::error::Result;
use crate::record::{Origin, Record, RecordState};
use crate::util::coding::{decode_fixed_32, decode_fixed_64};
use crate::util::varint::read_varint32;
use log::debug;
use std::collections::VecDeque;
use std::fs::File;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};

const BLOCK_SIZE: usize = 32768;
const HEADER_SIZE: usize = 7;

const FULL: u8 = 1;
const FIRST: u8 = 2;
const MIDDLE: u8 = 3;
const LAST: u8 = 4;

/// Lazily reads every record out of a log file, one reassembled batch at a
/// time.
pub struct LogRecordIter {
    file: File,
    path: PathBuf,
    buf: Vec<u8>,
    buf_len: usize,
    buf_pos: usize,
    in_record: bool,
    pending: Vec<u8>,
    eof: bool,
    queue: VecDeque<Record>,
}

impl LogRecordIter {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        Ok(LogRecordIter {
            file,
            path: path.to_path_buf(),
            buf: vec![0u8; BLOCK_SIZE],
            buf_len: 0,
            buf_pos: 0,
            in_record: false,
            pending: Vec::new(),
            eof: false,
            queue: VecDeque::new(),
        })
    }

    /// Fills `self.buf` with the next physical block, returning the number
    /// of bytes actually read (the final block of a log file is usually
    /// shorter than `BLOCK_SIZE`).
    fn refill(&mut self) -> Result<usize> {
        let mut total = 0;
        while total < self.buf.len() {
            let n = self.file.read(&mut self.buf[total..])?;
            if n == 0 {
                break;
            }
            total += n;
        }
        Ok(total)
    }

    /// Reassembles and returns the next whole batch payload, reading
    /// further physical blocks as needed. Returns `None` once the file is
    /// exhausted with no further batch to emit.
    fn next_batch(&mut self) -> Result<Option<Vec<u8>>> {
        loop {
            // Mirrors the writer's own per-block loop: a fragment header
            // never starts within the last 6 bytes of a block, since it
            // couldn't fit.
            if self.buf_pos >= BLOCK_SIZE.saturating_sub(6) || self.buf_pos + HEADER_SIZE > self.buf_len {
                self.buf_len = self.refill()?;
                self.buf_pos = 0;
                if self.buf_len == 0 {
                    self.eof = true;
                    return Ok(None);
                }
                continue;
            }

            let header_start = self.buf_pos;
            let header = &self.buf[header_start..header_start + HEADER_SIZE];
            let length = u16::from_le_bytes([header[4], header[5]]) as usize;
            let frag_type = header[6];
            let payload_start = header_start + HEADER_SIZE;

            if payload_start + length > self.buf_len {
                debug!(
                    "{}: fragment claims {} bytes but only {} remain in this block, stopping",
                    self.path.display(),
                    length,
                    self.buf_len.saturating_sub(payload_start)
                );
                // Force a refill of the next physical block.
                self.buf_pos = BLOCK_SIZE;
                continue;
            }
            let payload_end = payload_start + length;
            self.buf_pos = payload_end;

            match frag_type {
                FULL => {
                    self.in_record = false;
                    return Ok(Some(self.buf[payload_start..payload_end].to_vec()));
                }
                FIRST => {
                    if self.in_record {
                        debug!(
                            "{}: FIRST fragment arrived mid-record, discarding {} buffered bytes",
                            self.path.display(),
                            self.pending.len()
                        );
                    }
                    self.pending = self.buf[payload_start..payload_end].to_vec();
                    self.in_record = true;
                }
                MIDDLE => {
                    if self.in_record {
                        self.pending.extend_from_slice(&self.buf[payload_start..payload_end]);
                    }
                }
                LAST => {
                    if self.in_record {
                        self.pending.extend_from_slice(&self.buf[payload_start..payload_end]);
                        self.in_record = false;
                        return Ok(Some(std::mem::take(&mut self.pending)));
                    }
                }
                other => {
                    debug!("{}: unknown log fragment type {}, skipping", self.path.display(), other);
                }
            }
        }
    }
}

impl Iterator for LogRecordIter {
    type Item = Record;

    fn next(&mut self) -> Option<Record> {
        loop {
            if let Some(r) = self.queue.pop_front() {
                return Some(r);
            }
            if self.eof {
                return None;
            }
            let batch = match self.next_batch() {
                Ok(Some(b)) => b,
                Ok(None) => return None,
                Err(_) => {
                    self.eof = true;
                    return None;
                }
            };
            decode_batch(&batch, &self.path, &mut self.queue);
        }
    }
}

/// Reads every record out of the log file at `path`, eagerly.
pub fn read_records(path: &Path) -> Result<Vec<Record>> {
    Ok(LogRecordIter::open(path)?.collect())
}

/// Decodes one reassembled batch payload into its records, appending them
/// to `out`. Stops (without erroring) at the first field that doesn't fit,
/// on the theory that a torn trailing record is expected, not exceptional.
fn decode_batch(batch: &[u8], path: &Path, out: &mut VecDeque<Record>) {
    if batch.len() < 12 {
        debug!("{}: log batch shorter than its header, discarding", path.display());
        return;
    }
    let base_seq = decode_fixed_64(&batch[..8]);
    let count = decode_fixed_32(&batch[8..12]) as u64;
    let mut cursor = Cursor::new(&batch[12..]);

    for i in 0..count {
        let state_byte = read_n(&mut cursor, 1);
        if state_byte.is_empty() {
            debug!(
                "{}: batch base_seq={} truncated at record {} (state byte), stopping",
                path.display(),
                base_seq,
                i
            );
            break;
        }
        let state = match state_byte[0] {
            0 => RecordState::Deleted,
            1 => RecordState::Live,
            _ => RecordState::Unknown,
        };

        let key_len = match read_varint32(&mut cursor) {
            Some(v) => v as usize,
            None => {
                debug!(
                    "{}: batch base_seq={} truncated at record {} (key length), stopping",
                    path.display(),
                    base_seq,
                    i
                );
                break;
            }
        };
        let key = read_n(&mut cursor, key_len);

        let value = if state != RecordState::Deleted {
            let value_len = match read_varint32(&mut cursor) {
                Some(v) => v as usize,
                None => {
                    debug!(
                        "{}: batch base_seq={} truncated at record {} (value length), stopping",
                        path.display(),
                        base_seq,
                        i
                    );
                    break;
                }
            };
            read_n(&mut cursor, value_len)
        } else {
            Vec::new()
        };

        out.push_back(Record::new(key, value, base_seq + i, state, Origin::Log));
    }
}

/// Reads up to `n` bytes from `cursor`, returning fewer if the buffer is
/// exhausted rather than failing.
fn read_n(cursor: &mut Cursor<&[u8]>, n: usize) -> Vec<u8> {
    let mut buf = vec![0u8; n];
    let read = cursor.read(&mut buf).unwrap_or(0);
    buf.truncate(read);
    buf
}
