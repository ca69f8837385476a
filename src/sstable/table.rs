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

//! Reads a `.ldb`/`.sst` table file end to end and yields its records.
//!
//! The read path is: seek to the footer, decode the index handle, read and
//! decode the index block to learn every data block's handle, then read and
//! decode each data block in turn, lazily, as the caller asks for more
//! records. The metaindex block's handle is decoded from the footer (so
//! callers that need it in the future have it for free) but never read,
//! since nothing here consumes filter metadata.

use crate::error::{Error, Result, Status};
use crate::record::{Origin, Record, RecordState};
use crate::sstable::block::BlockIter;
use crate::sstable::{BlockHandle, Footer, BLOCK_TRAILER_SIZE, FOOTER_ENCODED_LENGTH};
use crate::snappy;
use crate::util::coding::decode_fixed_64;
use log::warn;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

const NO_COMPRESSION: u8 = 0;

/// Lazily reads every record out of a table file: the footer and index
/// block are decoded up front (both are small, bounded-size structures),
/// but each data block is only fetched and decompressed when the caller
/// asks for the records it contains. At most one decoded data block is
/// held in memory at a time.
pub struct TableRecordIter {
    file: File,
    path: PathBuf,
    index_entries: std::vec::IntoIter<(Vec<u8>, Vec<u8>)>,
    current: Option<BlockIter>,
}

impl TableRecordIter {
    /// Opens `path` and decodes its footer and index block.
    ///
    /// # Error
    /// Fails immediately (before any record is yielded) if the file is too
    /// short to hold a footer, the footer's magic doesn't match, or the
    /// index block itself is corrupt: without a valid index there is no
    /// way to locate any data block at all.
    pub fn open(path: &Path) -> Result<Self> {
        let mut file = File::open(path)?;
        let len = file.metadata()?.len();
        if len < FOOTER_ENCODED_LENGTH as u64 {
            return Err(Error::new(
                Status::Corruption,
                Some("file too short to hold a table footer"),
            ));
        }

        let mut footer_buf = vec![0u8; FOOTER_ENCODED_LENGTH];
        file.seek(SeekFrom::Start(len - FOOTER_ENCODED_LENGTH as u64))?;
        file.read_exact(&mut footer_buf)?;
        let (footer, _) = Footer::decode_from(&footer_buf)?;

        let index_data = read_block(&mut file, &footer.index_handle)?;
        let index_entries: Vec<(Vec<u8>, Vec<u8>)> =
            BlockIter::new(index_data)?.collect::<Result<Vec<_>>>()?;

        Ok(TableRecordIter {
            file,
            path: path.to_path_buf(),
            index_entries: index_entries.into_iter(),
            current: None,
        })
    }
}

impl Iterator for TableRecordIter {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Result<Record>> {
        loop {
            if let Some(block_iter) = self.current.as_mut() {
                match block_iter.next() {
                    Some(Ok((key, value))) => return Some(Ok(record_from_entry(key, value))),
                    Some(Err(e)) => {
                        warn!("{}: skipping malformed data block entry: {}", self.path.display(), e);
                        self.current = None;
                        continue;
                    }
                    None => {
                        self.current = None;
                    }
                }
            }

            let (_separator_key, handle_bytes) = self.index_entries.next()?;
            let handle = match BlockHandle::decode_from(&handle_bytes) {
                Ok((h, _)) => h,
                Err(e) => {
                    warn!("{}: skipping index entry with bad block handle: {}", self.path.display(), e);
                    continue;
                }
            };
            let data = match read_block(&mut self.file, &handle) {
                Ok(d) => d,
                Err(e) => {
                    warn!("{}: skipping unreadable data block at offset {}: {}", self.path.display(), handle.offset(), e);
                    continue;
                }
            };
            match BlockIter::new(data) {
                Ok(it) => self.current = Some(it),
                Err(e) => {
                    warn!("{}: skipping malformed data block at offset {}: {}", self.path.display(), handle.offset(), e);
                    continue;
                }
            }
        }
    }
}

/// Reads the raw bytes of `handle` from `file` and, if its trailer marks
/// them Snappy-compressed, decompresses them. The trailing 4-byte CRC is
/// consumed but never checked.
fn read_block(file: &mut File, handle: &BlockHandle) -> Result<Vec<u8>> {
    file.seek(SeekFrom::Start(handle.offset()))?;
    let mut payload = vec![0u8; handle.size() as usize];
    file.read_exact(&mut payload)?;
    let mut trailer = [0u8; BLOCK_TRAILER_SIZE];
    file.read_exact(&mut trailer)?;

    if trailer[0] == NO_COMPRESSION {
        Ok(payload)
    } else {
        snappy::decompress(&payload)
    }
}

/// Splits the trailing 8-byte sequence/state suffix off a table key and
/// builds the corresponding [`Record`].
fn record_from_entry(key: Vec<u8>, value: Vec<u8>) -> Record {
    if key.len() < 8 {
        return Record::new(key, value, 0, RecordState::Unknown, Origin::Table);
    }
    let tag = decode_fixed_64(&key[key.len() - 8..]);
    let seq = tag >> 8;
    let state = if (tag & 0xFF) == 0 {
        RecordState::Deleted
    } else {
        RecordState::Live
    };
    Record::new(key, value, seq, state, Origin::Table)
}

/// Convenience wrapper used by callers (and tests) that want every record
/// of a table file collected eagerly, stopping at the first file-level
/// error.
pub fn read_records(path: &Path) -> Result<Vec<Record>> {
    TableRecordIter::open(path)?.collect()
}
