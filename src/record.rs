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

//! The one public data type this crate produces.

/// Tombstone state of a record, as tagged by the writer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordState {
    Deleted,
    Live,
    /// Table keys shorter than the 8-byte metadata suffix carry no tag at
    /// all; log records whose state byte is neither 0 nor 1 are likewise
    /// unclassifiable.
    Unknown,
}

/// Which physical file format a [`Record`] was decoded from. Governs how
/// `user_key` is derived from `key`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// A `.ldb`/`.sst` sorted-table file. `key` carries an 8-byte trailing
    /// sequence/state suffix that `user_key` strips off.
    Table,
    /// A `.log` write-ahead log file. `key` is the bare user key already.
    Log,
}

/// A single key/value record recovered from a LevelDB table or log file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Raw key bytes as stored on disk. For [`Origin::Table`] records this
    /// includes the trailing 8-byte sequence/state suffix.
    pub key: Vec<u8>,
    /// Raw value bytes; empty for deletions.
    pub value: Vec<u8>,
    /// 56-bit sequence number assigned at write time.
    pub seq: u64,
    pub state: RecordState,
    pub origin: Origin,
}

impl Record {
    pub(crate) fn new(key: Vec<u8>, value: Vec<u8>, seq: u64, state: RecordState, origin: Origin) -> Self {
        Record { key, value, seq, state, origin }
    }

    /// The application-visible key: `key` with the 8-byte LevelDB metadata
    /// suffix stripped when this record came from a table file, or `key`
    /// unchanged for a log record (log keys never carry that suffix).
    pub fn user_key(&self) -> &[u8] {
        match self.origin {
            Origin::Table if self.key.len() >= 8 => &self.key[..self.key.len() - 8],
            _ => &self.key,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_key_strips_suffix_for_table_origin() {
        let key = b"hello\x01\x00\x00\x00\x00\x00\x00\x00".to_vec();
        let r = Record::new(key, vec![], 1, RecordState::Live, Origin::Table);
        assert_eq!(r.user_key(), b"hello");
    }

    #[test]
    fn user_key_unchanged_for_log_origin() {
        let key = b"hello".to_vec();
        let r = Record::new(key.clone(), vec![], 1, RecordState::Live, Origin::Log);
        assert_eq!(r.user_key(), key.as_slice());
    }

    #[test]
    fn user_key_unchanged_when_table_key_too_short() {
        let key = b"ab".to_vec();
        let r = Record::new(key.clone(), vec![], 1, RecordState::Unknown, Origin::Table);
        assert_eq!(r.user_key(), key.as_slice());
    }
}
