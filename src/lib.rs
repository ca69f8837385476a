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

#![allow(clippy::unreadable_literal)]

//! A read-only scanner for LevelDB database directories: decodes `.ldb`/
//! `.sst` sorted-table files and `.log` write-ahead log files, including
//! their Snappy-compressed blocks, and yields the raw records they
//! contain. Built for forensic inspection of the LevelDB stores Chromium
//! keeps for its profile data (sync, IndexedDB, session storage, ...): no
//! manifest handling, no compaction, no merged/sorted view across files —
//! just whatever a directory listing can still tell you.
//!
//! ```no_run
//! for record in leveldb_scan::iter_records("/path/to/leveldb/dir").unwrap() {
//!     let record = record.unwrap();
//!     println!("{:?} => {:?}", record.user_key(), record.value);
//! }
//! ```

#[macro_use]
extern crate log;

pub mod error;
mod record;
mod scanner;
mod snappy;
pub mod sstable;
mod util;
mod wal;

use std::path::Path;

pub use error::{Error, Result, Status};
pub use record::{Origin, Record, RecordState};
pub use scanner::DirRecordIter as RecordIter;

/// Scans `dir` and returns a lazy iterator over every record recoverable
/// from the table and log files it contains, ordered by ascending file
/// number.
///
/// This is the crate's one entry point. Individual file readers
/// ([`sstable::table::TableRecordIter`], `wal::LogRecordIter`) are
/// available to callers who already know which single file they want, but
/// most callers want the whole-directory view this function gives.
///
/// The returned iterator opens at most one file at a time and holds no
/// more than one physical block's worth of data in memory; dropping it
/// before exhaustion releases whatever file is currently open. A per-file
/// read failure (bad footer, bad magic, unreadable index) is yielded as a
/// final `Err` item and the scan then stops, even if files with higher
/// file numbers remain unread; restart a new scan (skipping the offending
/// file) to recover what's past it.
///
/// # Error
/// The outer `Result` only ever carries `Status::NotADirectory`, raised
/// before any file is opened if `dir` does not exist or is not a
/// directory.
pub fn iter_records<P: AsRef<Path>>(dir: P) -> Result<RecordIter> {
    scanner::iter_records(dir.as_ref())
}
