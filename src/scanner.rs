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

//! Walks a LevelDB directory and yields every record from every data file
//! it contains, in file-number order.

use crate::error::{Error, Result, Status};
use crate::wal::LogRecordIter;
use crate::record::Record;
use crate::sstable::table::TableRecordIter;
use log::warn;
use std::path::{Path, PathBuf};

/// One data file found in a scanned directory.
struct Entry {
    file_number: u64,
    path: PathBuf,
    kind: Kind,
}

#[derive(Clone, Copy)]
enum Kind {
    Table,
    Log,
}

enum FileIter {
    Table(TableRecordIter),
    Log(LogRecordIter),
}

/// Lazily yields every record recoverable from a scanned directory,
/// ordered by ascending file number (oldest first), opening each file only
/// as the caller advances past the previous one's records.
///
/// A file-level error (bad footer, bad magic, unreadable index) is
/// surfaced as one final `Err` item and then the scan stops: it does not
/// open any further file, even if later file numbers remain in `entries`.
/// A caller that wants to keep going past a damaged file has to restart a
/// new scan itself (skipping the offending file number), since silently
/// continuing would make "the scan succeeded" ambiguous with "the scan
/// succeeded modulo files it gave up on."
pub struct DirRecordIter {
    entries: std::vec::IntoIter<Entry>,
    current: Option<FileIter>,
    done: bool,
}

impl Iterator for DirRecordIter {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Result<Record>> {
        if self.done {
            return None;
        }

        loop {
            if let Some(cur) = self.current.as_mut() {
                let item = match cur {
                    FileIter::Table(it) => it.next(),
                    FileIter::Log(it) => it.next().map(Ok),
                };
                match item {
                    Some(r) => return Some(r),
                    None => self.current = None,
                }
            }

            let entry = self.entries.next()?;
            match entry.kind {
                Kind::Table => match TableRecordIter::open(&entry.path) {
                    Ok(it) => self.current = Some(FileIter::Table(it)),
                    Err(e) => {
                        warn!("{}: aborting scan on unreadable table file: {}", entry.path.display(), e);
                        self.done = true;
                        return Some(Err(e));
                    }
                },
                Kind::Log => match LogRecordIter::open(&entry.path) {
                    Ok(it) => self.current = Some(FileIter::Log(it)),
                    Err(e) => {
                        warn!("{}: aborting scan on unreadable log file: {}", entry.path.display(), e);
                        self.done = true;
                        return Some(Err(e));
                    }
                },
            }
        }
    }
}

/// Scans `dir` for data files and returns a lazy iterator over every
/// record they contain. Enumerating and sorting the directory's file
/// names happens eagerly here (it's just names, not file contents); each
/// file's records are read only as the caller advances the returned
/// iterator.
pub fn iter_records(dir: &Path) -> Result<DirRecordIter> {
    if !dir.is_dir() {
        return Err(Error::new(
            Status::NotADirectory,
            Some(&format!("{} is not a directory", dir.display())),
        ));
    }

    let mut entries = Vec::new();
    for dirent in std::fs::read_dir(dir)? {
        let dirent = dirent?;
        let path = dirent.path();
        if !dirent.file_type()?.is_file() {
            continue;
        }
        if let Some(entry) = classify(&path) {
            entries.push(entry);
        }
    }
    entries.sort_by_key(|e| e.file_number);

    Ok(DirRecordIter {
        entries: entries.into_iter(),
        current: None,
        done: false,
    })
}

/// Matches `NNNNNN.ldb`, `NNNNNN.log`, or `NNNNNN.sst` (six ASCII digits)
/// and, if it matches, parses the stem as a **hexadecimal** file number.
///
/// Decimal would be the natural reading of six digits, but LevelDB itself
/// names files this way and forensic tooling built against real
/// directories must sort them the same way it does.
fn classify(path: &Path) -> Option<Entry> {
    let name = path.file_name()?.to_str()?;
    let stem = name.get(..6)?;
    if stem.len() != 6 || !stem.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let rest = &name[6..];
    let kind = match rest {
        ".ldb" | ".sst" => Kind::Table,
        ".log" => Kind::Log,
        _ => return None,
    };
    let file_number = u64::from_str_radix(stem, 16).ok()?;
    Some(Entry {
        file_number,
        path: path.to_path_buf(),
        kind,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Status;
    use tempfile::tempdir;

    #[test]
    fn rejects_non_directory() {
        let tmp = tempdir().unwrap();
        let file_path = tmp.path().join("000001.log");
        std::fs::write(&file_path, b"").unwrap();
        let err = iter_records(&file_path).unwrap_err();
        assert_eq!(err.status(), Status::NotADirectory);
    }

    #[test]
    fn ignores_unrelated_files() {
        let tmp = tempdir().unwrap();
        std::fs::write(tmp.path().join("CURRENT"), b"MANIFEST-000001\n").unwrap();
        std::fs::write(tmp.path().join("LOG"), b"").unwrap();
        std::fs::write(tmp.path().join("000001.tmp"), b"").unwrap();
        let records: Vec<_> = iter_records(tmp.path()).unwrap().collect();
        assert!(records.is_empty());
    }

    #[test]
    fn file_number_is_parsed_as_hexadecimal() {
        let path = Path::new("00001a.log");
        let entry = classify(path).unwrap();
        assert_eq!(entry.file_number, 0x1a);
    }

    #[test]
    fn aborts_scan_after_an_unreadable_table_file() {
        let tmp = tempdir().unwrap();
        std::fs::write(tmp.path().join("000001.ldb"), b"not a real table").unwrap();

        // A later file with a real record: if the scan kept going past the
        // bad .ldb this record would show up in the results, so its
        // absence is what proves the scan actually stopped.
        let mut batch = Vec::new();
        batch.extend_from_slice(&1u64.to_le_bytes());
        batch.extend_from_slice(&1u32.to_le_bytes());
        batch.push(1); // Live
        batch.push(1); // key len
        batch.push(b'a');
        batch.push(1); // value len
        batch.push(b'1');
        let mut block = vec![0u8; 4];
        block.extend_from_slice(&(batch.len() as u16).to_le_bytes());
        block.push(1); // FULL
        block.extend_from_slice(&batch);
        block.resize(32768, 0);
        std::fs::write(tmp.path().join("000002.log"), &block).unwrap();

        let mut it = iter_records(tmp.path()).unwrap();
        let first = it.next().unwrap();
        assert!(first.is_err(), "the unreadable .ldb should surface as an error");
        assert!(
            it.next().is_none(),
            "the scan must not continue to 000002.log after the error"
        );
    }

    #[test]
    fn scan_is_lazy_and_opens_files_on_demand() {
        let tmp = tempdir().unwrap();

        let mut batch = Vec::new();
        batch.extend_from_slice(&1u64.to_le_bytes());
        batch.extend_from_slice(&1u32.to_le_bytes());
        batch.push(1); // Live
        batch.push(1); // key len
        batch.push(b'a');
        batch.push(1); // value len
        batch.push(b'1');
        let mut block = vec![0u8; 4];
        block.extend_from_slice(&(batch.len() as u16).to_le_bytes());
        block.push(1); // FULL
        block.extend_from_slice(&batch);
        block.resize(32768, 0);
        std::fs::write(tmp.path().join("000001.log"), &block).unwrap();

        // A second log file that would fail to even open as a directory
        // entry if it were read eagerly up front; since the scan is lazy,
        // taking only the first record must not touch it.
        std::fs::write(tmp.path().join("000002.log"), b"").unwrap();
        std::fs::remove_file(tmp.path().join("000002.log")).unwrap();

        let mut it = iter_records(tmp.path()).unwrap();
        let first = it.next().unwrap().unwrap();
        assert_eq!(first.user_key(), b"a");
    }
}
