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

use std::fmt;
use std::io;

/// Coarse classification of everything that can go wrong while scanning a
/// LevelDB directory. Kept as a flat enum (rather than per-module error
/// types) because callers generally only care about *which* of these they
/// hit, not which internal function noticed it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// The path handed to `iter_records` is not a directory.
    NotADirectory,
    /// A table file's 48-byte footer did not end in the expected magic
    /// number.
    BadMagic,
    /// A Snappy stream contained a truncated literal, a truncated copy
    /// header, or a copy with a zero offset.
    MalformedSnappy,
    /// A Snappy stream's declared uncompressed length did not match the
    /// number of bytes actually produced.
    LengthMismatch,
    /// A block handle, restart array, or other length-prefixed structure
    /// did not decode within the bounds of its containing buffer.
    Corruption,
    /// An underlying filesystem operation (open/seek/read) failed.
    Io,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Status::NotADirectory => "not a directory",
            Status::BadMagic => "bad magic number",
            Status::MalformedSnappy => "malformed snappy stream",
            Status::LengthMismatch => "snappy length mismatch",
            Status::Corruption => "corruption",
            Status::Io => "io error",
        };
        write!(f, "{}", s)
    }
}

/// A `Status` paired with an optional human-readable message and, for
/// `Status::Io`, the underlying `io::Error`.
///
/// Implemented as a plain struct rather than a derive-macro error crate:
/// the taxonomy here is small and fixed, and every call site already knows
/// which `Status` it's constructing.
#[derive(Debug)]
pub struct Error {
    status: Status,
    msg: Option<String>,
    source: Option<io::Error>,
}

impl Error {
    pub fn new(status: Status, msg: Option<&str>) -> Self {
        Error {
            status,
            msg: msg.map(str::to_owned),
            source: None,
        }
    }

    #[inline]
    pub fn status(&self) -> Status {
        self.status
    }

    #[inline]
    pub fn description(&self) -> &str {
        match &self.msg {
            Some(m) => m.as_str(),
            None => "",
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.msg {
            Some(m) => write!(f, "{}: {}", self.status, m),
            None => write!(f, "{}", self.status),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|e| e as &(dyn std::error::Error + 'static))
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error {
            status: Status::Io,
            msg: Some(e.to_string()),
            source: Some(e),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
