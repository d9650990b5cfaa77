//! Fixed-width records and per-rank views of the shared file.
//!
//! Every rank addresses the shared file in units of one [`RecordType`]: a
//! contiguous block of `width` bytes. Rank `r` owns exactly the window
//! `[r * width, (r + 1) * width)`, so concurrent writers never overlap and
//! no locking is needed.

use std::fs::{File, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::ops::Range;
use std::path::{Path, PathBuf};

use bitflags::bitflags;

use crate::error::{CollateError, Result};

bitflags! {
    /// Access mode used when opening the shared file.
    #[derive(Copy, Clone, Debug, PartialEq, Eq)]
    pub struct OpenMode: u32 {
        const WRITE_ONLY = 0b0001;
        const CREATE     = 0b0010;
        const TRUNCATE   = 0b0100;
        /// Used once by rank 0 before any view is opened.
        const CREATE_NEW_CONTENT =
            Self::WRITE_ONLY.bits() | Self::CREATE.bits() | Self::TRUNCATE.bits();
    }
}

impl OpenMode {
    pub fn open_options(self) -> OpenOptions {
        let mut opts = OpenOptions::new();
        opts.write(self.contains(OpenMode::WRITE_ONLY))
            .create(self.contains(OpenMode::CREATE))
            .truncate(self.contains(OpenMode::TRUNCATE));
        opts
    }

    pub fn open(self, path: &Path) -> Result<File> {
        self.open_options()
            .open(path)
            .map_err(|e| CollateError::file_access(path, e))
    }
}

/// Byte range owned by `rank` for records of `width` bytes.
pub fn placement(rank: usize, width: usize) -> Range<u64> {
    let start = rank as u64 * width as u64 * std::mem::size_of::<u8>() as u64;
    start..start + width as u64
}

/// Right-pads `fragment` with `fill` to exactly `width` bytes.
///
/// Never truncates: a fragment wider than the record is an error.
pub fn pad_record(mut fragment: Vec<u8>, width: usize, fill: u8) -> Result<Vec<u8>> {
    if fragment.len() > width {
        return Err(CollateError::RecordOverflow { len: fragment.len(), width });
    }
    fragment.resize(width, fill);
    Ok(fragment)
}

/// A contiguous block of `width` bytes.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RecordType {
    pub width: usize,
}

impl RecordType {
    pub fn new(width: usize) -> Self {
        Self { width }
    }

    /// Byte offset of `rank`'s record.
    pub fn displacement(&self, rank: usize) -> u64 {
        placement(rank, self.width).start
    }

    /// Size of a file holding one record per rank of a `size`-rank group.
    pub fn file_len(&self, size: usize) -> u64 {
        size as u64 * self.width as u64
    }
}

/// One rank's window onto the shared file.
///
/// Accepts exactly one record. The file handle is closed when the view is
/// dropped.
#[derive(Debug)]
pub struct RecordView {
    file: File,
    path: PathBuf,
    rank: usize,
    record: RecordType,
    written: bool,
}

impl RecordView {
    /// Opens `path` (which must already exist) restricted to `rank`'s window.
    pub fn open(path: &Path, rank: usize, record: RecordType) -> Result<Self> {
        let file = OpenMode::WRITE_ONLY.open(path)?;
        Ok(Self { file, path: path.to_path_buf(), rank, record, written: false })
    }

    pub fn window(&self) -> Range<u64> {
        placement(self.rank, self.record.width)
    }

    /// Writes `record` at the start of the window.
    pub fn write_record(&mut self, record: &[u8]) -> Result<usize> {
        if self.written {
            return Err(CollateError::ViewExhausted { rank: self.rank });
        }
        if record.len() != self.record.width {
            return Err(CollateError::RecordOverflow {
                len: record.len(),
                width: self.record.width,
            });
        }
        let offset = self.record.displacement(self.rank);
        tracing::trace!(rank = self.rank, offset, len = record.len(), "positioned write");
        self.file
            .seek(SeekFrom::Start(offset))
            .and_then(|_| self.file.write_all(record))
            .and_then(|_| self.file.flush())
            .map_err(|e| CollateError::file_access(&self.path, e))?;
        self.written = true;
        Ok(record.len())
    }
}
