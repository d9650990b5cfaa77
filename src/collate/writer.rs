//! Single-file collated writers.
//!
//! Two implementations of [`CollatedWrite`]:
//!
//! - [`SingleFileWriter`]: every rank negotiates a record width, pads its
//!   report to that width and writes it into its own window of one shared
//!   file.
//! - [`SerialFileWriter`]: no parallel context; the report is written to the
//!   file verbatim, without padding or record structure.
//!
//! Which one runs is decided once, when the writer is built (see
//! [`WriterContext`](crate::context::WriterContext)).

use std::fmt;
use std::fs::File;
use std::io::Write;
use std::ops::Range;
use std::path::{Path, PathBuf};

use crate::collate::negotiate::{all_ok, negotiate_record_width};
use crate::collate::record::{OpenMode, RecordType, RecordView, pad_record, placement};
use crate::config::WriterOptions;
use crate::error::{CollateError, Result};
use crate::format::Formatter;
use crate::parallel::Comm;

/// Progress of one write call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteStage {
    Idle,
    Formatting,
    Negotiating,
    Viewing,
    Writing,
    LocalWriting,
    Closed,
}

impl WriteStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            WriteStage::Idle => "idle",
            WriteStage::Formatting => "formatting",
            WriteStage::Negotiating => "negotiating",
            WriteStage::Viewing => "viewing",
            WriteStage::Writing => "writing",
            WriteStage::LocalWriting => "local writing",
            WriteStage::Closed => "closed",
        }
    }
}

impl fmt::Display for WriteStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a successful write produced on this rank.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteOutcome {
    pub path: PathBuf,
    /// Negotiated width; `None` when the file has no record structure.
    pub record_width: Option<usize>,
    /// Bytes of the file written by this rank.
    pub placement: Range<u64>,
    pub bytes_written: usize,
    /// Size of the complete file once every rank has written.
    pub file_len: u64,
}

/// Writes one collated file per call.
pub trait CollatedWrite {
    type Data;
    /// Formats `data` and writes it into the collated file.
    ///
    /// Any error means no usable file was produced.
    fn write(&mut self, data: &Self::Data) -> Result<WriteOutcome>;
    fn output_path(&self) -> PathBuf;
    /// Stage reached by the most recent call.
    fn stage(&self) -> WriteStage;
}

fn format_report<C, F>(formatter: &F, data: &F::Data, comm: &C) -> Result<Vec<u8>>
where
    C: Comm,
    F: Formatter<C>,
{
    let mut buffer = Vec::new();
    formatter.format(&mut buffer, data, comm).map_err(|e| {
        tracing::warn!(rank = comm.rank(), "report formatting failed: {e}");
        CollateError::from(e)
    })?;
    Ok(buffer)
}

/// Collated writer for a process group.
pub struct SingleFileWriter<C, F> {
    comm: C,
    formatter: F,
    options: WriterOptions,
    stage: WriteStage,
}

impl<C, F> SingleFileWriter<C, F>
where
    C: Comm,
    F: Formatter<C>,
{
    /// A configured `collective_timeout` replaces the one `comm` carries.
    pub fn new(mut comm: C, formatter: F, options: WriterOptions) -> Self {
        if let Some(timeout) = options.collective_timeout {
            comm.set_collective_timeout(Some(timeout));
        }
        Self {
            comm,
            formatter,
            options,
            stage: WriteStage::Idle,
        }
    }

    pub fn comm(&self) -> &C {
        &self.comm
    }

    fn enter(&mut self, stage: WriteStage) {
        tracing::debug!(rank = self.comm.rank(), %stage, "collated write");
        self.stage = stage;
    }

    /// Rank 0 creates or truncates the file. The vote doubles as the
    /// barrier that keeps other ranks from opening it too early.
    fn prepare_file(&self, path: &Path) -> Result<()> {
        let created = if self.comm.rank() == 0 {
            OpenMode::CREATE_NEW_CONTENT.open(path).map(drop)
        } else {
            Ok(())
        };
        if !all_ok(&self.comm, created.is_ok())? {
            created?;
            return Err(CollateError::PeerWriteFailed {
                stage: WriteStage::Viewing.as_str(),
            });
        }
        Ok(())
    }

    fn write_own_record(
        &mut self,
        path: &Path,
        record: RecordType,
        padded: &[u8],
    ) -> Result<usize> {
        let rank = self.comm.rank();
        let mut view = RecordView::open(path, rank, record)?;
        self.enter(WriteStage::Writing);
        view.write_record(padded)
        // view dropped here: file handle closed on success and failure alike
    }
}

impl<C, F> CollatedWrite for SingleFileWriter<C, F>
where
    C: Comm,
    F: Formatter<C>,
{
    type Data = F::Data;

    fn write(&mut self, data: &F::Data) -> Result<WriteOutcome> {
        let rank = self.comm.rank();
        let path = self.output_path();

        self.enter(WriteStage::Formatting);
        let report = format_report(&self.formatter, data, &self.comm)?;

        self.enter(WriteStage::Negotiating);
        let width = negotiate_record_width(&self.comm, report.len())?;

        self.enter(WriteStage::Viewing);
        let record = RecordType::new(width);
        // Cannot overflow: width is the group maximum of every report length.
        let padded = pad_record(report, width, self.options.fill_byte)?;
        self.prepare_file(&path)?;

        let written = self.write_own_record(&path, record, &padded);
        if let Err(e) = &written {
            tracing::warn!(rank, path = %path.display(), "record write failed: {e}");
        }

        // Every rank votes, including one whose write failed, so nobody
        // reports success for an incomplete file.
        let group_ok = all_ok(&self.comm, written.is_ok());
        self.enter(WriteStage::Closed);
        let bytes_written = written?;
        if !group_ok? {
            return Err(CollateError::PeerWriteFailed {
                stage: WriteStage::Writing.as_str(),
            });
        }

        let window = placement(rank, width);
        tracing::debug!(
            rank,
            width,
            offset = window.start,
            path = %path.display(),
            "record committed"
        );
        Ok(WriteOutcome {
            path,
            record_width: Some(width),
            placement: window,
            bytes_written,
            file_len: record.file_len(self.comm.size()),
        })
    }

    fn output_path(&self) -> PathBuf {
        self.options.output_path()
    }

    fn stage(&self) -> WriteStage {
        self.stage
    }
}

/// Writer for a single process without a parallel context.
///
/// Output is the unpadded report; callers must not assume fixed-width
/// records in files written this way.
pub struct SerialFileWriter<C, F> {
    comm: C,
    formatter: F,
    options: WriterOptions,
    stage: WriteStage,
}

impl<C, F> SerialFileWriter<C, F>
where
    C: Comm,
    F: Formatter<C>,
{
    pub fn new(comm: C, formatter: F, options: WriterOptions) -> Self {
        Self {
            comm,
            formatter,
            options,
            stage: WriteStage::Idle,
        }
    }
}

impl<C, F> CollatedWrite for SerialFileWriter<C, F>
where
    C: Comm,
    F: Formatter<C>,
{
    type Data = F::Data;

    fn write(&mut self, data: &F::Data) -> Result<WriteOutcome> {
        let path = self.output_path();

        self.stage = WriteStage::Formatting;
        let report = format_report(&self.formatter, data, &self.comm)?;

        self.stage = WriteStage::LocalWriting;
        tracing::debug!(
            path = %path.display(),
            len = report.len(),
            "writing report without collation"
        );
        let mut file = File::create(&path).map_err(|e| CollateError::file_access(&path, e))?;
        let written = file
            .write_all(&report)
            .and_then(|_| file.flush())
            .map_err(|e| CollateError::file_access(&path, e));
        drop(file);
        self.stage = WriteStage::Closed;
        written?;

        Ok(WriteOutcome {
            path,
            record_width: None,
            placement: 0..report.len() as u64,
            bytes_written: report.len(),
            file_len: report.len() as u64,
        })
    }

    fn output_path(&self) -> PathBuf {
        self.options.output_path()
    }

    fn stage(&self) -> WriteStage {
        self.stage
    }
}
