//! Factory for collated writers.
//!
//! `WriterContext` takes a parallel context, a formatter and writer options,
//! and decides once which write strategy applies:
//!
//! - a distributed context (MPI or rayon) gets [`SingleFileWriter`]: size
//!   negotiation, padding and one positioned record per rank;
//! - `UniverseComm::Serial` gets [`SerialFileWriter`]: the report is written
//!   verbatim.
//!
//! # Example
//! ```rust
//! use collate_io::{
//!     CollatedWrite, ProfileData, RegionTiming, TableFormatter, UniverseComm, WriterContext,
//!     WriterKind, WriterOptions,
//! };
//!
//! let dir = std::env::temp_dir();
//! let opts = WriterOptions::new("doc-example").with_output_dir(&dir);
//! let mut writer = WriterContext::new(UniverseComm::Serial, TableFormatter::default(), opts);
//! assert_eq!(writer.kind(), WriterKind::Serial);
//!
//! let mut data = ProfileData::default();
//! data.push(RegionTiming::new("main", 1, 0.5, 0.5));
//! writer.write(&data).unwrap();
//! ```

use std::path::PathBuf;

use crate::collate::{CollatedWrite, SerialFileWriter, SingleFileWriter, WriteOutcome, WriteStage};
use crate::config::WriterOptions;
use crate::error::Result;
use crate::format::Formatter;
use crate::parallel::{Comm, UniverseComm};

/// Write strategy chosen for a context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriterKind {
    /// One padded record per rank in a shared file
    SingleFile,
    /// Unpadded report from a single process
    Serial,
}

/// Context holding the selected collated writer.
pub enum WriterContext<F> {
    SingleFile(SingleFileWriter<UniverseComm, F>),
    Serial(SerialFileWriter<UniverseComm, F>),
}

impl<F> WriterContext<F>
where
    F: Formatter<UniverseComm>,
{
    /// Build the writer matching how `comm` was constructed.
    pub fn new(comm: UniverseComm, formatter: F, options: WriterOptions) -> Self {
        if comm.is_distributed() {
            tracing::debug!(
                rank = comm.rank(),
                size = comm.size(),
                "using single-file collated writer"
            );
            WriterContext::SingleFile(SingleFileWriter::new(comm, formatter, options))
        } else {
            tracing::debug!("no parallel context; using serial writer");
            WriterContext::Serial(SerialFileWriter::new(comm, formatter, options))
        }
    }

    pub fn kind(&self) -> WriterKind {
        match self {
            WriterContext::SingleFile(_) => WriterKind::SingleFile,
            WriterContext::Serial(_) => WriterKind::Serial,
        }
    }
}

impl<F> CollatedWrite for WriterContext<F>
where
    F: Formatter<UniverseComm>,
{
    type Data = F::Data;

    fn write(&mut self, data: &F::Data) -> Result<WriteOutcome> {
        match self {
            WriterContext::SingleFile(w) => w.write(data),
            WriterContext::Serial(w) => w.write(data),
        }
    }

    fn output_path(&self) -> PathBuf {
        match self {
            WriterContext::SingleFile(w) => w.output_path(),
            WriterContext::Serial(w) => w.output_path(),
        }
    }

    fn stage(&self) -> WriteStage {
        match self {
            WriterContext::SingleFile(w) => w.stage(),
            WriterContext::Serial(w) => w.stage(),
        }
    }
}
