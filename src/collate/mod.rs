//! The collective single-file write protocol.
//!
//! - [`negotiate`]: group max-reduction of report lengths.
//! - [`record`]: record type, padding, placement and per-rank views.
//! - [`writer`]: the distributed and serial writers.

pub mod negotiate;
pub use negotiate::negotiate_record_width;

pub mod record;
pub use record::{OpenMode, RecordType, RecordView, pad_record, placement};

pub mod writer;
pub use writer::{CollatedWrite, SerialFileWriter, SingleFileWriter, WriteOutcome, WriteStage};
