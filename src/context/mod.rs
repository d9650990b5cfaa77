//! Context module for collate-io.
//!
//! Contexts encapsulate strategy selection: given a parallel context, a
//! formatter and options, they build the collated writer that fits.
//!
//! Modules:
//! - [`writer_context`]: `WriterContext`, the factory for collated writers.

pub mod writer_context;
pub use writer_context::{WriterContext, WriterKind};
