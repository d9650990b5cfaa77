//! collate-io: one collated report file from a group of parallel processes.
//!
//! Every rank formats its own report, the group agrees on the widest one,
//! and each rank writes its report padded to that width at offset
//! `rank * width` in a single shared file. Backends for MPI and for
//! in-process rayon thread groups are selected by cargo feature.

pub mod parallel;

pub mod collate;
pub mod config;
pub mod context;
pub mod error;
pub mod format;

// Re-exports for convenience
pub use collate::*;
pub use config::*;
pub use context::*;
pub use error::*;
pub use format::*;
pub use parallel::{Comm, UniverseComm};
