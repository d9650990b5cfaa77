//! Writer configuration.

pub mod options;
pub use options::{DEFAULT_SUFFIX, WriterOptions};
