//! Report formatting.
//!
//! The collated writer treats the formatter as a black box: it is handed an
//! output buffer, the caller's data and the parallel context, and appends a
//! finite byte sequence. Nothing about the content is assumed.

use thiserror::Error;

use crate::parallel::Comm;

pub mod table;
pub use table::{ProfileData, RegionTiming, TableFormatter};

#[derive(Error, Debug)]
pub enum FormatError {
    #[error("region name {name:?} is wider than the {width}-column routine field")]
    ColumnOverflow { name: String, width: usize },
    #[error("invalid value for region {name:?}: {reason}")]
    InvalidValue { name: String, reason: &'static str },
    #[error("{0}")]
    Custom(String),
    #[error("write to report buffer failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Appends a formatted report for `data` to `out`.
pub trait Formatter<C: Comm + ?Sized> {
    type Data;
    fn format(&self, out: &mut Vec<u8>, data: &Self::Data, comm: &C) -> Result<(), FormatError>;
}

/// Plain closures over a fixed data type.
pub struct FnFormatter<D, F> {
    f: F,
    _data: std::marker::PhantomData<fn(&D)>,
}

impl<D, F> FnFormatter<D, F> {
    pub fn new(f: F) -> Self {
        Self { f, _data: std::marker::PhantomData }
    }
}

impl<C, D, F> Formatter<C> for FnFormatter<D, F>
where
    C: Comm + ?Sized,
    F: Fn(&mut Vec<u8>, &D, &C) -> Result<(), FormatError>,
{
    type Data = D;
    fn format(&self, out: &mut Vec<u8>, data: &D, comm: &C) -> Result<(), FormatError> {
        (self.f)(out, data, comm)
    }
}
