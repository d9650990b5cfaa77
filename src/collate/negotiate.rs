//! Record width negotiation.

use crate::error::{CollateError, Result};
use crate::parallel::Comm;

/// Agrees on the record width: the maximum of every rank's `local_len`.
///
/// Blocks until every rank has contributed. The returned value is identical
/// on all ranks; any failure of the reduction is fatal for the write.
pub fn negotiate_record_width<C: Comm + ?Sized>(comm: &C, local_len: usize) -> Result<usize> {
    let width = comm.all_reduce_max(local_len as u64)?;
    let width = usize::try_from(width).map_err(|_| CollateError::Negotiation {
        rank: comm.rank(),
        reason: format!("negotiated width {width} does not fit in memory"),
    })?;
    tracing::debug!(rank = comm.rank(), local_len, width, "record width negotiated");
    Ok(width)
}

/// True on every rank when every rank reports `ok`.
///
/// Acts as a barrier that also carries a vote, so a local failure reaches
/// every rank instead of leaving the others waiting.
pub fn all_ok<C: Comm + ?Sized>(comm: &C, ok: bool) -> Result<bool> {
    Ok(comm.all_reduce_max(u64::from(!ok))? == 0)
}
