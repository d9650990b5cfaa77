//! Parallel execution context.
//!
//! A `Comm` exposes this process's rank, the group size and the two
//! collectives the collated writer needs: a barrier and a max-reduction.
//! Backends are selected at build time through cargo features, mirroring how
//! the group itself is launched:
//!
//! - `mpi`: one OS process per rank, MPI world communicator.
//! - `rayon`: one rank per pool thread inside a single process.
//! - `Serial`: no group at all; always available.

use std::time::Duration;

use crate::error::Result;

pub trait Comm {
    fn rank(&self) -> usize;
    fn size(&self) -> usize;
    /// Blocks until every rank has arrived.
    fn barrier(&self) -> Result<()> {
        self.all_reduce_max(0).map(|_| ())
    }
    /// Group-wide maximum of `x`; every rank receives the same value.
    fn all_reduce_max(&self, x: u64) -> Result<u64>;
    /// Bounds later collectives on this member; `None` waits forever.
    /// Backends without timeout support ignore it.
    fn set_collective_timeout(&mut self, _timeout: Option<Duration>) {}
}

#[cfg(feature = "mpi")]
pub mod mpi_comm;
#[cfg(feature = "mpi")]
pub use mpi_comm::MpiComm;

#[cfg(feature = "rayon")]
pub mod rayon_comm;
#[cfg(feature = "rayon")]
pub use rayon_comm::RayonComm;

/// The parallel context a writer is built from.
pub enum UniverseComm {
    #[cfg(feature = "mpi")]
    Mpi(MpiComm),
    #[cfg(feature = "rayon")]
    Rayon(RayonComm),
    /// Single process without a parallel context.
    Serial,
}

impl UniverseComm {
    /// True when the context spans a process group and collectives apply.
    pub fn is_distributed(&self) -> bool {
        !matches!(self, UniverseComm::Serial)
    }
}

impl Comm for UniverseComm {
    fn rank(&self) -> usize {
        match self {
            #[cfg(feature = "mpi")]
            UniverseComm::Mpi(comm) => comm.rank(),
            #[cfg(feature = "rayon")]
            UniverseComm::Rayon(comm) => comm.rank(),
            UniverseComm::Serial => 0,
        }
    }
    fn size(&self) -> usize {
        match self {
            #[cfg(feature = "mpi")]
            UniverseComm::Mpi(comm) => comm.size(),
            #[cfg(feature = "rayon")]
            UniverseComm::Rayon(comm) => comm.size(),
            UniverseComm::Serial => 1,
        }
    }
    fn barrier(&self) -> Result<()> {
        match self {
            #[cfg(feature = "mpi")]
            UniverseComm::Mpi(comm) => comm.barrier(),
            #[cfg(feature = "rayon")]
            UniverseComm::Rayon(comm) => comm.barrier(),
            UniverseComm::Serial => Ok(()),
        }
    }
    fn all_reduce_max(&self, x: u64) -> Result<u64> {
        match self {
            #[cfg(feature = "mpi")]
            UniverseComm::Mpi(comm) => comm.all_reduce_max(x),
            #[cfg(feature = "rayon")]
            UniverseComm::Rayon(comm) => comm.all_reduce_max(x),
            UniverseComm::Serial => Ok(x),
        }
    }
    fn set_collective_timeout(&mut self, timeout: Option<Duration>) {
        match self {
            #[cfg(feature = "mpi")]
            UniverseComm::Mpi(comm) => comm.set_collective_timeout(timeout),
            #[cfg(feature = "rayon")]
            UniverseComm::Rayon(comm) => comm.set_collective_timeout(timeout),
            UniverseComm::Serial => {
                let _ = timeout;
            }
        }
    }
}
