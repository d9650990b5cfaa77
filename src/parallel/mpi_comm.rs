//! MPI-based parallel context.
//!
//! This module provides an implementation of the `Comm` trait over the MPI
//! world communicator, for groups launched with `mpirun`/`srun` where every
//! rank is its own OS process. It is only available when the `mpi` feature is
//! enabled.
//!
//! # Usage
//!
//! - `MpiComm::new` initializes MPI and keeps the universe alive for as long
//!   as the communicator exists; MPI is finalized when it is dropped.
//! - Wrap it in `UniverseComm::Mpi` to select the single-file collective
//!   writer.
//!
//! # Example
//! ```ignore
//! #[cfg(feature = "mpi")]
//! {
//!     use collate_io::parallel::{Comm, MpiComm};
//!     let comm = MpiComm::new().unwrap();
//!     println!("Rank: {} / {}", comm.rank(), comm.size());
//! }
//! ```

#[cfg(feature = "mpi")]
use mpi::collective::SystemOperation;
#[cfg(feature = "mpi")]
use mpi::environment::Universe;
#[cfg(feature = "mpi")]
use mpi::topology::SimpleCommunicator;
#[cfg(feature = "mpi")]
use mpi::traits::*;

#[cfg(feature = "mpi")]
use crate::error::{CollateError, Result};

/// MPI communicator wrapper.
///
/// Holds the world communicator, the rank of the current process and the
/// total number of processes.
#[cfg(feature = "mpi")]
pub struct MpiComm {
    /// The MPI world communicator (all processes in the job).
    pub world: SimpleCommunicator,
    /// The rank (ID) of this process within the communicator.
    pub rank: usize,
    /// The total number of processes in the communicator.
    pub size: usize,
    // Dropped last: finalizes MPI.
    _universe: Universe,
}

#[cfg(feature = "mpi")]
impl MpiComm {
    /// Initializes MPI and constructs a new `MpiComm`.
    ///
    /// Fails if MPI was already initialized in this process.
    pub fn new() -> Result<Self> {
        let universe = mpi::initialize()
            .ok_or_else(|| CollateError::Backend("MPI is already initialized".into()))?;
        let world = universe.world();
        let rank = world.rank() as usize;
        let size = world.size() as usize;
        tracing::debug!(rank, size, "MPI world initialized");
        Ok(MpiComm { world, rank, size, _universe: universe })
    }
}

#[cfg(feature = "mpi")]
impl super::Comm for MpiComm {
    fn rank(&self) -> usize {
        self.rank
    }
    fn size(&self) -> usize {
        self.size
    }
    fn barrier(&self) -> Result<()> {
        // MPI errors abort the job under the default error handler.
        self.world.barrier();
        Ok(())
    }

    /// Performs an all-reduce max across all processes.
    fn all_reduce_max(&self, x: u64) -> Result<u64> {
        let mut y = x;
        self.world.all_reduce_into(&x, &mut y, SystemOperation::max());
        Ok(y)
    }
}
