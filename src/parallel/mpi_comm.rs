//! MPI-based parallel communication module.
//!
//! This module provides an implementation of the `Comm` trait using the MPI (Message Passing Interface)
//! backend for distributed-memory parallelism. The solver only needs the
//! collectives of the X-Y plane: barrier, sum all-reduce and all-gather.
//! The implementation is only available when the `mpi` feature is enabled.
//!
//! # Usage
//!
//! - `MpiComm::new` initializes MPI and wraps the world communicator; MPI is
//!   finalized when that `MpiComm` is dropped.
//! - `MpiComm::from_communicator` wraps a communicator owned by the enclosing
//!   simulation (for example a sub-communicator spanning one X-Y plane).
//!
//! # References
//! - [MPI Standard](https://www.mpi-forum.org/)
//!
//! # Example
//! ```no_run
//! # #[cfg(feature = "mpi")]
//! # {
//! use laplace_xy::parallel::{Comm, MpiComm};
//! let comm = MpiComm::new().expect("MPI init");
//! println!("Rank: {} / {}", comm.rank(), comm.size());
//! comm.barrier();
//! # }
//! ```

use mpi::collective::SystemOperation;
use mpi::environment::Universe;
use mpi::topology::SimpleCommunicator;
use mpi::traits::*;

use crate::error::KError;

/// MPI communicator wrapper for distributed parallelism.
pub struct MpiComm {
    /// Communicator spanning the ranks that share one X-Y plane.
    pub world: SimpleCommunicator,
    /// The rank (ID) of this process within the communicator.
    pub rank: usize,
    /// The total number of processes in the communicator.
    pub size: usize,
    // Declared last: the communicator must go before MPI is finalized.
    _universe: Option<Universe>,
}

impl MpiComm {
    /// Initializes MPI and wraps the world communicator.
    ///
    /// Fails with a capability error if MPI was already initialized.
    pub fn new() -> Result<Self, KError> {
        let universe = mpi::initialize()
            .ok_or_else(|| KError::Capability("MPI is already initialized".into()))?;
        let world = universe.world();
        let mut comm = Self::from_communicator(world);
        comm._universe = Some(universe);
        Ok(comm)
    }

    /// Wraps an existing communicator without taking over MPI's lifetime.
    pub fn from_communicator(world: SimpleCommunicator) -> Self {
        let rank = world.rank() as usize;
        let size = world.size() as usize;
        MpiComm { world, rank, size, _universe: None }
    }
}

impl super::Comm for MpiComm {
    /// Returns the rank (ID) of this process.
    fn rank(&self) -> usize {
        self.rank
    }
    /// Returns the total number of processes in the communicator.
    fn size(&self) -> usize {
        self.size
    }
    /// Synchronizes all processes at a barrier.
    fn barrier(&self) {
        self.world.barrier();
    }

    /// Performs an all-reduce sum operation across all processes.
    fn all_reduce(&self, x: f64) -> f64 {
        let mut y = x;
        self.world.all_reduce_into(&x, &mut y, SystemOperation::sum());
        y
    }

    fn all_gather_usize(&self, local: &[usize]) -> Vec<usize> {
        let send: Vec<u64> = local.iter().map(|&v| v as u64).collect();
        let mut recv = vec![0u64; send.len() * self.size];
        self.world.all_gather_into(&send[..], &mut recv[..]);
        recv.into_iter().map(|v| v as usize).collect()
    }
}
