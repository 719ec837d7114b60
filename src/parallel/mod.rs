//! Communicators for the X-Y plane.
//!
//! Every collective in [`Comm`] must be entered by all ranks of the
//! communicator in the same order; nothing here detects a mismatch.

use crate::error::KError;

pub trait Comm {
    fn rank(&self) -> usize;
    fn size(&self) -> usize;
    fn barrier(&self);
    /// Sum of `x` over all ranks.
    fn all_reduce(&self, x: f64) -> f64;
    /// Concatenation of every rank's `local`, in rank order. All ranks must
    /// pass slices of the same length.
    fn all_gather_usize(&self, local: &[usize]) -> Vec<usize>;
    fn dot(&self, a: &[f64], b: &[f64]) -> f64 {
        let local = a.iter().zip(b).map(|(&x, &y)| x * y).sum::<f64>();
        self.all_reduce(local)
    }
    /// True on every rank iff `flag` is true on any rank.
    fn any(&self, flag: bool) -> bool {
        self.all_reduce(if flag { 1.0 } else { 0.0 }) > 0.0
    }
}

/// Single-process communicator.
#[derive(Debug, Clone, Copy, Default)]
pub struct SerialComm;

impl SerialComm {
    pub fn new() -> Self {
        SerialComm
    }
}

impl Comm for SerialComm {
    fn rank(&self) -> usize {
        0
    }
    fn size(&self) -> usize {
        1
    }
    fn barrier(&self) {}
    fn all_reduce(&self, x: f64) -> f64 {
        x
    }
    fn all_gather_usize(&self, local: &[usize]) -> Vec<usize> {
        local.to_vec()
    }
}

pub mod thread_comm;
pub use thread_comm::ThreadComm;

#[cfg(feature = "mpi")]
pub mod mpi_comm;
#[cfg(feature = "mpi")]
pub use mpi_comm::MpiComm;

/// Size the global Rayon pool used by sparse mat-vecs and local inner
/// products. `0` means one thread per logical core.
///
/// Fails if the global pool was already built.
#[cfg(feature = "rayon")]
pub fn configure_threads(n: usize) -> Result<(), KError> {
    let n = if n == 0 { num_cpus::get() } else { n };
    rayon::ThreadPoolBuilder::new()
        .num_threads(n)
        .build_global()
        .map_err(|e| KError::config(format!("cannot configure {n} threads: {e}")))
}

#[cfg(not(feature = "rayon"))]
pub fn configure_threads(n: usize) -> Result<(), KError> {
    if n > 1 {
        log::warn!("threads = {n} ignored: built without the rayon feature");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serial_collectives_are_identity() {
        let c = SerialComm::new();
        assert_eq!(c.rank(), 0);
        assert_eq!(c.size(), 1);
        assert_eq!(c.all_reduce(2.5), 2.5);
        assert_eq!(c.all_gather_usize(&[3, 4]), vec![3, 4]);
        assert_eq!(c.dot(&[1.0, 2.0], &[3.0, 4.0]), 11.0);
        assert!(c.any(true));
        assert!(!c.any(false));
    }
}
