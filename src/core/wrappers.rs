//! Implementations of the core traits for `Vec<T>`, `faer::Mat` and
//! communicator-backed reductions.
//!
//! # Features
//! - Inner product and norm for process-local vectors, with optional Rayon parallelism.
//! - Distributed inner product and norm that sum partial results over a [`Comm`].
//! - Matrix-vector product for `faer` dense matrices (feature `krylov`).
//!
//! # References
//! - [faer crate documentation](https://docs.rs/faer)
//! - [num-traits crate documentation](https://docs.rs/num-traits)

use crate::core::traits::{InnerProduct, MatVec};
use crate::parallel::Comm;
use num_traits::Float;

#[cfg(feature = "krylov")]
use faer::Mat;

/// Implements matrix-vector multiplication for `faer::Mat`.
///
/// Computes `y = A * x` where `A` is a dense matrix, `x` and `y` are vectors.
#[cfg(feature = "krylov")]
impl<T: Float> MatVec<Vec<T>> for Mat<T> {
    fn matvec(&self, x: &Vec<T>, y: &mut Vec<T>) {
        assert_eq!(self.nrows(), y.len(), "Output vector y has incorrect length");
        assert_eq!(self.ncols(), x.len(), "Input vector x has incorrect length");
        for i in 0..self.nrows() {
            y[i] = T::zero();
            for j in 0..self.ncols() {
                y[i] = y[i] + self[(i, j)] * x[j];
            }
        }
    }
}

fn local_dot<T: Float + Send + Sync>(x: &[T], y: &[T]) -> T {
    assert_eq!(x.len(), y.len(), "Vectors must have the same length");
    // Fixed chunks summed in order: the result does not depend on how the
    // pool schedules the work.
    #[cfg(feature = "rayon")]
    {
        use rayon::prelude::*;
        const CHUNK: usize = 4096;
        let partial: Vec<T> = x
            .par_chunks(CHUNK)
            .zip(y.par_chunks(CHUNK))
            .map(|(xc, yc)| xc.iter().zip(yc).fold(T::zero(), |acc, (a, b)| acc + *a * *b))
            .collect();
        partial.into_iter().fold(T::zero(), |acc, v| acc + v)
    }
    #[cfg(not(feature = "rayon"))]
    {
        x.iter()
            .zip(y.iter())
            .map(|(xi, yi)| *xi * *yi)
            .fold(T::zero(), |acc, v| acc + v)
    }
}

/// Inner product and norm for process-local vectors.
impl<T: Float + From<f64> + Send + Sync> InnerProduct<Vec<T>> for () {
    type Scalar = T;
    /// Computes the dot product of two vectors: `x^T y`.
    fn dot(&self, x: &Vec<T>, y: &Vec<T>) -> T {
        local_dot(x, y)
    }
    /// Computes the Euclidean norm of a vector: `||x||_2`.
    fn norm(&self, x: &Vec<T>) -> T {
        local_dot(x, x).sqrt()
    }
}

/// Inner product over vectors whose entries are partitioned across the ranks
/// of a communicator.
///
/// Each rank contributes the dot product of its owned entries; the partial
/// sums are combined with [`Comm::all_reduce`]. Every rank must call `dot` and
/// `norm` in the same order.
pub struct DistributedInnerProduct<'a, C: Comm> {
    /// Reference to the communicator implementing the `Comm` trait.
    pub comm: &'a C,
}

impl<'a, C: Comm> DistributedInnerProduct<'a, C> {
    pub fn new(comm: &'a C) -> Self {
        Self { comm }
    }
}

impl<'a, C: Comm> Clone for DistributedInnerProduct<'a, C> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<'a, C: Comm> Copy for DistributedInnerProduct<'a, C> {}

impl<'a, C: Comm> InnerProduct<Vec<f64>> for DistributedInnerProduct<'a, C> {
    type Scalar = f64;
    fn dot(&self, x: &Vec<f64>, y: &Vec<f64>) -> f64 {
        self.comm.all_reduce(local_dot(x, y))
    }
    fn norm(&self, x: &Vec<f64>) -> f64 {
        self.comm.all_reduce(local_dot(x, x)).sqrt()
    }
}
