//! Direct dense LU solver using Faer.
//!
//! Used for the exact preconditioners: the whole process-local block (`lu`)
//! or one block per X line (`xlines`). Factorizations are computed once per
//! coefficient update and reused for every preconditioner application.
//!
//! # References
//! - Faer documentation: https://github.com/sarah-ek/faer-rs
//! - Golub & Van Loan, Matrix Computations

use crate::error::KError;
use crate::preconditioner::Preconditioner;
use crate::solver::LinearSolver;
use crate::utils::convergence::{ConvergedReason, SolveStats};
use faer::linalg::solvers::{FullPivLu, SolveCore};
use faer::{Conj, Mat, MatMut};

/// LU solver using full pivoting from Faer.
///
/// Stores the LU factorization for reuse.
#[derive(Default)]
pub struct LuSolver {
    /// Cached LU factorization (if computed)
    factor: Option<FullPivLu<f64>>,
    n: usize,
}

impl LuSolver {
    /// Create a new LU solver (no factorization yet).
    pub fn new() -> Self {
        Self::default()
    }

    /// Factor `a`, replacing any previous factorization.
    ///
    /// A singular matrix shows up as non-finite entries when solving; that
    /// is checked here by solving against the row sums, so a factor that is
    /// stored is usable.
    pub fn factor(&mut self, a: &Mat<f64>) -> Result<(), KError> {
        if a.nrows() != a.ncols() {
            return Err(KError::FactorError(format!(
                "LU needs a square matrix, got {}x{}",
                a.nrows(),
                a.ncols()
            )));
        }
        let n = a.nrows();
        let lu = FullPivLu::new(a.as_ref());
        let mut probe: Vec<f64> = (0..n).map(|i| (0..n).map(|j| a[(i, j)]).sum::<f64>() + 1.0).collect();
        lu.solve_in_place_with_conj(Conj::No, MatMut::from_column_major_slice_mut(&mut probe, n, 1));
        if probe.iter().any(|v| !v.is_finite()) {
            self.factor = None;
            return Err(KError::FactorError(format!("{n}x{n} block is singular")));
        }
        self.factor = Some(lu);
        self.n = n;
        Ok(())
    }

    /// Solve using the cached LU factorization.
    ///
    /// # Arguments
    /// * `b` - Right-hand side vector
    /// * `x` - Output vector (solution)
    pub fn solve_cached(&self, b: &[f64], x: &mut [f64]) -> Result<(), KError> {
        let Some(factor) = &self.factor else {
            return Err(KError::SolveError("LU solve before factorization".into()));
        };
        if b.len() != self.n || x.len() != self.n {
            return Err(KError::SolveError(format!(
                "LU of size {} applied to vectors of length {}/{}",
                self.n,
                b.len(),
                x.len()
            )));
        }
        x.copy_from_slice(b);
        factor.solve_in_place_with_conj(Conj::No, MatMut::from_column_major_slice_mut(x, self.n, 1));
        Ok(())
    }

    pub fn size(&self) -> usize {
        self.n
    }
}

impl LinearSolver<Mat<f64>, Vec<f64>> for LuSolver {
    type Error = KError;
    type Scalar = f64;

    /// Solve Ax = b by factoring `a` (full pivoting) and back-substituting.
    /// The preconditioner is ignored.
    fn solve(
        &mut self,
        a: &Mat<f64>,
        _pc: Option<&dyn Preconditioner<Mat<f64>, Vec<f64>>>,
        b: &Vec<f64>,
        x: &mut Vec<f64>,
    ) -> Result<SolveStats<f64>, KError> {
        self.factor(a)?;
        x.resize(b.len(), 0.0);
        self.solve_cached(b, x)?;
        Ok(SolveStats::new(1, 0.0, ConvergedReason::ConvergedIts))
    }
}
