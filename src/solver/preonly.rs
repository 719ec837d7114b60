//! Preconditioner-only "solver": x = M⁻¹ b, one application, no iteration.
//!
//! Paired with an exact preconditioner (`lu`) this is a direct solve.

use crate::core::traits::{InnerProduct, MatVec};
use crate::error::KError;
use crate::preconditioner::Preconditioner;
use crate::solver::{LinearSolver, apply_pc, residual};
use crate::utils::convergence::{ConvergedReason, SolveStats};
use num_traits::Float;

pub struct PreOnlySolver<I = ()> {
    ip: I,
}

impl PreOnlySolver {
    pub fn new() -> Self {
        Self { ip: () }
    }
}

impl Default for PreOnlySolver {
    fn default() -> Self {
        Self::new()
    }
}

impl<I> PreOnlySolver<I> {
    pub fn with_inner_product<J>(self, ip: J) -> PreOnlySolver<J> {
        PreOnlySolver { ip }
    }
}

impl<M, V, T, I> LinearSolver<M, V> for PreOnlySolver<I>
where
    M: MatVec<V>,
    I: InnerProduct<V, Scalar = T>,
    V: AsMut<[T]> + AsRef<[T]> + From<Vec<T>> + Clone,
    T: Float + From<f64>,
{
    type Error = KError;
    type Scalar = T;

    /// The initial guess is ignored. The reported residual is the true
    /// residual of the result.
    fn solve(&mut self, a: &M, pc: Option<&dyn Preconditioner<M, V>>, b: &V, x: &mut V) -> Result<SolveStats<T>, KError> {
        apply_pc(pc, b, x)?;
        let res = self.ip.norm(&residual(a, b, &*x));
        let reason = if res.is_finite() {
            ConvergedReason::ConvergedIts
        } else {
            ConvergedReason::DivergedNanOrInf
        };
        Ok(SolveStats::new(1, res, reason))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::CsrMatrix;
    use crate::preconditioner::Jacobi;

    #[test]
    fn jacobi_inverts_diagonal_exactly() {
        let a = CsrMatrix::from_csr(2, 2, vec![0, 1, 2], vec![0, 1], vec![2.0, 4.0]).unwrap();
        let mut pc = Jacobi::new();
        pc.setup(&a).unwrap();
        let mut x = vec![9.0, 9.0];
        let stats = PreOnlySolver::new().solve(&a, Some(&pc), &vec![1.0, 1.0], &mut x).unwrap();
        assert_eq!(x, vec![0.5, 0.25]);
        assert_eq!(stats.reason, ConvergedReason::ConvergedIts);
        assert_eq!(stats.final_residual, 0.0);
    }
}
