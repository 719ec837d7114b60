//! Krylov & direct solver interfaces.
//!
//! Iterative solvers take their inner product as a value (`()` for
//! process-local vectors, [`DistributedInnerProduct`](crate::core::DistributedInnerProduct)
//! for vectors split across ranks), so the same code runs serially and
//! distributed. All branching depends only on reduced scalars, which keeps
//! every rank on the same sequence of collectives.

use crate::core::traits::MatVec;
use crate::preconditioner::Preconditioner;
use crate::utils::convergence::SolveStats;

/// Common interface for any direct or iterative solver.
pub trait LinearSolver<M, V> {
    type Error;
    type Scalar: Copy + PartialOrd + From<f64>;
    /// Solve A·x = b, writing result into `x` (which holds the initial guess
    /// on entry). Returns iteration stats (including convergence info).
    fn solve(
        &mut self,
        a: &M,
        pc: Option<&dyn Preconditioner<M, V>>,
        b: &V,
        x: &mut V,
    ) -> Result<SolveStats<Self::Scalar>, Self::Error>;
}

/// r = b - A x
pub(crate) fn residual<M, V, T>(a: &M, b: &V, x: &V) -> V
where
    M: MatVec<V>,
    V: AsRef<[T]> + AsMut<[T]> + From<Vec<T>>,
    T: num_traits::Float,
{
    let mut r = V::from(vec![T::zero(); b.as_ref().len()]);
    a.matvec(x, &mut r);
    for (ri, &bi) in r.as_mut().iter_mut().zip(b.as_ref()) {
        *ri = bi - *ri;
    }
    r
}

/// z = M⁻¹ r, or z = r without a preconditioner.
pub(crate) fn apply_pc<M, V>(
    pc: Option<&dyn Preconditioner<M, V>>,
    r: &V,
    z: &mut V,
) -> Result<(), crate::error::KError>
where
    V: Clone,
{
    match pc {
        Some(pc) => pc.apply(r, z),
        None => {
            z.clone_from(r);
            Ok(())
        }
    }
}

pub mod direct_lu;
pub use direct_lu::LuSolver;

pub mod gmres;
pub use gmres::{GmresSolver, Preconditioning};

pub mod pcg;
pub use pcg::PcgSolver;

pub mod bicgstab;
pub use bicgstab::BiCgStabSolver;

pub mod preonly;
pub use preonly::PreOnlySolver;
