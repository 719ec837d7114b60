//! Factory for Krylov Subspace Methods (KSP).
//!
//! `KspContext` holds the solver kind and its parameters, taken from a
//! [`LaplaceXyConfig`], and dispatches a solve to the matching solver with
//! a caller-supplied inner product and preconditioner.
//!
//! # Supported Solvers
//! - GMRES (left/right preconditioning), PCG, BiCGStab, preonly
//!
//! # References
//! - Saad, Y. (2003). Iterative Methods for Sparse Linear Systems. SIAM.
//! - Templates for the Solution of Linear Systems: Building Blocks for Iterative Methods, 2nd Edition (Barrett et al.)

use crate::config::{KspType, LaplaceXyConfig, PcSide};
use crate::core::traits::{InnerProduct, MatVec};
use crate::error::KError;
use crate::preconditioner::Preconditioner;
use crate::solver::gmres::Preconditioning;
use crate::solver::{BiCgStabSolver, GmresSolver, LinearSolver, PcgSolver, PreOnlySolver};
use crate::utils::convergence::{Convergence, SolveStats};

/// Context and configuration for a Krylov subspace solver.
#[derive(Debug, Clone)]
pub struct KspContext {
    /// The type of Krylov solver to use
    pub kind: KspType,
    pub conv: Convergence<f64>,
    /// Restart parameter (for GMRES)
    pub restart: usize,
    /// Preconditioning side for GMRES; the other methods have a fixed side.
    pub side: PcSide,
    pub monitor_interval: usize,
}

impl KspContext {
    pub fn new(kind: KspType, conv: Convergence<f64>) -> Self {
        Self {
            kind,
            conv,
            restart: 30,
            side: PcSide::Right,
            monitor_interval: 0,
        }
    }

    pub fn from_config(cfg: &LaplaceXyConfig) -> Self {
        Self {
            kind: cfg.ksptype,
            conv: Convergence::new(cfg.rtol, cfg.maxits)
                .with_atol(cfg.atol)
                .with_dtol(cfg.dtol),
            restart: cfg.restart,
            side: cfg.pcside,
            monitor_interval: cfg.monitor_interval,
        }
    }

    /// Solve the linear system `Ax = b` using the configured solver and preconditioner.
    ///
    /// # Arguments
    /// * `ip` - Inner product over the (possibly distributed) vectors
    /// * `b` - Right-hand side vector
    /// * `x` - Initial guess on entry, solution on exit
    ///
    /// # Returns
    /// * `Ok(SolveStats)` whether or not the solve converged; check `converged`
    /// * `Err(KError)` on breakdowns that are errors in their own right
    pub fn solve<M, I>(
        &self,
        a: &M,
        pc: Option<&dyn Preconditioner<M, Vec<f64>>>,
        ip: I,
        b: &Vec<f64>,
        x: &mut Vec<f64>,
    ) -> Result<SolveStats<f64>, KError>
    where
        M: MatVec<Vec<f64>>,
        I: InnerProduct<Vec<f64>, Scalar = f64>,
    {
        let stats = match self.kind {
            KspType::Gmres => {
                let mode = match self.side {
                    PcSide::Left => Preconditioning::Left,
                    PcSide::Right => Preconditioning::Right,
                };
                GmresSolver::new(self.restart, self.conv.rtol, self.conv.max_iters)
                    .with_convergence(self.conv)
                    .with_preconditioning(mode)
                    .with_monitor(self.monitor_interval)
                    .with_inner_product(ip)
                    .solve(a, pc, b, x)?
            }
            KspType::Cg => PcgSolver::new(self.conv.rtol, self.conv.max_iters)
                .with_convergence(self.conv)
                .with_monitor(self.monitor_interval)
                .with_inner_product(ip)
                .solve(a, pc, b, x)?,
            KspType::Bicgstab => BiCgStabSolver::new(self.conv.rtol, self.conv.max_iters)
                .with_convergence(self.conv)
                .with_monitor(self.monitor_interval)
                .with_inner_product(ip)
                .solve(a, pc, b, x)?,
            KspType::PreOnly => PreOnlySolver::new().with_inner_product(ip).solve(a, pc, b, x)?,
        };
        log::debug!(
            "{}: {} after {} iterations, residual {:e}",
            self.kind,
            stats.reason,
            stats.iterations,
            stats.final_residual
        );
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::CsrMatrix;
    use crate::preconditioner::Jacobi;
    use approx::assert_abs_diff_eq;

    fn system() -> (CsrMatrix<f64>, Vec<f64>) {
        let a = CsrMatrix::from_csr(
            3,
            3,
            vec![0, 2, 5, 7],
            vec![0, 1, 0, 1, 2, 1, 2],
            vec![4.0, -1.0, -1.0, 4.0, -2.0, -1.0, 4.0],
        )
        .unwrap();
        (a, vec![3.0, 1.0, 3.0])
    }

    #[test]
    fn every_kind_solves_with_jacobi() {
        let (a, b) = system();
        let mut pc = Jacobi::new();
        pc.setup(&a).unwrap();
        for kind in [KspType::Gmres, KspType::Bicgstab] {
            for side in [PcSide::Left, PcSide::Right] {
                let mut ksp = KspContext::new(kind, Convergence::new(1e-12, 100));
                ksp.side = side;
                let mut x = vec![0.0; 3];
                let stats = ksp.solve(&a, Some(&pc), (), &b, &mut x).unwrap();
                assert!(stats.converged, "{kind} {side}: {:?}", stats.reason);
                for xi in &x {
                    assert_abs_diff_eq!(*xi, 1.0, epsilon = 1e-9);
                }
            }
        }
    }

    #[test]
    fn from_config_copies_tolerances() {
        let cfg = LaplaceXyConfig::default();
        let ksp = KspContext::from_config(&cfg);
        assert_eq!(ksp.kind, cfg.ksptype);
        assert_eq!(ksp.conv.max_iters, cfg.maxits);
        assert_eq!(ksp.restart, cfg.restart);
    }
}
