//! Generalized Minimal Residual (GMRES) solver with fixed restart (Saad §6.4)
//!
//! This module implements the restarted GMRES algorithm for solving large, sparse, and possibly nonsymmetric
//! linear systems Ax = b. GMRES minimizes the residual over a Krylov subspace and supports both left and right
//! preconditioning. The implementation includes happy breakdown detection, double orthogonalization, and
//! Givens rotations for the least-squares problem.
//!
//! # Features
//! - Left preconditioning: Arnoldi on M⁻¹A, residuals measured as ‖M⁻¹(b − Ax)‖
//! - Right preconditioning: Arnoldi on AM⁻¹, residuals measured as ‖b − Ax‖
//! - Double (iterative) Gram-Schmidt orthogonalization for numerical stability
//! - Pluggable inner product, so the same iteration runs on distributed vectors
//!
//! # References
//! - Saad, Y. (2003). Iterative Methods for Sparse Linear Systems, 2nd Edition. SIAM. §6.4, §9.3
//! - https://en.wikipedia.org/wiki/Generalized_minimal_residual_method

use crate::core::traits::{InnerProduct, MatVec};
use crate::error::KError;
use crate::preconditioner::Preconditioner;
use crate::solver::{LinearSolver, apply_pc, residual};
use crate::utils::convergence::{ConvergedReason, Convergence, SolveStats, monitor_residual};
use num_traits::Float;

/// Side on which the preconditioner is applied.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Preconditioning {
    Left,
    Right,
}

/// GMRES solver struct with restart and preconditioning options.
///
/// # Type Parameters
/// * `T` - Scalar type (e.g., f32, f64)
/// * `I` - Inner product; `()` for process-local vectors
pub struct GmresSolver<T, I = ()> {
    /// Number of Arnoldi vectors before restart
    pub restart: usize,
    /// Convergence criteria
    pub conv: Convergence<T>,
    /// Preconditioning side (ignored without a preconditioner)
    pub preconditioning: Preconditioning,
    /// Log the residual every this many iterations (0 = never)
    pub monitor_interval: usize,
    ip: I,
}

impl<T: Copy + Float> GmresSolver<T> {
    /// Create a new GMRES solver with restart, relative tolerance, and max iterations.
    pub fn new(restart: usize, rtol: T, max_iters: usize) -> Self {
        Self {
            restart: restart.max(1),
            conv: Convergence::new(rtol, max_iters),
            preconditioning: Preconditioning::Right,
            monitor_interval: 0,
            ip: (),
        }
    }
}

impl<T: Copy + Float, I> GmresSolver<T, I> {
    /// Replace the inner product (e.g. with a distributed one).
    pub fn with_inner_product<J>(self, ip: J) -> GmresSolver<T, J> {
        GmresSolver {
            restart: self.restart,
            conv: self.conv,
            preconditioning: self.preconditioning,
            monitor_interval: self.monitor_interval,
            ip,
        }
    }

    pub fn with_convergence(mut self, conv: Convergence<T>) -> Self {
        self.conv = conv;
        self
    }

    /// Set the preconditioning side.
    pub fn with_preconditioning(mut self, mode: Preconditioning) -> Self {
        self.preconditioning = mode;
        self
    }

    pub fn with_monitor(mut self, interval: usize) -> Self {
        self.monitor_interval = interval;
        self
    }

    /// Apply the previous Givens rotations to column `j` of H, build a new
    /// one annihilating H[j+1][j], and rotate g accordingly.
    fn apply_givens_and_update_g(h: &mut [Vec<T>], g: &mut [T], cs: &mut [T], sn: &mut [T], j: usize) {
        for i in 0..j {
            let temp = cs[i] * h[i][j] + sn[i] * h[i + 1][j];
            h[i + 1][j] = -sn[i] * h[i][j] + cs[i] * h[i + 1][j];
            h[i][j] = temp;
        }
        let h_kk = h[j][j];
        let h_k1k = h[j + 1][j];
        let r = h_kk.hypot(h_k1k);
        if r == T::zero() {
            cs[j] = T::one();
            sn[j] = T::zero();
        } else {
            cs[j] = h_kk / r;
            sn[j] = h_k1k / r;
        }
        h[j][j] = cs[j] * h_kk + sn[j] * h_k1k;
        h[j + 1][j] = T::zero();
        let temp = cs[j] * g[j] + sn[j] * g[j + 1];
        g[j + 1] = -sn[j] * g[j] + cs[j] * g[j + 1];
        g[j] = temp;
    }

    /// Solve the upper-triangular k×k system H y = g.
    fn back_substitution(h: &[Vec<T>], g: &[T], k: usize) -> Vec<T> {
        let mut y = vec![T::zero(); k];
        for i in (0..k).rev() {
            let mut s = g[i];
            for j in (i + 1)..k {
                s = s - h[i][j] * y[j];
            }
            y[i] = if h[i][i] != T::zero() { s / h[i][i] } else { T::zero() };
        }
        y
    }
}

impl<M, V, T, I> LinearSolver<M, V> for GmresSolver<T, I>
where
    M: MatVec<V>,
    I: InnerProduct<V, Scalar = T>,
    V: AsMut<[T]> + AsRef<[T]> + From<Vec<T>> + Clone,
    T: Float + From<f64>,
{
    type Error = KError;
    type Scalar = T;

    /// Solve the linear system Ax = b using restarted GMRES.
    ///
    /// # Arguments
    /// * `a` - Operator implementing `MatVec`
    /// * `pc` - Optional preconditioner (side from `preconditioning`)
    /// * `b` - Right-hand side vector
    /// * `x` - On input: initial guess; on output: solution vector
    ///
    /// # Returns
    /// * `Ok(SolveStats)` whatever the outcome; check `reason`
    /// * `Err(KError)` if the preconditioner fails
    fn solve(&mut self, a: &M, pc: Option<&dyn Preconditioner<M, V>>, b: &V, x: &mut V) -> Result<SolveStats<T>, KError> {
        let n = b.as_ref().len();
        let ip = &self.ip;
        let left = pc.is_some() && self.preconditioning == Preconditioning::Left;
        let right = pc.is_some() && self.preconditioning == Preconditioning::Right;
        let zeros = || V::from(vec![T::zero(); n]);

        // Residual in the norm GMRES minimizes.
        let precond_residual = |x: &V| -> Result<V, KError> {
            let r = residual(a, b, x);
            if left {
                let mut z = zeros();
                apply_pc(pc, &r, &mut z)?;
                Ok(z)
            } else {
                Ok(r)
            }
        };

        let b_norm = if left {
            let mut z = zeros();
            apply_pc(pc, b, &mut z)?;
            ip.norm(&z)
        } else {
            ip.norm(b)
        };

        let mut r = precond_residual(&*x)?;
        let mut beta = ip.norm(&r);
        let res0 = beta;
        let mut iteration = 0;
        let mut reason = self.conv.check(beta, b_norm, res0, 0);
        monitor_residual("gmres", self.monitor_interval, 0, beta);

        let m = self.restart;
        while reason == ConvergedReason::Iterating {
            let mut v_basis: Vec<V> = Vec::with_capacity(m + 1);
            let mut z_basis: Vec<V> = Vec::with_capacity(if right { m } else { 0 });
            v_basis.push(V::from(r.as_ref().iter().map(|&ri| ri / beta).collect::<Vec<_>>()));
            let mut h = vec![vec![T::zero(); m]; m + 1];
            let mut g = vec![T::zero(); m + 1];
            let (mut cs, mut sn) = (vec![T::zero(); m], vec![T::zero(); m]);
            g[0] = beta;
            let mut k = 0;
            let mut res_est = beta;

            for j in 0..m {
                iteration += 1;
                let mut w = zeros();
                if right {
                    let mut z = zeros();
                    apply_pc(pc, &v_basis[j], &mut z)?;
                    a.matvec(&z, &mut w);
                    z_basis.push(z);
                } else if left {
                    let mut t = zeros();
                    a.matvec(&v_basis[j], &mut t);
                    apply_pc(pc, &t, &mut w)?;
                } else {
                    a.matvec(&v_basis[j], &mut w);
                }
                // Modified Gram-Schmidt, twice.
                for _ in 0..2 {
                    for i in 0..=j {
                        let hij = ip.dot(&w, &v_basis[i]);
                        h[i][j] = h[i][j] + hij;
                        for (wk, &vik) in w.as_mut().iter_mut().zip(v_basis[i].as_ref()) {
                            *wk = *wk - hij * vik;
                        }
                    }
                }
                let h_next = ip.norm(&w);
                h[j + 1][j] = h_next;
                Self::apply_givens_and_update_g(&mut h, &mut g, &mut cs, &mut sn, j);
                k = j + 1;
                res_est = g[j + 1].abs();
                monitor_residual("gmres", self.monitor_interval, iteration, res_est);
                reason = self.conv.check(res_est, b_norm, res0, iteration);
                if !h_next.is_finite() {
                    reason = ConvergedReason::DivergedNanOrInf;
                }
                let happy = h_next <= T::epsilon() * beta;
                if reason != ConvergedReason::Iterating || happy {
                    break;
                }
                v_basis.push(V::from(w.as_ref().iter().map(|&wi| wi / h_next).collect::<Vec<_>>()));
            }

            // x += V_k y (left/none) or Z_k y (right)
            let y = Self::back_substitution(&h, &g, k);
            let basis = if right { &z_basis } else { &v_basis };
            for (yi, vi) in y.iter().zip(basis.iter()) {
                for (xj, &vij) in x.as_mut().iter_mut().zip(vi.as_ref()) {
                    *xj = *xj + *yi * vij;
                }
            }

            if reason != ConvergedReason::Iterating {
                log::debug!("gmres: {reason} after {iteration} iterations, residual {:e}", res_est.to_f64().unwrap_or(f64::NAN));
                return Ok(SolveStats::new(iteration, res_est, reason));
            }

            // Restart (or happy breakdown) from the true residual.
            r = precond_residual(&*x)?;
            beta = ip.norm(&r);
            reason = self.conv.check(beta, b_norm, res0, iteration);
            if reason != ConvergedReason::Iterating {
                return Ok(SolveStats::new(iteration, beta, reason));
            }
        }
        Ok(SolveStats::new(iteration, beta, reason))
    }
}
