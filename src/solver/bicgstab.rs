//! BiCGStab solver (Saad §7.4.2), right preconditioned.
//!
//! Solves A M⁻¹ u = b with x = M⁻¹ u, so the residual it monitors is the
//! true residual b − Ax.

use crate::core::traits::{InnerProduct, MatVec};
use crate::error::KError;
use crate::preconditioner::Preconditioner;
use crate::solver::{LinearSolver, apply_pc, residual};
use crate::utils::convergence::{ConvergedReason, Convergence, SolveStats, monitor_residual};
use num_traits::Float;

pub struct BiCgStabSolver<T, I = ()> {
    pub conv: Convergence<T>,
    pub monitor_interval: usize,
    ip: I,
}

impl<T: Float> BiCgStabSolver<T> {
    pub fn new(rtol: T, max_iters: usize) -> Self {
        Self { conv: Convergence::new(rtol, max_iters), monitor_interval: 0, ip: () }
    }
}

impl<T: Float, I> BiCgStabSolver<T, I> {
    pub fn with_inner_product<J>(self, ip: J) -> BiCgStabSolver<T, J> {
        BiCgStabSolver { conv: self.conv, monitor_interval: self.monitor_interval, ip }
    }
    pub fn with_convergence(mut self, conv: Convergence<T>) -> Self {
        self.conv = conv;
        self
    }
    pub fn with_monitor(mut self, interval: usize) -> Self {
        self.monitor_interval = interval;
        self
    }
}

impl<M, V, T, I> LinearSolver<M, V> for BiCgStabSolver<T, I>
where
    M: MatVec<V>,
    I: InnerProduct<V, Scalar = T>,
    V: AsMut<[T]> + AsRef<[T]> + From<Vec<T>> + Clone,
    T: Float + From<f64>,
{
    type Error = KError;
    type Scalar = T;

    fn solve(&mut self, a: &M, pc: Option<&dyn Preconditioner<M, V>>, b: &V, x: &mut V) -> Result<SolveStats<T>, KError> {
        let n = b.as_ref().len();
        let ip = &self.ip;
        let zeros = || V::from(vec![T::zero(); n]);

        let b_norm = ip.norm(b);
        let mut r = residual(a, b, &*x);
        let r_hat = r.clone(); // shadow residual
        let res0 = ip.norm(&r);
        monitor_residual("bicgstab", self.monitor_interval, 0, res0);
        let reason = self.conv.check(res0, b_norm, res0, 0);
        if reason != ConvergedReason::Iterating {
            return Ok(SolveStats::new(0, res0, reason));
        }

        let mut rho_prev = T::one();
        let mut alpha = T::one();
        let mut omega = T::one();
        let mut v = zeros();
        let mut p = zeros();
        let mut p_hat = zeros();
        let mut s = zeros();
        let mut s_hat = zeros();
        let mut t = zeros();
        let mut res = res0;
        let mut i = 0;

        loop {
            i += 1;
            let rho = ip.dot(&r_hat, &r);
            if rho == T::zero() || !rho.is_finite() {
                return Ok(SolveStats::new(i - 1, res, ConvergedReason::DivergedBreakdown));
            }
            let beta = (rho / rho_prev) * (alpha / omega);
            // p = r + beta * (p - omega * v)
            for ((pj, &rj), &vj) in p.as_mut().iter_mut().zip(r.as_ref()).zip(v.as_ref()) {
                *pj = rj + beta * (*pj - omega * vj);
            }
            apply_pc(pc, &p, &mut p_hat)?;
            a.matvec(&p_hat, &mut v);
            let rv = ip.dot(&r_hat, &v);
            if rv == T::zero() || !rv.is_finite() {
                return Ok(SolveStats::new(i, res, ConvergedReason::DivergedBreakdown));
            }
            alpha = rho / rv;
            for ((sj, &rj), &vj) in s.as_mut().iter_mut().zip(r.as_ref()).zip(v.as_ref()) {
                *sj = rj - alpha * vj;
            }
            let s_norm = ip.norm(&s);
            let early = self.conv.check(s_norm, b_norm, res0, i);
            if early.is_converged() {
                for (xj, &pj) in x.as_mut().iter_mut().zip(p_hat.as_ref()) {
                    *xj = *xj + alpha * pj;
                }
                monitor_residual("bicgstab", self.monitor_interval, i, s_norm);
                return Ok(SolveStats::new(i, s_norm, early));
            }
            apply_pc(pc, &s, &mut s_hat)?;
            a.matvec(&s_hat, &mut t);
            let tt = ip.dot(&t, &t);
            if tt == T::zero() || !tt.is_finite() {
                return Ok(SolveStats::new(i, s_norm, ConvergedReason::DivergedBreakdown));
            }
            omega = ip.dot(&t, &s) / tt;
            for ((xj, &phj), &shj) in x.as_mut().iter_mut().zip(p_hat.as_ref()).zip(s_hat.as_ref()) {
                *xj = *xj + alpha * phj + omega * shj;
            }
            for ((rj, &sj), &tj) in r.as_mut().iter_mut().zip(s.as_ref()).zip(t.as_ref()) {
                *rj = sj - omega * tj;
            }
            res = ip.norm(&r);
            monitor_residual("bicgstab", self.monitor_interval, i, res);
            let reason = self.conv.check(res, b_norm, res0, i);
            if reason != ConvergedReason::Iterating {
                log::debug!("bicgstab: {reason} after {i} iterations");
                return Ok(SolveStats::new(i, res, reason));
            }
            if omega == T::zero() {
                return Ok(SolveStats::new(i, res, ConvergedReason::DivergedBreakdown));
            }
            rho_prev = rho;
        }
    }
}
