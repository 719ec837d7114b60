//! Preconditioned Conjugate Gradient (PCG) per Saad §9.2
//!
//! Works for symmetric definite operators of either sign: the discrete
//! Laplacian is negative definite, so definiteness is checked as "pᵀAp keeps
//! its sign" rather than "pᵀAp > 0".

use crate::core::traits::{InnerProduct, MatVec};
use crate::error::KError;
use crate::preconditioner::Preconditioner;
use crate::solver::{LinearSolver, apply_pc, residual};
use crate::utils::convergence::{ConvergedReason, Convergence, SolveStats, monitor_residual};
use num_traits::Float;

/// Which residual norm drives the convergence test.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CgNormType {
    /// ‖M⁻¹r‖
    Preconditioned,
    /// ‖r‖
    Unpreconditioned,
    /// √|rᵀM⁻¹r|
    Natural,
}

pub struct PcgSolver<T, I = ()> {
    pub conv: Convergence<T>,
    pub norm_type: CgNormType,
    pub monitor_interval: usize,
    ip: I,
}

impl<T: Copy + Float> PcgSolver<T> {
    pub fn new(rtol: T, max_iters: usize) -> Self {
        Self {
            conv: Convergence::new(rtol, max_iters),
            norm_type: CgNormType::Unpreconditioned,
            monitor_interval: 0,
            ip: (),
        }
    }
}

impl<T: Copy + Float, I> PcgSolver<T, I> {
    pub fn with_inner_product<J>(self, ip: J) -> PcgSolver<T, J> {
        PcgSolver {
            conv: self.conv,
            norm_type: self.norm_type,
            monitor_interval: self.monitor_interval,
            ip,
        }
    }
    pub fn with_convergence(mut self, conv: Convergence<T>) -> Self {
        self.conv = conv;
        self
    }
    pub fn with_norm(mut self, norm_type: CgNormType) -> Self {
        self.norm_type = norm_type;
        self
    }
    pub fn with_monitor(mut self, interval: usize) -> Self {
        self.monitor_interval = interval;
        self
    }
}

impl<M, V, T, I> LinearSolver<M, V> for PcgSolver<T, I>
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
        let norm_type = self.norm_type;
        let measure = |r: &V, z: &V, rz: T| match norm_type {
            CgNormType::Preconditioned => ip.norm(z),
            CgNormType::Unpreconditioned => ip.norm(r),
            CgNormType::Natural => rz.abs().sqrt(),
        };

        let b_norm = {
            let mut mb = V::from(vec![T::zero(); n]);
            apply_pc(pc, b, &mut mb)?;
            let bmb = ip.dot(b, &mb);
            measure(b, &mb, bmb)
        };

        let mut r = residual(a, b, &*x);
        let mut z = V::from(vec![T::zero(); n]);
        apply_pc(pc, &r, &mut z)?;
        let mut rz = ip.dot(&r, &z);
        let mut p = z.clone();
        let res0 = measure(&r, &z, rz);
        monitor_residual("cg", self.monitor_interval, 0, res0);
        let reason = self.conv.check(res0, b_norm, res0, 0);
        if reason != ConvergedReason::Iterating {
            return Ok(SolveStats::new(0, res0, reason));
        }

        let mut curvature_sign: Option<bool> = None;
        let mut ap = V::from(vec![T::zero(); n]);
        let mut i = 0;
        loop {
            i += 1;
            a.matvec(&p, &mut ap);
            let p_dot_ap = ip.dot(&p, &ap);
            if p_dot_ap == T::zero() || !p_dot_ap.is_finite() {
                let res = measure(&r, &z, rz);
                return Ok(SolveStats::new(i, res, ConvergedReason::DivergedBreakdown));
            }
            let positive = p_dot_ap > T::zero();
            match curvature_sign {
                Some(s) if s != positive => return Err(KError::IndefiniteMatrix),
                _ => curvature_sign = Some(positive),
            }
            let alpha = rz / p_dot_ap;
            for (xj, &pj) in x.as_mut().iter_mut().zip(p.as_ref()) {
                *xj = *xj + alpha * pj;
            }
            for (rj, &apj) in r.as_mut().iter_mut().zip(ap.as_ref()) {
                *rj = *rj - alpha * apj;
            }
            apply_pc(pc, &r, &mut z)?;
            let rz_new = ip.dot(&r, &z);
            let res = measure(&r, &z, rz_new);
            monitor_residual("cg", self.monitor_interval, i, res);
            let reason = self.conv.check(res, b_norm, res0, i);
            if reason != ConvergedReason::Iterating {
                log::debug!("cg: {reason} after {i} iterations");
                return Ok(SolveStats::new(i, res, reason));
            }
            if rz_new != T::zero() && (rz_new > T::zero()) != (rz > T::zero()) {
                return Err(KError::IndefinitePreconditioner);
            }
            let beta = rz_new / rz;
            for (pj, &zj) in p.as_mut().iter_mut().zip(z.as_ref()) {
                *pj = zj + beta * *pj;
            }
            rz = rz_new;
        }
    }
}
