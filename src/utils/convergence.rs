//! Convergence tracking & tolerance checks for iterative solvers.
//!
//! The stopping test follows the usual KSP default: converged once the
//! residual norm drops below `max(rtol * ‖b‖, atol)`, diverged once it grows
//! past `dtol * ‖r₀‖`, becomes non-finite, or the iteration cap is reached.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Why an iterative solve stopped (or that it has not yet).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConvergedReason {
    Iterating,
    ConvergedRtol,
    ConvergedAtol,
    /// Fixed number of iterations completed (preonly).
    ConvergedIts,
    DivergedIts,
    DivergedDtol,
    DivergedNanOrInf,
    DivergedBreakdown,
}

impl ConvergedReason {
    pub fn is_converged(self) -> bool {
        matches!(
            self,
            ConvergedReason::ConvergedRtol | ConvergedReason::ConvergedAtol | ConvergedReason::ConvergedIts
        )
    }

    pub fn is_diverged(self) -> bool {
        !self.is_converged() && self != ConvergedReason::Iterating
    }
}

impl fmt::Display for ConvergedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConvergedReason::Iterating => "CONVERGED_ITERATING",
            ConvergedReason::ConvergedRtol => "CONVERGED_RTOL",
            ConvergedReason::ConvergedAtol => "CONVERGED_ATOL",
            ConvergedReason::ConvergedIts => "CONVERGED_ITS",
            ConvergedReason::DivergedIts => "DIVERGED_ITS",
            ConvergedReason::DivergedDtol => "DIVERGED_DTOL",
            ConvergedReason::DivergedNanOrInf => "DIVERGED_NANORINF",
            ConvergedReason::DivergedBreakdown => "DIVERGED_BREAKDOWN",
        };
        f.write_str(s)
    }
}

/// Stopping criteria.
#[derive(Debug, Clone, Copy)]
pub struct Convergence<T> {
    pub rtol: T,
    pub atol: T,
    pub dtol: T,
    pub max_iters: usize,
}

#[derive(Clone, Debug)]
pub struct SolveStats<T> {
    pub iterations: usize,
    pub final_residual: T,
    pub converged: bool,
    pub reason: ConvergedReason,
}

impl<T: num_traits::Float> SolveStats<T> {
    pub fn new(iterations: usize, final_residual: T, reason: ConvergedReason) -> Self {
        Self {
            iterations,
            final_residual,
            converged: reason.is_converged(),
            reason,
        }
    }
}

impl<T: Copy + num_traits::Float> Convergence<T> {
    /// Relative tolerance only; no absolute floor, divergence at 1e5 · ‖r₀‖.
    pub fn new(rtol: T, max_iters: usize) -> Self {
        Self {
            rtol,
            atol: T::zero(),
            dtol: num_traits::cast::<f64, T>(1e5).unwrap_or_else(T::max_value),
            max_iters,
        }
    }

    pub fn with_atol(mut self, atol: T) -> Self {
        self.atol = atol;
        self
    }

    pub fn with_dtol(mut self, dtol: T) -> Self {
        self.dtol = dtol;
        self
    }

    /// Classify residual `res_norm` at iteration `i`, given the reference norm
    /// `b_norm` (right-hand side) and the initial residual `res0_norm`.
    pub fn check(&self, res_norm: T, b_norm: T, res0_norm: T, i: usize) -> ConvergedReason {
        if !res_norm.is_finite() {
            return ConvergedReason::DivergedNanOrInf;
        }
        if res_norm <= self.atol {
            return ConvergedReason::ConvergedAtol;
        }
        if res_norm <= self.rtol * b_norm {
            return ConvergedReason::ConvergedRtol;
        }
        if res0_norm > T::zero() && res_norm >= self.dtol * res0_norm {
            return ConvergedReason::DivergedDtol;
        }
        if i >= self.max_iters {
            return ConvergedReason::DivergedIts;
        }
        ConvergedReason::Iterating
    }

    /// Convenience wrapper producing the stats record for `check`.
    pub fn stats(&self, res_norm: T, b_norm: T, res0_norm: T, i: usize) -> SolveStats<T> {
        SolveStats::new(i, res_norm, self.check(res_norm, b_norm, res0_norm, i))
    }
}

/// Residual monitor: logs every `interval`-th iteration at info level.
/// `interval == 0` disables it.
pub fn monitor_residual<T: num_traits::Float>(solver: &str, interval: usize, it: usize, res_norm: T) {
    if interval > 0 && it % interval == 0 {
        log::info!(
            "{solver}: iteration {it} residual norm {:e}",
            res_norm.to_f64().unwrap_or(f64::NAN)
        );
    }
}
