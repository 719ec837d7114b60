//! Preconditioner context and configuration for Krylov solvers.
//!
//! This module defines the `PC` enum, which provides a unified interface for
//! specifying and configuring the preconditioner types available to the X-Y
//! solver. Each variant corresponds to a specific preconditioning strategy,
//! with associated parameters where applicable.
//!
//! # Supported Preconditioners
//!
//! - None: identity.
//! - Jacobi: Diagonal scaling preconditioner.
//! - Sor: (Symmetric) Successive Over-Relaxation.
//! - Ilu0: Incomplete LU factorization with zero fill-in.
//! - Lu: Exact LU of the process-local block (block Jacobi across ranks).
//! - XLines: Exact solves on each X line of the process-local block.
//!
//! # Example
//!
//! ```rust
//! use laplace_xy::context::pc_context::PC;
//! let pc = PC::Sor { omega: 1.2, its: 2 };
//! ```

use crate::config::PcType;
use crate::error::KError;
use crate::matrix::CsrMatrix;
use crate::preconditioner::{BlockJacobi, Ilu0, Jacobi, Preconditioner, Sor};

/// Unified preconditioner enum for all supported types.
#[derive(Debug, Clone, PartialEq)]
pub enum PC<T> {
    /// No preconditioning.
    None,
    /// Jacobi (diagonal scaling) preconditioner.
    Jacobi,
    /// Symmetric SOR with relaxation factor `omega`, `its` sweeps per application.
    Sor { omega: T, its: usize },
    /// Incomplete LU factorization with zero fill-in (ILU(0)).
    Ilu0,
    /// Exact LU of the whole local block.
    Lu,
    /// Block Jacobi preconditioner.
    ///
    /// - `lines`: one block per X line, each a list of local row indices.
    XLines { lines: Vec<Vec<usize>> },
}

impl PC<f64> {
    /// Map a configured preconditioner type to its context. `lines` is only
    /// consulted for [`PcType::XLines`].
    pub fn from_type(kind: PcType, omega: f64, its: usize, lines: &[Vec<usize>]) -> Self {
        match kind {
            PcType::None => PC::None,
            PcType::Jacobi => PC::Jacobi,
            PcType::Sor => PC::Sor { omega, its },
            PcType::Ilu => PC::Ilu0,
            PcType::Lu => PC::Lu,
            PcType::XLines => PC::XLines { lines: lines.to_vec() },
        }
    }

    /// Construct and set up the preconditioner on `a`. `None` yields `Ok(None)`.
    pub fn build(
        &self,
        a: &CsrMatrix<f64>,
    ) -> Result<Option<Box<dyn Preconditioner<CsrMatrix<f64>, Vec<f64>> + Send + Sync>>, KError> {
        let mut pc: Box<dyn Preconditioner<CsrMatrix<f64>, Vec<f64>> + Send + Sync> = match self {
            PC::None => return Ok(None),
            PC::Jacobi => Box::new(Jacobi::new()),
            PC::Sor { omega, its } => Box::new(Sor::new(*omega, *its)),
            PC::Ilu0 => Box::new(Ilu0::new()),
            PC::Lu => Box::new(BlockJacobi::whole()),
            PC::XLines { lines } => Box::new(BlockJacobi::new(lines.clone())),
        };
        pc.setup(a)?;
        log::debug!("set up {self:?} preconditioner on {} local rows", a.nrows());
        Ok(Some(pc))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn none_builds_nothing() {
        let a = CsrMatrix::from_csr(1, 1, vec![0, 1], vec![0], vec![2.0]).unwrap();
        assert!(PC::None.build(&a).unwrap().is_none());
        let pc = PC::from_type(PcType::Jacobi, 1.0, 1, &[]).build(&a).unwrap().unwrap();
        let mut z = Vec::new();
        pc.apply(&vec![4.0], &mut z).unwrap();
        assert_eq!(z, vec![2.0]);
    }

    #[test]
    fn from_type_carries_parameters() {
        assert_eq!(PC::from_type(PcType::Sor, 1.3, 4, &[]), PC::Sor { omega: 1.3, its: 4 });
        let lines = vec![vec![0, 1], vec![2]];
        assert_eq!(PC::from_type(PcType::XLines, 1.0, 1, &lines), PC::XLines { lines });
    }
}
